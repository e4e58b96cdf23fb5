use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, Lead};

use crate::interpretation::helpers::amplitude_gap;
use crate::interpretation::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisResult {
    pub degrees: Option<f64>,
    /// Quadrant from the signs of lead I and aVF.
    pub quadrant: Option<AxisDeviation>,
    pub deviation: Assessment<AxisDeviation>,
}

/// Quadrant from the net QRS in lead I and aVF. An isoelectric lead counts
/// as positive.
pub fn quadrant(lead_i_net_mv: f64, avf_net_mv: f64) -> AxisDeviation {
    match (lead_i_net_mv >= 0.0, avf_net_mv >= 0.0) {
        (true, true) => AxisDeviation::Normal,
        (true, false) => AxisDeviation::Left,
        (false, true) => AxisDeviation::Right,
        (false, false) => AxisDeviation::Extreme,
    }
}

/// Quadrant a measured axis falls in, for the agreement check.
fn quadrant_of_degrees(degrees: f64) -> AxisDeviation {
    if grid::at_least(degrees, 0.0) && grid::at_most(degrees, 90.0) {
        AxisDeviation::Normal
    } else if grid::at_least(degrees, -90.0) && degrees < 0.0 {
        AxisDeviation::Left
    } else if degrees > 90.0 {
        AxisDeviation::Right
    } else {
        AxisDeviation::Extreme
    }
}

/// Deviation from degrees: normal −30°..+90°, left −30°..−90°, right
/// +90°..+180°, extreme −90°..−180°.
pub fn deviation_from_degrees(degrees: f64) -> AxisDeviation {
    if grid::at_least(degrees, -30.0) && grid::at_most(degrees, 90.0) {
        AxisDeviation::Normal
    } else if grid::at_least(degrees, -90.0) && degrees < -30.0 {
        AxisDeviation::Left
    } else if degrees > 90.0 {
        AxisDeviation::Right
    } else {
        AxisDeviation::Extreme
    }
}

fn causes(deviation: AxisDeviation) -> &'static [&'static str] {
    match deviation {
        AxisDeviation::Normal => &[],
        AxisDeviation::Left => &[
            "Left anterior fascicular block",
            "Left ventricular hypertrophy",
            "Inferior myocardial infarction",
            "Wolff-Parkinson-White",
            "Normal variant (age)",
        ],
        AxisDeviation::Right => &[
            "Right ventricular hypertrophy",
            "Left posterior fascicular block",
            "Lateral myocardial infarction",
            "Right bundle branch block",
            "Normal in young or tall individuals",
            "Dextrocardia",
        ],
        AxisDeviation::Extreme => &[
            "Ventricular rhythm",
            "Limb lead reversal",
            "Hyperkalemia",
            "Severe right ventricular hypertrophy",
        ],
    }
}

/// Frontal plane QRS axis.
pub fn classify_axis(
    record: &EcgRecord,
    conflicts: &mut Vec<Conflict>,
    indeterminate: &mut Vec<Indeterminate>,
) -> (AxisResult, Option<Finding>) {
    let degrees = record.qrs.axis_degrees;
    let signs = match (record.lead(Lead::I), record.lead(Lead::AVF)) {
        (Some(i), Some(avf)) => match (i.qrs_sign(), avf.qrs_sign()) {
            (Some(si), Some(sf)) => Some((quadrant(si, sf), i, avf)),
            _ => None,
        },
        _ => None,
    };

    let deviation = match (degrees, &signs) {
        (Some(d), Some((q, _, _))) => {
            let measured = quadrant_of_degrees(d);
            if measured != *q {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::AxisQuadrantMismatch,
                        Step::Ventricular,
                        format!(
                            "Reported axis {:.0} deg does not lie in the quadrant implied by \
                             leads I and aVF",
                            d
                        ),
                    )
                    .with_evidence(
                        Evidence::new()
                            .leads([Lead::I, Lead::AVF])
                            .value("qrs_axis", d, "deg"),
                    ),
                );
            }
            Assessment::determined(deviation_from_degrees(d))
        }
        (Some(d), None) => Assessment::determined(deviation_from_degrees(d)),
        (None, Some((q, _, _))) => Assessment::determined(*q),
        (None, None) => {
            let reason = [Lead::I, Lead::AVF]
                .into_iter()
                .filter(|l| record.lead(*l).and_then(|m| m.qrs_sign()).is_none())
                .filter_map(|l| amplitude_gap(record, l))
                .collect::<Vec<_>>()
                .join("; ");
            indeterminate.push(Indeterminate::new(Step::Ventricular, "qrs_axis", reason.clone()));
            Assessment::indeterminate(reason)
        }
    };

    let finding = deviation.value().map(|dev| {
        let mut evidence = Evidence::new();
        if let Some((_, i, avf)) = &signs {
            evidence = evidence.leads([Lead::I, Lead::AVF]);
            if let (Some(net_i), Some(net_avf)) = (i.net_qrs_mv(), avf.net_qrs_mv()) {
                evidence = evidence
                    .value("lead_i_net", grid::standard_mm(net_i), "mm")
                    .value("avf_net", grid::standard_mm(net_avf), "mm");
            }
        }
        if let Some(d) = degrees {
            evidence = evidence.value("qrs_axis", d, "deg");
        }
        Finding::new(Diagnosis::Axis(*dev))
            .with_evidence(evidence)
            .with_differential(causes(*dev))
    });

    (
        AxisResult {
            degrees,
            quadrant: signs.map(|(q, _, _)| q),
            deviation,
        },
        finding,
    )
}
