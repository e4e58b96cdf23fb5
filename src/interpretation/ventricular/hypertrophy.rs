//! Voltage criteria for ventricular hypertrophy.
//!
//! LVH voltage is measured at every QRS width; whether it may be reported
//! alongside a bundle branch block is decided during synthesis.

use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, Lead, LeadMeasurement, QrsShape, Sex};

use crate::interpretation::helpers::{lead_list, leads_where, LATERAL};
use crate::interpretation::types::*;

const SOKOLOW_LYON_MM: f64 = 35.0;
const CORNELL_MALE_MM: f64 = 28.0;
const CORNELL_FEMALE_MM: f64 = 20.0;
const R_AVL_MM: f64 = 11.0;
const R_LEAD_I_MM: f64 = 14.0;
const LV_R_PEAK_TIME_S: f64 = 0.05;

/// Possible LVH despite an LBBB.
const LBBB_LVH_QRS_S: f64 = 0.16;
const LBBB_MODIFIED_SOKOLOW_MM: f64 = 45.0;

const RVH_AXIS_DEG: f64 = 110.0;
const RVH_R_V1_MM: f64 = 7.0;
const RVH_DEEP_S_MM: f64 = 7.0;
const RBBB_RVH_R_PRIME_MM: f64 = 15.0;
const RBBB_RVH_RS_RATIO: f64 = 2.5;

/// Strain: ST depression of at least this much with an inverted T.
const STRAIN_ST_MM: f64 = 0.5;

/// Voltage sums reported alongside the criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltageSummary {
    pub sokolow_lyon_mm: Option<f64>,
    pub cornell_mm: Option<f64>,
    pub cornell_threshold_mm: f64,
}

fn mm(value_mv: f64) -> f64 {
    grid::standard_mm(value_mv)
}

fn strain(m: &LeadMeasurement) -> bool {
    let st_down = m
        .st
        .is_some_and(|st| grid::at_most(st.deviation_mv, -grid::mv(STRAIN_ST_MM)));
    let t_down = m.t_wave.is_some_and(|t| t.amplitude_mv < 0.0);
    st_down && t_down
}

/// Cornell threshold for the patient's sex; unknown sex takes the male value.
pub fn cornell_threshold_mm(sex: Option<Sex>) -> f64 {
    match sex {
        Some(Sex::Female) => CORNELL_FEMALE_MM,
        Some(Sex::Male) | None => CORNELL_MALE_MM,
    }
}

/// Left ventricular hypertrophy by voltage.
pub fn left_ventricular(
    record: &EcgRecord,
    axis: Option<AxisDeviation>,
    indeterminate: &mut Vec<Indeterminate>,
) -> (VoltageSummary, Option<Finding>) {
    let lead = |l: Lead| record.lead(l);
    let cornell_threshold = cornell_threshold_mm(record.sex);

    let r_of = |l: Lead| lead(l).and_then(|m| m.r_mv);
    let s_of = |l: Lead| lead(l).and_then(|m| m.s_mv);

    let tallest_lateral = [Lead::V5, Lead::V6]
        .into_iter()
        .filter_map(|l| r_of(l).map(|r| (l, r)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    let sokolow = match (s_of(Lead::V1), tallest_lateral) {
        (Some(s_v1), Some((lat, r_lat))) => Some((mm(s_v1 + r_lat), lat)),
        _ => None,
    };
    let cornell = s_of(Lead::V3)
        .zip(r_of(Lead::AVL))
        .map(|(s_v3, r_avl)| mm(s_v3 + r_avl));
    let r_avl = r_of(Lead::AVL);
    let r_i = r_of(Lead::I);

    let summary = VoltageSummary {
        sokolow_lyon_mm: sokolow.map(|(v, _)| grid::round_to(v, 1)),
        cornell_mm: cornell.map(|v| grid::round_to(v, 1)),
        cornell_threshold_mm: cornell_threshold,
    };

    let mut met = Vec::new();
    let mut leads = Vec::new();
    let mut evidence = Evidence::new();
    let mut unevaluable = Vec::new();

    match sokolow {
        Some((sum, lat)) => {
            evidence = evidence.value("sokolow_lyon", sum, "mm");
            if grid::at_least(sum, SOKOLOW_LYON_MM) {
                met.push(format!("Sokolow-Lyon: S V1 + R {} = {:.1} mm (>= 35)", lat, sum));
                leads.extend([Lead::V1, lat]);
            }
        }
        None => unevaluable.push("Sokolow-Lyon (S V1, R V5/V6)"),
    }
    match cornell {
        Some(sum) => {
            evidence = evidence.value("cornell", sum, "mm");
            if grid::above(sum, cornell_threshold) {
                met.push(format!(
                    "Cornell: S V3 + R aVL = {:.1} mm (> {:.0})",
                    sum, cornell_threshold
                ));
                leads.extend([Lead::V3, Lead::AVL]);
            }
        }
        None => unevaluable.push("Cornell (S V3, R aVL)"),
    }
    match r_avl {
        Some(r) if grid::at_least(r, grid::mv(R_AVL_MM)) => {
            met.push(format!("R aVL {:.1} mm (>= 11)", mm(r)));
            leads.push(Lead::AVL);
        }
        Some(_) => {}
        None => unevaluable.push("R aVL"),
    }
    match r_i {
        Some(r) if grid::at_least(r, grid::mv(R_LEAD_I_MM)) => {
            met.push(format!("R I {:.1} mm (>= 14)", mm(r)));
            leads.push(Lead::I);
        }
        Some(_) => {}
        None => unevaluable.push("R I"),
    }

    if met.is_empty() {
        if !unevaluable.is_empty() {
            let reason = if unevaluable.len() == 4 {
                "no voltage criterion evaluable: V1/V5/V6, V3/aVL and I amplitudes unavailable"
                    .to_string()
            } else {
                format!(
                    "LVH not excluded; amplitudes missing for {}",
                    unevaluable.join(", ")
                )
            };
            indeterminate.push(Indeterminate::new(Step::Ventricular, "lvh_voltage", reason));
        }
        return (summary, None);
    }

    let mut supportive = Vec::new();
    if axis == Some(AxisDeviation::Left) {
        supportive.push("Supportive: left axis deviation".to_string());
    }
    let late_peak = leads_where(record, &[Lead::V5, Lead::V6], |m| {
        m.r_peak_time_s
            .is_some_and(|t| grid::above(t, LV_R_PEAK_TIME_S))
    });
    if !late_peak.is_empty() {
        supportive.push(format!(
            "Supportive: R peak time > 50 ms in {}",
            lead_list(&late_peak)
        ));
    }
    let strained = leads_where(record, &LATERAL, strain);
    if strained.len() >= 2 {
        supportive.push(format!(
            "Supportive: LV strain (ST depression with T inversion) in {}",
            lead_list(&strained)
        ));
    }

    let finding = Finding::new(Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage))
        .with_evidence(evidence.leads(leads))
        .with_details(met)
        .with_details(supportive);
    (summary, Some(finding))
}

/// Advisory voltage hint that survives an LBBB.
pub fn possible_lvh_in_lbbb(record: &EcgRecord) -> Option<Finding> {
    let mut met = Vec::new();
    let mut evidence = Evidence::new();

    if grid::above(record.qrs.duration_s, LBBB_LVH_QRS_S) {
        met.push(format!("QRS {:.0} ms (> 160)", record.qrs_ms()));
        evidence = evidence.value("qrs_duration", record.qrs.duration_s, "s");
    }
    let s_v2 = record.lead(Lead::V2).and_then(|m| m.s_mv);
    let r_v6 = record.lead(Lead::V6).and_then(|m| m.r_mv);
    if let (Some(s_v2), Some(r_v6)) = (s_v2, r_v6) {
        let sum = mm(s_v2 + r_v6);
        if grid::at_least(sum, LBBB_MODIFIED_SOKOLOW_MM) {
            met.push(format!("S V2 + R V6 = {:.1} mm (>= 45)", sum));
            evidence = evidence
                .leads([Lead::V2, Lead::V6])
                .value("modified_sokolow_lyon", sum, "mm");
        }
    }
    if let Some(r_avl) = record.lead(Lead::AVL).and_then(|m| m.r_mv) {
        if grid::at_least(r_avl, grid::mv(R_AVL_MM)) {
            met.push(format!("R aVL {:.1} mm (>= 11)", mm(r_avl)));
            evidence = evidence.lead(Lead::AVL);
        }
    }

    if met.is_empty() {
        return None;
    }
    Some(
        Finding::new(Diagnosis::Hypertrophy(Hypertrophy::PossibleLvhInLbbb))
            .with_evidence(evidence)
            .with_details(met)
            .with_detail("Voltage criteria are unreliable with LBBB; advisory only"),
    )
}

/// Right ventricular hypertrophy; two criteria are required. Under an RBBB
/// the R′-based set replaces the standard one.
pub fn right_ventricular(record: &EcgRecord, rbbb: bool) -> Option<Finding> {
    let v1 = record.lead(Lead::V1);
    let rad = record
        .qrs
        .axis_degrees
        .filter(|d| grid::above(*d, RVH_AXIS_DEG));
    let mut met = Vec::new();
    let mut evidence = Evidence::new();

    if let Some(d) = rad {
        met.push(format!("Right axis deviation {:.0} deg (> 110)", d));
        evidence = evidence.value("qrs_axis", d, "deg");
    }

    if rbbb {
        if let Some(v1) = v1 {
            if let Some(rp) = v1
                .r_prime_mv
                .filter(|rp| grid::above(*rp, grid::mv(RBBB_RVH_R_PRIME_MM)))
            {
                met.push(format!("R' in V1 {:.1} mm (> 15)", mm(rp)));
                evidence = evidence.lead(Lead::V1);
            }
            if let (Some(r), Some(s)) = (v1.r_mv, v1.s_mv) {
                let tallest = r.max(v1.r_prime_mv.unwrap_or(0.0));
                if s > 0.0 && grid::above(tallest / s, RBBB_RVH_RS_RATIO) {
                    met.push(format!("R/S in V1 {:.1} (> 2.5)", tallest / s));
                    evidence = evidence.lead(Lead::V1);
                }
            }
        }
    } else {
        if let Some(v1) = v1 {
            if let Some(r) = v1.r_mv {
                let ratio = v1.r_to_s_ratio();
                if grid::at_least(r, grid::mv(RVH_R_V1_MM))
                    || ratio.is_some_and(|rs| grid::at_least(rs, 1.0))
                {
                    met.push(format!("Tall R in V1 ({:.1} mm)", mm(r)));
                    evidence = evidence.lead(Lead::V1);
                }
            }
            if v1.qrs_shape == Some(QrsShape::Qr) {
                met.push("qR pattern in V1".to_string());
                evidence = evidence.lead(Lead::V1);
            }
        }
        let deep_s = leads_where(record, &[Lead::V5, Lead::V6], |m| {
            m.s_mv
                .is_some_and(|s| grid::at_least(s, grid::mv(RVH_DEEP_S_MM)))
        });
        if !deep_s.is_empty() {
            met.push(format!("Deep S in {}", lead_list(&deep_s)));
            evidence = evidence.leads(deep_s);
        }
        let strained = leads_where(record, &[Lead::V1, Lead::V2, Lead::V3], strain);
        if strained.len() >= 2 {
            met.push(format!("RV strain in {}", lead_list(&strained)));
            evidence = evidence.leads(strained);
        }
    }

    if met.len() < 2 {
        return None;
    }
    let mut finding = Finding::new(Diagnosis::Hypertrophy(Hypertrophy::Rvh))
        .with_evidence(evidence)
        .with_details(met)
        .with_differential(&[
            "Pulmonary hypertension",
            "COPD",
            "Congenital heart disease",
        ]);
    if rbbb {
        finding = finding.with_detail("Assessed with the RBBB criteria set");
    }
    Some(finding)
}
