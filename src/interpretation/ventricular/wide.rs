//! Mechanism of a wide QRS, matched in priority order: pacing, ventricular
//! rhythm, pre-excitation, then the V1/V6 bundle branch signatures.

use crate::models::{grid, EcgRecord, Lead, PWaveSet, Polarity, QrsShape, Sex};

use crate::interpretation::conduction::PR_SHORT_BELOW_S;
use crate::interpretation::helpers::{lead_list, leads_where, missing_leads_reason};
use crate::interpretation::types::*;

/// Strauss duration thresholds, seconds.
const STRAUSS_MALE_S: f64 = 0.14;
const STRAUSS_FEMALE_S: f64 = 0.13;
/// V6 R peak time beyond which poor LV function is suggested.
const V6_R_PEAK_POOR_LV_S: f64 = 0.06;
const VT_RATE_BPM: f64 = 100.0;
/// Measured axis at or beyond which left anterior fascicular block is named.
const LAFB_AXIS_DEG: f64 = -45.0;

const STRAUSS_NOTCH_LEADS: [Lead; 4] = [Lead::I, Lead::AVL, Lead::V5, Lead::V6];
const STRAUSS_NO_Q_LEADS: [Lead; 3] = [Lead::I, Lead::V5, Lead::V6];

pub struct WideOutcome {
    pub pattern: Assessment<VentricularPattern>,
    pub finding: Option<Finding>,
}

/// Strauss QRS duration for the patient's sex; unknown sex takes the
/// stricter male value.
pub fn strauss_duration_s(sex: Option<Sex>) -> f64 {
    match sex {
        Some(Sex::Female) => STRAUSS_FEMALE_S,
        Some(Sex::Male) | None => STRAUSS_MALE_S,
    }
}

fn no_atrial_activity(record: &EcgRecord) -> bool {
    matches!(&record.p_waves, PWaveSet::Absent(a) if !a.fibrillatory_waves && !a.flutter_waves)
}

pub fn classify_wide(
    record: &EcgRecord,
    heart_rate_bpm: f64,
    axis: Option<AxisDeviation>,
    indeterminate: &mut Vec<Indeterminate>,
) -> WideOutcome {
    let qrs = &record.qrs;
    let duration = Evidence::new().value("qrs_duration", qrs.duration_s, "s");

    if qrs.pacing_spikes {
        return determined(
            VentricularPattern::Paced,
            Finding::new(Diagnosis::VentricularPattern(VentricularPattern::Paced))
                .with_evidence(duration)
                .with_detail("Pacing spikes precede the QRS complexes"),
        );
    }

    if (qrs.av_dissociation || no_atrial_activity(record)) && qrs.precordial_concordance {
        let pattern = if grid::above(heart_rate_bpm, VT_RATE_BPM) {
            VentricularPattern::VentricularTachycardia
        } else {
            VentricularPattern::IdioventricularRhythm
        };
        let mut finding = Finding::new(Diagnosis::VentricularPattern(pattern))
            .with_evidence(duration.value("heart_rate", heart_rate_bpm, "bpm"))
            .with_detail("Wide, bizarre QRS with precordial concordance");
        if qrs.av_dissociation {
            finding = finding.with_detail("AV dissociation");
        }
        return determined(pattern, finding);
    }

    let pr = record.av.as_ref().and_then(|av| av.pr.seconds);
    if qrs.delta_wave && pr.map_or(true, |s| grid::below(s, PR_SHORT_BELOW_S)) {
        let mut finding = Finding::new(Diagnosis::VentricularPattern(VentricularPattern::Wpw))
            .with_evidence(duration)
            .with_detail("Delta wave with wide QRS")
            .with_detail("Secondary ST-T changes expected");
        finding = match pr {
            Some(s) => finding.with_detail(format!("Short PR {:.2} s", s)),
            None => finding.with_detail("PR interval not measured"),
        };
        return determined(VentricularPattern::Wpw, finding);
    }

    let (Some(v1), Some(v6)) = (record.lead(Lead::V1), record.lead(Lead::V6)) else {
        let missing: Vec<Lead> = [Lead::V1, Lead::V6]
            .into_iter()
            .filter(|l| record.lead(*l).is_none())
            .collect();
        let reason = format!(
            "wide QRS mechanism needs V1 and V6: {}",
            missing_leads_reason(record, &missing)
        );
        indeterminate.push(Indeterminate::new(Step::Ventricular, "qrs_pattern", reason.clone()));
        return WideOutcome {
            pattern: Assessment::indeterminate(reason),
            finding: None,
        };
    };

    let unshaped: Vec<Lead> = [v1, v6]
        .into_iter()
        .filter(|m| m.qrs_shape.is_none() && m.qrs_polarity.is_none())
        .map(|m| m.lead)
        .collect();
    if !unshaped.is_empty() {
        let reason = format!(
            "wide QRS mechanism needs V1 and V6 morphology: QRS not measured in {}",
            lead_list(&unshaped)
        );
        indeterminate.push(Indeterminate::new(Step::Ventricular, "qrs_pattern", reason.clone()));
        return WideOutcome {
            pattern: Assessment::indeterminate(reason),
            finding: None,
        };
    }

    let v1_negative = v1.qrs_shape.is_some_and(|s| s.is_predominantly_negative())
        || v1.qrs_polarity == Some(Polarity::Negative);
    let v6_monophasic = v6.q_wave.map_or(true, |q| q.depth_mv <= 0.0)
        && (v6.qrs_shape == Some(QrsShape::MonophasicR)
            || (v6.qrs_polarity == Some(Polarity::Positive)
                && v6.s_mv.is_some_and(|s| s == 0.0)));
    let v1_rsr =
        v1.qrs_shape == Some(QrsShape::RsrPrime) || v1.r_prime_mv.is_some_and(|r| r > 0.0);

    if v1_negative && v6_monophasic {
        return lbbb(record, duration);
    }
    if v1_rsr && v6.wide_terminal_s {
        return rbbb(record, axis, duration);
    }

    let finding = Finding::new(Diagnosis::VentricularPattern(VentricularPattern::NonspecificIvcd))
        .with_evidence(duration.leads([Lead::V1, Lead::V6]))
        .with_detail("Wide QRS without a bundle branch block signature in V1/V6");
    determined(VentricularPattern::NonspecificIvcd, finding)
}

fn determined(pattern: VentricularPattern, finding: Finding) -> WideOutcome {
    WideOutcome {
        pattern: Assessment::determined(pattern),
        finding: Some(finding),
    }
}

fn lbbb(record: &EcgRecord, duration: Evidence) -> WideOutcome {
    let mut details = vec![
        "V1 predominantly negative (QS or rS)".to_string(),
        "V6 broad monophasic R without Q".to_string(),
    ];

    let strauss_s = strauss_duration_s(record.sex);
    let long_enough = grid::at_least(record.qrs.duration_s, strauss_s);
    let notched = leads_where(record, &STRAUSS_NOTCH_LEADS, |m| m.mid_qrs_notch);
    let q_leads = leads_where(record, &STRAUSS_NO_Q_LEADS, |m| {
        m.q_wave.is_some_and(|q| q.depth_mv > 0.0)
    });
    let strauss = long_enough && notched.len() >= 2 && q_leads.is_empty();
    if strauss {
        details.push(format!(
            "Strauss criteria: QRS >= {:.0} ms, mid-QRS notching in {}, no Q in I/V5/V6",
            grid::ms(strauss_s),
            lead_list(&notched)
        ));
    } else if !q_leads.is_empty() {
        details.push(format!("Q waves in {} (Strauss not met)", lead_list(&q_leads)));
    }

    if let Some(t) = record
        .lead(Lead::V6)
        .and_then(|v6| v6.r_peak_time_s)
        .filter(|t| grid::above(*t, V6_R_PEAK_POOR_LV_S))
    {
        details.push(format!(
            "R peak time in V6 {:.0} ms (> 60): suggests poor LV function",
            grid::ms(t)
        ));
    }
    details.push("Secondary ST-T discordance expected".to_string());
    details.push("New LBBB with chest pain is a STEMI equivalent".to_string());

    let pattern = VentricularPattern::Lbbb { strauss };
    let finding = Finding::new(Diagnosis::VentricularPattern(pattern))
        .with_evidence(duration.leads([Lead::V1, Lead::V6]).leads(notched))
        .with_details(details);
    determined(pattern, finding)
}

/// Left axis deviation marked enough for an anterior hemiblock: a measured
/// axis at or beyond −45°, or, without one, a negative lead II.
fn anterior_hemiblock_axis(record: &EcgRecord) -> bool {
    match record.qrs.axis_degrees {
        Some(d) => grid::at_most(d, LAFB_AXIS_DEG),
        None => record
            .lead(Lead::II)
            .and_then(|m| m.qrs_sign())
            .is_some_and(|s| s < 0.0),
    }
}

fn rbbb(record: &EcgRecord, axis: Option<AxisDeviation>, duration: Evidence) -> WideOutcome {
    let fascicular = match axis {
        Some(AxisDeviation::Left) if anterior_hemiblock_axis(record) => {
            Some(FascicularBlock::LeftAnterior)
        }
        Some(AxisDeviation::Right) => Some(FascicularBlock::LeftPosterior),
        _ => None,
    };
    let mut finding = Finding::new(Diagnosis::VentricularPattern(VentricularPattern::Rbbb {
        fascicular,
    }))
    .with_evidence(duration.leads([Lead::V1, Lead::V6]))
    .with_detail("rsR' in V1 with wide terminal S in V6");

    if let Some(rp) = record.lead(Lead::V1).and_then(|v1| v1.r_prime_mv) {
        finding = finding.with_detail(format!("Terminal R' in V1 {:.1} mm", grid::standard_mm(rp)));
    }
    if record.lead(Lead::I).is_some_and(|i| i.wide_terminal_s) {
        finding = finding.with_detail("Wide terminal S in lead I");
    }
    finding = match fascicular {
        Some(FascicularBlock::LeftAnterior) => {
            finding.with_detail("Left axis deviation: bifascicular block")
        }
        Some(FascicularBlock::LeftPosterior) => {
            finding.with_detail("Right axis deviation: consider left posterior fascicular block")
        }
        None => finding,
    };
    finding = finding.with_detail("ST depression and T inversion in V1-V3 are expected");

    determined(VentricularPattern::Rbbb { fascicular }, finding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::fixtures::{edit_lead, lbbb_document, normal_document, record};
    use crate::models::document::QrsInput;
    use crate::models::MeasurementDocument;

    fn wide(doc: &MeasurementDocument) -> (WideOutcome, Vec<Indeterminate>) {
        let mut indeterminate = Vec::new();
        let out = classify_wide(&record(doc), 75.0, None, &mut indeterminate);
        (out, indeterminate)
    }

    #[test]
    fn lbbb_signature() {
        let (out, _) = wide(&lbbb_document());
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::Lbbb { strauss: false })
        );
    }

    #[test]
    fn strauss_needs_notching_and_duration() {
        let mut doc = lbbb_document();
        for l in [Lead::I, Lead::AVL] {
            edit_lead(&mut doc, l, |m| m.mid_qrs_notch = true);
        }
        let (out, _) = wide(&doc);
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::Lbbb { strauss: true })
        );

        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(3.25),
            ..Default::default()
        });
        let (out, _) = wide(&doc);
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::Lbbb { strauss: false })
        );

        doc.patient.sex = Some(Sex::Female);
        let (out, _) = wide(&doc);
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::Lbbb { strauss: true })
        );
    }

    fn rbbb_document(axis_degrees: Option<f64>) -> MeasurementDocument {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(3.5),
            axis_degrees,
            ..Default::default()
        });
        edit_lead(&mut doc, Lead::V1, |l| {
            l.r_mm = Some(2.0);
            l.s_mm = Some(4.0);
            l.r_prime_mm = Some(8.0);
            l.t_amplitude_mm = Some(-2.0);
        });
        edit_lead(&mut doc, Lead::V6, |l| l.wide_terminal_s = true);
        doc
    }

    fn rbbb_fascicle(doc: &MeasurementDocument) -> Option<VentricularPattern> {
        let out = classify_wide(&record(doc), 75.0, Some(AxisDeviation::Left), &mut Vec::new());
        out.pattern.value().copied()
    }

    #[test]
    fn rbbb_signature_with_bifascicular_block() {
        assert_eq!(
            rbbb_fascicle(&rbbb_document(Some(-60.0))),
            Some(VentricularPattern::Rbbb {
                fascicular: Some(FascicularBlock::LeftAnterior)
            })
        );
    }

    #[test]
    fn mild_left_axis_is_not_bifascicular() {
        assert_eq!(
            rbbb_fascicle(&rbbb_document(Some(-40.0))),
            Some(VentricularPattern::Rbbb { fascicular: None })
        );
        // Quadrant only: I positive, aVF negative, but lead II still upright.
        assert_eq!(
            rbbb_fascicle(&rbbb_document(None)),
            Some(VentricularPattern::Rbbb { fascicular: None })
        );
    }

    #[test]
    fn negative_lead_ii_marks_anterior_hemiblock_without_degrees() {
        let mut doc = rbbb_document(None);
        edit_lead(&mut doc, Lead::II, |l| {
            l.r_mm = Some(3.0);
            l.s_mm = Some(9.0);
            l.t_amplitude_mm = Some(-1.0);
        });
        assert_eq!(
            rbbb_fascicle(&doc),
            Some(VentricularPattern::Rbbb {
                fascicular: Some(FascicularBlock::LeftAnterior)
            })
        );
    }

    #[test]
    fn unmeasured_v6_morphology_is_indeterminate() {
        let mut doc = rbbb_document(None);
        edit_lead(&mut doc, Lead::V6, |l| {
            l.r_mm = None;
            l.s_mm = None;
        });
        let (out, indeterminate) = wide(&doc);
        assert!(!out.pattern.is_determined());
        assert!(indeterminate[0].reason.contains("QRS not measured in V6"));
    }

    #[test]
    fn pacing_spikes_win() {
        let mut doc = lbbb_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(4.0),
            pacing_spikes: true,
            delta_wave: true,
            ..Default::default()
        });
        let (out, _) = wide(&doc);
        assert_eq!(out.pattern.value(), Some(&VentricularPattern::Paced));
    }

    #[test]
    fn dissociated_concordant_fast_is_vt() {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(4.0),
            av_dissociation: true,
            precordial_concordance: true,
            ..Default::default()
        });
        let mut indeterminate = Vec::new();
        let out = classify_wide(&record(&doc), 170.0, None, &mut indeterminate);
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::VentricularTachycardia)
        );
        assert_eq!(out.finding.unwrap().severity, Severity::Emergent);

        let out = classify_wide(&record(&doc), 40.0, None, &mut indeterminate);
        assert_eq!(
            out.pattern.value(),
            Some(&VentricularPattern::IdioventricularRhythm)
        );
    }

    #[test]
    fn delta_wave_with_short_pr_is_wpw() {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(3.0),
            delta_wave: true,
            ..Default::default()
        });
        if let Some(c) = doc.conduction.as_mut() {
            c.pr_small_squares = Some(2.5);
        }
        let (out, _) = wide(&doc);
        assert_eq!(out.pattern.value(), Some(&VentricularPattern::Wpw));
    }

    #[test]
    fn no_signature_is_nonspecific_delay() {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(3.0),
            ..Default::default()
        });
        let (out, _) = wide(&doc);
        assert_eq!(out.pattern.value(), Some(&VentricularPattern::NonspecificIvcd));
    }

    #[test]
    fn missing_v1_is_indeterminate() {
        let mut doc = lbbb_document();
        edit_lead(&mut doc, Lead::V1, |l| l.uninterpretable = Some("noise".into()));
        let (out, indeterminate) = wide(&doc);
        assert!(!out.pattern.is_determined());
        assert!(indeterminate[0].reason.contains("lead V1 uninterpretable: noise"));
    }
}
