//! Normal and borderline QRS: pathologic Q waves, R wave progression and
//! incomplete RBBB.

use crate::models::{grid, EcgRecord, Lead, QrsShape};

use crate::interpretation::helpers::{
    amplitude_gaps, has_contiguous_pair, lead_list, leads_where, missing_leads_reason,
    unavailable,
};
use crate::interpretation::types::*;

/// R in V3 at or below this (mm) is poor progression.
const POOR_PROGRESSION_R_V3_MM: f64 = 3.0;

const INFERIOR_Q: [Lead; 3] = [Lead::II, Lead::III, Lead::AVF];
const ANTERIOR_Q: [Lead; 3] = [Lead::V1, Lead::V2, Lead::V3];
const LATERAL_Q: [Lead; 5] = [Lead::I, Lead::AVL, Lead::V4, Lead::V5, Lead::V6];

fn territory_leads(territory: InfarctTerritory) -> &'static [Lead] {
    match territory {
        InfarctTerritory::Inferior => &INFERIOR_Q,
        InfarctTerritory::Anterior => &ANTERIOR_Q,
        InfarctTerritory::Lateral => &LATERAL_Q,
        InfarctTerritory::Posterior => &[Lead::V1, Lead::V2],
    }
}

/// Old infarction by territory from pathologic Q waves in contiguous leads,
/// and posterior infarction from its mirror image (tall R in V1–V2).
pub fn q_wave_infarcts(
    record: &EcgRecord,
    indeterminate: &mut Vec<Indeterminate>,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for territory in [
        InfarctTerritory::Inferior,
        InfarctTerritory::Anterior,
        InfarctTerritory::Lateral,
    ] {
        let leads = territory_leads(territory);
        let q_leads = leads_where(record, leads, |m| m.has_pathologic_q());
        if has_contiguous_pair(&q_leads) {
            let mut evidence = Evidence::new().leads(q_leads.iter().copied());
            for l in &q_leads {
                if let Some(q) = record.lead(*l).and_then(|m| m.q_wave) {
                    evidence = evidence.value(&format!("q_width_{}", l), q.duration_s, "s");
                }
            }
            let mut finding = Finding::new(Diagnosis::QWaveInfarct(territory))
                .with_evidence(evidence)
                .with_detail(format!(
                    "Pathologic Q (>= 0.04 s or >= 25% of R) in {}",
                    lead_list(&q_leads)
                ));
            if territory == InfarctTerritory::Inferior {
                finding = finding.with_detail("Look for reciprocal changes in I and aVL");
            }
            findings.push(finding);
            continue;
        }
        let missing = unavailable(record, leads);
        if leads.len() - missing.len() < 2 {
            indeterminate.push(Indeterminate::new(
                Step::Ventricular,
                &format!("q_waves_{}", territory_name(territory)),
                missing_leads_reason(record, &missing),
            ));
        }
    }

    let tall_r = leads_where(record, &[Lead::V1, Lead::V2], |m| m.r_dominant() == Some(true));
    if tall_r.len() == 2 {
        findings.push(
            Finding::new(Diagnosis::QWaveInfarct(InfarctTerritory::Posterior))
                .with_evidence(Evidence::new().leads(tall_r))
                .with_detail("Tall R with R/S > 1 in V1-V2 (mirror of posterior Q waves)")
                .with_differential(&[
                    "Right ventricular hypertrophy",
                    "Wolff-Parkinson-White",
                    "Normal variant",
                ]),
        );
    }

    findings
}

fn territory_name(territory: InfarctTerritory) -> &'static str {
    match territory {
        InfarctTerritory::Inferior => "inferior",
        InfarctTerritory::Anterior => "anterior",
        InfarctTerritory::Lateral => "lateral",
        InfarctTerritory::Posterior => "posterior",
    }
}

const EARLY_TRANSITION_CAUSES: &[&str] = &[
    "Posterior myocardial infarction",
    "Right ventricular hypertrophy",
    "Wolff-Parkinson-White",
    "Normal variant",
];

const POOR_PROGRESSION_CAUSES: &[&str] = &[
    "Anterior myocardial infarction",
    "Left bundle branch block",
    "Left ventricular hypertrophy",
    "COPD",
    "Lead misplacement",
];

const LATE_TRANSITION_CAUSES: &[&str] = &["Left ventricular hypertrophy", "Normal variant"];

/// R wave progression V1→V6. When more than one pattern fits, early
/// transition outranks poor progression, which outranks late transition.
/// A lower-ranked pattern is only named once every higher-ranked one has
/// been ruled out from measured leads.
pub fn r_progression(record: &EcgRecord) -> (Assessment<RProgression>, Option<Finding>) {
    let dominance = |lead: Lead| record.lead(lead).and_then(|m| m.r_dominant());
    let undetermined = |leads: &[Lead]| -> Option<String> {
        amplitude_gaps(
            record,
            &leads
                .iter()
                .copied()
                .filter(|l| dominance(*l).is_none())
                .collect::<Vec<_>>(),
        )
    };

    let early: Vec<Lead> = [Lead::V1, Lead::V2]
        .into_iter()
        .filter(|l| dominance(*l) == Some(true))
        .collect();
    let (progression, evidence, detail, causes) = if !early.is_empty() {
        (
            RProgression::EarlyTransition,
            Evidence::new().leads(early.iter().copied()),
            Some(format!("R/S > 1 in {}", lead_list(&early))),
            EARLY_TRANSITION_CAUSES,
        )
    } else {
        if let Some(reason) = undetermined(&[Lead::V1, Lead::V2]) {
            return (Assessment::indeterminate(reason), None);
        }
        let Some(r_v3) = record.lead(Lead::V3).and_then(|m| m.r_mv) else {
            let reason = match record.lead(Lead::V3) {
                Some(_) => "lead V3 R amplitude not measured".to_string(),
                None => record.missing_reason(Lead::V3),
            };
            return (Assessment::indeterminate(reason), None);
        };
        let late: Vec<Lead> = [Lead::V5, Lead::V6]
            .into_iter()
            .filter(|l| dominance(*l) == Some(false))
            .collect();
        if grid::at_most(r_v3, grid::mv(POOR_PROGRESSION_R_V3_MM)) {
            let r_mm = grid::standard_mm(r_v3);
            (
                RProgression::Poor,
                Evidence::new().lead(Lead::V3).value("r_v3", r_mm, "mm"),
                Some(format!("R in V3 {:.1} mm (<= 3)", r_mm)),
                POOR_PROGRESSION_CAUSES,
            )
        } else if !late.is_empty() {
            (
                RProgression::LateTransition,
                Evidence::new().leads(late.iter().copied()),
                Some(format!("S persists (S >= R) in {}", lead_list(&late))),
                LATE_TRANSITION_CAUSES,
            )
        } else {
            if let Some(reason) = undetermined(&[Lead::V5, Lead::V6]) {
                return (Assessment::indeterminate(reason), None);
            }
            let needed = [Lead::V1, Lead::V2, Lead::V3, Lead::V5, Lead::V6];
            (RProgression::Normal, Evidence::new().leads(needed), None, &[][..])
        }
    };

    let finding = Finding::new(Diagnosis::RProgression(progression))
        .with_evidence(evidence)
        .with_details(detail)
        .with_differential(causes);
    (Assessment::determined(progression), Some(finding))
}

/// Borderline QRS with rsR′ in V1.
pub fn incomplete_rbbb(record: &EcgRecord) -> Option<Finding> {
    let v1 = record.lead(Lead::V1)?;
    let rsr =
        v1.qrs_shape == Some(QrsShape::RsrPrime) || v1.r_prime_mv.is_some_and(|r| r > 0.0);
    rsr.then(|| {
        Finding::new(Diagnosis::VentricularPattern(VentricularPattern::IncompleteRbbb))
            .with_evidence(
                Evidence::new()
                    .lead(Lead::V1)
                    .value("qrs_duration", record.qrs.duration_s, "s"),
            )
            .with_detail("rsR' in V1 with QRS 0.10-0.12 s")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::fixtures::{edit_lead, normal_document, record};
    use crate::models::document::LeadInput;
    use crate::models::MeasurementDocument;

    fn q(doc: &mut MeasurementDocument, lead: Lead, depth_mm: f64, width_sq: f64) {
        edit_lead(doc, lead, |l: &mut LeadInput| {
            l.q_depth_mm = Some(depth_mm);
            l.q_width_small_squares = Some(width_sq);
        });
    }

    #[test]
    fn normal_document_has_no_infarct_and_normal_progression() {
        let rec = record(&normal_document());
        let mut indeterminate = Vec::new();
        assert!(q_wave_infarcts(&rec, &mut indeterminate).is_empty());
        assert!(indeterminate.is_empty());
        let (p, _) = r_progression(&rec);
        assert_eq!(p.value(), Some(&RProgression::Normal));
    }

    #[test]
    fn inferior_q_waves_by_width() {
        let mut doc = normal_document();
        q(&mut doc, Lead::III, 1.0, 1.0);
        q(&mut doc, Lead::AVF, 1.0, 1.0);
        let findings = q_wave_infarcts(&record(&doc), &mut Vec::new());
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].diagnosis,
            Diagnosis::QWaveInfarct(InfarctTerritory::Inferior)
        );
    }

    #[test]
    fn single_lead_q_is_not_an_infarct() {
        let mut doc = normal_document();
        q(&mut doc, Lead::III, 2.0, 1.0);
        assert!(q_wave_infarcts(&record(&doc), &mut Vec::new()).is_empty());
    }

    #[test]
    fn small_septal_q_is_not_pathologic() {
        let mut doc = normal_document();
        q(&mut doc, Lead::V5, 1.0, 0.5);
        q(&mut doc, Lead::V6, 1.0, 0.5);
        assert!(q_wave_infarcts(&record(&doc), &mut Vec::new()).is_empty());
    }

    #[test]
    fn poor_progression() {
        let mut doc = normal_document();
        edit_lead(&mut doc, Lead::V3, |l| {
            l.r_mm = Some(2.0);
            l.s_mm = Some(12.0);
            l.t_amplitude_mm = Some(-1.0);
        });
        let (p, finding) = r_progression(&record(&doc));
        assert_eq!(p.value(), Some(&RProgression::Poor));
        assert!(finding
            .unwrap()
            .differential
            .contains(&"Anterior myocardial infarction".to_string()));
    }

    #[test]
    fn early_transition_outranks_late() {
        let mut doc = normal_document();
        edit_lead(&mut doc, Lead::V2, |l| {
            l.r_mm = Some(12.0);
            l.s_mm = Some(4.0);
        });
        edit_lead(&mut doc, Lead::V6, |l| {
            l.r_mm = Some(3.0);
            l.s_mm = Some(6.0);
            l.t_amplitude_mm = Some(-1.0);
        });
        let (p, _) = r_progression(&record(&doc));
        assert_eq!(p.value(), Some(&RProgression::EarlyTransition));
    }

    #[test]
    fn tall_r_in_v1_v2_is_posterior() {
        let mut doc = normal_document();
        edit_lead(&mut doc, Lead::V1, |l| {
            l.r_mm = Some(8.0);
            l.s_mm = Some(3.0);
        });
        edit_lead(&mut doc, Lead::V2, |l| {
            l.r_mm = Some(12.0);
            l.s_mm = Some(4.0);
        });
        let findings = q_wave_infarcts(&record(&doc), &mut Vec::new());
        assert!(findings
            .iter()
            .any(|f| f.diagnosis == Diagnosis::QWaveInfarct(InfarctTerritory::Posterior)));
    }

    #[test]
    fn missing_precordials_make_progression_indeterminate() {
        let mut doc = normal_document();
        doc.leads.remove(&Lead::V2);
        let (p, finding) = r_progression(&record(&doc));
        assert_eq!(p.reason(), Some("lead V2 not measured"));
        assert!(finding.is_none());
    }

    #[test]
    fn v3_without_amplitudes_is_not_poor_progression() {
        let mut doc = normal_document();
        doc.leads.insert(
            Lead::V3,
            LeadInput {
                st_deviation_mm: Some(0.0),
                t_amplitude_mm: Some(3.0),
                ..Default::default()
            },
        );
        let (p, finding) = r_progression(&record(&doc));
        assert_eq!(p.reason(), Some("lead V3 R amplitude not measured"));
        assert!(finding.is_none());
    }

    #[test]
    fn late_transition_waits_for_both_lateral_leads() {
        let mut doc = normal_document();
        edit_lead(&mut doc, Lead::V5, |l| l.s_mm = None);
        let (p, _) = r_progression(&record(&doc));
        assert_eq!(p.reason(), Some("lead V5 QRS amplitudes not measured"));

        edit_lead(&mut doc, Lead::V6, |l| {
            l.r_mm = Some(3.0);
            l.s_mm = Some(6.0);
            l.t_amplitude_mm = Some(-1.0);
        });
        let (p, _) = r_progression(&record(&doc));
        assert_eq!(p.value(), Some(&RProgression::LateTransition));
    }

    #[test]
    fn incomplete_rbbb_needs_rsr_prime() {
        let mut doc = normal_document();
        assert!(incomplete_rbbb(&record(&doc)).is_none());
        edit_lead(&mut doc, Lead::V1, |l| l.r_prime_mm = Some(4.0));
        assert!(incomplete_rbbb(&record(&doc)).is_some());
    }
}
