// Full-pipeline scenarios: document → validation → steps → synthesis → report.
// Each builds a complete tracing and checks what a reader of the final report sees.

use super::engine::DefaultInterpreter;
use super::fixtures::{edit_lead, lbbb_document, normal_document};
use super::rate::RateMethod;
use super::types::*;
use crate::models::document::{
    AtrialInput, BaselineInput, FWaveInput, LeadInput, QrsInput, QtInput, RhythmInput,
};
use crate::models::{
    Lead, MeasurementDocument, PMorphology, Polarity, PrPattern, QtInterval, Regularity,
    StMorphology,
};
use crate::report::{self, Report};

fn interpret(doc: &MeasurementDocument) -> Report {
    DefaultInterpreter::default().interpret(doc).unwrap()
}

fn has(report: &Report, diagnosis: Diagnosis) -> bool {
    report.findings().any(|f| f.diagnosis == diagnosis)
}

/// AF at 450/min with an irregularly irregular ventricular response near 110 bpm.
fn af_document() -> MeasurementDocument {
    let mut doc = normal_document();
    doc.rhythm = Some(RhythmInput {
        rr_small_squares: Some(14.0),
        qrs_count_6s: Some(11),
        regularity: Some(Regularity::IrregularlyIrregular),
    });
    doc.atrial = Some(AtrialInput {
        p_waves_present: Some(false),
        baseline: Some(BaselineInput {
            fibrillatory_waves: true,
            flutter_waves: false,
            atrial_rate_per_min: Some(450.0),
        }),
        f_waves: Some(FWaveInput {
            v1_polarity: Some(Polarity::Negative),
            v1_amplitude_mm: Some(1.5),
            v1_width_small_squares: Some(1.5),
            ..Default::default()
        }),
        ..Default::default()
    });
    doc.conduction = None;
    doc
}

/// Inferior ST elevation with reciprocal depression in I and aVL.
fn inferior_stemi_document() -> MeasurementDocument {
    let mut doc = normal_document();
    for lead in [Lead::II, Lead::III, Lead::AVF] {
        edit_lead(&mut doc, lead, |l| {
            l.st_deviation_mm = Some(2.0);
            l.st_morphology = Some(StMorphology::Convex);
        });
    }
    for lead in [Lead::I, Lead::AVL] {
        edit_lead(&mut doc, lead, |l| l.st_deviation_mm = Some(-1.0));
    }
    doc
}

// =========================================================================
// Rate
// =========================================================================

#[test]
fn four_large_squares_is_75_bpm_normal_regular() {
    let report = interpret(&normal_document());
    let rate = &report.heart_rate().analysis;
    assert!((rate.heart_rate_bpm - 75.0).abs() < 1e-9);
    assert_eq!(rate.method, RateMethod::LargeSquares);
    assert_eq!(rate.classification, RateClass::Normal);
    assert_eq!(rate.regularity, Regularity::Regular);
    assert!(rate.conflicts.is_empty());
}

#[test]
fn exactly_one_rate_class_matches_the_rate() {
    for squares in 5..=40 {
        let mut doc = normal_document();
        doc.rhythm = Some(RhythmInput {
            rr_small_squares: Some(f64::from(squares)),
            qrs_count_6s: None,
            regularity: Some(Regularity::Regular),
        });
        let report = interpret(&doc);
        let bpm = report.heart_rate().analysis.heart_rate_bpm;
        // Boundary rates fall on the normal side.
        let expected = if bpm < 60.0 - 1e-6 {
            RateClass::Bradycardia
        } else if bpm > 100.0 + 1e-6 {
            RateClass::Tachycardia
        } else {
            RateClass::Normal
        };
        let rate_findings: Vec<_> = report
            .findings()
            .filter(|f| matches!(f.diagnosis, Diagnosis::Rate(_)))
            .collect();
        assert_eq!(rate_findings.len(), 1, "rr {} squares", squares);
        assert_eq!(rate_findings[0].diagnosis, Diagnosis::Rate(expected), "{} bpm", bpm);
    }
}

// =========================================================================
// Atrial & fibrillation
// =========================================================================

#[test]
fn af_with_negative_v1_f_waves_supports_lae() {
    let report = interpret(&af_document());
    assert!(has(&report, Diagnosis::AtrialRhythm(AtrialRhythm::AtrialFibrillation)));
    let chambers = report.fibrillation_chambers().expect("step 9 entered for AF");
    assert_eq!(
        chambers.findings[0].diagnosis,
        Diagnosis::ChamberEnlargement(FibrillationChamber::SupportiveLae)
    );
    assert!(chambers.findings[0]
        .details
        .iter()
        .any(|d| d.starts_with("Supportive only")));
    assert_eq!(report.impression()[0], "Atrial fibrillation, ventricular rate 110 bpm");
}

#[test]
fn p_wave_result_is_exclusively_present_or_absent() {
    for doc in [normal_document(), af_document()] {
        let value = report::to_value(&interpret(&doc)).unwrap();
        let p = &value["step2_pWaveAnalysis"];
        assert!(p.get("ifPresent").is_some() ^ p.get("ifAbsent").is_some());
    }
    let af = report::to_value(&interpret(&af_document())).unwrap();
    assert_eq!(af["step2_pWaveAnalysis"]["ifAbsent"]["atrial_rate_per_min"], 450.0);
    assert!(af.get("step9_fibrillationChambers").is_some());
}

// =========================================================================
// Conduction
// =========================================================================

#[test]
fn mobitz_one_is_monitor() {
    let mut doc = normal_document();
    if let Some(c) = doc.conduction.as_mut() {
        c.p_count = Some(9);
        c.qrs_count = Some(8);
        c.pr_pattern = Some(PrPattern::ProgressivelyLengthening);
    }
    let report = interpret(&doc);
    let mobitz = report
        .conduction()
        .findings
        .iter()
        .find(|f| f.diagnosis == Diagnosis::Conduction(ConductionClass::MobitzI))
        .expect("Mobitz I reported");
    assert_eq!(mobitz.severity, Severity::Monitor);
    assert_eq!(report.overall_severity(), Severity::Monitor);
}

// =========================================================================
// Ventricular
// =========================================================================

#[test]
fn lbbb_scenario_has_no_lvh_and_non_ischemic_discordance() {
    let report = interpret(&lbbb_document());
    assert!(has(
        &report,
        Diagnosis::VentricularPattern(VentricularPattern::Lbbb { strauss: true })
    ) || has(
        &report,
        Diagnosis::VentricularPattern(VentricularPattern::Lbbb { strauss: false })
    ));
    assert!(!report
        .findings()
        .any(|f| matches!(f.diagnosis, Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage))));
    for f in report.st_segment().findings.iter().chain(&report.t_wave().findings) {
        assert_eq!(f.severity, Severity::Benign, "{:?}", f.diagnosis);
        assert_eq!(f.discordant, Some(true));
    }
    assert!(report
        .synthesis()
        .suppressed
        .iter()
        .any(|s| s.diagnosis == Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
}

#[test]
fn bundle_branch_blocks_are_mutually_exclusive() {
    for doc in [normal_document(), lbbb_document()] {
        let report = interpret(&doc);
        let blocks = report
            .findings()
            .filter(|f| match f.diagnosis {
                Diagnosis::VentricularPattern(p) => p.is_bundle_branch_block(),
                _ => false,
            })
            .count();
        assert!(blocks <= 1);
    }
}

#[test]
fn dissociated_concordant_wide_tachycardia_is_vt() {
    let mut doc = normal_document();
    doc.rhythm = Some(RhythmInput {
        rr_small_squares: Some(10.0),
        qrs_count_6s: Some(15),
        regularity: Some(Regularity::Regular),
    });
    doc.qrs = Some(QrsInput {
        duration_small_squares: Some(4.0),
        axis_degrees: Some(-120.0),
        av_dissociation: true,
        precordial_concordance: true,
        ..Default::default()
    });
    if let Some(c) = doc.conduction.as_mut() {
        c.pr_pattern = Some(PrPattern::Dissociated);
        c.qrs_count = Some(15);
    }
    let report = interpret(&doc);
    assert_eq!(
        report.qrs().analysis.pattern(),
        Some(VentricularPattern::VentricularTachycardia)
    );
    assert_eq!(report.overall_severity(), Severity::Emergent);
    assert!(!report
        .findings()
        .any(|f| matches!(f.diagnosis, Diagnosis::EscapeRhythm(_))));
}

// =========================================================================
// Repolarization
// =========================================================================

#[test]
fn inferior_stemi_with_reciprocal_change_is_emergent() {
    let report = interpret(&inferior_stemi_document());
    assert!(has(
        &report,
        Diagnosis::StSegment(StFinding::Stemi {
            territory: StemiTerritory::Inferior,
            reciprocal: true,
        })
    ));
    assert_eq!(report.overall_severity(), Severity::Emergent);
    assert!(report.impression()[1].ends_with("(EMERGENT)"));
}

#[test]
fn concave_inferior_elevation_with_reciprocal_change_is_emergent() {
    let mut doc = inferior_stemi_document();
    for lead in [Lead::II, Lead::III, Lead::AVF] {
        edit_lead(&mut doc, lead, |l| {
            l.st_deviation_mm = Some(3.0);
            l.st_morphology = Some(StMorphology::Concave);
        });
    }
    for lead in [Lead::I, Lead::AVL] {
        edit_lead(&mut doc, lead, |l| {
            l.st_deviation_mm = Some(-2.0);
            l.st_morphology = Some(StMorphology::Horizontal);
        });
    }
    let report = interpret(&doc);
    assert!(has(
        &report,
        Diagnosis::StSegment(StFinding::Stemi {
            territory: StemiTerritory::Inferior,
            reciprocal: true,
        })
    ));
    assert!(!report.findings().any(|f| matches!(
        f.diagnosis,
        Diagnosis::StSegment(StFinding::ConcaveElevation | StFinding::IschemicDepression { .. })
    )));
    assert_eq!(report.overall_severity(), Severity::Emergent);
}

#[test]
fn qt_440_at_rr_080_is_prolonged_with_torsades_note() {
    let mut doc = normal_document();
    doc.qt = Some(QtInput {
        qt_small_squares: Some(11.0),
    });
    let report = interpret(&doc);
    let qt = &report.qt_interval().analysis;
    let measures = qt.measures.as_ref().unwrap();
    assert!((measures.qtc_ms - 492.0).abs() < 1.0);
    assert!(matches!(qt.class.value(), Some(QtClass::Prolonged { .. })));
    let finding = &report.qt_interval().findings[0];
    assert!(finding.details.iter().any(|d| d.contains("torsades")));
}

#[test]
fn bazett_at_one_second_is_identity() {
    let interval = QtInterval::new(0.4, 1.0);
    assert!((interval.qtc_ms() - interval.qt_ms()).abs() < 1e-9);
    let corrected = QtInterval::new(interval.qtc_ms() / 1000.0, 1.0);
    assert!((corrected.qtc_ms() - interval.qtc_ms()).abs() < 1e-9);
}

// =========================================================================
// Missing data & engine paths
// =========================================================================

#[test]
fn missing_measurements_leave_report_incomplete() {
    let mut doc = normal_document();
    doc.qt = None;
    doc.u_wave = None;
    let report = interpret(&doc);
    assert!(!report.is_complete());
    let aspects: Vec<&str> = report
        .synthesis()
        .indeterminate
        .iter()
        .map(|i| i.aspect.as_str())
        .collect();
    assert!(aspects.contains(&"qt_interval"));
    assert!(aspects.contains(&"u_wave"));
    assert_eq!(report.overall_severity(), Severity::Benign);
}

#[test]
fn lead_without_qrs_amplitudes_is_not_read_as_zero() {
    let mut doc = normal_document();
    doc.leads.insert(
        Lead::V3,
        LeadInput {
            st_deviation_mm: Some(0.0),
            t_amplitude_mm: Some(3.0),
            ..Default::default()
        },
    );
    let report = interpret(&doc);
    assert!(!report
        .findings()
        .any(|f| matches!(f.diagnosis, Diagnosis::RProgression(_))));
    let progression = report
        .synthesis()
        .indeterminate
        .iter()
        .find(|i| i.aspect == "r_progression")
        .expect("R progression left open");
    assert_eq!(progression.reason, "lead V3 R amplitude not measured");
    assert!(report
        .synthesis()
        .indeterminate
        .iter()
        .any(|i| i.aspect == "lvh_voltage"));
    assert!(!report.is_complete());
}

#[test]
fn ectopic_p_waves_at_a_sinus_rate_surface_a_conflict() {
    let mut doc = normal_document();
    if let Some(a) = doc.atrial.as_mut() {
        for lead in [Lead::II, Lead::III, Lead::AVF] {
            a.morphology.insert(lead, PMorphology::Inverted);
        }
    }
    let report = interpret(&doc);
    assert!(has(
        &report,
        Diagnosis::AtrialRhythm(AtrialRhythm::EctopicAtrial {
            origin: AtrialOrigin::LowAtrial
        })
    ));
    assert!(report
        .conflicts()
        .iter()
        .any(|c| c.kind == ConflictKind::PRateMorphologyMismatch));
}

#[test]
fn json_input_matches_struct_input() {
    let doc = lbbb_document();
    let json = serde_json::to_string(&doc).unwrap();
    let engine = DefaultInterpreter::default();
    assert_eq!(engine.interpret_json(&json).unwrap(), engine.interpret(&doc).unwrap());
}

#[tokio::test]
async fn concurrent_engine_matches_sequential_across_scenarios() {
    let engine = DefaultInterpreter::default();
    for doc in [
        normal_document(),
        lbbb_document(),
        af_document(),
        inferior_stemi_document(),
    ] {
        let sequential = engine.interpret(&doc).unwrap();
        let concurrent = engine.interpret_concurrent(&doc).await.unwrap();
        assert_eq!(
            report::to_json(&sequential).unwrap(),
            report::to_json(&concurrent).unwrap()
        );
    }
}
