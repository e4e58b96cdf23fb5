//! Final synthesis: merges the step outputs and applies the cross-step
//! overrides in one explicit post-pass.
//!
//! Overrides, in order:
//! 1. LBBB removes LVH by voltage; the LBBB voltage advisory is kept only at
//!    detailed verbosity.
//! 2. Under a QRS with secondary repolarization, discordant ST and T findings
//!    collapse into "secondary to conduction". Concordant ones stay.
//! 3. Absent atrial activity is named junctional or ventricular by QRS width.
//! 4. A short PR with a delta wave needs a pre-excited QRS, or it is a conflict.
//! 5. PR-segment and ST pericarditis evidence are reconciled.

use serde::{Deserialize, Serialize};

use crate::config::{InterpreterConfig, Verbosity};
use crate::models::grid;

use super::atrial::AtrialResult;
use super::conduction::ConductionResult;
use super::fibrillation::FibrillationResult;
use super::messages::MessageTemplates;
use super::rate::RateResult;
use super::repolarization::RepolarizationResult;
use super::types::*;
use super::ventricular::VentricularResult;

/// Everything the steps produced, before synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutputs {
    pub rate: RateResult,
    pub atrial: AtrialResult,
    pub conduction: ConductionResult,
    pub ventricular: VentricularResult,
    pub repolarization: RepolarizationResult,
    /// Present only when the rhythm is atrial fibrillation.
    pub fibrillation: Option<FibrillationResult>,
}

/// A finding with the step that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFinding {
    pub step: Step,
    #[serde(flatten)]
    pub finding: Finding,
}

/// A finding removed by a cross-step override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suppression {
    pub step: Step,
    pub diagnosis: Diagnosis,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub impression: Vec<String>,
    pub overall_severity: Severity,
    pub findings: Vec<StepFinding>,
    pub suppressed: Vec<Suppression>,
    pub conflicts: Vec<Conflict>,
    pub indeterminate: Vec<Indeterminate>,
    /// No leaf assessment was left indeterminate.
    pub complete: bool,
}

impl Synthesis {
    pub fn findings_for(&self, step: Step) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.step == step)
            .map(|f| &f.finding)
    }

    pub fn has(&self, diagnosis: Diagnosis) -> bool {
        self.findings.iter().any(|f| f.finding.diagnosis == diagnosis)
    }
}

/// Working set the override pass edits in place.
struct PostPass<'a> {
    outputs: &'a StepOutputs,
    findings: Vec<StepFinding>,
    suppressed: Vec<Suppression>,
    conflicts: Vec<Conflict>,
}

impl PostPass<'_> {
    fn remove_where(&mut self, reason: &str, pred: impl Fn(&StepFinding) -> bool) {
        let (gone, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.findings).into_iter().partition(|f| pred(f));
        self.findings = kept;
        self.suppressed.extend(gone.into_iter().map(|f| Suppression {
            step: f.step,
            diagnosis: f.finding.diagnosis,
            reason: reason.to_string(),
        }));
    }

    fn find_mut(&mut self, pred: impl Fn(&Diagnosis) -> bool) -> Option<&mut Finding> {
        self.findings
            .iter_mut()
            .map(|f| &mut f.finding)
            .find(|f| pred(&f.diagnosis))
    }

    fn has(&self, pred: impl Fn(&Diagnosis) -> bool) -> bool {
        self.findings.iter().any(|f| pred(&f.finding.diagnosis))
    }
}

fn collect(outputs: &StepOutputs) -> Vec<StepFinding> {
    let tag = |step: Step| move |finding: &Finding| StepFinding {
        step,
        finding: finding.clone(),
    };
    let mut all = vec![tag(Step::Rate)(&outputs.rate.finding)];
    all.extend(outputs.atrial.findings.iter().map(tag(Step::Atrial)));
    all.extend(outputs.conduction.findings.iter().map(tag(Step::Conduction)));
    all.extend(outputs.ventricular.findings.iter().map(tag(Step::Ventricular)));
    all.extend(outputs.repolarization.findings().map(tag(Step::Repolarization)));
    if let Some(fib) = &outputs.fibrillation {
        all.extend(fib.findings.iter().map(tag(Step::Fibrillation)));
    }
    all
}

pub fn synthesize(outputs: &StepOutputs, config: &InterpreterConfig) -> Synthesis {
    let mut conflicts = outputs.rate.conflicts.clone();
    conflicts.extend(outputs.atrial.conflicts.iter().cloned());
    conflicts.extend(outputs.ventricular.conflicts.iter().cloned());

    let mut indeterminate = outputs.atrial.indeterminate.clone();
    indeterminate.extend(outputs.conduction.indeterminate.iter().cloned());
    indeterminate.extend(outputs.ventricular.indeterminate.iter().cloned());
    indeterminate.extend(outputs.repolarization.indeterminate());
    if let Some(fib) = &outputs.fibrillation {
        indeterminate.extend(fib.indeterminate.iter().cloned());
    }

    let mut pass = PostPass {
        outputs,
        findings: collect(outputs),
        suppressed: Vec::new(),
        conflicts,
    };
    lbbb_voltage(&mut pass, config.verbosity);
    secondary_repolarization(&mut pass);
    escape_rhythm(&mut pass);
    pre_excitation(&mut pass);
    pericarditis(&mut pass);

    let overall_severity = pass
        .findings
        .iter()
        .map(|f| f.finding.severity)
        .max()
        .unwrap_or(Severity::Benign);
    let impression = impression(&pass);

    if !pass.conflicts.is_empty() {
        tracing::warn!(
            conflicts = pass.conflicts.len(),
            kinds = ?pass.conflicts.iter().map(|c| c.kind).collect::<Vec<_>>(),
            "Interpretation carries conflicting evidence"
        );
    }
    tracing::debug!(
        findings = pass.findings.len(),
        suppressed = pass.suppressed.len(),
        severity = overall_severity.as_str(),
        "Synthesis complete"
    );

    Synthesis {
        impression,
        overall_severity,
        complete: indeterminate.is_empty(),
        findings: pass.findings,
        suppressed: pass.suppressed,
        conflicts: pass.conflicts,
        indeterminate,
    }
}

fn lbbb_voltage(pass: &mut PostPass<'_>, verbosity: Verbosity) {
    if !matches!(
        pass.outputs.ventricular.pattern(),
        Some(VentricularPattern::Lbbb { .. })
    ) {
        return;
    }
    pass.remove_where("voltage criteria are unreliable with LBBB", |f| {
        f.finding.diagnosis == Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)
    });
    if verbosity != Verbosity::Detailed {
        pass.remove_where("LBBB voltage advisory is reported at detailed verbosity", |f| {
            f.finding.diagnosis == Diagnosis::Hypertrophy(Hypertrophy::PossibleLvhInLbbb)
        });
    }
}

fn is_repolarization_change(diagnosis: &Diagnosis) -> bool {
    match diagnosis {
        Diagnosis::StSegment(s) => *s != StFinding::SecondaryToConduction,
        Diagnosis::TWave(t) => *t != TFinding::SecondaryToConduction,
        _ => false,
    }
}

fn secondary_repolarization(pass: &mut PostPass<'_>) {
    let Some(pattern) = pass
        .outputs
        .ventricular
        .pattern()
        .filter(|p| p.has_secondary_repolarization())
    else {
        return;
    };
    let label = MessageTemplates::label(&Diagnosis::VentricularPattern(pattern));

    let discordant = |f: &StepFinding| {
        is_repolarization_change(&f.finding.diagnosis) && f.finding.discordant == Some(true)
    };
    let st_leads: Vec<_> = pass
        .findings
        .iter()
        .filter(|f| discordant(*f) && matches!(f.finding.diagnosis, Diagnosis::StSegment(_)))
        .flat_map(|f| f.finding.evidence.leads.iter().copied())
        .collect();
    let t_leads: Vec<_> = pass
        .findings
        .iter()
        .filter(|f| discordant(*f) && matches!(f.finding.diagnosis, Diagnosis::TWave(_)))
        .flat_map(|f| f.finding.evidence.leads.iter().copied())
        .collect();

    pass.remove_where(
        &format!("discordant to the QRS, expected with {}", label),
        discordant,
    );

    let expected = format!("Appropriate discordance for {}; not ischemic", label);
    if !st_leads.is_empty() {
        pass.findings.push(StepFinding {
            step: Step::Repolarization,
            finding: Finding::new(Diagnosis::StSegment(StFinding::SecondaryToConduction))
                .with_evidence(Evidence::new().leads(st_leads))
                .with_detail(expected.clone())
                .with_discordance(true),
        });
    }
    if !t_leads.is_empty() {
        pass.findings.push(StepFinding {
            step: Step::Repolarization,
            finding: Finding::new(Diagnosis::TWave(TFinding::SecondaryToConduction))
                .with_evidence(Evidence::new().leads(t_leads))
                .with_detail(expected)
                .with_discordance(true),
        });
    }

    let concordant = format!(
        "Concordant with the QRS despite {}: not explained by the conduction abnormality",
        label
    );
    for f in pass.findings.iter_mut() {
        if is_repolarization_change(&f.finding.diagnosis) && f.finding.discordant == Some(false) {
            f.finding.details.push(concordant.clone());
        }
    }
}

fn escape_rhythm(pass: &mut PostPass<'_>) {
    let outputs = pass.outputs;
    let no_atrial = outputs.atrial.rhythm.value() == Some(&AtrialRhythm::JunctionalOrVentricular);
    let qrs_exceeds_p =
        outputs.conduction.class.value() == Some(&ConductionClass::JunctionalOrVentricularEscape);
    if !no_atrial && !qrs_exceeds_p {
        return;
    }
    // A ventricular rhythm already names the mechanism.
    if matches!(
        outputs.ventricular.pattern(),
        Some(VentricularPattern::VentricularTachycardia | VentricularPattern::IdioventricularRhythm)
    ) {
        return;
    }

    let qrs_s = outputs.ventricular.qrs_duration_s;
    let (escape, detail) = if outputs.ventricular.width.is_wide() {
        (
            EscapeRhythm::Ventricular,
            format!("Wide QRS {:.0} ms without preceding P waves", grid::ms(qrs_s)),
        )
    } else {
        (
            EscapeRhythm::Junctional,
            format!("Narrow QRS {:.0} ms without preceding P waves", grid::ms(qrs_s)),
        )
    };
    pass.findings.push(StepFinding {
        step: Step::Synthesis,
        finding: Finding::new(Diagnosis::EscapeRhythm(escape))
            .with_evidence(
                Evidence::new()
                    .value("qrs_duration", qrs_s, "s")
                    .value("heart_rate", outputs.rate.heart_rate_bpm, "bpm"),
            )
            .with_detail(detail),
    });
}

fn pre_excitation(pass: &mut PostPass<'_>) {
    let outputs = pass.outputs;
    if outputs.conduction.class.value() != Some(&ConductionClass::PreExcitation) {
        return;
    }
    if outputs.ventricular.pattern() == Some(VentricularPattern::Wpw) {
        if let Some(f) = pass.find_mut(|d| *d == Diagnosis::Conduction(ConductionClass::PreExcitation)) {
            f.details
                .push("Confirmed by a wide QRS with delta wave (WPW pattern)".to_string());
        }
        return;
    }
    let qrs_ms = grid::ms(outputs.ventricular.qrs_duration_s);
    pass.conflicts.push(
        Conflict::new(
            ConflictKind::PreExcitationUnconfirmed,
            Step::Synthesis,
            format!(
                "Short PR with delta wave, but the QRS ({:.0} ms) does not show a \
                 pre-excitation pattern",
                qrs_ms
            ),
        )
        .with_evidence(Evidence::new().value("qrs_duration", outputs.ventricular.qrs_duration_s, "s")),
    );
}

fn pericarditis(pass: &mut PostPass<'_>) {
    let pr_pattern = Diagnosis::PrSegment(PrSegmentFinding::PericarditisPattern);
    if !pass.has(|d| *d == pr_pattern) {
        return;
    }
    if pass.has(|d| *d == Diagnosis::StSegment(StFinding::Pericarditis)) {
        pass.remove_where("merged into the pericarditis ST finding", |f| {
            f.finding.diagnosis == pr_pattern
        });
        if let Some(f) = pass.find_mut(|d| *d == Diagnosis::StSegment(StFinding::Pericarditis)) {
            f.details
                .push("PR depression inferiorly with PR elevation in aVR".to_string());
        }
    } else if let Some(f) = pass.find_mut(|d| *d == Diagnosis::StSegment(StFinding::ConcaveElevation)) {
        f.details
            .push("PR-segment pattern also points to pericarditis".to_string());
    }
}

fn impression(pass: &PostPass<'_>) -> Vec<String> {
    let outputs = pass.outputs;
    let mut lines = Vec::new();

    let rhythm = pass
        .findings
        .iter()
        .find(|f| matches!(f.finding.diagnosis, Diagnosis::EscapeRhythm(_)))
        .or_else(|| {
            pass.findings
                .iter()
                .find(|f| matches!(f.finding.diagnosis, Diagnosis::AtrialRhythm(_)))
        })
        .map(|f| MessageTemplates::label(&f.finding.diagnosis))
        .unwrap_or_else(|| "Rhythm indeterminate".to_string());
    lines.push(format!(
        "{}, ventricular rate {:.0} bpm",
        rhythm, outputs.rate.heart_rate_bpm
    ));

    let mut abnormal: Vec<&Finding> = pass
        .findings
        .iter()
        .map(|f| &f.finding)
        .filter(|f| f.severity > Severity::Benign)
        .filter(|f| {
            !matches!(
                f.diagnosis,
                Diagnosis::AtrialRhythm(_) | Diagnosis::EscapeRhythm(_)
            )
        })
        .collect();
    abnormal.sort_by(|a, b| b.severity.cmp(&a.severity));
    lines.extend(abnormal.into_iter().map(MessageTemplates::statement));

    if lines.len() == 1 {
        lines.push("No further abnormality".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::atrial::classify_atrial;
    use crate::interpretation::conduction::classify_conduction;
    use crate::interpretation::fibrillation::classify_fibrillation;
    use crate::interpretation::fixtures::{edit_lead, lbbb_document, normal_document, record};
    use crate::interpretation::rate::classify_rate;
    use crate::interpretation::repolarization::classify_repolarization;
    use crate::interpretation::ventricular::classify_ventricular;
    use crate::models::document::{AtrialInput, QrsInput};
    use crate::models::{Lead, MeasurementDocument};

    fn outputs(doc: &MeasurementDocument, config: &InterpreterConfig) -> StepOutputs {
        let rec = record(doc);
        let rate = classify_rate(&rec, config);
        let atrial = classify_atrial(&rec, &rate);
        let fibrillation = atrial.is_fibrillation().then(|| classify_fibrillation(&rec));
        let conduction = classify_conduction(&rec);
        let ventricular = classify_ventricular(&rec, &rate);
        let repolarization = classify_repolarization(&rec, &rate, &ventricular);
        StepOutputs {
            rate,
            atrial,
            conduction,
            ventricular,
            repolarization,
            fibrillation,
        }
    }

    fn run(doc: &MeasurementDocument) -> Synthesis {
        let config = InterpreterConfig::default();
        synthesize(&outputs(doc, &config), &config)
    }

    #[test]
    fn normal_tracing_is_benign() {
        let s = run(&normal_document());
        assert_eq!(s.overall_severity, Severity::Benign);
        assert_eq!(s.impression[0], "Normal sinus rhythm, ventricular rate 75 bpm");
        assert_eq!(s.impression[1], "No further abnormality");
        assert!(s.conflicts.is_empty());
        assert!(s.suppressed.is_empty());
        assert!(s.complete);
    }

    #[test]
    fn lbbb_removes_voltage_lvh_and_ischemic_repolarization() {
        let s = run(&lbbb_document());
        assert!(!s.has(Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
        assert!(s
            .suppressed
            .iter()
            .any(|x| x.diagnosis == Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
        assert!(s.has(Diagnosis::StSegment(StFinding::SecondaryToConduction)));
        assert!(s.has(Diagnosis::TWave(TFinding::SecondaryToConduction)));
        assert!(!s.findings.iter().any(|f| matches!(
            f.finding.diagnosis,
            Diagnosis::StSegment(StFinding::Stemi { .. })
                | Diagnosis::StSegment(StFinding::IschemicDepression { .. })
                | Diagnosis::TWave(TFinding::LateralIschemia)
        )));
        assert_eq!(s.overall_severity, Severity::Monitor);
    }

    #[test]
    fn concordant_st_elevation_survives_lbbb() {
        let mut doc = lbbb_document();
        for l in [Lead::V5, Lead::V6] {
            edit_lead(&mut doc, l, |m| m.st_deviation_mm = Some(1.5));
        }
        let s = run(&doc);
        let stemi = s
            .findings
            .iter()
            .find(|f| matches!(f.finding.diagnosis, Diagnosis::StSegment(StFinding::Stemi { .. })))
            .expect("concordant elevation kept");
        assert!(stemi.finding.details.iter().any(|d| d.starts_with("Concordant")));
        assert_eq!(s.overall_severity, Severity::Emergent);
    }

    #[test]
    fn lbbb_advisory_only_when_detailed() {
        let mut doc = lbbb_document();
        edit_lead(&mut doc, Lead::V2, |m| m.s_mm = Some(30.0));
        let advisory = Diagnosis::Hypertrophy(Hypertrophy::PossibleLvhInLbbb);

        assert!(!run(&doc).has(advisory));

        let config = InterpreterConfig::default().with_verbosity(Verbosity::Detailed);
        let detailed = synthesize(&outputs(&doc, &config), &config);
        assert!(detailed.has(advisory));
    }

    #[test]
    fn absent_p_waves_with_narrow_qrs_is_junctional() {
        let mut doc = normal_document();
        doc.atrial = Some(AtrialInput {
            p_waves_present: Some(false),
            ..Default::default()
        });
        doc.conduction = None;
        let s = run(&doc);
        assert!(s.has(Diagnosis::EscapeRhythm(EscapeRhythm::Junctional)));
        assert!(s.impression[0].starts_with("Junctional rhythm"));
    }

    #[test]
    fn delta_wave_with_narrow_qrs_is_unconfirmed_pre_excitation() {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(2.0),
            axis_degrees: Some(60.0),
            delta_wave: true,
            ..Default::default()
        });
        if let Some(c) = doc.conduction.as_mut() {
            c.pr_small_squares = Some(2.5);
        }
        let s = run(&doc);
        assert!(s
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::PreExcitationUnconfirmed));
    }

    #[test]
    fn severity_is_the_maximum() {
        let mut doc = normal_document();
        if let Some(c) = doc.conduction.as_mut() {
            c.pr_pattern = Some(crate::models::PrPattern::ProgressivelyLengthening);
            c.p_count = Some(9);
        }
        let s = run(&doc);
        assert!(s.has(Diagnosis::Conduction(ConductionClass::MobitzI)));
        assert_eq!(s.overall_severity, Severity::Monitor);
    }
}
