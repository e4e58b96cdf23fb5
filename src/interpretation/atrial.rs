//! Step 2: atrial activity.
//!
//! Two top-level states. With P waves absent the baseline decides between
//! fibrillation, flutter and no atrial activity at all (settled later from
//! the QRS width). With P waves present, morphology by lead establishes the
//! origin, the P rate picks the band, and a band that contradicts the
//! morphology is surfaced as a conflict.

use serde::{Deserialize, Serialize};

use crate::models::{
    grid, AbsentPWaves, EcgRecord, Lead, PMorphology, PWaveSet, PresentPWaves, Regularity,
};

use super::rate::RateResult;
use super::types::*;

/// Normal P wave duration ceiling (exclusive), seconds.
const P_DURATION_LIMIT_S: f64 = 0.12;
/// Tallest normal P wave, standard mm.
const P_AMPLITUDE_LIMIT_MM: f64 = 2.5;
/// V1 terminal negativity depth (mm) and width (s) beyond which LAE is called.
const V1_TERMINAL_DEPTH_MM: f64 = 1.0;
const V1_TERMINAL_WIDTH_S: f64 = 0.04;
/// Sinus P axis window, degrees.
const SINUS_AXIS_MIN: f64 = 0.0;
const SINUS_AXIS_MAX: f64 = 75.0;

/// Atrial rate bands, per minute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PRateBand {
    /// < 60
    Slow,
    /// 60–100
    Normal,
    /// > 100–150
    SinusTachycardia,
    /// > 150–250
    AtrialTachycardia,
    /// > 250–350
    Flutter,
    /// > 350
    Fibrillation,
}

impl PRateBand {
    pub fn from_rate(per_min: f64) -> Self {
        if grid::below(per_min, 60.0) {
            Self::Slow
        } else if grid::at_most(per_min, 100.0) {
            Self::Normal
        } else if grid::at_most(per_min, 150.0) {
            Self::SinusTachycardia
        } else if grid::at_most(per_min, 250.0) {
            Self::AtrialTachycardia
        } else if grid::at_most(per_min, 350.0) {
            Self::Flutter
        } else {
            Self::Fibrillation
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "< 60/min",
            Self::Normal => "60-100/min",
            Self::SinusTachycardia => "100-150/min",
            Self::AtrialTachycardia => "150-250/min",
            Self::Flutter => "250-350/min",
            Self::Fibrillation => "350-600/min",
        }
    }
}

/// Where the P-rate estimate came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PRateSource {
    PpInterval,
    VentricularRate,
}

/// P wave morphology in one lead against what a sinus P looks like there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPObservation {
    pub lead: Lead,
    pub morphology: PMorphology,
    pub expected: String,
    pub as_expected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentAnalysis {
    pub duration_s: Option<f64>,
    pub amplitude_mv: Option<f64>,
    pub duration_normal: Option<bool>,
    pub amplitude_normal: Option<bool>,
    pub axis_degrees: Option<f64>,
    pub origin: Assessment<AtrialOrigin>,
    pub rate_per_min: f64,
    pub rate_source: PRateSource,
    pub rate_band: PRateBand,
    pub observations: Vec<LeadPObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsentAnalysis {
    pub fibrillatory_waves: bool,
    pub flutter_waves: bool,
    pub atrial_rate_per_min: Option<f64>,
}

/// The two mutually exclusive shapes of the atrial result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrialActivity {
    Present(PresentAnalysis),
    Absent(AbsentAnalysis),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrialResult {
    pub activity: AtrialActivity,
    pub rhythm: Assessment<AtrialRhythm>,
    pub findings: Vec<Finding>,
    pub conflicts: Vec<Conflict>,
    pub indeterminate: Vec<Indeterminate>,
}

impl AtrialResult {
    pub fn is_fibrillation(&self) -> bool {
        self.rhythm.value() == Some(&AtrialRhythm::AtrialFibrillation)
    }

    pub fn p_waves_present(&self) -> bool {
        matches!(self.activity, AtrialActivity::Present(_))
    }
}

/// Step 2 entry point. Regularity is taken from the rate step.
pub fn classify_atrial(record: &EcgRecord, rate: &RateResult) -> AtrialResult {
    let result = match &record.p_waves {
        PWaveSet::Absent(absent) => classify_absent(absent, rate),
        PWaveSet::Present(present) => classify_present(present, rate),
    };
    tracing::debug!(
        rhythm = ?result.rhythm.value(),
        findings = result.findings.len(),
        conflicts = result.conflicts.len(),
        "Atrial activity classified"
    );
    result
}

// ---------------------------------------------------------------------------
// P waves absent
// ---------------------------------------------------------------------------

fn classify_absent(absent: &AbsentPWaves, rate: &RateResult) -> AtrialResult {
    let mut conflicts = Vec::new();
    let mut indeterminate = Vec::new();
    let atrial_rate = absent.atrial_rate_per_min;

    let rhythm = match (absent.fibrillatory_waves, absent.flutter_waves) {
        (true, true) => {
            conflicts.push(Conflict::new(
                ConflictKind::AtrialWaveAmbiguity,
                Step::Atrial,
                "Both fibrillatory and flutter waves reported in the baseline",
            ));
            match atrial_rate.map(PRateBand::from_rate) {
                Some(PRateBand::Flutter) => Assessment::determined(AtrialRhythm::AtrialFlutter),
                Some(PRateBand::Fibrillation) => {
                    Assessment::determined(AtrialRhythm::AtrialFibrillation)
                }
                _ => {
                    let reason = "f and F waves both reported with no atrial rate to separate them";
                    indeterminate.push(Indeterminate::new(Step::Atrial, "atrial_rhythm", reason));
                    Assessment::indeterminate(reason)
                }
            }
        }
        (true, false) => Assessment::determined(AtrialRhythm::AtrialFibrillation),
        (false, true) => Assessment::determined(AtrialRhythm::AtrialFlutter),
        (false, false) => Assessment::determined(AtrialRhythm::JunctionalOrVentricular),
    };

    match rhythm.value() {
        Some(AtrialRhythm::AtrialFibrillation) => {
            if let Some(r) = atrial_rate.filter(|r| grid::below(*r, 300.0) || grid::above(*r, 600.0))
            {
                conflicts.push(out_of_band(r, "fibrillatory", "300-600/min"));
            }
            if rate.regularity == Regularity::Regular {
                conflicts.push(Conflict::new(
                    ConflictKind::FibrillationWithRegularRhythm,
                    Step::Atrial,
                    "Fibrillatory baseline with a regular ventricular rhythm: \
                     consider complete heart block with an escape rhythm",
                ));
            }
        }
        Some(AtrialRhythm::AtrialFlutter) => {
            if let Some(r) = atrial_rate.filter(|r| grid::below(*r, 250.0) || grid::above(*r, 350.0))
            {
                conflicts.push(out_of_band(r, "flutter", "250-350/min"));
            }
        }
        _ => {}
    }

    let mut findings = Vec::new();
    if let Some(r) = rhythm.value() {
        let mut evidence = Evidence::new();
        if let Some(a) = atrial_rate {
            evidence = evidence.value("atrial_rate", a, "/min");
        }
        let mut finding = Finding::new(Diagnosis::AtrialRhythm(*r)).with_evidence(evidence);
        finding = match r {
            AtrialRhythm::AtrialFibrillation => finding
                .with_detail("Irregular fibrillatory baseline, no discrete P waves")
                .with_detail(format!("Ventricular response {:.0} bpm", rate.heart_rate_bpm)),
            AtrialRhythm::AtrialFlutter => finding
                .with_detail("Sawtooth flutter waves")
                .with_detail(format!("Ventricular response {:.0} bpm", rate.heart_rate_bpm)),
            _ => finding.with_detail("No P, f or F waves; hidden P waves not excluded"),
        };
        findings.push(finding);
    }

    AtrialResult {
        activity: AtrialActivity::Absent(AbsentAnalysis {
            fibrillatory_waves: absent.fibrillatory_waves,
            flutter_waves: absent.flutter_waves,
            atrial_rate_per_min: atrial_rate,
        }),
        rhythm,
        findings,
        conflicts,
        indeterminate,
    }
}

fn out_of_band(rate: f64, kind: &str, band: &str) -> Conflict {
    Conflict::new(
        ConflictKind::AtrialRateOutOfBand,
        Step::Atrial,
        format!(
            "Atrial rate {:.0}/min lies outside the {} band for {} waves",
            rate, band, kind
        ),
    )
    .with_evidence(Evidence::new().value("atrial_rate", rate, "/min"))
}

// ---------------------------------------------------------------------------
// P waves present
// ---------------------------------------------------------------------------

fn is_upright(m: PMorphology) -> bool {
    matches!(
        m,
        PMorphology::UprightSmooth | PMorphology::Notched | PMorphology::TallPeaked
    )
}

fn observe(present: &PresentPWaves) -> Vec<LeadPObservation> {
    present
        .morphology
        .iter()
        .filter_map(|(lead, m)| {
            let (expected, ok) = match lead {
                Lead::II => ("upright and smooth", *m == PMorphology::UprightSmooth),
                Lead::AVR => ("negative", *m == PMorphology::Inverted),
                Lead::I | Lead::AVL | Lead::V5 | Lead::V6 => ("upright", is_upright(*m)),
                Lead::V1 => (
                    "biphasic or upright, not tall",
                    matches!(m, PMorphology::Biphasic | PMorphology::UprightSmooth),
                ),
                _ => return None,
            };
            Some(LeadPObservation {
                lead: *lead,
                morphology: *m,
                expected: expected.to_string(),
                as_expected: ok,
            })
        })
        .collect()
}

fn origin_label(origin: AtrialOrigin) -> &'static str {
    match origin {
        AtrialOrigin::Sinus => "sinus",
        AtrialOrigin::LeftAtrial => "left atrial",
        AtrialOrigin::LowAtrial => "low atrial",
        AtrialOrigin::Ectopic => "ectopic",
    }
}

/// Origin of the P waves from polarity by lead, refined by the axis.
fn atrial_origin(present: &PresentPWaves) -> Result<(AtrialOrigin, Vec<String>), String> {
    let p = |lead: Lead| present.morphology.get(&lead).copied();
    let inverted = |lead: Lead| p(lead) == Some(PMorphology::Inverted);
    let mut notes = Vec::new();

    if inverted(Lead::I) && p(Lead::AVR).is_some_and(is_upright) {
        notes.push("P negative in I and positive in aVR".to_string());
        return Ok((AtrialOrigin::LeftAtrial, notes));
    }

    let inferior_reported: Vec<Lead> = [Lead::III, Lead::AVF]
        .into_iter()
        .filter(|l| p(*l).is_some())
        .collect();
    if inverted(Lead::II)
        && !inferior_reported.is_empty()
        && inferior_reported.iter().all(|l| inverted(*l))
    {
        notes.push("P negative in the inferior leads".to_string());
        return Ok((AtrialOrigin::LowAtrial, notes));
    }

    if p(Lead::AVR).is_some_and(is_upright) {
        notes.push("Positive P in aVR: ectopic rhythm or lead reversal".to_string());
        return Ok((AtrialOrigin::Ectopic, notes));
    }

    let axis_in_window = present
        .axis_degrees
        .map(|a| grid::at_least(a, SINUS_AXIS_MIN) && grid::at_most(a, SINUS_AXIS_MAX));

    match (p(Lead::II), axis_in_window) {
        (Some(m), Some(false)) if is_upright(m) => {
            notes.push("P axis outside 0 to +75 degrees".to_string());
            Ok((AtrialOrigin::Ectopic, notes))
        }
        (Some(m), _) if is_upright(m) => Ok((AtrialOrigin::Sinus, notes)),
        (Some(m), _) => {
            notes.push(format!("P in lead II is {}", m));
            Ok((AtrialOrigin::Ectopic, notes))
        }
        (None, Some(true)) => Ok((AtrialOrigin::Sinus, notes)),
        (None, Some(false)) => {
            notes.push("P axis outside 0 to +75 degrees".to_string());
            Ok((AtrialOrigin::Ectopic, notes))
        }
        (None, None) => Err("P morphology in lead II and P axis not reported".to_string()),
    }
}

fn classify_present(present: &PresentPWaves, rate: &RateResult) -> AtrialResult {
    let mut findings = Vec::new();
    let mut conflicts = Vec::new();
    let mut indeterminate = Vec::new();

    let (rate_per_min, rate_source) = match present.rate_per_min() {
        Some(r) => (r, PRateSource::PpInterval),
        None => (rate.heart_rate_bpm, PRateSource::VentricularRate),
    };
    let band = PRateBand::from_rate(rate_per_min);

    let (origin, origin_notes) = match atrial_origin(present) {
        Ok((o, notes)) => (Assessment::determined(o), notes),
        Err(reason) => {
            indeterminate.push(Indeterminate::new(Step::Atrial, "p_wave_origin", reason.clone()));
            (Assessment::indeterminate(reason), Vec::new())
        }
    };

    let mismatch = |what: &str| {
        Conflict::new(
            ConflictKind::PRateMorphologyMismatch,
            Step::Atrial,
            format!(
                "{} but the P rate of {:.0}/min falls in the {} band",
                what,
                rate_per_min,
                band.as_str()
            ),
        )
        .with_evidence(Evidence::new().value("p_rate", rate_per_min, "/min"))
    };

    let rhythm = match (origin.value(), band) {
        (_, PRateBand::Flutter) => {
            conflicts.push(mismatch("Discrete P waves reported"));
            Assessment::determined(AtrialRhythm::AtrialFlutter)
        }
        (_, PRateBand::Fibrillation) => {
            conflicts.push(mismatch("Discrete P waves reported"));
            Assessment::determined(AtrialRhythm::AtrialFibrillation)
        }
        (Some(AtrialOrigin::Sinus), PRateBand::AtrialTachycardia) => {
            conflicts.push(mismatch("P morphology is sinus"));
            Assessment::determined(AtrialRhythm::AtrialTachycardia)
        }
        (Some(AtrialOrigin::Sinus), PRateBand::Slow) => {
            Assessment::determined(AtrialRhythm::SinusBradycardia)
        }
        (Some(AtrialOrigin::Sinus), PRateBand::Normal) => {
            Assessment::determined(AtrialRhythm::NormalSinus)
        }
        (Some(AtrialOrigin::Sinus), PRateBand::SinusTachycardia) => {
            Assessment::determined(AtrialRhythm::SinusTachycardia)
        }
        (Some(_), PRateBand::AtrialTachycardia) => {
            Assessment::determined(AtrialRhythm::AtrialTachycardia)
        }
        (Some(o), PRateBand::SinusTachycardia) => {
            conflicts.push(mismatch(&format!("P morphology is {}", origin_label(*o))));
            Assessment::determined(AtrialRhythm::AtrialTachycardia)
        }
        (Some(o), PRateBand::Slow | PRateBand::Normal) => {
            conflicts.push(mismatch(&format!("P morphology is {}", origin_label(*o))));
            Assessment::determined(AtrialRhythm::EctopicAtrial { origin: *o })
        }
        (None, PRateBand::AtrialTachycardia) => {
            Assessment::determined(AtrialRhythm::AtrialTachycardia)
        }
        (None, _) => {
            let reason = format!(
                "P waves present at {:.0}/min but their origin cannot be established",
                rate_per_min
            );
            indeterminate.push(Indeterminate::new(Step::Atrial, "atrial_rhythm", reason.clone()));
            Assessment::indeterminate(reason)
        }
    };

    let observations = observe(present);

    if let Some(r) = rhythm.value() {
        let mut evidence = Evidence::new()
            .leads(present.morphology.keys().copied())
            .value("p_rate", rate_per_min, "/min");
        if let Some(axis) = present.axis_degrees {
            evidence = evidence.value("p_axis", axis, "deg");
        }
        let mut finding = Finding::new(Diagnosis::AtrialRhythm(*r))
            .with_evidence(evidence)
            .with_details(origin_notes.clone());
        if rate_source == PRateSource::VentricularRate {
            finding = finding.with_detail("P-P interval not reported; ventricular rate used");
        }
        for obs in observations.iter().filter(|o| !o.as_expected) {
            finding = finding.with_detail(format!(
                "P in {} is {}, expected {}",
                obs.lead, obs.morphology, obs.expected
            ));
        }
        findings.push(finding);
    }

    findings.extend(enlargement(present));

    let duration_normal = present
        .duration_s
        .map(|d| grid::below(d, P_DURATION_LIMIT_S));
    let amplitude_normal = present
        .amplitude_mv
        .map(|a| grid::at_most(a, grid::mv(P_AMPLITUDE_LIMIT_MM)));

    AtrialResult {
        activity: AtrialActivity::Present(PresentAnalysis {
            duration_s: present.duration_s,
            amplitude_mv: present.amplitude_mv,
            duration_normal,
            amplitude_normal,
            axis_degrees: present.axis_degrees,
            origin,
            rate_per_min,
            rate_source,
            rate_band: band,
            observations,
        }),
        rhythm,
        findings,
        conflicts,
        indeterminate,
    }
}

/// Left and right atrial enlargement from P morphology.
fn enlargement(present: &PresentPWaves) -> Vec<Finding> {
    let mut findings = Vec::new();
    let p = |lead: Lead| present.morphology.get(&lead).copied();
    let prolonged = present
        .duration_s
        .filter(|d| grid::at_least(*d, P_DURATION_LIMIT_S));

    let v1_lae = present.v1_terminal.filter(|t| {
        grid::above(t.depth_mv, grid::mv(V1_TERMINAL_DEPTH_MM))
            && grid::above(t.duration_s, V1_TERMINAL_WIDTH_S)
    });
    let ii_abnormal = p(Lead::II).filter(|m| matches!(m, PMorphology::Notched | PMorphology::Biphasic));

    if let Some(t) = v1_lae {
        let mut f = Finding::new(Diagnosis::AtrialEnlargement(AtrialEnlargement::Left))
            .with_evidence(
                Evidence::new()
                    .lead(Lead::V1)
                    .value("v1_terminal_depth", grid::standard_mm(t.depth_mv), "mm")
                    .value("v1_terminal_width", t.duration_s, "s"),
            )
            .with_detail("Deep, broad terminal negativity of the P wave in V1");
        if let Some(m) = ii_abnormal {
            f = f.with_detail(format!("{} P wave in lead II", m));
        }
        if let Some(d) = prolonged {
            f = f.with_detail(format!("P duration {:.2} s", d));
        }
        findings.push(f);
    } else if ii_abnormal.is_some() || prolonged.is_some() {
        let mut f = Finding::new(Diagnosis::AtrialEnlargement(AtrialEnlargement::PossibleLeft));
        let mut evidence = Evidence::new();
        if let Some(m) = ii_abnormal {
            evidence = evidence.lead(Lead::II);
            f = f.with_detail(format!("{} P wave in lead II", m));
        }
        if let Some(d) = prolonged {
            evidence = evidence.value("p_duration", d, "s");
            f = f.with_detail(format!("P duration {:.2} s (normal < 0.12 s)", d));
        }
        findings.push(f.with_evidence(evidence));
    }

    let tall_ii = p(Lead::II) == Some(PMorphology::TallPeaked)
        || present
            .amplitude_mv
            .is_some_and(|a| grid::above(a, grid::mv(P_AMPLITUDE_LIMIT_MM)));
    let tall_v1 = p(Lead::V1) == Some(PMorphology::TallPeaked);
    if tall_ii || tall_v1 {
        let mut evidence = Evidence::new();
        let mut f = Finding::new(Diagnosis::AtrialEnlargement(AtrialEnlargement::Right));
        if tall_ii {
            evidence = evidence.lead(Lead::II);
            f = f.with_detail("Tall peaked P wave in lead II (> 2.5 mm)");
        }
        if tall_v1 {
            evidence = evidence.lead(Lead::V1);
            f = f.with_detail("Tall positive P wave in V1");
        }
        if let Some(a) = present.amplitude_mv {
            evidence = evidence.value("p_amplitude", grid::standard_mm(a), "mm");
        }
        findings.push(f.with_evidence(evidence));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::interpretation::fixtures::{normal_document, record};
    use crate::interpretation::rate::classify_rate;
    use crate::models::document::{AtrialInput, BaselineInput, RhythmInput, V1TerminalInput};
    use crate::models::MeasurementDocument;

    fn run(doc: &MeasurementDocument) -> AtrialResult {
        let rec = record(doc);
        let rate = classify_rate(&rec, &InterpreterConfig::default());
        classify_atrial(&rec, &rate)
    }

    fn absent_doc(fib: bool, flutter: bool, rate: Option<f64>) -> MeasurementDocument {
        let mut doc = normal_document();
        doc.atrial = Some(AtrialInput {
            p_waves_present: Some(false),
            baseline: Some(BaselineInput {
                fibrillatory_waves: fib,
                flutter_waves: flutter,
                atrial_rate_per_min: rate,
            }),
            ..Default::default()
        });
        doc.rhythm = Some(RhythmInput {
            rr_small_squares: None,
            qrs_count_6s: Some(11),
            regularity: Some(Regularity::IrregularlyIrregular),
        });
        doc
    }

    fn with_p_rate(pp_small_squares: f64) -> MeasurementDocument {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.pp_small_squares = Some(pp_small_squares);
        }
        doc
    }

    #[test]
    fn normal_document_is_normal_sinus() {
        let r = run(&normal_document());
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::NormalSinus));
        assert!(r.conflicts.is_empty());
        assert!(r.p_waves_present());
        assert_eq!(r.findings.len(), 1);
        match &r.activity {
            AtrialActivity::Present(p) => {
                assert_eq!(p.origin.value(), Some(&AtrialOrigin::Sinus));
                assert_eq!(p.duration_normal, Some(true));
                assert_eq!(p.amplitude_normal, Some(true));
                assert!(p.observations.iter().all(|o| o.as_expected));
            }
            AtrialActivity::Absent(_) => panic!("expected present"),
        }
    }

    #[test]
    fn fibrillatory_baseline_is_af() {
        let r = run(&absent_doc(true, false, Some(450.0)));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::AtrialFibrillation));
        assert!(r.conflicts.is_empty());
        assert!(r.is_fibrillation());
        assert!(matches!(r.activity, AtrialActivity::Absent(_)));
    }

    #[test]
    fn flutter_baseline_is_flutter() {
        let r = run(&absent_doc(false, true, Some(300.0)));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::AtrialFlutter));
    }

    #[test]
    fn empty_baseline_defers_to_ventricle() {
        let r = run(&absent_doc(false, false, None));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::JunctionalOrVentricular));
    }

    #[test]
    fn fibrillation_rate_out_of_band_is_conflict() {
        let r = run(&absent_doc(true, false, Some(200.0)));
        assert_eq!(r.conflicts[0].kind, ConflictKind::AtrialRateOutOfBand);
    }

    #[test]
    fn both_wave_kinds_is_conflict_resolved_by_rate() {
        let r = run(&absent_doc(true, true, Some(300.0)));
        assert_eq!(r.conflicts[0].kind, ConflictKind::AtrialWaveAmbiguity);
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::AtrialFlutter));

        let r = run(&absent_doc(true, true, None));
        assert!(!r.rhythm.is_determined());
        assert_eq!(r.indeterminate.len(), 1);
    }

    #[test]
    fn fibrillation_with_regular_rhythm_is_conflict() {
        let mut doc = absent_doc(true, false, None);
        doc.rhythm = Some(RhythmInput {
            rr_small_squares: Some(40.0),
            qrs_count_6s: None,
            regularity: Some(Regularity::Regular),
        });
        let r = run(&doc);
        assert!(r
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::FibrillationWithRegularRhythm));
    }

    #[test]
    fn p_rate_bands() {
        assert_eq!(PRateBand::from_rate(59.0), PRateBand::Slow);
        assert_eq!(PRateBand::from_rate(60.0), PRateBand::Normal);
        assert_eq!(PRateBand::from_rate(100.0), PRateBand::Normal);
        assert_eq!(PRateBand::from_rate(150.0), PRateBand::SinusTachycardia);
        assert_eq!(PRateBand::from_rate(250.0), PRateBand::AtrialTachycardia);
        assert_eq!(PRateBand::from_rate(300.0), PRateBand::Flutter);
        assert_eq!(PRateBand::from_rate(450.0), PRateBand::Fibrillation);
    }

    #[test]
    fn sinus_bands() {
        let r = run(&with_p_rate(30.0));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::SinusBradycardia));
        let r = run(&with_p_rate(12.0));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::SinusTachycardia));
    }

    #[test]
    fn sinus_morphology_at_atrial_tachycardia_rate_is_conflict() {
        let r = run(&with_p_rate(8.0));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::AtrialTachycardia));
        assert_eq!(r.conflicts.len(), 1);
        assert_eq!(r.conflicts[0].kind, ConflictKind::PRateMorphologyMismatch);
    }

    #[test]
    fn negative_inferior_p_is_low_atrial() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.morphology.insert(Lead::II, PMorphology::Inverted);
            a.morphology.insert(Lead::III, PMorphology::Inverted);
            a.morphology.insert(Lead::AVF, PMorphology::Inverted);
        }
        let r = run(&doc);
        assert_eq!(
            r.rhythm.value(),
            Some(&AtrialRhythm::EctopicAtrial {
                origin: AtrialOrigin::LowAtrial
            })
        );
        // 75/min sits in the sinus band: the disagreement is surfaced.
        assert_eq!(r.conflicts.len(), 1);
        assert_eq!(r.conflicts[0].kind, ConflictKind::PRateMorphologyMismatch);
        assert!(r.conflicts[0].description.starts_with("P morphology is low atrial"));
    }

    #[test]
    fn ectopic_morphology_at_sinus_tachycardia_rate_is_conflict() {
        let mut doc = normal_document();
        doc.rhythm = Some(RhythmInput {
            rr_small_squares: Some(12.0),
            qrs_count_6s: None,
            regularity: Some(Regularity::Regular),
        });
        if let Some(a) = doc.atrial.as_mut() {
            a.pp_small_squares = Some(12.0);
            a.morphology.insert(Lead::AVR, PMorphology::UprightSmooth);
        }
        let r = run(&doc);
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::AtrialTachycardia));
        assert_eq!(r.conflicts.len(), 1);
        assert_eq!(r.conflicts[0].kind, ConflictKind::PRateMorphologyMismatch);
    }

    #[test]
    fn negative_i_positive_avr_is_left_atrial() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.morphology.insert(Lead::I, PMorphology::Inverted);
            a.morphology.insert(Lead::AVR, PMorphology::UprightSmooth);
        }
        let r = run(&doc);
        assert_eq!(
            r.rhythm.value(),
            Some(&AtrialRhythm::EctopicAtrial {
                origin: AtrialOrigin::LeftAtrial
            })
        );
    }

    #[test]
    fn v1_terminal_negativity_is_lae() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.v1_terminal_negativity = Some(V1TerminalInput {
                depth_mm: 1.5,
                width_small_squares: 1.5,
            });
            a.morphology.insert(Lead::II, PMorphology::Notched);
        }
        let r = run(&doc);
        let lae: Vec<_> = r
            .findings
            .iter()
            .filter(|f| matches!(f.diagnosis, Diagnosis::AtrialEnlargement(_)))
            .collect();
        assert_eq!(lae.len(), 1);
        assert_eq!(
            lae[0].diagnosis,
            Diagnosis::AtrialEnlargement(AtrialEnlargement::Left)
        );
    }

    #[test]
    fn notched_ii_alone_is_possible_lae() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.morphology.insert(Lead::II, PMorphology::Notched);
        }
        let r = run(&doc);
        assert!(r.findings.iter().any(|f| f.diagnosis
            == Diagnosis::AtrialEnlargement(AtrialEnlargement::PossibleLeft)));
        assert_eq!(r.rhythm.value(), Some(&AtrialRhythm::NormalSinus));
    }

    #[test]
    fn tall_p_is_rae() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.amplitude_mm = Some(3.0);
        }
        let r = run(&doc);
        assert!(r
            .findings
            .iter()
            .any(|f| f.diagnosis == Diagnosis::AtrialEnlargement(AtrialEnlargement::Right)));
        match &r.activity {
            AtrialActivity::Present(p) => assert_eq!(p.amplitude_normal, Some(false)),
            AtrialActivity::Absent(_) => panic!("expected present"),
        }
    }

    #[test]
    fn missing_morphology_and_axis_is_indeterminate_origin() {
        let mut doc = normal_document();
        if let Some(a) = doc.atrial.as_mut() {
            a.morphology.clear();
            a.axis_degrees = None;
        }
        let r = run(&doc);
        assert!(!r.rhythm.is_determined());
        assert!(r.indeterminate.iter().any(|i| i.aspect == "p_wave_origin"));
    }
}
