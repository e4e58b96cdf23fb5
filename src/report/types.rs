use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::config::APP_VERSION;
use crate::interpretation::atrial::{AbsentAnalysis, AtrialActivity, PresentAnalysis};
use crate::interpretation::conduction::ConductionResult;
use crate::interpretation::fibrillation::FibrillationResult;
use crate::interpretation::rate::RateResult;
use crate::interpretation::repolarization::{QtResult, StResult, TWaveResult, UWaveResult};
use crate::interpretation::synthesis::{StepOutputs, Synthesis};
use crate::interpretation::types::{
    Assessment, AtrialRhythm, Conflict, Finding, Severity, Step,
};
use crate::interpretation::ventricular::VentricularResult;
use crate::models::{grid, EcgRecord, Lead, Regularity};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Calibration and the grid-derived intervals every step works from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMeasurements {
    pub paper_speed_mm_per_s: f64,
    pub gain_mm_per_mv: f64,
    pub seconds_per_small_square: f64,
    pub standard_calibration: bool,
    pub rr_small_squares: Option<f64>,
    pub rr_seconds: Option<f64>,
    pub qrs_count_6s: Option<u32>,
    pub regularity: Regularity,
    pub qrs_duration_s: f64,
    pub qt_s: Option<f64>,
    pub leads_measured: Vec<Lead>,
    pub leads_unreadable: Vec<Lead>,
}

impl GridMeasurements {
    fn from_record(record: &EcgRecord) -> Self {
        let round = |v: f64| grid::round_to(v, 3);
        Self {
            paper_speed_mm_per_s: record.calibration.paper_speed_mm_per_s,
            gain_mm_per_mv: record.calibration.gain_mm_per_mv,
            seconds_per_small_square: round(record.calibration.seconds_per_small_square()),
            standard_calibration: record.calibration.is_standard(),
            rr_small_squares: record.rhythm.small_squares,
            rr_seconds: record.rhythm.seconds.map(round),
            qrs_count_6s: record.rhythm.qrs_count_6s,
            regularity: record.rhythm.regularity,
            qrs_duration_s: round(record.qrs.duration_s),
            qt_s: record.qt_s.map(round),
            leads_measured: record.leads.keys().copied().collect(),
            leads_unreadable: record.unreadable.keys().copied().collect(),
        }
    }
}

/// One step's analysis and the findings that survived synthesis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSection<T> {
    pub analysis: T,
    pub findings: Vec<Finding>,
}

/// Step 2. Exactly one of `ifPresent` / `ifAbsent` is serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PWaveSection {
    #[serde(rename = "ifPresent", skip_serializing_if = "Option::is_none")]
    pub if_present: Option<PresentAnalysis>,
    #[serde(rename = "ifAbsent", skip_serializing_if = "Option::is_none")]
    pub if_absent: Option<AbsentAnalysis>,
    pub rhythm: Assessment<AtrialRhythm>,
    pub conflicts: Vec<Conflict>,
    pub findings: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The complete stepwise interpretation of one tracing. Immutable once
/// assembled; read it through the accessors or serialize it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    id: Uuid,
    engine_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recorded_at: Option<NaiveDateTime>,
    #[serde(rename = "gridMeasurements")]
    grid_measurements: GridMeasurements,
    #[serde(rename = "step1_heartRate")]
    heart_rate: StepSection<RateResult>,
    #[serde(rename = "step2_pWaveAnalysis")]
    p_waves: PWaveSection,
    #[serde(rename = "step3_conduction")]
    conduction: StepSection<ConductionResult>,
    #[serde(rename = "step4_qrsAnalysis")]
    qrs: StepSection<VentricularResult>,
    #[serde(rename = "step5_stSegment")]
    st_segment: StepSection<StResult>,
    #[serde(rename = "step6_tWave")]
    t_wave: StepSection<TWaveResult>,
    #[serde(rename = "step7_qtInterval")]
    qt_interval: StepSection<QtResult>,
    #[serde(rename = "step8_uWave")]
    u_wave: StepSection<UWaveResult>,
    #[serde(
        rename = "step9_fibrillationChambers",
        skip_serializing_if = "Option::is_none"
    )]
    fibrillation_chambers: Option<StepSection<FibrillationResult>>,
    #[serde(rename = "finalSynthesis")]
    synthesis: Synthesis,
}

/// Synthesized findings of one step, optionally narrowed by diagnosis kind.
fn surviving(synthesis: &Synthesis, step: Step, keep: impl Fn(&Finding) -> bool) -> Vec<Finding> {
    synthesis
        .findings_for(step)
        .filter(|f| keep(*f))
        .cloned()
        .collect()
}

impl Report {
    pub(crate) fn assemble(record: &EcgRecord, outputs: StepOutputs, synthesis: Synthesis) -> Self {
        use crate::interpretation::types::Diagnosis as D;

        let StepOutputs {
            rate,
            atrial,
            conduction,
            ventricular,
            repolarization,
            fibrillation,
        } = outputs;

        let (if_present, if_absent) = match atrial.activity {
            AtrialActivity::Present(p) => (Some(p), None),
            AtrialActivity::Absent(a) => (None, Some(a)),
        };
        let p_waves = PWaveSection {
            if_present,
            if_absent,
            rhythm: atrial.rhythm,
            conflicts: atrial.conflicts,
            findings: surviving(&synthesis, Step::Atrial, |_| true),
        };

        let repolarization_findings = |keep: fn(&D) -> bool| {
            surviving(&synthesis, Step::Repolarization, move |f| keep(&f.diagnosis))
        };

        Self {
            id: record.fingerprint,
            engine_version: APP_VERSION.to_string(),
            recorded_at: record.recorded_at,
            grid_measurements: GridMeasurements::from_record(record),
            heart_rate: StepSection {
                analysis: rate,
                findings: surviving(&synthesis, Step::Rate, |_| true),
            },
            p_waves,
            conduction: StepSection {
                analysis: conduction,
                findings: surviving(&synthesis, Step::Conduction, |_| true),
            },
            qrs: StepSection {
                analysis: ventricular,
                findings: surviving(&synthesis, Step::Ventricular, |_| true),
            },
            st_segment: StepSection {
                analysis: repolarization.st,
                findings: repolarization_findings(|d| matches!(d, D::StSegment(_))),
            },
            t_wave: StepSection {
                analysis: repolarization.t_wave,
                findings: repolarization_findings(|d| matches!(d, D::TWave(_))),
            },
            qt_interval: StepSection {
                analysis: repolarization.qt,
                findings: repolarization_findings(|d| matches!(d, D::Qt(_))),
            },
            u_wave: StepSection {
                analysis: repolarization.u_wave,
                findings: repolarization_findings(|d| matches!(d, D::UWave(_))),
            },
            fibrillation_chambers: fibrillation.map(|analysis| StepSection {
                analysis,
                findings: surviving(&synthesis, Step::Fibrillation, |_| true),
            }),
            synthesis,
        }
    }

    /// Deterministic: the same document always yields the same id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        self.recorded_at
    }

    pub fn grid_measurements(&self) -> &GridMeasurements {
        &self.grid_measurements
    }

    pub fn heart_rate(&self) -> &StepSection<RateResult> {
        &self.heart_rate
    }

    pub fn p_waves(&self) -> &PWaveSection {
        &self.p_waves
    }

    pub fn conduction(&self) -> &StepSection<ConductionResult> {
        &self.conduction
    }

    pub fn qrs(&self) -> &StepSection<VentricularResult> {
        &self.qrs
    }

    pub fn st_segment(&self) -> &StepSection<StResult> {
        &self.st_segment
    }

    pub fn t_wave(&self) -> &StepSection<TWaveResult> {
        &self.t_wave
    }

    pub fn qt_interval(&self) -> &StepSection<QtResult> {
        &self.qt_interval
    }

    pub fn u_wave(&self) -> &StepSection<UWaveResult> {
        &self.u_wave
    }

    /// Present only when the rhythm is atrial fibrillation.
    pub fn fibrillation_chambers(&self) -> Option<&StepSection<FibrillationResult>> {
        self.fibrillation_chambers.as_ref()
    }

    pub fn synthesis(&self) -> &Synthesis {
        &self.synthesis
    }

    pub fn impression(&self) -> &[String] {
        &self.synthesis.impression
    }

    pub fn overall_severity(&self) -> Severity {
        self.synthesis.overall_severity
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.synthesis.conflicts
    }

    /// Whether every leaf assessment was determined.
    pub fn is_complete(&self) -> bool {
        self.synthesis.complete
    }

    /// All findings that survived synthesis, in step order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.synthesis.findings.iter().map(|f| &f.finding)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpretation::fixtures::{lbbb_document, normal_document};
    use crate::interpretation::types::{Diagnosis, Hypertrophy, RateClass};
    use crate::interpretation::{DefaultInterpreter, EcgInterpreter};

    #[test]
    fn sections_carry_surviving_findings() {
        let report = DefaultInterpreter::default()
            .interpret(&normal_document())
            .unwrap();
        assert_eq!(
            report.heart_rate().findings[0].diagnosis,
            Diagnosis::Rate(RateClass::Normal)
        );
        assert!(report.p_waves().if_present.is_some());
        assert!(report.p_waves().if_absent.is_none());
        assert_eq!(report.qt_interval().findings.len(), 1);
        assert!(report.st_segment().findings.is_empty());
    }

    #[test]
    fn overridden_findings_leave_their_section() {
        let report = DefaultInterpreter::default()
            .interpret(&lbbb_document())
            .unwrap();
        let lvh = Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage);
        assert!(report.qrs().analysis.findings.iter().any(|f| f.diagnosis == lvh));
        assert!(!report.qrs().findings.iter().any(|f| f.diagnosis == lvh));
    }

    #[test]
    fn grid_measurements_are_in_seconds() {
        let report = DefaultInterpreter::default()
            .interpret(&normal_document())
            .unwrap();
        let grid = report.grid_measurements();
        assert_eq!(grid.seconds_per_small_square, 0.04);
        assert_eq!(grid.rr_seconds, Some(0.8));
        assert_eq!(grid.qrs_duration_s, 0.08);
        assert!(grid.standard_calibration);
        assert_eq!(grid.leads_measured.len(), 12);
    }
}
