use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{grid, EcgRecord, Lead, MeasurementDocument, ValidationError};
use crate::report::Report;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Clinical urgency of a finding. The report's overall severity is the
/// maximum over its findings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Benign,
    Monitor,
    Urgent,
    Emergent,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::Monitor => "monitor",
            Self::Urgent => "urgent",
            Self::Emergent => "emergent",
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Rate,
    Atrial,
    Conduction,
    Ventricular,
    Repolarization,
    Fibrillation,
    Synthesis,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Atrial => "atrial",
            Self::Conduction => "conduction",
            Self::Ventricular => "ventricular",
            Self::Repolarization => "repolarization",
            Self::Fibrillation => "fibrillation",
            Self::Synthesis => "synthesis",
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnosis variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RateClass {
    Bradycardia,
    Normal,
    Tachycardia,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AtrialOrigin {
    Sinus,
    LeftAtrial,
    LowAtrial,
    Ectopic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AtrialRhythm {
    NormalSinus,
    SinusBradycardia,
    SinusTachycardia,
    EctopicAtrial { origin: AtrialOrigin },
    AtrialTachycardia,
    AtrialFlutter,
    AtrialFibrillation,
    /// No atrial activity; settled by QRS width during synthesis.
    JunctionalOrVentricular,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AtrialEnlargement {
    Left,
    PossibleLeft,
    Right,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConductionClass {
    Normal,
    /// Short PR without a delta wave: enhanced AV conduction or junctional.
    ShortPr,
    /// Short PR with a delta wave; QRS confirmation is made downstream.
    PreExcitation,
    FirstDegreeAvBlock,
    MobitzI,
    MobitzII,
    TwoToOneAvBlock,
    HighGradeAvBlock { ratio: u32 },
    CompleteHeartBlock,
    /// More QRS complexes than P waves.
    JunctionalOrVentricularEscape,
    /// No discrete atrial activity to relate to the QRS.
    NoAtrialActivity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrSegmentFinding {
    PericarditisPattern,
    AtrialInfarctionPattern,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FascicularBlock {
    LeftAnterior,
    LeftPosterior,
}

/// Wide (or borderline) QRS mechanisms. Closed and mutually exclusive: a
/// complex carries at most one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VentricularPattern {
    Paced,
    VentricularTachycardia,
    IdioventricularRhythm,
    Wpw,
    Lbbb { strauss: bool },
    Rbbb { fascicular: Option<FascicularBlock> },
    IncompleteRbbb,
    NonspecificIvcd,
}

impl VentricularPattern {
    pub fn is_bundle_branch_block(&self) -> bool {
        matches!(self, Self::Lbbb { .. } | Self::Rbbb { .. })
    }

    /// Patterns whose repolarization is expected to run opposite the QRS.
    pub fn has_secondary_repolarization(&self) -> bool {
        matches!(
            self,
            Self::Lbbb { .. } | Self::Rbbb { .. } | Self::Paced | Self::Wpw
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InfarctTerritory {
    Inferior,
    Anterior,
    Lateral,
    Posterior,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RProgression {
    Normal,
    Poor,
    EarlyTransition,
    LateTransition,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Hypertrophy {
    LvhByVoltage,
    Rvh,
    /// Advisory voltage hint that survives an LBBB.
    PossibleLvhInLbbb,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AxisDeviation {
    Normal,
    Left,
    Right,
    Extreme,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StemiTerritory {
    Inferior,
    Anterior,
    Lateral,
    Anterolateral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StFinding {
    Stemi { territory: StemiTerritory, reciprocal: bool },
    /// Concave elevation: early repolarization or pericarditis.
    ConcaveElevation,
    Pericarditis,
    LeftMainOrMultivessel,
    PosteriorMi,
    IschemicDepression { diffuse: bool },
    RateRelatedDepression,
    /// Discordant shift expected from the QRS mechanism.
    SecondaryToConduction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TFinding {
    Wellens,
    InferiorIschemia,
    LateralIschemia,
    NonspecificInversion,
    Peaked,
    Flattened,
    Biphasic,
    Tall,
    SecondaryToConduction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TorsadesRisk {
    Elevated,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QtClass {
    Normal,
    Prolonged { torsades: TorsadesRisk },
    Short,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UFinding {
    Absent,
    Normal,
    Prominent,
    Inverted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FibrillationChamber {
    SupportiveLae,
    SupportiveRae,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EscapeRhythm {
    Junctional,
    Ventricular,
}

/// Every diagnostic category the engine can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "category", content = "value", rename_all = "snake_case")]
pub enum Diagnosis {
    Rate(RateClass),
    AtrialRhythm(AtrialRhythm),
    AtrialEnlargement(AtrialEnlargement),
    Conduction(ConductionClass),
    PrSegment(PrSegmentFinding),
    VentricularPattern(VentricularPattern),
    QWaveInfarct(InfarctTerritory),
    RProgression(RProgression),
    Hypertrophy(Hypertrophy),
    Axis(AxisDeviation),
    StSegment(StFinding),
    TWave(TFinding),
    Qt(QtClass),
    UWave(UFinding),
    ChamberEnlargement(FibrillationChamber),
    EscapeRhythm(EscapeRhythm),
}

impl Diagnosis {
    /// Severity a finding of this kind carries before any override.
    pub fn severity(&self) -> Severity {
        use Severity::*;
        match self {
            Self::Rate(RateClass::Normal) => Benign,
            Self::Rate(_) => Monitor,
            Self::AtrialRhythm(r) => match r {
                AtrialRhythm::NormalSinus => Benign,
                AtrialRhythm::SinusBradycardia
                | AtrialRhythm::SinusTachycardia
                | AtrialRhythm::EctopicAtrial { .. }
                | AtrialRhythm::JunctionalOrVentricular => Monitor,
                AtrialRhythm::AtrialTachycardia
                | AtrialRhythm::AtrialFlutter
                | AtrialRhythm::AtrialFibrillation => Urgent,
            },
            Self::AtrialEnlargement(_) => Monitor,
            Self::Conduction(c) => match c {
                ConductionClass::Normal
                | ConductionClass::FirstDegreeAvBlock
                | ConductionClass::NoAtrialActivity => Benign,
                ConductionClass::ShortPr
                | ConductionClass::PreExcitation
                | ConductionClass::MobitzI
                | ConductionClass::JunctionalOrVentricularEscape => Monitor,
                ConductionClass::MobitzII
                | ConductionClass::TwoToOneAvBlock
                | ConductionClass::HighGradeAvBlock { .. } => Urgent,
                ConductionClass::CompleteHeartBlock => Emergent,
            },
            Self::PrSegment(_) => Monitor,
            Self::VentricularPattern(p) => match p {
                VentricularPattern::Paced | VentricularPattern::IncompleteRbbb => Benign,
                VentricularPattern::Lbbb { .. }
                | VentricularPattern::Rbbb { .. }
                | VentricularPattern::NonspecificIvcd
                | VentricularPattern::Wpw => Monitor,
                VentricularPattern::IdioventricularRhythm => Urgent,
                VentricularPattern::VentricularTachycardia => Emergent,
            },
            Self::QWaveInfarct(InfarctTerritory::Posterior) => Urgent,
            Self::QWaveInfarct(_) => Monitor,
            Self::RProgression(RProgression::Normal) => Benign,
            Self::RProgression(_) => Monitor,
            Self::Hypertrophy(_) => Monitor,
            Self::Axis(AxisDeviation::Normal) => Benign,
            Self::Axis(_) => Monitor,
            Self::StSegment(s) => match s {
                StFinding::Stemi { .. }
                | StFinding::LeftMainOrMultivessel
                | StFinding::PosteriorMi => Emergent,
                StFinding::Pericarditis | StFinding::IschemicDepression { .. } => Urgent,
                StFinding::ConcaveElevation => Monitor,
                StFinding::RateRelatedDepression | StFinding::SecondaryToConduction => Benign,
            },
            Self::TWave(t) => match t {
                TFinding::Wellens | TFinding::InferiorIschemia | TFinding::LateralIschemia => {
                    Urgent
                }
                TFinding::NonspecificInversion
                | TFinding::Peaked
                | TFinding::Flattened
                | TFinding::Biphasic
                | TFinding::Tall => Monitor,
                TFinding::SecondaryToConduction => Benign,
            },
            Self::Qt(q) => match q {
                QtClass::Normal => Benign,
                QtClass::Prolonged {
                    torsades: TorsadesRisk::High,
                } => Urgent,
                QtClass::Prolonged { .. } | QtClass::Short => Monitor,
            },
            Self::UWave(UFinding::Absent | UFinding::Normal) => Benign,
            Self::UWave(_) => Monitor,
            Self::ChamberEnlargement(_) => Monitor,
            Self::EscapeRhythm(EscapeRhythm::Junctional) => Monitor,
            Self::EscapeRhythm(EscapeRhythm::Ventricular) => Urgent,
        }
    }
}

// ---------------------------------------------------------------------------
// Evidence & Finding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredValue {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// Which leads and which measured values support a finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub leads: Vec<Lead>,
    pub values: Vec<MeasuredValue>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lead(mut self, lead: Lead) -> Self {
        if !self.leads.contains(&lead) {
            self.leads.push(lead);
        }
        self
    }

    pub fn leads(self, leads: impl IntoIterator<Item = Lead>) -> Self {
        leads.into_iter().fold(self, |ev, l| ev.lead(l))
    }

    pub fn value(mut self, name: &str, value: f64, unit: &str) -> Self {
        self.values.push(MeasuredValue {
            name: name.to_string(),
            value: grid::round_to(value, 3),
            unit: unit.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty() && self.values.is_empty()
    }
}

/// One diagnosis with its severity and support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub diagnosis: Diagnosis,
    pub severity: Severity,
    pub evidence: Evidence,
    /// Criteria met, supportive features, caveats.
    pub details: Vec<String>,
    /// Differential causes for the pattern.
    pub differential: Vec<String>,
    /// For ST and T findings: whether the shift runs opposite the QRS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discordant: Option<bool>,
}

impl Finding {
    pub fn new(diagnosis: Diagnosis) -> Self {
        Self {
            severity: diagnosis.severity(),
            diagnosis,
            evidence: Evidence::default(),
            details: Vec::new(),
            differential: Vec::new(),
            discordant: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_details<S: Into<String>>(mut self, details: impl IntoIterator<Item = S>) -> Self {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    pub fn with_differential(mut self, causes: &[&str]) -> Self {
        self.differential = causes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_discordance(mut self, discordant: bool) -> Self {
        self.discordant = Some(discordant);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

// ---------------------------------------------------------------------------
// Conflicts & indeterminacy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    RateMethodDisagreement,
    PRateMorphologyMismatch,
    AtrialWaveAmbiguity,
    AtrialRateOutOfBand,
    FibrillationWithRegularRhythm,
    AxisQuadrantMismatch,
    PreExcitationUnconfirmed,
}

/// Evidence pointing two ways, surfaced instead of resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub step: Step,
    pub description: String,
    pub evidence: Evidence,
}

impl Conflict {
    pub fn new(kind: ConflictKind, step: Step, description: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            description: description.into(),
            evidence: Evidence::default(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }
}

/// A leaf assessment that could not be made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indeterminate {
    pub step: Step,
    pub aspect: String,
    pub reason: String,
}

impl Indeterminate {
    pub fn new(step: Step, aspect: &str, reason: impl Into<String>) -> Self {
        Self {
            step,
            aspect: aspect.to_string(),
            reason: reason.into(),
        }
    }
}

/// Outcome of one classification: a value, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Assessment<T> {
    Determined { value: T },
    Indeterminate { reason: String },
}

impl<T> Assessment<T> {
    pub fn determined(value: T) -> Self {
        Self::Determined { value }
    }

    pub fn indeterminate(reason: impl Into<String>) -> Self {
        Self::Indeterminate {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Determined { value } => Some(value),
            Self::Indeterminate { .. } => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        matches!(self, Self::Determined { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Determined { .. } => None,
            Self::Indeterminate { reason } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// InterpretError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("Invalid measurement document: {0}")]
    Validation(#[from] ValidationError),

    #[error("Measurement document parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Interpretation branch '{branch}' failed to complete: {reason}")]
    BranchJoin { branch: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// EcgInterpreter trait
// ---------------------------------------------------------------------------

/// The main interpretation engine trait.
pub trait EcgInterpreter {
    /// Validate a measurement document and interpret it.
    fn interpret(&self, document: &MeasurementDocument) -> Result<Report, InterpretError>;

    /// Interpret an already-validated record. Never fails: missing data
    /// becomes indeterminate findings inside the report.
    fn interpret_record(&self, record: &EcgRecord) -> Report;
}
