use serde::{Deserialize, Serialize};

use crate::models::{grid, AvRelationship, EcgRecord, Lead, PrPattern};

use super::helpers::{lead_list, INFERIOR};
use super::types::*;

/// PR interval bounds, seconds. Short is strictly below the lower bound.
pub const PR_SHORT_BELOW_S: f64 = 0.12;
pub const PR_NORMAL_MAX_S: f64 = 0.20;
/// PR segment shift that counts (standard mm).
const PR_SEGMENT_THRESHOLD_MM: f64 = 0.5;

/// P waves per QRS complex.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PQrsRatio {
    OneToOne,
    /// N P waves for every QRS.
    Fixed { ratio: u32 },
    Variable,
    QrsExceedsP,
}

impl PQrsRatio {
    pub fn from_counts(p: u32, qrs: u32) -> Option<Self> {
        if p == 0 || qrs == 0 {
            return None;
        }
        Some(if p == qrs {
            Self::OneToOne
        } else if qrs > p {
            Self::QrsExceedsP
        } else if p % qrs == 0 {
            Self::Fixed { ratio: p / qrs }
        } else {
            Self::Variable
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrClass {
    Short,
    Normal,
    Prolonged,
}

impl PrClass {
    pub fn from_seconds(pr_s: f64) -> Self {
        if grid::below(pr_s, PR_SHORT_BELOW_S) {
            Self::Short
        } else if grid::at_most(pr_s, PR_NORMAL_MAX_S) {
            Self::Normal
        } else {
            Self::Prolonged
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductionResult {
    pub ratio: Option<PQrsRatio>,
    pub pr_seconds: Option<f64>,
    pub pr_class: Option<PrClass>,
    pub pr_pattern: Option<PrPattern>,
    pub class: Assessment<ConductionClass>,
    pub pr_segment: Option<PrSegmentFinding>,
    pub findings: Vec<Finding>,
    pub indeterminate: Vec<Indeterminate>,
}

/// Step 3: P to QRS relationship, PR interval and PR segment.
pub fn classify_conduction(record: &EcgRecord) -> ConductionResult {
    let mut findings = Vec::new();
    let mut indeterminate = Vec::new();

    if !record.p_waves.is_present() {
        let class = ConductionClass::NoAtrialActivity;
        findings.push(
            Finding::new(Diagnosis::Conduction(class))
                .with_detail("No discrete P waves to relate to the QRS complexes"),
        );
        return ConductionResult {
            ratio: None,
            pr_seconds: None,
            pr_class: None,
            pr_pattern: None,
            class: Assessment::determined(class),
            pr_segment: None,
            findings,
            indeterminate,
        };
    }

    let Some(av) = record.av.as_ref() else {
        let reason = "P to QRS relationship not measured";
        indeterminate.push(Indeterminate::new(Step::Conduction, "av_conduction", reason));
        return ConductionResult {
            ratio: None,
            pr_seconds: None,
            pr_class: None,
            pr_pattern: None,
            class: Assessment::indeterminate(reason),
            pr_segment: None,
            findings,
            indeterminate,
        };
    };

    let ratio = match (av.p_count, av.qrs_count) {
        (Some(p), Some(q)) => PQrsRatio::from_counts(p, q),
        _ => None,
    };
    let pr_class = av.pr.seconds.map(PrClass::from_seconds);

    let class = match decide(av, ratio, pr_class, record.qrs.delta_wave) {
        Ok(class) => {
            findings.push(conduction_finding(class, av, ratio, pr_class));
            Assessment::determined(class)
        }
        Err(reason) => {
            indeterminate.push(Indeterminate::new(Step::Conduction, "av_conduction", reason.clone()));
            Assessment::indeterminate(reason)
        }
    };

    let pr_segment = pr_segment(av);
    if let Some((finding, _)) = &pr_segment {
        findings.push(finding.clone());
    }

    tracing::debug!(
        class = ?class.value(),
        ratio = ?ratio,
        pr_s = ?av.pr.seconds,
        "AV conduction classified"
    );

    ConductionResult {
        ratio,
        pr_seconds: av.pr.seconds,
        pr_class,
        pr_pattern: Some(av.pr.pattern),
        class,
        pr_segment: pr_segment.map(|(_, kind)| kind),
        findings,
        indeterminate,
    }
}

fn decide(
    av: &AvRelationship,
    ratio: Option<PQrsRatio>,
    pr_class: Option<PrClass>,
    delta_wave: bool,
) -> Result<ConductionClass, String> {
    if av.pr.pattern == PrPattern::Dissociated {
        return Ok(ConductionClass::CompleteHeartBlock);
    }
    if ratio == Some(PQrsRatio::QrsExceedsP) {
        return Ok(ConductionClass::JunctionalOrVentricularEscape);
    }
    if av.pr.pattern == PrPattern::ProgressivelyLengthening {
        return Ok(ConductionClass::MobitzI);
    }
    match ratio {
        Some(PQrsRatio::Fixed { ratio: 2 }) => return Ok(ConductionClass::TwoToOneAvBlock),
        Some(PQrsRatio::Fixed { ratio }) => {
            return Ok(ConductionClass::HighGradeAvBlock { ratio })
        }
        Some(PQrsRatio::Variable) => return Ok(ConductionClass::MobitzII),
        _ => {}
    }
    if av.pr.pattern == PrPattern::AbruptlyDropped {
        return Ok(ConductionClass::MobitzII);
    }

    match pr_class {
        Some(PrClass::Short) if delta_wave => Ok(ConductionClass::PreExcitation),
        Some(PrClass::Short) => Ok(ConductionClass::ShortPr),
        Some(PrClass::Normal) => Ok(ConductionClass::Normal),
        Some(PrClass::Prolonged) => Ok(ConductionClass::FirstDegreeAvBlock),
        None => Err("PR interval not measured".to_string()),
    }
}

fn conduction_finding(
    class: ConductionClass,
    av: &AvRelationship,
    ratio: Option<PQrsRatio>,
    pr_class: Option<PrClass>,
) -> Finding {
    let mut evidence = Evidence::new();
    if let Some(pr) = av.pr.seconds {
        evidence = evidence.value("pr_interval", pr, "s");
    }
    if let (Some(p), Some(q)) = (av.p_count, av.qrs_count) {
        evidence = evidence
            .value("p_count", f64::from(p), "count")
            .value("qrs_count", f64::from(q), "count");
    }
    let finding = Finding::new(Diagnosis::Conduction(class)).with_evidence(evidence);

    let finding = match class {
        ConductionClass::PreExcitation => finding
            .with_detail("Short PR with delta wave; pattern confirmation from the QRS analysis"),
        ConductionClass::ShortPr => finding
            .with_differential(&["Enhanced AV nodal conduction", "Junctional rhythm"]),
        ConductionClass::MobitzI => {
            finding.with_detail("PR progressively lengthens until a QRS is dropped")
        }
        ConductionClass::MobitzII => finding
            .with_detail("QRS dropped without preceding PR prolongation; high risk of progression"),
        ConductionClass::TwoToOneAvBlock => finding
            .with_detail("Mobitz type cannot be determined at a fixed 2:1 ratio"),
        ConductionClass::CompleteHeartBlock => {
            finding.with_detail("P waves and QRS complexes are dissociated")
        }
        ConductionClass::JunctionalOrVentricularEscape => {
            finding.with_detail("More QRS complexes than P waves")
        }
        _ => finding,
    };

    // A long PR alongside a dropped-beat pattern is worth stating.
    if pr_class == Some(PrClass::Prolonged) && class != ConductionClass::FirstDegreeAvBlock {
        return finding.with_detail("Conducted PR interval exceeds 0.20 s");
    }
    if matches!(ratio, Some(PQrsRatio::Fixed { .. })) && class == ConductionClass::Normal {
        return finding.with_detail("Fixed P:QRS ratio with normal PR");
    }
    finding
}

/// PR segment pattern: pericarditis (inferior depression with aVR elevation)
/// or isolated elevation (atrial infarction).
fn pr_segment(av: &AvRelationship) -> Option<(Finding, PrSegmentFinding)> {
    let threshold = grid::mv(PR_SEGMENT_THRESHOLD_MM);
    let depressed_inferior: Vec<Lead> = INFERIOR
        .iter()
        .copied()
        .filter(|l| {
            av.pr_segment_mv
                .get(l)
                .is_some_and(|d| grid::at_most(*d, -threshold))
        })
        .collect();
    let avr_elevation = av
        .pr_segment_mv
        .get(&Lead::AVR)
        .copied()
        .filter(|d| grid::at_least(*d, threshold));

    if let (true, Some(avr)) = (depressed_inferior.len() >= 2, avr_elevation) {
        let kind = PrSegmentFinding::PericarditisPattern;
        let finding = Finding::new(Diagnosis::PrSegment(kind))
            .with_evidence(
                Evidence::new()
                    .leads(depressed_inferior.iter().copied())
                    .lead(Lead::AVR)
                    .value("pr_elevation_avr", grid::standard_mm(avr), "mm"),
            )
            .with_detail(format!(
                "PR depression in {} with PR elevation in aVR",
                lead_list(&depressed_inferior)
            ));
        return Some((finding, kind));
    }

    let elevated: Vec<Lead> = av
        .pr_segment_mv
        .iter()
        .filter(|(l, d)| **l != Lead::AVR && grid::at_least(**d, threshold))
        .map(|(l, _)| *l)
        .collect();
    if !elevated.is_empty() {
        let kind = PrSegmentFinding::AtrialInfarctionPattern;
        let finding = Finding::new(Diagnosis::PrSegment(kind))
            .with_evidence(Evidence::new().leads(elevated.iter().copied()))
            .with_detail(format!("PR segment elevation in {}", lead_list(&elevated)));
        return Some((finding, kind));
    }
    None
}
