//! Step 4: QRS width, axis, bundle branch and pre-excitation patterns,
//! Q waves, R progression and chamber hypertrophy.

pub mod axis;
pub mod hypertrophy;
pub mod narrow;
pub mod wide;

use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord};

use super::rate::RateResult;
use super::types::*;

pub use axis::AxisResult;
pub use hypertrophy::VoltageSummary;

/// Upper bound of a normal QRS, seconds.
pub const QRS_NORMAL_MAX_S: f64 = 0.10;
/// A QRS at or beyond this is wide.
pub const QRS_WIDE_MIN_S: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrsWidth {
    Normal,
    Borderline,
    Wide,
}

impl QrsWidth {
    pub fn from_seconds(duration_s: f64) -> Self {
        if grid::at_most(duration_s, QRS_NORMAL_MAX_S) {
            Self::Normal
        } else if grid::at_least(duration_s, QRS_WIDE_MIN_S) {
            Self::Wide
        } else {
            Self::Borderline
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Wide)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentricularResult {
    pub qrs_duration_s: f64,
    pub width: QrsWidth,
    /// `None` inside the value when a narrow QRS carries no named pattern.
    pub pattern: Assessment<Option<VentricularPattern>>,
    pub axis: AxisResult,
    /// Only assessed for normal and borderline QRS.
    pub r_progression: Option<Assessment<RProgression>>,
    pub voltage: VoltageSummary,
    pub findings: Vec<Finding>,
    pub conflicts: Vec<Conflict>,
    pub indeterminate: Vec<Indeterminate>,
}

impl VentricularResult {
    pub fn pattern(&self) -> Option<VentricularPattern> {
        self.pattern.value().copied().flatten()
    }

    /// Whether repolarization is expected to run opposite the QRS.
    pub fn secondary_repolarization(&self) -> bool {
        self.pattern()
            .is_some_and(|p| p.has_secondary_repolarization())
    }
}

pub fn classify_ventricular(record: &EcgRecord, rate: &RateResult) -> VentricularResult {
    let width = QrsWidth::from_seconds(record.qrs.duration_s);
    let mut findings = Vec::new();
    let mut conflicts = Vec::new();
    let mut indeterminate = Vec::new();

    let (axis, axis_finding) = axis::classify_axis(record, &mut conflicts, &mut indeterminate);
    findings.extend(axis_finding);
    let deviation = axis.deviation.value().copied();

    let mut r_progression = None;
    let pattern = match width {
        QrsWidth::Wide => {
            let outcome =
                wide::classify_wide(record, rate.heart_rate_bpm, deviation, &mut indeterminate);
            findings.extend(outcome.finding);
            match outcome.pattern {
                Assessment::Determined { value } => Assessment::determined(Some(value)),
                Assessment::Indeterminate { reason } => Assessment::indeterminate(reason),
            }
        }
        QrsWidth::Normal | QrsWidth::Borderline => {
            findings.extend(narrow::q_wave_infarcts(record, &mut indeterminate));
            let (progression, progression_finding) = narrow::r_progression(record);
            if let Some(reason) = progression.reason() {
                indeterminate.push(Indeterminate::new(
                    Step::Ventricular,
                    "r_progression",
                    reason,
                ));
            }
            findings.extend(progression_finding);
            r_progression = Some(progression);

            let incomplete = (width == QrsWidth::Borderline)
                .then(|| narrow::incomplete_rbbb(record))
                .flatten();
            let pattern = incomplete.as_ref().map(|_| VentricularPattern::IncompleteRbbb);
            findings.extend(incomplete);
            Assessment::determined(pattern)
        }
    };

    let (voltage, lvh) = hypertrophy::left_ventricular(record, deviation, &mut indeterminate);
    findings.extend(lvh);

    let named = pattern.value().copied().flatten();
    if matches!(named, Some(VentricularPattern::Lbbb { .. })) {
        findings.extend(hypertrophy::possible_lvh_in_lbbb(record));
    }
    let rbbb = matches!(named, Some(VentricularPattern::Rbbb { .. }));
    findings.extend(hypertrophy::right_ventricular(record, rbbb));

    tracing::debug!(
        qrs_ms = grid::ms(record.qrs.duration_s),
        width = ?width,
        pattern = ?named,
        findings = findings.len(),
        "Ventricular step complete"
    );

    VentricularResult {
        qrs_duration_s: record.qrs.duration_s,
        width,
        pattern,
        axis,
        r_progression,
        voltage,
        findings,
        conflicts,
        indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::interpretation::fixtures::{edit_lead, lbbb_document, normal_document, record};
    use crate::interpretation::rate::classify_rate;
    use crate::models::document::QrsInput;
    use crate::models::Lead;

    fn run(doc: &crate::models::MeasurementDocument) -> VentricularResult {
        let rec = record(doc);
        let rate = classify_rate(&rec, &InterpreterConfig::default());
        classify_ventricular(&rec, &rate)
    }

    fn has(result: &VentricularResult, diagnosis: Diagnosis) -> bool {
        result.findings.iter().any(|f| f.diagnosis == diagnosis)
    }

    #[test]
    fn width_boundaries() {
        assert_eq!(QrsWidth::from_seconds(0.08), QrsWidth::Normal);
        assert_eq!(QrsWidth::from_seconds(0.10), QrsWidth::Normal);
        assert_eq!(QrsWidth::from_seconds(0.11), QrsWidth::Borderline);
        assert_eq!(QrsWidth::from_seconds(3.0 * 0.04), QrsWidth::Wide);
    }

    #[test]
    fn normal_tracing() {
        let result = run(&normal_document());
        assert_eq!(result.width, QrsWidth::Normal);
        assert_eq!(result.pattern(), None);
        assert!(result.pattern.is_determined());
        assert_eq!(
            result.r_progression.as_ref().and_then(|p| p.value()),
            Some(&RProgression::Normal)
        );
        assert!(!has(&result, Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
        assert!(result.conflicts.is_empty());
        assert!(result.indeterminate.is_empty());
    }

    #[test]
    fn lbbb_skips_narrow_subtree() {
        let result = run(&lbbb_document());
        assert!(matches!(
            result.pattern(),
            Some(VentricularPattern::Lbbb { .. })
        ));
        assert!(result.r_progression.is_none());
        assert!(result.secondary_repolarization());
        // Voltage is still reported here; the LBBB override happens at synthesis.
        assert!(has(&result, Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
    }

    #[test]
    fn borderline_rsr_prime_is_incomplete_rbbb() {
        let mut doc = normal_document();
        doc.qrs = Some(QrsInput {
            duration_small_squares: Some(2.75),
            axis_degrees: Some(60.0),
            ..Default::default()
        });
        edit_lead(&mut doc, Lead::V1, |l| l.r_prime_mm = Some(4.0));
        let result = run(&doc);
        assert_eq!(result.width, QrsWidth::Borderline);
        assert_eq!(result.pattern(), Some(VentricularPattern::IncompleteRbbb));
        assert!(!result.secondary_repolarization());
    }

    #[test]
    fn voltage_lvh_at_narrow_width() {
        let mut doc = normal_document();
        edit_lead(&mut doc, Lead::V1, |l| l.s_mm = Some(18.0));
        edit_lead(&mut doc, Lead::V5, |l| l.r_mm = Some(22.0));
        let result = run(&doc);
        assert!(has(&result, Diagnosis::Hypertrophy(Hypertrophy::LvhByVoltage)));
        assert_eq!(result.voltage.sokolow_lyon_mm, Some(40.0));
    }
}
