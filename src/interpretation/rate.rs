use serde::{Deserialize, Serialize};

use crate::config::InterpreterConfig;
use crate::models::{grid, EcgRecord, Regularity};

use super::types::{Conflict, ConflictKind, Diagnosis, Evidence, Finding, RateClass, Step};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    /// 300 ÷ large squares between R waves.
    LargeSquares,
    /// 1500 ÷ small squares between R waves.
    SmallSquares,
    /// QRS complexes in 6 seconds × 10.
    SixSecondCount,
}

impl RateMethod {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::LargeSquares => "300 / large squares per R-R",
            Self::SmallSquares => "1500 / small squares per R-R",
            Self::SixSecondCount => "QRS count in 6 s x 10",
        }
    }
}

/// Every rate estimate the input allows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateEstimates {
    pub interval_bpm: Option<f64>,
    pub six_second_bpm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResult {
    pub rr_small_squares: Option<f64>,
    pub rr_seconds: f64,
    pub heart_rate_bpm: f64,
    pub method: RateMethod,
    pub estimates: RateEstimates,
    pub classification: RateClass,
    pub regularity: Regularity,
    pub finding: Finding,
    pub conflicts: Vec<Conflict>,
    pub notes: Vec<String>,
}

pub fn classify_bpm(bpm: f64) -> RateClass {
    if grid::below(bpm, 60.0) {
        RateClass::Bradycardia
    } else if grid::above(bpm, 100.0) {
        RateClass::Tachycardia
    } else {
        RateClass::Normal
    }
}

/// Rate from the R-R interval, counted the way the squares fall.
fn interval_method(rr_small_squares: Option<f64>) -> RateMethod {
    match rr_small_squares {
        Some(sq) if (sq / grid::SMALL_SQUARES_PER_LARGE).fract() == 0.0 => RateMethod::LargeSquares,
        _ => RateMethod::SmallSquares,
    }
}

/// Step 1: heart rate and regularity.
pub fn classify_rate(record: &EcgRecord, config: &InterpreterConfig) -> RateResult {
    let rhythm = &record.rhythm;
    let interval_bpm = rhythm.seconds.map(|s| 60.0 / s);
    let six_second_bpm = rhythm.qrs_count_6s.map(|c| f64::from(c) * 10.0);
    let tolerance = config.rate_agreement_tolerance_bpm;

    let mut conflicts = Vec::new();
    let mut notes = Vec::new();

    let regular = rhythm.regularity == Regularity::Regular;
    let (bpm, method) = match (interval_bpm, six_second_bpm) {
        (Some(interval), Some(count)) => {
            let disagree = grid::above((interval - count).abs(), tolerance);
            if regular && disagree {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::RateMethodDisagreement,
                        Step::Rate,
                        format!(
                            "Rhythm reported regular but the R-R interval gives {:.0} bpm \
                             and the 6-second count gives {:.0} bpm; deferring to the count",
                            interval, count
                        ),
                    )
                    .with_evidence(
                        Evidence::new()
                            .value("interval_rate", interval, "bpm")
                            .value("six_second_rate", count, "bpm"),
                    ),
                );
                (count, RateMethod::SixSecondCount)
            } else if regular {
                (interval, interval_method(rhythm.small_squares))
            } else {
                notes.push(format!(
                    "{} rhythm: 6-second count used, single R-R interval not representative",
                    rhythm.regularity
                ));
                if disagree {
                    notes.push(format!(
                        "method_disagreement: R-R interval {:.0} bpm vs count {:.0} bpm",
                        interval, count
                    ));
                }
                (count, RateMethod::SixSecondCount)
            }
        }
        (Some(interval), None) => {
            if !regular {
                notes.push(format!(
                    "{} rhythm measured from a single R-R interval; rate is approximate",
                    rhythm.regularity
                ));
            }
            (interval, interval_method(rhythm.small_squares))
        }
        (None, Some(count)) => (count, RateMethod::SixSecondCount),
        // Validation guarantees one of the two.
        (None, None) => (0.0, RateMethod::SixSecondCount),
    };

    let rr_seconds = rhythm
        .seconds
        .unwrap_or_else(|| if bpm > 0.0 { 60.0 / bpm } else { 0.0 });
    let classification = classify_bpm(bpm);

    let finding = Finding::new(Diagnosis::Rate(classification))
        .with_evidence(
            Evidence::new()
                .value("heart_rate", bpm, "bpm")
                .value("rr_interval", rr_seconds, "s"),
        )
        .with_detail(format!("{} ({})", method.describe(), rhythm.regularity));

    tracing::debug!(
        bpm = grid::round_to(bpm, 1),
        method = ?method,
        regularity = rhythm.regularity.as_str(),
        conflicts = conflicts.len(),
        "Rate classified"
    );

    RateResult {
        rr_small_squares: rhythm.small_squares,
        rr_seconds,
        heart_rate_bpm: bpm,
        method,
        estimates: RateEstimates {
            interval_bpm,
            six_second_bpm,
        },
        classification,
        regularity: rhythm.regularity,
        finding,
        conflicts,
        notes,
    }
}
