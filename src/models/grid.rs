//! ECG paper grid calibration and unit conversion.
//!
//! At standard calibration one small square is 1 mm: 0.04 s horizontally at
//! 25 mm/s paper speed and 0.1 mV vertically at 10 mm/mV gain. A large square
//! is five small squares (0.20 s / 0.5 mV).
//!
//! Clinical thresholds are quoted in "standard millimetres" (e.g. Sokolow-Lyon
//! 35 mm). They are converted to millivolts here so a non-standard gain never
//! shifts a criterion.

use serde::{Deserialize, Serialize};

pub const STANDARD_PAPER_SPEED_MM_PER_S: f64 = 25.0;
pub const STANDARD_GAIN_MM_PER_MV: f64 = 10.0;
pub const SMALL_SQUARES_PER_LARGE: f64 = 5.0;

/// Slack for threshold comparisons. Square counts such as 3 × 0.04 s are not
/// exactly representable, so a boundary value must not fall on the wrong side.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Paper speed and gain the tracing was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub paper_speed_mm_per_s: f64,
    pub gain_mm_per_mv: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            paper_speed_mm_per_s: STANDARD_PAPER_SPEED_MM_PER_S,
            gain_mm_per_mv: STANDARD_GAIN_MM_PER_MV,
        }
    }
}

impl Calibration {
    /// Seconds per small square (1 mm of paper).
    pub fn seconds_per_small_square(&self) -> f64 {
        1.0 / self.paper_speed_mm_per_s
    }

    pub fn squares_to_seconds(&self, small_squares: f64) -> f64 {
        small_squares * self.seconds_per_small_square()
    }

    pub fn mm_to_mv(&self, mm: f64) -> f64 {
        mm / self.gain_mm_per_mv
    }

    pub fn is_standard(&self) -> bool {
        self.paper_speed_mm_per_s == STANDARD_PAPER_SPEED_MM_PER_S
            && self.gain_mm_per_mv == STANDARD_GAIN_MM_PER_MV
    }
}

/// Millivolts corresponding to a threshold quoted in standard millimetres.
pub fn mv(standard_mm: f64) -> f64 {
    standard_mm / STANDARD_GAIN_MM_PER_MV
}

/// Standard-millimetre equivalent of a millivolt value, for reporting.
pub fn standard_mm(millivolts: f64) -> f64 {
    millivolts * STANDARD_GAIN_MM_PER_MV
}

pub fn ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

pub fn at_least(value: f64, threshold: f64) -> bool {
    value >= threshold - BOUNDARY_EPSILON
}

pub fn above(value: f64, threshold: f64) -> bool {
    value > threshold + BOUNDARY_EPSILON
}

pub fn below(value: f64, threshold: f64) -> bool {
    value < threshold - BOUNDARY_EPSILON
}

pub fn at_most(value: f64, threshold: f64) -> bool {
    value <= threshold + BOUNDARY_EPSILON
}

/// Round for display in the report (avoids 0.12000000000000001 in output).
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_small_square_is_40ms() {
        let cal = Calibration::default();
        assert!((cal.seconds_per_small_square() - 0.04).abs() < 1e-12);
        assert!((cal.squares_to_seconds(5.0) - 0.20).abs() < 1e-12);
        assert!(cal.is_standard());
    }

    #[test]
    fn double_speed_halves_square_duration() {
        let cal = Calibration {
            paper_speed_mm_per_s: 50.0,
            gain_mm_per_mv: 10.0,
        };
        assert!((cal.squares_to_seconds(3.0) - 0.06).abs() < 1e-12);
        assert!(!cal.is_standard());
    }

    #[test]
    fn half_gain_doubles_millivolts() {
        let cal = Calibration {
            paper_speed_mm_per_s: 25.0,
            gain_mm_per_mv: 5.0,
        };
        assert!((cal.mm_to_mv(10.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn three_squares_sit_on_the_wide_boundary() {
        let qrs = Calibration::default().squares_to_seconds(3.0);
        assert!(at_least(qrs, 0.12));
        assert!(!below(qrs, 0.12));
        assert!(!above(qrs, 0.12));
        assert!(at_most(qrs, 0.12));
    }

    #[test]
    fn threshold_conversion() {
        assert!((mv(35.0) - 3.5).abs() < 1e-12);
        assert!((standard_mm(0.25) - 2.5).abs() < 1e-12);
        assert_eq!(round_to(0.120000000001, 3), 0.12);
    }
}
