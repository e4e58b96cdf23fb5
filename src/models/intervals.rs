use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{PMorphology, Polarity, PrPattern, Regularity};
use super::grid;
use super::lead::Lead;

/// R-R spacing and ventricular regularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RrInterval {
    pub small_squares: Option<f64>,
    pub seconds: Option<f64>,
    /// QRS complexes counted across a 6-second strip.
    pub qrs_count_6s: Option<u32>,
    pub regularity: Regularity,
}

/// P wave findings: exactly one of the two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PWaveSet {
    Present(PresentPWaves),
    Absent(AbsentPWaves),
}

impl PWaveSet {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentPWaves {
    pub duration_s: Option<f64>,
    pub amplitude_mv: Option<f64>,
    pub axis_degrees: Option<f64>,
    pub pp_interval_s: Option<f64>,
    pub morphology: BTreeMap<Lead, PMorphology>,
    pub v1_terminal: Option<V1TerminalForce>,
}

impl PresentPWaves {
    /// Atrial rate from the P-P spacing.
    pub fn rate_per_min(&self) -> Option<f64> {
        self.pp_interval_s
            .filter(|s| *s > 0.0)
            .map(|s| 60.0 / s)
    }
}

/// Negative terminal portion of the P wave in V1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct V1TerminalForce {
    pub depth_mv: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsentPWaves {
    pub fibrillatory_waves: bool,
    pub flutter_waves: bool,
    pub atrial_rate_per_min: Option<f64>,
    pub f_waves: Option<FWaveSet>,
}

/// Fibrillatory wave morphology used for chamber assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FWaveSet {
    pub v1_polarity: Option<Polarity>,
    pub v1_amplitude_mv: Option<f64>,
    pub v1_duration_s: Option<f64>,
    pub notched: bool,
    /// Peak f-wave amplitude in the limb leads.
    pub limb_amplitude_mv: BTreeMap<Lead, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrInterval {
    pub seconds: Option<f64>,
    pub pattern: PrPattern,
}

/// P to QRS relationship over the strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvRelationship {
    pub pr: PrInterval,
    pub p_count: Option<u32>,
    pub qrs_count: Option<u32>,
    /// Signed PR-segment deviation per lead (elevation positive).
    pub pr_segment_mv: BTreeMap<Lead, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrsComplex {
    pub duration_s: f64,
    pub axis_degrees: Option<f64>,
    pub pacing_spikes: bool,
    pub delta_wave: bool,
    pub av_dissociation: bool,
    pub precordial_concordance: bool,
}

/// Normal QRS width the ceilings of QTc were derived with.
pub const NORMAL_QRS_ALLOWANCE_MS: f64 = 100.0;

/// QT paired with the R-R interval it is corrected against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QtInterval {
    pub qt_s: f64,
    pub rr_s: f64,
}

impl QtInterval {
    pub fn new(qt_s: f64, rr_s: f64) -> Self {
        Self { qt_s, rr_s }
    }

    pub fn qt_ms(&self) -> f64 {
        grid::ms(self.qt_s)
    }

    /// Bazett: QTc = QT / √RR (RR in seconds).
    pub fn qtc_ms(&self) -> f64 {
        grid::ms(self.qt_s / self.rr_s.sqrt())
    }

    /// JT = QT − QRS.
    pub fn jt_ms(&self, qrs_s: f64) -> f64 {
        grid::ms(self.qt_s - qrs_s)
    }

    /// JTc = QTc − QRS.
    pub fn jtc_ms(&self, qrs_s: f64) -> f64 {
        self.qtc_ms() - grid::ms(qrs_s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UWave {
    pub present: bool,
    pub amplitude_mv: Option<f64>,
    pub polarity: Option<Polarity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bazett_matches_reference_value() {
        let qt = QtInterval::new(0.440, 0.80);
        assert!((qt.qtc_ms() - 491.93).abs() < 0.5);
    }

    #[test]
    fn bazett_is_identity_at_one_second() {
        let qt = QtInterval::new(0.400, 1.0);
        assert!((qt.qtc_ms() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn bazett_is_idempotent() {
        let qt = QtInterval::new(0.380, 0.72);
        let first = qt.qtc_ms();
        let second = QtInterval::new(qt.qt_s, qt.rr_s).qtc_ms();
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(first.to_bits(), qt.qtc_ms().to_bits());
    }

    #[test]
    fn jt_subtracts_qrs() {
        let qt = QtInterval::new(0.480, 1.0);
        assert!((qt.jt_ms(0.16) - 320.0).abs() < 1e-9);
        assert!((qt.jtc_ms(0.16) - 320.0).abs() < 1e-9);
    }

    #[test]
    fn p_rate_from_pp_interval() {
        let p = PresentPWaves {
            duration_s: None,
            amplitude_mv: None,
            axis_degrees: None,
            pp_interval_s: Some(0.8),
            morphology: BTreeMap::new(),
            v1_terminal: None,
        };
        assert!((p.rate_per_min().unwrap() - 75.0).abs() < 1e-9);
    }
}
