//! Input contract from the measurement-extraction collaborator.
//!
//! Every value is in grid units (small squares horizontally, millimetres
//! vertically) as counted on the tracing. Every field is optional here so that
//! validation can name all missing fields at once instead of failing on the
//! first one.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{
    PMorphology, Polarity, PrPattern, QrsShape, Regularity, Sex, StBaseline, StMorphology,
    TMorphology,
};
use super::lead::Lead;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementDocument {
    pub patient: PatientContext,
    pub calibration: Option<CalibrationInput>,
    pub recorded_at: Option<NaiveDateTime>,
    pub rhythm: Option<RhythmInput>,
    pub atrial: Option<AtrialInput>,
    pub conduction: Option<ConductionInput>,
    pub qrs: Option<QrsInput>,
    pub leads: BTreeMap<Lead, LeadInput>,
    pub qt: Option<QtInput>,
    pub u_wave: Option<UWaveInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientContext {
    pub sex: Option<Sex>,
}

/// Override of the standard 25 mm/s, 10 mm/mV calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationInput {
    pub paper_speed_mm_per_s: Option<f64>,
    pub gain_mm_per_mv: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmInput {
    pub rr_small_squares: Option<f64>,
    pub qrs_count_6s: Option<u32>,
    pub regularity: Option<Regularity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrialInput {
    pub p_waves_present: Option<bool>,
    pub duration_small_squares: Option<f64>,
    pub amplitude_mm: Option<f64>,
    pub axis_degrees: Option<f64>,
    pub pp_small_squares: Option<f64>,
    pub morphology: BTreeMap<Lead, PMorphology>,
    pub v1_terminal_negativity: Option<V1TerminalInput>,
    pub baseline: Option<BaselineInput>,
    pub f_waves: Option<FWaveInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct V1TerminalInput {
    pub depth_mm: f64,
    pub width_small_squares: f64,
}

/// Baseline activity when no discrete P waves are seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineInput {
    pub fibrillatory_waves: bool,
    pub flutter_waves: bool,
    pub atrial_rate_per_min: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FWaveInput {
    pub v1_polarity: Option<Polarity>,
    pub v1_amplitude_mm: Option<f64>,
    pub v1_width_small_squares: Option<f64>,
    pub notched: bool,
    pub limb_amplitude_mm: BTreeMap<Lead, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductionInput {
    pub p_count: Option<u32>,
    pub qrs_count: Option<u32>,
    pub pr_small_squares: Option<f64>,
    pub pr_pattern: Option<PrPattern>,
    pub pr_segment_mm: BTreeMap<Lead, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrsInput {
    pub duration_small_squares: Option<f64>,
    pub axis_degrees: Option<f64>,
    pub pacing_spikes: bool,
    pub delta_wave: bool,
    pub av_dissociation: bool,
    pub precordial_concordance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadInput {
    /// Set when the lead could not be read (artifact, lead off).
    pub uninterpretable: Option<String>,
    pub r_mm: Option<f64>,
    pub s_mm: Option<f64>,
    pub r_prime_mm: Option<f64>,
    pub q_depth_mm: Option<f64>,
    pub q_width_small_squares: Option<f64>,
    pub qrs_polarity: Option<Polarity>,
    pub qrs_shape: Option<QrsShape>,
    pub mid_qrs_notch: bool,
    pub wide_terminal_s: bool,
    pub r_peak_time_small_squares: Option<f64>,
    pub st_deviation_mm: Option<f64>,
    pub st_morphology: Option<StMorphology>,
    pub st_reference: Option<StBaseline>,
    pub t_amplitude_mm: Option<f64>,
    pub t_polarity: Option<Polarity>,
    pub t_morphology: Option<TMorphology>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QtInput {
    pub qt_small_squares: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UWaveInput {
    pub present: bool,
    pub amplitude_mm: Option<f64>,
    pub polarity: Option<Polarity>,
}

impl MeasurementDocument {
    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
