use serde::{Deserialize, Serialize};

use super::enums::{Polarity, QrsShape, StMorphology, TMorphology};
use super::grid;
use super::ModelError;

/// The twelve standard leads, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lead {
    I,
    II,
    III,
    #[serde(rename = "aVR")]
    AVR,
    #[serde(rename = "aVL")]
    AVL,
    #[serde(rename = "aVF")]
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl Lead {
    pub const ALL: [Lead; 12] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::AVR => "aVR",
            Self::AVL => "aVL",
            Self::AVF => "aVF",
            Self::V1 => "V1",
            Self::V2 => "V2",
            Self::V3 => "V3",
            Self::V4 => "V4",
            Self::V5 => "V5",
            Self::V6 => "V6",
        }
    }

    /// Position along the chest (V1 = 1 … V6 = 6), `None` for limb leads.
    pub fn precordial_index(&self) -> Option<u8> {
        match self {
            Self::V1 => Some(1),
            Self::V2 => Some(2),
            Self::V3 => Some(3),
            Self::V4 => Some(4),
            Self::V5 => Some(5),
            Self::V6 => Some(6),
            _ => None,
        }
    }

    pub fn is_precordial(&self) -> bool {
        self.precordial_index().is_some()
    }
}

impl std::str::FromStr for Lead {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lead::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::InvalidEnum {
                field: "Lead".into(),
                value: s.into(),
            })
    }
}

impl std::fmt::Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Q wave ahead of the R wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QWave {
    pub depth_mv: f64,
    pub duration_s: f64,
}

/// ST deviation at the J point, measured against the TP segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StSegment {
    /// Signed; elevation positive.
    pub deviation_mv: f64,
    pub morphology: Option<StMorphology>,
}

impl StSegment {
    pub fn deviation_mm(&self) -> f64 {
        grid::standard_mm(self.deviation_mv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TWave {
    /// Signed; sign agrees with `polarity` (checked at validation).
    pub amplitude_mv: f64,
    pub polarity: Polarity,
    pub morphology: TMorphology,
}

/// Calibrated QRS/ST/T measurements for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadMeasurement {
    pub lead: Lead,
    /// R wave height (magnitude); `None` when not measured.
    pub r_mv: Option<f64>,
    /// S wave depth (magnitude); `None` when not measured.
    pub s_mv: Option<f64>,
    /// Terminal R' height, when an rsR' is present.
    pub r_prime_mv: Option<f64>,
    pub q_wave: Option<QWave>,
    /// Given, or derived from R and S when both were measured.
    pub qrs_polarity: Option<Polarity>,
    pub qrs_shape: Option<QrsShape>,
    pub mid_qrs_notch: bool,
    pub wide_terminal_s: bool,
    pub r_peak_time_s: Option<f64>,
    pub st: Option<StSegment>,
    pub t_wave: Option<TWave>,
}

impl LeadMeasurement {
    /// Both R and S were measured.
    pub fn has_amplitudes(&self) -> bool {
        self.r_mv.is_some() && self.s_mv.is_some()
    }

    /// `None` unless both R and S were measured.
    pub fn net_qrs_mv(&self) -> Option<f64> {
        Some(self.r_mv? - self.s_mv?)
    }

    /// R/S ratio; `None` when either wave is unmeasured or there is no S wave.
    pub fn r_to_s_ratio(&self) -> Option<f64> {
        let (r, s) = (self.r_mv?, self.s_mv?);
        (s > 0.0).then(|| r / s)
    }

    /// R exceeds S (or stands alone); `None` when either wave is unmeasured.
    pub fn r_dominant(&self) -> Option<bool> {
        let (r, s) = (self.r_mv?, self.s_mv?);
        Some(if s > 0.0 { grid::above(r / s, 1.0) } else { r > 0.0 })
    }

    /// Sign of the net QRS: measured amplitudes first, then the labelled
    /// polarity. Isoelectric and biphasic count as zero.
    pub fn qrs_sign(&self) -> Option<f64> {
        if let Some(net) = self.net_qrs_mv() {
            return Some(net);
        }
        self.qrs_polarity.map(|p| match p {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
            Polarity::Biphasic | Polarity::Isoelectric => 0.0,
        })
    }

    /// Width ≥ 0.04 s or depth ≥ 25 % of the R wave.
    pub fn has_pathologic_q(&self) -> bool {
        match self.q_wave {
            Some(q) if q.depth_mv > 0.0 || q.duration_s > 0.0 => {
                grid::at_least(q.duration_s, 0.04)
                    || self
                        .r_mv
                        .is_some_and(|r| grid::at_least(q.depth_mv, 0.25 * r))
            }
            _ => false,
        }
    }

    /// Positive QRS carrying a negative T, or the reverse.
    pub fn t_discordant(&self) -> Option<bool> {
        let t = self.t_wave?;
        let qrs = self.qrs_polarity?;
        Some(matches!(
            (qrs, t.polarity),
            (Polarity::Positive, Polarity::Negative) | (Polarity::Negative, Polarity::Positive)
        ))
    }

    /// ST shifted opposite to the dominant QRS deflection.
    pub fn st_discordant(&self) -> Option<bool> {
        let st = self.st?;
        Some(match self.qrs_polarity? {
            Polarity::Positive => st.deviation_mv < 0.0,
            Polarity::Negative => st.deviation_mv > 0.0,
            Polarity::Biphasic | Polarity::Isoelectric => false,
        })
    }
}
