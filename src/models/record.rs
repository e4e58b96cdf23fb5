//! Validation of a [`MeasurementDocument`] into the immutable [`EcgRecord`]
//! every classifier reads from.
//!
//! Validation is all-or-nothing: every missing required field and every
//! invalid value is collected into one [`ValidationError`], and no record is
//! produced when the list is non-empty.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::document::{AtrialInput, LeadInput, MeasurementDocument};
use super::enums::{Polarity, PrPattern, QrsShape, Sex, StBaseline, TMorphology};
use super::grid::Calibration;
use super::intervals::{
    AbsentPWaves, AvRelationship, FWaveSet, PWaveSet, PrInterval, PresentPWaves, QrsComplex,
    RrInterval, UWave, V1TerminalForce,
};
use super::lead::{Lead, LeadMeasurement, QWave, StSegment, TWave};

/// Namespace for deterministic record fingerprints.
const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x6b0f_3c5e_9a41_4d2e_8f17_2ce4_a9d0_71b3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("measurement document failed validation: {}", describe_issues(.missing, .invalid))]
pub struct ValidationError {
    pub missing: Vec<String>,
    pub invalid: Vec<FieldIssue>,
}

fn describe_issues(missing: &[String], invalid: &[FieldIssue]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing [{}]", missing.join(", ")));
    }
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid
            .iter()
            .map(|i| format!("{}: {}", i.field, i.reason))
            .collect();
        parts.push(format!("invalid [{}]", listed.join("; ")));
    }
    parts.join(", ")
}

/// Calibrated, validated measurements for one tracing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EcgRecord {
    pub calibration: Calibration,
    pub sex: Option<Sex>,
    pub recorded_at: Option<NaiveDateTime>,
    pub rhythm: RrInterval,
    pub p_waves: PWaveSet,
    pub av: Option<AvRelationship>,
    pub qrs: QrsComplex,
    pub leads: BTreeMap<Lead, LeadMeasurement>,
    /// Leads the extractor flagged as unreadable, with its reason.
    pub unreadable: BTreeMap<Lead, String>,
    pub qt_s: Option<f64>,
    pub u_wave: Option<UWave>,
    /// UUID v5 over the source document; identical input gives an identical id.
    pub fingerprint: Uuid,
}

impl EcgRecord {
    pub fn validate(doc: &MeasurementDocument) -> Result<Self, ValidationError> {
        let mut check = Checker::default();

        let calibration = check.calibration(doc);

        let rhythm = doc.rhythm.clone().unwrap_or_default();
        let rr_small_squares = check.positive(rhythm.rr_small_squares, "rhythm.rr_small_squares");
        let qrs_count_6s = match rhythm.qrs_count_6s {
            Some(0) => {
                check.invalid("rhythm.qrs_count_6s", "must be greater than zero");
                None
            }
            other => other,
        };
        if rhythm.rr_small_squares.is_none() && rhythm.qrs_count_6s.is_none() {
            check.missing("rhythm.rr_small_squares | rhythm.qrs_count_6s");
        }
        let regularity = check.require(rhythm.regularity, "rhythm.regularity");

        let atrial = doc.atrial.clone().unwrap_or_default();
        let p_waves = check
            .require(atrial.p_waves_present, "atrial.p_waves_present")
            .map(|present| check.p_waves(present, &atrial, &calibration));

        let qrs_input = doc.qrs.clone().unwrap_or_default();
        let qrs_duration = check.non_negative(
            qrs_input.duration_small_squares,
            "qrs.duration_small_squares",
        );
        if qrs_input.duration_small_squares.is_none() {
            check.missing("qrs.duration_small_squares");
        }
        let qrs_axis = check.axis(qrs_input.axis_degrees, "qrs.axis_degrees");

        let av = doc.conduction.as_ref().map(|c| AvRelationship {
            pr: PrInterval {
                seconds: check
                    .non_negative(c.pr_small_squares, "conduction.pr_small_squares")
                    .map(|sq| calibration.squares_to_seconds(sq)),
                pattern: c.pr_pattern.unwrap_or(PrPattern::Constant),
            },
            p_count: c.p_count,
            qrs_count: c.qrs_count,
            pr_segment_mv: c
                .pr_segment_mm
                .iter()
                .map(|(lead, mm)| (*lead, calibration.mm_to_mv(*mm)))
                .collect(),
        });

        let mut leads = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for (lead, input) in &doc.leads {
            match &input.uninterpretable {
                Some(reason) => {
                    unreadable.insert(*lead, reason.clone());
                }
                None => {
                    if let Some(m) = check.lead(*lead, input, &calibration) {
                        leads.insert(*lead, m);
                    }
                }
            }
        }

        let qt_s = doc.qt.as_ref().and_then(|qt| {
            check
                .positive(qt.qt_small_squares, "qt.qt_small_squares")
                .map(|sq| calibration.squares_to_seconds(sq))
        });

        let u_wave = doc.u_wave.as_ref().map(|u| UWave {
            present: u.present,
            amplitude_mv: check
                .non_negative(u.amplitude_mm, "u_wave.amplitude_mm")
                .map(|mm| calibration.mm_to_mv(mm)),
            polarity: u.polarity,
        });

        if !check.is_clean() {
            return Err(check.into_error());
        }

        // Clean checker guarantees the required values above are present.
        let (Some(regularity), Some(p_waves), Some(qrs_duration)) =
            (regularity, p_waves, qrs_duration)
        else {
            return Err(check.into_error());
        };

        let fingerprint = Uuid::new_v5(
            &RECORD_NAMESPACE,
            &serde_json::to_vec(doc).unwrap_or_default(),
        );

        Ok(Self {
            calibration,
            sex: doc.patient.sex,
            recorded_at: doc.recorded_at,
            rhythm: RrInterval {
                small_squares: rr_small_squares,
                seconds: rr_small_squares.map(|sq| calibration.squares_to_seconds(sq)),
                qrs_count_6s,
                regularity,
            },
            p_waves,
            av,
            qrs: QrsComplex {
                duration_s: calibration.squares_to_seconds(qrs_duration),
                axis_degrees: qrs_axis,
                pacing_spikes: qrs_input.pacing_spikes,
                delta_wave: qrs_input.delta_wave,
                av_dissociation: qrs_input.av_dissociation,
                precordial_concordance: qrs_input.precordial_concordance,
            },
            leads,
            unreadable,
            qt_s,
            u_wave,
            fingerprint,
        })
    }

    pub fn lead(&self, lead: Lead) -> Option<&LeadMeasurement> {
        self.leads.get(&lead)
    }

    /// Why a lead has no measurement.
    pub fn missing_reason(&self, lead: Lead) -> String {
        match self.unreadable.get(&lead) {
            Some(reason) => format!("lead {} uninterpretable: {}", lead, reason),
            None => format!("lead {} not measured", lead),
        }
    }

    pub fn qrs_ms(&self) -> f64 {
        super::grid::ms(self.qrs.duration_s)
    }
}

#[derive(Default)]
struct Checker {
    missing: Vec<String>,
    invalid: Vec<FieldIssue>,
}

impl Checker {
    fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            missing: self.missing,
            invalid: self.invalid,
        }
    }

    fn missing(&mut self, field: &str) {
        self.missing.push(field.to_string());
    }

    fn invalid(&mut self, field: &str, reason: impl Into<String>) {
        self.invalid.push(FieldIssue {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    fn require<T>(&mut self, value: Option<T>, field: &str) -> Option<T> {
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    fn non_negative(&mut self, value: Option<f64>, field: &str) -> Option<f64> {
        let v = value?;
        if !v.is_finite() || v < 0.0 {
            self.invalid(field, format!("must be a non-negative number, got {}", v));
            return None;
        }
        Some(v)
    }

    fn positive(&mut self, value: Option<f64>, field: &str) -> Option<f64> {
        let v = value?;
        if !v.is_finite() || v <= 0.0 {
            self.invalid(field, format!("must be greater than zero, got {}", v));
            return None;
        }
        Some(v)
    }

    fn axis(&mut self, value: Option<f64>, field: &str) -> Option<f64> {
        let v = value?;
        if !(-180.0..=180.0).contains(&v) {
            self.invalid(field, format!("axis must lie in [-180, 180], got {}", v));
            return None;
        }
        Some(v)
    }

    fn calibration(&mut self, doc: &MeasurementDocument) -> Calibration {
        let mut cal = Calibration::default();
        if let Some(input) = &doc.calibration {
            if let Some(speed) =
                self.positive(input.paper_speed_mm_per_s, "calibration.paper_speed_mm_per_s")
            {
                cal.paper_speed_mm_per_s = speed;
            }
            if let Some(gain) = self.positive(input.gain_mm_per_mv, "calibration.gain_mm_per_mv")
            {
                cal.gain_mm_per_mv = gain;
            }
        }
        cal
    }

    fn p_waves(&mut self, present: bool, input: &AtrialInput, cal: &Calibration) -> PWaveSet {
        if present {
            return PWaveSet::Present(PresentPWaves {
                duration_s: self
                    .non_negative(input.duration_small_squares, "atrial.duration_small_squares")
                    .map(|sq| cal.squares_to_seconds(sq)),
                amplitude_mv: self
                    .non_negative(input.amplitude_mm, "atrial.amplitude_mm")
                    .map(|mm| cal.mm_to_mv(mm)),
                axis_degrees: self.axis(input.axis_degrees, "atrial.axis_degrees"),
                pp_interval_s: self
                    .positive(input.pp_small_squares, "atrial.pp_small_squares")
                    .map(|sq| cal.squares_to_seconds(sq)),
                morphology: input.morphology.clone(),
                v1_terminal: input.v1_terminal_negativity.as_ref().and_then(|t| {
                    let depth = self.non_negative(
                        Some(t.depth_mm),
                        "atrial.v1_terminal_negativity.depth_mm",
                    )?;
                    let width = self.non_negative(
                        Some(t.width_small_squares),
                        "atrial.v1_terminal_negativity.width_small_squares",
                    )?;
                    Some(V1TerminalForce {
                        depth_mv: cal.mm_to_mv(depth),
                        duration_s: cal.squares_to_seconds(width),
                    })
                }),
            });
        }

        let baseline = input.baseline.clone().unwrap_or_default();
        let f_waves = input.f_waves.as_ref().map(|f| FWaveSet {
            v1_polarity: f.v1_polarity,
            v1_amplitude_mv: self
                .non_negative(f.v1_amplitude_mm, "atrial.f_waves.v1_amplitude_mm")
                .map(|mm| cal.mm_to_mv(mm)),
            v1_duration_s: self
                .non_negative(f.v1_width_small_squares, "atrial.f_waves.v1_width_small_squares")
                .map(|sq| cal.squares_to_seconds(sq)),
            notched: f.notched,
            limb_amplitude_mv: f
                .limb_amplitude_mm
                .iter()
                .filter_map(|(lead, mm)| {
                    let field = format!("atrial.f_waves.limb_amplitude_mm.{}", lead);
                    self.non_negative(Some(*mm), &field)
                        .map(|mm| (*lead, cal.mm_to_mv(mm)))
                })
                .collect(),
        });
        PWaveSet::Absent(AbsentPWaves {
            fibrillatory_waves: baseline.fibrillatory_waves,
            flutter_waves: baseline.flutter_waves,
            atrial_rate_per_min: self
                .positive(baseline.atrial_rate_per_min, "atrial.baseline.atrial_rate_per_min"),
            f_waves,
        })
    }

    fn lead(&mut self, lead: Lead, input: &LeadInput, cal: &Calibration) -> Option<LeadMeasurement> {
        let field = |name: &str| format!("leads.{}.{}", lead, name);
        let before = self.invalid.len();

        let r_mm = self.non_negative(input.r_mm, &field("r_mm"));
        let s_mm = self.non_negative(input.s_mm, &field("s_mm"));
        let r_prime_mm = self.non_negative(input.r_prime_mm, &field("r_prime_mm"));
        let q_depth = self.non_negative(input.q_depth_mm, &field("q_depth_mm"));
        let q_width = self.non_negative(input.q_width_small_squares, &field("q_width_small_squares"));
        let r_peak = self.non_negative(
            input.r_peak_time_small_squares,
            &field("r_peak_time_small_squares"),
        );

        let net_mm = r_mm.zip(s_mm).map(|(r, s)| r - s);
        let qrs_polarity = input.qrs_polarity.or_else(|| net_mm.map(Polarity::from_signed));
        if let (Some(polarity), Some(net)) = (qrs_polarity, net_mm) {
            if !polarity.admits(net) {
                self.invalid(
                    &field("qrs_polarity"),
                    format!("{} polarity contradicts net amplitude {:+.1} mm", polarity, net),
                );
            }
        }

        let q_wave = (q_depth.is_some() || q_width.is_some()).then(|| QWave {
            depth_mv: cal.mm_to_mv(q_depth.unwrap_or(0.0)),
            duration_s: cal.squares_to_seconds(q_width.unwrap_or(0.0)),
        });

        let qrs_shape = input.qrs_shape.or_else(|| {
            r_mm.zip(s_mm)
                .map(|(r, s)| infer_shape(r, s, r_prime_mm, q_depth))
        });

        let st = match input.st_deviation_mm {
            Some(_) if input.st_reference == Some(StBaseline::PrSegment) => {
                self.invalid(
                    &field("st_reference"),
                    "ST deviation must be measured against the TP segment",
                );
                None
            }
            Some(dev) if dev.is_finite() => Some(StSegment {
                deviation_mv: cal.mm_to_mv(dev),
                morphology: input.st_morphology,
            }),
            Some(dev) => {
                self.invalid(&field("st_deviation_mm"), format!("not a number: {}", dev));
                None
            }
            None => None,
        };

        let t_wave = if input.t_amplitude_mm.is_some() || input.t_polarity.is_some() {
            let amplitude_mm = input.t_amplitude_mm.unwrap_or(0.0);
            let polarity = input
                .t_polarity
                .unwrap_or_else(|| Polarity::from_signed(amplitude_mm));
            if !polarity.admits(amplitude_mm) {
                self.invalid(
                    &field("t_polarity"),
                    format!("{} polarity contradicts amplitude {:+.1} mm", polarity, amplitude_mm),
                );
            }
            Some(TWave {
                amplitude_mv: cal.mm_to_mv(amplitude_mm),
                polarity,
                morphology: input.t_morphology.unwrap_or(TMorphology::Normal),
            })
        } else {
            None
        };

        if self.invalid.len() > before {
            return None;
        }

        Some(LeadMeasurement {
            lead,
            r_mv: r_mm.map(|mm| cal.mm_to_mv(mm)),
            s_mv: s_mm.map(|mm| cal.mm_to_mv(mm)),
            r_prime_mv: r_prime_mm.map(|mm| cal.mm_to_mv(mm)),
            q_wave,
            qrs_polarity,
            qrs_shape,
            mid_qrs_notch: input.mid_qrs_notch,
            wide_terminal_s: input.wide_terminal_s,
            r_peak_time_s: r_peak.map(|sq| cal.squares_to_seconds(sq)),
            st,
            t_wave,
        })
    }
}

/// Best-effort QRS shape when the extractor did not label one.
fn infer_shape(r_mm: f64, s_mm: f64, r_prime_mm: Option<f64>, q_depth_mm: Option<f64>) -> QrsShape {
    let has_q = q_depth_mm.is_some_and(|d| d > 0.0);
    if r_prime_mm.is_some_and(|d| d > 0.0) {
        QrsShape::RsrPrime
    } else if r_mm == 0.0 && s_mm > 0.0 {
        QrsShape::Qs
    } else if has_q && r_mm > s_mm {
        QrsShape::Qr
    } else if s_mm == 0.0 && r_mm > 0.0 {
        QrsShape::MonophasicR
    } else if r_mm > s_mm {
        QrsShape::DominantR
    } else if r_mm < s_mm {
        QrsShape::SmallRDeepS
    } else {
        QrsShape::Equiphasic
    }
}
