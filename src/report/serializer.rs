//! Canonical JSON for a [`Report`].
//!
//! Field order is declaration order and every map is keyed by lead order,
//! so one report always serializes to the same bytes. Non-finite numbers
//! are rejected rather than written as `null`.

use serde_json::Value;
use thiserror::Error;

use super::types::Report;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Report contains a non-finite value at {path}")]
    NonFinite { path: String },
}

/// Compact canonical JSON.
pub fn to_json(report: &Report) -> Result<String, ReportError> {
    let value = to_value(report)?;
    Ok(serde_json::to_string(&value)?)
}

/// Indented canonical JSON, for display and fixtures.
pub fn to_json_pretty(report: &Report) -> Result<String, ReportError> {
    let value = to_value(report)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn to_value(report: &Report) -> Result<Value, ReportError> {
    check_finite(report)?;
    Ok(serde_json::to_value(report)?)
}

fn check_finite(report: &Report) -> Result<(), ReportError> {
    let rate = &report.heart_rate().analysis;
    let mut checked = vec![
        ("step1_heartRate.heart_rate_bpm", rate.heart_rate_bpm),
        ("step1_heartRate.rr_seconds", rate.rr_seconds),
        (
            "gridMeasurements.qrs_duration_s",
            report.grid_measurements().qrs_duration_s,
        ),
    ];
    if let Some(m) = &report.qt_interval().analysis.measures {
        checked.push(("step7_qtInterval.qtc_ms", m.qtc_ms));
        checked.push(("step7_qtInterval.classified_ms", m.classified_ms));
    }
    let evidence = report
        .findings()
        .flat_map(|f| f.evidence.values.iter())
        .map(|v| ("finalSynthesis.evidence", v.value));

    match checked.into_iter().chain(evidence).find(|(_, v)| !v.is_finite()) {
        Some((path, _)) => Err(ReportError::NonFinite {
            path: path.to_string(),
        }),
        None => Ok(()),
    }
}
