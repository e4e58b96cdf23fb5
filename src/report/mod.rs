//! Stepwise interpretation report and its canonical JSON form.

pub mod serializer;
pub mod types;

pub use serializer::{to_json, to_json_pretty, to_value, ReportError};
pub use types::{GridMeasurements, PWaveSection, Report, StepSection};
