pub mod document;
pub mod enums;
pub mod grid;
pub mod intervals;
pub mod lead;
pub mod record;

pub use document::MeasurementDocument;
pub use enums::*;
pub use grid::Calibration;
pub use intervals::*;
pub use lead::{Lead, LeadMeasurement, QWave, StSegment, TWave};
pub use record::{EcgRecord, FieldIssue, ValidationError};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
