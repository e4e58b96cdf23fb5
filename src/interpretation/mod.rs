//! Stepwise 12-lead ECG interpretation.
//!
//! Rate first, then three independent branches (atrial activity with
//! fibrillation chambers, AV conduction, ventricular depolarization with
//! repolarization), then one synthesis pass that applies every cross-step
//! override.

pub mod atrial;
pub mod conduction;
pub mod engine;
pub mod fibrillation;
pub mod helpers;
pub mod messages;
pub mod rate;
pub mod repolarization;
pub mod synthesis;
pub mod types;
pub mod ventricular;

#[cfg(test)]
pub(crate) mod fixtures;
#[cfg(test)]
mod scenario_tests;

pub use engine::DefaultInterpreter;
pub use messages::MessageTemplates;
pub use synthesis::{StepFinding, StepOutputs, Suppression, Synthesis};
pub use types::{
    Assessment, Conflict, ConflictKind, Diagnosis, EcgInterpreter, Evidence, Finding,
    Indeterminate, InterpretError, Severity, Step,
};
