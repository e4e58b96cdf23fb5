use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigError, InterpreterConfig};
use crate::models::{EcgRecord, MeasurementDocument};
use crate::report::Report;

use super::atrial::{classify_atrial, AtrialResult};
use super::conduction::classify_conduction;
use super::fibrillation::{classify_fibrillation, FibrillationResult};
use super::rate::{classify_rate, RateResult};
use super::repolarization::{classify_repolarization, RepolarizationResult};
use super::synthesis::{synthesize, StepOutputs};
use super::types::{EcgInterpreter, InterpretError};
use super::ventricular::{classify_ventricular, VentricularResult};

/// Default implementation of the interpretation engine.
/// Runs the rate step, the three independent branches, then synthesis.
#[derive(Debug, Clone, Default)]
pub struct DefaultInterpreter {
    config: InterpreterConfig,
}

impl DefaultInterpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self { config }
    }

    /// Engine configured from `ECG_INTERPRET_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(InterpreterConfig::from_env()?))
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Parse a JSON measurement document and interpret it.
    pub fn interpret_json(&self, json: &str) -> Result<Report, InterpretError> {
        let document = MeasurementDocument::from_json(json)?;
        self.interpret(&document)
    }

    /// Same pipeline with the three branches on the blocking pool. The
    /// report is identical to the one [`EcgInterpreter::interpret`] builds.
    pub async fn interpret_concurrent(
        &self,
        document: &MeasurementDocument,
    ) -> Result<Report, InterpretError> {
        let start = Instant::now();
        let record = Arc::new(EcgRecord::validate(document)?);
        let rate = Arc::new(classify_rate(&record, &self.config));

        let atrial = {
            let (record, rate) = (Arc::clone(&record), Arc::clone(&rate));
            tokio::task::spawn_blocking(move || atrial_branch(&record, &rate))
        };
        let conduction = {
            let record = Arc::clone(&record);
            tokio::task::spawn_blocking(move || classify_conduction(&record))
        };
        let ventricular = {
            let (record, rate) = (Arc::clone(&record), Arc::clone(&rate));
            tokio::task::spawn_blocking(move || ventricular_branch(&record, &rate))
        };

        let (atrial, conduction, ventricular) = tokio::join!(atrial, conduction, ventricular);
        let (atrial, fibrillation) = atrial.map_err(|e| join_error("atrial", e))?;
        let conduction = conduction.map_err(|e| join_error("conduction", e))?;
        let (ventricular, repolarization) =
            ventricular.map_err(|e| join_error("ventricular", e))?;

        let outputs = StepOutputs {
            rate: (*rate).clone(),
            atrial,
            conduction,
            ventricular,
            repolarization,
            fibrillation,
        };
        Ok(self.finish(&record, outputs, start))
    }

    fn run_branches(&self, record: &EcgRecord) -> StepOutputs {
        let rate = classify_rate(record, &self.config);
        let (atrial, fibrillation) = atrial_branch(record, &rate);
        let conduction = classify_conduction(record);
        let (ventricular, repolarization) = ventricular_branch(record, &rate);
        StepOutputs {
            rate,
            atrial,
            conduction,
            ventricular,
            repolarization,
            fibrillation,
        }
    }

    fn finish(&self, record: &EcgRecord, outputs: StepOutputs, start: Instant) -> Report {
        let synthesis = synthesize(&outputs, &self.config);
        let report = Report::assemble(record, outputs, synthesis);

        tracing::info!(
            report_id = %report.id(),
            severity = report.overall_severity().as_str(),
            findings = report.synthesis().findings.len(),
            conflicts = report.synthesis().conflicts.len(),
            indeterminate = report.synthesis().indeterminate.len(),
            processing_ms = start.elapsed().as_millis() as u64,
            "ECG interpretation complete"
        );
        report
    }
}

impl EcgInterpreter for DefaultInterpreter {
    fn interpret(&self, document: &MeasurementDocument) -> Result<Report, InterpretError> {
        let record = EcgRecord::validate(document).map_err(|e| {
            tracing::warn!(
                missing = e.missing.len(),
                invalid = e.invalid.len(),
                "Measurement document rejected"
            );
            e
        })?;
        Ok(self.interpret_record(&record))
    }

    fn interpret_record(&self, record: &EcgRecord) -> Report {
        let start = Instant::now();
        let outputs = self.run_branches(record);
        self.finish(record, outputs, start)
    }
}

/// Atrial activity, then fibrillation chambers when the rhythm is AF.
fn atrial_branch(record: &EcgRecord, rate: &RateResult) -> (AtrialResult, Option<FibrillationResult>) {
    let atrial = classify_atrial(record, rate);
    let fibrillation = atrial.is_fibrillation().then(|| classify_fibrillation(record));
    (atrial, fibrillation)
}

fn ventricular_branch(
    record: &EcgRecord,
    rate: &RateResult,
) -> (VentricularResult, RepolarizationResult) {
    let ventricular = classify_ventricular(record, rate);
    let repolarization = classify_repolarization(record, rate, &ventricular);
    (ventricular, repolarization)
}

fn join_error(branch: &'static str, err: tokio::task::JoinError) -> InterpretError {
    tracing::warn!(branch, error = %err, "Interpretation branch failed");
    InterpretError::BranchJoin {
        branch,
        reason: err.to_string(),
    }
}
