//! Steps 5–8: ST segment, T wave, QT interval and U wave.
//!
//! ST and T findings carry their discordance to the QRS. Whether a
//! discordant change is expected (bundle branch block, paced or
//! pre-excited QRS) is decided at synthesis, not here.

pub mod qt;
pub mod st;
pub mod t_wave;
pub mod u_wave;

use serde::{Deserialize, Serialize};

use crate::models::EcgRecord;

use super::rate::RateResult;
use super::types::*;
use super::ventricular::VentricularResult;

pub use qt::{QtBasis, QtMeasures, QtResult};
pub use st::StResult;
pub use t_wave::TWaveResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UWaveResult {
    pub assessment: Assessment<UFinding>,
    pub finding: Option<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepolarizationResult {
    pub st: StResult,
    pub t_wave: TWaveResult,
    pub qt: QtResult,
    pub u_wave: UWaveResult,
}

impl RepolarizationResult {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.st
            .findings
            .iter()
            .chain(self.t_wave.findings.iter())
            .chain(self.qt.finding.iter())
            .chain(self.u_wave.finding.iter())
    }

    pub fn indeterminate(&self) -> Vec<Indeterminate> {
        let mut all = self.st.indeterminate.clone();
        all.extend(self.t_wave.indeterminate.iter().cloned());
        if let Some(reason) = self.qt.class.reason() {
            all.push(Indeterminate::new(Step::Repolarization, "qt_interval", reason));
        }
        if let Some(reason) = self.u_wave.assessment.reason() {
            all.push(Indeterminate::new(Step::Repolarization, "u_wave", reason));
        }
        all
    }
}

pub fn classify_repolarization(
    record: &EcgRecord,
    rate: &RateResult,
    ventricular: &VentricularResult,
) -> RepolarizationResult {
    let st = st::classify_st(record, rate);
    let t_wave = t_wave::classify_t_wave(record);
    let qt = qt::classify_qt(record, rate, ventricular.width);
    let (assessment, finding) = u_wave::classify_u_wave(record);

    tracing::debug!(
        st_findings = st.findings.len(),
        t_findings = t_wave.findings.len(),
        qt = ?qt.class.value(),
        "Repolarization step complete"
    );

    RepolarizationResult {
        st,
        t_wave,
        qt,
        u_wave: UWaveResult {
            assessment,
            finding,
        },
    }
}
