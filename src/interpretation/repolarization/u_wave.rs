use crate::models::{grid, EcgRecord, Polarity};

use crate::interpretation::types::*;

/// U waves at or above this (mm) are prominent.
const PROMINENT_U_MM: f64 = 2.0;

pub fn classify_u_wave(record: &EcgRecord) -> (Assessment<UFinding>, Option<Finding>) {
    let Some(u) = record.u_wave else {
        return (Assessment::indeterminate("U wave not assessed"), None);
    };

    if !u.present {
        return (
            Assessment::determined(UFinding::Absent),
            Some(Finding::new(Diagnosis::UWave(UFinding::Absent))),
        );
    }

    let mut evidence = Evidence::new();
    if let Some(mv) = u.amplitude_mv {
        evidence = evidence.value("u_amplitude", grid::standard_mm(mv), "mm");
    }

    if u.polarity == Some(Polarity::Negative) {
        let finding = Finding::new(Diagnosis::UWave(UFinding::Inverted))
            .with_evidence(evidence)
            .with_differential(&["Myocardial ischemia", "Left ventricular hypertrophy"]);
        return (Assessment::determined(UFinding::Inverted), Some(finding));
    }

    let Some(amplitude) = u.amplitude_mv else {
        return (
            Assessment::indeterminate("U wave present but amplitude not measured"),
            None,
        );
    };

    if grid::at_least(amplitude, grid::mv(PROMINENT_U_MM)) {
        let finding = Finding::new(Diagnosis::UWave(UFinding::Prominent))
            .with_evidence(evidence)
            .with_detail(format!(
                "U wave {:.1} mm (>= 2)",
                grid::standard_mm(amplitude)
            ))
            .with_differential(&[
                "Hypokalemia (< 3 mEq/L)",
                "Bradycardia",
                "Digitalis or class IA/III antiarrhythmics",
            ]);
        return (Assessment::determined(UFinding::Prominent), Some(finding));
    }

    (
        Assessment::determined(UFinding::Normal),
        Some(Finding::new(Diagnosis::UWave(UFinding::Normal)).with_evidence(evidence)),
    )
}
