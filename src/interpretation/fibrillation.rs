//! Step 9: atrial enlargement read from fibrillatory waves. Only entered
//! when the atrial step settled on atrial fibrillation; every finding here
//! is supportive, never definitive.

use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, FWaveSet, Lead, PWaveSet, Polarity};

use super::helpers::lead_list;
use super::types::*;

/// f-wave depth/height that counts as large (mm).
const F_WAVE_LARGE_MM: f64 = 1.0;
/// f-wave width beyond which it is broad (s).
const F_WAVE_BROAD_S: f64 = 0.04;

const RAE_LIMB_LEADS: [Lead; 3] = [Lead::II, Lead::III, Lead::AVF];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FibrillationResult {
    pub findings: Vec<Finding>,
    pub indeterminate: Vec<Indeterminate>,
}

fn supportive(chamber: FibrillationChamber) -> Finding {
    Finding::new(Diagnosis::ChamberEnlargement(chamber))
        .with_detail("Supportive only: f-wave criteria are not diagnostic")
}

pub fn classify_fibrillation(record: &EcgRecord) -> FibrillationResult {
    let mut result = FibrillationResult::default();

    let f_waves = match &record.p_waves {
        PWaveSet::Absent(absent) => absent.f_waves.as_ref(),
        PWaveSet::Present(_) => None,
    };
    let Some(f) = f_waves else {
        result.indeterminate.push(Indeterminate::new(
            Step::Fibrillation,
            "f_wave_morphology",
            "f-wave morphology not measured",
        ));
        return result;
    };

    result.findings.extend(left_atrial(f));
    result.findings.extend(right_atrial(f));
    result
}

fn left_atrial(f: &FWaveSet) -> Option<Finding> {
    let mut met = Vec::new();
    let mut evidence = Evidence::new();

    let deep = f.v1_amplitude_mv.filter(|a| grid::above(*a, grid::mv(F_WAVE_LARGE_MM)));
    let broad = f.v1_duration_s.filter(|d| grid::above(*d, F_WAVE_BROAD_S));
    if f.v1_polarity == Some(Polarity::Negative) {
        if let (Some(depth), Some(width)) = (deep, broad) {
            met.push(format!(
                "Dominantly negative V1 f-waves {:.1} mm deep, {:.0} ms wide",
                grid::standard_mm(depth),
                grid::ms(width)
            ));
            evidence = evidence
                .lead(Lead::V1)
                .value("f_v1_depth", grid::standard_mm(depth), "mm")
                .value("f_v1_width", width, "s");
        }
    }
    if f.notched && broad.is_some() {
        met.push("Broad, notched fibrillatory waves".to_string());
    }

    if met.is_empty() {
        return None;
    }
    Some(
        supportive(FibrillationChamber::SupportiveLae)
            .with_evidence(evidence)
            .with_details(met),
    )
}

fn right_atrial(f: &FWaveSet) -> Option<Finding> {
    let mut met = Vec::new();
    let mut evidence = Evidence::new();

    if f.v1_polarity == Some(Polarity::Positive) {
        if let Some(height) = f
            .v1_amplitude_mv
            .filter(|a| grid::above(*a, grid::mv(F_WAVE_LARGE_MM)))
        {
            met.push(format!(
                "Tall positive V1 f-waves {:.1} mm",
                grid::standard_mm(height)
            ));
            evidence = evidence
                .lead(Lead::V1)
                .value("f_v1_height", grid::standard_mm(height), "mm");
        }
    }

    let large: Vec<Lead> = RAE_LIMB_LEADS
        .iter()
        .copied()
        .filter(|l| {
            f.limb_amplitude_mv
                .get(l)
                .is_some_and(|a| grid::above(*a, grid::mv(F_WAVE_LARGE_MM)))
        })
        .collect();
    if !large.is_empty() {
        met.push(format!("Large f-waves in {}", lead_list(&large)));
        evidence = evidence.leads(large.iter().copied());
    }

    if met.is_empty() {
        return None;
    }
    Some(
        supportive(FibrillationChamber::SupportiveRae)
            .with_evidence(evidence)
            .with_details(met),
    )
}
