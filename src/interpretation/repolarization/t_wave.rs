use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, Lead, LeadMeasurement, TMorphology};

use crate::interpretation::helpers::{lead_list, leads_where, INFERIOR};
use crate::interpretation::types::*;

/// T amplitude ceilings (mm).
const TALL_PRECORDIAL_MM: f64 = 10.0;
const TALL_LIMB_MM: f64 = 5.0;

const WELLENS_LEADS: [Lead; 3] = [Lead::V2, Lead::V3, Lead::V4];
const LATERAL_T: [Lead; 4] = [Lead::I, Lead::AVL, Lead::V5, Lead::V6];
/// Leads where a flat T is abnormal.
const UPRIGHT_T_LEADS: [Lead; 6] = [Lead::I, Lead::II, Lead::V3, Lead::V4, Lead::V5, Lead::V6];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TWaveResult {
    /// Leads with an inversion that breaks the concordance rule.
    pub abnormal_inversions: Vec<Lead>,
    pub findings: Vec<Finding>,
    pub indeterminate: Vec<Indeterminate>,
}

/// Inverted T that is abnormal: opposite a positive QRS, or deep and
/// symmetric. aVR is normally inverted.
fn abnormal_inversion(m: &LeadMeasurement) -> bool {
    if m.lead == Lead::AVR {
        return false;
    }
    let Some(t) = m.t_wave else {
        return false;
    };
    t.amplitude_mv < 0.0
        && (m.t_discordant() == Some(true) || t.morphology == TMorphology::SymmetricInverted)
}

fn has_morphology(m: &LeadMeasurement, morphology: TMorphology) -> bool {
    m.t_wave.is_some_and(|t| t.morphology == morphology)
}

fn is_tall(m: &LeadMeasurement) -> bool {
    let ceiling = if m.lead.is_precordial() {
        TALL_PRECORDIAL_MM
    } else {
        TALL_LIMB_MM
    };
    m.t_wave
        .is_some_and(|t| grid::above(t.amplitude_mv, grid::mv(ceiling)))
}

fn all_discordant(record: &EcgRecord, leads: &[Lead]) -> bool {
    !leads.is_empty()
        && leads
            .iter()
            .filter_map(|l| record.lead(*l))
            .all(|m| m.t_discordant() == Some(true))
}

fn t_evidence(record: &EcgRecord, leads: &[Lead]) -> Evidence {
    leads.iter().fold(Evidence::new(), |ev, l| {
        match record.lead(*l).and_then(|m| m.t_wave) {
            Some(t) => ev
                .lead(*l)
                .value(&format!("t_{}", l), grid::standard_mm(t.amplitude_mv), "mm"),
            None => ev.lead(*l),
        }
    })
}

fn finding(record: &EcgRecord, diagnosis: TFinding, leads: &[Lead]) -> Finding {
    Finding::new(Diagnosis::TWave(diagnosis))
        .with_evidence(t_evidence(record, leads))
        .with_discordance(all_discordant(record, leads))
}

pub fn classify_t_wave(record: &EcgRecord) -> TWaveResult {
    let mut result = TWaveResult::default();

    if record.leads.values().all(|m| m.t_wave.is_none()) {
        result.indeterminate.push(Indeterminate::new(
            Step::Repolarization,
            "t_wave",
            "T wave not measured in any lead",
        ));
        return result;
    }

    let inverted = leads_where(record, &Lead::ALL, abnormal_inversion);
    result.abnormal_inversions = inverted.clone();
    let mut explained: Vec<Lead> = Vec::new();

    let wellens = leads_where(record, &WELLENS_LEADS, |m| {
        abnormal_inversion(m)
            && (has_morphology(m, TMorphology::SymmetricInverted)
                || has_morphology(m, TMorphology::Biphasic))
    });
    if wellens.len() >= 2 {
        explained.extend(wellens.iter().copied());
        result.findings.push(
            finding(record, TFinding::Wellens, &wellens)
                .with_detail(format!(
                    "Deep symmetric T inversion in {}",
                    lead_list(&wellens)
                ))
                .with_differential(&["Critical proximal LAD stenosis (Wellens syndrome)"]),
        );
    }

    let inferior: Vec<Lead> = inverted
        .iter()
        .copied()
        .filter(|l| INFERIOR.contains(l))
        .collect();
    if inferior.len() >= 2 {
        explained.extend(inferior.iter().copied());
        result.findings.push(
            finding(record, TFinding::InferiorIschemia, &inferior)
                .with_detail(format!("T inversion in {}", lead_list(&inferior)))
                .with_differential(&["Inferior ischemia", "Evolving inferior MI"]),
        );
    }

    let lateral: Vec<Lead> = inverted
        .iter()
        .copied()
        .filter(|l| LATERAL_T.contains(l))
        .collect();
    if lateral.len() >= 2 {
        explained.extend(lateral.iter().copied());
        result.findings.push(
            finding(record, TFinding::LateralIschemia, &lateral)
                .with_detail(format!("T inversion in {}", lead_list(&lateral)))
                .with_differential(&["Lateral ischemia", "LV strain", "Evolving lateral MI"]),
        );
    }

    let other: Vec<Lead> = inverted
        .iter()
        .copied()
        .filter(|l| !explained.contains(l))
        .collect();
    if !other.is_empty() {
        result.findings.push(
            finding(record, TFinding::NonspecificInversion, &other)
                .with_detail(format!("T inversion in {}", lead_list(&other)))
                .with_differential(&[
                    "Ischemia",
                    "Evolving MI",
                    "CNS event",
                    "Ventricular hypertrophy",
                ]),
        );
    }

    let peaked = leads_where(record, &Lead::ALL, |m| has_morphology(m, TMorphology::Peaked));
    if !peaked.is_empty() {
        result.findings.push(
            finding(record, TFinding::Peaked, &peaked)
                .with_detail(format!("Peaked T waves in {}", lead_list(&peaked)))
                .with_differential(&["Hyperkalemia (> 6.5 mEq/L)", "Hyperacute MI"]),
        );
    }

    let tall = leads_where(record, &Lead::ALL, |m| {
        is_tall(m) && !has_morphology(m, TMorphology::Peaked)
    });
    if !tall.is_empty() {
        result.findings.push(
            finding(record, TFinding::Tall, &tall)
                .with_detail(format!(
                    "T amplitude above 10 mm precordial / 5 mm limb in {}",
                    lead_list(&tall)
                ))
                .with_differential(&[
                    "Hyperkalemia",
                    "Early MI",
                    "Left ventricular hypertrophy",
                    "Normal variant",
                ]),
        );
    }

    let flattened = leads_where(record, &UPRIGHT_T_LEADS, |m| {
        has_morphology(m, TMorphology::Flattened)
    });
    if !flattened.is_empty() {
        result.findings.push(
            finding(record, TFinding::Flattened, &flattened)
                .with_detail(format!("Flattened T waves in {}", lead_list(&flattened)))
                .with_differential(&["Ischemia", "Hypokalemia", "Digitalis effect"]),
        );
    }

    let biphasic: Vec<Lead> = leads_where(record, &Lead::ALL, |m| {
        has_morphology(m, TMorphology::Biphasic)
    })
    .into_iter()
    .filter(|l| !explained.contains(l))
    .collect();
    if !biphasic.is_empty() {
        result.findings.push(
            finding(record, TFinding::Biphasic, &biphasic)
                .with_detail(format!("Biphasic T waves in {}", lead_list(&biphasic)))
                .with_differential(&["Ischemia"]),
        );
    }

    result
}
