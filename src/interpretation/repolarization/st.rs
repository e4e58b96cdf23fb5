//! ST segment: elevation by territory and morphology, depression, and the
//! special patterns (pericarditis, left main, posterior MI).

use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, Lead, LeadMeasurement, Sex, StMorphology};

use crate::interpretation::helpers::{
    has_contiguous_pair, lead_list, leads_where, INFERIOR, PRECORDIAL,
};
use crate::interpretation::rate::RateResult;
use crate::interpretation::types::*;

/// Elevation threshold outside V2–V3 (mm).
const ELEVATION_MM: f64 = 1.0;
const ELEVATION_V2_V3_MALE_MM: f64 = 2.0;
const ELEVATION_V2_V3_FEMALE_MM: f64 = 1.5;
const DEPRESSION_FLAT_MM: f64 = 0.5;
const DEPRESSION_UPSLOPING_MM: f64 = 1.0;
/// PR depression that supports pericarditis (mm).
const PR_DEPRESSION_MM: f64 = 0.5;

const ANTERIOR_ST: [Lead; 4] = [Lead::V1, Lead::V2, Lead::V3, Lead::V4];
const LATERAL_ST: [Lead; 4] = [Lead::I, Lead::AVL, Lead::V5, Lead::V6];
const RECIPROCAL_TO_INFERIOR: [Lead; 2] = [Lead::I, Lead::AVL];
const POSTERIOR_DEPRESSION: [Lead; 3] = [Lead::V1, Lead::V2, Lead::V3];

/// Leads that showed a significant ST shift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StResult {
    pub elevated: Vec<Lead>,
    pub depressed: Vec<Lead>,
    pub findings: Vec<Finding>,
    pub indeterminate: Vec<Indeterminate>,
}

/// Elevation threshold for a lead. V2–V3 depend on sex; unknown sex takes
/// the higher male value.
pub fn elevation_threshold_mm(lead: Lead, sex: Option<Sex>) -> f64 {
    match (lead, sex) {
        (Lead::V2 | Lead::V3, Some(Sex::Female)) => ELEVATION_V2_V3_FEMALE_MM,
        (Lead::V2 | Lead::V3, _) => ELEVATION_V2_V3_MALE_MM,
        _ => ELEVATION_MM,
    }
}

fn deviation_mm(m: &LeadMeasurement) -> Option<f64> {
    m.st.map(|st| st.deviation_mm())
}

fn morphology(m: &LeadMeasurement) -> Option<StMorphology> {
    m.st.and_then(|st| st.morphology)
}

fn is_elevated(m: &LeadMeasurement, sex: Option<Sex>) -> bool {
    deviation_mm(m).is_some_and(|d| grid::at_least(d, elevation_threshold_mm(m.lead, sex)))
}

/// Depression counts at 0.5 mm unless upsloping, which needs 1 mm. An
/// unlabelled slope is held to the 0.5 mm threshold.
fn is_depressed(m: &LeadMeasurement) -> bool {
    let threshold = match morphology(m) {
        Some(StMorphology::Upsloping) => DEPRESSION_UPSLOPING_MM,
        _ => DEPRESSION_FLAT_MM,
    };
    deviation_mm(m).is_some_and(|d| grid::at_most(d, -threshold))
}

fn all_discordant(record: &EcgRecord, leads: &[Lead]) -> bool {
    !leads.is_empty()
        && leads
            .iter()
            .filter_map(|l| record.lead(*l))
            .all(|m| m.st_discordant() == Some(true))
}

fn st_evidence(record: &EcgRecord, leads: &[Lead]) -> Evidence {
    leads.iter().fold(Evidence::new(), |ev, l| {
        match record.lead(*l).and_then(deviation_mm) {
            Some(d) => ev.lead(*l).value(&format!("st_{}", l), d, "mm"),
            None => ev.lead(*l),
        }
    })
}

/// Regions a set of leads touches: inferior, anterior, lateral.
fn regions(leads: &[Lead]) -> usize {
    [&INFERIOR[..], &ANTERIOR_ST[..], &LATERAL_ST[..]]
        .iter()
        .filter(|group| leads.iter().any(|l| group.contains(l)))
        .count()
}

fn subset(leads: &[Lead], group: &[Lead]) -> Vec<Lead> {
    leads.iter().copied().filter(|l| group.contains(l)).collect()
}

fn pr_depressed_leads(record: &EcgRecord) -> Vec<Lead> {
    record
        .av
        .as_ref()
        .map(|av| {
            av.pr_segment_mv
                .iter()
                .filter(|(lead, mv)| {
                    **lead != Lead::AVR && grid::at_most(**mv, -grid::mv(PR_DEPRESSION_MM))
                })
                .map(|(lead, _)| *lead)
                .collect()
        })
        .unwrap_or_default()
}

pub fn classify_st(record: &EcgRecord, rate: &RateResult) -> StResult {
    let mut result = StResult::default();

    if record.leads.values().all(|m| m.st.is_none()) {
        result.indeterminate.push(Indeterminate::new(
            Step::Repolarization,
            "st_segment",
            "ST deviation not measured in any lead",
        ));
        return result;
    }

    let non_avr: Vec<Lead> = Lead::ALL.into_iter().filter(|l| *l != Lead::AVR).collect();
    let elevated = leads_where(record, &non_avr, |m| is_elevated(m, record.sex));
    let depressed = leads_where(record, &non_avr, is_depressed);
    result.elevated = elevated.clone();
    result.depressed = depressed.clone();

    // Depressed leads already explained by an elevation pattern.
    let mut consumed: Vec<Lead> = Vec::new();

    if let Some(finding) = left_main(record, &depressed) {
        consumed.extend(depressed.iter().copied());
        result.findings.push(finding);
    }

    let tall_r_v1_v2 = leads_where(record, &[Lead::V1, Lead::V2], |m| {
        m.r_dominant() == Some(true)
    })
    .len()
        == 2;
    let posterior = subset(&depressed, &POSTERIOR_DEPRESSION);
    if tall_r_v1_v2 && posterior.len() >= 2 {
        consumed.extend(posterior.iter().copied());
        result.findings.push(
            Finding::new(Diagnosis::StSegment(StFinding::PosteriorMi))
                .with_evidence(st_evidence(record, &posterior).leads([Lead::V1, Lead::V2]))
                .with_detail(format!(
                    "Tall R in V1-V2 with ST depression in {}",
                    lead_list(&posterior)
                ))
                .with_detail("Record posterior leads V7-V9")
                .with_discordance(all_discordant(record, &posterior)),
        );
    }

    if has_contiguous_pair(&elevated) {
        result
            .findings
            .extend(elevation_findings(record, &elevated, &depressed, &mut consumed));
    }

    let remaining: Vec<Lead> = depressed
        .iter()
        .copied()
        .filter(|l| !consumed.contains(l))
        .collect();
    if remaining.len() >= 2 {
        result
            .findings
            .push(depression_finding(record, rate, &remaining));
    }

    result
}

/// aVR elevation above every other lead, with depression elsewhere.
fn left_main(record: &EcgRecord, depressed: &[Lead]) -> Option<Finding> {
    let avr = record.lead(Lead::AVR).and_then(deviation_mm)?;
    if !grid::at_least(avr, ELEVATION_MM) || depressed.is_empty() {
        return None;
    }
    let highest_other = record
        .leads
        .values()
        .filter(|m| m.lead != Lead::AVR)
        .filter_map(deviation_mm)
        .fold(f64::MIN, f64::max);
    if !grid::above(avr, highest_other) {
        return None;
    }
    Some(
        Finding::new(Diagnosis::StSegment(StFinding::LeftMainOrMultivessel))
            .with_evidence(st_evidence(record, depressed).lead(Lead::AVR).value(
                "st_aVR",
                avr,
                "mm",
            ))
            .with_detail(format!(
                "ST elevation in aVR {:.1} mm exceeds all other leads, depression in {}",
                avr,
                lead_list(depressed)
            ))
            .with_differential(&["Left main occlusion", "Severe three-vessel disease"])
            .with_discordance(false),
    )
}

fn elevation_findings(
    record: &EcgRecord,
    elevated: &[Lead],
    depressed: &[Lead],
    consumed: &mut Vec<Lead>,
) -> Vec<Finding> {
    let concave = elevated
        .iter()
        .filter_map(|l| record.lead(*l))
        .all(|m| morphology(m) == Some(StMorphology::Concave));
    let discordant = all_discordant(record, elevated);

    let inferior = subset(elevated, &INFERIOR);
    let anterior = subset(elevated, &ANTERIOR_ST);
    let lateral = subset(elevated, &LATERAL_ST);
    let inferior_hit = has_contiguous_pair(&inferior);
    let anterior_hit = has_contiguous_pair(&anterior);
    let lateral_hit = has_contiguous_pair(&lateral);

    let mut territories: Vec<(StemiTerritory, Vec<Lead>, &[Lead])> = Vec::new();
    if anterior_hit && lateral_hit {
        let mut leads = anterior.clone();
        leads.extend(lateral.iter().copied());
        territories.push((StemiTerritory::Anterolateral, leads, &INFERIOR[..]));
    } else if anterior_hit {
        territories.push((StemiTerritory::Anterior, anterior, &INFERIOR[..]));
    } else if lateral_hit {
        territories.push((StemiTerritory::Lateral, lateral, &INFERIOR[..]));
    }
    if inferior_hit {
        territories.push((StemiTerritory::Inferior, inferior, &RECIPROCAL_TO_INFERIOR[..]));
    }
    // Contiguous only across regions, e.g. aVL with V6.
    if territories.is_empty() {
        territories.push((StemiTerritory::Lateral, elevated.to_vec(), &INFERIOR[..]));
    }

    // Reciprocal depression localizes the injury whatever the ST shape.
    let any_reciprocal = territories
        .iter()
        .any(|(_, _, group)| !subset(depressed, group).is_empty());

    if concave && !any_reciprocal {
        let pr_depressed = pr_depressed_leads(record);
        if regions(elevated) >= 2 && pr_depressed.len() >= 2 {
            return vec![Finding::new(Diagnosis::StSegment(StFinding::Pericarditis))
                .with_evidence(st_evidence(record, elevated).leads(pr_depressed.iter().copied()))
                .with_detail(format!("Diffuse concave ST elevation in {}", lead_list(elevated)))
                .with_detail(format!("PR depression in {}", lead_list(&pr_depressed)))
                .with_differential(&["Acute pericarditis", "Myopericarditis"])
                .with_discordance(discordant)];
        }
        return vec![Finding::new(Diagnosis::StSegment(StFinding::ConcaveElevation))
            .with_evidence(st_evidence(record, elevated))
            .with_detail(format!("Concave ST elevation in {}", lead_list(elevated)))
            .with_differential(&[
                "Early repolarization (benign)",
                "Pericarditis",
                "Normal variant",
            ])
            .with_discordance(discordant)];
    }

    territories
        .into_iter()
        .map(|(territory, leads, reciprocal_group)| {
            let reciprocal = subset(depressed, reciprocal_group);
            consumed.extend(reciprocal.iter().copied());
            let shapes: Vec<&str> = leads
                .iter()
                .filter_map(|l| record.lead(*l).and_then(morphology))
                .filter(|m| m.is_concerning())
                .map(|m| m.as_str())
                .collect();
            let mut finding = Finding::new(Diagnosis::StSegment(StFinding::Stemi {
                territory,
                reciprocal: !reciprocal.is_empty(),
            }))
            .with_evidence(st_evidence(record, &leads))
            .with_detail(format!("ST elevation in {}", lead_list(&leads)))
            .with_discordance(all_discordant(record, &leads));
            if !shapes.is_empty() {
                finding = finding.with_detail(format!("Concerning morphology: {}", shapes.join(", ")));
            } else if concave && !reciprocal.is_empty() {
                finding = finding
                    .with_detail("Concave elevation with reciprocal depression is not benign");
            }
            finding = if reciprocal.is_empty() {
                finding.with_detail(format!(
                    "No reciprocal depression in {}",
                    lead_list(reciprocal_group)
                ))
            } else {
                finding.with_detail(format!("Reciprocal depression in {}", lead_list(&reciprocal)))
            };
            if territory == StemiTerritory::Inferior {
                finding = finding.with_detail("Record right-sided leads (V4R) for RV involvement");
            }
            finding.with_differential(stemi_arteries(territory))
        })
        .collect()
}

fn stemi_arteries(territory: StemiTerritory) -> &'static [&'static str] {
    match territory {
        StemiTerritory::Inferior => &["Right coronary artery", "Left circumflex artery"],
        StemiTerritory::Anterior => &["Left anterior descending artery"],
        StemiTerritory::Lateral => &["Left circumflex artery", "Diagonal branch"],
        StemiTerritory::Anterolateral => &["Proximal left anterior descending artery"],
    }
}

fn depression_finding(record: &EcgRecord, rate: &RateResult, leads: &[Lead]) -> Finding {
    let upsloping = leads
        .iter()
        .filter_map(|l| record.lead(*l))
        .all(|m| morphology(m) == Some(StMorphology::Upsloping));
    let discordant = all_discordant(record, leads);

    if upsloping && rate.classification == RateClass::Tachycardia {
        return Finding::new(Diagnosis::StSegment(StFinding::RateRelatedDepression))
            .with_evidence(st_evidence(record, leads).value("heart_rate", rate.heart_rate_bpm, "bpm"))
            .with_detail(format!(
                "Upsloping ST depression in {} at {:.0} bpm",
                lead_list(leads),
                rate.heart_rate_bpm
            ))
            .with_detail("Consistent with atrial repolarization in tachycardia")
            .with_discordance(discordant);
    }

    let diffuse = regions(leads) >= 2;
    let mut finding = Finding::new(Diagnosis::StSegment(StFinding::IschemicDepression { diffuse }))
        .with_evidence(st_evidence(record, leads))
        .with_detail(format!("ST depression in {}", lead_list(leads)))
        .with_discordance(discordant);
    if diffuse {
        finding = finding
            .with_detail("Diffuse distribution")
            .with_differential(&["Subendocardial ischemia", "Left main disease", "Digoxin effect"]);
    } else {
        finding = finding.with_differential(&["Myocardial ischemia", "Reciprocal change", "LV strain"]);
    }
    if leads.iter().all(|l| PRECORDIAL.contains(l)) && subset(leads, &POSTERIOR_DEPRESSION).len() >= 2 {
        finding = finding.with_detail("Consider posterior MI if R is tall in V1-V2");
    }
    finding
}
