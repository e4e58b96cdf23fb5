use crate::models::{EcgRecord, Lead, LeadMeasurement};

pub const INFERIOR: [Lead; 3] = [Lead::II, Lead::III, Lead::AVF];
pub const HIGH_LATERAL: [Lead; 2] = [Lead::I, Lead::AVL];
pub const LATERAL: [Lead; 4] = [Lead::I, Lead::AVL, Lead::V5, Lead::V6];
pub const SEPTAL_ANTERIOR: [Lead; 4] = [Lead::V1, Lead::V2, Lead::V3, Lead::V4];
pub const PRECORDIAL: [Lead; 6] = [Lead::V1, Lead::V2, Lead::V3, Lead::V4, Lead::V5, Lead::V6];

/// Leads facing the same region of myocardium.
pub fn contiguous(a: Lead, b: Lead) -> bool {
    if a == b {
        return false;
    }
    if let (Some(i), Some(j)) = (a.precordial_index(), b.precordial_index()) {
        return i.abs_diff(j) == 1;
    }
    let both_in = |group: &[Lead]| group.contains(&a) && group.contains(&b);
    let lateral_pair = (HIGH_LATERAL.contains(&a) && matches!(b, Lead::V5 | Lead::V6))
        || (HIGH_LATERAL.contains(&b) && matches!(a, Lead::V5 | Lead::V6));
    both_in(&INFERIOR) || both_in(&HIGH_LATERAL) || lateral_pair
}

/// Whether any two of the leads are contiguous.
pub fn has_contiguous_pair(leads: &[Lead]) -> bool {
    leads
        .iter()
        .enumerate()
        .any(|(i, a)| leads[i + 1..].iter().any(|b| contiguous(*a, *b)))
}

/// Leads of a group that satisfy a predicate, in group order.
pub fn leads_where(
    record: &EcgRecord,
    group: &[Lead],
    pred: impl Fn(&LeadMeasurement) -> bool,
) -> Vec<Lead> {
    group
        .iter()
        .filter_map(|l| record.lead(*l))
        .filter(|m| pred(m))
        .map(|m| m.lead)
        .collect()
}

/// Leads of a group with no usable measurement.
pub fn unavailable(record: &EcgRecord, group: &[Lead]) -> Vec<Lead> {
    group
        .iter()
        .copied()
        .filter(|l| record.lead(*l).is_none())
        .collect()
}

/// "I, aVL, V5" style listing.
pub fn lead_list(leads: &[Lead]) -> String {
    leads
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Combined reason for a set of missing leads.
pub fn missing_leads_reason(record: &EcgRecord, leads: &[Lead]) -> String {
    leads
        .iter()
        .map(|l| record.missing_reason(*l))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a lead's R and S amplitudes cannot be used; `None` when both were
/// measured.
pub fn amplitude_gap(record: &EcgRecord, lead: Lead) -> Option<String> {
    match record.lead(lead) {
        None => Some(record.missing_reason(lead)),
        Some(m) if !m.has_amplitudes() => Some(format!("lead {} QRS amplitudes not measured", lead)),
        Some(_) => None,
    }
}

/// Combined amplitude gaps over a set of leads; `None` when every lead is
/// fully measured.
pub fn amplitude_gaps(record: &EcgRecord, leads: &[Lead]) -> Option<String> {
    let gaps: Vec<String> = leads
        .iter()
        .filter_map(|l| amplitude_gap(record, *l))
        .collect();
    (!gaps.is_empty()).then(|| gaps.join("; "))
}
