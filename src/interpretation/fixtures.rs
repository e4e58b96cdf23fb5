//! Measurement documents shared by the classifier tests.

use std::collections::BTreeMap;

use crate::models::document::{
    AtrialInput, ConductionInput, LeadInput, PatientContext, QrsInput, QtInput, RhythmInput,
    UWaveInput,
};
use crate::models::{
    EcgRecord, Lead, MeasurementDocument, PMorphology, PrPattern, Regularity, Sex,
};

/// Lead with an isoelectric ST and a T following the QRS direction.
pub fn lead(r_mm: f64, s_mm: f64) -> LeadInput {
    LeadInput {
        r_mm: Some(r_mm),
        s_mm: Some(s_mm),
        st_deviation_mm: Some(0.0),
        t_amplitude_mm: Some(if r_mm >= s_mm { 3.0 } else { -2.0 }),
        ..Default::default()
    }
}

/// Sinus rhythm at 75 bpm with a normal 12-lead.
pub fn normal_document() -> MeasurementDocument {
    let mut leads = BTreeMap::new();
    leads.insert(Lead::I, lead(7.0, 1.0));
    leads.insert(Lead::II, lead(10.0, 1.0));
    leads.insert(Lead::III, lead(4.0, 1.0));
    leads.insert(Lead::AVR, lead(1.0, 7.0));
    leads.insert(Lead::AVL, lead(4.0, 2.0));
    leads.insert(Lead::AVF, lead(7.0, 1.0));
    leads.insert(
        Lead::V1,
        LeadInput {
            t_amplitude_mm: Some(1.0),
            ..lead(2.0, 9.0)
        },
    );
    leads.insert(Lead::V2, lead(4.0, 11.0));
    leads.insert(Lead::V3, lead(8.0, 6.0));
    leads.insert(Lead::V4, lead(12.0, 4.0));
    leads.insert(Lead::V5, lead(14.0, 2.0));
    leads.insert(Lead::V6, lead(11.0, 1.0));

    let mut morphology = BTreeMap::new();
    for l in [Lead::I, Lead::II, Lead::AVL, Lead::V5, Lead::V6] {
        morphology.insert(l, PMorphology::UprightSmooth);
    }
    morphology.insert(Lead::AVR, PMorphology::Inverted);
    morphology.insert(Lead::V1, PMorphology::Biphasic);

    MeasurementDocument {
        patient: PatientContext {
            sex: Some(Sex::Male),
        },
        calibration: None,
        recorded_at: None,
        rhythm: Some(RhythmInput {
            rr_small_squares: Some(20.0),
            qrs_count_6s: Some(8),
            regularity: Some(Regularity::Regular),
        }),
        atrial: Some(AtrialInput {
            p_waves_present: Some(true),
            duration_small_squares: Some(2.5),
            amplitude_mm: Some(1.5),
            axis_degrees: Some(60.0),
            pp_small_squares: Some(20.0),
            morphology,
            ..Default::default()
        }),
        conduction: Some(ConductionInput {
            p_count: Some(8),
            qrs_count: Some(8),
            pr_small_squares: Some(4.0),
            pr_pattern: Some(PrPattern::Constant),
            pr_segment_mm: BTreeMap::new(),
        }),
        qrs: Some(QrsInput {
            duration_small_squares: Some(2.0),
            axis_degrees: Some(60.0),
            ..Default::default()
        }),
        leads,
        qt: Some(QtInput {
            qt_small_squares: Some(9.5),
        }),
        u_wave: Some(UWaveInput {
            present: false,
            amplitude_mm: None,
            polarity: None,
        }),
    }
}

/// LBBB at 0.14 s: QS-like V1, monophasic R in V6, discordant ST-T in
/// V1-V3 and the lateral leads. Sokolow-Lyon voltage is met.
pub fn lbbb_document() -> MeasurementDocument {
    let mut doc = normal_document();
    doc.qrs = Some(QrsInput {
        duration_small_squares: Some(3.5),
        axis_degrees: Some(30.0),
        ..Default::default()
    });
    edit_lead(&mut doc, Lead::V1, |l| {
        l.r_mm = Some(1.0);
        l.s_mm = Some(20.0);
        l.st_deviation_mm = Some(2.0);
        l.t_amplitude_mm = Some(3.0);
    });
    edit_lead(&mut doc, Lead::V2, |l| {
        l.r_mm = Some(1.0);
        l.s_mm = Some(18.0);
        l.st_deviation_mm = Some(2.5);
        l.t_amplitude_mm = Some(3.0);
    });
    edit_lead(&mut doc, Lead::V3, |l| {
        l.r_mm = Some(2.0);
        l.s_mm = Some(15.0);
        l.st_deviation_mm = Some(2.0);
        l.t_amplitude_mm = Some(2.0);
    });
    for (lead, r_mm) in [(Lead::I, 8.0), (Lead::V5, 15.0)] {
        edit_lead(&mut doc, lead, |l| {
            l.r_mm = Some(r_mm);
            l.s_mm = Some(0.0);
            l.st_deviation_mm = Some(-1.0);
            l.t_amplitude_mm = Some(-2.0);
        });
    }
    edit_lead(&mut doc, Lead::V6, |l| {
        l.r_mm = Some(16.0);
        l.s_mm = Some(0.0);
        l.st_deviation_mm = Some(-1.5);
        l.t_amplitude_mm = Some(-3.0);
    });
    doc
}

pub fn record(doc: &MeasurementDocument) -> EcgRecord {
    EcgRecord::validate(doc).expect("fixture document validates")
}

pub fn normal_record() -> EcgRecord {
    record(&normal_document())
}

/// Apply an edit to one lead of a document.
pub fn edit_lead(doc: &mut MeasurementDocument, lead: Lead, f: impl FnOnce(&mut LeadInput)) {
    f(doc.leads.entry(lead).or_default());
}
