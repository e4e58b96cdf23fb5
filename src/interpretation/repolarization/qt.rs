use serde::{Deserialize, Serialize};

use crate::models::{grid, EcgRecord, QtInterval, Sex, NORMAL_QRS_ALLOWANCE_MS};

use crate::interpretation::rate::RateResult;
use crate::interpretation::types::*;
use crate::interpretation::ventricular::QrsWidth;

/// QTc ceilings (ms).
const QTC_MALE_MAX_MS: f64 = 440.0;
const QTC_FEMALE_MAX_MS: f64 = 460.0;
const QTC_HIGH_RISK_MS: f64 = 500.0;
const QTC_SHORT_BELOW_MS: f64 = 340.0;

const PROLONGED_CAUSES: &[&str] = &[
    "Congenital long QT syndrome",
    "Drugs (antiarrhythmics, antipsychotics, macrolides, fluoroquinolones)",
    "Hypokalemia, hypomagnesemia, hypocalcemia",
    "Bradycardia",
    "Acute MI",
];

const SHORT_CAUSES: &[&str] = &[
    "Hypercalcemia",
    "Digitalis effect",
    "Congenital short QT syndrome",
];

/// Which corrected interval the classification was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QtBasis {
    Qtc,
    /// JTc plus the normal-QRS allowance, for a wide QRS.
    JtcAdjusted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtMeasures {
    pub qt_ms: f64,
    pub rr_s: f64,
    pub qtc_ms: f64,
    pub jt_ms: Option<f64>,
    pub jtc_ms: Option<f64>,
    pub basis: QtBasis,
    /// Value compared against the ceiling.
    pub classified_ms: f64,
    pub ceiling_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtResult {
    pub measures: Option<QtMeasures>,
    pub class: Assessment<QtClass>,
    pub finding: Option<Finding>,
}

/// Upper normal QTc for the patient's sex; unknown sex takes the higher
/// female ceiling.
pub fn qtc_ceiling_ms(sex: Option<Sex>) -> f64 {
    match sex {
        Some(Sex::Male) => QTC_MALE_MAX_MS,
        Some(Sex::Female) | None => QTC_FEMALE_MAX_MS,
    }
}

pub fn classify_qtc(value_ms: f64, ceiling_ms: f64) -> QtClass {
    if grid::above(value_ms, QTC_HIGH_RISK_MS) {
        QtClass::Prolonged {
            torsades: TorsadesRisk::High,
        }
    } else if grid::above(value_ms, ceiling_ms) {
        QtClass::Prolonged {
            torsades: TorsadesRisk::Elevated,
        }
    } else if grid::below(value_ms, QTC_SHORT_BELOW_MS) {
        QtClass::Short
    } else {
        QtClass::Normal
    }
}

pub fn classify_qt(record: &EcgRecord, rate: &RateResult, width: QrsWidth) -> QtResult {
    let Some(qt_s) = record.qt_s else {
        return QtResult {
            measures: None,
            class: Assessment::indeterminate("QT interval not measured"),
            finding: None,
        };
    };
    if rate.rr_seconds <= 0.0 {
        return QtResult {
            measures: None,
            class: Assessment::indeterminate("R-R interval unavailable for rate correction"),
            finding: None,
        };
    }

    let interval = QtInterval::new(qt_s, rate.rr_seconds);
    let qtc = interval.qtc_ms();
    let ceiling = qtc_ceiling_ms(record.sex);
    let wide = width.is_wide();
    let qrs_s = record.qrs.duration_s;

    let (basis, classified) = if wide {
        (
            QtBasis::JtcAdjusted,
            interval.jtc_ms(qrs_s) + NORMAL_QRS_ALLOWANCE_MS,
        )
    } else {
        (QtBasis::Qtc, qtc)
    };
    let class = classify_qtc(classified, ceiling);

    let measures = QtMeasures {
        qt_ms: grid::round_to(interval.qt_ms(), 1),
        rr_s: grid::round_to(rate.rr_seconds, 3),
        qtc_ms: grid::round_to(qtc, 1),
        jt_ms: wide.then(|| grid::round_to(interval.jt_ms(qrs_s), 1)),
        jtc_ms: wide.then(|| grid::round_to(interval.jtc_ms(qrs_s), 1)),
        basis,
        classified_ms: grid::round_to(classified, 1),
        ceiling_ms: ceiling,
    };

    let mut evidence = Evidence::new()
        .value("qt", interval.qt_ms(), "ms")
        .value("rr_interval", rate.rr_seconds, "s")
        .value("qtc", qtc, "ms");
    if wide {
        evidence = evidence
            .value("jt", interval.jt_ms(qrs_s), "ms")
            .value("jtc", interval.jtc_ms(qrs_s), "ms");
    }

    let mut finding = Finding::new(Diagnosis::Qt(class))
        .with_evidence(evidence)
        .with_detail(format!(
            "QTc (Bazett) {:.0} ms, ceiling {:.0} ms",
            qtc, ceiling
        ));
    if wide {
        finding = finding.with_detail(format!(
            "Wide QRS: classified on JTc {:.0} ms + {:.0} ms allowance",
            interval.jtc_ms(qrs_s),
            NORMAL_QRS_ALLOWANCE_MS
        ));
    }
    finding = match class {
        QtClass::Prolonged { torsades } => {
            let note = match torsades {
                TorsadesRisk::High => "Above 500 ms: high risk of torsades de pointes",
                TorsadesRisk::Elevated => "Risk of torsades de pointes",
            };
            finding.with_detail(note).with_differential(PROLONGED_CAUSES)
        }
        QtClass::Short => finding.with_differential(SHORT_CAUSES),
        QtClass::Normal => finding,
    };

    QtResult {
        measures: Some(measures),
        class: Assessment::determined(class),
        finding: Some(finding),
    }
}
