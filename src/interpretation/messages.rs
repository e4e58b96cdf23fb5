use super::types::*;

/// Plain-language labels for findings, used in the report impression.
pub struct MessageTemplates;

impl MessageTemplates {
    /// One-line statement for a finding.
    pub fn statement(finding: &Finding) -> String {
        let label = Self::label(&finding.diagnosis);
        match finding.severity {
            Severity::Emergent => format!("{} (EMERGENT)", label),
            Severity::Urgent => format!("{} (urgent)", label),
            _ => label,
        }
    }

    pub fn label(diagnosis: &Diagnosis) -> String {
        match diagnosis {
            Diagnosis::Rate(r) => match r {
                RateClass::Bradycardia => "Bradycardia".into(),
                RateClass::Normal => "Normal heart rate".into(),
                RateClass::Tachycardia => "Tachycardia".into(),
            },
            Diagnosis::AtrialRhythm(r) => Self::atrial_rhythm(r),
            Diagnosis::AtrialEnlargement(e) => match e {
                AtrialEnlargement::Left => "Left atrial enlargement".into(),
                AtrialEnlargement::PossibleLeft => "Possible left atrial enlargement".into(),
                AtrialEnlargement::Right => "Right atrial enlargement".into(),
            },
            Diagnosis::Conduction(c) => Self::conduction(c),
            Diagnosis::PrSegment(p) => match p {
                PrSegmentFinding::PericarditisPattern => {
                    "PR depression inferiorly with PR elevation in aVR (pericarditis pattern)"
                        .into()
                }
                PrSegmentFinding::AtrialInfarctionPattern => {
                    "PR segment elevation (possible atrial infarction)".into()
                }
            },
            Diagnosis::VentricularPattern(p) => Self::ventricular(p),
            Diagnosis::QWaveInfarct(t) => {
                format!("Pathologic Q waves, {} territory (old infarction)", Self::infarct(t))
            }
            Diagnosis::RProgression(p) => match p {
                RProgression::Normal => "Normal R wave progression".into(),
                RProgression::Poor => "Poor R wave progression".into(),
                RProgression::EarlyTransition => "Early R wave transition".into(),
                RProgression::LateTransition => "Late R wave transition".into(),
            },
            Diagnosis::Hypertrophy(h) => match h {
                Hypertrophy::LvhByVoltage => "Left ventricular hypertrophy by voltage".into(),
                Hypertrophy::Rvh => "Right ventricular hypertrophy".into(),
                Hypertrophy::PossibleLvhInLbbb => "Possible LVH (LBBB present)".into(),
            },
            Diagnosis::Axis(a) => match a {
                AxisDeviation::Normal => "Normal axis".into(),
                AxisDeviation::Left => "Left axis deviation".into(),
                AxisDeviation::Right => "Right axis deviation".into(),
                AxisDeviation::Extreme => "Extreme axis deviation".into(),
            },
            Diagnosis::StSegment(s) => Self::st(s),
            Diagnosis::TWave(t) => match t {
                TFinding::Wellens => "Deep symmetric T inversion V2-V4 (Wellens pattern)".into(),
                TFinding::InferiorIschemia => "Inferior T wave inversion (ischemia)".into(),
                TFinding::LateralIschemia => "Lateral T wave inversion (ischemia)".into(),
                TFinding::NonspecificInversion => "Nonspecific T wave inversion".into(),
                TFinding::Peaked => "Peaked T waves".into(),
                TFinding::Flattened => "Flattened T waves".into(),
                TFinding::Biphasic => "Biphasic T waves".into(),
                TFinding::Tall => "Tall T waves".into(),
                TFinding::SecondaryToConduction => {
                    "Discordant T waves secondary to abnormal depolarization".into()
                }
            },
            Diagnosis::Qt(q) => match q {
                QtClass::Normal => "Normal QTc".into(),
                QtClass::Prolonged {
                    torsades: TorsadesRisk::High,
                } => "Prolonged QTc > 500 ms (high torsades risk)".into(),
                QtClass::Prolonged { .. } => "Prolonged QTc (torsades risk)".into(),
                QtClass::Short => "Short QTc".into(),
            },
            Diagnosis::UWave(u) => match u {
                UFinding::Absent => "No U waves".into(),
                UFinding::Normal => "Normal U waves".into(),
                UFinding::Prominent => "Prominent U waves".into(),
                UFinding::Inverted => "Inverted U waves".into(),
            },
            Diagnosis::ChamberEnlargement(c) => match c {
                FibrillationChamber::SupportiveLae => {
                    "f-wave morphology supportive of left atrial enlargement".into()
                }
                FibrillationChamber::SupportiveRae => {
                    "f-wave morphology supportive of right atrial enlargement".into()
                }
            },
            Diagnosis::EscapeRhythm(e) => match e {
                EscapeRhythm::Junctional => "Junctional rhythm (narrow QRS, no P waves)".into(),
                EscapeRhythm::Ventricular => {
                    "Ventricular escape rhythm (wide QRS, no P waves)".into()
                }
            },
        }
    }

    fn atrial_rhythm(rhythm: &AtrialRhythm) -> String {
        match rhythm {
            AtrialRhythm::NormalSinus => "Normal sinus rhythm".into(),
            AtrialRhythm::SinusBradycardia => "Sinus bradycardia".into(),
            AtrialRhythm::SinusTachycardia => "Sinus tachycardia".into(),
            AtrialRhythm::EctopicAtrial { origin } => match origin {
                AtrialOrigin::LeftAtrial => "Left atrial rhythm".into(),
                AtrialOrigin::LowAtrial => "Low atrial rhythm".into(),
                AtrialOrigin::Sinus | AtrialOrigin::Ectopic => "Ectopic atrial rhythm".into(),
            },
            AtrialRhythm::AtrialTachycardia => "Atrial tachycardia".into(),
            AtrialRhythm::AtrialFlutter => "Atrial flutter".into(),
            AtrialRhythm::AtrialFibrillation => "Atrial fibrillation".into(),
            AtrialRhythm::JunctionalOrVentricular => {
                "No atrial activity (junctional or ventricular rhythm)".into()
            }
        }
    }

    fn conduction(class: &ConductionClass) -> String {
        match class {
            ConductionClass::Normal => "Normal AV conduction".into(),
            ConductionClass::ShortPr => "Short PR interval without delta wave".into(),
            ConductionClass::PreExcitation => "Short PR with delta wave (pre-excitation)".into(),
            ConductionClass::FirstDegreeAvBlock => "First-degree AV block".into(),
            ConductionClass::MobitzI => "Second-degree AV block, Mobitz I (Wenckebach)".into(),
            ConductionClass::MobitzII => "Second-degree AV block, Mobitz II".into(),
            ConductionClass::TwoToOneAvBlock => "2:1 AV block".into(),
            ConductionClass::HighGradeAvBlock { ratio } => {
                format!("High-grade AV block ({}:1)", ratio)
            }
            ConductionClass::CompleteHeartBlock => "Complete heart block".into(),
            ConductionClass::JunctionalOrVentricularEscape => {
                "More QRS complexes than P waves (escape rhythm)".into()
            }
            ConductionClass::NoAtrialActivity => "AV conduction not assessable".into(),
        }
    }

    fn ventricular(pattern: &VentricularPattern) -> String {
        match pattern {
            VentricularPattern::Paced => "Ventricular paced rhythm".into(),
            VentricularPattern::VentricularTachycardia => "Ventricular tachycardia".into(),
            VentricularPattern::IdioventricularRhythm => "Idioventricular rhythm".into(),
            VentricularPattern::Wpw => "Wolff-Parkinson-White pattern".into(),
            VentricularPattern::Lbbb { strauss: true } => {
                "Left bundle branch block (Strauss criteria met)".into()
            }
            VentricularPattern::Lbbb { strauss: false } => "Left bundle branch block".into(),
            VentricularPattern::Rbbb { fascicular } => match fascicular {
                Some(FascicularBlock::LeftAnterior) => {
                    "Bifascicular block (RBBB with left anterior fascicular block)".into()
                }
                Some(FascicularBlock::LeftPosterior) => {
                    "RBBB with left posterior fascicular block".into()
                }
                None => "Right bundle branch block".into(),
            },
            VentricularPattern::IncompleteRbbb => "Incomplete right bundle branch block".into(),
            VentricularPattern::NonspecificIvcd => {
                "Nonspecific intraventricular conduction delay".into()
            }
        }
    }

    fn infarct(territory: &InfarctTerritory) -> &'static str {
        match territory {
            InfarctTerritory::Inferior => "inferior",
            InfarctTerritory::Anterior => "anterior",
            InfarctTerritory::Lateral => "lateral",
            InfarctTerritory::Posterior => "posterior",
        }
    }

    fn st(finding: &StFinding) -> String {
        match finding {
            StFinding::Stemi {
                territory,
                reciprocal,
            } => {
                let site = match territory {
                    StemiTerritory::Inferior => "Inferior",
                    StemiTerritory::Anterior => "Anterior",
                    StemiTerritory::Lateral => "Lateral",
                    StemiTerritory::Anterolateral => "Anterolateral",
                };
                if *reciprocal {
                    format!("{} STEMI with reciprocal depression", site)
                } else {
                    format!("{} STEMI", site)
                }
            }
            StFinding::ConcaveElevation => {
                "Concave ST elevation (early repolarization vs pericarditis)".into()
            }
            StFinding::Pericarditis => "Diffuse ST elevation with PR depression (pericarditis)".into(),
            StFinding::LeftMainOrMultivessel => {
                "ST elevation in aVR with diffuse depression (left main / multivessel)".into()
            }
            StFinding::PosteriorMi => "Posterior myocardial infarction".into(),
            StFinding::IschemicDepression { diffuse: true } => {
                "Diffuse ST depression (subendocardial ischemia)".into()
            }
            StFinding::IschemicDepression { diffuse: false } => "Ischemic ST depression".into(),
            StFinding::RateRelatedDepression => "Rate-related upsloping ST depression".into(),
            StFinding::SecondaryToConduction => {
                "Discordant ST shift secondary to abnormal depolarization".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergent_statements_are_marked() {
        let f = Finding::new(Diagnosis::StSegment(StFinding::Stemi {
            territory: StemiTerritory::Inferior,
            reciprocal: true,
        }));
        assert_eq!(
            MessageTemplates::statement(&f),
            "Inferior STEMI with reciprocal depression (EMERGENT)"
        );
    }

    #[test]
    fn benign_statements_are_plain() {
        let f = Finding::new(Diagnosis::AtrialRhythm(AtrialRhythm::NormalSinus));
        assert_eq!(MessageTemplates::statement(&f), "Normal sinus rhythm");
    }

    #[test]
    fn high_grade_block_names_ratio() {
        let label = MessageTemplates::label(&Diagnosis::Conduction(
            ConductionClass::HighGradeAvBlock { ratio: 3 },
        ));
        assert_eq!(label, "High-grade AV block (3:1)");
    }
}
