//! Per-individual disease progression.
//!
//! * [`timeline`] samples the anchors and heights of a viral load curve.
//! * [`viral_load`] evaluates that curve and maps it to infectiousness.
//! * [`symptoms`] turns a phase and a set of risk factors into symptoms.
//! * [`progression`] ties the three together into a day-by-day view, and
//!   also tracks the colds, flus and allergies that produce look-alike symptoms.

pub mod progression;
pub mod symptoms;
pub mod timeline;
pub mod viral_load;

use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

pub use progression::{DailyProgression, Episode, Progression};
pub use symptoms::{Disease, DiseasePhase, Severity, Symptom, SymptomFactors, SymptomSet};
pub use timeline::{DiseaseModel, DiseaseParams, OtherDiseaseParams, TimelineAnchors};
pub use viral_load::ViralLoadCurve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PreexistingCondition {
    Smoker,
    LungDisease,
    Diabetes,
    HeartDisease,
    Hypertension,
    Obesity,
    Cancer,
    ImmunoSuppressed,
    Asthma,
    Allergies,
    Pregnant,
}

impl PreexistingCondition {
    /// Conditions counted towards an individual's inflammatory level.
    #[must_use]
    pub fn is_inflammatory(self) -> bool {
        matches!(
            self,
            PreexistingCondition::Smoker
                | PreexistingCondition::LungDisease
                | PreexistingCondition::Diabetes
                | PreexistingCondition::HeartDisease
                | PreexistingCondition::Hypertension
                | PreexistingCondition::Obesity
                | PreexistingCondition::ImmunoSuppressed
        )
    }

    // Base prevalence, before the age adjustment in `RiskFactors::sample`.
    fn prevalence(self) -> f64 {
        match self {
            PreexistingCondition::Smoker => 0.15,
            PreexistingCondition::Hypertension | PreexistingCondition::Obesity => 0.1,
            PreexistingCondition::Allergies => 0.2,
            PreexistingCondition::Diabetes | PreexistingCondition::Asthma => 0.07,
            PreexistingCondition::HeartDisease | PreexistingCondition::Cancer => 0.04,
            PreexistingCondition::LungDisease | PreexistingCondition::ImmunoSuppressed => 0.03,
            PreexistingCondition::Pregnant => 0.01,
        }
    }

    fn increases_with_age(self) -> bool {
        !matches!(
            self,
            PreexistingCondition::Allergies | PreexistingCondition::Asthma | PreexistingCondition::Pregnant
        )
    }
}

/// Everything about an individual that shapes how an infection plays out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub age: f64,
    /// In [0, 1]. Careful people report fewer fatigue and breathing symptoms.
    pub carefulness: f64,
    pub preexisting_conditions: Vec<PreexistingCondition>,
    pub really_sick: bool,
    pub extremely_sick: bool,
}

impl RiskFactors {
    /// A healthy individual with no conditions.
    #[must_use]
    pub fn new(age: f64, carefulness: f64) -> Self {
        RiskFactors {
            age,
            carefulness,
            preexisting_conditions: Vec::new(),
            really_sick: false,
            extremely_sick: false,
        }
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: impl IntoIterator<Item = PreexistingCondition>) -> Self {
        self.preexisting_conditions.extend(conditions);
        self
    }

    #[must_use]
    pub fn inflammatory_level(&self) -> usize {
        self.preexisting_conditions
            .iter()
            .filter(|condition| condition.is_inflammatory())
            .count()
    }

    #[must_use]
    pub fn smoker_or_lung_disease(&self) -> bool {
        self.preexisting_conditions.iter().any(|condition| {
            matches!(
                condition,
                PreexistingCondition::Smoker | PreexistingCondition::LungDisease
            )
        })
    }

    /// Draws a synthetic individual. Older people and people with more
    /// conditions are more likely to become really or extremely sick.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let age = f64::from(rng.random_range(0_u32..90));
        let carefulness = rng.random::<f64>();
        let age_factor = age / 90.0;
        let preexisting_conditions: Vec<_> = PreexistingCondition::iter()
            .filter(|condition| {
                let p = if condition.increases_with_age() {
                    condition.prevalence() * (0.5 + age_factor)
                } else {
                    condition.prevalence()
                };
                rng.random_bool(p.min(1.0))
            })
            .collect();

        let vulnerable = age >= 65.0 || !preexisting_conditions.is_empty();
        let really_sick = vulnerable && rng.random::<f64>() >= 0.9;
        let extremely_sick = really_sick && (age >= 75.0 || preexisting_conditions.len() > 1) && rng.random::<f64>() >= 0.7;
        RiskFactors {
            age,
            carefulness,
            preexisting_conditions,
            really_sick,
            extremely_sick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn inflammatory_level_counts_inflammatory_conditions() {
        let factors = RiskFactors::new(60.0, 0.2).with_conditions([
            PreexistingCondition::Smoker,
            PreexistingCondition::Asthma,
            PreexistingCondition::Diabetes,
        ]);
        assert_eq!(factors.inflammatory_level(), 2);
        assert!(factors.smoker_or_lung_disease());
        assert!(!RiskFactors::new(30.0, 0.5).smoker_or_lung_disease());
    }

    #[test]
    fn sampled_factors_are_consistent() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..5_000 {
            let factors = RiskFactors::sample(&mut rng);
            assert!((0.0..90.0).contains(&factors.age));
            assert!((0.0..1.0).contains(&factors.carefulness));
            assert!(!factors.extremely_sick || factors.really_sick);
            if factors.really_sick {
                assert!(factors.age >= 65.0 || !factors.preexisting_conditions.is_empty());
            }
        }
    }

    #[test]
    fn conditions_serialize_as_snake_case() {
        let json = serde_json::to_string(&PreexistingCondition::ImmunoSuppressed).unwrap();
        assert_eq!(json, "\"immuno_suppressed\"");
        assert_eq!(PreexistingCondition::LungDisease.to_string(), "lung_disease");
    }
}
