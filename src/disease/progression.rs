//! Day-by-day view of an infection or a background illness.
//!
//! Symptoms are never stored. Each phase's draw is seeded from the
//! individual's seed and the phase name, so asking for the same day twice
//! gives the same answer and a later phase can replay earlier ones to find
//! the symptoms that linger.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_derive::{Deserialize, Serialize};

use crate::disease::symptoms::{phase_symptoms, Disease, DiseasePhase, Symptom, SymptomFactors, SymptomSet};
use crate::disease::timeline::OtherDiseaseParams;
use crate::disease::viral_load::ViralLoadCurve;
use crate::disease::RiskFactors;
use crate::hashing::hash_str;

fn phase_rng(seed: u64, phase: DiseasePhase) -> SmallRng {
    SmallRng::seed_from_u64(seed.wrapping_add(hash_str(&phase.to_string())))
}

/// Whether a symptom drawn in phase `from` is still present in the later phase `to`.
fn lingers(symptom: Symptom, from: DiseasePhase, to: DiseasePhase) -> bool {
    match symptom {
        Symptom::Gastro | Symptom::Diarrhea | Symptom::NauseaVomiting => true,
        Symptom::LossOfTaste => from == DiseasePhase::CovidOnset && to == DiseasePhase::CovidPlateau,
        _ => false,
    }
}

/// What an infected individual looks like on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyProgression {
    /// `None` once the individual has recovered.
    pub phase: Option<DiseasePhase>,
    pub viral_load: f64,
    /// Average over the day.
    pub infectiousness: f64,
    pub symptoms: SymptomSet,
}

/// A covid infection, fixed at the moment of exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    curve: ViralLoadCurve,
    factors: SymptomFactors,
    seed: u64,
    infectiousness_multiplier: f64,
}

impl Progression {
    #[must_use]
    pub fn new(
        curve: ViralLoadCurve,
        risk_factors: &RiskFactors,
        initial_viral_load: f64,
        seed: u64,
        infectiousness_multiplier: f64,
    ) -> Self {
        Progression {
            curve,
            factors: SymptomFactors::new(risk_factors, initial_viral_load),
            seed,
            infectiousness_multiplier,
        }
    }

    #[must_use]
    pub fn curve(&self) -> &ViralLoadCurve {
        &self.curve
    }

    #[must_use]
    pub fn initial_viral_load(&self) -> f64 {
        self.factors.initial_viral_load
    }

    /// The covid phase `days` after exposure. Post-plateau is split evenly
    /// between its two phases.
    #[must_use]
    pub fn phase_at(&self, days: f64) -> Option<DiseasePhase> {
        let a = self.curve.anchors();
        let post_plateau_midpoint = a.plateau_end_day + (a.recovery_day - a.plateau_end_day) / 2.0;
        if days < a.incubation_day {
            Some(DiseasePhase::CovidIncubation)
        } else if days < a.plateau_start_day {
            Some(DiseasePhase::CovidOnset)
        } else if days < a.plateau_end_day {
            Some(DiseasePhase::CovidPlateau)
        } else if days < post_plateau_midpoint {
            Some(DiseasePhase::CovidPostPlateau1)
        } else if days < a.recovery_day {
            Some(DiseasePhase::CovidPostPlateau2)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_recovered(&self, days: f64) -> bool {
        self.phase_at(days).is_none()
    }

    /// Symptoms for a covid phase, including those lingering from earlier phases.
    #[must_use]
    pub fn symptoms_in_phase(&self, phase: DiseasePhase) -> SymptomSet {
        let mut symptoms = SymptomSet::new();
        for earlier in DiseasePhase::COVID.iter().take_while(|p| **p < phase) {
            let drawn = phase_symptoms(*earlier, &self.factors, &mut phase_rng(self.seed, *earlier));
            symptoms.extend(drawn.into_iter().filter(|s| lingers(*s, *earlier, phase)));
        }
        symptoms.extend(phase_symptoms(phase, &self.factors, &mut phase_rng(self.seed, phase)));
        symptoms
    }

    /// State `days` after exposure.
    #[must_use]
    pub fn on_day(&self, days: f64) -> DailyProgression {
        let phase = self.phase_at(days);
        DailyProgression {
            phase,
            viral_load: self.curve.viral_load(days),
            infectiousness: self
                .curve
                .average_infectiousness(days.floor(), self.infectiousness_multiplier),
            symptoms: phase.map(|p| self.symptoms_in_phase(p)).unwrap_or_default(),
        }
    }
}

/// Convenience form of [`Progression::on_day`] for a one-off query.
#[must_use]
pub fn progression(
    curve: ViralLoadCurve,
    risk_factors: &RiskFactors,
    initial_viral_load: f64,
    seed: u64,
    days: f64,
) -> DailyProgression {
    Progression::new(curve, risk_factors, initial_viral_load, seed, 1.0).on_day(days)
}

/// A cold, flu or allergy episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub disease: Disease,
    pub start_day: i64,
    pub duration_days: u32,
    seed: u64,
}

impl Episode {
    /// Draws the length of a new episode starting on `start_day`. Colds and
    /// flus last at least two days so they always have a first and last phase.
    ///
    /// # Panics
    ///
    /// Panics if `disease` is `Disease::Covid`.
    pub fn sample<R: Rng + ?Sized>(
        disease: Disease,
        start_day: i64,
        params: &OtherDiseaseParams,
        rng: &mut R,
    ) -> Self {
        let (avg_days, min_days) = match disease {
            Disease::Cold => (params.avg_cold_days, 2),
            Disease::Flu => (params.avg_flu_days, 2),
            Disease::Allergy => (params.avg_allergy_days, 1),
            Disease::Covid => panic!("covid is modelled by Progression, not Episode"),
        };
        // Uniform over [min, 2 * avg - min], which has mean `avg`.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_days = ((2.0 * avg_days).round() as u32).saturating_sub(min_days).max(min_days);
        Episode {
            disease,
            start_day,
            duration_days: rng.random_range(min_days..=max_days),
            seed: rng.random(),
        }
    }

    #[must_use]
    pub fn is_over(&self, day: i64) -> bool {
        day >= self.start_day + i64::from(self.duration_days)
    }

    #[must_use]
    pub fn phase_on(&self, day: i64) -> Option<DiseasePhase> {
        if day < self.start_day || self.is_over(day) {
            return None;
        }
        let offset = day - self.start_day;
        let last = i64::from(self.duration_days) - 1;
        let phase = match self.disease {
            Disease::Allergy => DiseasePhase::Allergy,
            Disease::Cold if offset == 0 => DiseasePhase::ColdOnset,
            Disease::Cold if offset == last => DiseasePhase::ColdLast,
            Disease::Cold => DiseasePhase::Cold,
            Disease::Flu if offset == 0 => DiseasePhase::FluFirst,
            Disease::Flu if offset == last => DiseasePhase::FluLast,
            Disease::Flu => DiseasePhase::Flu,
            Disease::Covid => return None,
        };
        Some(phase)
    }

    #[must_use]
    pub fn symptoms_on(&self, day: i64, risk_factors: &RiskFactors) -> SymptomSet {
        let factors = SymptomFactors::new(risk_factors, 0.0);
        self.phase_on(day)
            .map(|phase| phase_symptoms(phase, &factors, &mut phase_rng(self.seed, phase)))
            .unwrap_or_default()
    }
}
