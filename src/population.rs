//! The individuals of a simulation.
//!
//! Individuals live in one flat arena owned by a data plugin and are referred
//! to everywhere else by [`PersonId`], their index in that arena. Nothing
//! holds a reference to another individual.
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use log::{info, trace};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use strum::Display as StrumDisplay;

use crate::contact_book::ContactBook;
use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::disease::{
    DailyProgression, Disease, DiseaseModel, Episode, Progression, RiskFactors, SymptomSet,
};
use crate::error::SimError;
use crate::parameters::parameters;
use crate::random::ContextRandomExt;
use crate::risk::{Day, RiskHistory, TestResult};

define_rng!(PopulationRng);
define_rng!(DiseaseRng);
define_rng!(OtherDiseaseRng);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(usize);

impl PersonId {
    #[must_use]
    pub fn new(index: usize) -> Self {
        PersonId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InfectionStatus {
    Susceptible,
    Infected,
    Recovered,
    Dead,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Infection {
    /// Time of exposure.
    pub time: f64,
    pub progression: Progression,
}

#[derive(Debug, Clone)]
pub struct Individual {
    pub id: PersonId,
    pub risk_factors: RiskFactors,
    pub has_app: bool,
    pub status: InfectionStatus,
    pub infection: Option<Infection>,
    /// Colds, flus and allergies, current and past.
    pub episodes: Vec<Episode>,
    pub contact_book: ContactBook,
    pub risk_history: RiskHistory,
    /// Highest level received per encounter day.
    pub received_levels: BTreeMap<Day, u32>,
    pub test_result: Option<TestResult>,
    pub test_day: Option<Day>,
}

impl Individual {
    fn new(id: PersonId, risk_factors: RiskFactors, has_app: bool) -> Self {
        Individual {
            id,
            risk_factors,
            has_app,
            status: InfectionStatus::Susceptible,
            infection: None,
            episodes: Vec::new(),
            contact_book: ContactBook::new(id),
            risk_history: RiskHistory::new(),
            received_levels: BTreeMap::new(),
            test_result: None,
            test_day: None,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != InfectionStatus::Dead
    }

    /// Covid state at `time`, if ever infected.
    #[must_use]
    pub fn progression_at(&self, time: f64) -> Option<DailyProgression> {
        self.infection
            .as_ref()
            .map(|infection| infection.progression.on_day(time - infection.time))
    }

    /// Everything the individual notices on `day`, covid or not.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn symptoms_on(&self, day: Day) -> SymptomSet {
        let mut symptoms = match (&self.infection, self.status) {
            (Some(_), InfectionStatus::Infected) => self
                .progression_at(day as f64)
                .map(|p| p.symptoms)
                .unwrap_or_default(),
            _ => SymptomSet::new(),
        };
        for episode in &self.episodes {
            symptoms.extend(episode.symptoms_on(day, &self.risk_factors));
        }
        symptoms
    }
}

/// Head counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
    pub dead: usize,
}

struct PopulationData {
    individuals: Vec<Individual>,
    model: Option<DiseaseModel>,
}

define_data_plugin!(
    PopulationPlugin,
    PopulationData,
    PopulationData {
        individuals: Vec::new(),
        model: None,
    }
);

pub trait ContextPopulationExt {
    /// Builds the disease model and the population described by `Params`, then
    /// seeds the initial infections at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the disease parameters are invalid or a timeline
    /// cannot be sampled.
    fn init_population(&mut self) -> Result<(), SimError>;

    fn set_disease_model(&mut self, model: DiseaseModel);

    fn add_individual(&mut self, risk_factors: RiskFactors, has_app: bool) -> PersonId;

    fn get_population_size(&self) -> usize;

    /// # Errors
    ///
    /// Returns `SimError::UnknownPerson` if `person_id` is not in the population.
    fn try_individual(&self, person_id: PersonId) -> Result<&Individual, SimError>;

    /// # Panics
    ///
    /// Panics if `person_id` is not in the population.
    fn individual(&self, person_id: PersonId) -> &Individual;

    /// # Panics
    ///
    /// Panics if `person_id` is not in the population.
    fn individual_mut(&mut self, person_id: PersonId) -> &mut Individual;

    /// Ids of everyone not dead, in ascending order.
    fn live_individuals(&self) -> Vec<PersonId>;

    /// Exposes a susceptible individual at the current time. Returns whether
    /// an infection actually started.
    ///
    /// # Errors
    ///
    /// Returns an error if no disease model is set or the timeline cannot be sampled.
    fn infect(&mut self, person_id: PersonId) -> Result<bool, SimError>;

    fn kill(&mut self, person_id: PersonId);

    fn progression_on(&self, person_id: PersonId) -> Option<DailyProgression>;

    fn symptoms_on(&self, person_id: PersonId, day: Day) -> SymptomSet;

    /// Ends finished colds, flus and allergies and starts new ones for every
    /// live individual.
    fn advance_other_diseases(&mut self, day: Day);

    fn status_counts(&self) -> StatusCounts;
}

fn unknown_person(person_id: PersonId) -> ! {
    panic!("Unknown person: {person_id}")
}

impl ContextPopulationExt for Context {
    fn init_population(&mut self) -> Result<(), SimError> {
        let params = parameters(self).clone();
        self.set_disease_model(DiseaseModel::new(params.disease)?);

        for _ in 0..params.population {
            let (risk_factors, has_app) = self.sample(PopulationRng, |rng| {
                (RiskFactors::sample(rng), rng.random_bool(params.app_uptake))
            });
            self.add_individual(risk_factors, has_app);
        }

        let seeded = self.sample(PopulationRng, |rng| {
            rand::seq::index::sample(rng, params.population, params.initial_infections).into_vec()
        });
        for index in seeded {
            self.infect(PersonId(index))?;
        }
        info!(
            "created {} individuals, {} with the app, {} infected",
            params.population,
            self.get_data_container(PopulationPlugin)
                .map_or(0, |data| data.individuals.iter().filter(|i| i.has_app).count()),
            params.initial_infections
        );
        Ok(())
    }

    fn set_disease_model(&mut self, model: DiseaseModel) {
        self.get_data_container_mut(PopulationPlugin).model = Some(model);
    }

    fn add_individual(&mut self, risk_factors: RiskFactors, has_app: bool) -> PersonId {
        let individuals = &mut self.get_data_container_mut(PopulationPlugin).individuals;
        let person_id = PersonId(individuals.len());
        individuals.push(Individual::new(person_id, risk_factors, has_app));
        person_id
    }

    fn get_population_size(&self) -> usize {
        self.get_data_container(PopulationPlugin)
            .map_or(0, |data| data.individuals.len())
    }

    fn try_individual(&self, person_id: PersonId) -> Result<&Individual, SimError> {
        self.get_data_container(PopulationPlugin)
            .and_then(|data| data.individuals.get(person_id.0))
            .ok_or(SimError::UnknownPerson(person_id))
    }

    fn individual(&self, person_id: PersonId) -> &Individual {
        self.try_individual(person_id)
            .unwrap_or_else(|_| unknown_person(person_id))
    }

    fn individual_mut(&mut self, person_id: PersonId) -> &mut Individual {
        self.get_data_container_mut(PopulationPlugin)
            .individuals
            .get_mut(person_id.0)
            .unwrap_or_else(|| unknown_person(person_id))
    }

    fn live_individuals(&self) -> Vec<PersonId> {
        self.get_data_container(PopulationPlugin)
            .map(|data| {
                data.individuals
                    .iter()
                    .filter(|individual| individual.is_alive())
                    .map(|individual| individual.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn infect(&mut self, person_id: PersonId) -> Result<bool, SimError> {
        let time = self.get_current_time();
        let progression = {
            let data = self
                .get_data_container(PopulationPlugin)
                .ok_or(SimError::UnknownPerson(person_id))?;
            let individual = data
                .individuals
                .get(person_id.0)
                .ok_or(SimError::UnknownPerson(person_id))?;
            if individual.status != InfectionStatus::Susceptible {
                return Ok(false);
            }
            let model = data
                .model
                .as_ref()
                .ok_or_else(|| SimError::SimError("No disease model has been set".to_string()))?;
            let risk_factors = &individual.risk_factors;
            self.sample(DiseaseRng, |rng| -> Result<Progression, SimError> {
                let curve = model.sample_timeline(
                    risk_factors.age,
                    risk_factors.inflammatory_level(),
                    rng,
                )?;
                let initial_viral_load = rng.random::<f64>();
                Ok(Progression::new(
                    curve,
                    risk_factors,
                    initial_viral_load,
                    rng.random(),
                    model.params().viral_load_to_infectiousness_multiplier,
                ))
            })?
        };
        trace!("person {person_id} infected at t={time:.2}");
        let individual = self.individual_mut(person_id);
        individual.status = InfectionStatus::Infected;
        individual.infection = Some(Infection { time, progression });
        Ok(true)
    }

    fn kill(&mut self, person_id: PersonId) {
        trace!("person {person_id} died at t={:.2}", self.get_current_time());
        self.individual_mut(person_id).status = InfectionStatus::Dead;
    }

    fn progression_on(&self, person_id: PersonId) -> Option<DailyProgression> {
        self.individual(person_id)
            .progression_at(self.get_current_time())
    }

    fn symptoms_on(&self, person_id: PersonId, day: Day) -> SymptomSet {
        self.individual(person_id).symptoms_on(day)
    }

    fn advance_other_diseases(&mut self, day: Day) {
        let Some(data) = self.get_data_container(PopulationPlugin) else {
            return;
        };
        let Some(model) = data.model.as_ref() else {
            return;
        };
        let other = model.params().other_diseases.clone();
        let mut started = Vec::new();
        for individual in data.individuals.iter().filter(|i| i.is_alive()) {
            for (disease, p_today) in [
                (Disease::Cold, other.p_cold_today),
                (Disease::Flu, other.p_flu_today),
                (Disease::Allergy, other.p_allergy_today),
            ] {
                let ongoing = individual
                    .episodes
                    .iter()
                    .any(|episode| episode.disease == disease && !episode.is_over(day));
                if ongoing {
                    continue;
                }
                if let Some(episode) = self.sample(OtherDiseaseRng, |rng| {
                    rng.random_bool(p_today)
                        .then(|| Episode::sample(disease, day, &other, rng))
                }) {
                    started.push((individual.id, episode));
                }
            }
        }

        for individual in &mut self.get_data_container_mut(PopulationPlugin).individuals {
            individual.episodes.retain(|episode| !episode.is_over(day));
        }
        for (person_id, episode) in started {
            trace!("person {person_id} caught {:?} on day {day}", episode.disease);
            self.individual_mut(person_id).episodes.push(episode);
        }
    }

    fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        if let Some(data) = self.get_data_container(PopulationPlugin) {
            for individual in &data.individuals {
                match individual.status {
                    InfectionStatus::Susceptible => counts.susceptible += 1,
                    InfectionStatus::Infected => counts.infected += 1,
                    InfectionStatus::Recovered => counts.recovered += 1,
                    InfectionStatus::Dead => counts.dead += 1,
                }
            }
        }
        counts
    }
}
