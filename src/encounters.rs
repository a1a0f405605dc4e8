//! A minimal random-mixing contact process.
//!
//! Once a day every live individual meets `contacts_per_day` others drawn
//! uniformly from the live population. When both parties run the app, each
//! records the encounter under a shared, fresh [`EncounterUid`]. An infected
//! party transmits to a susceptible one with probability
//! `min(1, transmission_scale * average_infectiousness)`.
use log::trace;
use rand::Rng;

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::error::SimError;
use crate::mailbox::EncounterUid;
use crate::parameters::parameters;
use crate::plan::ExecutionPhase;
use crate::population::{ContextPopulationExt, InfectionStatus, PersonId};
use crate::random::ContextRandomExt;

define_rng!(EncounterRng);
define_rng!(TransmissionRng);

define_data_plugin!(EncounterCounter, u64, 0);

/// Transmission probability from `source` for one encounter today, or 0 if
/// `source` is not infectious.
fn transmission_probability(context: &Context, source: PersonId, scale: f64) -> f64 {
    let individual = context.individual(source);
    if individual.status != InfectionStatus::Infected {
        return 0.0;
    }
    context
        .progression_on(source)
        .map_or(0.0, |progression| (scale * progression.infectiousness).min(1.0))
}

fn try_transmit(
    context: &mut Context,
    source: PersonId,
    target: PersonId,
    scale: f64,
) -> Result<(), SimError> {
    if context.individual(target).status != InfectionStatus::Susceptible {
        return Ok(());
    }
    let p = transmission_probability(context, source, scale);
    if p > 0.0 && context.sample_bool(TransmissionRng, p) && context.infect(target)? {
        trace!("person {source} infected person {target}");
    }
    Ok(())
}

/// Runs one day of encounters at the current time.
///
/// # Errors
///
/// Returns an error if a new infection's timeline cannot be sampled.
pub fn run_encounters(context: &mut Context) -> Result<(), SimError> {
    let params = parameters(context);
    let contacts_per_day = params.contacts_per_day;
    let scale = params.transmission_scale;
    let time = context.get_current_time();

    let live = context.live_individuals();
    if live.len() < 2 {
        return Ok(());
    }
    for &person_id in &live {
        for _ in 0..contacts_per_day.min(live.len() - 1) {
            let other = context.sample(EncounterRng, |rng| loop {
                let candidate = live[rng.random_range(0..live.len())];
                if candidate != person_id {
                    break candidate;
                }
            });
            if context.individual(person_id).has_app && context.individual(other).has_app {
                let counter = context.get_data_container_mut(EncounterCounter);
                *counter += 1;
                let uid = EncounterUid(*counter);
                context
                    .individual_mut(person_id)
                    .contact_book
                    .record_contact(other, uid, time);
                context
                    .individual_mut(other)
                    .contact_book
                    .record_contact(person_id, uid, time);
            }

            try_transmit(context, person_id, other, scale)?;
            try_transmit(context, other, person_id, scale)?;
        }
    }
    Ok(())
}

fn schedule_day(context: &mut Context, day: u32, max_days: u32) {
    if day >= max_days {
        return;
    }
    context.add_plan_with_phase(
        f64::from(day),
        move |context| {
            if let Err(error) = run_encounters(context) {
                panic!("Encounters on day {day} failed: {error}");
            }
            schedule_day(context, day + 1, max_days);
        },
        ExecutionPhase::First,
    );
}

/// Schedules a day of encounters at the start of every day up to `max_days`.
pub fn init(context: &mut Context) {
    let max_days = parameters(context).max_days;
    let first_day = u32::try_from(context.get_current_day()).unwrap_or(0);
    schedule_day(context, first_day, max_days);
}
