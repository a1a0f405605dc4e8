//! Drives the contact-tracing exchange.
//!
//! A day is split into `updates_per_day` slots. In every slot each live app
//! user reads their mail, re-estimates their risk and proposes update messages
//! to past contacts; the [`MessageDispatcher`] then decides which of those go
//! out. After the last slot of each day a daily routine settles recoveries,
//! background illnesses and testing, sweeps stale state and writes reports.
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info, trace};
use rand::Rng;

use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::dispatch::{DispatchSummary, MessageDispatcher};
use crate::error::SimError;
use crate::mailbox::{UpdateMessage, UpdateReason};
use crate::parameters::parameters;
use crate::plan::ExecutionPhase;
use crate::population::{ContextPopulationExt, InfectionStatus, PersonId};
use crate::random::ContextRandomExt;
use crate::report::{
    ContextReportExt, DailyDispatchReport, DiseaseStatusReport, RiskChangeHistogramReport,
};
use crate::risk::{
    get_risk_level_change_score, Day, InferenceInput, RiskInference, RiskLevelMapper, TestResult,
};

define_rng!(DispatchRng);
define_rng!(TestingRng);
define_rng!(OutcomeRng);

struct TracingData {
    dispatcher: Option<MessageDispatcher>,
    mapper: Option<RiskLevelMapper>,
    inference: Option<Rc<dyn RiskInference>>,
    // Reset after every daily routine.
    today: DispatchSummary,
}

define_data_plugin!(
    TracingPlugin,
    TracingData,
    TracingData {
        dispatcher: None,
        mapper: None,
        inference: None,
        today: DispatchSummary::default(),
    }
);

impl TracingData {
    fn dispatcher_mut(&mut self) -> &mut MessageDispatcher {
        self.dispatcher
            .as_mut()
            .expect("Tracing must be initialized before it runs")
    }
}

pub trait ContextTracingExt {
    /// Replaces the risk model. Without a call to this, `init` uses the
    /// heuristic model configured in `Params`.
    fn set_risk_inference(&mut self, inference: impl RiskInference + 'static);

    /// # Panics
    ///
    /// Panics if `init` has not run.
    fn message_dispatcher(&self) -> &MessageDispatcher;

    /// One round of inference and message exchange at the current time.
    fn run_tracing_slot(&mut self) -> DispatchSummary;

    /// End-of-day bookkeeping for the current day.
    fn run_daily_routine(&mut self);
}

impl ContextTracingExt for Context {
    fn set_risk_inference(&mut self, inference: impl RiskInference + 'static) {
        self.get_data_container_mut(TracingPlugin).inference = Some(Rc::new(inference));
    }

    fn message_dispatcher(&self) -> &MessageDispatcher {
        self.get_data_container(TracingPlugin)
            .and_then(|data| data.dispatcher.as_ref())
            .expect("Tracing must be initialized before it runs")
    }

    fn run_tracing_slot(&mut self) -> DispatchSummary {
        let time = self.get_current_time();
        let day = self.get_current_day();
        let n_days_history = parameters(self).tracing.tracing_n_days_history;
        let (mapper, inference) = {
            let data = self
                .get_data_container(TracingPlugin)
                .expect("Tracing must be initialized before it runs");
            (
                data.mapper.clone().expect("Tracing must be initialized before it runs"),
                Rc::clone(data.inference.as_ref().expect("Tracing must be initialized before it runs")),
            )
        };

        let mut candidates = Vec::new();
        let mut scores = BTreeMap::new();
        for person_id in self.live_individuals() {
            if !self.individual(person_id).has_app {
                continue;
            }
            let inbox = self
                .get_data_container_mut(TracingPlugin)
                .dispatcher_mut()
                .drain(person_id);
            let symptoms = self.symptoms_on(person_id, day);

            let individual = self.individual_mut(person_id);
            for message in &inbox {
                #[allow(clippy::cast_possible_truncation)]
                let encounter_day = message.encounter_time.floor() as Day;
                let level = individual.received_levels.entry(encounter_day).or_insert(0);
                *level = (*level).max(message.new_risk_level);
            }

            let risk = inference.infer(&InferenceInput {
                day,
                symptoms: &symptoms,
                received_levels: &individual.received_levels,
                test_result: individual.test_result,
                levels: mapper.levels(),
            });
            individual.risk_history.record_inference(day, risk);
            let reason = if individual.test_result == Some(TestResult::Positive) {
                individual
                    .risk_history
                    .override_recent(day, n_days_history, 1.0);
                UpdateReason::PositiveTest
            } else {
                UpdateReason::RiskUpdate
            };

            let history = &individual.risk_history;
            let mut messages: Vec<UpdateMessage> = individual.contact_book.generate_updates(
                history.previous(),
                history.current(),
                &mapper,
                reason,
            );
            messages.extend(
                individual
                    .contact_book
                    .generate_initial_updates(history.current(), &mapper),
            );
            let score = get_risk_level_change_score(history.previous(), history.current(), &mapper);
            individual.risk_history.commit();

            if !messages.is_empty() {
                trace!(
                    "person {person_id}: risk {risk:.3}, {} candidate messages, score {score}",
                    messages.len()
                );
                scores.insert(person_id, score);
                candidates.extend(messages);
            }
        }

        let summary = self.with_data_mut(TracingPlugin, |data, context| {
            context.sample(DispatchRng, |rng| {
                data.dispatcher_mut()
                    .register_new_messages(day, time, candidates, &scores, rng)
            })
        });
        self.get_data_container_mut(TracingPlugin)
            .today
            .accumulate(&summary);
        summary
    }

    fn run_daily_routine(&mut self) {
        let time = self.get_current_time();
        let day = self.get_current_day();
        let params = parameters(self);
        let n_days_history = params.tracing.tracing_n_days_history;
        let test_probability = params.symptomatic_test_probability;
        let fatality = params.disease.extremely_sick_fatality;

        settle_outcomes(self, time, fatality);
        self.advance_other_diseases(day + 1);
        run_tests(self, day, test_probability, n_days_history);

        let evicted = self
            .get_data_container_mut(TracingPlugin)
            .dispatcher_mut()
            .evict(time);
        for person_id in self.live_individuals() {
            let individual = self.individual_mut(person_id);
            individual
                .contact_book
                .cleanup_contacts(time, n_days_history);
            individual.risk_history.prune(day - n_days_history);
            individual.received_levels = individual.received_levels.split_off(&(day - n_days_history));
        }

        send_daily_reports(self, day);

        let data = self.get_data_container_mut(TracingPlugin);
        let today = std::mem::take(&mut data.today);
        let dispatcher = data.dispatcher_mut();
        info!(
            "day {day} ({}): sent {} / {} messages, {} of {} senders admitted, {evicted} evicted",
            dispatcher.phase(day),
            dispatcher.sent_messages_on(day),
            dispatcher.daily_cap(),
            today.admitted_senders,
            today.candidate_senders
        );
    }
}

// Ends infections whose course is over. Extremely sick individuals may die instead.
fn settle_outcomes(context: &mut Context, time: f64, fatality: f64) {
    let finished: Vec<(PersonId, bool)> = context
        .live_individuals()
        .into_iter()
        .filter_map(|person_id| {
            let individual = context.individual(person_id);
            let infection = individual.infection.as_ref()?;
            (individual.status == InfectionStatus::Infected
                && infection.progression.is_recovered(time - infection.time))
            .then_some((person_id, individual.risk_factors.extremely_sick))
        })
        .collect();
    for (person_id, extremely_sick) in finished {
        if extremely_sick && context.sample_bool(OutcomeRng, fatality) {
            context.kill(person_id);
        } else {
            trace!("person {person_id} recovered at t={time:.2}");
            context.individual_mut(person_id).status = InfectionStatus::Recovered;
        }
    }
}

// Symptomatic people without a recent result are tested with some probability.
// Results expire after the tracing window.
fn run_tests(context: &mut Context, day: Day, probability: f64, n_days_history: Day) {
    for person_id in context.live_individuals() {
        let individual = context.individual(person_id);
        if individual
            .test_day
            .is_some_and(|test_day| day - test_day < n_days_history)
        {
            continue;
        }
        let symptomatic = !individual.symptoms_on(day).is_empty();
        let infected = individual.status == InfectionStatus::Infected;
        let tested = symptomatic && context.sample(TestingRng, |rng| rng.random_bool(probability));

        let individual = context.individual_mut(person_id);
        if tested {
            let result = if infected {
                TestResult::Positive
            } else {
                TestResult::Negative
            };
            debug!("person {person_id} tested {result:?} on day {day}");
            individual.test_result = Some(result);
            individual.test_day = Some(day);
        } else if individual.test_day.is_some() {
            individual.test_result = None;
            individual.test_day = None;
        }
    }
}

fn send_daily_reports(context: &Context, day: Day) {
    if context.has_report::<DailyDispatchReport>() {
        let today = &context
            .get_data_container(TracingPlugin)
            .expect("Tracing must be initialized before it runs")
            .today;
        let dispatcher = context.message_dispatcher();
        context.send_report(DailyDispatchReport {
            day,
            phase: dispatcher.phase(day),
            candidate_senders: today.candidate_senders,
            candidate_messages: today.candidate_messages,
            admitted_senders: today.admitted_senders,
            sent_messages: dispatcher.sent_messages_on(day),
            daily_cap: dispatcher.daily_cap(),
            rejected_spacing: today.rejected_spacing,
            rejected_cap: today.rejected_cap,
            rejected_lottery: today.rejected_lottery,
        });
    }
    if context.has_report::<RiskChangeHistogramReport>() {
        for (score, count) in context.message_dispatcher().histogram().iter() {
            context.send_report(RiskChangeHistogramReport { day, score, count });
        }
    }
    if context.has_report::<DiseaseStatusReport>() {
        let counts = context.status_counts();
        context.send_report(DiseaseStatusReport {
            day,
            susceptible: counts.susceptible,
            infected: counts.infected,
            recovered: counts.recovered,
            dead: counts.dead,
        });
    }
}

#[allow(clippy::cast_precision_loss)]
fn schedule_slot(context: &mut Context, slot: u64, updates_per_day: u32, max_days: u32) {
    let time = slot as f64 / f64::from(updates_per_day);
    if time >= f64::from(max_days) {
        return;
    }
    context.add_plan(time, move |context| {
        context.run_tracing_slot();
        schedule_slot(context, slot + 1, updates_per_day, max_days);
    });
}

fn schedule_daily_routine(context: &mut Context, day: u32, updates_per_day: u32, max_days: u32) {
    if day >= max_days {
        return;
    }
    let time = f64::from(day) + f64::from(updates_per_day - 1) / f64::from(updates_per_day);
    context.add_plan_with_phase(
        time,
        move |context| {
            context.run_daily_routine();
            schedule_daily_routine(context, day + 1, updates_per_day, max_days);
        },
        ExecutionPhase::Last,
    );
}

/// Builds the dispatcher for the current population and schedules the slot
/// and daily plans up to `max_days`.
///
/// # Errors
///
/// Returns `SimError::InvalidParameter` if the tracing parameters are invalid.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let params = parameters(context).clone();
    let dispatcher = MessageDispatcher::new(params.tracing.clone(), context.get_population_size())?;
    let mapper = RiskLevelMapper::uniform(params.tracing.risk_levels)?;
    info!(
        "tracing: {} slots per day, daily cap {} messages",
        params.tracing.updates_per_day,
        dispatcher.daily_cap()
    );

    let data = context.get_data_container_mut(TracingPlugin);
    data.dispatcher = Some(dispatcher);
    data.mapper = Some(mapper);
    if data.inference.is_none() {
        data.inference = Some(Rc::new(params.risk_inference));
    }

    schedule_slot(context, 0, params.tracing.updates_per_day, params.max_days);
    schedule_daily_routine(context, 0, params.tracing.updates_per_day, params.max_days);
    Ok(())
}
