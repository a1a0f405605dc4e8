//! The budgeted message exchange.
//!
//! Each round (time slot) every app user may submit update messages. The
//! [`MessageDispatcher`] decides which senders may actually send:
//!
//! 1. Nobody sends until `burn_in_days` days after the intervention starts.
//! 2. A sender who sent less than `days_between_messages` whole days ago waits.
//! 3. Nobody sends once the day's cap of `message_budget_fraction * population`
//!    messages is reached.
//! 4. Otherwise senders compete through a priority lottery on their risk-level
//!    change score. The histogram of all scores seen so far is normalized and
//!    walked from the highest score down; buckets entirely below the admission
//!    threshold are admitted, buckets above it are rejected, and the bucket that
//!    straddles it admits each member with probability equal to the remaining
//!    headroom over the bucket's mass.
//!
//! Scores for the whole round are added to the histogram before anyone is
//! admitted, and senders are considered in a fixed order, so the outcome of a
//! round does not depend on the order in which messages were submitted.

use std::collections::BTreeMap;

use log::{debug, trace};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use strum::Display;

use crate::error::{ensure, SimError};
use crate::mailbox::{encounter_age_days, Mailbox, UpdateMessage};
use crate::population::PersonId;
use crate::risk::Day;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingParams {
    pub intervention_day: Day,
    pub burn_in_days: Day,
    /// Fraction of the population that may send a message on any one day.
    pub message_budget_fraction: f64,
    pub days_between_messages: Day,
    pub updates_per_day: u32,
    /// Retention window for encounters, messages and risk history.
    pub tracing_n_days_history: Day,
    pub risk_levels: u32,
}

impl Default for TracingParams {
    fn default() -> Self {
        TracingParams {
            intervention_day: 5,
            burn_in_days: 2,
            message_budget_fraction: 0.05,
            days_between_messages: 2,
            updates_per_day: 4,
            tracing_n_days_history: 14,
            risk_levels: 16,
        }
    }
}

impl TracingParams {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` for negative windows, a budget
    /// outside [0, 1], or zero updates per day.
    pub fn validate(&self) -> Result<(), SimError> {
        ensure(self.intervention_day >= 0, || {
            format!("intervention_day must not be negative, got {}", self.intervention_day)
        })?;
        ensure(self.burn_in_days >= 0, || {
            format!("burn_in_days must not be negative, got {}", self.burn_in_days)
        })?;
        ensure((0.0..=1.0).contains(&self.message_budget_fraction), || {
            format!(
                "message_budget_fraction must lie in [0, 1], got {}",
                self.message_budget_fraction
            )
        })?;
        ensure(self.days_between_messages >= 0, || {
            format!(
                "days_between_messages must not be negative, got {}",
                self.days_between_messages
            )
        })?;
        ensure(self.updates_per_day >= 1, || "updates_per_day must be at least 1".to_string())?;
        ensure(self.tracing_n_days_history >= 1, || {
            format!(
                "tracing_n_days_history must be at least 1, got {}",
                self.tracing_n_days_history
            )
        })?;
        ensure(self.risk_levels >= 2, || {
            format!("risk_levels must be at least 2, got {}", self.risk_levels)
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    BurnIn,
    Active,
}

/// Count of senders per risk-level change score, over the whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskChangeHistogram {
    counts: BTreeMap<u32, u64>,
    sum: u64,
}

impl RiskChangeHistogram {
    pub fn add(&mut self, score: u32) {
        *self.counts.entry(score).or_insert(0) += 1;
        self.sum += 1;
    }

    #[must_use]
    pub fn count(&self, score: u32) -> u64 {
        self.counts.get(&score).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts.iter().map(|(score, count)| (*score, *count))
    }

    /// `(score, share of all senders)`, highest score first.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn proportions_descending(&self) -> Vec<(u32, f64)> {
        if self.sum == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .rev()
            .map(|(score, count)| (*score, *count as f64 / self.sum as f64))
            .collect()
    }
}

/// What happened to one round of submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub candidate_senders: usize,
    pub candidate_messages: usize,
    pub admitted_senders: usize,
    pub sent_messages: usize,
    pub rejected_burn_in: usize,
    pub rejected_spacing: usize,
    pub rejected_cap: usize,
    pub rejected_lottery: usize,
}

impl DispatchSummary {
    pub fn accumulate(&mut self, other: &DispatchSummary) {
        self.candidate_senders += other.candidate_senders;
        self.candidate_messages += other.candidate_messages;
        self.admitted_senders += other.admitted_senders;
        self.sent_messages += other.sent_messages;
        self.rejected_burn_in += other.rejected_burn_in;
        self.rejected_spacing += other.rejected_spacing;
        self.rejected_cap += other.rejected_cap;
        self.rejected_lottery += other.rejected_lottery;
    }
}

enum Admission {
    Admitted,
    Spacing,
    Cap,
    Lottery,
}

/// Owns the mailbox and the population-wide counters of the message exchange.
/// It is the only writer of the mailbox.
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    params: TracingParams,
    population_size: usize,
    histogram: RiskChangeHistogram,
    sent_messages_by_day: BTreeMap<Day, u64>,
    latest_update_time: BTreeMap<PersonId, f64>,
    mailbox: Mailbox,
}

impl MessageDispatcher {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` if `params` fail validation.
    pub fn new(params: TracingParams, population_size: usize) -> Result<Self, SimError> {
        params.validate()?;
        Ok(MessageDispatcher {
            params,
            population_size,
            histogram: RiskChangeHistogram::default(),
            sent_messages_by_day: BTreeMap::new(),
            latest_update_time: BTreeMap::new(),
            mailbox: Mailbox::new(),
        })
    }

    #[must_use]
    pub fn params(&self) -> &TracingParams {
        &self.params
    }

    #[must_use]
    pub fn phase(&self, day: Day) -> DispatchPhase {
        if day - self.params.intervention_day < self.params.burn_in_days {
            DispatchPhase::BurnIn
        } else {
            DispatchPhase::Active
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn daily_budget(&self) -> f64 {
        self.params.message_budget_fraction * self.population_size as f64
    }

    /// The most messages that can go out on one day.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn daily_cap(&self) -> u64 {
        self.daily_budget().ceil() as u64
    }

    /// Share of the histogram mass admitted per round.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn admission_threshold(&self) -> f64 {
        self.params.message_budget_fraction * self.params.days_between_messages as f64
            / f64::from(self.params.updates_per_day)
    }

    /// Probability that a sender with `score` wins the lottery against the
    /// current histogram.
    #[must_use]
    pub fn admission_probability(&self, score: u32) -> f64 {
        let threshold = self.admission_threshold();
        let mut mass_before = 0.0;
        for (bucket, mass) in self.histogram.proportions_descending() {
            if bucket == score {
                if mass_before >= threshold {
                    return 0.0;
                }
                if mass_before + mass <= threshold {
                    return 1.0;
                }
                return ((threshold - mass_before) / mass).clamp(0.0, 1.0);
            }
            mass_before += mass;
        }
        0.0
    }

    #[must_use]
    pub fn histogram(&self) -> &RiskChangeHistogram {
        &self.histogram
    }

    #[must_use]
    pub fn sent_messages_on(&self, day: Day) -> u64 {
        self.sent_messages_by_day.get(&day).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn sent_messages_by_day(&self) -> &BTreeMap<Day, u64> {
        &self.sent_messages_by_day
    }

    #[must_use]
    pub fn latest_update_time(&self, person: PersonId) -> Option<f64> {
        self.latest_update_time.get(&person).copied()
    }

    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Posts a message without any budgeting.
    pub fn post(&mut self, message: UpdateMessage) {
        self.mailbox.post(message);
    }

    pub fn drain(&mut self, receiver: PersonId) -> Vec<UpdateMessage> {
        self.mailbox.drain(receiver)
    }

    /// Drops messages older than the retention window.
    pub fn evict(&mut self, current_time: f64) -> usize {
        self.mailbox
            .evict(current_time, self.params.tracing_n_days_history)
    }

    #[allow(clippy::cast_precision_loss)]
    fn check_admission<R: Rng + ?Sized>(
        &self,
        day: Day,
        time: f64,
        sender: PersonId,
        score: u32,
        rng: &mut R,
    ) -> Admission {
        if let Some(latest) = self.latest_update_time.get(&sender) {
            if encounter_age_days(time, *latest) < self.params.days_between_messages {
                return Admission::Spacing;
            }
        }
        if self.sent_messages_on(day) as f64 >= self.daily_budget() {
            return Admission::Cap;
        }
        let p = self.admission_probability(score);
        if p >= 1.0 || (p > 0.0 && rng.random::<f64>() < p) {
            Admission::Admitted
        } else {
            Admission::Lottery
        }
    }

    fn dispatch(&mut self, day: Day, time: f64, message: UpdateMessage) {
        trace!(
            "dispatching {} -> {} uid={} level={} reason={:?}",
            message.sender,
            message.receiver,
            message.uid,
            message.new_risk_level,
            message.update_reason
        );
        *self.sent_messages_by_day.entry(day).or_insert(0) += 1;
        let latest = self.latest_update_time.entry(message.sender).or_insert(time);
        *latest = latest.max(time);
        self.mailbox.post(message);
    }

    /// Filters one round of candidate messages and posts the survivors.
    ///
    /// # Panics
    ///
    /// Panics if a candidate's sender has no entry in `scores`.
    pub fn register_new_messages<R: Rng + ?Sized>(
        &mut self,
        day: Day,
        time: f64,
        mut candidates: Vec<UpdateMessage>,
        scores: &BTreeMap<PersonId, u32>,
        rng: &mut R,
    ) -> DispatchSummary {
        candidates.sort_by(|a, b| {
            (a.sender, a.receiver, a.uid)
                .cmp(&(b.sender, b.receiver, b.uid))
                .then(a.encounter_time.total_cmp(&b.encounter_time))
        });

        let mut by_sender: BTreeMap<PersonId, Vec<UpdateMessage>> = BTreeMap::new();
        for message in candidates {
            by_sender.entry(message.sender).or_default().push(message);
        }
        let score_of = |sender: &PersonId| {
            *scores
                .get(sender)
                .unwrap_or_else(|| panic!("No risk change score for sender {sender}"))
        };
        for sender in by_sender.keys() {
            self.histogram.add(score_of(sender));
        }

        let mut summary = DispatchSummary {
            candidate_senders: by_sender.len(),
            candidate_messages: by_sender.values().map(Vec::len).sum(),
            ..DispatchSummary::default()
        };
        if self.phase(day) == DispatchPhase::BurnIn {
            summary.rejected_burn_in = summary.candidate_senders;
            debug!("day {day}: burn-in, holding {} messages", summary.candidate_messages);
            return summary;
        }

        let mut order: Vec<(u32, PersonId)> = by_sender.keys().map(|s| (score_of(s), *s)).collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let cap = self.daily_cap();
        for (score, sender) in order {
            match self.check_admission(day, time, sender, score, rng) {
                Admission::Spacing => summary.rejected_spacing += 1,
                Admission::Cap => summary.rejected_cap += 1,
                Admission::Lottery => summary.rejected_lottery += 1,
                Admission::Admitted => {
                    summary.admitted_senders += 1;
                    let messages = by_sender.remove(&sender).unwrap_or_default();
                    for message in messages {
                        if self.sent_messages_on(day) >= cap {
                            break;
                        }
                        self.dispatch(day, time, message);
                        summary.sent_messages += 1;
                    }
                }
            }
        }
        debug!(
            "day {day} t={time:.2}: {} of {} senders admitted, {} messages sent ({} / {cap} today)",
            summary.admitted_senders,
            summary.candidate_senders,
            summary.sent_messages,
            self.sent_messages_on(day)
        );
        summary
    }
}
