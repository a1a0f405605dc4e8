use std::collections::BTreeMap;

use assert_approx_eq::assert_approx_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracesim::dispatch::{MessageDispatcher, TracingParams};
use tracesim::mailbox::{encounter_age_days, EncounterUid, UpdateMessage, UpdateReason};
use tracesim::population::PersonId;

fn params(budget: f64, days_between_messages: i64, updates_per_day: u32) -> TracingParams {
    TracingParams {
        intervention_day: 0,
        burn_in_days: 0,
        message_budget_fraction: budget,
        days_between_messages,
        updates_per_day,
        ..TracingParams::default()
    }
}

fn message(sender: usize, receiver: usize, uid: u64, encounter_time: f64) -> UpdateMessage {
    UpdateMessage {
        sender: PersonId::new(sender),
        receiver: PersonId::new(receiver),
        uid: EncounterUid(uid),
        new_risk_level: 3,
        encounter_time,
        update_reason: UpdateReason::RiskUpdate,
    }
}

#[test]
fn daily_cap_holds_within_a_round() {
    let mut dispatcher = MessageDispatcher::new(params(0.25, 4, 1), 20).unwrap();
    assert_eq!(dispatcher.daily_cap(), 5);
    let mut rng = SmallRng::seed_from_u64(3);

    let candidates: Vec<_> = (0..30).map(|s| message(s, (s + 1) % 30, s as u64, 0.0)).collect();
    let scores: BTreeMap<_, _> = (0..30).map(|s| (PersonId::new(s), 2)).collect();
    let summary = dispatcher.register_new_messages(1, 1.0, candidates, &scores, &mut rng);

    assert_eq!(summary.candidate_senders, 30);
    assert_eq!(summary.sent_messages, 5);
    assert_eq!(summary.rejected_cap, 25);
    assert_eq!(dispatcher.sent_messages_on(1), 5);
}

#[test]
fn sixty_days_respect_spacing_and_cap() {
    let population = 10;
    let tracing = params(0.3, 2, 4);
    let mut dispatcher = MessageDispatcher::new(tracing.clone(), population).unwrap();
    let cap = dispatcher.daily_cap();
    let mut rng = SmallRng::seed_from_u64(60);
    let mut sends: BTreeMap<PersonId, Vec<f64>> = BTreeMap::new();
    let mut uid = 0;

    for day in 0..60_i64 {
        for slot in 0..tracing.updates_per_day {
            let time = day as f64 + f64::from(slot) / f64::from(tracing.updates_per_day);
            let mut candidates = Vec::new();
            let mut scores = BTreeMap::new();
            for sender in 0..population {
                uid += 1;
                candidates.push(message(sender, (sender + 1) % population, uid, time));
                scores.insert(PersonId::new(sender), rng.random_range(0..5));
            }
            let before = dispatcher.sent_messages_on(day);
            dispatcher.register_new_messages(day, time, candidates, &scores, &mut rng);
            assert!(dispatcher.sent_messages_on(day) <= cap);

            if dispatcher.sent_messages_on(day) > before {
                for sender in 0..population {
                    let id = PersonId::new(sender);
                    if dispatcher.latest_update_time(id) == Some(time) {
                        sends.entry(id).or_default().push(time);
                    }
                }
            }
            // Receivers read their mail every slot.
            for receiver in 0..population {
                dispatcher.drain(PersonId::new(receiver));
            }
        }
    }

    let total: usize = sends.values().map(Vec::len).sum();
    assert!(total > 0);
    assert_eq!(total as u64, dispatcher.sent_messages_by_day().values().sum::<u64>());
    for times in sends.values() {
        for pair in times.windows(2) {
            assert!(encounter_age_days(pair[1], pair[0]) >= tracing.days_between_messages);
        }
    }
}

#[test]
fn eviction_is_idempotent() {
    let mut dispatcher = MessageDispatcher::new(params(1.0, 0, 1), 10).unwrap();
    for (i, time) in [0.0, 1.5, 3.0, 10.0, 14.2, 20.0].into_iter().enumerate() {
        dispatcher.post(message(i, 9, i as u64, time));
    }

    let first = dispatcher.evict(20.5);
    let after_first = dispatcher.mailbox().clone();
    let second = dispatcher.evict(20.5);

    assert_eq!(first, 3);
    assert_eq!(second, 0);
    assert_eq!(dispatcher.mailbox(), &after_first);
    assert_eq!(dispatcher.mailbox().message_count(), 3);
}

#[test]
fn straddling_bucket_shares_the_remaining_headroom() {
    let mut dispatcher = MessageDispatcher::new(params(0.2, 1, 1), 10).unwrap();
    let mut rng = SmallRng::seed_from_u64(5);
    let candidates: Vec<_> = (0..10).map(|s| message(s, (s + 1) % 10, s as u64, 0.0)).collect();
    let scores: BTreeMap<_, _> = (0..10)
        .map(|s| (PersonId::new(s), if s == 0 { 5 } else { 1 }))
        .collect();
    dispatcher.register_new_messages(0, 0.0, candidates, &scores, &mut rng);

    assert_approx_eq!(dispatcher.admission_probability(5), 1.0);
    assert_approx_eq!(dispatcher.admission_probability(1), 1.0 / 9.0);
    assert_approx_eq!(dispatcher.admission_probability(3), 0.0);
}
