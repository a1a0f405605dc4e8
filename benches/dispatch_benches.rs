use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracesim::dispatch::{MessageDispatcher, TracingParams};
use tracesim::mailbox::{EncounterUid, UpdateMessage, UpdateReason};
use tracesim::population::PersonId;

const POPULATION: usize = 10_000;
const MESSAGES_PER_SENDER: usize = 10;

fn round(rng: &mut SmallRng) -> (Vec<UpdateMessage>, BTreeMap<PersonId, u32>) {
    let mut candidates = Vec::with_capacity(POPULATION * MESSAGES_PER_SENDER);
    let mut scores = BTreeMap::new();
    for sender in 0..POPULATION {
        for k in 0..MESSAGES_PER_SENDER {
            candidates.push(UpdateMessage {
                sender: PersonId::new(sender),
                receiver: PersonId::new(rng.random_range(0..POPULATION)),
                uid: EncounterUid(rng.random()),
                new_risk_level: rng.random_range(0..16),
                encounter_time: k as f64 * 0.5,
                update_reason: UpdateReason::RiskUpdate,
            });
        }
        scores.insert(PersonId::new(sender), rng.random_range(0..8));
    }
    (candidates, scores)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let params = TracingParams {
        intervention_day: 0,
        burn_in_days: 0,
        ..TracingParams::default()
    };
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("register_new_messages", |bencher| {
        let mut rng = SmallRng::seed_from_u64(42);
        bencher.iter_batched(
            || {
                let dispatcher = MessageDispatcher::new(params.clone(), POPULATION).unwrap();
                let (candidates, scores) = round(&mut rng);
                (dispatcher, candidates, scores, SmallRng::seed_from_u64(7))
            },
            |(mut dispatcher, candidates, scores, mut rng)| {
                black_box(dispatcher.register_new_messages(10, 10.0, candidates, &scores, &mut rng));
                dispatcher
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("evict", |bencher| {
        let mut rng = SmallRng::seed_from_u64(43);
        bencher.iter_batched(
            || {
                let mut dispatcher = MessageDispatcher::new(params.clone(), POPULATION).unwrap();
                let (candidates, _) = round(&mut rng);
                for message in candidates {
                    dispatcher.post(message);
                }
                dispatcher
            },
            |mut dispatcher| {
                black_box(dispatcher.evict(black_box(18.0)));
                dispatcher
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
