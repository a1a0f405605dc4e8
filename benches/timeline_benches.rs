use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracesim::disease::{Disease, DiseaseModel, DiseaseParams, Episode, Progression, RiskFactors};

pub fn criterion_benchmark(c: &mut Criterion) {
    let model = DiseaseModel::new(DiseaseParams::default()).expect("default parameters are valid");
    let mut group = c.benchmark_group("timeline");

    group.bench_function("sample_timeline", |bencher| {
        let mut rng = SmallRng::seed_from_u64(1);
        bencher.iter(|| black_box(model.sample_timeline(black_box(45.0), 0, &mut rng)));
    });

    group.bench_function("progression_30_days", |bencher| {
        let mut rng = SmallRng::seed_from_u64(2);
        let factors = RiskFactors::new(70.0, 0.2);
        bencher.iter(|| {
            let curve = model.sample_timeline(factors.age, 0, &mut rng).unwrap();
            let progression = Progression::new(curve, &factors, rng.random(), rng.random(), 1.0);
            for day in 0..30 {
                black_box(progression.on_day(f64::from(day)));
            }
        });
    });

    group.bench_function("cold_episode", |bencher| {
        let mut rng = SmallRng::seed_from_u64(3);
        let factors = RiskFactors::new(25.0, 0.5);
        bencher.iter(|| {
            let episode = Episode::sample(Disease::Cold, 0, &model.params().other_diseases, &mut rng);
            for day in 0..i64::from(episode.duration_days) {
                black_box(episode.symptoms_on(day, &factors));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
