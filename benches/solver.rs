//! Performance benchmarks for stressdp

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stressdp::solver::golden_section_argmax;
use stressdp::{Config, ForwardProjection, ValueIteration};

fn lattice_config(max_t: usize, max_h: usize) -> Config {
    let mut config = Config::default();
    config.lattice.max_t = max_t;
    config.lattice.max_h = max_h;
    config.logging.progress_interval = u64::MAX;
    config
}

fn benchmark_golden_section(c: &mut Criterion) {
    let mut group = c.benchmark_group("golden_section");

    for max_h in [50usize, 500, 5000].iter() {
        let peak = (*max_h as f64) * 0.37;
        let row: Vec<f64> = (0..=*max_h).map(|h| -(h as f64 - peak).powi(2)).collect();

        group.bench_with_input(BenchmarkId::new("max_h", max_h), max_h, |b, &max_h| {
            b.iter(|| golden_section_argmax(black_box(max_h), |h| row[h]));
        });
    }

    group.finish();
}

fn benchmark_decision_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("decision_sweep");
    group.sample_size(10);

    for max_h in [100usize, 500].iter() {
        let mut engine = ValueIteration::new(lattice_config(50, *max_h));
        engine.step();

        group.bench_with_input(BenchmarkId::new("max_h", max_h), max_h, |b, _| {
            b.iter(|| engine.optimise_decisions());
        });
    }

    group.finish();
}

fn benchmark_outer_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("outer_iteration");
    group.sample_size(10);

    let mut engine = ValueIteration::new(Config::default());

    group.bench_function("default_lattice", |b| {
        b.iter(|| black_box(engine.step()));
    });

    group.finish();
}

fn benchmark_forward_cycle(c: &mut Criterion) {
    let config = lattice_config(50, 200);
    let mut engine = ValueIteration::new(config.clone());
    for _ in 0..20 {
        engine.step();
    }
    let policy = engine.policy();
    let mut projection = ForwardProjection::new(&policy, &engine.tables, &config.forward);
    // Spread the mass over the lattice before timing
    for _ in 0..5 {
        projection.step();
    }

    c.bench_function("forward_cycle", |b| {
        b.iter(|| black_box(projection.step()));
    });
}

fn benchmark_checkpoint(c: &mut Criterion) {
    let mut engine = ValueIteration::new(lattice_config(20, 100));
    engine.step();
    let checkpoint = engine.create_checkpoint();

    c.bench_function("checkpoint_serialize", |b| {
        b.iter(|| bincode::serialize(black_box(&checkpoint)).unwrap());
    });

    let serialized = bincode::serialize(&checkpoint).unwrap();

    c.bench_function("checkpoint_deserialize", |b| {
        b.iter(|| {
            let _: stressdp::checkpoint::Checkpoint =
                bincode::deserialize(black_box(&serialized)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    benchmark_golden_section,
    benchmark_decision_sweep,
    benchmark_outer_iteration,
    benchmark_forward_cycle,
    benchmark_checkpoint,
);

criterion_main!(benches);
