//! Criterion benchmarks for validation and simulation.
//!
//! Run with: `cargo bench -p raritylab-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use raritylab_core::{CollectionConfig, GridPosition, TraitCategory, TraitVariant, WeightCalculator};
use raritylab_runner::{simulate_generation_accuracy, DistributionValidator, SimulationConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_config(categories: usize, variants: usize) -> CollectionConfig {
    let mut config = CollectionConfig::new(5_000, false);
    for c in 0..categories {
        let list = (0..variants)
            .map(|v| TraitVariant::new(format!("v{v}"), format!("{c}_{v}.png"), 1 + (v as i64 * 37) % 100))
            .collect();
        config = config.with_category(
            format!("cat{c}"),
            TraitCategory::new(format!("Cat {c}"), GridPosition::new((c / 3) as u8, (c % 3) as u8), list),
        );
    }
    config
}

// ── 1. Simulation ────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_generation_accuracy");
    group.sample_size(20);
    let config = make_config(9, 20);
    let calc = WeightCalculator::default();

    for parallel in [false, true] {
        let sim = SimulationConfig {
            parallel,
            ..SimulationConfig::with_sample_size(10_000)
        };
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::new(label, 9), &sim, |b, sim| {
            b.iter(|| simulate_generation_accuracy(black_box(&config), &calc, sim, 0.05, None))
        });
    }

    group.finish();
}

// ── 2. Validation ────────────────────────────────────────────────────

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_distribution");
    let validator = DistributionValidator::default();

    for &variants in &[5, 50, 500] {
        let config = make_config(9, variants);
        group.bench_with_input(BenchmarkId::new("no_simulation", variants), &variants, |b, _| {
            b.iter(|| validator.validate_distribution(black_box(Some(&config)), None))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simulation, bench_validation);
criterion_main!(benches);
