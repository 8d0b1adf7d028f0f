//! Monte-Carlo generation-accuracy simulation.
//!
//! Each populated category is simulated independently with its own
//! `StdRng`. With a seed, the per-category generator comes from
//! `SeedHierarchy`, so the statistics are identical for any thread count.
//! Results are assembled only after every category has finished; a
//! cancellation or deadline aborts the whole run with an error.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use raritylab_core::{
    CollectionConfig, RandomSelectionError, RandomSelector, RarityWeight, SeedHierarchy,
    SelectionStatistics, WeightCalculator,
};

/// Seed-hierarchy scope for simulation streams.
pub const SIMULATION_SCOPE: &str = "simulation";

// ─── Configuration ───────────────────────────────────────────────────

/// Simulation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Draws per category (default 10,000).
    pub sample_size: usize,
    /// Master seed. `None` uses system entropy and is not reproducible.
    pub seed: Option<u64>,
    /// Simulate categories on rayon workers.
    pub parallel: bool,
    /// Private pool size; 0 uses the global rayon pool.
    pub thread_cap: usize,
    /// Wall-clock budget for the whole run.
    pub max_duration_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_size: 10_000,
            seed: Some(42),
            parallel: true,
            thread_cap: 0,
            max_duration_ms: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_sample_size(sample_size: usize) -> Self {
        Self {
            sample_size,
            ..Self::default()
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("simulation cancelled")]
    Cancelled,

    #[error("simulation exceeded its {budget_ms} ms budget")]
    DeadlineExceeded { budget_ms: u64 },

    #[error("sample_size must be greater than zero")]
    ZeroSampleSize,

    #[error("simulation failed for category '{category}': {source}")]
    Selection {
        category: String,
        #[source]
        source: RandomSelectionError,
    },

    #[error("failed to build simulation thread pool: {0}")]
    ThreadPool(String),
}

// ─── Stop signal ─────────────────────────────────────────────────────

struct StopSignal<'a> {
    cancel: Option<&'a AtomicBool>,
    deadline: Option<(Instant, u64)>,
}

impl StopSignal<'_> {
    fn check(&self) -> Result<(), SimulationError> {
        if self.cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Err(SimulationError::Cancelled);
        }
        if let Some((deadline, budget_ms)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SimulationError::DeadlineExceeded { budget_ms });
            }
        }
        Ok(())
    }
}

// ─── Driver ──────────────────────────────────────────────────────────

/// Simulate every selectable category of `config`.
///
/// Empty categories and categories whose weights the calculator rejects
/// (negative, all zero) are skipped; the validator reports those as issues.
/// `tolerance` sets each result's `within_tolerance` flag.
pub fn simulate_generation_accuracy(
    config: &CollectionConfig,
    calculator: &WeightCalculator,
    simulation: &SimulationConfig,
    tolerance: f64,
    cancel: Option<&AtomicBool>,
) -> Result<BTreeMap<String, SelectionStatistics>, SimulationError> {
    let mut jobs: Vec<(String, Vec<RarityWeight>)> = Vec::with_capacity(config.traits.len());
    for (key, category) in config.traits.iter().filter(|(_, c)| !c.is_empty()) {
        let weights = category.weights();
        match calculator.calculate_probabilities(&weights) {
            Ok(_) => jobs.push((key.clone(), weights)),
            Err(e) => log::warn!("skipping category '{key}' in simulation: {e}"),
        }
    }
    simulate_weights(&jobs, calculator, simulation, tolerance, cancel)
}

/// Simulate pre-extracted `(category_key, weights)` jobs.
pub fn simulate_weights(
    jobs: &[(String, Vec<RarityWeight>)],
    calculator: &WeightCalculator,
    simulation: &SimulationConfig,
    tolerance: f64,
    cancel: Option<&AtomicBool>,
) -> Result<BTreeMap<String, SelectionStatistics>, SimulationError> {
    if simulation.sample_size == 0 {
        return Err(SimulationError::ZeroSampleSize);
    }

    let start = Instant::now();
    let signal = StopSignal {
        cancel,
        deadline: simulation
            .max_duration_ms
            .map(|ms| (start + Duration::from_millis(ms), ms)),
    };
    let seeds = simulation.seed.map(SeedHierarchy::new);

    log::info!(
        "simulating {} categories x {} draws (seed {:?}, parallel {})",
        jobs.len(),
        simulation.sample_size,
        simulation.seed,
        simulation.parallel
    );

    let run_one = |(key, weights): &(String, Vec<RarityWeight>)| -> Result<
        (String, SelectionStatistics),
        SimulationError,
    > {
        signal.check()?;
        let mut selector = match seeds {
            Some(seeds) => {
                RandomSelector::with_rng(*calculator, seeds.rng_for(SIMULATION_SCOPE, key, 0))
            }
            None => RandomSelector::new(*calculator, None),
        };
        let stats = selector
            .analyze_selection_statistics_until(weights, simulation.sample_size, tolerance, || {
                signal.check().is_err()
            })
            .map_err(|source| match source {
                RandomSelectionError::Interrupted { .. } => {
                    signal.check().err().unwrap_or(SimulationError::Cancelled)
                }
                source => SimulationError::Selection {
                    category: key.clone(),
                    source,
                },
            })?;
        log::debug!(
            "category '{}' simulated: max deviation {:.4}",
            key,
            stats.max_deviation
        );
        Ok((key.clone(), stats))
    };

    let results: Vec<(String, SelectionStatistics)> = if !simulation.parallel || jobs.len() < 2 {
        jobs.iter().map(&run_one).collect::<Result<_, _>>()?
    } else if simulation.thread_cap > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(simulation.thread_cap)
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;
        pool.install(|| jobs.par_iter().map(&run_one).collect::<Result<_, _>>())?
    } else {
        jobs.par_iter().map(&run_one).collect::<Result<_, _>>()?
    };

    log::info!(
        "simulation finished: {} categories in {:.1?}",
        results.len(),
        start.elapsed()
    );
    Ok(results.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use raritylab_core::{GridPosition, TraitCategory, TraitVariant};

    fn category(name: &str, cell: (u8, u8), weights: &[i64]) -> TraitCategory {
        TraitCategory::new(
            name,
            GridPosition::new(cell.0, cell.1),
            weights
                .iter()
                .enumerate()
                .map(|(i, &w)| TraitVariant::new(format!("{name}{i}"), format!("{name}{i}.png"), w))
                .collect(),
        )
    }

    fn sample_config() -> CollectionConfig {
        CollectionConfig::new(100, false)
            .with_category("a", category("A", (0, 0), &[100, 50, 25]))
            .with_category("b", category("B", (0, 1), &[1, 1]))
            .with_category("c", category("C", (0, 2), &[3, 0, 7]))
            .with_category("empty", category("Empty", (1, 0), &[]))
    }

    #[test]
    fn default_config_is_reasonable() {
        let config = SimulationConfig::default();
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.seed, Some(42));
        assert!(config.parallel);
        assert_eq!(config.thread_cap, 0);
        assert!(config.max_duration_ms.is_none());
    }

    #[test]
    fn empty_categories_skipped() {
        let sim = SimulationConfig::with_sample_size(2_000);
        let results = simulate_generation_accuracy(
            &sample_config(),
            &WeightCalculator::default(),
            &sim,
            0.05,
            None,
        )
        .unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(results["c"].selection_counts[1], 0);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = sample_config();
        let calc = WeightCalculator::default();
        let parallel = SimulationConfig {
            sample_size: 5_000,
            thread_cap: 3,
            ..SimulationConfig::default()
        };
        let sequential = SimulationConfig {
            parallel: false,
            ..parallel.clone()
        };
        let a = simulate_generation_accuracy(&config, &calc, &parallel, 0.05, None).unwrap();
        let b = simulate_generation_accuracy(&config, &calc, &sequential, 0.05, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn preset_cancel_flag_aborts() {
        let flag = AtomicBool::new(true);
        let result = simulate_generation_accuracy(
            &sample_config(),
            &WeightCalculator::default(),
            &SimulationConfig::default(),
            0.05,
            Some(&flag),
        );
        assert!(matches!(result, Err(SimulationError::Cancelled)));
    }

    #[test]
    fn zero_budget_exceeds_deadline() {
        let sim = SimulationConfig {
            max_duration_ms: Some(0),
            ..SimulationConfig::default()
        };
        let result = simulate_generation_accuracy(
            &sample_config(),
            &WeightCalculator::default(),
            &sim,
            0.05,
            None,
        );
        assert!(matches!(
            result,
            Err(SimulationError::DeadlineExceeded { budget_ms: 0 })
        ));
    }

    #[test]
    fn unselectable_categories_skipped() {
        let config = CollectionConfig::new(10, true)
            .with_category("good", category("Good", (0, 0), &[1, 2, 3]))
            .with_category("negative", category("Negative", (0, 1), &[4, -1]))
            .with_category("zero", category("Zero", (0, 2), &[0, 0]));
        let results = simulate_generation_accuracy(
            &config,
            &WeightCalculator::default(),
            &SimulationConfig::with_sample_size(500),
            0.05,
            None,
        )
        .unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    #[test]
    fn invalid_weight_jobs_report_category() {
        let jobs = vec![("bad".to_string(), vec![0, 0])];
        let result = simulate_weights(
            &jobs,
            &WeightCalculator::default(),
            &SimulationConfig::with_sample_size(100),
            0.05,
            None,
        );
        match result {
            Err(SimulationError::Selection { category, .. }) => assert_eq!(category, "bad"),
            other => panic!("expected selection error, got {other:?}"),
        }
    }

    #[test]
    fn zero_sample_size_rejected() {
        let result = simulate_generation_accuracy(
            &sample_config(),
            &WeightCalculator::default(),
            &SimulationConfig::with_sample_size(0),
            0.05,
            None,
        );
        assert!(matches!(result, Err(SimulationError::ZeroSampleSize)));
    }
}
