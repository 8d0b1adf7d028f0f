//! Weighted random selection over cumulative probability vectors.
//!
//! Each `RandomSelector` owns its PRNG. A draw `u` in `[0, 1)` picks the
//! first index whose cumulative probability is strictly greater than `u`, so
//! a zero-probability bucket can never be hit and equal cumulative values
//! resolve deterministically.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CollectionConfig, TraitCategory, TraitVariant};
use crate::weights::{
    RarityWeight, WeightCalculationError, WeightCalculationResult, WeightCalculator,
};

/// Draws between cancellation checks in `analyze_selection_statistics_until`.
pub const STATISTICS_BATCH: usize = 4096;

/// Empty or malformed selection input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RandomSelectionError {
    #[error("cannot select from an empty weight list")]
    EmptyWeights,

    #[error("items length ({items}) does not match weights length ({weights})")]
    LengthMismatch { weights: usize, items: usize },

    #[error("category '{category}' has no variants")]
    EmptyCategory { category: String },

    #[error("{what} must be greater than zero")]
    ZeroCount { what: &'static str },

    #[error("requested {requested} distinct selections but only {available} are selectable")]
    InsufficientCandidates { requested: usize, available: usize },

    #[error("tolerance must be finite and non-negative (got {0})")]
    InvalidTolerance(f64),

    #[error("sampling interrupted after {completed} of {requested} draws")]
    Interrupted { completed: usize, requested: usize },

    #[error(transparent)]
    Weights(#[from] WeightCalculationError),
}

/// One draw. `T` is the selected item; index-only draws use `usize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult<T = usize> {
    pub selected_index: usize,
    pub selected_item: T,
    pub raw_draw: f64,
    pub probabilities: Vec<f64>,
    pub cumulative_probabilities: Vec<f64>,
}

impl<T> SelectionResult<T> {
    pub fn selected_probability(&self) -> f64 {
        self.probabilities.get(self.selected_index).copied().unwrap_or(0.0)
    }

    /// Half-open cumulative interval `[low, high)` owned by the selected index.
    pub fn cumulative_range(&self) -> (f64, f64) {
        let high = self
            .cumulative_probabilities
            .get(self.selected_index)
            .copied()
            .unwrap_or(0.0);
        let low = match self.selected_index {
            0 => 0.0,
            i => self.cumulative_probabilities.get(i - 1).copied().unwrap_or(0.0),
        };
        (low, high)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SelectionResult<U> {
        SelectionResult {
            selected_index: self.selected_index,
            selected_item: f(self.selected_item),
            raw_draw: self.raw_draw,
            probabilities: self.probabilities,
            cumulative_probabilities: self.cumulative_probabilities,
        }
    }
}

/// A draw from a trait category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSelectionResult {
    pub category_name: String,
    pub variant: TraitVariant,
    pub selected_index: usize,
    pub probability: f64,
    pub cumulative_probability: f64,
    pub raw_draw: f64,
}

/// Empirical frequencies from repeated draws against the expected vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStatistics {
    pub sample_size: usize,
    pub selection_counts: Vec<u64>,
    pub observed_frequencies: Vec<f64>,
    pub expected_frequencies: Vec<f64>,
    pub deviations: Vec<f64>,
    pub max_deviation: f64,
    pub tolerance: f64,
    pub within_tolerance: bool,
}

impl SelectionStatistics {
    /// Re-check against a different tolerance.
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_deviation <= tolerance
    }
}

/// First index whose cumulative value is strictly greater than `u`.
pub fn bucket_for(cumulative: &[f64], u: f64) -> usize {
    let idx = cumulative.partition_point(|&c| c <= u);
    idx.min(cumulative.len().saturating_sub(1))
}

/// Seedable weighted selector with an audit history.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    calculator: WeightCalculator,
    rng: StdRng,
    seed: Option<u64>,
    history: Vec<SelectionResult>,
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new(WeightCalculator::default(), None)
    }
}

impl RandomSelector {
    /// `seed = None` draws from system entropy.
    pub fn new(calculator: WeightCalculator, seed: Option<u64>) -> Self {
        Self {
            calculator,
            rng: make_rng(seed),
            seed,
            history: Vec::new(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(WeightCalculator::default(), Some(seed))
    }

    /// Selector driven by an already-seeded generator (e.g. from `SeedHierarchy`).
    pub fn with_rng(calculator: WeightCalculator, rng: StdRng) -> Self {
        Self {
            calculator,
            rng,
            seed: None,
            history: Vec::new(),
        }
    }

    /// Reseed the generator. History is kept.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.rng = make_rng(seed);
        self.seed = seed;
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn calculator(&self) -> &WeightCalculator {
        &self.calculator
    }

    pub fn history(&self) -> &[SelectionResult] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn probabilities_for(
        &self,
        weights: &[RarityWeight],
    ) -> Result<WeightCalculationResult, RandomSelectionError> {
        if weights.is_empty() {
            return Err(RandomSelectionError::EmptyWeights);
        }
        Ok(self.calculator.calculate_probabilities(weights)?)
    }

    fn draw_from(&mut self, calc: &WeightCalculationResult) -> SelectionResult {
        let raw_draw: f64 = self.rng.gen();
        let index = bucket_for(&calc.cumulative_probabilities, raw_draw);
        SelectionResult {
            selected_index: index,
            selected_item: index,
            raw_draw,
            probabilities: calc.probabilities.clone(),
            cumulative_probabilities: calc.cumulative_probabilities.clone(),
        }
    }

    /// Pick an index according to `weights`.
    pub fn select_weighted_random(
        &mut self,
        weights: &[RarityWeight],
    ) -> Result<SelectionResult, RandomSelectionError> {
        let calc = self.probabilities_for(weights)?;
        let result = self.draw_from(&calc);
        self.history.push(result.clone());
        Ok(result)
    }

    /// Pick one of `items` according to `weights` (same length).
    pub fn select_weighted_item<'a, T>(
        &mut self,
        weights: &[RarityWeight],
        items: &'a [T],
    ) -> Result<SelectionResult<&'a T>, RandomSelectionError> {
        if items.len() != weights.len() {
            return Err(RandomSelectionError::LengthMismatch {
                weights: weights.len(),
                items: items.len(),
            });
        }
        let result = self.select_weighted_random(weights)?;
        Ok(result.map(|i| &items[i]))
    }

    pub fn select_trait_variant(
        &mut self,
        category: &TraitCategory,
    ) -> Result<TraitSelectionResult, RandomSelectionError> {
        if category.is_empty() {
            return Err(RandomSelectionError::EmptyCategory {
                category: category.name.clone(),
            });
        }
        let calc = self.probabilities_for(&category.weights())?;
        let result = self.draw_from(&calc);
        let index = result.selected_index;
        let selection = TraitSelectionResult {
            category_name: category.name.clone(),
            variant: category.variants[index].clone(),
            selected_index: index,
            probability: calc.probabilities[index],
            cumulative_probability: calc.cumulative_probabilities[index],
            raw_draw: result.raw_draw,
        };
        self.history.push(result);
        Ok(selection)
    }

    /// One selection per category in key order. Empty optional categories are skipped.
    pub fn select_collection_traits(
        &mut self,
        config: &CollectionConfig,
    ) -> Result<BTreeMap<String, TraitSelectionResult>, RandomSelectionError> {
        let mut selections = BTreeMap::new();
        for (key, category) in &config.traits {
            if category.is_empty() && !category.required {
                log::debug!("skipping empty optional category '{key}'");
                continue;
            }
            selections.insert(key.clone(), self.select_trait_variant(category)?);
        }
        Ok(selections)
    }

    /// `count` draws. Without duplicates each chosen entry leaves the pool;
    /// `selected_item` is then the index into the original `weights` while
    /// `selected_index` and the vectors describe the reduced pool.
    pub fn select_multiple(
        &mut self,
        weights: &[RarityWeight],
        count: usize,
        allow_duplicates: bool,
    ) -> Result<Vec<SelectionResult>, RandomSelectionError> {
        if count == 0 {
            return Err(RandomSelectionError::ZeroCount { what: "count" });
        }
        let calc = self.probabilities_for(weights)?;

        if allow_duplicates {
            let mut results = Vec::with_capacity(count);
            for _ in 0..count {
                let result = self.draw_from(&calc);
                self.history.push(result.clone());
                results.push(result);
            }
            return Ok(results);
        }

        let available = weights.iter().filter(|&&w| w > 0).count();
        if count > available {
            return Err(RandomSelectionError::InsufficientCandidates {
                requested: count,
                available,
            });
        }

        let mut remaining: Vec<usize> = (0..weights.len()).collect();
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            let pool: Vec<RarityWeight> = remaining.iter().map(|&i| weights[i]).collect();
            let pool_calc = self.probabilities_for(&pool)?;
            let mut result = self.draw_from(&pool_calc);
            result.selected_item = remaining.remove(result.selected_index);
            self.history.push(result.clone());
            results.push(result);
        }
        Ok(results)
    }

    /// `sample_size` draws tallied against the expected probabilities.
    /// These draws are not recorded in the history.
    pub fn analyze_selection_statistics(
        &mut self,
        weights: &[RarityWeight],
        sample_size: usize,
        tolerance: f64,
    ) -> Result<SelectionStatistics, RandomSelectionError> {
        self.analyze_selection_statistics_until(weights, sample_size, tolerance, || false)
    }

    /// As `analyze_selection_statistics`, polling `should_stop` before every
    /// batch of `STATISTICS_BATCH` draws.
    pub fn analyze_selection_statistics_until(
        &mut self,
        weights: &[RarityWeight],
        sample_size: usize,
        tolerance: f64,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<SelectionStatistics, RandomSelectionError> {
        if sample_size == 0 {
            return Err(RandomSelectionError::ZeroCount { what: "sample_size" });
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(RandomSelectionError::InvalidTolerance(tolerance));
        }
        let calc = self.probabilities_for(weights)?;
        let cumulative = &calc.cumulative_probabilities;

        let mut counts = vec![0u64; weights.len()];
        let mut completed = 0usize;
        while completed < sample_size {
            if should_stop() {
                return Err(RandomSelectionError::Interrupted {
                    completed,
                    requested: sample_size,
                });
            }
            let batch = STATISTICS_BATCH.min(sample_size - completed);
            for _ in 0..batch {
                let u: f64 = self.rng.gen();
                counts[bucket_for(cumulative, u)] += 1;
            }
            completed += batch;
        }

        let n = sample_size as f64;
        let observed: Vec<f64> = counts.iter().map(|&c| c as f64 / n).collect();
        let deviations: Vec<f64> = observed
            .iter()
            .zip(&calc.probabilities)
            .map(|(o, e)| (o - e).abs())
            .collect();
        let max_deviation = deviations.iter().copied().fold(0.0, f64::max);

        Ok(SelectionStatistics {
            sample_size,
            selection_counts: counts,
            observed_frequencies: observed,
            expected_frequencies: calc.probabilities.clone(),
            deviations,
            max_deviation,
            tolerance,
            within_tolerance: max_deviation <= tolerance,
        })
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            log::debug!("selector seeded with {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridPosition;

    #[test]
    fn bucket_uses_strict_upper_bound() {
        let cumulative = [0.25, 0.5, 1.0];
        assert_eq!(bucket_for(&cumulative, 0.0), 0);
        assert_eq!(bucket_for(&cumulative, 0.2499), 0);
        assert_eq!(bucket_for(&cumulative, 0.25), 1);
        assert_eq!(bucket_for(&cumulative, 0.75), 2);
        assert_eq!(bucket_for(&cumulative, 0.999_999), 2);
    }

    #[test]
    fn bucket_skips_zero_width_entries() {
        let cumulative = [0.0, 0.0, 0.6, 0.6, 1.0];
        assert_eq!(bucket_for(&cumulative, 0.0), 2);
        assert_eq!(bucket_for(&cumulative, 0.6), 4);
    }

    #[test]
    fn same_seed_same_sequence() {
        let weights = [100, 50, 25];
        let mut a = RandomSelector::seeded(42);
        let mut b = RandomSelector::seeded(42);
        for _ in 0..50 {
            assert_eq!(
                a.select_weighted_random(&weights).unwrap(),
                b.select_weighted_random(&weights).unwrap()
            );
        }
    }

    #[test]
    fn reference_frequencies_within_tolerance() {
        let mut selector = RandomSelector::seeded(42);
        let stats = selector
            .analyze_selection_statistics(&[100, 50, 25], 2000, 0.05)
            .unwrap();
        assert!(stats.within_tolerance, "max deviation {}", stats.max_deviation);
        assert_eq!(stats.selection_counts.iter().sum::<u64>(), 2000);
        assert_eq!(stats.expected_frequencies, vec![0.571, 0.286, 0.143]);
        assert!(selector.history().is_empty());
    }

    #[test]
    fn zero_weight_never_selected() {
        let mut selector = RandomSelector::seeded(1);
        for _ in 0..500 {
            let result = selector.select_weighted_random(&[0, 5, 0]).unwrap();
            assert_eq!(result.selected_index, 1);
        }
    }

    #[test]
    fn empty_weights_error() {
        let mut selector = RandomSelector::seeded(1);
        assert_eq!(
            selector.select_weighted_random(&[]),
            Err(RandomSelectionError::EmptyWeights)
        );
    }

    #[test]
    fn invalid_weights_propagate() {
        let mut selector = RandomSelector::seeded(1);
        assert!(matches!(
            selector.select_weighted_random(&[0, 0]),
            Err(RandomSelectionError::Weights(WeightCalculationError::NonPositiveTotal { .. }))
        ));
    }

    #[test]
    fn item_selection_maps_index() {
        let mut selector = RandomSelector::seeded(3);
        let items = ["a", "b", "c"];
        let result = selector.select_weighted_item(&[0, 0, 1], &items).unwrap();
        assert_eq!(*result.selected_item, "c");
        assert_eq!(selector.history()[0].selected_item, 2);

        assert_eq!(
            selector.select_weighted_item(&[1, 2], &items),
            Err(RandomSelectionError::LengthMismatch { weights: 2, items: 3 })
        );
    }

    #[test]
    fn history_appends_and_clears() {
        let mut selector = RandomSelector::seeded(5);
        for _ in 0..3 {
            selector.select_weighted_random(&[1, 1]).unwrap();
        }
        assert_eq!(selector.history().len(), 3);
        selector.clear_history();
        assert!(selector.history().is_empty());
    }

    #[test]
    fn set_seed_restarts_stream() {
        let mut selector = RandomSelector::seeded(11);
        let first = selector.select_weighted_random(&[1, 2, 3]).unwrap();
        selector.set_seed(Some(11));
        let again = selector.select_weighted_random(&[1, 2, 3]).unwrap();
        assert_eq!(first, again);
        assert_eq!(selector.history().len(), 2);
    }

    #[test]
    fn cumulative_range_covers_draw() {
        let mut selector = RandomSelector::seeded(8);
        for _ in 0..100 {
            let result = selector.select_weighted_random(&[3, 1, 6]).unwrap();
            let (low, high) = result.cumulative_range();
            assert!(low <= result.raw_draw && result.raw_draw < high);
        }
    }

    #[test]
    fn trait_selection_returns_variant() {
        let category = TraitCategory::new(
            "Eyes",
            GridPosition::new(1, 1),
            vec![
                TraitVariant::new("Open", "open.png", 0),
                TraitVariant::new("Closed", "closed.png", 4),
            ],
        );
        let mut selector = RandomSelector::seeded(2);
        let selection = selector.select_trait_variant(&category).unwrap();
        assert_eq!(selection.variant.name, "Closed");
        assert_eq!(selection.probability, 1.0);
        assert_eq!(selector.history().len(), 1);
    }

    #[test]
    fn empty_category_rejected() {
        let category = TraitCategory::new("Hat", GridPosition::new(0, 0), Vec::new());
        let mut selector = RandomSelector::seeded(2);
        assert_eq!(
            selector.select_trait_variant(&category),
            Err(RandomSelectionError::EmptyCategory { category: "Hat".into() })
        );
    }

    #[test]
    fn collection_selection_skips_empty_optional() {
        let mut optional = TraitCategory::new("Hat", GridPosition::new(0, 0), Vec::new());
        optional.required = false;
        let config = CollectionConfig::new(5, false)
            .with_category("hat", optional)
            .with_category(
                "eyes",
                TraitCategory::new(
                    "Eyes",
                    GridPosition::new(1, 1),
                    vec![TraitVariant::new("Open", "open.png", 1)],
                ),
            );
        let mut selector = RandomSelector::seeded(4);
        let picks = selector.select_collection_traits(&config).unwrap();
        assert_eq!(picks.keys().collect::<Vec<_>>(), vec!["eyes"]);
    }

    #[test]
    fn select_multiple_without_duplicates_is_distinct() {
        let mut selector = RandomSelector::seeded(6);
        let weights = [5, 0, 3, 2];
        let picks = selector.select_multiple(&weights, 3, false).unwrap();
        let mut chosen: Vec<usize> = picks.iter().map(|r| r.selected_item).collect();
        chosen.sort_unstable();
        assert_eq!(chosen, vec![0, 2, 3]);
        assert_eq!(selector.history().len(), 3);
    }

    #[test]
    fn select_multiple_checks_counts() {
        let mut selector = RandomSelector::seeded(6);
        assert_eq!(
            selector.select_multiple(&[1, 0, 1], 3, false),
            Err(RandomSelectionError::InsufficientCandidates { requested: 3, available: 2 })
        );
        assert_eq!(
            selector.select_multiple(&[1], 0, true),
            Err(RandomSelectionError::ZeroCount { what: "count" })
        );
        assert_eq!(selector.select_multiple(&[1], 4, true).unwrap().len(), 4);
    }

    #[test]
    fn statistics_reject_bad_arguments() {
        let mut selector = RandomSelector::seeded(6);
        assert_eq!(
            selector.analyze_selection_statistics(&[1], 0, 0.05),
            Err(RandomSelectionError::ZeroCount { what: "sample_size" })
        );
        assert!(matches!(
            selector.analyze_selection_statistics(&[1], 10, f64::NAN),
            Err(RandomSelectionError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn statistics_stop_between_batches() {
        let mut selector = RandomSelector::seeded(6);
        let mut polls = 0;
        let result = selector.analyze_selection_statistics_until(
            &[1, 1],
            STATISTICS_BATCH * 3,
            0.05,
            || {
                polls += 1;
                polls > 2
            },
        );
        assert_eq!(
            result,
            Err(RandomSelectionError::Interrupted {
                completed: STATISTICS_BATCH * 2,
                requested: STATISTICS_BATCH * 3,
            })
        );
    }
}
