//! Weight → probability conversion.
//!
//! Probabilities are computed in integer ticks of `10^-precision` so the
//! rounded vector always sums to exactly one. Each entry first receives
//! `floor(weight * scale / total)` ticks; the ticks lost to flooring are then
//! handed out one at a time by largest remainder (ties: larger weight, then
//! lower index). A zero weight has remainder zero and never receives a tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig, MAX_PRECISION};
use crate::domain::{CollectionConfig, TraitCategory};

/// Relative selection likelihood. Signed so that negative input can be
/// detected instead of wrapping.
pub type RarityWeight = i64;

/// Malformed weight input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WeightCalculationError {
    #[error("weight at index {index} cannot be negative (got {weight})")]
    NegativeWeight { index: usize, weight: RarityWeight },

    #[error("total weight must be positive (got {total})")]
    NonPositiveTotal { total: i128 },
}

/// Probability and cumulative vectors for one weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightCalculationResult {
    pub weights: Vec<RarityWeight>,
    pub probabilities: Vec<f64>,
    /// Probabilities in ticks of `10^-precision`; always sums to `10^precision`.
    pub probability_units: Vec<u64>,
    pub total_weight: u128,
    pub cumulative_probabilities: Vec<f64>,
    pub precision: u32,
}

impl WeightCalculationResult {
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn probability(&self, index: usize) -> Option<f64> {
        self.probabilities.get(index).copied()
    }

    pub fn cumulative_probability(&self, index: usize) -> Option<f64> {
        self.cumulative_probabilities.get(index).copied()
    }
}

/// A variant joined with its computed probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitProbability {
    pub category_name: String,
    pub variant_name: String,
    pub filename: String,
    pub weight: RarityWeight,
    pub probability: f64,
    pub cumulative_probability: f64,
    pub index: usize,
}

/// Aggregate view of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub count: usize,
    pub total_weight: u128,
    pub min_probability: f64,
    pub max_probability: f64,
    pub probability_sum: f64,
    pub precision: u32,
}

/// Stateless weight → probability calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightCalculator {
    precision: u32,
    validate_inputs: bool,
}

impl Default for WeightCalculator {
    fn default() -> Self {
        Self {
            precision: 3,
            validate_inputs: true,
        }
    }
}

impl WeightCalculator {
    pub fn new(precision: u32, validate_inputs: bool) -> Result<Self, ConfigError> {
        if precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionOutOfRange {
                precision,
                max: MAX_PRECISION,
            });
        }
        Ok(Self {
            precision,
            validate_inputs,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(config.precision, config.validate_inputs)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn validates_inputs(&self) -> bool {
        self.validate_inputs
    }

    fn scale(&self) -> u128 {
        10u128.pow(self.precision)
    }

    /// Convert weights to rounded probabilities plus their cumulative vector.
    ///
    /// Empty input yields empty vectors. With `validate_inputs` off, negative
    /// entries are not reported and count as zero; a total that is not
    /// positive is rejected either way.
    pub fn calculate_probabilities(
        &self,
        weights: &[RarityWeight],
    ) -> Result<WeightCalculationResult, WeightCalculationError> {
        if weights.is_empty() {
            return Ok(WeightCalculationResult {
                weights: Vec::new(),
                probabilities: Vec::new(),
                probability_units: Vec::new(),
                total_weight: 0,
                cumulative_probabilities: Vec::new(),
                precision: self.precision,
            });
        }

        if self.validate_inputs {
            if let Some((index, &weight)) = weights.iter().enumerate().find(|(_, &w)| w < 0) {
                return Err(WeightCalculationError::NegativeWeight { index, weight });
            }
        }

        let raw_total: i128 = weights.iter().map(|&w| w as i128).sum();
        let effective: Vec<u128> = weights.iter().map(|&w| w.max(0) as u128).collect();
        let total: u128 = effective.iter().sum();
        if raw_total <= 0 || total == 0 {
            return Err(WeightCalculationError::NonPositiveTotal { total: raw_total });
        }

        let scale = self.scale();
        let mut units: Vec<u128> = Vec::with_capacity(weights.len());
        let mut remainders: Vec<u128> = Vec::with_capacity(weights.len());
        for &w in &effective {
            let scaled = w * scale;
            units.push(scaled / total);
            remainders.push(scaled % total);
        }

        // Leftover is strictly less than the number of non-zero remainders.
        let assigned: u128 = units.iter().sum();
        let leftover = (scale - assigned) as usize;
        if leftover > 0 {
            let mut order: Vec<usize> = (0..weights.len()).filter(|&i| remainders[i] > 0).collect();
            order.sort_by(|&a, &b| {
                remainders[b]
                    .cmp(&remainders[a])
                    .then(effective[b].cmp(&effective[a]))
                    .then(a.cmp(&b))
            });
            for &i in order.iter().take(leftover) {
                units[i] += 1;
            }
        }

        let scale_f = scale as f64;
        let probabilities: Vec<f64> = units.iter().map(|&u| u as f64 / scale_f).collect();

        let mut cumulative_probabilities = Vec::with_capacity(units.len());
        let mut running: u128 = 0;
        for &u in &units {
            running += u;
            cumulative_probabilities.push(running as f64 / scale_f);
        }
        if let Some(last) = cumulative_probabilities.last_mut() {
            *last = 1.0;
        }

        Ok(WeightCalculationResult {
            weights: weights.to_vec(),
            probabilities,
            probability_units: units.into_iter().map(|u| u as u64).collect(),
            total_weight: total,
            cumulative_probabilities,
            precision: self.precision,
        })
    }

    /// Per-variant probabilities for one category. Empty categories yield an empty list.
    pub fn calculate_trait_probabilities(
        &self,
        category: &TraitCategory,
    ) -> Result<Vec<TraitProbability>, WeightCalculationError> {
        if category.is_empty() {
            return Ok(Vec::new());
        }
        let result = self.calculate_probabilities(&category.weights())?;
        Ok(category
            .variants
            .iter()
            .enumerate()
            .map(|(index, variant)| TraitProbability {
                category_name: category.name.clone(),
                variant_name: variant.name.clone(),
                filename: variant.filename.clone(),
                weight: variant.rarity_weight,
                probability: result.probabilities[index],
                cumulative_probability: result.cumulative_probabilities[index],
                index,
            })
            .collect())
    }

    /// Per-category probabilities for a whole collection, keyed like `config.traits`.
    pub fn calculate_collection_probabilities(
        &self,
        config: &CollectionConfig,
    ) -> Result<BTreeMap<String, Vec<TraitProbability>>, WeightCalculationError> {
        config
            .traits
            .iter()
            .map(|(key, category)| Ok((key.clone(), self.calculate_trait_probabilities(category)?)))
            .collect()
    }

    pub fn calculation_summary(
        &self,
        weights: &[RarityWeight],
    ) -> Result<CalculationSummary, WeightCalculationError> {
        let result = self.calculate_probabilities(weights)?;
        let min_probability = result.probabilities.iter().copied().fold(f64::INFINITY, f64::min);
        let max_probability = result.probabilities.iter().copied().fold(0.0, f64::max);
        let unit_sum: u64 = result.probability_units.iter().sum();
        Ok(CalculationSummary {
            count: result.len(),
            total_weight: result.total_weight,
            min_probability: if result.is_empty() { 0.0 } else { min_probability },
            max_probability,
            probability_sum: unit_sum as f64 / self.scale() as f64,
            precision: self.precision,
        })
    }
}

/// True when every weight is non-negative and at least one is positive.
pub fn validate_weights(weights: &[RarityWeight]) -> bool {
    !weights.is_empty() && weights.iter().all(|&w| w >= 0) && weights.iter().any(|&w| w > 0)
}
