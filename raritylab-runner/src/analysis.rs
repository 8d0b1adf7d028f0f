//! Per-category and collection-level distribution analysis records.

use serde::{Deserialize, Serialize};

use raritylab_core::RarityWeight;

use crate::feasibility::FeasibilityLevel;

/// One variant's expected behaviour over a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDistribution {
    pub name: String,
    pub weight: RarityWeight,
    pub probability: f64,
    pub expected_occurrences: f64,
    pub min_possible_occurrence: u64,
    pub max_possible_occurrence: u64,
    /// Advisory tier whose band contains the weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

/// Distribution analysis for one trait category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDistributionAnalysis {
    pub category_key: String,
    pub category_name: String,
    pub variant_count: usize,
    pub total_weight: i128,
    pub min_weight: RarityWeight,
    pub max_weight: RarityWeight,
    /// Rows in variant order.
    pub variants: Vec<VariantDistribution>,
    pub zero_weight_variants: Vec<String>,
    pub balance_score: f64,
}

impl TraitDistributionAnalysis {
    pub fn empty(category_key: &str, category_name: &str) -> Self {
        Self {
            category_key: category_key.to_string(),
            category_name: category_name.to_string(),
            variant_count: 0,
            total_weight: 0,
            min_weight: 0,
            max_weight: 0,
            variants: Vec::new(),
            zero_weight_variants: Vec::new(),
            balance_score: 0.0,
        }
    }

    pub fn weight_distribution(&self) -> Vec<(&str, RarityWeight)> {
        self.variants.iter().map(|v| (v.name.as_str(), v.weight)).collect()
    }

    pub fn expected_frequencies(&self) -> Vec<f64> {
        self.variants.iter().map(|v| v.probability).collect()
    }

    pub fn expected_occurrences(&self) -> Vec<f64> {
        self.variants.iter().map(|v| v.expected_occurrences).collect()
    }
}

/// Collection-wide combination and balance figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionFeasibilityAnalysis {
    pub collection_size: u64,
    pub allow_duplicates: bool,
    pub total_trait_categories: usize,
    pub populated_categories: usize,
    pub complete_grid_coverage: bool,
    pub occupied_cells: Vec<u8>,
    /// Product of variant counts over populated categories (saturating).
    pub total_possible_combinations: u128,
    pub unique_combinations_feasible: bool,
    pub utilization_ratio: Option<f64>,
    pub feasibility_level: FeasibilityLevel,
    pub distribution_balance_score: f64,
    pub generation_complexity_score: f64,
}

/// `1 - clip(cv, 0, 1)` over the weights; 1.0 for a single variant,
/// 0.0 when empty or when the mean is not positive.
pub fn balance_score(weights: &[RarityWeight]) -> f64 {
    match weights.len() {
        0 => return 0.0,
        1 => return 1.0,
        _ => {}
    }
    let n = weights.len() as f64;
    let mean = weights.iter().map(|&w| w as f64).sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = weights
        .iter()
        .map(|&w| {
            let d = w as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let cv = variance.sqrt() / mean;
    1.0 - cv.clamp(0.0, 1.0)
}

/// How large the combination space is relative to the collection (0–1, higher is roomier).
pub fn generation_complexity_score(total_combinations: u128, collection_size: u64) -> f64 {
    if collection_size == 0 {
        return 0.0;
    }
    let ratio = total_combinations as f64 / collection_size as f64;
    let score = if ratio >= 100.0 {
        1.0
    } else if ratio >= 10.0 {
        0.7 + 0.3 * ((ratio - 10.0) / 90.0).min(1.0)
    } else if ratio >= 2.0 {
        0.3 + 0.4 * (ratio - 2.0) / 8.0
    } else {
        0.3 * ratio / 2.0
    };
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_weights_are_perfectly_balanced() {
        assert_eq!(balance_score(&[10, 10, 10]), 1.0);
    }

    #[test]
    fn single_and_empty_special_cases() {
        assert_eq!(balance_score(&[7]), 1.0);
        assert_eq!(balance_score(&[]), 0.0);
        assert_eq!(balance_score(&[0, 0]), 0.0);
    }

    #[test]
    fn skewed_weights_score_low() {
        // mean 25, population std 43.3 -> cv clipped to 1
        assert_eq!(balance_score(&[100, 0, 0, 0]), 0.0);
        let mid = balance_score(&[100, 50, 25]);
        assert!(mid > 0.4 && mid < 0.7, "got {mid}");
    }

    #[test]
    fn complexity_bands() {
        assert_eq!(generation_complexity_score(1000, 10), 1.0);
        assert!((generation_complexity_score(100, 10) - 0.7).abs() < 1e-12);
        assert!((generation_complexity_score(20, 10) - 0.3).abs() < 1e-12);
        assert!((generation_complexity_score(10, 10) - 0.15).abs() < 1e-12);
        assert_eq!(generation_complexity_score(10, 0), 0.0);
    }

    #[test]
    fn empty_analysis_has_no_rows() {
        let analysis = TraitDistributionAnalysis::empty("hat", "Hat");
        assert!(analysis.variants.is_empty());
        assert!(analysis.expected_frequencies().is_empty());
        assert_eq!(analysis.balance_score, 0.0);
    }
}
