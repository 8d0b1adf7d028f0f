//! Collection-size feasibility against the trait combination space.
//!
//! Utilisation is `collection_size / total_possible_combinations`. Up to the
//! optimal threshold a collection is comfortable; past the challenging
//! threshold unique generation needs many retries; above 1.0 it is only
//! possible with duplicates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use raritylab_core::CollectionConfig;

/// Collections larger than this get a generation-time notice.
pub const LARGE_COLLECTION_THRESHOLD: u64 = 50_000;

/// Variant count suggested for empty or single-variant categories.
const SUGGESTED_VARIANT_COUNT: usize = 3;

// ─── Configuration ───────────────────────────────────────────────────

/// Utilisation thresholds separating the feasibility levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityThresholds {
    pub optimal: f64,
    pub challenging: f64,
}

impl Default for FeasibilityThresholds {
    fn default() -> Self {
        Self {
            optimal: 0.7,
            challenging: 0.9,
        }
    }
}

/// Errors from the feasibility checker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeasibilityCheckError {
    #[error("no collection configuration provided")]
    MissingConfig,

    #[error("thresholds must satisfy 0 < optimal <= challenging <= 1 (got {optimal}, {challenging})")]
    InvalidThresholds { optimal: f64, challenging: f64 },
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeasibilityLevel {
    Optimal,
    Feasible,
    Challenging,
    Infeasible,
}

impl fmt::Display for FeasibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeasibilityLevel::Optimal => "optimal",
            FeasibilityLevel::Feasible => "feasible",
            FeasibilityLevel::Challenging => "challenging",
            FeasibilityLevel::Infeasible => "infeasible",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeasibilityWarningKind {
    InsufficientCombinations,
    HighUtilization,
    DuplicateRequirement,
    EmptyCategory,
    SingleVariantCategory,
    LargeCollectionSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WarningSeverity::Low => "low",
            WarningSeverity::Medium => "medium",
            WarningSeverity::High => "high",
            WarningSeverity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityWarning {
    pub kind: FeasibilityWarningKind,
    pub severity: WarningSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_value: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_value: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl FeasibilityWarning {
    fn new(kind: FeasibilityWarningKind, severity: WarningSeverity, message: String) -> Self {
        Self {
            kind,
            severity,
            message,
            category_key: None,
            category_name: None,
            affected_value: None,
            recommended_value: None,
            recommendation: None,
        }
    }

    fn category(mut self, key: &str, name: &str) -> Self {
        self.category_key = Some(key.to_string());
        self.category_name = Some(name.to_string());
        self
    }

    fn values(mut self, affected: Option<u128>, recommended: Option<u128>) -> Self {
        self.affected_value = affected;
        self.recommended_value = recommended;
        self
    }

    fn recommend(mut self, text: &str) -> Self {
        self.recommendation = Some(text.to_string());
        self
    }
}

/// Per-category share of the combination space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCombinationAnalysis {
    pub category_key: String,
    pub category_name: String,
    pub variant_count: usize,
    pub is_empty: bool,
    pub is_single_variant: bool,
    pub is_required: bool,
    /// Combinations contributed by the other categories (`total / variant_count`).
    pub contribution: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationSpaceAnalysis {
    pub total_possible_combinations: u128,
    pub collection_size: u64,
    /// `None` when there are no combinations at all.
    pub utilization_ratio: Option<f64>,
    pub requires_duplicates: bool,
    pub efficiency_score: f64,
    pub categories: BTreeMap<String, CategoryCombinationAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityRecommendations {
    /// Set only when it differs from the configured size.
    pub optimal_collection_size: Option<u128>,
    pub suggested_collection_sizes: Vec<u128>,
    pub variant_recommendations: BTreeMap<String, usize>,
    pub configuration_changes: Vec<String>,
    pub optimization_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionFeasibilityResult {
    pub is_feasible: bool,
    pub level: FeasibilityLevel,
    pub allows_duplicates: bool,
    pub combination_analysis: CombinationSpaceAnalysis,
    pub warnings: Vec<FeasibilityWarning>,
    pub recommendations: FeasibilityRecommendations,
}

// ─── Scoring helpers ─────────────────────────────────────────────────

/// `collection_size / total`, or `None` when `total == 0`.
pub fn utilization_ratio(collection_size: u64, total: u128) -> Option<f64> {
    (total > 0).then(|| collection_size as f64 / total as f64)
}

/// Peaks at 1.0 for 50–70% utilisation, falls to 0.5 at 100%, 0 beyond.
pub fn efficiency_score(collection_size: u64, total: u128) -> f64 {
    let Some(ratio) = utilization_ratio(collection_size, total) else {
        return 0.0;
    };
    let score = if ratio <= 0.5 {
        ratio * 2.0
    } else if ratio <= 0.7 {
        1.0
    } else if ratio <= 1.0 {
        1.0 - (ratio - 0.7) / 0.3 * 0.5
    } else {
        0.0
    };
    score.clamp(0.0, 1.0)
}

// ─── Checker ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeasibilityChecker {
    thresholds: FeasibilityThresholds,
}

impl FeasibilityChecker {
    pub fn new(thresholds: FeasibilityThresholds) -> Result<Self, FeasibilityCheckError> {
        let FeasibilityThresholds {
            optimal,
            challenging,
        } = thresholds;
        let ordered = optimal.is_finite()
            && challenging.is_finite()
            && optimal > 0.0
            && optimal <= challenging
            && challenging <= 1.0;
        if !ordered {
            return Err(FeasibilityCheckError::InvalidThresholds {
                optimal,
                challenging,
            });
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> FeasibilityThresholds {
        self.thresholds
    }

    /// Product of variant counts; 0 when there are no categories or any is empty.
    pub fn calculate_max_combinations(&self, config: &CollectionConfig) -> u128 {
        if config.traits.is_empty() {
            return 0;
        }
        config
            .traits
            .values()
            .map(|c| c.variants.len() as u128)
            .fold(1u128, |acc, n| acc.saturating_mul(n))
    }

    /// Level for a given combination total.
    pub fn level_for(&self, total: u128, collection_size: u64, allow_duplicates: bool) -> FeasibilityLevel {
        let Some(ratio) = utilization_ratio(collection_size, total) else {
            return FeasibilityLevel::Infeasible;
        };
        if ratio <= self.thresholds.optimal {
            FeasibilityLevel::Optimal
        } else if ratio <= self.thresholds.challenging {
            FeasibilityLevel::Feasible
        } else if ratio < 1.0 || (ratio == 1.0 && collection_size <= 10) || allow_duplicates {
            FeasibilityLevel::Challenging
        } else {
            FeasibilityLevel::Infeasible
        }
    }

    pub fn suggest_optimal_collection_size(&self, config: &CollectionConfig) -> u128 {
        self.scaled_size(self.calculate_max_combinations(config), self.thresholds.optimal)
    }

    fn scaled_size(&self, total: u128, fraction: f64) -> u128 {
        if total == 0 {
            return 0;
        }
        ((total as f64 * fraction) as u128).max(1)
    }

    /// Sorted, de-duplicated sizes at 10%, 30%, optimal, challenging and 100%.
    pub fn collection_size_recommendations(&self, config: &CollectionConfig) -> Vec<u128> {
        let total = self.calculate_max_combinations(config);
        if total == 0 {
            return Vec::new();
        }
        let mut sizes: Vec<u128> = [0.1, 0.3, self.thresholds.optimal, self.thresholds.challenging]
            .iter()
            .map(|&f| self.scaled_size(total, f))
            .collect();
        sizes.push(total);
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    /// Quick yes/no check.
    pub fn is_feasible(&self, config: &CollectionConfig) -> bool {
        self.check_feasibility(Some(config))
            .map(|r| r.is_feasible)
            .unwrap_or(false)
    }

    pub fn check_feasibility(
        &self,
        config: Option<&CollectionConfig>,
    ) -> Result<CollectionFeasibilityResult, FeasibilityCheckError> {
        let config = config.ok_or(FeasibilityCheckError::MissingConfig)?;
        let analysis = self.analyze_combination_space(config);
        let level = self.level_for(
            analysis.total_possible_combinations,
            config.collection_size,
            config.allow_duplicates,
        );
        let warnings = self.warnings(config, &analysis);
        let recommendations = self.recommendations(config, &analysis);

        log::debug!(
            "feasibility: {} of {} combinations -> {}",
            config.collection_size,
            analysis.total_possible_combinations,
            level
        );

        Ok(CollectionFeasibilityResult {
            is_feasible: level != FeasibilityLevel::Infeasible,
            level,
            allows_duplicates: config.allow_duplicates,
            combination_analysis: analysis,
            warnings,
            recommendations,
        })
    }

    fn analyze_combination_space(&self, config: &CollectionConfig) -> CombinationSpaceAnalysis {
        let total = self.calculate_max_combinations(config);
        let size = config.collection_size;
        let categories = config
            .traits
            .iter()
            .map(|(key, category)| {
                let count = category.variants.len();
                let contribution = if count > 0 { total / count as u128 } else { 0 };
                let row = CategoryCombinationAnalysis {
                    category_key: key.clone(),
                    category_name: category.name.clone(),
                    variant_count: count,
                    is_empty: count == 0,
                    is_single_variant: count == 1,
                    is_required: category.required,
                    contribution,
                };
                (key.clone(), row)
            })
            .collect();

        CombinationSpaceAnalysis {
            total_possible_combinations: total,
            collection_size: size,
            utilization_ratio: utilization_ratio(size, total),
            requires_duplicates: total == 0 || size as u128 > total,
            efficiency_score: efficiency_score(size, total),
            categories,
        }
    }

    fn warnings(&self, config: &CollectionConfig, analysis: &CombinationSpaceAnalysis) -> Vec<FeasibilityWarning> {
        let mut warnings = Vec::new();
        let total = analysis.total_possible_combinations;
        let size = config.collection_size;

        if analysis.requires_duplicates && !config.allow_duplicates {
            warnings.push(
                FeasibilityWarning::new(
                    FeasibilityWarningKind::InsufficientCombinations,
                    WarningSeverity::Critical,
                    format!("Collection size ({size}) exceeds maximum unique combinations ({total})"),
                )
                .values(Some(size as u128), Some(total))
                .recommend("Reduce collection size or add more trait variants to increase combination space"),
            );
        } else if let Some(ratio) = analysis.utilization_ratio {
            if !analysis.requires_duplicates && ratio > self.thresholds.challenging {
                let severity = if ratio > 0.95 {
                    WarningSeverity::High
                } else {
                    WarningSeverity::Medium
                };
                warnings.push(
                    FeasibilityWarning::new(
                        FeasibilityWarningKind::HighUtilization,
                        severity,
                        format!(
                            "High combination space utilization ({:.1}%) may make generation challenging",
                            ratio * 100.0
                        ),
                    )
                    .values(
                        Some((ratio * 100.0) as u128),
                        Some((self.thresholds.optimal * 100.0) as u128),
                    )
                    .recommend("Consider reducing collection size for more reliable generation"),
                );
            }
        }

        if config.allow_duplicates && total > 0 && size as u128 > total {
            warnings.push(
                FeasibilityWarning::new(
                    FeasibilityWarningKind::DuplicateRequirement,
                    WarningSeverity::Medium,
                    "Collection will require duplicate combinations due to limited trait variants".to_string(),
                )
                .recommend("Add more trait variants to avoid duplicates"),
            );
        }

        for row in analysis.categories.values().filter(|c| c.is_empty) {
            warnings.push(
                FeasibilityWarning::new(
                    FeasibilityWarningKind::EmptyCategory,
                    WarningSeverity::Critical,
                    format!("Trait category '{}' has no variants", row.category_name),
                )
                .category(&row.category_key, &row.category_name)
                .recommend("Add trait variants to enable collection generation"),
            );
        }

        for row in analysis.categories.values().filter(|c| c.is_single_variant) {
            warnings.push(
                FeasibilityWarning::new(
                    FeasibilityWarningKind::SingleVariantCategory,
                    WarningSeverity::Medium,
                    format!(
                        "Trait category '{}' has only one variant, limiting combinations",
                        row.category_name
                    ),
                )
                .category(&row.category_key, &row.category_name)
                .recommend("Add more variants to increase trait diversity"),
            );
        }

        if size > LARGE_COLLECTION_THRESHOLD {
            warnings.push(
                FeasibilityWarning::new(
                    FeasibilityWarningKind::LargeCollectionSize,
                    WarningSeverity::Medium,
                    format!("Large collection size ({size}) may require significant generation time"),
                )
                .values(Some(size as u128), None)
                .recommend("Consider generating in batches"),
            );
        }

        warnings
    }

    fn recommendations(
        &self,
        config: &CollectionConfig,
        analysis: &CombinationSpaceAnalysis,
    ) -> FeasibilityRecommendations {
        let total = analysis.total_possible_combinations;
        let size = config.collection_size;
        let optimal = self.scaled_size(total, self.thresholds.optimal);

        let variant_recommendations = analysis
            .categories
            .iter()
            .filter(|(_, c)| c.is_empty || c.is_single_variant)
            .map(|(key, _)| (key.clone(), SUGGESTED_VARIANT_COUNT))
            .collect();

        let mut configuration_changes = Vec::new();
        if analysis.requires_duplicates && !config.allow_duplicates {
            configuration_changes
                .push("Enable 'allow_duplicates' to permit duplicate combinations".to_string());
        }
        if analysis.utilization_ratio.is_some_and(|r| r > 1.0) {
            configuration_changes.push(format!(
                "Reduce collection size to at most {total} for unique generation"
            ));
        }

        let mut optimization_suggestions = Vec::new();
        if analysis
            .utilization_ratio
            .is_some_and(|r| r > self.thresholds.challenging)
        {
            optimization_suggestions
                .push("Consider reducing collection size for more efficient generation".to_string());
        }
        if analysis
            .categories
            .values()
            .any(|c| c.variant_count < SUGGESTED_VARIANT_COUNT)
        {
            optimization_suggestions
                .push("Add more trait variants to increase combination diversity".to_string());
        }
        if total < (size as u128).saturating_mul(2) {
            optimization_suggestions
                .push("Consider adding new trait categories to expand combination space".to_string());
        }

        FeasibilityRecommendations {
            optimal_collection_size: (optimal != size as u128).then_some(optimal),
            suggested_collection_sizes: self.collection_size_recommendations(config),
            variant_recommendations,
            configuration_changes,
            optimization_suggestions,
        }
    }
}
