//! Distribution validation: per-category analysis, collection feasibility,
//! optional Monte-Carlo accuracy check, scoring and recommendations.
//!
//! A validation pass collects every issue it finds; issues are data on the
//! result, never errors. `DistributionValidationError` is reserved for a
//! missing configuration, bad engine options and aborted simulations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use raritylab_core::{
    CollectionConfig, ConfigError, EngineConfig, RarityWeight, SelectionStatistics,
    TraitCategory, WeightCalculationError, WeightCalculator, GRID_CELLS,
};

use crate::analysis::{
    balance_score, generation_complexity_score, CollectionFeasibilityAnalysis,
    TraitDistributionAnalysis, VariantDistribution,
};
use crate::feasibility::{
    utilization_ratio, FeasibilityCheckError, FeasibilityChecker, FeasibilityLevel,
    FeasibilityThresholds, LARGE_COLLECTION_THRESHOLD,
};
use crate::issues::{count_severity, IssueKind, Severity, ValidationIssue};
use crate::simulation::{simulate_weights, SimulationConfig, SimulationError};

const ERROR_PENALTY: f64 = 0.2;
const WARNING_PENALTY: f64 = 0.05;
const LOW_CATEGORY_BALANCE: f64 = 0.3;
const LOW_COLLECTION_BALANCE: f64 = 0.5;

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DistributionValidationError {
    #[error("no collection configuration provided")]
    MissingConfig,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feasibility(#[from] FeasibilityCheckError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionValidationResult {
    pub is_valid: bool,
    pub overall_score: f64,
    pub collection_analysis: CollectionFeasibilityAnalysis,
    pub trait_analyses: BTreeMap<String, TraitDistributionAnalysis>,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_results: Option<BTreeMap<String, SelectionStatistics>>,
}

impl DistributionValidationResult {
    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn error_count(&self) -> usize {
        count_severity(&self.issues, Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        count_severity(&self.issues, Severity::Warning)
    }
}

/// Analysis plus issues for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitValidation {
    pub analysis: TraitDistributionAnalysis,
    pub issues: Vec<ValidationIssue>,
    /// Probabilities could be computed, so the category can be simulated.
    pub selectable: bool,
}

// ─── Validator ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DistributionValidator {
    config: EngineConfig,
    calculator: WeightCalculator,
    feasibility: FeasibilityChecker,
}

impl DistributionValidator {
    pub fn new(config: EngineConfig) -> Result<Self, DistributionValidationError> {
        config.validate()?;
        Ok(Self {
            calculator: WeightCalculator::from_config(&config)?,
            config,
            feasibility: FeasibilityChecker::default(),
        })
    }

    pub fn with_tolerances(
        tolerance_accuracy: f64,
        tolerance_max_frequency: f64,
    ) -> Result<Self, DistributionValidationError> {
        Self::new(EngineConfig {
            tolerance_accuracy,
            tolerance_max_frequency,
            ..EngineConfig::default()
        })
    }

    pub fn with_thresholds(
        mut self,
        thresholds: FeasibilityThresholds,
    ) -> Result<Self, DistributionValidationError> {
        self.feasibility = FeasibilityChecker::new(thresholds)?;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculator(&self) -> &WeightCalculator {
        &self.calculator
    }

    /// Validate a collection; `simulation = Some(..)` also runs the Monte-Carlo check.
    pub fn validate_distribution(
        &self,
        config: Option<&CollectionConfig>,
        simulation: Option<&SimulationConfig>,
    ) -> Result<DistributionValidationResult, DistributionValidationError> {
        self.validate_distribution_with_cancel(config, simulation, None)
    }

    pub fn validate_distribution_with_cancel(
        &self,
        config: Option<&CollectionConfig>,
        simulation: Option<&SimulationConfig>,
        cancel: Option<&AtomicBool>,
    ) -> Result<DistributionValidationResult, DistributionValidationError> {
        let config = config.ok_or(DistributionValidationError::MissingConfig)?;
        log::info!(
            "validating collection '{}': {} categories, size {}",
            config.name,
            config.traits.len(),
            config.collection_size
        );

        let mut trait_analyses = BTreeMap::new();
        let mut trait_issues = Vec::new();
        let mut simulatable: Vec<(String, Vec<RarityWeight>)> = Vec::new();
        for (key, category) in &config.traits {
            let mut outcome = self.validate_trait_distribution(key, category, config.collection_size);
            for row in &mut outcome.analysis.variants {
                row.tier = config.tier_for_weight(row.weight).map(str::to_string);
            }
            if outcome.selectable {
                simulatable.push((key.clone(), category.weights()));
            }
            trait_issues.extend(outcome.issues);
            trait_analyses.insert(key.clone(), outcome.analysis);
        }

        let mut issues = Vec::new();
        let collection_analysis = self.analyze_collection(config, &trait_analyses, &mut issues);
        issues.extend(trait_issues);

        let simulation_results = match simulation {
            Some(sim) => {
                let results = simulate_weights(
                    &simulatable,
                    &self.calculator,
                    sim,
                    self.config.tolerance_max_frequency,
                    cancel,
                )?;
                self.simulation_issues(config, &results, &mut issues);
                Some(results)
            }
            None => None,
        };

        let errors = count_severity(&issues, Severity::Error);
        let warnings = count_severity(&issues, Severity::Warning);
        let penalty = ERROR_PENALTY * errors as f64 + WARNING_PENALTY * warnings as f64;
        let overall_score = (collection_analysis.distribution_balance_score - penalty).clamp(0.0, 1.0);
        let is_valid = errors == 0 && collection_analysis.unique_combinations_feasible;

        let recommendations =
            self.recommendations(config, &collection_analysis, &trait_analyses, &issues);

        log::info!(
            "validation finished: valid={is_valid} score={overall_score:.3} errors={errors} warnings={warnings}"
        );

        Ok(DistributionValidationResult {
            is_valid,
            overall_score,
            collection_analysis,
            trait_analyses,
            issues,
            recommendations,
            simulation_results,
        })
    }

    /// Analyse one category against a collection size.
    pub fn validate_trait_distribution(
        &self,
        key: &str,
        category: &TraitCategory,
        collection_size: u64,
    ) -> TraitValidation {
        let mut issues = Vec::new();
        if category.is_empty() {
            issues.push(
                ValidationIssue::error(
                    IssueKind::EmptyCategory,
                    format!("Trait category '{}' has no variants", category.name),
                )
                .for_trait(key),
            );
            return TraitValidation {
                analysis: TraitDistributionAnalysis::empty(key, &category.name),
                issues,
                selectable: false,
            };
        }

        let weights = category.weights();
        let positive = weights.iter().filter(|&&w| w > 0).count();

        for name in duplicate_names(category) {
            issues.push(
                ValidationIssue::warning(
                    IssueKind::DuplicateVariantName,
                    format!("Variant name '{name}' appears more than once in '{}'", category.name),
                )
                .for_trait(key)
                .for_variant(name),
            );
        }

        if category.variants.len() == 1 {
            issues.push(
                ValidationIssue::info(
                    IssueKind::SingleVariant,
                    format!("Trait category '{}' has only one variant", category.name),
                )
                .for_trait(key),
            );
        }

        let probabilities = match self.calculator.calculate_probabilities(&weights) {
            Ok(calc) => Some(calc.probabilities),
            Err(e) => {
                let kind = match e {
                    WeightCalculationError::NegativeWeight { .. } => IssueKind::InvalidWeights,
                    WeightCalculationError::NonPositiveTotal { .. } => IssueKind::NoSelectableVariants,
                };
                issues.push(
                    ValidationIssue::error(
                        kind,
                        format!("Trait category '{}' has unusable weights: {e}", category.name),
                    )
                    .for_trait(key),
                );
                None
            }
        };
        let selectable = probabilities.is_some();

        let mut variants = Vec::with_capacity(weights.len());
        let mut zero_weight_variants = Vec::new();
        for (i, variant) in category.variants.iter().enumerate() {
            let weight = variant.rarity_weight;
            let probability = probabilities.as_ref().map_or(0.0, |p| p[i]);
            let expected = probability * collection_size as f64;
            let min_possible = u64::from(weight > 0);
            let max_possible = if weight > 0 {
                collection_size
                    .saturating_sub(positive.saturating_sub(1) as u64)
                    .max(min_possible)
            } else {
                0
            };

            if weight == 0 {
                zero_weight_variants.push(variant.name.clone());
                if selectable {
                    issues.push(
                        ValidationIssue::warning(
                            IssueKind::ZeroWeight,
                            format!(
                                "Variant '{}' in '{}' has zero weight and will never be selected",
                                variant.name, category.name
                            ),
                        )
                        .for_trait(key)
                        .for_variant(&variant.name),
                    );
                }
            } else if selectable && weight > 0 && probability == 0.0 {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::UnreachableVariant,
                        format!(
                            "Variant '{}' in '{}' rounds to probability 0 at precision {}",
                            variant.name,
                            category.name,
                            self.calculator.precision()
                        ),
                    )
                    .for_trait(key)
                    .for_variant(&variant.name),
                );
            } else if selectable && weight > 0 && expected < 1.0 {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::MinimumOccurrence,
                        format!(
                            "Variant '{}' in '{}' may not appear in the collection",
                            variant.name, category.name
                        ),
                    )
                    .for_trait(key)
                    .for_variant(&variant.name)
                    .with_values(1.0, expected),
                );
            }

            variants.push(VariantDistribution {
                name: variant.name.clone(),
                weight,
                probability,
                expected_occurrences: expected,
                min_possible_occurrence: min_possible,
                max_possible_occurrence: max_possible,
                tier: None,
            });
        }

        let analysis = TraitDistributionAnalysis {
            category_key: key.to_string(),
            category_name: category.name.clone(),
            variant_count: weights.len(),
            total_weight: weights.iter().map(|&w| w as i128).sum(),
            min_weight: weights.iter().copied().min().unwrap_or(0),
            max_weight: weights.iter().copied().max().unwrap_or(0),
            variants,
            zero_weight_variants,
            balance_score: if selectable { balance_score(&weights) } else { 0.0 },
        };

        TraitValidation {
            analysis,
            issues,
            selectable,
        }
    }

    /// Run the Monte-Carlo check alone, against `tolerance_max_frequency`.
    pub fn simulate_generation_accuracy(
        &self,
        config: &CollectionConfig,
        simulation: &SimulationConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<BTreeMap<String, SelectionStatistics>, DistributionValidationError> {
        Ok(crate::simulation::simulate_generation_accuracy(
            config,
            &self.calculator,
            simulation,
            self.config.tolerance_max_frequency,
            cancel,
        )?)
    }

    /// Product of variant counts over populated categories; 0 when none are populated.
    pub fn total_possible_combinations(&self, config: &CollectionConfig) -> u128 {
        let mut populated = config.traits.values().filter(|c| !c.is_empty()).peekable();
        if populated.peek().is_none() {
            return 0;
        }
        populated.fold(1u128, |acc, c| acc.saturating_mul(c.variants.len() as u128))
    }

    /// Quick check without per-category analysis or simulation.
    pub fn check_distribution_feasibility(&self, config: &CollectionConfig) -> bool {
        config.allow_duplicates
            || self.total_possible_combinations(config) >= config.collection_size as u128
    }

    fn analyze_collection(
        &self,
        config: &CollectionConfig,
        trait_analyses: &BTreeMap<String, TraitDistributionAnalysis>,
        issues: &mut Vec<ValidationIssue>,
    ) -> CollectionFeasibilityAnalysis {
        let size = config.collection_size;
        let total = self.total_possible_combinations(config);
        let feasible = self.check_distribution_feasibility(config);
        let ratio = utilization_ratio(size, total);
        let thresholds = self.feasibility.thresholds();

        if config.traits.is_empty() {
            issues.push(ValidationIssue::error(
                IssueKind::NoTraitCategories,
                "Collection defines no trait categories",
            ));
        }
        if size == 0 {
            issues.push(ValidationIssue::error(
                IssueKind::InvalidCollectionSize,
                "Collection size must be greater than zero",
            ));
        }
        if !feasible {
            issues.push(
                ValidationIssue::error(
                    IssueKind::CombinationFeasibility,
                    format!(
                        "Insufficient trait combinations ({total}) for unique collection size ({size})"
                    ),
                )
                .with_values(size as f64, total as f64),
            );
        } else if !config.allow_duplicates {
            if let Some(r) = ratio.filter(|&r| r > thresholds.challenging) {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::HighUtilization,
                        format!(
                            "Collection uses {:.1}% of the combination space; unique generation may be slow",
                            r * 100.0
                        ),
                    )
                    .with_values(thresholds.challenging, r),
                );
            }
        }
        if config.allow_duplicates && total < size as u128 {
            issues.push(ValidationIssue::info(
                IssueKind::DuplicateRequirement,
                format!("Collection of {size} will contain duplicates: only {total} combinations exist"),
            ));
        }
        if size > LARGE_COLLECTION_THRESHOLD {
            issues.push(ValidationIssue::info(
                IssueKind::LargeCollection,
                format!("Large collection size ({size}) may require significant generation time"),
            ));
        }

        self.grid_issues(config, issues);
        let occupied_cells = config.occupied_cells();
        let complete = occupied_cells.len() == GRID_CELLS;
        if !complete && !config.traits.is_empty() {
            issues.push(ValidationIssue::info(
                IssueKind::GridCoverage,
                format!(
                    "Incomplete grid coverage: {} of {GRID_CELLS} cells filled",
                    occupied_cells.len()
                ),
            ));
        }

        let populated: Vec<f64> = trait_analyses
            .values()
            .filter(|a| a.variant_count > 0)
            .map(|a| a.balance_score)
            .collect();
        let distribution_balance_score = if populated.is_empty() {
            0.0
        } else {
            populated.iter().sum::<f64>() / populated.len() as f64
        };

        // Full utilisation is still reachable when every combination is used once.
        let mut feasibility_level = self
            .feasibility
            .level_for(total, size, config.allow_duplicates);
        if feasible && feasibility_level == FeasibilityLevel::Infeasible {
            feasibility_level = FeasibilityLevel::Challenging;
        }

        CollectionFeasibilityAnalysis {
            collection_size: size,
            allow_duplicates: config.allow_duplicates,
            total_trait_categories: config.traits.len(),
            populated_categories: populated.len(),
            complete_grid_coverage: complete,
            occupied_cells,
            total_possible_combinations: total,
            unique_combinations_feasible: feasible,
            utilization_ratio: ratio,
            feasibility_level,
            distribution_balance_score,
            generation_complexity_score: generation_complexity_score(total, size),
        }
    }

    fn grid_issues(&self, config: &CollectionConfig, issues: &mut Vec<ValidationIssue>) {
        let mut by_cell: BTreeMap<u8, Vec<&str>> = BTreeMap::new();
        for (key, category) in &config.traits {
            match category.grid_position.cell() {
                Some(cell) => by_cell.entry(cell).or_default().push(key),
                None => issues.push(
                    ValidationIssue::error(
                        IssueKind::InvalidGridPosition,
                        format!(
                            "Trait category '{}' is placed outside the grid (row {}, column {})",
                            category.name, category.grid_position.row, category.grid_position.column
                        ),
                    )
                    .for_trait(key),
                ),
            }
        }
        for (cell, keys) in by_cell.iter().filter(|(_, keys)| keys.len() > 1) {
            issues.push(ValidationIssue::warning(
                IssueKind::GridPositionConflict,
                format!("Categories {} share grid cell {cell}", quoted_list(keys)),
            ));
        }
    }

    fn simulation_issues(
        &self,
        config: &CollectionConfig,
        results: &BTreeMap<String, SelectionStatistics>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let max_frequency = self.config.tolerance_max_frequency;
        let accuracy = self.config.tolerance_accuracy;
        for (key, stats) in results {
            let name = category_name(config, key);
            if !stats.within(max_frequency) {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::SimulationAccuracy,
                        format!("Statistical simulation for '{name}' exceeds the frequency tolerance"),
                    )
                    .for_trait(key)
                    .with_values(max_frequency, stats.max_deviation),
                );
            } else if !stats.within(accuracy) {
                issues.push(
                    ValidationIssue::info(
                        IssueKind::SimulationPrecision,
                        format!("Statistical simulation for '{name}' exceeds the accuracy tolerance"),
                    )
                    .for_trait(key)
                    .with_values(accuracy, stats.max_deviation),
                );
            }
        }
    }

    fn recommendations(
        &self,
        config: &CollectionConfig,
        collection: &CollectionFeasibilityAnalysis,
        trait_analyses: &BTreeMap<String, TraitDistributionAnalysis>,
        issues: &[ValidationIssue],
    ) -> Vec<String> {
        let mut out = Vec::new();
        let total = collection.total_possible_combinations;

        if !collection.complete_grid_coverage && !config.traits.is_empty() {
            push_unique(
                &mut out,
                "Consider adding traits for all 9 grid positions for complete coverage".to_string(),
            );
        }
        if !collection.unique_combinations_feasible {
            push_unique(
                &mut out,
                format!("Reduce collection size to at most {total} or add trait variants to ensure unique combinations"),
            );
        }
        if collection.populated_categories > 0
            && collection.distribution_balance_score < LOW_COLLECTION_BALANCE
        {
            push_unique(
                &mut out,
                "Consider balancing trait weights for more even distribution".to_string(),
            );
        }

        for analysis in trait_analyses.values() {
            let name = &analysis.category_name;
            if analysis.variant_count > 1 && analysis.balance_score < LOW_CATEGORY_BALANCE {
                push_unique(
                    &mut out,
                    format!("Rebalance weights in '{name}' category for better distribution"),
                );
            }
            for variant in &analysis.zero_weight_variants {
                push_unique(
                    &mut out,
                    format!("Remove zero-weight variant '{variant}' from '{name}' or give it a positive weight"),
                );
            }
        }

        for issue in issues {
            let name = issue
                .trait_key
                .as_deref()
                .map(|k| category_name(config, k))
                .unwrap_or_default();
            let variant = issue.trait_name.as_deref().unwrap_or_default();
            let text = match issue.category {
                IssueKind::EmptyCategory => format!("Add variants to category '{name}'"),
                IssueKind::InvalidWeights => {
                    format!("Replace negative weights in '{name}' with non-negative integers")
                }
                IssueKind::NoSelectableVariants => {
                    format!("Give at least one variant in '{name}' a positive weight")
                }
                IssueKind::MinimumOccurrence => {
                    "Increase weights for rare traits or increase the collection size".to_string()
                }
                IssueKind::UnreachableVariant => format!(
                    "Increase the weight of '{variant}' in '{name}' or raise the calculation precision"
                ),
                IssueKind::DuplicateVariantName => format!("Rename duplicate variants in '{name}'"),
                IssueKind::SingleVariant => {
                    format!("Add more variants to '{name}' to increase diversity")
                }
                IssueKind::NoTraitCategories => "Define at least one trait category".to_string(),
                IssueKind::InvalidCollectionSize => {
                    "Set collection_size to a positive value".to_string()
                }
                IssueKind::CombinationFeasibility => {
                    "Add more trait variants or enable allow_duplicates".to_string()
                }
                IssueKind::HighUtilization => format!(
                    "Reduce collection size to about {} for more reliable generation",
                    ((total as f64) * self.feasibility.thresholds().optimal) as u128
                ),
                IssueKind::DuplicateRequirement => {
                    "Add more trait variants to avoid duplicate combinations".to_string()
                }
                IssueKind::GridPositionConflict | IssueKind::InvalidGridPosition => {
                    "Give each trait category its own cell in the 3x3 grid".to_string()
                }
                IssueKind::SimulationAccuracy => {
                    "Increase the simulation sample size or relax tolerance_max_frequency".to_string()
                }
                IssueKind::ZeroWeight
                | IssueKind::LargeCollection
                | IssueKind::GridCoverage
                | IssueKind::SimulationPrecision => continue,
            };
            push_unique(&mut out, text);
        }

        out
    }
}

fn push_unique(out: &mut Vec<String>, text: String) {
    if !out.contains(&text) {
        out.push(text);
    }
}

fn category_name<'a>(config: &'a CollectionConfig, key: &'a str) -> &'a str {
    config.traits.get(key).map_or(key, |c| c.name.as_str())
}

fn quoted_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Names that occur more than once, in first-appearance order.
fn duplicate_names(category: &TraitCategory) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    let mut out = Vec::new();
    for variant in &category.variants {
        let name = variant.name.as_str();
        if !seen.insert(name) && reported.insert(name) {
            out.push(name);
        }
    }
    out
}
