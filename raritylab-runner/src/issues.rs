//! Validation issues: soft findings recorded as data, never raised as errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Issue severity. Only `Error` makes a distribution invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Machine-readable issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyCategory,
    InvalidWeights,
    NoSelectableVariants,
    ZeroWeight,
    MinimumOccurrence,
    UnreachableVariant,
    DuplicateVariantName,
    SingleVariant,
    NoTraitCategories,
    InvalidCollectionSize,
    CombinationFeasibility,
    HighUtilization,
    DuplicateRequirement,
    LargeCollection,
    GridCoverage,
    GridPositionConflict,
    InvalidGridPosition,
    SimulationAccuracy,
    SimulationPrecision,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::EmptyCategory => "empty_category",
            IssueKind::InvalidWeights => "invalid_weights",
            IssueKind::NoSelectableVariants => "no_selectable_variants",
            IssueKind::ZeroWeight => "zero_weight",
            IssueKind::MinimumOccurrence => "minimum_occurrence",
            IssueKind::UnreachableVariant => "unreachable_variant",
            IssueKind::DuplicateVariantName => "duplicate_variant_name",
            IssueKind::SingleVariant => "single_variant",
            IssueKind::NoTraitCategories => "no_trait_categories",
            IssueKind::InvalidCollectionSize => "invalid_collection_size",
            IssueKind::CombinationFeasibility => "combination_feasibility",
            IssueKind::HighUtilization => "high_utilization",
            IssueKind::DuplicateRequirement => "duplicate_requirement",
            IssueKind::LargeCollection => "large_collection",
            IssueKind::GridCoverage => "grid_coverage",
            IssueKind::GridPositionConflict => "grid_position_conflict",
            IssueKind::InvalidGridPosition => "invalid_grid_position",
            IssueKind::SimulationAccuracy => "simulation_accuracy",
            IssueKind::SimulationPrecision => "simulation_precision",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding from a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, category: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            trait_key: None,
            trait_name: None,
            expected: None,
            actual: None,
            deviation: None,
        }
    }

    pub fn error(category: IssueKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    pub fn warning(category: IssueKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    pub fn info(category: IssueKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    pub fn for_trait(mut self, key: impl Into<String>) -> Self {
        self.trait_key = Some(key.into());
        self
    }

    pub fn for_variant(mut self, name: impl Into<String>) -> Self {
        self.trait_name = Some(name.into());
        self
    }

    pub fn with_values(mut self, expected: f64, actual: f64) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self.deviation = Some(actual - expected);
        self
    }
}

/// Count issues of one severity.
pub fn count_severity(issues: &[ValidationIssue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_error_highest() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&IssueKind::GridPositionConflict).unwrap();
        assert_eq!(json, "\"grid_position_conflict\"");
        assert_eq!(IssueKind::GridPositionConflict.as_str(), "grid_position_conflict");
    }

    #[test]
    fn builder_fills_optional_fields() {
        let issue = ValidationIssue::warning(IssueKind::MinimumOccurrence, "rare")
            .for_trait("eyes")
            .for_variant("Laser")
            .with_values(1.0, 0.25);
        assert_eq!(issue.trait_key.as_deref(), Some("eyes"));
        assert_eq!(issue.deviation, Some(-0.75));

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["category"], "minimum_occurrence");
    }

    #[test]
    fn absent_optionals_are_not_serialized() {
        let issue = ValidationIssue::info(IssueKind::LargeCollection, "big");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("trait_key"));
        assert!(!json.contains("deviation"));
    }

    #[test]
    fn counts_by_severity() {
        let issues = vec![
            ValidationIssue::error(IssueKind::EmptyCategory, "a"),
            ValidationIssue::warning(IssueKind::ZeroWeight, "b"),
            ValidationIssue::warning(IssueKind::ZeroWeight, "c"),
        ];
        assert_eq!(count_severity(&issues, Severity::Error), 1);
        assert_eq!(count_severity(&issues, Severity::Warning), 2);
        assert_eq!(count_severity(&issues, Severity::Info), 0);
    }
}
