//! RarityLab Runner — distribution validation, feasibility and simulation.
//!
//! This crate builds on `raritylab-core` to provide:
//! - Per-category distribution analysis with severity-tagged issues
//! - Collection feasibility against the trait combination space
//! - Parallel, cancellable Monte-Carlo accuracy simulation
//! - Plain-text validation and feasibility reports

pub mod analysis;
pub mod feasibility;
pub mod issues;
pub mod report;
pub mod simulation;
pub mod validator;

pub use analysis::{
    balance_score, generation_complexity_score, CollectionFeasibilityAnalysis,
    TraitDistributionAnalysis, VariantDistribution,
};
pub use feasibility::{
    CollectionFeasibilityResult, CombinationSpaceAnalysis, FeasibilityCheckError,
    FeasibilityChecker, FeasibilityLevel, FeasibilityThresholds, FeasibilityWarning,
    FeasibilityWarningKind, WarningSeverity,
};
pub use issues::{IssueKind, Severity, ValidationIssue};
pub use report::{distribution_report, feasibility_report};
pub use simulation::{
    simulate_generation_accuracy, simulate_weights, SimulationConfig, SimulationError,
};
pub use validator::{
    DistributionValidationError, DistributionValidationResult, DistributionValidator,
    TraitValidation,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn validation_types_are_send_sync() {
        assert_send::<DistributionValidator>();
        assert_sync::<DistributionValidator>();
        assert_send::<DistributionValidationResult>();
        assert_sync::<DistributionValidationResult>();
        assert_send::<ValidationIssue>();
        assert_sync::<ValidationIssue>();
    }

    #[test]
    fn feasibility_types_are_send_sync() {
        assert_send::<FeasibilityChecker>();
        assert_sync::<FeasibilityChecker>();
        assert_send::<CollectionFeasibilityResult>();
        assert_sync::<CollectionFeasibilityResult>();
    }

    #[test]
    fn simulation_types_are_send_sync() {
        assert_send::<SimulationConfig>();
        assert_sync::<SimulationConfig>();
        assert_send::<SimulationError>();
        assert_sync::<SimulationError>();
        assert_send::<DistributionValidationError>();
        assert_sync::<DistributionValidationError>();
    }
}
