//! RarityLab Core — collection model, weight math and weighted selection.
//!
//! This crate contains the deterministic heart of the rarity engine:
//! - Collection description types (categories, variants, grid, tiers)
//! - Engine options (`EngineConfig`)
//! - Weight → probability conversion with exact sum-to-one rounding
//! - Seedable weighted random selection with an audit history
//! - BLAKE3 seed hierarchy for order-independent sub-seeds

pub mod config;
pub mod domain;
pub mod rng;
pub mod selector;
pub mod weights;

pub use config::{ConfigError, EngineConfig, MAX_PRECISION};
pub use domain::{
    CollectionConfig, CollectionParseError, GridPosition, RarityTier, TraitCategory,
    TraitVariant, GRID_CELLS, GRID_SIZE,
};
pub use rng::SeedHierarchy;
pub use selector::{
    RandomSelectionError, RandomSelector, SelectionResult, SelectionStatistics,
    TraitSelectionResult,
};
pub use weights::{
    validate_weights, CalculationSummary, RarityWeight, TraitProbability,
    WeightCalculationError, WeightCalculationResult, WeightCalculator,
};
