//! Domain types for RarityLab

pub mod collection;

pub use collection::{
    CollectionConfig, CollectionParseError, GridPosition, RarityTier, TraitCategory,
    TraitVariant, GRID_CELLS, GRID_SIZE,
};
