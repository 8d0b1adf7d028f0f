//! Read-only collection description consumed by the engine.
//!
//! The engine never loads files itself; outer layers hand it a parsed
//! `CollectionConfig`. `from_json` / `from_toml` exist for those layers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weights::RarityWeight;

/// Side length of the composition grid.
pub const GRID_SIZE: u8 = 3;

/// Number of cells in the composition grid.
pub const GRID_CELLS: usize = (GRID_SIZE as usize) * (GRID_SIZE as usize);

/// Errors from parsing a collection description.
#[derive(Debug, Error)]
pub enum CollectionParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Zero-based row/column of a trait category in the 3x3 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u8,
    pub column: u8,
}

impl GridPosition {
    pub fn new(row: u8, column: u8) -> Self {
        Self { row, column }
    }

    /// One-based cell number (1..=9), or `None` when outside the grid.
    pub fn cell(&self) -> Option<u8> {
        if self.row < GRID_SIZE && self.column < GRID_SIZE {
            Some(self.row * GRID_SIZE + self.column + 1)
        } else {
            None
        }
    }
}

/// A single selectable variant of a trait category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitVariant {
    pub name: String,
    pub filename: String,
    pub rarity_weight: RarityWeight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TraitVariant {
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        rarity_weight: RarityWeight,
    ) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            rarity_weight,
            color_code: None,
            description: None,
        }
    }
}

/// A trait category occupying one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitCategory {
    pub name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    pub grid_position: GridPosition,
    #[serde(default)]
    pub variants: Vec<TraitVariant>,
}

fn default_required() -> bool {
    true
}

impl TraitCategory {
    pub fn new(name: impl Into<String>, grid_position: GridPosition, variants: Vec<TraitVariant>) -> Self {
        Self {
            name: name.into(),
            required: true,
            grid_position,
            variants,
        }
    }

    /// Rarity weights in variant order.
    pub fn weights(&self) -> Vec<RarityWeight> {
        self.variants.iter().map(|v| v.rarity_weight).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Advisory weight band (e.g. "common" = 50..=100).
///
/// Tiers are documentation for collection authors. Selection and validation
/// never enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityTier {
    pub min_weight: RarityWeight,
    pub max_weight: RarityWeight,
}

impl RarityTier {
    pub fn contains(&self, weight: RarityWeight) -> bool {
        (self.min_weight..=self.max_weight).contains(&weight)
    }
}

/// Collection-level settings plus every trait category, keyed by category key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub name: String,
    pub collection_size: u64,
    #[serde(default)]
    pub allow_duplicates: bool,
    #[serde(default)]
    pub traits: BTreeMap<String, TraitCategory>,
    #[serde(default)]
    pub rarity_tiers: BTreeMap<String, RarityTier>,
}

impl CollectionConfig {
    pub fn new(collection_size: u64, allow_duplicates: bool) -> Self {
        Self {
            name: String::new(),
            collection_size,
            allow_duplicates,
            traits: BTreeMap::new(),
            rarity_tiers: BTreeMap::new(),
        }
    }

    /// Builder-style category insertion, mainly for tests and presets.
    pub fn with_category(mut self, key: impl Into<String>, category: TraitCategory) -> Self {
        self.traits.insert(key.into(), category);
        self
    }

    pub fn with_tier(mut self, name: impl Into<String>, tier: RarityTier) -> Self {
        self.rarity_tiers.insert(name.into(), tier);
        self
    }

    pub fn from_json(s: &str) -> Result<Self, CollectionParseError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml(s: &str) -> Result<Self, CollectionParseError> {
        Ok(toml::from_str(s)?)
    }

    /// Sorted, de-duplicated cell numbers occupied by categories with a valid position.
    pub fn occupied_cells(&self) -> Vec<u8> {
        let cells: BTreeSet<u8> = self
            .traits
            .values()
            .filter_map(|c| c.grid_position.cell())
            .collect();
        cells.into_iter().collect()
    }

    pub fn is_complete_grid(&self) -> bool {
        self.occupied_cells().len() == GRID_CELLS
    }

    /// First category (in key order) placed on the given one-based cell.
    pub fn trait_by_cell(&self, cell: u8) -> Option<(&str, &TraitCategory)> {
        self.traits
            .iter()
            .find(|(_, c)| c.grid_position.cell() == Some(cell))
            .map(|(k, c)| (k.as_str(), c))
    }

    pub fn variant_counts(&self) -> BTreeMap<&str, usize> {
        self.traits
            .iter()
            .map(|(k, c)| (k.as_str(), c.variants.len()))
            .collect()
    }

    /// Name of the first tier (in name order) whose band contains `weight`.
    pub fn tier_for_weight(&self, weight: RarityWeight) -> Option<&str> {
        self.rarity_tiers
            .iter()
            .find(|(_, tier)| tier.contains(weight))
            .map(|(name, _)| name.as_str())
    }
}
