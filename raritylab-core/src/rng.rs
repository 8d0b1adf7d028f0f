//! Deterministic seed hierarchy.
//!
//! A master seed expands into sub-seeds for each `(scope, key, iteration)`
//! tuple. Sub-seeds are BLAKE3-derived, so a category's simulation stream is
//! identical no matter which worker thread picks it up or in what order.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Master seed plus hash-based sub-seed derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a sub-seed for `(scope, key, iteration)`.
    ///
    /// Scope and key are length-prefixed before hashing so that
    /// `("ab", "c")` and `("a", "bc")` never collide.
    pub fn sub_seed(&self, scope: &str, key: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&(scope.len() as u64).to_le_bytes());
        hasher.update(scope.as_bytes());
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Seeded `StdRng` for `(scope, key, iteration)`.
    pub fn rng_for(&self, scope: &str, key: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(scope, key, iteration))
    }
}
