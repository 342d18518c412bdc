//! # Generation Module
//!
//! Procedural level generation for the dungeon crawler.
//!
//! This module provides the configuration surface and the generator seam the
//! level orchestrator works against. The concrete maze algorithm lives in
//! [`dungeon`]; it produces a fully connected grid of floor and wall cells
//! from a seed and a start cell.

pub mod dungeon;

pub use dungeon::*;

use crate::{DelveError, DelveResult, Position};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Configuration for level generation and population.
///
/// Controls the grid dimensions and how many monsters, chests and trapdoors
/// a fresh level receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Grid width in cells
    pub columns: u32,
    /// Grid height in cells
    pub rows: u32,
    /// Monsters per level, inclusive range
    pub min_monsters: u32,
    pub max_monsters: u32,
    /// Chests per level, inclusive range
    pub min_chests: u32,
    pub max_chests: u32,
    /// Trapdoors per level
    pub doors: u32,
}

impl GenerationConfig {
    /// Creates the default generation configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(12345);
    /// assert_eq!(config.seed, 12345);
    /// assert!(config.columns >= 3 && config.rows >= 3);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            columns: crate::config::DEFAULT_COLUMNS,
            rows: crate::config::DEFAULT_ROWS,
            min_monsters: 3,
            max_monsters: 9,
            min_chests: 1,
            max_chests: 3,
            doors: 1,
        }
    }

    /// Creates a configuration for testing: a small grid with nothing in it,
    /// so tests place exactly the bricks they need.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            columns: 9,
            rows: 9,
            min_monsters: 0,
            max_monsters: 0,
            min_chests: 0,
            max_chests: 0,
            doors: 0,
        }
    }

    /// Rejects dimensions too small to hold a border plus an interior.
    pub fn validate(&self) -> DelveResult<()> {
        if self.columns < 3 || self.rows < 3 {
            return Err(DelveError::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            });
        }
        Ok(())
    }

    /// Whether a cell lies strictly inside the outer border.
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.col >= 1
            && pos.row >= 1
            && pos.col <= self.columns as i32 - 2
            && pos.row <= self.rows as i32 - 2
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Trait for procedural generators.
///
/// Keeps generation behind a seam so the orchestrator and the tests work
/// against the same interface.
pub trait Generator<T> {
    /// Generates content from the configuration, a start cell, and a seeded
    /// random number generator.
    fn generate(&self, config: &GenerationConfig, start: Position, rng: &mut StdRng)
        -> DelveResult<T>;

    /// Validates that generated content meets its guarantees.
    fn validate(&self, content: &T, start: Position) -> DelveResult<()>;

    /// Generator type name for logging and diagnostics.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation.
pub mod utils {
    use super::*;
    use rand::SeedableRng;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert!(config.min_monsters <= config.max_monsters);
        assert!(config.min_chests <= config.max_chests);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dimension_validation() {
        let mut config = GenerationConfig::new(1);
        config.columns = 2;
        assert!(matches!(
            config.validate(),
            Err(DelveError::InvalidDimensions { columns: 2, .. })
        ));
        config.columns = 3;
        config.rows = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interior_check() {
        let config = GenerationConfig::for_testing(1);
        // 9x9 grid: interior is 1..=7 on both axes.
        assert!(config.is_interior(Position::new(1, 1)));
        assert!(config.is_interior(Position::new(7, 7)));
        assert!(!config.is_interior(Position::new(0, 4)));
        assert!(!config.is_interior(Position::new(8, 4)));
        assert!(!config.is_interior(Position::new(4, 0)));
        assert!(!config.is_interior(Position::new(4, 8)));
    }

    #[test]
    fn test_rng_is_reproducible() {
        use rand::Rng;

        let config = GenerationConfig::new(777);
        let mut a = utils::create_rng(&config);
        let mut b = utils::create_rng(&config);
        let draws_a: Vec<u32> = (0..8).map(|_| a.gen()).collect();
        let draws_b: Vec<u32> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(draws_a, draws_b);
    }
}
