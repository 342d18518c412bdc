//! # Delve
//!
//! A single-player, top-down, tile-based dungeon crawler simulation core.
//!
//! ## Architecture Overview
//!
//! Delve is the simulation half of a dungeon crawler. It owns the rules and
//! the state; drawing, input devices, and audio live in external collaborators
//! that talk to the core through small snapshot types. The core is organised
//! around a few key concepts:
//!
//! - **Game State**: a registry object owning every live brick, the grid
//!   occupancy index, the dirty set consumed by the renderer, and the task
//!   queue driving the simulation clock
//! - **Bricks**: grid-aligned entities (walls, floors, the hero, monsters,
//!   chests, trapdoors, equipment pickups) described by a closed kind enum
//! - **Generation System**: randomized flood-growth maze generation producing
//!   fully connected levels from a seed
//! - **Combat System**: round-based damage exchange with level and equipment
//!   progression, driven through an injectable roll source
//! - **Scheduler**: a single-threaded cooperative task queue over a logical
//!   millisecond clock; every periodic or delayed callback an entity owns is
//!   cancelled synchronously when the entity is deleted
//!
//! The renderer consumes placements via `GameState::take_dirty`, the input
//! collaborator feeds held-key snapshots via `GameState::set_input`, and the
//! HUD reads `HudSnapshot`. Nothing is persisted; a run resets on restart.

pub mod game;
pub mod generation;
pub mod hud;
pub mod input;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use hud::*;
pub use input::*;

/// Core error type for the Delve simulation.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Dungeon generation requested with dimensions too small to hold a
    /// border plus an interior
    #[error("Invalid dungeon dimensions: {columns}x{rows}")]
    InvalidDimensions { columns: u32, rows: u32 },

    /// Auto-placement could not find a free interior cell within the attempt
    /// budget. Fatal to that spawn only.
    #[error("No free cell found to place a {kind:?}")]
    PlacementExhausted { kind: game::BrickKind },

    /// An operation referenced a brick that is no longer live
    #[error("Stale brick reference: {0}")]
    StaleBrick(game::BrickId),

    /// Game state is internally inconsistent
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Generation produced an invalid level
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Default dungeon width in cells
    pub const DEFAULT_COLUMNS: u32 = 32;

    /// Default dungeon height in cells
    pub const DEFAULT_ROWS: u32 = 18;

    /// Auto-placement samples per interior cell before giving up
    pub const PLACEMENT_ATTEMPTS_PER_CELL: u32 = 10;
}
