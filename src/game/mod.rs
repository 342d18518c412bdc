//! # Game Module
//!
//! Core simulation state, entity definitions, and the systems that act on
//! them.
//!
//! This module contains the fundamental building blocks of the Delve
//! simulation:
//! - Grid coordinates and facing directions
//! - Brick (entity) definitions and their kind capability table
//! - The game state registry with its occupancy index
//! - The combat resolver and the cooperative task scheduler

pub mod combat;
pub mod entities;
pub mod scheduler;
pub mod state;
pub mod tuning;

pub use combat::*;
pub use entities::*;
pub use scheduler::*;
pub use state::*;
pub use tuning::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cell coordinate on the dungeon grid.
///
/// Coordinates are 0-indexed with `(0, 0)` at the top-left corner; `col`
/// grows rightward and `row` grows downward. Simulation space is integer
/// only; fractional positions are a rendering concern.
///
/// # Examples
///
/// ```
/// use delve::{Direction, Position};
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.step(Direction::Up), Position::new(10, 4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub col: i32,
    pub row: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Returns the cell one step away in the given direction.
    pub fn step(self, direction: Direction) -> Position {
        let (dcol, drow) = direction.delta();
        Position::new(self.col + dcol, self.row + drow)
    }

    /// Straight-line distance to another cell.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Position;
    ///
    /// let a = Position::new(0, 0);
    /// let b = Position::new(3, 4);
    /// assert_eq!(a.distance(b), 5.0);
    /// ```
    pub fn distance(self, other: Position) -> f64 {
        let dcol = (self.col - other.col) as f64;
        let drow = (self.row - other.row) as f64;
        dcol.hypot(drow)
    }

    /// The 4 cardinally adjacent cells.
    pub fn cardinal_neighbours(self) -> [Position; 4] {
        [
            Position::new(self.col - 1, self.row),
            Position::new(self.col + 1, self.row),
            Position::new(self.col, self.row - 1),
            Position::new(self.col, self.row + 1),
        ]
    }
}

/// Facing directions for movement and orientation.
///
/// The enumeration order doubles as the tie-break order wherever several
/// directions score equally (monster chase steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in tie-break order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Converts a direction to a cell delta.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// Sprite key the renderer uses for a hero facing this way.
    pub fn hero_sprite(self) -> &'static str {
        match self {
            Direction::Up => "hero_up",
            Direction::Right => "hero_right",
            Direction::Down => "hero_down",
            Direction::Left => "hero_left",
        }
    }
}

/// Unique identifier for bricks.
pub type BrickId = Uuid;

/// Creates a new unique brick ID.
pub fn new_brick_id() -> BrickId {
    Uuid::new_v4()
}
