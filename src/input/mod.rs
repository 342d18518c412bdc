//! # Input Module
//!
//! Snapshot types the input collaborator feeds into the core.
//!
//! Movement and the action key are polled state: the collaborator reports
//! which keys are currently held, and the hero tick reads the latest
//! snapshot. Only [`Command`] values are edge-triggered.

use crate::Direction;
use serde::{Deserialize, Serialize};

/// Held-key snapshot consumed by the hero tick.
///
/// # Examples
///
/// ```
/// use delve::{Direction, InputSnapshot};
///
/// let input = InputSnapshot {
///     up: true,
///     left: true,
///     ..InputSnapshot::default()
/// };
/// // Up wins over Left when both are held.
/// assert_eq!(input.held_direction(), Some(Direction::Up));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub up: bool,
    pub right: bool,
    pub down: bool,
    pub left: bool,
    /// The interact key (fight, open)
    pub action: bool,
}

impl InputSnapshot {
    /// Movement intent, if any direction key is held.
    ///
    /// Several held keys resolve in the fixed priority Up, Right, Down,
    /// Left.
    pub fn held_direction(&self) -> Option<Direction> {
        if self.up {
            Some(Direction::Up)
        } else if self.right {
            Some(Direction::Right)
        } else if self.down {
            Some(Direction::Down)
        } else if self.left {
            Some(Direction::Left)
        } else {
            None
        }
    }

    /// Whether the snapshot carries any intent at all.
    pub fn is_idle(&self) -> bool {
        self.held_direction().is_none() && !self.action
    }
}

/// Edge-triggered commands outside the per-tick snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// (Re)start a run
    Restart,
    /// Drink one healing potion
    UsePotion,
}
