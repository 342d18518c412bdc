//! # HUD Module
//!
//! Read-only hero stats for the display collaborator.

use crate::{Balance, HeroState};
use serde::{Deserialize, Serialize};

/// Snapshot of everything the HUD shows about the hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub level: i32,
    pub xp: i32,
    pub xp_to_next: i32,
    pub health: i32,
    pub max_health: i32,
    pub potions: i32,
    pub sword: i32,
    pub max_sword: i32,
    pub armor: i32,
    pub max_armor: i32,
}

impl HudSnapshot {
    /// Captures the hero's current stats.
    pub fn from_hero(hero: &HeroState, balance: &Balance) -> Self {
        Self {
            level: hero.level,
            xp: hero.xp,
            xp_to_next: hero.xp_to_next(balance),
            health: hero.health,
            max_health: hero.max_health,
            potions: hero.potions,
            sword: hero.sword,
            max_sword: balance.max_sword,
            armor: hero.armor,
            max_armor: balance.max_armor,
        }
    }

    /// The HUD label lines in display order.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("LEVEL: {}", self.level),
            format!("XP: {} / {}", self.xp, self.xp_to_next),
            format!("HP: {} / {}", self.health, self.max_health),
            format!("POTIONS: {}", self.potions),
            format!("SWORD PIECES: {} / {}", self.sword, self.max_sword),
            format!("ARMOR PIECES: {} / {}", self.armor, self.max_armor),
        ]
    }
}
