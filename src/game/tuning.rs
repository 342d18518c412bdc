//! # Tuning Module
//!
//! Balance and timing knobs for the simulation.
//!
//! Every number a designer might want to iterate on lives here rather than
//! being scattered through the resolvers: stat formulas, equipment caps, the
//! monster tier table, and the scheduling periods. Defaults reproduce the
//! shipped game feel.

use serde::{Deserialize, Serialize};

/// Inclusive stat ranges for monsters spawned while the hero is inside one
/// level decade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterTier {
    /// Hit point range
    pub hp: (i32, i32),
    /// Attack stat range
    pub attack: (i32, i32),
    /// Defense stat range
    pub defense: (i32, i32),
    /// Experience awarded on kill
    pub xp: (i32, i32),
}

/// Combat and progression tuning.
///
/// # Examples
///
/// ```
/// use delve::Balance;
///
/// let balance = Balance::new();
/// assert_eq!(balance.max_armor, 10);
/// assert_eq!(balance.tier_for_level(7).hp, (2, 10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Hero starting (and minimum) max health
    pub base_health: i32,
    /// Hero attack before the level bonus
    pub base_attack: i32,
    /// Hero defense before the level bonus
    pub base_defense: i32,
    /// Levels per +1 attack/defense (integer division)
    pub levels_per_stat_point: i32,
    /// Armor piece cap
    pub max_armor: i32,
    /// Sword piece cap
    pub max_sword: i32,
    /// Level-up threshold is `level² × xp_threshold_factor`
    pub xp_threshold_factor: i32,
    /// Cells within which a monster chases instead of wandering
    pub vision_radius: f64,
    /// Round cap turning a zero-damage fight into a standoff instead of a
    /// hang
    pub max_fight_rounds: u32,
    /// Monster stat ranges per hero-level decade; the last entry covers all
    /// higher levels
    pub tiers: Vec<MonsterTier>,
}

impl Balance {
    /// Creates the default balance table.
    pub fn new() -> Self {
        Self {
            base_health: 10,
            base_attack: 5,
            base_defense: 5,
            levels_per_stat_point: 2,
            max_armor: 10,
            max_sword: 10,
            xp_threshold_factor: 10,
            vision_radius: 5.0,
            max_fight_rounds: 1000,
            tiers: vec![
                MonsterTier {
                    hp: (2, 10),
                    attack: (2, 5),
                    defense: (2, 5),
                    xp: (2, 6),
                },
                MonsterTier {
                    hp: (8, 15),
                    attack: (5, 10),
                    defense: (5, 10),
                    xp: (6, 10),
                },
                MonsterTier {
                    hp: (14, 20),
                    attack: (8, 15),
                    defense: (8, 15),
                    xp: (10, 14),
                },
                MonsterTier {
                    hp: (20, 25),
                    attack: (11, 20),
                    defense: (11, 20),
                    xp: (14, 18),
                },
                MonsterTier {
                    hp: (26, 30),
                    attack: (14, 25),
                    defense: (14, 25),
                    xp: (18, 22),
                },
            ],
        }
    }

    /// Looks up the monster tier for a hero level.
    ///
    /// The lookup is total: decade boundaries belong to the tier they start,
    /// and levels past the table use the last tier.
    pub fn tier_for_level(&self, level: i32) -> MonsterTier {
        let index = (level.max(0) / 10) as usize;
        self.tiers[index.min(self.tiers.len() - 1)]
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduling periods and delays in simulated milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Hero intent poll period
    pub hero_step: u64,
    /// Base monster step period
    pub monster_step: u64,
    /// Random shortening applied to each monster's period at spawn, so
    /// monster ticks desynchronize
    pub monster_jitter: u64,
    /// Delay between opening a chest/trapdoor and its resolution
    pub resolve_delay: u64,
    /// How long a beaten monster lingers before its cleanup fires
    pub fight_linger: u64,
}

impl Timing {
    /// Creates the default timing table.
    pub fn new() -> Self {
        Self {
            hero_step: 10,
            monster_step: 500,
            monster_jitter: 100,
            resolve_delay: 900,
            fight_linger: 500,
        }
    }

    /// Timing for tests: short delays, no jitter, fully deterministic.
    pub fn for_testing() -> Self {
        Self {
            hero_step: 10,
            monster_step: 100,
            monster_jitter: 0,
            resolve_delay: 50,
            fight_linger: 20,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}
