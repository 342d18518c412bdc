//! # Entities Module
//!
//! Brick definitions: the closed kind enum with its capability table, and
//! the kind-specific state each brick carries.
//!
//! A brick is any grid-aligned placed entity. The hero, monsters, chests and
//! trapdoors carry mutable state and own scheduled-task handles; walls,
//! floors and equipment pickups are inert.

use crate::{new_brick_id, Balance, BrickId, Direction, MonsterTier, Position, TaskId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed set of brick kinds.
///
/// The capability methods below centralize what used to be scattered
/// type-check chains: what blocks movement and what can be picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrickKind {
    Wall,
    Floor,
    Hero,
    Monster,
    Chest,
    Door,
    ArmorPiece,
    SwordPiece,
}

impl BrickKind {
    /// Kinds that occupy a cell exclusively for movement purposes.
    pub const BLOCKING: [BrickKind; 5] = [
        BrickKind::Wall,
        BrickKind::Monster,
        BrickKind::Hero,
        BrickKind::Chest,
        BrickKind::Door,
    ];

    /// Whether this kind blocks movement into its cell.
    pub fn blocks(self) -> bool {
        Self::BLOCKING.contains(&self)
    }

    /// Whether this kind is walked over and collected.
    pub fn is_pickup(self) -> bool {
        matches!(self, BrickKind::ArmorPiece | BrickKind::SwordPiece)
    }
}

/// Sprite keys for armor pickups; one is chosen at spawn.
pub const ARMOR_SPRITES: [&str; 10] = [
    "armor_left",
    "armor_right",
    "helmet_left",
    "helmet_right",
    "legarmor_left",
    "legarmor_right",
    "boot_right",
    "boot_left",
    "shield_left",
    "shield_right",
];

/// Sprite keys for sword pickups; one is chosen at spawn.
pub const SWORD_SPRITES: [&str; 3] = [
    "sword_piece_one",
    "sword_piece_two",
    "sword_piece_three",
];

/// Hero attributes and progression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroState {
    pub health: i32,
    pub max_health: i32,
    pub potions: i32,
    /// Monotonic; level-ups never consume it
    pub xp: i32,
    pub level: i32,
    pub armor: i32,
    pub sword: i32,
    pub facing: Direction,
    pub alive: bool,
    #[serde(skip)]
    pub step_task: Option<TaskId>,
}

impl HeroState {
    /// Creates a fresh level-1 hero facing right.
    pub fn new(balance: &Balance) -> Self {
        Self {
            health: balance.base_health,
            max_health: balance.base_health,
            potions: 0,
            xp: 0,
            level: 1,
            armor: 0,
            sword: 0,
            facing: Direction::Right,
            alive: true,
            step_task: None,
        }
    }

    /// Attack stat before the sword bonus.
    pub fn attack(&self, balance: &Balance) -> i32 {
        balance.base_attack + self.level / balance.levels_per_stat_point
    }

    /// Defense stat before the armor bonus.
    pub fn defense(&self, balance: &Balance) -> i32 {
        balance.base_defense + self.level / balance.levels_per_stat_point
    }

    /// Experience required to leave the current level.
    pub fn xp_threshold(&self, balance: &Balance) -> i32 {
        self.level * self.level * balance.xp_threshold_factor
    }

    /// Experience still missing for the next level-up.
    pub fn xp_to_next(&self, balance: &Balance) -> i32 {
        (self.xp_threshold(balance) - self.xp).max(0)
    }

    /// Applies at most one level-up.
    ///
    /// On success the level rises by one, max health grows by the new level,
    /// and health refills. Returns whether a level-up happened; calling again
    /// without fresh xp is a no-op because the threshold has grown.
    pub fn try_level_up(&mut self, balance: &Balance) -> bool {
        if self.xp < self.xp_threshold(balance) {
            return false;
        }
        self.level += 1;
        self.max_health += self.level;
        self.health = self.max_health;
        true
    }

    /// Drinks one potion if it would matter.
    ///
    /// Restores a third of max health (rounded), clamped to max. Returns
    /// whether a potion was consumed.
    pub fn drink_potion(&mut self) -> bool {
        if self.potions <= 0 || self.health >= self.max_health {
            return false;
        }
        let amount = ((self.max_health as f64) / 3.0).round() as i32;
        self.health = (self.health + amount).min(self.max_health);
        self.potions -= 1;
        true
    }

    /// Clamps health into `0..=max_health`.
    pub fn clamp_health(&mut self) {
        self.health = self.health.clamp(0, self.max_health);
    }
}

/// Monster attributes, drawn from a tier at spawn time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterState {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    /// Experience awarded to the hero on kill
    pub xp_reward: i32,
    pub in_fight: bool,
    /// Step period in simulated ms, jittered at spawn
    pub period: u64,
    #[serde(skip)]
    pub move_task: Option<TaskId>,
    #[serde(skip)]
    pub end_fight_task: Option<TaskId>,
}

impl MonsterState {
    /// Rolls stats from a tier.
    pub fn from_tier<R: Rng>(tier: MonsterTier, period: u64, rng: &mut R) -> Self {
        Self {
            hp: rng.gen_range(tier.hp.0..=tier.hp.1),
            attack: rng.gen_range(tier.attack.0..=tier.attack.1),
            defense: rng.gen_range(tier.defense.0..=tier.defense.1),
            xp_reward: rng.gen_range(tier.xp.0..=tier.xp.1),
            in_fight: false,
            period,
            move_task: None,
            end_fight_task: None,
        }
    }
}

/// One-way open state shared by chests and trapdoors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenState {
    Closed,
    Open,
}

/// Chest/trapdoor state: the open flag plus the pending resolve handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    pub state: OpenState,
    #[serde(skip)]
    pub resolve_task: Option<TaskId>,
}

impl ContainerState {
    pub fn closed() -> Self {
        Self {
            state: OpenState::Closed,
            resolve_task: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == OpenState::Open
    }
}

/// Pickup payload: the sprite variant chosen at spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupState {
    pub sprite: String,
}

/// Kind-specific brick payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrickState {
    /// Walls and floors carry no state
    Terrain,
    Hero(HeroState),
    Monster(MonsterState),
    Chest(ContainerState),
    Door(ContainerState),
    Pickup(PickupState),
}

/// A grid-aligned placed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    pub kind: BrickKind,
    pub position: Position,
    pub state: BrickState,
}

impl Brick {
    /// Creates a brick with a fresh id.
    pub fn new(kind: BrickKind, position: Position, state: BrickState) -> Self {
        Self {
            id: new_brick_id(),
            kind,
            position,
            state,
        }
    }

    /// Sprite key the renderer should draw for the brick's current state.
    pub fn sprite(&self) -> &str {
        match (&self.kind, &self.state) {
            (BrickKind::Wall, _) => "wall",
            (BrickKind::Floor, _) => "ground",
            (BrickKind::Hero, BrickState::Hero(hero)) => {
                if hero.alive {
                    hero.facing.hero_sprite()
                } else {
                    "rip"
                }
            }
            (BrickKind::Monster, BrickState::Monster(monster)) => {
                if monster.in_fight {
                    "blood"
                } else {
                    "troll"
                }
            }
            (BrickKind::Chest, BrickState::Chest(container)) => {
                if container.is_open() {
                    "chest_open"
                } else {
                    "chest_close"
                }
            }
            (BrickKind::Door, BrickState::Door(container)) => {
                if container.is_open() {
                    "trapdoor_open"
                } else {
                    "trapdoor_close"
                }
            }
            (_, BrickState::Pickup(pickup)) => &pickup.sprite,
            // Kind/state mismatch is a construction bug; render nothing
            // recognisable rather than panic.
            _ => "unknown",
        }
    }

    /// Every scheduled-task handle this brick currently owns.
    ///
    /// Deletion cancels all of these before the brick leaves the registry.
    pub fn task_handles(&self) -> Vec<TaskId> {
        match &self.state {
            BrickState::Terrain | BrickState::Pickup(_) => Vec::new(),
            BrickState::Hero(hero) => hero.step_task.into_iter().collect(),
            BrickState::Monster(monster) => monster
                .move_task
                .into_iter()
                .chain(monster.end_fight_task)
                .collect(),
            BrickState::Chest(container) | BrickState::Door(container) => {
                container.resolve_task.into_iter().collect()
            }
        }
    }

    pub fn hero(&self) -> Option<&HeroState> {
        match &self.state {
            BrickState::Hero(hero) => Some(hero),
            _ => None,
        }
    }

    pub fn hero_mut(&mut self) -> Option<&mut HeroState> {
        match &mut self.state {
            BrickState::Hero(hero) => Some(hero),
            _ => None,
        }
    }

    pub fn monster(&self) -> Option<&MonsterState> {
        match &self.state {
            BrickState::Monster(monster) => Some(monster),
            _ => None,
        }
    }

    pub fn monster_mut(&mut self) -> Option<&mut MonsterState> {
        match &mut self.state {
            BrickState::Monster(monster) => Some(monster),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&ContainerState> {
        match &self.state {
            BrickState::Chest(container) | BrickState::Door(container) => Some(container),
            _ => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut ContainerState> {
        match &mut self.state {
            BrickState::Chest(container) | BrickState::Door(container) => Some(container),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_capability_table() {
        assert!(BrickKind::Wall.blocks());
        assert!(BrickKind::Monster.blocks());
        assert!(BrickKind::Hero.blocks());
        assert!(BrickKind::Chest.blocks());
        assert!(BrickKind::Door.blocks());
        assert!(!BrickKind::Floor.blocks());
        assert!(!BrickKind::ArmorPiece.blocks());
        assert!(!BrickKind::SwordPiece.blocks());
    }

    #[test]
    fn test_pickup_capability_table() {
        assert!(BrickKind::ArmorPiece.is_pickup());
        assert!(BrickKind::SwordPiece.is_pickup());
        assert!(!BrickKind::Chest.is_pickup());
        assert!(!BrickKind::Floor.is_pickup());
    }

    #[test]
    fn test_hero_stat_formulas() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        assert_eq!(hero.attack(&balance), 5);
        assert_eq!(hero.defense(&balance), 5);
        hero.level = 4;
        assert_eq!(hero.attack(&balance), 7);
        assert_eq!(hero.defense(&balance), 7);
    }

    #[test]
    fn test_level_up_boundary() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        hero.health = 3;
        // Exactly at the level-1 threshold of 10.
        hero.xp = 10;
        assert!(hero.try_level_up(&balance));
        assert_eq!(hero.level, 2);
        assert_eq!(hero.max_health, 12);
        assert_eq!(hero.health, 12);
        // No fresh xp: the new threshold is 40, so nothing re-triggers.
        assert!(!hero.try_level_up(&balance));
        assert_eq!(hero.level, 2);
    }

    #[test]
    fn test_potion_semantics() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);

        // No potion held.
        hero.health = 4;
        assert!(!hero.drink_potion());

        // Healing works and clamps.
        hero.potions = 2;
        assert!(hero.drink_potion());
        assert_eq!(hero.health, 7);
        assert_eq!(hero.potions, 1);
        hero.health = hero.max_health - 1;
        assert!(hero.drink_potion());
        assert_eq!(hero.health, hero.max_health);
        assert_eq!(hero.potions, 0);

        // Full health wastes nothing.
        hero.potions = 1;
        assert!(!hero.drink_potion());
        assert_eq!(hero.potions, 1);
    }

    #[test]
    fn test_monster_stats_within_tier() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let balance = Balance::new();
        let tier = balance.tier_for_level(1);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let monster = MonsterState::from_tier(tier, 500, &mut rng);
            assert!(monster.hp >= tier.hp.0 && monster.hp <= tier.hp.1);
            assert!(monster.attack >= tier.attack.0 && monster.attack <= tier.attack.1);
            assert!(monster.defense >= tier.defense.0 && monster.defense <= tier.defense.1);
            assert!(monster.xp_reward >= tier.xp.0 && monster.xp_reward <= tier.xp.1);
            assert!(!monster.in_fight);
        }
    }

    #[test]
    fn test_sprite_selection_follows_state() {
        let balance = Balance::new();
        let mut hero_brick = Brick::new(
            BrickKind::Hero,
            Position::new(1, 1),
            BrickState::Hero(HeroState::new(&balance)),
        );
        assert_eq!(hero_brick.sprite(), "hero_right");
        hero_brick.hero_mut().unwrap().facing = Direction::Up;
        assert_eq!(hero_brick.sprite(), "hero_up");
        hero_brick.hero_mut().unwrap().alive = false;
        assert_eq!(hero_brick.sprite(), "rip");

        let mut chest = Brick::new(
            BrickKind::Chest,
            Position::new(2, 2),
            BrickState::Chest(ContainerState::closed()),
        );
        assert_eq!(chest.sprite(), "chest_close");
        chest.container_mut().unwrap().state = OpenState::Open;
        assert_eq!(chest.sprite(), "chest_open");
    }
}
