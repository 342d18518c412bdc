//! # Combat Module
//!
//! Round-based damage exchange between the hero and one monster.
//!
//! Each round the monster swings first: its roll in `[0, attack)` is reduced
//! by the hero's defense plus armor, floored at zero. A downed hero never
//! counter-attacks. The hero's roll in `[0, attack + sword)` is reduced by the
//! monster's defense the same way. Rolls come through the [`AttackRoll`] seam
//! so tests can feed hand-picked sequences.
//!
//! High defense legitimately zeroes most rounds; the exchange only diverges
//! when neither side can ever deal damage, which the round cap in
//! [`Balance`](crate::Balance) turns into a standoff.

use crate::{Balance, HeroState, MonsterState};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Uniform integer roll source, `[0, bound)`.
///
/// A non-positive bound always rolls zero.
pub trait AttackRoll {
    fn roll(&mut self, bound: i32) -> i32;
}

impl AttackRoll for StdRng {
    fn roll(&mut self, bound: i32) -> i32 {
        if bound <= 0 {
            0
        } else {
            self.gen_range(0..bound)
        }
    }
}

/// How a fight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FightOutcome {
    /// The monster dropped; its xp reward was added to the hero
    MonsterSlain { rounds: u32 },
    /// The hero dropped
    HeroDown { rounds: u32 },
    /// Neither side could finish the fight within the round cap
    Standoff { rounds: u32 },
}

/// Runs the full exchange until one side drops or the round cap is hit.
///
/// Mutates both combatants in place: health/hp fall monotonically and the
/// monster's xp reward lands on the hero exactly when the killing blow is
/// dealt. Progression (level-up, death handling) is the caller's job.
pub fn resolve_fight(
    hero: &mut HeroState,
    monster: &mut MonsterState,
    balance: &Balance,
    rolls: &mut dyn AttackRoll,
) -> FightOutcome {
    let mut rounds = 0;
    while monster.hp > 0 && hero.health > 0 {
        if rounds >= balance.max_fight_rounds {
            return FightOutcome::Standoff { rounds };
        }
        rounds += 1;

        let damage = (rolls.roll(monster.attack) - (hero.defense(balance) + hero.armor)).max(0);
        hero.health -= damage;
        if hero.health <= 0 {
            break;
        }

        let damage = (rolls.roll(hero.attack(balance) + hero.sword) - monster.defense).max(0);
        monster.hp -= damage;
        if monster.hp < 1 {
            hero.xp += monster.xp_reward;
        }
    }

    if hero.health <= 0 {
        hero.health = 0;
        FightOutcome::HeroDown { rounds }
    } else {
        FightOutcome::MonsterSlain { rounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MonsterTier;

    /// Deterministic roll source for hand-computed scenarios. Cycles when
    /// exhausted.
    struct FixedRolls {
        values: Vec<i32>,
        next: usize,
    }

    impl FixedRolls {
        fn new(values: Vec<i32>) -> Self {
            Self { values, next: 0 }
        }
    }

    impl AttackRoll for FixedRolls {
        fn roll(&mut self, bound: i32) -> i32 {
            let value = self.values[self.next % self.values.len()];
            self.next += 1;
            value.min((bound - 1).max(0))
        }
    }

    fn test_monster(hp: i32, attack: i32, defense: i32, xp: i32) -> MonsterState {
        MonsterState {
            hp,
            attack,
            defense,
            xp_reward: xp,
            in_fight: false,
            period: 500,
            move_task: None,
            end_fight_task: None,
        }
    }

    #[test]
    fn test_hand_computed_exchange() {
        // Level-1 hero: attack 5, defense 5. Monster: hp 5, attack 3,
        // defense 3. Rolls alternate monster, hero.
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        let mut monster = test_monster(5, 3, 3, 4);

        // Monster rolls are capped below its attack of 3, so damage is
        // max(0, roll - 5) = 0 every round. Hero rolls 4 each round for
        // max(0, 4 - 3) = 1 damage: exactly 5 rounds to drop hp 5.
        let mut rolls = FixedRolls::new(vec![2, 4]);
        let outcome = resolve_fight(&mut hero, &mut monster, &balance, &mut rolls);

        assert_eq!(outcome, FightOutcome::MonsterSlain { rounds: 5 });
        assert_eq!(hero.health, 10);
        assert_eq!(monster.hp, 0);
        assert_eq!(hero.xp, 4);
    }

    #[test]
    fn test_hero_down_skips_counter_attack() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        hero.health = 3;
        // Strong monster: roll 9 against defense 5 deals 4, dropping the
        // 3-health hero in round one before any counter-attack.
        let mut monster = test_monster(5, 10, 3, 4);
        let mut rolls = FixedRolls::new(vec![9, 4]);

        let outcome = resolve_fight(&mut hero, &mut monster, &balance, &mut rolls);
        assert_eq!(outcome, FightOutcome::HeroDown { rounds: 1 });
        assert_eq!(hero.health, 0);
        // The monster never took the hero's queued hit.
        assert_eq!(monster.hp, 5);
        assert_eq!(hero.xp, 0);
    }

    #[test]
    fn test_health_monotonic_during_fight() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        let mut monster = test_monster(20, 12, 2, 6);
        let mut rng = <StdRng as rand::SeedableRng>::seed_from_u64(99);

        let start_health = hero.health;
        let start_hp = monster.hp;
        let _ = resolve_fight(&mut hero, &mut monster, &balance, &mut rng);
        assert!(hero.health <= start_health);
        assert!(monster.hp <= start_hp);
        assert!(hero.health == 0 || monster.hp <= 0);
    }

    #[test]
    fn test_zero_attack_standoff_hits_round_cap() {
        let mut balance = Balance::new();
        balance.max_fight_rounds = 25;
        let mut hero = HeroState::new(&balance);
        // Neither side can ever deal damage: monster attack 0, and a hero
        // roll below the monster's towering defense.
        let mut monster = test_monster(5, 0, 100, 4);
        let mut rolls = FixedRolls::new(vec![0]);

        let outcome = resolve_fight(&mut hero, &mut monster, &balance, &mut rolls);
        assert_eq!(outcome, FightOutcome::Standoff { rounds: 25 });
        assert_eq!(hero.health, 10);
        assert_eq!(monster.hp, 5);
    }

    #[test]
    fn test_armor_and_sword_enter_the_formula() {
        let balance = Balance::new();
        let mut hero = HeroState::new(&balance);
        hero.armor = 2;
        hero.sword = 3;
        let mut monster = test_monster(1, 8, 3, 2);

        // Monster rolls 6: 6 - (5 + 2 armor) = 0, no damage.
        // Hero rolls 7 of a possible [0, 5 + 3): 7 - 3 = 4, overkill.
        let mut rolls = FixedRolls::new(vec![6, 7]);
        let outcome = resolve_fight(&mut hero, &mut monster, &balance, &mut rolls);
        assert_eq!(outcome, FightOutcome::MonsterSlain { rounds: 1 });
        assert_eq!(hero.health, 10);
        assert!(monster.hp < 1);
    }

    #[test]
    fn test_fights_terminate_when_hero_can_outroll_defense() {
        // With a full sword stack the hero's roll bound exceeds every tier's
        // defense cap, so the exchange always ends.
        let balance = Balance::new();
        let mut rng = <StdRng as rand::SeedableRng>::seed_from_u64(1234);
        for level in [1, 5, 15, 35, 60] {
            let tier: MonsterTier = balance.tier_for_level(level);
            let mut hero = HeroState::new(&balance);
            hero.level = level;
            hero.sword = balance.max_sword;
            hero.health = 1000;
            hero.max_health = 1000;
            let mut monster = MonsterState::from_tier(tier, 500, &mut rng);
            let outcome = resolve_fight(&mut hero, &mut monster, &balance, &mut rng);
            assert!(!matches!(outcome, FightOutcome::Standoff { .. }));
        }
    }
}
