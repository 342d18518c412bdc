//! Integration tests driving the simulation through its public surface:
//! occupancy consistency, chest/trapdoor timing, fight lifecycle, and level
//! regeneration.

use delve::{
    Balance, BrickKind, Command, Direction, GameState, GameStatus, GenerationConfig,
    InputSnapshot, OpenState, Position, Timing,
};

fn started_game(seed: u64) -> GameState {
    let mut game = GameState::with_tuning(
        GenerationConfig::for_testing(seed),
        Balance::new(),
        Timing::for_testing(),
    );
    game.handle_command(Command::Restart).expect("restart");
    game
}

/// A free cell adjacent to the hero plus the direction that reaches it.
fn free_cell_next_to_hero(game: &GameState) -> (Direction, Position) {
    let hero_pos = game.hero().expect("hero").position;
    for direction in Direction::ALL {
        let pos = hero_pos.step(direction);
        if game.blocking_at(pos).is_none() {
            return (direction, pos);
        }
    }
    panic!("hero is walled in for this seed");
}

fn input_toward(direction: Direction, action: bool) -> InputSnapshot {
    InputSnapshot {
        up: direction == Direction::Up,
        right: direction == Direction::Right,
        down: direction == Direction::Down,
        left: direction == Direction::Left,
        action,
    }
}

#[test]
fn test_occupancy_stays_consistent_through_play() {
    let mut config = GenerationConfig::for_testing(404);
    config.columns = 16;
    config.rows = 12;
    config.min_monsters = 3;
    config.max_monsters = 3;
    config.min_chests = 1;
    config.max_chests = 1;
    config.doors = 1;
    let mut game = GameState::with_tuning(config, Balance::new(), Timing::for_testing());
    game.handle_command(Command::Restart).expect("restart");
    game.check_consistency().expect("consistent after restart");

    // Drive the run with shifting held keys; every slice must leave the
    // index and the live set agreeing.
    let directions = Direction::ALL;
    for slice in 1..=100u64 {
        let direction = directions[(slice / 7) as usize % 4];
        game.set_input(input_toward(direction, slice % 3 == 0));
        game.advance(slice * 100).expect("advance");
        game.check_consistency().expect("consistent during play");
        let _ = game.take_dirty();
    }

    if game.status() == GameStatus::GameOver {
        assert_eq!(game.status_line(), "Game Over");
        let hero = game.hero().expect("dead hero stays placed");
        assert!(!hero.hero().expect("hero state").alive);
    }
}

#[test]
fn test_chest_opens_then_resolves_after_fixed_delay() {
    let mut game = started_game(555);
    let (direction, target) = free_cell_next_to_hero(&game);
    let chest = game.spawn_chest(Some(target)).expect("chest");

    // One hero tick with the action key held opens the chest.
    game.set_input(input_toward(direction, true));
    let step = game.timing().hero_step;
    let delay = game.timing().resolve_delay;
    game.advance(step).expect("advance");
    game.set_input(InputSnapshot::default());

    let container = game
        .brick(chest)
        .expect("chest still live")
        .container()
        .expect("container state");
    assert_eq!(container.state, OpenState::Open);

    // Not resolved a single ms early.
    game.advance(step + delay - 1).expect("advance");
    assert!(game.brick(chest).is_some());
    assert!(game.bricks_of_kind(BrickKind::ArmorPiece).is_empty());
    assert!(game.bricks_of_kind(BrickKind::SwordPiece).is_empty());

    // At exactly open-time + delay the chest resolves into one loot piece
    // on its own cell.
    game.advance(step + delay).expect("advance");
    assert!(game.brick(chest).is_none());
    let mut loot = game.bricks_of_kind(BrickKind::ArmorPiece);
    loot.extend(game.bricks_of_kind(BrickKind::SwordPiece));
    assert_eq!(loot.len(), 1);
    let piece = game.brick(loot[0]).expect("loot brick");
    assert_eq!(piece.position, target);
    assert!(!piece.kind.blocks());
    game.check_consistency().expect("consistent");
}

#[test]
fn test_deleting_monster_mid_fight_cancels_its_callbacks() {
    let mut game = started_game(777);
    let (direction, target) = free_cell_next_to_hero(&game);
    let monster = game.spawn_monster(Some(target)).expect("monster");

    // Start the fight with one action tick.
    game.set_input(input_toward(direction, true));
    game.advance(game.timing().hero_step).expect("advance");
    game.set_input(InputSnapshot::default());

    // Delete the monster while its fight-end callback is still pending. If
    // cancellation were broken, the callback would later fire against a
    // missing brick and advance would report a stale reference.
    game.delete_brick(monster).expect("delete");
    assert!(game.brick(monster).is_none());

    game.advance(10_000).expect("no stale callbacks fire");
    game.check_consistency().expect("consistent");
    assert!(game.bricks_of_kind(BrickKind::Monster).is_empty());
}

#[test]
fn test_fight_lifecycle_cleans_up_the_loser() {
    let mut game = started_game(4321);
    let (direction, target) = free_cell_next_to_hero(&game);
    let monster = game.spawn_monster(Some(target)).expect("monster");

    game.set_input(input_toward(direction, true));
    let step = game.timing().hero_step;
    game.advance(step).expect("advance");
    game.set_input(InputSnapshot::default());

    // The whole exchange resolved inside the action tick; the monster
    // lingers (bloodied) until its cleanup fires.
    let in_fight = game
        .brick(monster)
        .expect("monster lingers")
        .monster()
        .expect("monster state")
        .in_fight;
    assert!(in_fight);

    game.advance(step + game.timing().fight_linger).expect("advance");
    match game.brick(monster) {
        // Beaten monster: cleaned up, and the hero banked its xp.
        None => {
            let hud = game.hud().expect("hud");
            assert!(hud.xp > 0 || hud.level > 1);
        }
        // Survivor (hero fell, or a standoff): calmed down and kept alive.
        Some(brick) => {
            assert!(!brick.monster().expect("monster state").in_fight);
        }
    }
    game.check_consistency().expect("consistent");
}

#[test]
fn test_trapdoor_regenerates_level_and_keeps_hero() {
    let mut game = started_game(31415);
    let hero_id = game.hero().expect("hero").id;
    let (direction, target) = free_cell_next_to_hero(&game);
    let door = game.spawn_door(Some(target)).expect("door");
    assert_eq!(game.depth(), 0);

    game.set_input(input_toward(direction, true));
    let step = game.timing().hero_step;
    let delay = game.timing().resolve_delay;
    game.advance(step).expect("advance");
    game.set_input(InputSnapshot::default());

    let container = game
        .brick(door)
        .expect("door still live")
        .container()
        .expect("container state");
    assert_eq!(container.state, OpenState::Open);

    // Resolution tears the level down and grows a fresh one around the
    // hero.
    game.advance(step + delay).expect("advance");
    assert!(game.brick(door).is_none());
    assert_eq!(game.depth(), 1);
    assert_eq!(game.status(), GameStatus::Playing);

    let hero = game.hero().expect("hero survives the descent");
    assert_eq!(hero.id, hero_id);

    let config = game.generation_config();
    let terrain = game.bricks_of_kind(BrickKind::Wall).len()
        + game.bricks_of_kind(BrickKind::Floor).len();
    assert_eq!(terrain, (config.columns * config.rows) as usize);
    game.check_consistency().expect("consistent after descent");
}

#[test]
fn test_monster_never_loses_ground_while_chasing() {
    let mut game = started_game(2718);
    let (_, near) = free_cell_next_to_hero(&game);
    let monster = game.spawn_monster(Some(near)).expect("monster");
    let hero_pos = game.hero().expect("hero").position;

    // Idle hero; let the monster tick several periods. Inside the vision
    // radius each step greedily minimizes distance, and a blocked step
    // leaves it in place, so distance never grows.
    let mut previous = game.brick(monster).expect("monster").position.distance(hero_pos);
    let period = game.timing().monster_step;
    for tick in 1..=8 {
        game.advance(tick * period).expect("advance");
        let current = match game.brick(monster) {
            Some(brick) => brick.position.distance(hero_pos),
            None => break,
        };
        assert!(
            current <= previous,
            "chasing monster moved from distance {} to {}",
            previous,
            current
        );
        previous = current;
    }
}

#[test]
fn test_restart_resets_the_run() {
    let mut game = started_game(8080);
    let first_hero = game.hero().expect("hero").id;
    game.advance(2_000).expect("advance");

    game.handle_command(Command::Restart).expect("restart");
    assert_eq!(game.status(), GameStatus::Playing);
    assert_eq!(game.depth(), 0);

    let hero = game.hero().expect("fresh hero");
    assert_ne!(hero.id, first_hero);
    let hud = game.hud().expect("hud");
    assert_eq!(hud.level, 1);
    assert_eq!(hud.xp, 0);
    assert_eq!(hud.health, hud.max_health);
    game.check_consistency().expect("consistent after restart");
}
