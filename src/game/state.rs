//! # Game State Module
//!
//! The central registry coordinating every simulation system.
//!
//! `GameState` owns the live-brick map, the grid occupancy index, the dirty
//! set the renderer drains, the task queue, and the random number generator.
//! All mutation funnels through named operations (`spawn_*`, `move_brick`,
//! `delete_brick`) that keep the brick map and the occupancy index in step;
//! any divergence between the two is an invariant violation that aborts the
//! run with a diagnostic instead of limping on.

use crate::{
    resolve_fight, Balance, Brick, BrickId, BrickKind, BrickState, Command, ContainerState,
    DelveError, DelveResult, Direction, FightOutcome, FloodGrowthGenerator, GenerationConfig,
    Generator, HeroState, HudSnapshot, InputSnapshot, MonsterState, OpenState, PickupState,
    Position, Task, TaskQueue, Tick, Timing, ARMOR_SPRITES, SWORD_SPRITES,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Externally visible run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// No run started yet
    AwaitingStart,
    Playing,
    /// The hero died; the run ended
    GameOver,
}

impl GameStatus {
    /// The status banner the display shows.
    pub fn line(self) -> &'static str {
        match self {
            GameStatus::AwaitingStart => "Press R to Start",
            GameStatus::Playing => "",
            GameStatus::GameOver => "Game Over",
        }
    }
}

/// One renderer-facing placement record.
///
/// `visible: false` is the tombstone for a brick that was deleted since the
/// last drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: BrickId,
    pub kind: BrickKind,
    pub col: i32,
    pub row: i32,
    pub sprite: String,
    pub visible: bool,
}

impl Placement {
    fn from_brick(brick: &Brick) -> Self {
        Self {
            id: brick.id,
            kind: brick.kind,
            col: brick.position.col,
            row: brick.position.row,
            sprite: brick.sprite().to_string(),
            visible: true,
        }
    }

    fn tombstone(brick: &Brick) -> Self {
        Self {
            id: brick.id,
            kind: brick.kind,
            col: brick.position.col,
            row: brick.position.row,
            sprite: String::new(),
            visible: false,
        }
    }
}

/// Central simulation state.
///
/// # Examples
///
/// ```
/// use delve::{Command, GameState, GameStatus, GenerationConfig};
///
/// let mut game = GameState::new(GenerationConfig::for_testing(12345));
/// assert_eq!(game.status(), GameStatus::AwaitingStart);
///
/// game.handle_command(Command::Restart).unwrap();
/// assert_eq!(game.status(), GameStatus::Playing);
/// assert!(game.hero().is_some());
/// ```
#[derive(Debug)]
pub struct GameState {
    config: GenerationConfig,
    balance: Balance,
    timing: Timing,
    bricks: HashMap<BrickId, Brick>,
    /// Occupancy index: cell to the ids standing on it. Ids only; the brick
    /// map owns the entities.
    position_index: HashMap<Position, Vec<BrickId>>,
    dirty: HashSet<BrickId>,
    departed: Vec<Placement>,
    hero_id: Option<BrickId>,
    queue: TaskQueue,
    clock: Tick,
    rng: StdRng,
    input: InputSnapshot,
    status: GameStatus,
    depth: u32,
}

impl GameState {
    /// Creates a fresh simulation with default tuning.
    pub fn new(config: GenerationConfig) -> Self {
        Self::with_tuning(config, Balance::new(), Timing::new())
    }

    /// Creates a fresh simulation with explicit tuning tables.
    pub fn with_tuning(config: GenerationConfig, balance: Balance, timing: Timing) -> Self {
        let rng = crate::generation::utils::create_rng(&config);
        Self {
            config,
            balance,
            timing,
            bricks: HashMap::new(),
            position_index: HashMap::new(),
            dirty: HashSet::new(),
            departed: Vec::new(),
            hero_id: None,
            queue: TaskQueue::new(),
            clock: 0,
            rng,
            input: InputSnapshot::default(),
            status: GameStatus::AwaitingStart,
            depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // External interfaces
    // ------------------------------------------------------------------

    /// Stores the latest held-key snapshot. The hero tick polls it.
    pub fn set_input(&mut self, input: InputSnapshot) {
        self.input = input;
    }

    /// Handles an edge-triggered command.
    pub fn handle_command(&mut self, command: Command) -> DelveResult<()> {
        match command {
            Command::Restart => {
                info!("Starting run");
                self.start_game()?;
                self.start_level()
            }
            Command::UsePotion => {
                if let Some(hero) = self.hero_state_mut() {
                    if hero.drink_potion() {
                        debug!("Potion drunk");
                    }
                }
                Ok(())
            }
        }
    }

    /// Advances the simulation clock, running every due task in fire order.
    ///
    /// Tasks run to completion one at a time; nothing preempts anything.
    pub fn advance(&mut self, until: Tick) -> DelveResult<()> {
        if until < self.clock {
            return Err(DelveError::InvalidState(format!(
                "clock moved backwards: {} < {}",
                until, self.clock
            )));
        }
        loop {
            let deadline = match self.queue.next_deadline() {
                Some(deadline) if deadline <= until => deadline,
                _ => break,
            };
            self.clock = deadline;
            if let Some((_, task)) = self.queue.pop_due(deadline) {
                self.dispatch(task)?;
            }
        }
        self.clock = until;
        Ok(())
    }

    /// Drains the dirty set into placement records for the renderer,
    /// deleted bricks first as tombstones.
    pub fn take_dirty(&mut self) -> Vec<Placement> {
        let mut placements: Vec<Placement> = self.departed.drain(..).collect();
        for id in self.dirty.drain() {
            if let Some(brick) = self.bricks.get(&id) {
                placements.push(Placement::from_brick(brick));
            }
        }
        placements
    }

    /// Read-only hero stats for the HUD, if a hero is live.
    pub fn hud(&self) -> Option<HudSnapshot> {
        self.hero_state()
            .map(|hero| HudSnapshot::from_hero(hero, &self.balance))
    }

    /// The status banner the display shows.
    pub fn status_line(&self) -> &'static str {
        self.status.line()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Current simulated time in ms.
    pub fn clock(&self) -> Tick {
        self.clock
    }

    /// Trapdoors descended this run.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Occupancy queries
    // ------------------------------------------------------------------

    /// First live brick at the cell whose kind is in the filter.
    pub fn occupant_at(&self, pos: Position, kinds: &[BrickKind]) -> Option<BrickId> {
        self.position_index.get(&pos)?.iter().copied().find(|id| {
            self.bricks
                .get(id)
                .map(|brick| kinds.contains(&brick.kind))
                .unwrap_or(false)
        })
    }

    /// What, if anything, blocks this cell.
    pub fn blocking_at(&self, pos: Position) -> Option<BrickId> {
        self.occupant_at(pos, &BrickKind::BLOCKING)
    }

    fn pickups_at(&self, pos: Position) -> Vec<(BrickId, BrickKind)> {
        self.position_index
            .get(&pos)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.bricks.get(id))
                    .filter(|brick| brick.kind.is_pickup())
                    .map(|brick| (brick.id, brick.kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Brick access
    // ------------------------------------------------------------------

    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(&id)
    }

    /// Ids of all live bricks of one kind.
    pub fn bricks_of_kind(&self, kind: BrickKind) -> Vec<BrickId> {
        self.bricks
            .values()
            .filter(|brick| brick.kind == kind)
            .map(|brick| brick.id)
            .collect()
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    pub fn hero(&self) -> Option<&Brick> {
        self.hero_id.and_then(|id| self.bricks.get(&id))
    }

    fn hero_state(&self) -> Option<&HeroState> {
        self.hero().and_then(Brick::hero)
    }

    fn hero_state_mut(&mut self) -> Option<&mut HeroState> {
        let id = self.hero_id?;
        self.bricks.get_mut(&id).and_then(Brick::hero_mut)
    }

    /// Live scheduled-task count, for tests asserting cancellation.
    pub fn pending_tasks(&self) -> usize {
        self.queue.pending()
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Moves a brick, updating its stored position, the occupancy index and
    /// the dirty set as one operation.
    pub fn move_brick(&mut self, id: BrickId, to: Position) -> DelveResult<()> {
        let from = {
            let brick = self.bricks.get_mut(&id).ok_or(DelveError::StaleBrick(id))?;
            let from = brick.position;
            brick.position = to;
            from
        };
        self.remove_from_index(id, from)?;
        self.position_index.entry(to).or_default().push(id);
        self.dirty.insert(id);
        Ok(())
    }

    /// Deletes a brick: cancels its scheduled tasks, then removes it from
    /// the occupancy index and the live set.
    pub fn delete_brick(&mut self, id: BrickId) -> DelveResult<()> {
        let brick = self.bricks.remove(&id).ok_or(DelveError::StaleBrick(id))?;
        debug!("Brick delete, kind {:?}", brick.kind);
        for handle in brick.task_handles() {
            self.queue.cancel(handle);
        }
        self.remove_from_index(id, brick.position)?;
        self.dirty.remove(&id);
        self.departed.push(Placement::tombstone(&brick));
        if self.hero_id == Some(id) {
            self.hero_id = None;
        }
        Ok(())
    }

    /// Spawns a monster, auto-placing when no cell is given. Stats come from
    /// the tier for the hero's current level.
    pub fn spawn_monster(&mut self, at: Option<Position>) -> DelveResult<BrickId> {
        let pos = match at {
            Some(pos) => pos,
            None => self.auto_place(BrickKind::Monster)?,
        };
        let level = self.hero_state().map(|hero| hero.level).unwrap_or(1);
        let tier = self.balance.tier_for_level(level);
        let jitter = if self.timing.monster_jitter > 0 {
            self.rng.gen_range(0..self.timing.monster_jitter)
        } else {
            0
        };
        let period = self.timing.monster_step.saturating_sub(jitter).max(1);
        let state = MonsterState::from_tier(tier, period, &mut self.rng);
        debug!("Spawn monster at ({}, {})", pos.col, pos.row);
        let id = self.insert_brick(Brick::new(
            BrickKind::Monster,
            pos,
            BrickState::Monster(state),
        ));
        let task = self
            .queue
            .schedule_every(self.clock, period, Task::MonsterStep(id));
        if let Some(monster) = self.bricks.get_mut(&id).and_then(Brick::monster_mut) {
            monster.move_task = Some(task);
        }
        Ok(id)
    }

    /// Spawns a closed chest, auto-placing when no cell is given.
    pub fn spawn_chest(&mut self, at: Option<Position>) -> DelveResult<BrickId> {
        let pos = match at {
            Some(pos) => pos,
            None => self.auto_place(BrickKind::Chest)?,
        };
        debug!("Spawn chest at ({}, {})", pos.col, pos.row);
        Ok(self.insert_brick(Brick::new(
            BrickKind::Chest,
            pos,
            BrickState::Chest(ContainerState::closed()),
        )))
    }

    /// Spawns a closed trapdoor, auto-placing when no cell is given.
    pub fn spawn_door(&mut self, at: Option<Position>) -> DelveResult<BrickId> {
        let pos = match at {
            Some(pos) => pos,
            None => self.auto_place(BrickKind::Door)?,
        };
        debug!("Spawn door at ({}, {})", pos.col, pos.row);
        Ok(self.insert_brick(Brick::new(
            BrickKind::Door,
            pos,
            BrickState::Door(ContainerState::closed()),
        )))
    }

    /// Spawns an equipment pickup at an explicit cell.
    pub fn spawn_pickup(&mut self, kind: BrickKind, pos: Position) -> DelveResult<BrickId> {
        let sprite = match kind {
            BrickKind::ArmorPiece => ARMOR_SPRITES.choose(&mut self.rng),
            BrickKind::SwordPiece => SWORD_SPRITES.choose(&mut self.rng),
            other => {
                return Err(DelveError::InvalidState(format!(
                    "{:?} is not a pickup kind",
                    other
                )))
            }
        };
        let sprite = sprite.unwrap_or(&"unknown").to_string();
        debug!("Spawn {:?} at ({}, {})", kind, pos.col, pos.row);
        Ok(self.insert_brick(Brick::new(
            kind,
            pos,
            BrickState::Pickup(PickupState { sprite }),
        )))
    }

    /// Samples random interior cells until one is unblocked.
    ///
    /// Bounded at a fixed number of attempts per interior cell; a packed
    /// grid fails with `PlacementExhausted`, which is fatal to that spawn
    /// only.
    fn auto_place(&mut self, kind: BrickKind) -> DelveResult<Position> {
        let interior_cols = self.config.columns.saturating_sub(2);
        let interior_rows = self.config.rows.saturating_sub(2);
        if interior_cols == 0 || interior_rows == 0 {
            return Err(DelveError::PlacementExhausted { kind });
        }
        let attempts = interior_cols * interior_rows * crate::config::PLACEMENT_ATTEMPTS_PER_CELL;
        for _ in 0..attempts {
            let col = self.rng.gen_range(1..=self.config.columns as i32 - 2);
            let row = self.rng.gen_range(1..=self.config.rows as i32 - 2);
            let pos = Position::new(col, row);
            if self.blocking_at(pos).is_none() {
                return Ok(pos);
            }
        }
        Err(DelveError::PlacementExhausted { kind })
    }

    // ------------------------------------------------------------------
    // Level orchestration
    // ------------------------------------------------------------------

    /// Replaces any previous hero with a fresh one at the grid center and
    /// schedules its intent poll.
    fn start_game(&mut self) -> DelveResult<()> {
        if let Some(id) = self.hero_id {
            self.delete_brick(id)?;
        }
        let pos = Position::new(self.config.columns as i32 / 2, self.config.rows as i32 / 2);
        let id = self.insert_brick(Brick::new(
            BrickKind::Hero,
            pos,
            BrickState::Hero(HeroState::new(&self.balance)),
        ));
        self.hero_id = Some(id);
        let task = self
            .queue
            .schedule_every(self.clock, self.timing.hero_step, Task::HeroStep);
        if let Some(hero) = self.hero_state_mut() {
            hero.step_task = Some(task);
        }
        self.depth = 0;
        Ok(())
    }

    /// Tears down everything but the hero, generates a fresh maze grown from
    /// the hero's cell, and populates it.
    pub fn start_level(&mut self) -> DelveResult<()> {
        let hero_pos = self
            .hero()
            .map(|brick| brick.position)
            .ok_or_else(|| DelveError::InvalidState("no hero to build a level around".into()))?;

        let stale: Vec<BrickId> = self
            .bricks
            .keys()
            .copied()
            .filter(|&id| Some(id) != self.hero_id)
            .collect();
        for id in stale {
            self.delete_brick(id)?;
        }

        let generator = FloodGrowthGenerator::new();
        let dungeon = generator.generate(&self.config, hero_pos, &mut self.rng)?;

        for row in 0..self.config.rows as i32 {
            for col in 0..self.config.columns as i32 {
                let pos = Position::new(col, row);
                let kind = if dungeon.is_floor(pos) {
                    BrickKind::Floor
                } else {
                    BrickKind::Wall
                };
                self.insert_brick(Brick::new(kind, pos, BrickState::Terrain));
            }
        }

        let monsters = self
            .rng
            .gen_range(self.config.min_monsters..=self.config.max_monsters);
        for _ in 0..monsters {
            if !self.try_populate(BrickKind::Monster)? {
                break;
            }
        }
        let chests = self
            .rng
            .gen_range(self.config.min_chests..=self.config.max_chests);
        for _ in 0..chests {
            if !self.try_populate(BrickKind::Chest)? {
                break;
            }
        }
        for _ in 0..self.config.doors {
            if !self.try_populate(BrickKind::Door)? {
                break;
            }
        }

        self.status = GameStatus::Playing;
        info!(
            "Level ready at depth {}: {} bricks live",
            self.depth,
            self.bricks.len()
        );
        Ok(())
    }

    /// Population spawn with the recoverable-error policy: placement
    /// exhaustion trims the population instead of failing the level.
    fn try_populate(&mut self, kind: BrickKind) -> DelveResult<bool> {
        let result = match kind {
            BrickKind::Monster => self.spawn_monster(None),
            BrickKind::Chest => self.spawn_chest(None),
            BrickKind::Door => self.spawn_door(None),
            other => {
                return Err(DelveError::InvalidState(format!(
                    "{:?} is not auto-populated",
                    other
                )))
            }
        };
        match result {
            Ok(_) => Ok(true),
            Err(DelveError::PlacementExhausted { kind }) => {
                warn!("Placement exhausted for {:?}, trimming population", kind);
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    // ------------------------------------------------------------------
    // Task dispatch
    // ------------------------------------------------------------------

    fn dispatch(&mut self, task: Task) -> DelveResult<()> {
        match task {
            Task::HeroStep => self.hero_step(),
            Task::MonsterStep(id) => self.monster_step(id),
            Task::ResolveChest(id) => self.resolve_chest(id),
            Task::ResolveDoor(id) => self.resolve_door(id),
            Task::EndFight(id) => self.end_fight(id),
        }
    }

    /// One hero tick: polls intent, updates facing, then moves or interacts
    /// with whatever blocks the facing-adjacent cell.
    fn hero_step(&mut self) -> DelveResult<()> {
        let hero_id = match self.hero_id {
            Some(id) => id,
            None => return Ok(()),
        };
        let input = self.input;
        let (alive, facing, pos) = match self.hero() {
            Some(brick) => match brick.hero() {
                Some(hero) => (hero.alive, hero.facing, brick.position),
                None => return Ok(()),
            },
            None => return Ok(()),
        };
        if !alive {
            return Ok(());
        }

        let wants_move = input.held_direction();
        let wants_action = input.action;

        let facing = match wants_move {
            Some(direction) => {
                if direction != facing {
                    if let Some(hero) = self.hero_state_mut() {
                        hero.facing = direction;
                    }
                    self.dirty.insert(hero_id);
                }
                direction
            }
            None => facing,
        };

        if wants_move.is_none() && !wants_action {
            return Ok(());
        }

        let target = pos.step(facing);
        match self.blocking_at(target) {
            None => {
                if wants_move.is_some() {
                    self.move_brick(hero_id, target)?;
                    self.collect_pickups_at(target, hero_id)?;
                }
            }
            Some(obstacle) => {
                if wants_action {
                    let kind = self
                        .bricks
                        .get(&obstacle)
                        .map(|brick| brick.kind)
                        .ok_or(DelveError::StaleBrick(obstacle))?;
                    match kind {
                        BrickKind::Monster => self.begin_fight(obstacle)?,
                        BrickKind::Chest => self.open_container(obstacle, false)?,
                        BrickKind::Door => self.open_container(obstacle, true)?,
                        // A bump; nothing reacts.
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_pickups_at(&mut self, pos: Position, hero_id: BrickId) -> DelveResult<()> {
        let max_armor = self.balance.max_armor;
        let max_sword = self.balance.max_sword;
        for (pickup_id, kind) in self.pickups_at(pos) {
            if let Some(hero) = self.bricks.get_mut(&hero_id).and_then(Brick::hero_mut) {
                match kind {
                    BrickKind::ArmorPiece => hero.armor = (hero.armor + 1).min(max_armor),
                    BrickKind::SwordPiece => hero.sword = (hero.sword + 1).min(max_sword),
                    _ => {}
                }
            }
            debug!("Picked up {:?}", kind);
            self.delete_brick(pickup_id)?;
        }
        Ok(())
    }

    /// One monster tick: chase the hero inside the vision radius, wander
    /// outside it, move only into unblocked cells.
    fn monster_step(&mut self, id: BrickId) -> DelveResult<()> {
        let pos = self
            .bricks
            .get(&id)
            .map(|brick| brick.position)
            .ok_or(DelveError::StaleBrick(id))?;
        let hero_pos = match self.hero().map(|brick| brick.position) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        if pos == hero_pos {
            // Sharing the hero's cell only happens mid-fight.
            return Ok(());
        }

        let direction = if pos.distance(hero_pos) < self.balance.vision_radius {
            let mut best = Direction::Up;
            let mut best_distance = f64::INFINITY;
            for candidate in Direction::ALL {
                let candidate_distance = pos.step(candidate).distance(hero_pos);
                if candidate_distance < best_distance {
                    best_distance = candidate_distance;
                    best = candidate;
                }
            }
            best
        } else {
            Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())]
        };

        let target = pos.step(direction);
        if self.blocking_at(target).is_none() {
            self.move_brick(id, target)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Hero-initiated fight against an adjacent monster. The whole exchange
    /// resolves here; the monster lingers until its cleanup task fires.
    fn begin_fight(&mut self, monster_id: BrickId) -> DelveResult<()> {
        let hero_id = self
            .hero_id
            .ok_or_else(|| DelveError::InvalidState("fight without a hero".into()))?;

        // One-way gate; a fight already running ignores further action
        // presses.
        let move_task = {
            let monster = self
                .bricks
                .get_mut(&monster_id)
                .and_then(Brick::monster_mut)
                .ok_or(DelveError::StaleBrick(monster_id))?;
            if monster.in_fight {
                return Ok(());
            }
            monster.in_fight = true;
            monster.move_task.take()
        };
        if let Some(task) = move_task {
            self.queue.cancel(task);
        }
        debug!("Start fight");

        let end_task =
            self.queue
                .schedule_after(self.clock, self.timing.fight_linger, Task::EndFight(monster_id));
        if let Some(monster) = self.bricks.get_mut(&monster_id).and_then(Brick::monster_mut) {
            monster.end_fight_task = Some(end_task);
        }

        let mut hero = self
            .hero_state()
            .cloned()
            .ok_or_else(|| DelveError::InvalidState("fight without a hero".into()))?;
        let mut monster = self
            .bricks
            .get(&monster_id)
            .and_then(Brick::monster)
            .cloned()
            .ok_or(DelveError::StaleBrick(monster_id))?;

        let outcome = resolve_fight(&mut hero, &mut monster, &self.balance, &mut self.rng);
        hero.try_level_up(&self.balance);
        hero.clamp_health();
        if matches!(outcome, FightOutcome::HeroDown { .. }) {
            hero.alive = false;
        }

        let step_task = if hero.alive { None } else { hero.step_task.take() };
        if let Some(state) = self.bricks.get_mut(&hero_id).and_then(Brick::hero_mut) {
            *state = hero;
        }
        if let Some(state) = self.bricks.get_mut(&monster_id).and_then(Brick::monster_mut) {
            *state = monster;
        }
        self.dirty.insert(hero_id);
        self.dirty.insert(monster_id);

        if let Some(task) = step_task {
            // The hero is inert from here on; only a restart revives the run.
            self.queue.cancel(task);
            self.status = GameStatus::GameOver;
            info!("Game over at depth {}", self.depth);
        }
        debug!("Fight resolved: {:?}", outcome);
        Ok(())
    }

    /// Closed to open, one way. Opening schedules the deferred resolution.
    fn open_container(&mut self, id: BrickId, is_door: bool) -> DelveResult<()> {
        {
            let container = self
                .bricks
                .get_mut(&id)
                .and_then(Brick::container_mut)
                .ok_or(DelveError::StaleBrick(id))?;
            if container.is_open() {
                return Ok(());
            }
            container.state = OpenState::Open;
        }
        self.dirty.insert(id);
        let task = if is_door {
            Task::ResolveDoor(id)
        } else {
            Task::ResolveChest(id)
        };
        debug!("Opening {:?}", task);
        let handle = self
            .queue
            .schedule_after(self.clock, self.timing.resolve_delay, task);
        if let Some(container) = self.bricks.get_mut(&id).and_then(Brick::container_mut) {
            container.resolve_task = Some(handle);
        }
        Ok(())
    }

    /// A resolved chest turns into one random piece of loot.
    fn resolve_chest(&mut self, id: BrickId) -> DelveResult<()> {
        let pos = {
            let brick = self.bricks.get_mut(&id).ok_or(DelveError::StaleBrick(id))?;
            if let Some(container) = brick.container_mut() {
                container.resolve_task = None;
            }
            brick.position
        };
        self.delete_brick(id)?;
        let kind = if self.rng.gen_bool(0.5) {
            BrickKind::ArmorPiece
        } else {
            BrickKind::SwordPiece
        };
        self.spawn_pickup(kind, pos)?;
        Ok(())
    }

    /// A resolved trapdoor sends the hero one level down.
    fn resolve_door(&mut self, id: BrickId) -> DelveResult<()> {
        if let Some(container) = self.bricks.get_mut(&id).and_then(Brick::container_mut) {
            container.resolve_task = None;
        }
        self.delete_brick(id)?;
        self.depth += 1;
        info!("Trapdoor taken, descending to depth {}", self.depth);
        self.start_level()
    }

    /// Fight cleanup: a beaten monster leaves the world; a survivor calms
    /// down and resumes wandering.
    fn end_fight(&mut self, id: BrickId) -> DelveResult<()> {
        let (dead, period) = {
            let monster = self
                .bricks
                .get_mut(&id)
                .and_then(Brick::monster_mut)
                .ok_or(DelveError::StaleBrick(id))?;
            monster.end_fight_task = None;
            (monster.hp <= 0, monster.period)
        };
        if dead {
            debug!("End fight");
            self.delete_brick(id)
        } else {
            let task = self
                .queue
                .schedule_every(self.clock, period, Task::MonsterStep(id));
            if let Some(monster) = self.bricks.get_mut(&id).and_then(Brick::monster_mut) {
                monster.in_fight = false;
                monster.move_task = Some(task);
            }
            self.dirty.insert(id);
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn insert_brick(&mut self, brick: Brick) -> BrickId {
        let id = brick.id;
        self.position_index
            .entry(brick.position)
            .or_default()
            .push(id);
        self.dirty.insert(id);
        self.bricks.insert(id, brick);
        id
    }

    fn remove_from_index(&mut self, id: BrickId, pos: Position) -> DelveResult<()> {
        let entry = self.position_index.get_mut(&pos).ok_or_else(|| {
            DelveError::InvalidState(format!(
                "occupancy index has no entry at ({}, {})",
                pos.col, pos.row
            ))
        })?;
        let before = entry.len();
        entry.retain(|&other| other != id);
        if entry.len() == before {
            return Err(DelveError::InvalidState(format!(
                "brick {} not indexed at its position ({}, {})",
                id, pos.col, pos.row
            )));
        }
        if entry.is_empty() {
            self.position_index.remove(&pos);
        }
        Ok(())
    }

    /// Verifies the occupancy index and the live set agree exactly.
    ///
    /// Any mismatch is an invariant violation; callers should abort the run
    /// rather than continue on corrupted state.
    pub fn check_consistency(&self) -> DelveResult<()> {
        for (id, brick) in &self.bricks {
            let indexed = self
                .position_index
                .get(&brick.position)
                .map(|ids| ids.contains(id))
                .unwrap_or(false);
            if !indexed {
                return Err(DelveError::InvalidState(format!(
                    "brick {} at ({}, {}) missing from occupancy index",
                    id, brick.position.col, brick.position.row
                )));
            }
        }
        for (pos, ids) in &self.position_index {
            if ids.is_empty() {
                return Err(DelveError::InvalidState(format!(
                    "empty index entry at ({}, {})",
                    pos.col, pos.row
                )));
            }
            for id in ids {
                match self.bricks.get(id) {
                    Some(brick) if brick.position == *pos => {}
                    Some(brick) => {
                        return Err(DelveError::InvalidState(format!(
                            "brick {} indexed at ({}, {}) but stored at ({}, {})",
                            id, pos.col, pos.row, brick.position.col, brick.position.row
                        )))
                    }
                    None => {
                        return Err(DelveError::InvalidState(format!(
                            "dead brick {} still indexed at ({}, {})",
                            id, pos.col, pos.row
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}
