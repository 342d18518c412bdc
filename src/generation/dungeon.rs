//! # Dungeon Generation
//!
//! Randomized flood-growth maze generation.
//!
//! The generator grows the floor outward from the start cell. Each frontier
//! cell classifies its unvisited neighbours as floor or wall under two local
//! heuristics (keep the floor connected, make sure walls appear) plus a coin
//! flip, and newly carved floor re-joins the frontier. Because floor cells
//! are only ever created adjacent to already-connected floor, the resulting
//! maze is connected by construction; [`FloodGrowthGenerator::validate`]
//! checks that guarantee with a flood fill.

use crate::{DelveError, DelveResult, GenerationConfig, Generator, Position};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification of one grid cell during and after generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    /// Not yet reached by the flood
    Unvisited,
    Floor,
    Wall,
}

/// A generated grid of cell classifications.
///
/// Transient output of generation: the orchestrator instantiates wall and
/// floor bricks from it and discards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dungeon {
    pub columns: u32,
    pub rows: u32,
    cells: Vec<CellState>,
}

impl Dungeon {
    fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            cells: vec![CellState::Unvisited; (columns * rows) as usize],
        }
    }

    /// Whether a cell lies on the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.col >= 0
            && pos.row >= 0
            && pos.col < self.columns as i32
            && pos.row < self.rows as i32
    }

    /// Whether a cell lies on the outer border.
    pub fn is_border(&self, pos: Position) -> bool {
        pos.col == 0
            || pos.row == 0
            || pos.col == self.columns as i32 - 1
            || pos.row == self.rows as i32 - 1
    }

    /// Cell state, or `None` outside the grid.
    pub fn get(&self, pos: Position) -> Option<CellState> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[(pos.row as u32 * self.columns + pos.col as u32) as usize])
    }

    fn set(&mut self, pos: Position, state: CellState) {
        let index = (pos.row as u32 * self.columns + pos.col as u32) as usize;
        self.cells[index] = state;
    }

    /// Whether a cell was classified floor.
    pub fn is_floor(&self, pos: Position) -> bool {
        self.get(pos) == Some(CellState::Floor)
    }

    /// All floor cells.
    pub fn floor_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        for row in 0..self.rows as i32 {
            for col in 0..self.columns as i32 {
                let pos = Position::new(col, row);
                if self.is_floor(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }
}

/// Maze generator using randomized flood growth.
///
/// # Examples
///
/// ```
/// use delve::{FloodGrowthGenerator, GenerationConfig, Generator, Position};
/// use delve::generation::utils;
///
/// let config = GenerationConfig::for_testing(12345);
/// let mut rng = utils::create_rng(&config);
/// let generator = FloodGrowthGenerator::new();
/// let start = Position::new(4, 4);
///
/// let dungeon = generator.generate(&config, start, &mut rng).unwrap();
/// assert!(dungeon.is_floor(start));
/// ```
#[derive(Debug, Clone)]
pub struct FloodGrowthGenerator {
    /// Floor is forced while a cell sees fewer classified floor neighbours
    /// than this, keeping corridors connected
    pub min_floor_neighbours: usize,
    /// Odds of carving floor once both forcing rules are satisfied
    pub carve_chance: f64,
}

impl FloodGrowthGenerator {
    /// Creates a generator with the default branching heuristics.
    pub fn new() -> Self {
        Self {
            min_floor_neighbours: 2,
            carve_chance: 0.5,
        }
    }

    fn grow(&self, dungeon: &mut Dungeon, start: Position, rng: &mut StdRng) {
        let mut frontier = vec![start];

        while let Some(node) = frontier.pop() {
            // Bin the neighbours by current classification. The counters
            // update as this node classifies its own neighbours, so later
            // decisions at the same node see the earlier ones.
            let mut unvisited = Vec::new();
            let mut floors = 0usize;
            let mut walls = 0usize;
            for neighbour in node.cardinal_neighbours() {
                match dungeon.get(neighbour).unwrap_or(CellState::Wall) {
                    CellState::Unvisited => unvisited.push(neighbour),
                    CellState::Floor => floors += 1,
                    CellState::Wall => walls += 1,
                }
            }

            unvisited.shuffle(rng);
            for cell in unvisited {
                let state = if floors < self.min_floor_neighbours {
                    CellState::Floor
                } else if walls == 0 {
                    CellState::Wall
                } else if rng.gen_bool(self.carve_chance) {
                    CellState::Floor
                } else {
                    CellState::Wall
                };

                dungeon.set(cell, state);
                match state {
                    CellState::Floor => {
                        floors += 1;
                        frontier.push(cell);
                    }
                    CellState::Wall => walls += 1,
                    CellState::Unvisited => {}
                }
            }
        }
    }
}

impl Default for FloodGrowthGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<Dungeon> for FloodGrowthGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        start: Position,
        rng: &mut StdRng,
    ) -> DelveResult<Dungeon> {
        config.validate()?;
        if !config.is_interior(start) {
            return Err(DelveError::GenerationFailed(format!(
                "start cell ({}, {}) is not strictly inside the border",
                start.col, start.row
            )));
        }

        let mut dungeon = Dungeon::new(config.columns, config.rows);

        // Pre-seed the border as wall and the start as floor.
        for row in 0..config.rows as i32 {
            for col in 0..config.columns as i32 {
                let pos = Position::new(col, row);
                if dungeon.is_border(pos) {
                    dungeon.set(pos, CellState::Wall);
                }
            }
        }
        dungeon.set(start, CellState::Floor);

        self.grow(&mut dungeon, start, rng);
        self.validate(&dungeon, start)?;

        Ok(dungeon)
    }

    /// Checks the generator's single correctness guarantee: every floor cell
    /// is reachable from the start through adjacent floor cells, and the
    /// border stayed walled.
    fn validate(&self, dungeon: &Dungeon, start: Position) -> DelveResult<()> {
        if !dungeon.is_floor(start) {
            return Err(DelveError::GenerationFailed(
                "start cell is not floor".to_string(),
            ));
        }

        for row in 0..dungeon.rows as i32 {
            for col in 0..dungeon.columns as i32 {
                let pos = Position::new(col, row);
                if dungeon.is_border(pos) && dungeon.get(pos) != Some(CellState::Wall) {
                    return Err(DelveError::GenerationFailed(format!(
                        "border cell ({}, {}) is not wall",
                        pos.col, pos.row
                    )));
                }
            }
        }

        // Flood fill over floor from the start must reach every floor cell.
        let mut reached = HashSet::new();
        let mut frontier = vec![start];
        reached.insert(start);
        while let Some(node) = frontier.pop() {
            for neighbour in node.cardinal_neighbours() {
                if dungeon.is_floor(neighbour) && reached.insert(neighbour) {
                    frontier.push(neighbour);
                }
            }
        }

        let floor_count = dungeon.floor_cells().len();
        if reached.len() != floor_count {
            return Err(DelveError::GenerationFailed(format!(
                "{} of {} floor cells unreachable from start",
                floor_count - reached.len(),
                floor_count
            )));
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "FloodGrowthGenerator"
    }
}
