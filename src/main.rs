//! # Delve Demo Entry Point
//!
//! Headless autoplay harness: builds a simulation, drives it with a scripted
//! input bot, and logs HUD telemetry. Stands in for the real renderer and
//! input collaborators.

use clap::Parser;
use delve::{
    Command, DelveResult, Direction, GameState, GameStatus, GenerationConfig, InputSnapshot,
};
use log::{debug, info, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Command line arguments for the Delve demo.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "A tile-based dungeon crawler simulation core")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Grid width in cells
    #[arg(long, default_value_t = delve::config::DEFAULT_COLUMNS)]
    columns: u32,

    /// Grid height in cells
    #[arg(long, default_value_t = delve::config::DEFAULT_ROWS)]
    rows: u32,

    /// Simulated milliseconds to run before stopping
    #[arg(long, default_value_t = 120_000)]
    run_for: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> DelveResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    info!("Starting Delve v{}", delve::VERSION);

    let seed = args.seed.unwrap_or(12345);
    let mut config = GenerationConfig::new(seed);
    config.columns = args.columns;
    config.rows = args.rows;

    info!(
        "Generating {}x{} dungeon with seed {}",
        config.columns, config.rows, seed
    );

    let mut game = GameState::new(config);
    game.handle_command(Command::Restart)?;

    run_demo(&mut game, seed, args.run_for)?;

    if let Some(hud) = game.hud() {
        info!("Final stats: {}", serde_json::to_string(&hud)?);
    }
    info!(
        "Run ended after {} simulated ms at depth {}: {}",
        game.clock(),
        game.depth(),
        if game.status() == GameStatus::GameOver {
            "hero fell"
        } else {
            "time budget spent"
        }
    );
    Ok(())
}

/// Initializes the logging system from the requested level.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Drives the simulation in 100 ms slices with a wandering bot on the keys.
fn run_demo(game: &mut GameState, seed: u64, run_for: u64) -> DelveResult<()> {
    const SLICE: u64 = 100;
    const HUD_PERIOD: u64 = 5_000;

    let mut bot = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9));
    let mut held = Direction::Right;
    let mut next_hud = HUD_PERIOD;
    let mut clock = 0;

    while clock < run_for {
        clock += SLICE;

        // The bot holds one direction for a while and hammers the action key
        // now and then, which is enough to explore, fight and loot.
        if bot.gen_bool(0.3) {
            held = Direction::ALL[bot.gen_range(0..Direction::ALL.len())];
        }
        game.set_input(InputSnapshot {
            up: held == Direction::Up,
            right: held == Direction::Right,
            down: held == Direction::Down,
            left: held == Direction::Left,
            action: bot.gen_bool(0.5),
        });

        game.advance(clock)?;

        // Stand in for the renderer: consume placements each frame.
        let placements = game.take_dirty();
        if !placements.is_empty() {
            debug!("{} placements updated", placements.len());
        }

        if clock >= next_hud {
            next_hud += HUD_PERIOD;
            if let Some(hud) = game.hud() {
                info!("hud {}", serde_json::to_string(&hud)?);
            }
        }

        if game.status() == GameStatus::GameOver {
            info!("{}", game.status_line());
            break;
        }
    }
    Ok(())
}
