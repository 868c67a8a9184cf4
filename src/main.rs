//! Sidescroller headless runner
//!
//! Builds a level from a preset name or a JSON config path, plays a scripted
//! session at the fixed timestep and logs what the host would have received.
//!
//! Usage: `sidescroller [fixed|scrolling|infinite|<config.json>] [seed]`

use std::path::Path;

use sidescroller::consts::*;
use sidescroller::sim::{
    ActorId, CollisionEvent, CommandOp, ContactPhase, GameEvent, GamePhase, GameState, Tag,
    TickInput, tick,
};
use sidescroller::{LevelConfig, LevelPreset, SimError};

/// Length of the scripted session
const SESSION_SECONDS: u32 = 10;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimError> {
    let mut args = std::env::args().skip(1);
    let level = args.next().unwrap_or_else(|| "fixed".to_string());
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);

    let config = load_config(&level)?;
    let mut state = GameState::new(config, seed)?;
    log::info!(
        "Sidescroller starting: level={}, mode={:?}, seed={}",
        level,
        state.mode(),
        state.rng.seed()
    );

    let ticks = SESSION_SECONDS * SIM_HZ as u32;
    let mut commands = 0usize;
    let mut velocity_commands = 0usize;
    let mut recycled = 0usize;

    for t in 0..ticks {
        let input = scripted_input(t);
        tick(&mut state, &input, SIM_DT);

        let out = state.drain();
        commands += out.commands.len();
        velocity_commands += out
            .commands
            .iter()
            .filter(|c| matches!(c.op, CommandOp::SetVelocity(_)))
            .count();
        for event in &out.events {
            match event {
                GameEvent::ScoreChanged { total } => log::info!("Score: {}", total),
                GameEvent::PlayerDown => log::info!("Player down at tick {}", t),
                GameEvent::TileRecycled { .. } => recycled += 1,
                GameEvent::LevelGenerated { children, attempts } => {
                    log::info!("Level generated: {} children, {} attempt(s)", children, attempts)
                }
            }
        }

        if state.phase == GamePhase::Over {
            break;
        }
    }

    log::info!(
        "Session over after {} ticks: {}, phase {:?}",
        state.time_ticks,
        state.score.display(),
        state.phase
    );
    log::info!(
        "Commands emitted: {} ({} velocity), tiles recycled: {}, active NPCs: {}",
        commands,
        velocity_commands,
        recycled,
        state.active_npc_count()
    );
    Ok(())
}

/// A preset name, or a path to a JSON level configuration
fn load_config(level: &str) -> Result<LevelConfig, SimError> {
    if let Some(preset) = LevelPreset::from_str(level) {
        return Ok(LevelConfig::from_preset(preset));
    }
    if Path::new(level).exists() {
        return LevelConfig::load(level);
    }
    log::warn!("Unknown level '{}', using {}", level, LevelPreset::Fixed.as_str());
    Ok(LevelConfig::from_preset(LevelPreset::Fixed))
}

/// Walk right, stop, walk back left, jumping and interacting along the way.
/// There is no physics here, so the player always reports standing on a platform.
fn scripted_input(t: u32) -> TickInput {
    let second = t / SIM_HZ as u32;
    let frame = t % SIM_HZ as u32;
    TickInput {
        move_right: matches!(second, 0..=2),
        move_left: matches!(second, 5..=7),
        jump: frame < 5 && second % 3 == 1,
        interact: frame < 3,
        collisions: vec![CollisionEvent::collision(
            ActorId::PLAYER,
            Tag::Platform,
            ContactPhase::Stay,
        )],
        bodies: Vec::new(),
    }
}
