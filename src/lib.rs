//! Sidescroller - gameplay core for a 2D side-scrolling platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (actors, projectiles, level generation, scrolling, score)
//! - `config`: Per-level configuration surface and presets
//! - `error`: Error taxonomy shared by the simulation
//!
//! Rendering, physics integration, audio and input polling belong to the host
//! engine. The simulation consumes collision events and held intents, and
//! emits commands for the host to apply.

pub mod config;
pub mod error;
pub mod sim;

pub use config::{LevelConfig, LevelPreset};
pub use error::SimError;

/// Game configuration constants
pub mod consts {
    /// Simulation rate
    pub const SIM_HZ: f32 = 60.0;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / SIM_HZ;

    /// Player speed while grounded (units/s)
    pub const GROUND_SPEED: f32 = 7.5;
    /// Player speed while airborne (units/s)
    pub const AIR_SPEED: f32 = 3.75;
    /// NPC walking speed (units/s)
    pub const NPC_SPEED: f32 = 3.75;
    /// Vertical velocity applied on jump
    pub const JUMP_VELOCITY: f32 = 8.0;
    /// Knockback applied to the player on contact
    pub const PLAYER_KNOCKBACK: f32 = 4.0;
    /// Allowed range for NPC knockback
    pub const NPC_KNOCKBACK_MIN: f32 = 1.0;
    pub const NPC_KNOCKBACK_MAX: f32 = 40.0;
    /// NPC knockback when none (or a non-finite value) is configured
    pub const NPC_KNOCKBACK_DEFAULT: f32 = 4.0;
    /// Player falls out of the level below this height
    pub const FALL_OUT_Y: f32 = -6.5;
    /// Melee hitbox sits this far in front of its actor
    pub const HITBOX_OFFSET: f32 = 0.75;

    /// Seconds between autonomous interactions
    pub const INTERACT_INTERVAL: f32 = 3.0;
    /// Maximum jitter applied to the interaction interval (either sign)
    pub const INTERACT_JITTER: f32 = 1.0;
    /// Pause before interacting for actors that stop to interact
    pub const STOP_TO_INTERACT_DELAY: f32 = 3.0 / 4.0;
    /// Length of the interaction window
    pub const INTERACT_DURATION: f32 = 2.0 / 3.0;
    /// Recovery after a melee window for autonomous actors
    pub const INTERACT_RECOVERY: f32 = 2.0 / 3.0;
    /// Time spent in contact before the actor is disabled
    pub const CONTACT_DURATION: f32 = 2.0;

    /// Projectile speed (units/s)
    pub const PROJECTILE_SPEED: f32 = 15.0;
    /// Projectile lifetime
    pub const PROJECTILE_LIFETIME: f32 = 3.0;
    /// Projectile pool capacity for the player
    pub const PLAYER_POOL_SIZE: usize = 20;
    /// Default projectile pool capacity shared by NPCs
    pub const NPC_POOL_SIZE: usize = 15;

    /// Points for contacting an NPC
    pub const NPC_CONTACT_POINTS: u32 = 100;
    /// Points for collecting a coin
    pub const COIN_POINTS: u32 = 50;

    /// Horizontal half-extent of the fixed-screen spawn grid
    pub const FIXED_X_EXTENT: f32 = 5.5;
    /// Bound marker position for fixed-screen levels
    pub const FIXED_BOUND_POS: f32 = 6.5;
    /// Extra distance between scroll bounds and the bound markers
    pub const SCROLL_BOUND_MARGIN: f32 = 2.0;
    /// Default scroll bound half-width
    pub const DEFAULT_SCROLL_BOUND: f32 = 25.0;
    /// Largest scroll bound half-width accepted from a config
    pub const MAX_SCROLL_BOUND: f32 = 500.0;
    /// Vertical spawn band
    pub const GRID_Y_MIN: f32 = -4.5;
    pub const GRID_Y_MAX: f32 = 4.5;
    pub const GRID_Y_STEP: f32 = 2.0;
    /// Spawns are suppressed where |x| <= this
    pub const SPAWN_EXCLUSION: f32 = 2.0;
    /// Minimum child count for generated fixed/scrolling levels
    pub const MIN_CHILDREN_FIXED: usize = 32;
    pub const MIN_CHILDREN_SCROLLING: usize = 120;
    /// Generation attempts before accepting the densest layout
    pub const MAX_GENERATION_ATTEMPTS: u32 = 64;
    /// Height of the platform placed beneath the spawn point
    pub const SPAWN_PLATFORM_Y: f32 = -3.5;

    /// Infinite-mode tile grid
    pub const TILE_X_EXTENT: f32 = 11.0;
    pub const TILE_X_STEP: f32 = 5.0;
    pub const TILE_Y_MIN: f32 = -4.5;
    pub const TILE_Y_MAX: f32 = 3.5;
    pub const TILE_Y_STEP: f32 = 3.0;
    /// Tile scroll speed (units/s)
    pub const TILE_SCROLL_SPEED: f32 = 2.8125;

    /// Player must be within this band for the level to scroll under them
    pub const SCREEN_SCROLL_BAND: f32 = 4.5;
    /// Idle time before re-centering starts
    pub const RECENTER_SETTLE: f32 = 1.0;
    /// Re-centering stops once the player is this close to center
    pub const RECENTER_TOLERANCE: f32 = 1.0;

    /// Parallax layers wrap past this position (plus half their width)
    pub const PARALLAX_TELEPORT_X: f32 = 8.0 - 0.125;
}

/// Convert a duration in seconds to whole simulation ticks
#[inline]
pub fn ticks_for(seconds: f32) -> u32 {
    (seconds * consts::SIM_HZ).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_for_known_durations() {
        assert_eq!(ticks_for(consts::INTERACT_DURATION), 40);
        assert_eq!(ticks_for(consts::STOP_TO_INTERACT_DELAY), 45);
        assert_eq!(ticks_for(consts::CONTACT_DURATION), 120);
        assert_eq!(ticks_for(0.0), 0);
        assert_eq!(ticks_for(-1.0), 0);
    }
}
