//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (player first, then NPCs by ID, then tiles)
//! - No rendering, physics or audio dependencies

pub mod actor;
pub mod events;
pub mod level;
pub mod pool;
pub mod score;
pub mod scroll;
pub mod state;
pub mod tick;
pub mod tile;

pub use actor::{
    Actor, ActorKind, ActorPolicy, ActorRig, ContactState, HeldIntents, Instigator,
    InteractionState, SimContext,
};
pub use events::{
    ActorId, BodySample, CoinId, CollisionEvent, Command, CommandOp, ContactPhase, Entity,
    EntityRef, GameEvent, Outbox, PoolKind, ProjectileHandle, Tag,
};
pub use level::{LevelLayout, LevelMode, Placement, Prefab, RandomSource, generate};
pub use pool::ProjectilePool;
pub use score::ScoreTracker;
pub use scroll::ScrollCoordinator;
pub use state::{Facing, GamePhase, GameState, SimRng};
pub use tick::{TickInput, tick};
pub use tile::InfiniteTile;
