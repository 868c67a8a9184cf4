//! Engine boundary: events consumed and commands emitted
//!
//! The host engine reports collisions and physics-integrated positions; the
//! simulation answers with commands (physics, presentation, audio) that the
//! host applies after each tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable actor identifier. The player is always `ActorId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl ActorId {
    pub const PLAYER: ActorId = ActorId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinId(pub u32);

/// Which projectile pool a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    Player,
    Npc,
}

/// A projectile slot inside a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileHandle {
    pub pool: PoolKind,
    pub slot: usize,
}

/// Collision classification of scene objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Platform,
    Npc,
    PlayerInteract,
    Bound,
    PlatformEdge,
    Coin,
    Untagged,
}

/// Collision layers the simulation moves actors between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionLayer {
    Player,
    Npc,
    /// Only collides with the floor
    Contact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

/// The object on the other side of a collision, when the host knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    Projectile(ProjectileHandle),
    Hitbox(ActorId),
    Actor(ActorId),
    Coin(CoinId),
}

/// A collision or trigger callback routed to an actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub subject: ActorId,
    pub other: Tag,
    pub other_ref: Option<EntityRef>,
    pub phase: ContactPhase,
    /// Trigger callback rather than a solid collision
    pub trigger: bool,
}

impl CollisionEvent {
    pub fn collision(subject: ActorId, other: Tag, phase: ContactPhase) -> Self {
        Self {
            subject,
            other,
            other_ref: None,
            phase,
            trigger: false,
        }
    }

    pub fn trigger(subject: ActorId, other: Tag, phase: ContactPhase) -> Self {
        Self {
            subject,
            other,
            other_ref: None,
            phase,
            trigger: true,
        }
    }

    pub fn with_ref(mut self, other_ref: EntityRef) -> Self {
        self.other_ref = Some(other_ref);
        self
    }
}

/// Physics-integrated position written back by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySample {
    pub actor: ActorId,
    pub pos: Vec2,
}

/// Addressable scene objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Actor(ActorId),
    Hitbox(ActorId),
    Projectile(ProjectileHandle),
    Coin(CoinId),
    Tile(usize),
    TileVariant { tile: usize, variant: usize },
    Parallax(usize),
    LevelRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Jump,
    Interact,
    Collect,
    Contact,
}

/// Animation parameter names
pub mod anim {
    pub const INTERACT: &str = "interact";
    pub const CONTACT: &str = "contact";
    pub const IS_WALKING: &str = "isWalking";
    pub const IS_ACTIVE: &str = "isActive";
    pub const ON_GROUND: &str = "onGround";
    pub const KNOCKED_OUT: &str = "KOd";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CommandOp {
    SetActive(bool),
    SetPosition(Vec2),
    SetVelocity(Vec2),
    SetKinematic(bool),
    SetCollisionLayer(CollisionLayer),
    SetTag(Tag),
    AnimationTrigger(&'static str),
    ResetAnimationTrigger(&'static str),
    AnimationBool(&'static str, bool),
    SpriteFlip(bool),
    PlaySound(SoundCue),
}

/// A command for the host to apply to one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Command {
    pub target: Entity,
    pub op: CommandOp,
}

/// Gameplay notifications for UI bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelGenerated { children: usize, attempts: u32 },
    ScoreChanged { total: u64 },
    TileRecycled { tile: usize, variant: Option<usize> },
    PlayerDown,
}

/// Per-tick output collected for the host
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outbox {
    pub commands: Vec<Command>,
    pub events: Vec<GameEvent>,
}

impl Outbox {
    pub fn emit(&mut self, target: Entity, op: CommandOp) {
        self.commands.push(Command { target, op });
    }

    pub fn notify(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Commands addressed to one entity, in emission order
    pub fn commands_for(&self, target: Entity) -> impl Iterator<Item = &CommandOp> {
        self.commands
            .iter()
            .filter(move |c| c.target == target)
            .map(|c| &c.op)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.events.clear();
    }
}
