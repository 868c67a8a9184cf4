//! Player and NPC behavior
//!
//! Both kinds share one state machine. They differ in where intent comes
//! from (held keys or an interaction timer) and in a handful of policy
//! flags. Timed transitions are countdowns in ticks, advanced at the start
//! of each actor update.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{
    anim, ActorId, CollisionEvent, CollisionLayer, CommandOp, ContactPhase, Entity, GameEvent,
    Outbox, SoundCue, Tag,
};
use super::level::RandomSource;
use super::pool::ProjectilePool;
use super::score::ScoreTracker;
use super::scroll::ScrollCoordinator;
use super::state::Facing;
use crate::config::{NpcConfig, PlayerConfig};
use crate::consts::*;
use crate::error::SimError;
use crate::ticks_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Npc,
}

/// Behavior flags fixed at level start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorPolicy {
    pub disappear_on_contact: bool,
    pub knockback_on_contact: bool,
    pub knockback_magnitude: f32,
    pub stop_before_interact: bool,
    pub can_fall_off_platforms: bool,
    pub is_projectile_user: bool,
}

impl ActorPolicy {
    pub fn player(config: &PlayerConfig) -> Self {
        Self {
            disappear_on_contact: config.disappear_on_contact,
            knockback_on_contact: config.knockback_on_contact,
            knockback_magnitude: PLAYER_KNOCKBACK,
            stop_before_interact: false,
            can_fall_off_platforms: true,
            is_projectile_user: config.is_shooter,
        }
    }

    pub fn npc(config: &NpcConfig) -> Self {
        Self {
            disappear_on_contact: config.disappear_on_contact,
            knockback_on_contact: config.knockback_on_contact,
            knockback_magnitude: config.knockback_magnitude,
            stop_before_interact: config.stops_to_interact,
            can_fall_off_platforms: config.can_fall_off_platforms,
            is_projectile_user: config.is_shooter,
        }
    }
}

/// Engine-provided components an actor may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorRig {
    pub ground_sensor: bool,
    pub player_hitbox: bool,
    pub npc_hitbox: bool,
}

impl Default for ActorRig {
    fn default() -> Self {
        Self {
            ground_sensor: true,
            player_hitbox: true,
            npc_hitbox: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionState {
    Idle,
    PreInteractDelay { ticks_left: u32 },
    /// Interaction window open (shot fired, or melee hitbox active)
    Interacting { ticks_left: u32 },
    PostInteractCooldown { ticks_left: u32 },
}

/// Entered at most once per activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactState {
    Active,
    InContact { ticks_left: u32 },
    Disabled,
}

/// Melee hitbox placed in front of its actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub offset: f32,
    pub open: bool,
}

/// Who caused a contact, for choosing the knockback direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instigator {
    Melee { x: f32 },
    Projectile,
    None,
}

/// Held input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldIntents {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub interact: bool,
}

/// What an actor wants to do this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub horizontal: Option<Facing>,
    pub jump: bool,
    pub interact: bool,
}

/// Edge detection over held keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HumanInput {
    prev_jump: bool,
    prev_interact: bool,
}

impl HumanInput {
    fn poll(&mut self, held: &HeldIntents) -> Intent {
        let horizontal = if held.move_left {
            Some(Facing::Left)
        } else if held.move_right {
            Some(Facing::Right)
        } else {
            None
        };
        let intent = Intent {
            horizontal,
            jump: held.jump && !self.prev_jump,
            interact: held.interact && !self.prev_interact,
        };
        self.prev_jump = held.jump;
        self.prev_interact = held.interact;
        intent
    }
}

/// Countdown to the next autonomous interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractTimer {
    pub ticks_left: u32,
}

impl InteractTimer {
    pub fn armed<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        let mut timer = Self { ticks_left: 0 };
        timer.arm(rng);
        timer
    }

    pub fn arm<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        let jitter = rng.jitter(-INTERACT_JITTER, INTERACT_JITTER);
        self.ticks_left = ticks_for(INTERACT_INTERVAL + jitter).max(1);
    }

    /// Count down one tick; true once the timer has run out
    fn tick(&mut self) -> bool {
        self.ticks_left = self.ticks_left.saturating_sub(1);
        self.ticks_left == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntentSource {
    Human(HumanInput),
    Autonomous(InteractTimer),
}

/// How an actor responds to one collision event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    None,
    Reverse,
    Contact,
    CollectCoin,
    Grounded(bool),
    TouchBound(bool),
}

/// Collaborators lent to actor operations for one call
pub struct SimContext<'a> {
    pub pool: &'a mut ProjectilePool,
    pub scroll: &'a mut ScrollCoordinator,
    pub score: &'a mut ScoreTracker,
    pub rng: &'a mut dyn RandomSource,
    pub out: &'a mut Outbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub policy: ActorPolicy,
    pub pos: Vec2,
    pub facing: Facing,
    /// Presentation flip state; only toggled when facing changes
    pub flip_x: bool,
    pub grounded: bool,
    pub touching_bound: bool,
    pub interaction: InteractionState,
    pub contact: ContactState,
    pub hitbox: Option<Hitbox>,
    pub intent: IntentSource,
    pub active: bool,
    pub tag: Tag,
    /// Hosting tile in infinite levels
    pub tile: Option<usize>,
}

impl Actor {
    pub fn player(policy: ActorPolicy, rig: &ActorRig) -> Result<Self, SimError> {
        if !rig.ground_sensor {
            return Err(SimError::MissingCollaborator("player ground sensor"));
        }
        if !policy.is_projectile_user && !rig.player_hitbox {
            return Err(SimError::MissingCollaborator("player interaction hitbox"));
        }
        Ok(Self::build(
            ActorId::PLAYER,
            ActorKind::Player,
            policy,
            Vec2::ZERO,
            IntentSource::Human(HumanInput::default()),
        ))
    }

    pub fn npc<R: RandomSource + ?Sized>(
        id: ActorId,
        policy: ActorPolicy,
        pos: Vec2,
        rng: &mut R,
    ) -> Self {
        Self::build(
            id,
            ActorKind::Npc,
            policy,
            pos,
            IntentSource::Autonomous(InteractTimer::armed(rng)),
        )
    }

    fn build(
        id: ActorId,
        kind: ActorKind,
        policy: ActorPolicy,
        pos: Vec2,
        intent: IntentSource,
    ) -> Self {
        let hitbox = (!policy.is_projectile_user).then_some(Hitbox {
            offset: HITBOX_OFFSET,
            open: false,
        });
        Self {
            id,
            kind,
            pos,
            facing: Facing::Right,
            flip_x: false,
            grounded: false,
            touching_bound: false,
            interaction: InteractionState::Idle,
            contact: ContactState::Active,
            hitbox,
            intent,
            active: true,
            tag: match kind {
                ActorKind::Player => Tag::Untagged,
                ActorKind::Npc => Tag::Npc,
            },
            tile: None,
            policy,
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }

    pub fn speed(&self) -> f32 {
        match self.kind {
            ActorKind::Player if self.grounded => GROUND_SPEED,
            ActorKind::Player => AIR_SPEED,
            ActorKind::Npc => NPC_SPEED,
        }
    }

    pub fn hitbox_open(&self) -> bool {
        self.hitbox.is_some_and(|h| h.open)
    }

    fn movement_locked(&self) -> bool {
        match self.interaction {
            InteractionState::Idle => false,
            InteractionState::PreInteractDelay { .. } => self.policy.stop_before_interact,
            InteractionState::Interacting { .. } => true,
            InteractionState::PostInteractCooldown { .. } => true,
        }
    }

    /// Turn to `dir`. The sprite flips only when facing actually changes.
    pub fn set_facing(&mut self, dir: Facing, ctx: &mut SimContext<'_>) {
        self.facing = dir;
        let flip = dir == Facing::Left;
        if flip != self.flip_x {
            self.flip_x = flip;
            ctx.out.emit(Entity::Actor(self.id), CommandOp::SpriteFlip(flip));
        }

        if let Some(hitbox) = &mut self.hitbox {
            hitbox.offset = HITBOX_OFFSET * dir.sign();
            let at = Vec2::new(self.pos.x + hitbox.offset, self.pos.y);
            ctx.out.emit(Entity::Hitbox(self.id), CommandOp::SetPosition(at));
        }

        if self.is_player() {
            ctx.scroll.follow_facing(self.pos.x, dir);
            ctx.out.emit(
                Entity::Actor(self.id),
                CommandOp::AnimationBool(anim::IS_WALKING, true),
            );
        }
    }

    /// Turn using a raw direction; anything but -1 or +1 is rejected
    pub fn set_facing_raw(&mut self, dir: i32, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let dir = Facing::try_from(dir).inspect_err(|e| {
            log::debug!("Actor {} facing request ignored: {}", self.id.0, e);
        })?;
        self.set_facing(dir, ctx);
        Ok(())
    }

    pub fn set_grounded(&mut self, grounded: bool, out: &mut Outbox) {
        if self.grounded != grounded {
            self.grounded = grounded;
            out.emit(
                Entity::Actor(self.id),
                CommandOp::AnimationBool(anim::ON_GROUND, grounded),
            );
        }
    }

    /// Advance one tick. Returns true if the actor was disabled this tick.
    pub fn update(&mut self, held: &HeldIntents, ctx: &mut SimContext<'_>, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        match self.contact {
            ContactState::Active => {}
            ContactState::InContact { ticks_left } => {
                if ticks_left <= 1 {
                    self.finish_contact(ctx.out);
                    return true;
                }
                self.contact = ContactState::InContact {
                    ticks_left: ticks_left - 1,
                };
                return false;
            }
            ContactState::Disabled => return false,
        }

        self.advance_interaction(ctx);
        let intent = self.poll_intent(held);

        if intent.jump && self.grounded {
            let target = Entity::Actor(self.id);
            ctx.out.emit(target, CommandOp::SetVelocity(Vec2::new(0.0, JUMP_VELOCITY)));
            ctx.out.emit(target, CommandOp::PlaySound(SoundCue::Jump));
        }

        match self.kind {
            ActorKind::Player => self.steer_player(intent.horizontal, ctx, dt),
            ActorKind::Npc => {
                if !self.movement_locked() {
                    self.translate(self.facing.sign() * self.speed() * dt, ctx.out);
                }
            }
        }

        if intent.interact && self.interaction == InteractionState::Idle {
            self.begin_interaction(ctx.out);
        }

        if self.is_player() && self.pos.y <= FALL_OUT_Y {
            log::debug!("Player fell out at y={:.2}", self.pos.y);
            self.begin_contact(Instigator::None, ctx);
        }
        false
    }

    fn poll_intent(&mut self, held: &HeldIntents) -> Intent {
        let idle = self.interaction == InteractionState::Idle;
        match &mut self.intent {
            IntentSource::Human(input) => input.poll(held),
            IntentSource::Autonomous(timer) => Intent {
                horizontal: None,
                jump: false,
                interact: idle && timer.tick(),
            },
        }
    }

    fn steer_player(&mut self, horizontal: Option<Facing>, ctx: &mut SimContext<'_>, dt: f32) {
        match horizontal {
            Some(_) if self.movement_locked() => {}
            Some(dir) => {
                self.set_facing(dir, ctx);
                ctx.scroll.cancel_recenter();
                let delta = dir.sign() * self.speed() * dt;
                if ctx.scroll.level_scrolls() && !self.touching_bound {
                    // Outside the screen band the level waits for re-centering
                    ctx.scroll.move_level(delta, self.pos.x, self.touching_bound);
                } else {
                    self.translate(delta, ctx.out);
                }
            }
            None => {
                // Infinite levels ignore this and keep scrolling left
                let _ = ctx.scroll.set_scroll_direction(0);
                ctx.out.emit(
                    Entity::Actor(self.id),
                    CommandOp::AnimationBool(anim::IS_WALKING, false),
                );
                ctx.scroll.arm_recenter();
            }
        }
    }

    fn translate(&mut self, dx: f32, out: &mut Outbox) {
        self.pos.x += dx;
        out.emit(Entity::Actor(self.id), CommandOp::SetPosition(self.pos));
    }

    fn begin_interaction(&mut self, out: &mut Outbox) {
        let ticks_left = if self.policy.stop_before_interact {
            ticks_for(STOP_TO_INTERACT_DELAY)
        } else {
            1
        };
        self.interaction = InteractionState::PreInteractDelay { ticks_left };
        out.emit(
            Entity::Actor(self.id),
            CommandOp::AnimationTrigger(anim::INTERACT),
        );
    }

    fn advance_interaction(&mut self, ctx: &mut SimContext<'_>) {
        let current = self.interaction;
        self.interaction = match current {
            InteractionState::Idle => InteractionState::Idle,
            InteractionState::PreInteractDelay { ticks_left } if ticks_left > 1 => {
                InteractionState::PreInteractDelay {
                    ticks_left: ticks_left - 1,
                }
            }
            InteractionState::PreInteractDelay { .. } => {
                self.open_interaction_window(ctx);
                InteractionState::Interacting {
                    ticks_left: ticks_for(INTERACT_DURATION),
                }
            }
            InteractionState::Interacting { ticks_left } if ticks_left > 1 => {
                InteractionState::Interacting {
                    ticks_left: ticks_left - 1,
                }
            }
            InteractionState::Interacting { .. } => {
                let had_hitbox = self.close_hitbox(ctx.out);
                ctx.out.emit(
                    Entity::Actor(self.id),
                    CommandOp::ResetAnimationTrigger(anim::INTERACT),
                );
                if had_hitbox && self.kind == ActorKind::Npc {
                    InteractionState::PostInteractCooldown {
                        ticks_left: ticks_for(INTERACT_RECOVERY),
                    }
                } else {
                    self.return_to_idle(ctx.rng)
                }
            }
            InteractionState::PostInteractCooldown { ticks_left } if ticks_left > 1 => {
                InteractionState::PostInteractCooldown {
                    ticks_left: ticks_left - 1,
                }
            }
            InteractionState::PostInteractCooldown { .. } => self.return_to_idle(ctx.rng),
        };
    }

    fn return_to_idle<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> InteractionState {
        if let IntentSource::Autonomous(timer) = &mut self.intent {
            timer.arm(rng);
        }
        InteractionState::Idle
    }

    fn open_interaction_window(&mut self, ctx: &mut SimContext<'_>) {
        ctx.out.emit(
            Entity::Actor(self.id),
            CommandOp::PlaySound(SoundCue::Interact),
        );
        if self.policy.is_projectile_user {
            if let Err(e) = ctx.pool.acquire(self.pos, self.facing, ctx.out) {
                log::debug!("Actor {} shot dropped: {}", self.id.0, e);
            }
            return;
        }
        if let Some(hitbox) = &mut self.hitbox {
            hitbox.open = true;
            ctx.out.emit(Entity::Hitbox(self.id), CommandOp::SetActive(true));
        }
    }

    /// Close the melee hitbox. Returns whether the actor has one.
    pub fn close_hitbox(&mut self, out: &mut Outbox) -> bool {
        match &mut self.hitbox {
            Some(hitbox) => {
                if hitbox.open {
                    hitbox.open = false;
                    out.emit(Entity::Hitbox(self.id), CommandOp::SetActive(false));
                }
                true
            }
            None => false,
        }
    }

    pub fn reverse(&mut self, ctx: &mut SimContext<'_>) {
        self.set_facing(self.facing.flipped(), ctx);
    }

    /// Enter contact resolution. Returns false (and does nothing) if the
    /// actor has already been contacted since its last activation.
    pub fn begin_contact(&mut self, instigator: Instigator, ctx: &mut SimContext<'_>) -> bool {
        if !self.active || self.contact != ContactState::Active {
            return false;
        }
        self.contact = ContactState::InContact {
            ticks_left: ticks_for(CONTACT_DURATION),
        };
        self.interaction = InteractionState::Idle;
        self.close_hitbox(ctx.out);

        let target = Entity::Actor(self.id);
        ctx.out.emit(target, CommandOp::SetCollisionLayer(CollisionLayer::Contact));
        ctx.out.emit(target, CommandOp::PlaySound(SoundCue::Contact));
        ctx.out.emit(target, CommandOp::AnimationTrigger(anim::CONTACT));

        match self.kind {
            ActorKind::Player => {
                ctx.scroll.cancel_recenter();
                let _ = ctx.scroll.set_scroll_direction(0);
                ctx.out.emit(target, CommandOp::AnimationBool(anim::ON_GROUND, false));
                ctx.out.emit(target, CommandOp::AnimationBool(anim::IS_WALKING, false));
                ctx.out.emit(target, CommandOp::AnimationBool(anim::KNOCKED_OUT, true));
            }
            ActorKind::Npc => {
                ctx.out.emit(target, CommandOp::AnimationBool(anim::IS_ACTIVE, false));
            }
        }

        if self.policy.knockback_on_contact {
            let m = self.policy.knockback_magnitude;
            let dir = match instigator {
                Instigator::Melee { x } if x < self.pos.x => 1.0,
                Instigator::Melee { .. } => -1.0,
                Instigator::Projectile | Instigator::None => -self.facing.sign(),
            };
            ctx.out.emit(target, CommandOp::SetVelocity(Vec2::new(dir * m, m)));
        }

        // Only the player contacting an NPC scores
        if self.kind == ActorKind::Npc {
            let total = ctx.score.add_points(NPC_CONTACT_POINTS);
            ctx.out.notify(GameEvent::ScoreChanged { total });
        }

        log::debug!("Actor {} contacted ({:?})", self.id.0, instigator);
        true
    }

    fn finish_contact(&mut self, out: &mut Outbox) {
        self.contact = ContactState::Disabled;
        if self.policy.disappear_on_contact {
            self.deactivate(out);
        } else {
            self.tag = Tag::Untagged;
            out.emit(Entity::Actor(self.id), CommandOp::SetTag(Tag::Untagged));
            out.emit(Entity::Actor(self.id), CommandOp::SetKinematic(true));
        }
    }

    /// Remove the actor from the simulation
    pub fn deactivate(&mut self, out: &mut Outbox) {
        self.active = false;
        self.close_hitbox(out);
        out.emit(Entity::Actor(self.id), CommandOp::SetActive(false));
    }

    /// Reset a pooled actor for reuse at `pos`
    pub fn reprime<R: RandomSource + ?Sized>(&mut self, pos: Vec2, rng: &mut R, out: &mut Outbox) {
        self.pos = pos;
        self.active = true;
        self.contact = ContactState::Active;
        self.interaction = InteractionState::Idle;
        self.tag = Tag::Npc;
        if let Some(hitbox) = &mut self.hitbox {
            hitbox.open = false;
        }
        if let IntentSource::Autonomous(timer) = &mut self.intent {
            timer.arm(rng);
        }

        let target = Entity::Actor(self.id);
        out.emit(target, CommandOp::SetPosition(pos));
        out.emit(target, CommandOp::SetTag(Tag::Npc));
        out.emit(target, CommandOp::SetCollisionLayer(CollisionLayer::Npc));
        out.emit(target, CommandOp::SetKinematic(false));
        out.emit(target, CommandOp::ResetAnimationTrigger(anim::CONTACT));
        out.emit(target, CommandOp::ResetAnimationTrigger(anim::INTERACT));
        out.emit(target, CommandOp::AnimationBool(anim::IS_ACTIVE, true));
        out.emit(target, CommandOp::SetActive(true));
    }

    /// Classify a collision event addressed to this actor
    pub fn reaction(&self, event: &CollisionEvent) -> Reaction {
        use ContactPhase::*;
        match (self.kind, event.other, event.trigger, event.phase) {
            (ActorKind::Player, Tag::Platform, false, Enter | Stay) => Reaction::Grounded(true),
            (ActorKind::Player, Tag::Platform, false, Exit) => Reaction::Grounded(false),
            (ActorKind::Player, Tag::Bound, false, Enter | Stay) => Reaction::TouchBound(true),
            (ActorKind::Player, Tag::Bound, false, Exit) => Reaction::TouchBound(false),
            (ActorKind::Player, Tag::Coin, true, Enter) => Reaction::CollectCoin,
            (ActorKind::Player, Tag::Npc, true, Enter) => Reaction::Contact,

            (ActorKind::Npc, Tag::Bound | Tag::Npc, false, Enter) => Reaction::Reverse,
            (ActorKind::Npc, Tag::PlayerInteract, false, Enter) => Reaction::Contact,
            (ActorKind::Npc, Tag::PlayerInteract, true, Enter | Stay) => Reaction::Contact,
            (ActorKind::Npc, Tag::PlatformEdge, true, Enter)
                if !self.policy.can_fall_off_platforms =>
            {
                Reaction::Reverse
            }
            _ => Reaction::None,
        }
    }
}
