//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::actor::{ContactState, HeldIntents, Instigator, Reaction};
use super::events::{
    ActorId, BodySample, CoinId, CollisionEvent, CommandOp, Entity, EntityRef, GameEvent,
    PoolKind, SoundCue,
};
use super::state::{GamePhase, GameState};
use super::tile::TileTick;
use crate::consts::*;

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held movement keys
    pub move_left: bool,
    pub move_right: bool,
    /// Held jump key (edges are derived by the player)
    pub jump: bool,
    /// Held interact key
    pub interact: bool,
    /// Collision and trigger callbacks since the last tick
    pub collisions: Vec<CollisionEvent>,
    /// Physics-integrated positions
    pub bodies: Vec<BodySample>,
}

impl TickInput {
    pub fn held(&self) -> HeldIntents {
        HeldIntents {
            move_left: self.move_left,
            move_right: self.move_right,
            jump: self.jump,
            interact: self.interact,
        }
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.time_ticks += 1;

    for sample in &input.bodies {
        if let Some(actor) = state.actor_mut(sample.actor) {
            actor.pos = sample.pos;
        }
    }

    for event in &input.collisions {
        handle_collision(state, event);
    }

    // Player
    let held = input.held();
    let player_down = match state.actor_with_context(ActorId::PLAYER) {
        Some((player, mut ctx)) => player.update(&held, &mut ctx, dt),
        None => false,
    };
    if player_down && state.phase == GamePhase::Playing {
        log::info!(
            "Player down at tick {}, score {}",
            state.time_ticks,
            state.score.total()
        );
        state.phase = GamePhase::Over;
        state.outbox.notify(GameEvent::PlayerDown);
    }

    if state.player.active {
        let before = state.player.pos.x;
        let speed = state.player.speed();
        state.scroll.tick_recenter(&mut state.player.pos.x, speed, dt);
        if state.player.pos.x != before {
            state.outbox.emit(
                Entity::Actor(ActorId::PLAYER),
                CommandOp::SetPosition(state.player.pos),
            );
        }
    }

    // NPCs never read held keys
    let autonomous = HeldIntents::default();
    for i in 0..state.npcs.len() {
        let id = state.npcs[i].id;
        if let Some((npc, mut ctx)) = state.actor_with_context(id) {
            npc.update(&autonomous, &mut ctx, dt);
        }
    }

    state.player_pool.tick(dt, &mut state.outbox);
    state.npc_pool.tick(dt, &mut state.outbox);

    tick_tiles(state, dt);
    state.scroll.tick(dt, &mut state.outbox);

    // Level-parented objects follow the level root
    let shift = state.scroll.take_pending_shift(&mut state.outbox);
    if shift != Vec2::ZERO {
        for npc in &mut state.npcs {
            npc.pos += shift;
        }
        for coin in &mut state.coins {
            coin.pos += shift;
        }
        state.npc_pool.shift(shift);
    }
}

fn handle_collision(state: &mut GameState, event: &CollisionEvent) {
    let Some(actor) = state.actor(event.subject) else {
        log::warn!("Collision for unknown actor {}", event.subject.0);
        return;
    };
    if !actor.active {
        return;
    }
    let is_player = actor.is_player();

    match actor.reaction(event) {
        Reaction::None => {}
        Reaction::Grounded(grounded) => {
            if let Some((actor, ctx)) = state.actor_with_context(event.subject) {
                actor.set_grounded(grounded, ctx.out);
            }
        }
        Reaction::TouchBound(touching) => {
            if let Some(actor) = state.actor_mut(event.subject) {
                actor.touching_bound = touching;
            }
        }
        Reaction::Reverse => {
            if let Some((actor, mut ctx)) = state.actor_with_context(event.subject) {
                if actor.contact == ContactState::Active {
                    actor.reverse(&mut ctx);
                }
            }
        }
        Reaction::CollectCoin => match event.other_ref {
            Some(EntityRef::Coin(id)) => collect_coin(state, id),
            _ => log::debug!("Coin trigger without a coin reference"),
        },
        Reaction::Contact => {
            let instigator = resolve_instigator(state, is_player, event.other_ref);
            if !is_player {
                consume_interaction(state, event.other_ref);
            }
            if let Some((actor, mut ctx)) = state.actor_with_context(event.subject) {
                actor.begin_contact(instigator, &mut ctx);
            }
        }
    }
}

/// Work out who caused a contact. Without a reference, fall back on the
/// weapon the opposing side is configured with.
fn resolve_instigator(state: &GameState, is_player: bool, other: Option<EntityRef>) -> Instigator {
    match other {
        Some(EntityRef::Projectile(_)) => Instigator::Projectile,
        Some(other @ (EntityRef::Hitbox(_) | EntityRef::Actor(_))) => state
            .position_of(other)
            .map_or(Instigator::None, |pos| Instigator::Melee { x: pos.x }),
        Some(EntityRef::Coin(_)) => Instigator::None,
        None if is_player => {
            if state.config.npc.is_shooter {
                Instigator::Projectile
            } else {
                Instigator::None
            }
        }
        None => {
            if state.config.player.is_shooter {
                Instigator::Projectile
            } else {
                Instigator::Melee {
                    x: state.player.pos.x,
                }
            }
        }
    }
}

/// The object that touched an NPC is spent: projectiles return to their pool,
/// melee hitboxes close
fn consume_interaction(state: &mut GameState, other: Option<EntityRef>) {
    match other {
        Some(EntityRef::Projectile(handle)) => {
            let released = match handle.pool {
                PoolKind::Player => state.player_pool.release(handle, &mut state.outbox),
                PoolKind::Npc => state.npc_pool.release(handle, &mut state.outbox),
            };
            if !released {
                log::debug!("Projectile {:?} already inactive", handle);
            }
        }
        Some(EntityRef::Hitbox(owner)) => {
            if let Some((actor, ctx)) = state.actor_with_context(owner) {
                actor.close_hitbox(ctx.out);
            }
        }
        _ => {}
    }
}

fn collect_coin(state: &mut GameState, id: CoinId) {
    let Some(coin) = state.coins.get_mut(id.0 as usize) else {
        return;
    };
    if !coin.active {
        return;
    }
    coin.active = false;
    state.outbox.emit(Entity::Coin(id), CommandOp::SetActive(false));
    state.outbox.emit(
        Entity::Actor(ActorId::PLAYER),
        CommandOp::PlaySound(SoundCue::Collect),
    );
    let total = state.score.add_points(COIN_POINTS);
    state.outbox.notify(GameEvent::ScoreChanged { total });
}

/// Scroll infinite tiles, carrying hosted objects and recycling off-screen tiles
fn tick_tiles(state: &mut GameState, dt: f32) {
    for index in 0..state.tiles.len() {
        match state.tiles[index].tick(dt, &mut state.rng) {
            TileTick::Scrolled { shift } => {
                for npc in state.npcs.iter_mut().filter(|n| n.tile == Some(index)) {
                    npc.pos += shift;
                }
                for coin in state.coins.iter_mut().filter(|c| c.tile == Some(index)) {
                    coin.pos += shift;
                }
            }
            TileTick::Recycled { variant } => {
                state.hide_tile_variants(index);
                if let Some(variant) = variant {
                    state.show_tile_variant(index, variant);
                }
                log::trace!("Tile {} recycled with variant {:?}", index, variant);
                state
                    .outbox
                    .notify(GameEvent::TileRecycled { tile: index, variant });
            }
        }
        let pos = state.tiles[index].pos;
        state
            .outbox
            .emit(Entity::Tile(index), CommandOp::SetPosition(pos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelConfig, LevelPreset};
    use crate::sim::events::{ContactPhase, ProjectileHandle, Tag};
    use crate::sim::level::{Placement, Prefab};
    use crate::sim::tile::TileVariantKind;

    fn authored(preset: LevelPreset, children: Vec<Placement>) -> GameState {
        let mut config = LevelConfig::from_preset(preset);
        config.procedurally_generate_level = false;
        config.authored_layout = children;
        GameState::new(config, 12345).unwrap()
    }

    fn with_collisions(collisions: Vec<CollisionEvent>) -> TickInput {
        TickInput {
            collisions,
            ..Default::default()
        }
    }

    #[test]
    fn test_melee_contact_scores_once() {
        let mut state = authored(
            LevelPreset::Fixed,
            vec![Placement::new(Prefab::NpcPlatform, Vec2::new(3.0, 0.0))],
        );
        assert_eq!(state.npcs.len(), 1);
        let npc = state.npcs[0].id;
        let hit = CollisionEvent::trigger(npc, Tag::PlayerInteract, ContactPhase::Enter)
            .with_ref(EntityRef::Hitbox(ActorId::PLAYER));

        tick(&mut state, &with_collisions(vec![hit]), SIM_DT);
        assert_eq!(state.score.total(), 100);
        assert!(matches!(state.npcs[0].contact, ContactState::InContact { .. }));
        assert!(state
            .outbox
            .events
            .contains(&GameEvent::ScoreChanged { total: 100 }));

        let stay = CollisionEvent { phase: ContactPhase::Stay, ..hit };
        tick(&mut state, &with_collisions(vec![hit, stay]), SIM_DT);
        assert_eq!(state.score.total(), 100);

        // Player is left of the NPC: knocked to the right
        let v: Vec<Vec2> = state
            .outbox
            .commands_for(Entity::Actor(npc))
            .filter_map(|op| match op {
                CommandOp::SetVelocity(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(v.len(), 1);
        assert!(v[0].x > 0.0);
    }

    #[test]
    fn test_player_shot_is_consumed_on_contact() {
        let mut config = LevelConfig::from_preset(LevelPreset::Fixed);
        config.procedurally_generate_level = false;
        config.authored_layout = vec![Placement::new(Prefab::NpcPlatform, Vec2::new(3.0, 0.0))];
        config.player.is_shooter = true;
        let mut state = GameState::new(config, 1).unwrap();

        let shoot = TickInput {
            interact: true,
            ..Default::default()
        };
        tick(&mut state, &shoot, SIM_DT);
        tick(&mut state, &shoot, SIM_DT);
        assert_eq!(state.player_pool.active_count(), 1);

        let handle = ProjectileHandle {
            pool: PoolKind::Player,
            slot: 0,
        };
        let hit = CollisionEvent::collision(state.npcs[0].id, Tag::PlayerInteract, ContactPhase::Enter)
            .with_ref(EntityRef::Projectile(handle));
        tick(&mut state, &with_collisions(vec![hit]), SIM_DT);
        assert_eq!(state.player_pool.active_count(), 0);
        assert_eq!(state.score.total(), 100);
    }

    #[test]
    fn test_coin_collection() {
        let mut state = authored(
            LevelPreset::Fixed,
            vec![Placement::new(Prefab::CoinPlatform, Vec2::new(-3.0, 0.0))],
        );
        assert_eq!(state.coins.len(), 1);
        let touch = CollisionEvent::trigger(ActorId::PLAYER, Tag::Coin, ContactPhase::Enter)
            .with_ref(EntityRef::Coin(CoinId(0)));

        tick(&mut state, &with_collisions(vec![touch]), SIM_DT);
        assert_eq!(state.score.total(), COIN_POINTS as u64);
        assert!(!state.coins[0].active);

        tick(&mut state, &with_collisions(vec![touch]), SIM_DT);
        assert_eq!(state.score.total(), COIN_POINTS as u64);
    }

    #[test]
    fn test_fall_out_ends_the_game() {
        let mut state = authored(LevelPreset::Fixed, Vec::new());
        let fall = TickInput {
            bodies: vec![BodySample {
                actor: ActorId::PLAYER,
                pos: Vec2::new(0.0, FALL_OUT_Y - 1.0),
            }],
            ..Default::default()
        };
        tick(&mut state, &fall, SIM_DT);
        assert!(matches!(state.player.contact, ContactState::InContact { .. }));
        assert_eq!(state.phase, GamePhase::Playing);

        for _ in 0..crate::ticks_for(CONTACT_DURATION) {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.phase, GamePhase::Over);
        assert!(state.outbox.events.contains(&GameEvent::PlayerDown));
        // Contact is not scored for the player
        assert_eq!(state.score.total(), 0);
    }

    #[test]
    fn test_npc_reverses_at_bound() {
        let mut state = authored(
            LevelPreset::Fixed,
            vec![Placement::new(Prefab::NpcPlatform, Vec2::new(3.0, 0.0))],
        );
        let npc = state.npcs[0].id;
        let start = state.npcs[0].facing;
        let bump = CollisionEvent::collision(npc, Tag::Bound, ContactPhase::Enter);
        tick(&mut state, &with_collisions(vec![bump]), SIM_DT);
        assert_eq!(state.npcs[0].facing, start.flipped());
    }

    #[test]
    fn test_scrolling_shifts_level_objects() {
        let mut state = authored(
            LevelPreset::Scrolling,
            vec![Placement::new(Prefab::CoinPlatform, Vec2::new(-3.0, 0.0))],
        );
        let grounded = CollisionEvent::collision(ActorId::PLAYER, Tag::Platform, ContactPhase::Stay);
        tick(&mut state, &with_collisions(vec![grounded]), SIM_DT);
        let coin_x = state.coins[0].pos.x;

        let right = TickInput {
            move_right: true,
            ..Default::default()
        };
        tick(&mut state, &right, SIM_DT);
        assert_eq!(state.player.pos.x, 0.0);
        let moved = state.coins[0].pos.x - coin_x;
        assert!((moved + GROUND_SPEED * SIM_DT).abs() < 1e-5);
    }

    #[test]
    fn test_infinite_tiles_recycle() {
        let mut state = GameState::new(LevelConfig::from_preset(LevelPreset::Infinite), 3).unwrap();
        let mut recycled = 0;
        // Long enough for every tile to cross the screen
        for _ in 0..(SIM_HZ as usize * 10) {
            state.outbox.clear();
            tick(&mut state, &TickInput::default(), SIM_DT);
            recycled += state
                .outbox
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::TileRecycled { .. }))
                .count();
            for tile in &state.tiles {
                assert!(tile.pos.x <= TILE_X_EXTENT);
                assert!(tile.variants.iter().filter(|v| v.active).count() <= 1);
            }
        }
        assert!(recycled > 0);
        assert_eq!(state.scroll.direction(), -1);
    }

    /// Wrap tile 0 immediately until it comes back showing `variant`
    fn recycle_until_shown(state: &mut GameState, variant: usize) {
        for _ in 0..64 {
            state.tiles[0].pos.x = -TILE_X_EXTENT;
            state.outbox.clear();
            tick(state, &TickInput::default(), SIM_DT);
            if state.tiles[0].active_variant() == Some(variant) {
                return;
            }
        }
        panic!("tile 0 never showed variant {}", variant);
    }

    #[test]
    fn test_recycled_tile_reprimes_contacted_npc() {
        let mut state = GameState::new(LevelConfig::from_preset(LevelPreset::Infinite), 8).unwrap();
        let with_npc = state.tiles[0]
            .variants
            .iter()
            .position(|v| v.kind == TileVariantKind::WithNpc)
            .unwrap();
        let npc = state.tiles[0].variants[with_npc].npc.unwrap();
        let index = npc.0 as usize - 1;
        let hit = CollisionEvent::trigger(npc, Tag::PlayerInteract, ContactPhase::Enter)
            .with_ref(EntityRef::Hitbox(ActorId::PLAYER));

        recycle_until_shown(&mut state, with_npc);
        assert!(state.npcs[index].active);
        tick(&mut state, &with_collisions(vec![hit]), SIM_DT);
        assert_eq!(state.score.total(), NPC_CONTACT_POINTS as u64);
        for _ in 0..crate::ticks_for(CONTACT_DURATION) {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.npcs[index].contact, ContactState::Disabled);
        assert!(!state.npcs[index].active);

        recycle_until_shown(&mut state, with_npc);
        let revived = &state.npcs[index];
        assert!(revived.active);
        assert_eq!(revived.contact, ContactState::Active);
        assert_eq!(revived.tag, Tag::Npc);

        // Contactable again, and scored again
        tick(&mut state, &with_collisions(vec![hit]), SIM_DT);
        assert_eq!(state.score.total(), 2 * NPC_CONTACT_POINTS as u64);
        assert!(matches!(state.npcs[index].contact, ContactState::InContact { .. }));
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let config = LevelConfig::from_preset(LevelPreset::Scrolling);
        let mut state1 = GameState::new(config.clone(), 99999).unwrap();
        let mut state2 = GameState::new(config, 99999).unwrap();

        let inputs = [
            TickInput {
                move_right: true,
                ..Default::default()
            },
            TickInput {
                interact: true,
                ..Default::default()
            },
            TickInput {
                move_left: true,
                jump: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for _ in 0..60 {
            for input in &inputs {
                tick(&mut state1, input, SIM_DT);
                tick(&mut state2, input, SIM_DT);
            }
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.npcs.len(), state2.npcs.len());
        assert_eq!(state1.player.pos, state2.player.pos);
        assert_eq!(state1.scroll.level_offset(), state2.scroll.level_offset());
        assert_eq!(state1.outbox.commands, state2.outbox.commands);
        for (a, b) in state1.npcs.iter().zip(&state2.npcs) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.interaction, b.interaction);
        }
    }
}
