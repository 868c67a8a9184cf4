//! Game state and core simulation types
//!
//! `GameState` is the simulation context: it owns the actors, both
//! projectile pools, the scroll coordinator and the score, and lends them
//! to actor operations explicitly.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorPolicy, ActorRig, SimContext};
use super::events::{
    ActorId, CoinId, CommandOp, Entity, EntityRef, GameEvent, Outbox, PoolKind,
};
use super::level::{self, LevelLayout, LevelMode, PieceKind, Prefab, RandomSource};
use super::pool::ProjectilePool;
use super::score::ScoreTracker;
use super::scroll::ScrollCoordinator;
use super::tile::{InfiniteTile, TileVariant, TileVariantKind};
use crate::config::LevelConfig;
use crate::consts::*;
use crate::error::SimError;

/// Horizontal facing. Always one of the two; never unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(&self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

impl TryFrom<i32> for Facing {
    type Error = SimError;

    fn try_from(dir: i32) -> Result<Self, Self::Error> {
        match dir {
            -1 => Ok(Facing::Left),
            1 => Ok(Facing::Right),
            other => Err(SimError::InvalidDirection(other)),
        }
    }
}

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Player has been disabled; the host shows its play-again UI
    Over,
}

/// Seeded RNG for generation and timer jitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimRng {
    seed: u64,
    rng: Pcg32,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SimRng {
    fn roll(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 0;
        }
        self.rng.random_range(0..sides)
    }

    fn jitter(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }
}

/// A collectible coin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub pos: Vec2,
    pub active: bool,
    /// Hosting tile in infinite levels
    pub tile: Option<usize>,
}

/// Complete simulation state for one level (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: LevelConfig,
    pub rng: SimRng,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub layout: LevelLayout,
    pub player: Actor,
    /// NPCs in id order; `ActorId(n)` lives at index `n - 1`
    pub npcs: Vec<Actor>,
    pub coins: Vec<Coin>,
    pub tiles: Vec<InfiniteTile>,
    pub player_pool: ProjectilePool,
    pub npc_pool: ProjectilePool,
    pub scroll: ScrollCoordinator,
    pub score: ScoreTracker,
    /// Output not yet drained by the host; not part of a snapshot
    #[serde(skip)]
    pub outbox: Outbox,
}

impl GameState {
    /// Build a level with every engine collaborator present
    pub fn new(config: LevelConfig, seed: u64) -> Result<Self, SimError> {
        Self::with_rig(config, seed, ActorRig::default())
    }

    /// Build a level, generating its layout and stocking actors and coins
    pub fn with_rig(config: LevelConfig, seed: u64, rig: ActorRig) -> Result<Self, SimError> {
        let config = config.normalized();
        let mode = config.mode();
        let mut rng = SimRng::new(seed);

        let layout = level::generate(mode, &config, &mut rng);
        let player = Actor::player(ActorPolicy::player(&config.player), &rig)?;
        let npc_policy = ActorPolicy::npc(&config.npc);
        if !npc_policy.is_projectile_user && !rig.npc_hitbox {
            return Err(SimError::MissingCollaborator("NPC interaction hitbox"));
        }

        let mut state = Self {
            rng,
            phase: GamePhase::Playing,
            time_ticks: 0,
            player,
            npcs: Vec::new(),
            coins: Vec::new(),
            tiles: Vec::new(),
            player_pool: ProjectilePool::new(PoolKind::Player, PLAYER_POOL_SIZE),
            npc_pool: ProjectilePool::new(PoolKind::Npc, config.npc.pool_size),
            scroll: ScrollCoordinator::new(mode, config.scroll_bound_size),
            score: ScoreTracker::new(),
            outbox: Outbox::default(),
            layout,
            config,
        };
        state.stock_level(npc_policy);

        log::info!(
            "Level ready: mode={:?}, children={}, npcs={}, coins={}, tiles={}",
            mode,
            state.layout.child_count(),
            state.npcs.len(),
            state.coins.len(),
            state.tiles.len()
        );
        state.outbox.notify(GameEvent::LevelGenerated {
            children: state.layout.child_count(),
            attempts: state.layout.attempts,
        });
        Ok(state)
    }

    pub fn mode(&self) -> LevelMode {
        self.scroll.mode()
    }

    fn stock_level(&mut self, npc_policy: ActorPolicy) {
        let placements = self.layout.children.clone();
        for placement in &placements {
            if placement.prefab == Prefab::Tile {
                self.add_tile(placement.pos, &npc_policy);
                continue;
            }
            for piece in placement.pieces() {
                let pos = placement.pos + piece.offset;
                match piece.kind {
                    PieceKind::Platform => {}
                    PieceKind::Coin => {
                        self.add_coin(pos, None, true);
                    }
                    PieceKind::Npc => {
                        self.add_npc(pos, &npc_policy, None, true);
                    }
                }
            }
        }
    }

    fn add_coin(&mut self, pos: Vec2, tile: Option<usize>, active: bool) -> CoinId {
        let id = CoinId(self.coins.len() as u32);
        self.coins.push(Coin {
            id,
            pos,
            active,
            tile,
        });
        id
    }

    fn add_npc(
        &mut self,
        pos: Vec2,
        policy: &ActorPolicy,
        tile: Option<usize>,
        active: bool,
    ) -> ActorId {
        let id = ActorId(self.npcs.len() as u32 + 1);
        let mut npc = Actor::npc(id, policy.clone(), pos, &mut self.rng);
        npc.tile = tile;
        npc.active = active;
        self.npcs.push(npc);
        id
    }

    fn add_tile(&mut self, pos: Vec2, npc_policy: &ActorPolicy) {
        let index = self.tiles.len();
        let hosted = pos + super::tile::HOSTED_OFFSET;
        let mut variants = Vec::with_capacity(TileVariantKind::ALL.len());
        for kind in TileVariantKind::ALL {
            let mut variant = TileVariant::new(kind);
            match kind {
                TileVariantKind::Plain => {}
                TileVariantKind::WithCoin => {
                    if !self.config.has_no_coins {
                        variant.coin = Some(self.add_coin(hosted, Some(index), false));
                    }
                }
                TileVariantKind::WithNpc => {
                    variant.npc = Some(self.add_npc(hosted, npc_policy, Some(index), false));
                }
            }
            variants.push(variant);
        }

        let mut tile = InfiniteTile::new(index, pos, variants);
        let chosen = tile.choose_initial(&mut self.rng);
        self.tiles.push(tile);
        if let Some(variant) = chosen {
            self.show_tile_variant(index, variant);
        }
    }

    /// Reactivate a variant's pooled objects at the tile
    pub(crate) fn show_tile_variant(&mut self, tile: usize, variant: usize) {
        let Some(t) = self.tiles.get(tile) else {
            return;
        };
        let hosted = t.hosted_pos();
        let Some(v) = t.variants.get(variant).cloned() else {
            return;
        };

        self.outbox.emit(
            Entity::TileVariant { tile, variant },
            CommandOp::SetActive(true),
        );
        if let Some(id) = v.npc {
            if let Some(npc) = self.npcs.get_mut(id.0 as usize - 1) {
                npc.reprime(hosted, &mut self.rng, &mut self.outbox);
            }
        }
        if let Some(id) = v.coin {
            if let Some(coin) = self.coins.get_mut(id.0 as usize) {
                coin.pos = hosted;
                coin.active = true;
                self.outbox.emit(Entity::Coin(id), CommandOp::SetPosition(hosted));
                self.outbox.emit(Entity::Coin(id), CommandOp::SetActive(true));
            }
        }
    }

    /// Hide every variant's pooled objects at a tile
    pub(crate) fn hide_tile_variants(&mut self, tile: usize) {
        let Some(t) = self.tiles.get(tile) else {
            return;
        };
        let variants = t.variants.clone();
        for (variant, v) in variants.iter().enumerate() {
            self.outbox.emit(
                Entity::TileVariant { tile, variant },
                CommandOp::SetActive(false),
            );
            if let Some(id) = v.npc {
                if let Some(npc) = self.npcs.get_mut(id.0 as usize - 1) {
                    if npc.active {
                        npc.deactivate(&mut self.outbox);
                    }
                }
            }
            if let Some(id) = v.coin {
                if let Some(coin) = self.coins.get_mut(id.0 as usize) {
                    if coin.active {
                        coin.active = false;
                        self.outbox.emit(Entity::Coin(id), CommandOp::SetActive(false));
                    }
                }
            }
        }
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        if id == ActorId::PLAYER {
            Some(&self.player)
        } else {
            self.npcs.get(id.0 as usize - 1)
        }
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        if id == ActorId::PLAYER {
            Some(&mut self.player)
        } else {
            self.npcs.get_mut(id.0 as usize - 1)
        }
    }

    /// Borrow one actor together with the collaborators its operations need
    pub fn actor_with_context(&mut self, id: ActorId) -> Option<(&mut Actor, SimContext<'_>)> {
        let (actor, pool) = if id == ActorId::PLAYER {
            (&mut self.player, &mut self.player_pool)
        } else {
            (self.npcs.get_mut((id.0 as usize).checked_sub(1)?)?, &mut self.npc_pool)
        };
        let ctx = SimContext {
            pool,
            scroll: &mut self.scroll,
            score: &mut self.score,
            rng: &mut self.rng,
            out: &mut self.outbox,
        };
        Some((actor, ctx))
    }

    pub fn coin(&self, id: CoinId) -> Option<&Coin> {
        self.coins.get(id.0 as usize)
    }

    pub fn active_npc_count(&self) -> usize {
        self.npcs.iter().filter(|n| n.active).count()
    }

    /// Position of the object behind a collision reference
    pub fn position_of(&self, other: EntityRef) -> Option<Vec2> {
        match other {
            EntityRef::Actor(id) | EntityRef::Hitbox(id) => self.actor(id).map(|a| a.pos),
            EntityRef::Coin(id) => self.coin(id).map(|c| c.pos),
            EntityRef::Projectile(handle) => {
                let pool = match handle.pool {
                    PoolKind::Player => &self.player_pool,
                    PoolKind::Npc => &self.npc_pool,
                };
                pool.get(handle).map(|p| p.pos)
            }
        }
    }

    /// Take the commands and events produced since the last drain
    pub fn drain(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelPreset;

    #[test]
    fn test_facing_from_raw() {
        assert_eq!(Facing::try_from(-1).unwrap(), Facing::Left);
        assert_eq!(Facing::try_from(1).unwrap(), Facing::Right);
        assert!(matches!(
            Facing::try_from(0),
            Err(SimError::InvalidDirection(0))
        ));
        assert_eq!(Facing::Left.flipped(), Facing::Right);
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.roll(8), b.roll(8));
        }
        let j = a.jitter(-1.0, 1.0);
        assert!((-1.0..=1.0).contains(&j));
        assert_eq!(a.roll(1), 0);
    }

    #[test]
    fn test_level_is_stocked_from_layout() {
        let state = GameState::new(LevelConfig::from_preset(LevelPreset::Scrolling), 9).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.npcs.len(), state.layout.count_pieces(PieceKind::Npc));
        assert_eq!(state.coins.len(), state.layout.count_pieces(PieceKind::Coin));
        for (i, npc) in state.npcs.iter().enumerate() {
            assert_eq!(npc.id, ActorId(i as u32 + 1));
            assert_eq!(state.actor(npc.id).map(|a| a.id), Some(npc.id));
        }
        assert_eq!(state.player_pool.capacity(), PLAYER_POOL_SIZE);
        assert_eq!(state.npc_pool.capacity(), NPC_POOL_SIZE);
    }

    #[test]
    fn test_infinite_level_builds_tiles() {
        let state = GameState::new(LevelConfig::from_preset(LevelPreset::Infinite), 4).unwrap();
        assert_eq!(state.mode(), LevelMode::InfiniteAutoScroll);
        assert_eq!(state.tiles.len(), state.layout.child_count());
        for tile in &state.tiles {
            assert_eq!(tile.variants.iter().filter(|v| v.active).count(), 1);
        }
        // One pooled NPC per tile, active only where that variant is shown
        assert_eq!(state.npcs.len(), state.tiles.len());
        let shown = state
            .tiles
            .iter()
            .filter(|t| t.active_variant().map(|v| t.variants[v].npc.is_some()) == Some(true))
            .count();
        assert_eq!(state.active_npc_count(), shown);
    }

    #[test]
    fn test_snapshot_resumes_identically() {
        use crate::sim::tick::{TickInput, tick};

        let config = LevelConfig::from_preset(LevelPreset::Scrolling);
        let mut state = GameState::new(config, 21).unwrap();
        let walk = TickInput {
            move_right: true,
            interact: true,
            ..Default::default()
        };
        for _ in 0..90 {
            tick(&mut state, &walk, SIM_DT);
        }

        let json = serde_json::to_string(&state).unwrap();
        let mut restored: GameState = serde_json::from_str(&json).unwrap();
        assert!(restored.outbox.commands.is_empty());

        for _ in 0..300 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            tick(&mut restored, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.time_ticks, restored.time_ticks);
        assert_eq!(state.score.total(), restored.score.total());
        assert_eq!(state.scroll.level_offset(), restored.scroll.level_offset());
        for (a, b) in state.npcs.iter().zip(&restored.npcs) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.interaction, b.interaction);
        }
        assert_eq!(state.rng.roll(1000), restored.rng.roll(1000));
    }

    #[test]
    fn test_missing_ground_sensor_is_fatal() {
        let rig = ActorRig {
            ground_sensor: false,
            ..ActorRig::default()
        };
        let err = GameState::with_rig(LevelConfig::default(), 1, rig).unwrap_err();
        assert!(matches!(err, SimError::MissingCollaborator(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_melee_npcs_need_a_hitbox() {
        let mut config = LevelConfig::default();
        config.npc.is_shooter = false;
        let rig = ActorRig {
            npc_hitbox: false,
            ..ActorRig::default()
        };
        assert!(GameState::with_rig(config, 1, rig).is_err());
    }
}
