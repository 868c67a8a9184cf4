//! Level layout generation
//!
//! Fixed and scrolling levels are built by rejection sampling: populate a
//! grid of candidate positions at random, and throw the whole layout away
//! if it comes out too sparse. Infinite levels only place recyclable tiles;
//! their gaps are intentional.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;
use crate::consts::*;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelMode {
    Fixed,
    Scrolling,
    InfiniteAutoScroll,
}

/// Source of randomness for generation and timers
pub trait RandomSource {
    /// Uniform integer in `0..sides`
    fn roll(&mut self, sides: u32) -> u32;

    /// Uniform float in `[lo, hi]`
    fn jitter(&mut self, lo: f32, hi: f32) -> f32;

    /// Uniform index into a collection of `len` items
    fn pick(&mut self, len: usize) -> usize {
        self.roll(len as u32) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    Platform,
    Coin,
    Npc,
}

/// One object inside a prefab, relative to the prefab origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub offset: Vec2,
}

impl Piece {
    const fn new(kind: PieceKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            offset: Vec2::new(x, y),
        }
    }
}

/// Spawnable level building blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefab {
    Platform,
    WidePlatform,
    CoinPlatform,
    NpcPlatform,
    CoinPair,
    /// Full-width floor
    BottomPlatform,
    /// Single platform under the spawn point
    SpawnPlatform,
    /// Recyclable auto-scroll tile
    Tile,
}

impl Prefab {
    /// Prefabs drawn at random during generation
    pub const RANDOM_POOL: [Prefab; 5] = [
        Prefab::Platform,
        Prefab::WidePlatform,
        Prefab::CoinPlatform,
        Prefab::NpcPlatform,
        Prefab::CoinPair,
    ];

    pub fn pieces(&self) -> &'static [Piece] {
        use PieceKind::*;
        const PLATFORM: [Piece; 1] = [Piece::new(Platform, 0.0, 0.0)];
        const WIDE: [Piece; 3] = [
            Piece::new(Platform, -1.0, 0.0),
            Piece::new(Platform, 0.0, 0.0),
            Piece::new(Platform, 1.0, 0.0),
        ];
        const COIN_PLATFORM: [Piece; 2] =
            [Piece::new(Platform, 0.0, 0.0), Piece::new(Coin, 0.0, 1.0)];
        const NPC_PLATFORM: [Piece; 2] =
            [Piece::new(Platform, 0.0, 0.0), Piece::new(Npc, 0.0, 1.0)];
        const COIN_PAIR: [Piece; 2] = [Piece::new(Coin, -0.5, 0.0), Piece::new(Coin, 0.5, 0.0)];

        match self {
            Prefab::Platform | Prefab::BottomPlatform | Prefab::SpawnPlatform => &PLATFORM,
            Prefab::WidePlatform => &WIDE,
            Prefab::CoinPlatform => &COIN_PLATFORM,
            Prefab::NpcPlatform => &NPC_PLATFORM,
            Prefab::CoinPair => &COIN_PAIR,
            Prefab::Tile => &[],
        }
    }
}

/// A prefab instance placed in the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub prefab: Prefab,
    pub pos: Vec2,
    #[serde(default)]
    pub coins_removed: bool,
}

impl Placement {
    pub fn new(prefab: Prefab, pos: Vec2) -> Self {
        Self {
            prefab,
            pos,
            coins_removed: false,
        }
    }

    /// Pieces that survive the no-coins pass
    pub fn pieces(&self) -> impl Iterator<Item = &'static Piece> {
        let coins_removed = self.coins_removed;
        self.prefab
            .pieces()
            .iter()
            .filter(move |p| !(coins_removed && p.kind == PieceKind::Coin))
    }

    fn is_empty(&self) -> bool {
        self.prefab != Prefab::Tile && self.pieces().next().is_none()
    }
}

/// Left and right bound marker positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelLayout {
    pub mode: LevelMode,
    /// None when bounds are disabled (infinite levels)
    pub bounds: Option<Bounds>,
    pub children: Vec<Placement>,
    /// Generation attempts used (0 for authored layouts)
    pub attempts: u32,
    /// Whether the minimum density was reached rather than accepted as a fallback
    pub density_met: bool,
}

impl LevelLayout {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn count_pieces(&self, kind: PieceKind) -> usize {
        self.children
            .iter()
            .flat_map(|c| c.pieces())
            .filter(|p| p.kind == kind)
            .count()
    }
}

/// Minimum child count for a generated layout, if the mode has one
pub fn minimum_children(mode: LevelMode) -> Option<usize> {
    match mode {
        LevelMode::Fixed => Some(MIN_CHILDREN_FIXED),
        LevelMode::Scrolling => Some(MIN_CHILDREN_SCROLLING),
        LevelMode::InfiniteAutoScroll => None,
    }
}

/// Build the layout for `mode`
pub fn generate<R: RandomSource + ?Sized>(
    mode: LevelMode,
    config: &LevelConfig,
    rng: &mut R,
) -> LevelLayout {
    let layout = match mode {
        LevelMode::InfiniteAutoScroll => generate_auto_scrolling(rng),
        LevelMode::Fixed | LevelMode::Scrolling => generate_bounded(mode, config, rng),
    };

    log::info!(
        "Level {:?}: {} children after {} attempt(s)",
        mode,
        layout.children.len(),
        layout.attempts
    );
    layout
}

fn generate_bounded<R: RandomSource + ?Sized>(
    mode: LevelMode,
    config: &LevelConfig,
    rng: &mut R,
) -> LevelLayout {
    let (x_extent, bound_pos) = match mode {
        LevelMode::Scrolling => (
            config.scroll_bound_size,
            config.scroll_bound_size + SCROLL_BOUND_MARGIN,
        ),
        _ => (FIXED_X_EXTENT, FIXED_BOUND_POS),
    };
    let bounds = Some(Bounds {
        left: -bound_pos,
        right: bound_pos,
    });

    if !config.procedurally_generate_level {
        let mut children = config.authored_layout.clone();
        if config.has_no_coins {
            remove_coins(&mut children);
        }
        return LevelLayout {
            mode,
            bounds,
            children,
            attempts: 0,
            density_met: true,
        };
    }

    let minimum = minimum_children(mode).unwrap_or(0);
    let mut best: Option<Vec<Placement>> = None;

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let mut children = populate_grid(x_extent, config.has_bottom_platform, rng);
        // Density is judged on what survives the no-coins pass
        if config.has_no_coins {
            remove_coins(&mut children);
        }
        match check_density(children.len(), minimum) {
            Ok(()) => {
                return LevelLayout {
                    mode,
                    bounds,
                    children,
                    attempts: attempt,
                    density_met: true,
                };
            }
            Err(err) => {
                log::debug!("Generation attempt {} rejected: {}", attempt, err);
                if best.as_ref().is_none_or(|b| children.len() > b.len()) {
                    best = Some(children);
                }
            }
        }
    }

    let children = best.unwrap_or_default();
    log::warn!(
        "No layout reached {} children in {} attempts, keeping densest ({})",
        minimum,
        MAX_GENERATION_ATTEMPTS,
        children.len()
    );
    LevelLayout {
        mode,
        bounds,
        children,
        attempts: MAX_GENERATION_ATTEMPTS,
        density_met: false,
    }
}

/// One pass over the spawn grid, baseline platform included
fn populate_grid<R: RandomSource + ?Sized>(
    x_extent: f32,
    bottom_platform: bool,
    rng: &mut R,
) -> Vec<Placement> {
    let mut children = Vec::new();
    if bottom_platform {
        children.push(Placement::new(
            Prefab::BottomPlatform,
            Vec2::new(0.0, GRID_Y_MIN - 1.0),
        ));
    } else {
        children.push(Placement::new(
            Prefab::SpawnPlatform,
            Vec2::new(0.0, SPAWN_PLATFORM_Y),
        ));
    }

    let columns = (2.0 * x_extent).ceil() as usize;
    let rows = grid_rows(GRID_Y_MIN, GRID_Y_MAX, GRID_Y_STEP);
    for i in 0..columns {
        let x = -x_extent + i as f32;
        for j in 0..rows {
            let y = GRID_Y_MIN + j as f32 * GRID_Y_STEP;
            // 7 in 8 chance, never around the spawn point
            if x.abs() > SPAWN_EXCLUSION && rng.roll(8) != 0 {
                let prefab = Prefab::RANDOM_POOL[rng.pick(Prefab::RANDOM_POOL.len())];
                children.push(Placement::new(prefab, Vec2::new(x, y)));
            }
        }
    }
    children
}

/// Rows from `min` to `max` inclusive
fn grid_rows(min: f32, max: f32, step: f32) -> usize {
    ((max - min) / step).floor() as usize + 1
}

fn check_density(count: usize, minimum: usize) -> Result<(), SimError> {
    if count < minimum {
        return Err(SimError::GenerationUnderDensity { count, minimum });
    }
    Ok(())
}

fn generate_auto_scrolling<R: RandomSource + ?Sized>(rng: &mut R) -> LevelLayout {
    let mut children = Vec::new();
    let columns = (2.0 * TILE_X_EXTENT / TILE_X_STEP).ceil() as usize;
    let rows = grid_rows(TILE_Y_MIN, TILE_Y_MAX, TILE_Y_STEP);
    for i in 0..columns {
        let x = -TILE_X_EXTENT + i as f32 * TILE_X_STEP;
        for j in 0..rows {
            // 9 in 10 chance, leaving jumpable gaps
            if rng.roll(10) != 0 {
                let y = TILE_Y_MIN + j as f32 * TILE_Y_STEP;
                children.push(Placement::new(Prefab::Tile, Vec2::new(x, y)));
            }
        }
    }
    LevelLayout {
        mode: LevelMode::InfiniteAutoScroll,
        bounds: None,
        children,
        attempts: 1,
        density_met: true,
    }
}

/// Strip every coin, dropping placements left with nothing in them
fn remove_coins(children: &mut Vec<Placement>) {
    for child in children.iter_mut() {
        child.coins_removed = true;
    }
    children.retain(|c| !c.is_empty());
}
