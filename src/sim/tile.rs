//! Recyclable tiles for infinite auto-scrolling levels
//!
//! A tile holds every variant it can show, all pre-built, and keeps at most
//! one active. Tiles drift left; once past the left edge a tile wraps to the
//! right edge and rerolls its variant, possibly showing nothing at all.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{ActorId, CoinId};
use super::level::RandomSource;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileVariantKind {
    Plain,
    WithCoin,
    WithNpc,
}

impl TileVariantKind {
    pub const ALL: [TileVariantKind; 3] = [
        TileVariantKind::Plain,
        TileVariantKind::WithCoin,
        TileVariantKind::WithNpc,
    ];
}

/// A pre-built variant and the pooled objects it carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileVariant {
    pub kind: TileVariantKind,
    pub active: bool,
    pub npc: Option<ActorId>,
    pub coin: Option<CoinId>,
}

impl TileVariant {
    pub fn new(kind: TileVariantKind) -> Self {
        Self {
            kind,
            active: false,
            npc: None,
            coin: None,
        }
    }
}

/// Where hosted NPCs and coins sit relative to the tile
pub const HOSTED_OFFSET: Vec2 = Vec2::new(0.0, 1.0);

/// Result of advancing a tile by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileTick {
    /// Moved left by `shift`
    Scrolled { shift: Vec2 },
    /// Wrapped to the right edge; `variant` is the newly shown variant, if any
    Recycled { variant: Option<usize> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfiniteTile {
    pub index: usize,
    pub pos: Vec2,
    pub variants: Vec<TileVariant>,
}

impl InfiniteTile {
    /// Create a tile with every variant inactive
    pub fn new(index: usize, pos: Vec2, variants: Vec<TileVariant>) -> Self {
        Self {
            index,
            pos,
            variants,
        }
    }

    pub fn hosted_pos(&self) -> Vec2 {
        self.pos + HOSTED_OFFSET
    }

    pub fn active_variant(&self) -> Option<usize> {
        self.variants.iter().position(|v| v.active)
    }

    pub fn deactivate_all(&mut self) {
        for variant in &mut self.variants {
            variant.active = false;
        }
    }

    fn activate(&mut self, index: usize) {
        self.deactivate_all();
        if let Some(variant) = self.variants.get_mut(index) {
            variant.active = true;
        }
    }

    /// Show exactly one variant, chosen at random
    pub fn choose_initial<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.variants.is_empty() {
            return None;
        }
        let index = rng.pick(self.variants.len());
        self.activate(index);
        Some(index)
    }

    /// Wrap if past the left edge, then scroll left
    pub fn tick<R: RandomSource + ?Sized>(&mut self, dt: f32, rng: &mut R) -> TileTick {
        let mut recycled = None;
        if self.pos.x <= -TILE_X_EXTENT {
            self.pos.x = TILE_X_EXTENT;
            self.deactivate_all();
            let count = self.variants.len();
            // One extra outcome leaves the tile empty
            let variant = if count > 0 && rng.roll(count as u32 + 1) != 0 {
                let index = rng.pick(count);
                self.activate(index);
                Some(index)
            } else {
                None
            };
            recycled = Some(variant);
        }

        let shift = Vec2::new(-TILE_SCROLL_SPEED * dt, 0.0);
        self.pos += shift;

        match recycled {
            Some(variant) => TileTick::Recycled { variant },
            None => TileTick::Scrolled { shift },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SimRng;

    struct Fixed(u32);

    impl RandomSource for Fixed {
        fn roll(&mut self, sides: u32) -> u32 {
            self.0.min(sides - 1)
        }

        fn jitter(&mut self, lo: f32, _hi: f32) -> f32 {
            lo
        }
    }

    fn tile_at(x: f32) -> InfiniteTile {
        let variants = TileVariantKind::ALL.iter().map(|&k| TileVariant::new(k)).collect();
        InfiniteTile::new(0, Vec2::new(x, 1.5), variants)
    }

    #[test]
    fn test_initial_choice_activates_exactly_one() {
        let mut rng = SimRng::new(5);
        for _ in 0..20 {
            let mut tile = tile_at(0.0);
            assert_eq!(tile.active_variant(), None);
            let chosen = tile.choose_initial(&mut rng);
            assert_eq!(tile.variants.iter().filter(|v| v.active).count(), 1);
            assert_eq!(tile.active_variant(), chosen);
        }
    }

    #[test]
    fn test_scrolls_left() {
        let mut tile = tile_at(0.0);
        let step = tile.tick(SIM_DT, &mut Fixed(1));
        assert!(matches!(step, TileTick::Scrolled { shift } if shift.x < 0.0));
        assert!(tile.pos.x < 0.0);
    }

    #[test]
    fn test_wraps_and_rerolls() {
        let mut tile = tile_at(-TILE_X_EXTENT);
        let step = tile.tick(SIM_DT, &mut Fixed(2));
        assert_eq!(step, TileTick::Recycled { variant: Some(2) });
        assert!(tile.pos.x > TILE_X_EXTENT - 0.1);
        assert_eq!(tile.active_variant(), Some(2));
    }

    #[test]
    fn test_wrap_can_leave_a_gap() {
        let mut tile = tile_at(-TILE_X_EXTENT - 0.5);
        tile.choose_initial(&mut Fixed(0));
        let step = tile.tick(SIM_DT, &mut Fixed(0));
        assert_eq!(step, TileTick::Recycled { variant: None });
        assert_eq!(tile.active_variant(), None);
    }
}
