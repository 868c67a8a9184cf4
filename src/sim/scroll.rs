//! Camera/level scrolling and parallax background
//!
//! In scrolling levels the player stays near screen center and the level
//! root is translated under them. When the player stops off-center the
//! coordinator waits a moment, then nudges player and level back.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{CommandOp, Entity, Outbox};
use super::level::LevelMode;
use super::state::Facing;
use crate::consts::*;
use crate::error::SimError;
use crate::ticks_for;

/// One parallax background strip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallaxLayer {
    pub x: f32,
    pub width: f32,
    /// Units per second
    pub speed: f32,
    /// -1 left, 0 still, +1 right
    pub dir: i32,
}

impl ParallaxLayer {
    pub fn new(x: f32, width: f32, speed: f32) -> Self {
        Self {
            x,
            width,
            speed,
            dir: 0,
        }
    }

    /// Scroll and wrap to the opposite side once fully off-screen
    pub fn tick(&mut self, dt: f32) {
        self.x += self.dir as f32 * self.speed * dt;
        let limit = PARALLAX_TELEPORT_X + self.width / 2.0;
        if self.x.abs() > limit {
            self.x = if self.dir == -1 { limit } else { -limit };
        }
    }
}

/// Re-centering progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recenter {
    Idle,
    /// Player stopped; waiting before nudging
    Settling { ticks_left: u32 },
    /// Moving player and level toward center
    Nudging,
}

/// Layer widths and speeds (background, back, front)
const LAYER_SPECS: [(f32, f32); 3] = [(16.0, 0.6), (16.0, 1.2), (16.0, 2.4)];
/// Each layer set is laid out this many times side by side
const LAYER_COPIES: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollCoordinator {
    mode: LevelMode,
    scroll_bound: f32,
    level_offset: Vec2,
    direction: i32,
    layers: Vec<ParallaxLayer>,
    recenter: Recenter,
    /// Level movement accumulated this tick, applied to level-parented objects
    pending_shift: Vec2,
}

impl ScrollCoordinator {
    pub fn new(mode: LevelMode, scroll_bound: f32) -> Self {
        let mut layers = Vec::with_capacity(LAYER_SPECS.len() * LAYER_COPIES);
        let mut x = 0.0;
        for _ in 0..LAYER_COPIES {
            for &(width, speed) in &LAYER_SPECS {
                layers.push(ParallaxLayer::new(x, width, speed));
            }
            x += LAYER_SPECS[1].0;
        }

        let mut coordinator = Self {
            mode,
            scroll_bound,
            level_offset: Vec2::ZERO,
            direction: 0,
            layers,
            recenter: Recenter::Idle,
            pending_shift: Vec2::ZERO,
        };
        if mode == LevelMode::InfiniteAutoScroll {
            coordinator.fan_out(-1);
        }
        coordinator
    }

    pub fn mode(&self) -> LevelMode {
        self.mode
    }

    /// Whether the level, rather than the player, moves on horizontal input
    pub fn level_scrolls(&self) -> bool {
        self.mode == LevelMode::Scrolling
    }

    pub fn level_offset(&self) -> Vec2 {
        self.level_offset
    }

    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    pub fn recenter_state(&self) -> Recenter {
        self.recenter
    }

    /// Set the parallax direction for every layer. Auto-scrolling levels always scroll left.
    pub fn set_scroll_direction(&mut self, dir: i32) -> Result<(), SimError> {
        if !(-1..=1).contains(&dir) {
            return Err(SimError::InvalidDirection(dir));
        }
        let dir = if self.mode == LevelMode::InfiniteAutoScroll {
            -1
        } else {
            dir
        };
        self.fan_out(dir);
        Ok(())
    }

    fn fan_out(&mut self, dir: i32) {
        self.direction = dir;
        for layer in &mut self.layers {
            layer.dir = dir;
        }
    }

    /// Background follows opposite to an actor facing `facing` at `x`, or stops out of bounds
    pub fn follow_facing(&mut self, x: f32, facing: Facing) {
        let dir = if x.abs() < self.scroll_bound {
            -(facing.sign() as i32)
        } else {
            0
        };
        self.fan_out(if self.mode == LevelMode::InfiniteAutoScroll {
            -1
        } else {
            dir
        });
    }

    /// Translate the level root by `-delta` if the level scrolls here.
    /// Returns whether the level moved.
    pub fn move_level(&mut self, delta: f32, actor_x: f32, touching_bound: bool) -> bool {
        if !self.level_scrolls() || touching_bound || actor_x.abs() >= SCREEN_SCROLL_BAND {
            return false;
        }
        self.translate_level(Vec2::new(-delta, 0.0));
        true
    }

    fn translate_level(&mut self, delta: Vec2) {
        self.level_offset += delta;
        self.pending_shift += delta;
    }

    /// Player stopped moving; start the settle timer if not already running
    pub fn arm_recenter(&mut self) {
        if self.level_scrolls() && self.recenter == Recenter::Idle {
            self.recenter = Recenter::Settling {
                ticks_left: ticks_for(RECENTER_SETTLE),
            };
        }
    }

    /// Player moved; any pending or running adjustment is dropped
    pub fn cancel_recenter(&mut self) {
        self.recenter = Recenter::Idle;
    }

    /// Advance re-centering, nudging `player_x` toward zero at `speed`
    pub fn tick_recenter(&mut self, player_x: &mut f32, speed: f32, dt: f32) {
        match self.recenter {
            Recenter::Idle => {}
            Recenter::Settling { ticks_left } => {
                self.recenter = if ticks_left <= 1 {
                    Recenter::Nudging
                } else {
                    Recenter::Settling {
                        ticks_left: ticks_left - 1,
                    }
                };
            }
            Recenter::Nudging => {
                if player_x.abs() <= RECENTER_TOLERANCE {
                    self.recenter = Recenter::Idle;
                    return;
                }
                let step = speed * dt;
                let dir = if *player_x > 0.0 { -1.0 } else { 1.0 };
                self.translate_level(Vec2::new(dir * step / 2.0, 0.0));
                *player_x += dir * step;
            }
        }
    }

    /// Scroll parallax layers
    pub fn tick(&mut self, dt: f32, out: &mut Outbox) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            if layer.dir == 0 {
                continue;
            }
            layer.tick(dt);
            out.emit(Entity::Parallax(i), CommandOp::SetPosition(Vec2::new(layer.x, 0.0)));
        }
    }

    /// Take the level movement accumulated since the last call
    pub fn take_pending_shift(&mut self, out: &mut Outbox) -> Vec2 {
        let shift = std::mem::take(&mut self.pending_shift);
        if shift != Vec2::ZERO {
            out.emit(Entity::LevelRoot, CommandOp::SetPosition(self.level_offset));
        }
        shift
    }
}
