//! Level configuration and presets
//!
//! Applied once at level start and propagated to every actor present at
//! that time. Loaded from JSON; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::sim::level::{LevelMode, Placement};

/// Level presets matching the three game scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LevelPreset {
    #[default]
    Fixed,
    Scrolling,
    Infinite,
}

impl LevelPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelPreset::Fixed => "Fixed",
            LevelPreset::Scrolling => "Scrolling",
            LevelPreset::Infinite => "Infinite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Some(LevelPreset::Fixed),
            "scrolling" | "scroll" => Some(LevelPreset::Scrolling),
            "infinite" | "auto" => Some(LevelPreset::Infinite),
            _ => None,
        }
    }
}

/// Key bindings, by key name. Polling is done by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub up: String,
    pub left: String,
    pub right: String,
    pub interact: String,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            up: "W".to_string(),
            left: "A".to_string(),
            right: "D".to_string(),
            interact: "Space".to_string(),
        }
    }
}

/// Player policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub disappear_on_contact: bool,
    pub knockback_on_contact: bool,
    /// Shoots projectiles instead of using the melee hitbox
    pub is_shooter: bool,
    pub controls: Controls,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            disappear_on_contact: false,
            knockback_on_contact: true,
            is_shooter: false,
            controls: Controls::default(),
        }
    }
}

/// Policy shared by every NPC in the level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcConfig {
    pub disappear_on_contact: bool,
    pub knockback_on_contact: bool,
    pub knockback_magnitude: f32,
    pub stops_to_interact: bool,
    pub can_fall_off_platforms: bool,
    pub is_shooter: bool,
    /// Capacity of the projectile pool shared by all NPCs
    pub pool_size: usize,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            disappear_on_contact: true,
            knockback_on_contact: true,
            knockback_magnitude: NPC_KNOCKBACK_DEFAULT,
            stops_to_interact: true,
            can_fall_off_platforms: false,
            is_shooter: true,
            pool_size: NPC_POOL_SIZE,
        }
    }
}

/// Per-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub level_will_scroll: bool,
    pub level_is_infinite_auto_scroller: bool,
    pub procedurally_generate_level: bool,
    pub has_bottom_platform: bool,
    pub has_no_coins: bool,
    /// Half-width of the region the level scrolls through
    pub scroll_bound_size: f32,
    pub player: PlayerConfig,
    pub npc: NpcConfig,
    /// Hand-placed layout used when procedural generation is off
    pub authored_layout: Vec<Placement>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            level_will_scroll: false,
            level_is_infinite_auto_scroller: false,
            procedurally_generate_level: true,
            has_bottom_platform: true,
            has_no_coins: false,
            scroll_bound_size: DEFAULT_SCROLL_BOUND,
            player: PlayerConfig::default(),
            npc: NpcConfig::default(),
            authored_layout: Vec::new(),
        }
    }
}

impl LevelConfig {
    /// Create a configuration from a preset
    pub fn from_preset(preset: LevelPreset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Apply a preset (updates the mode flags only)
    pub fn apply_preset(&mut self, preset: LevelPreset) {
        match preset {
            LevelPreset::Fixed => {
                self.level_will_scroll = false;
                self.level_is_infinite_auto_scroller = false;
            }
            LevelPreset::Scrolling => {
                self.level_will_scroll = true;
                self.level_is_infinite_auto_scroller = false;
            }
            LevelPreset::Infinite => {
                self.level_will_scroll = false;
                self.level_is_infinite_auto_scroller = true;
            }
        }
    }

    /// Parse a JSON document and normalize it
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: LevelConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Lock settings that the infinite mode depends on and clamp ranges
    pub fn normalized(mut self) -> Self {
        if self.level_is_infinite_auto_scroller {
            self.level_will_scroll = false;
            self.procedurally_generate_level = true;
            self.has_bottom_platform = false;
        }

        let k = self.npc.knockback_magnitude;
        if !k.is_finite() {
            log::warn!("NPC knockback {} is not finite, using {}", k, NPC_KNOCKBACK_DEFAULT);
            self.npc.knockback_magnitude = NPC_KNOCKBACK_DEFAULT;
        }
        let k = self.npc.knockback_magnitude;
        let clamped = k.clamp(NPC_KNOCKBACK_MIN, NPC_KNOCKBACK_MAX);
        if clamped != k {
            log::warn!("NPC knockback {} out of range, clamped to {}", k, clamped);
            self.npc.knockback_magnitude = clamped;
        }

        if self.npc.pool_size == 0 {
            log::warn!("NPC pool size 0, using 1");
            self.npc.pool_size = 1;
        }

        if !(self.scroll_bound_size > SCREEN_SCROLL_BAND) {
            log::warn!(
                "Scroll bound {} too small, using {}",
                self.scroll_bound_size,
                DEFAULT_SCROLL_BOUND
            );
            self.scroll_bound_size = DEFAULT_SCROLL_BOUND;
        } else if self.scroll_bound_size > MAX_SCROLL_BOUND {
            log::warn!(
                "Scroll bound {} too large, clamped to {}",
                self.scroll_bound_size,
                MAX_SCROLL_BOUND
            );
            self.scroll_bound_size = MAX_SCROLL_BOUND;
        }

        self
    }

    /// Level mode implied by the flags (infinite wins over scrolling)
    pub fn mode(&self) -> LevelMode {
        if self.level_is_infinite_auto_scroller {
            LevelMode::InfiniteAutoScroll
        } else if self.level_will_scroll {
            LevelMode::Scrolling
        } else {
            LevelMode::Fixed
        }
    }
}
