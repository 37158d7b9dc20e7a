//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::SimTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// World grid parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid in tiles
    pub width: i32,
    /// Height of the world grid in tiles
    pub height: i32,
    /// Tile edge length in pixels
    pub tile_size: f32,
    /// Seed for procedural generation and random rolls
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            tile_size: 16.0,
            seed: 0,
        }
    }
}

/// Hitbox dimensions, all in pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub fence_post_width: f32,
    pub fence_post_height: f32,
    /// Thickness of the rail extending from the post toward a linked neighbour
    pub fence_rail_thickness: f32,
    pub tree_hitbox_width: f32,
    pub tree_hitbox_height: f32,
    /// Distance the tree trunk hitbox sits above the tile's bottom edge
    pub tree_render_offset: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            fence_post_width: 6.0,
            fence_post_height: 8.0,
            fence_rail_thickness: 4.0,
            tree_hitbox_width: 10.0,
            tree_hitbox_height: 8.0,
            tree_render_offset: 2.0,
        }
    }
}

/// Soil moisture, fertilizer and crop growth tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub update_interval_ms: SimTime,
    /// Maximum cells evaluated per update
    pub max_cells_per_update: usize,
    /// How long a watered cell stays wet
    pub soak_duration_ms: SimTime,
    /// How long bare dry soil survives before turning back into grass
    pub abandon_duration_ms: SimTime,
    /// Grace period a dry crop keeps growing before it needs water
    pub warning_delay_ms: SimTime,
    /// Time after the warning delay before a dry crop dies
    pub death_window_ms: SimTime,
    /// How long the visible fertilizer flag lasts
    pub fertilizer_duration_ms: SimTime,
    pub fertilizer_multiplier: f32,
    pub night_multiplier: f32,
    /// Light intensity below which the night multiplier applies
    pub night_light_threshold: f32,
    pub rain_multiplier: f32,
    /// First stage at which a crop accepts fertilizer
    pub min_fertilize_stage: u8,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 1_000,
            max_cells_per_update: 64,
            soak_duration_ms: 120_000,
            abandon_duration_ms: 300_000,
            warning_delay_ms: 60_000,
            death_window_ms: 120_000,
            fertilizer_duration_ms: 180_000,
            fertilizer_multiplier: 1.5,
            night_multiplier: 0.5,
            night_light_threshold: 0.3,
            rain_multiplier: 1.25,
            min_fertilize_stage: 1,
        }
    }
}

/// Tree regrowth and procedural placement tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub update_interval_ms: SimTime,
    /// Stump to young tree
    pub regrow_duration_ms: SimTime,
    /// Young tree to mature tree
    pub time_per_stage_ms: SimTime,
    /// Radius in tiles around the player considered for spawning
    pub spawn_radius: i32,
    /// Probability that an eligible tile receives a tree
    pub density: f64,
    /// No two trees closer than this many tiles (Chebyshev)
    pub spacing_radius: i32,
    /// Probability that a spawned tree starts mature rather than young
    pub mature_bias: f64,
    /// Tiles this close to the player are left for a later pass
    pub player_clearance: i32,
    pub chops_young: u32,
    pub chops_mature: u32,
    pub wood_young: u32,
    pub wood_mature: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 1_000,
            regrow_duration_ms: 300_000,
            time_per_stage_ms: 240_000,
            spawn_radius: 12,
            density: 0.08,
            spacing_radius: 2,
            mature_bias: 0.6,
            player_clearance: 1,
            chops_young: 2,
            chops_mature: 4,
            wood_young: 2,
            wood_mature: 5,
        }
    }
}

/// Animal hunger, movement and production tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimalConfig {
    pub update_interval_ms: SimTime,
    pub direction_change_interval_ms: SimTime,
    /// Per-update chance of changing direction early
    pub direction_change_chance: f32,
    /// Chance of standing still after a direction change
    pub idle_chance: f32,
    /// Animals rest in place while daylight is below this
    pub rest_light_threshold: f32,
    pub initial_hunger: f32,
    /// Hunger lost per second before species scaling
    pub hunger_decay_per_sec: f32,
    pub hunger_warning_threshold: f32,
    /// Time below the warning threshold before an animal starves
    pub starvation_duration_ms: SimTime,
    /// Production takes this many times longer while hungry
    pub hungry_production_multiplier: f32,
    pub feed_amount: f32,
    pub eat_duration_ms: SimTime,
    pub breed_min_hunger: f32,
    pub breed_cooldown_ms: SimTime,
    /// Adult age per extra unit of meat
    pub meat_age_step_ms: SimTime,
}

impl Default for AnimalConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 100,
            direction_change_interval_ms: 3_000,
            direction_change_chance: 0.02,
            idle_chance: 0.3,
            rest_light_threshold: 0.15,
            initial_hunger: 80.0,
            hunger_decay_per_sec: 0.05,
            hunger_warning_threshold: 20.0,
            starvation_duration_ms: 600_000,
            hungry_production_multiplier: 2.0,
            feed_amount: 40.0,
            eat_duration_ms: 1_500,
            breed_min_hunger: 60.0,
            breed_cooldown_ms: 600_000,
            meat_age_step_ms: 300_000,
        }
    }
}

/// What to do when a second action targets a cell that already has one pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Queue it anyway; the last action to complete overwrites the cell
    #[default]
    LastWins,
    /// Refuse to plan an action for a cell with one already pending
    RejectOverlap,
}

/// Tool action durations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Rate of the outer tick loop, used to turn durations into frame counts
    pub tick_rate_hz: u32,
    pub hoe_ms: SimTime,
    pub plant_ms: SimTime,
    pub water_ms: SimTime,
    pub fertilize_ms: SimTime,
    pub shovel_ms: SimTime,
    pub harvest_ms: SimTime,
    pub chop_ms: SimTime,
    pub fence_ms: SimTime,
    pub gate_ms: SimTime,
    pub overlap: OverlapPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            hoe_ms: 500,
            plant_ms: 400,
            water_ms: 600,
            fertilize_ms: 500,
            shovel_ms: 500,
            harvest_ms: 300,
            chop_ms: 700,
            fence_ms: 800,
            gate_ms: 200,
            overlap: OverlapPolicy::LastWins,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub collision: CollisionConfig,
    pub crop: CropConfig,
    pub tree: TreeConfig,
    pub animal: AnimalConfig,
    pub scheduler: SchedulerConfig,
}

impl SimConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading simulation config from {:?}", path);
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.width <= 0 || self.world.height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "world size must be positive, got {}x{}",
                self.world.width, self.world.height
            )));
        }
        if self.world.tile_size <= 0.0 {
            return Err(Error::InvalidConfig("tile_size must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.tree.density) || !(0.0..=1.0).contains(&self.tree.mature_bias) {
            return Err(Error::InvalidConfig(
                "tree density and mature_bias must be within 0..=1".to_string(),
            ));
        }
        if self.crop.max_cells_per_update == 0 {
            return Err(Error::InvalidConfig("max_cells_per_update must be at least 1".to_string()));
        }
        if self.crop.update_interval_ms == 0
            || self.tree.update_interval_ms == 0
            || self.animal.update_interval_ms == 0
        {
            return Err(Error::InvalidConfig("update intervals must be non-zero".to_string()));
        }
        if self.scheduler.tick_rate_hz == 0 {
            return Err(Error::InvalidConfig("tick_rate_hz must be non-zero".to_string()));
        }
        if self.crop.fertilizer_multiplier <= 0.0
            || self.crop.night_multiplier <= 0.0
            || self.crop.rain_multiplier <= 0.0
        {
            return Err(Error::InvalidConfig("growth multipliers must be positive".to_string()));
        }
        Ok(())
    }
}

/// Headless driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Number of ticks to run
    pub ticks: u64,
    /// Length of a full day/night cycle
    pub day_length_ms: SimTime,
    /// How often the weather is re-rolled
    pub weather_period_ms: SimTime,
    /// Chance that a weather roll starts rain
    pub rain_chance: f64,
    /// Log a summary every N ticks
    pub summary_every: u64,
    /// Where to write the final checkpoint, if anywhere
    pub checkpoint_path: Option<String>,
    /// Continue from `checkpoint_path` when it exists
    pub resume: bool,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    pub sim: SimConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            ticks: 60 * 60 * 20, // 20 simulated minutes at 60 Hz
            day_length_ms: 600_000,
            weather_period_ms: 90_000,
            rain_chance: 0.25,
            summary_every: 3_600,
            checkpoint_path: None,
            resume: false,
            log_json: false,
            sim: SimConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RunnerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading runner config from {:?}", path);
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.day_length_ms == 0 || self.weather_period_ms == 0 {
            return Err(Error::InvalidConfig(
                "day_length_ms and weather_period_ms must be non-zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.rain_chance) {
            return Err(Error::InvalidConfig(format!(
                "rain_chance must be within 0..=1, got {}",
                self.rain_chance
            )));
        }
        if self.summary_every == 0 {
            return Err(Error::InvalidConfig("summary_every must be at least 1".to_string()));
        }
        if self.resume && self.checkpoint_path.is_none() {
            return Err(Error::InvalidConfig("resume requires a checkpoint_path".to_string()));
        }
        self.sim.validate()
    }
}
