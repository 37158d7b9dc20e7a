//! Headless driver: runs the farm world with a scripted farmer.

mod checkpoint;
mod environment;
mod farmer;
mod telemetry;

use anyhow::{Context, Result};
use checkpoint::Checkpoint;
use environment::Sky;
use farm_core::{Cell, RunnerConfig, SimTime, TilePos, WorldEvent};
use farm_world::Simulation;
use farmer::{Farmer, Pen};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};

const CONFIG_ENV: &str = "FARM_SIM_CONFIG";
const CHORE_INTERVAL_MS: SimTime = 250;

fn main() -> Result<()> {
    let config = load_config()?;
    telemetry::init_telemetry(config.log_json)?;

    info!(
        ticks = config.ticks,
        seed = config.sim.world.seed,
        width = config.sim.world.width,
        height = config.sim.world.height,
        "Starting farm simulation"
    );

    run(&config)
}

fn load_config() -> Result<RunnerConfig> {
    let path = std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok());
    match path {
        Some(path) => RunnerConfig::load(&path).with_context(|| format!("Failed to load config {}", path)),
        None => Ok(RunnerConfig::default()),
    }
}

/// Fixed layout shared by fresh and resumed runs
struct Layout {
    plot_min: TilePos,
    plot_max: TilePos,
    pen: Pen,
    pond_min: TilePos,
    pond_max: TilePos,
}

impl Layout {
    fn for_world(width: i32, height: i32) -> Self {
        let cx = width / 2;
        let cy = height / 2;
        Self {
            plot_min: TilePos::new(cx - 6, cy - 2),
            plot_max: TilePos::new(cx - 2, cy + 1),
            pen: Pen {
                min: TilePos::new(cx + 2, cy - 3),
                max: TilePos::new(cx + 7, cy + 2),
            },
            pond_min: TilePos::new(cx - 5, cy + 4),
            pond_max: TilePos::new(cx - 3, cy + 5),
        }
    }
}

fn fresh_world(config: &RunnerConfig, layout: &Layout) -> Result<Simulation> {
    let mut sim = Simulation::new(config.sim.clone())?;
    for row in layout.pond_min.row..=layout.pond_max.row {
        for col in layout.pond_min.col..=layout.pond_max.col {
            sim.grid_mut().set(TilePos::new(col, row), Cell::water());
        }
    }
    Farmer::stock_pen(&mut sim, layout.pen, 0);
    Ok(sim)
}

fn open_world(config: &RunnerConfig, layout: &Layout) -> Result<(Simulation, u64)> {
    if config.resume {
        if let Some(path) = config.checkpoint_path.as_deref().filter(|p| Path::new(p).exists()) {
            let checkpoint = Checkpoint::read(path)?;
            let sim = Simulation::restore_bytes(config.sim.clone(), &checkpoint.world)?;
            return Ok((sim, checkpoint.tick));
        }
        warn!("No checkpoint to resume from, starting a fresh world");
    }
    Ok((fresh_world(config, layout)?, 0))
}

fn event_name(event: &WorldEvent) -> &'static str {
    match event {
        WorldEvent::CropHarvested { .. } => "crop_harvested",
        WorldEvent::CropDied { .. } => "crop_died",
        WorldEvent::CropCleared { .. } => "crop_cleared",
        WorldEvent::TreeSpawned { .. } => "tree_spawned",
        WorldEvent::TreeFelled { .. } => "tree_felled",
        WorldEvent::TreeRegrew { .. } => "tree_regrew",
        WorldEvent::FenceToggled { .. } => "fence_toggled",
        WorldEvent::ActionCommitted { .. } => "action_committed",
        WorldEvent::AnimalSpawned { .. } => "animal_spawned",
        WorldEvent::AnimalGrew { .. } => "animal_grew",
        WorldEvent::AnimalDied { .. } => "animal_died",
        WorldEvent::ProductReady { .. } => "product_ready",
        WorldEvent::ProductCollected { .. } => "product_collected",
    }
}

#[instrument(skip(config), fields(ticks = config.ticks))]
fn run(config: &RunnerConfig) -> Result<()> {
    let world = &config.sim.world;
    let layout = Layout::for_world(world.width, world.height);
    let (mut sim, start_tick) = open_world(config, &layout)?;

    let hz = config.sim.scheduler.tick_rate_hz as u64;
    let start_time = sim.now();
    let mut sky = Sky::new(
        config.day_length_ms,
        config.weather_period_ms,
        config.rain_chance,
        world.seed,
    );
    let mut farmer = Farmer::new(
        layout.plot_min,
        layout.plot_max,
        layout.pen,
        world.tile_size,
        CHORE_INTERVAL_MS,
    );

    let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut redraws = 0u64;

    for i in 1..=config.ticks {
        let now = start_time + i * 1000 / hz;
        let env = sky.environment(now);

        farmer.act(&mut sim, now);
        sim.step(now, &env, farmer.position());

        let events = sim.drain_events();
        farmer.observe(&events);
        for event in &events {
            *tally.entry(event_name(event)).or_insert(0) += 1;
        }
        if sim.take_redraw() {
            redraws += 1;
        }

        if i % config.summary_every == 0 {
            let stats = sim.stats();
            info!(
                event = "summary",
                tick = start_tick + i,
                day = sky.day.day(now),
                light = env.light_intensity,
                raining = env.raining,
                crops = stats.crops,
                mature_crops = stats.mature_crops,
                trees = stats.trees,
                fences = stats.fences,
                animals = stats.animals,
                pending = stats.pending_actions,
                redraws,
                "Simulation summary"
            );
        }
    }

    let stats = sim.stats();
    let scheduler = sim.scheduler_stats();
    info!(
        event = "run_complete",
        ticks = config.ticks,
        sim_time_ms = stats.now,
        populated_cells = stats.populated_cells,
        visited_tiles = stats.visited_tiles,
        actions_committed = scheduler.committed,
        actions_rejected = scheduler.rejected,
        actions_dropped = scheduler.dropped,
        "Run complete"
    );
    for (name, count) in &tally {
        info!(event = "event_total", name = *name, count = *count, "Event total");
    }
    let mut inventory: Vec<_> = farmer.inventory().iter().collect();
    inventory.sort_by_key(|(item, _)| format!("{:?}", item));
    for (item, amount) in inventory {
        info!(item = ?item, amount = *amount, "Farmer inventory");
    }

    if let Some(path) = &config.checkpoint_path {
        Checkpoint::capture(&sim, start_tick + config.ticks)?.write(path)?;
    }

    Ok(())
}
