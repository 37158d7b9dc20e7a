//! Simulation façade: owns the world and drives every engine once per tick.

use crate::animal::Animal;
use crate::animals::AnimalEngine;
use crate::collision::CollisionEngine;
use crate::crops::CropEngine;
use crate::grid::Grid;
use crate::scheduler::{PendingAction, Scheduler, SchedulerStats};
use crate::snapshot::WorldSnapshot;
use crate::trees::TreeEngine;
use farm_core::{
    AnimalId, AnimalSpecies, Cell, CellStatus, Environment, GroundItem, ItemKind, Result, SimConfig,
    SimTime, TilePos, Tool, WorldEvent, WorldPos,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{event, info, instrument, warn, Level};

/// Ticks between periodic metric lines
const METRICS_EVERY_TICKS: u64 = 3_600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub tick: u64,
    pub now: SimTime,
    pub populated_cells: usize,
    pub crops: usize,
    pub mature_crops: usize,
    pub trees: usize,
    pub fences: usize,
    pub animals: usize,
    pub pending_actions: usize,
    pub visited_tiles: usize,
}

pub struct Simulation {
    config: SimConfig,
    grid: Grid,
    collision: CollisionEngine,
    crops: CropEngine,
    trees: TreeEngine,
    animals: AnimalEngine,
    scheduler: Scheduler,
    rng: ChaCha8Rng,
    events: Vec<WorldEvent>,
    tick: u64,
    now: SimTime,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let rng = ChaCha8Rng::seed_from_u64(config.world.seed);
        let tile_size = config.world.tile_size;

        Ok(Self {
            grid: Grid::from_config(&config.world),
            collision: CollisionEngine::new(config.collision.clone(), tile_size),
            crops: CropEngine::new(config.crop.clone()),
            trees: TreeEngine::new(config.tree.clone(), config.world.seed, tile_size),
            animals: AnimalEngine::new(config.animal.clone()),
            scheduler: Scheduler::new(config.scheduler.clone(), config.crop.min_fertilize_stage),
            rng,
            events: Vec::new(),
            tick: 0,
            now: 0,
            config,
        })
    }

    /// Rebuild a simulation from a snapshot
    #[instrument(skip(config, snapshot), fields(saved_at = snapshot.saved_at))]
    pub fn restore(config: SimConfig, snapshot: &WorldSnapshot) -> Result<Self> {
        let mut sim = Self::new(config)?;

        if (snapshot.width, snapshot.height) != (sim.config.world.width, sim.config.world.height) {
            warn!(
                snapshot_width = snapshot.width,
                snapshot_height = snapshot.height,
                "Snapshot size differs from config, using snapshot size"
            );
            sim.config.world.width = snapshot.width;
            sim.config.world.height = snapshot.height;
        }

        sim.grid = snapshot.build_grid();
        sim.animals.restore(snapshot.animals.clone());
        sim.trees.restore_visited(snapshot.visited.iter().copied());
        sim.now = snapshot.saved_at;

        info!(
            cells = snapshot.cells.len(),
            animals = snapshot.animals.len(),
            "Restored world from snapshot"
        );
        Ok(sim)
    }

    /// Decode a bincode snapshot. Unreadable data yields a fresh world
    /// instead of an error; only an invalid config fails.
    pub fn restore_bytes(config: SimConfig, bytes: &[u8]) -> Result<Self> {
        match WorldSnapshot::from_bytes(bytes) {
            Ok(snapshot) => Self::restore(config, &snapshot),
            Err(e) => {
                warn!(error = %e, "Snapshot unreadable, starting from an empty world");
                Self::new(config)
            }
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.grid, self.animals.animals(), self.trees.visited(), self.now)
    }

    /// Advance one tick. `now` is read once by the caller and shared by every engine.
    pub fn step(&mut self, now: SimTime, env: &Environment, player: WorldPos) {
        self.tick += 1;
        self.now = now;

        self.crops.update(&mut self.grid, now, env, &mut self.events);
        self.trees.update(&mut self.grid, now, player, &mut self.events);
        self.animals.update(
            &mut self.grid,
            &self.collision,
            now,
            env,
            &mut self.rng,
            &mut self.events,
        );
        self.scheduler.update(&mut self.grid, now, &mut self.events);

        if self.tick % METRICS_EVERY_TICKS == 0 {
            self.emit_metrics();
        }
    }

    fn emit_metrics(&self) {
        let stats = self.stats();
        info!(
            event = "world_metrics",
            tick = stats.tick,
            now = stats.now,
            crops = stats.crops,
            mature_crops = stats.mature_crops,
            trees = stats.trees,
            fences = stats.fences,
            animals = stats.animals,
            pending_actions = stats.pending_actions,
            "World metrics"
        );
        event!(
            Level::INFO,
            gauge_name = "living_animals",
            gauge_value = stats.animals,
            "Living animals gauge"
        );
        event!(
            Level::INFO,
            gauge_name = "populated_cells",
            gauge_value = stats.populated_cells,
            "Populated cells gauge"
        );
    }

    pub fn stats(&self) -> SimulationStats {
        let mut stats = SimulationStats {
            tick: self.tick,
            now: self.now,
            populated_cells: self.grid.populated_count(),
            animals: self.animals.living_count(),
            pending_actions: self.scheduler.pending().len(),
            visited_tiles: self.trees.visited().count(),
            ..SimulationStats::default()
        };
        for (_, cell) in self.grid.cells() {
            if let Some(crop) = cell.crop() {
                stats.crops += 1;
                if crop.is_mature() {
                    stats.mature_crops += 1;
                }
            } else if cell.tree_state().is_some() {
                stats.trees += 1;
            } else if cell.fence_state().is_some() {
                stats.fences += 1;
            }
        }
        stats
    }

    /// Player used `tool` on `pos`. Returns whether an action was queued.
    pub fn interact(&mut self, tool: Tool, pos: TilePos, now: SimTime) -> bool {
        self.scheduler
            .interact(&self.grid, &self.trees, tool, pos, now, &mut self.rng)
    }

    pub fn can_pass_through(&self, x: f32, y: f32) -> bool {
        self.collision.can_pass_through(&self.grid, x, y)
    }

    pub fn check_collision(&self, cx: f32, cy: f32, width: f32, height: f32) -> bool {
        self.collision.check_collision(&self.grid, cx, cy, width, height)
    }

    pub fn cell(&self, pos: TilePos) -> &Cell {
        self.grid.get(pos)
    }

    pub fn cell_status(&self, pos: TilePos) -> CellStatus {
        self.crops.status(self.grid.get(pos), self.now)
    }

    pub fn spawn_animal(&mut self, species: AnimalSpecies, position: WorldPos, now: SimTime) -> AnimalId {
        self.animals.spawn(species, position, now, &mut self.events)
    }

    pub fn feed_animal(&mut self, id: AnimalId, now: SimTime) -> Result<()> {
        self.animals.feed(id, now)
    }

    pub fn collect_product(&mut self, id: AnimalId, now: SimTime) -> Result<Option<ItemKind>> {
        self.animals.collect_product(id, now, &mut self.events)
    }

    pub fn kill_animal(&mut self, id: AnimalId, now: SimTime) -> Result<u32> {
        let tile_size = self.collision.tile_size();
        self.animals
            .kill(id, &mut self.grid, tile_size, now, &mut self.events)
    }

    pub fn breed_animals(&mut self, a: AnimalId, b: AnimalId, now: SimTime) -> Result<Option<AnimalId>> {
        self.animals.breed(a, b, now, &mut self.events)
    }

    pub fn animals(&self) -> &[Animal] {
        self.animals.animals()
    }

    pub fn animal(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.get(id)
    }

    pub fn take_item(&mut self, pos: TilePos) -> Option<GroundItem> {
        self.grid.take_item(pos)
    }

    pub fn pending_actions(&self) -> &[PendingAction] {
        self.scheduler.pending()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Hand over every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read and clear the "map needs redraw" flag
    pub fn take_redraw(&mut self) -> bool {
        self.grid.take_dirty()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Direct access for world setup (ponds, pre-placed fences)
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn now(&self) -> SimTime {
        self.now
    }
}
