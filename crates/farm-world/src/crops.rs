//! Soil moisture, fertilizer and crop growth.

use crate::grid::Grid;
use farm_core::{
    Cell, CellStatus, CropConfig, Environment, Moisture, SimTime, TileKind, TilePos, WorldEvent,
};
use tracing::{debug, info};

/// Fields whose change needs a redraw
type Appearance = (TileKind, Option<u8>, bool, bool);

fn appearance(cell: &Cell) -> Appearance {
    (
        cell.kind,
        cell.crop().map(|crop| crop.stage),
        cell.fertilizer.active,
        cell.is_watered(),
    )
}

/// Advances every cell that holds a crop or moisture/fertilizer state.
///
/// Runs on a fixed interval and evaluates at most `max_cells_per_update`
/// cells per run, resuming from a cursor so that every tracked cell is
/// revisited in turn.
pub struct CropEngine {
    config: CropConfig,
    last_update: Option<SimTime>,
    cursor: usize,
}

impl CropEngine {
    pub fn new(config: CropConfig) -> Self {
        Self {
            config,
            last_update: None,
            cursor: 0,
        }
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Cells the engine needs to look at
    fn is_tracked(cell: &Cell) -> bool {
        cell.crop().is_some() || cell.is_watered() || cell.fertilizer.active || cell.kind.is_soil()
    }

    /// Run one batch if the update interval has elapsed. Returns the number of cells evaluated.
    pub fn update(
        &mut self,
        grid: &mut Grid,
        now: SimTime,
        env: &Environment,
        events: &mut Vec<WorldEvent>,
    ) -> usize {
        if let Some(last) = self.last_update {
            if now.saturating_sub(last) < self.config.update_interval_ms {
                return 0;
            }
        }
        self.last_update = Some(now);

        let tracked: Vec<TilePos> = grid
            .cells()
            .filter(|(_, cell)| Self::is_tracked(cell))
            .map(|(pos, _)| pos)
            .collect();

        if tracked.is_empty() {
            self.cursor = 0;
            return 0;
        }
        if self.cursor >= tracked.len() {
            self.cursor = 0;
        }

        let batch = self.config.max_cells_per_update.min(tracked.len());
        for i in 0..batch {
            let pos = tracked[(self.cursor + i) % tracked.len()];
            let mut cell = grid.get(pos).clone();
            let before = appearance(&cell);

            self.advance_cell(pos, &mut cell, now, env, events);

            let redraw = appearance(&cell) != before;
            grid.store(pos, cell);
            if redraw {
                grid.mark_dirty();
            }
        }
        self.cursor = (self.cursor + batch) % tracked.len();

        batch
    }

    /// Apply moisture, death, fertilizer and growth transitions to one cell, in that order
    pub fn advance_cell(
        &self,
        pos: TilePos,
        cell: &mut Cell,
        now: SimTime,
        env: &Environment,
        events: &mut Vec<WorldEvent>,
    ) {
        self.update_moisture(pos, cell, now, env);
        if cell.kind == TileKind::Grass {
            return;
        }

        if self.crop_is_dead(cell, now) {
            if let Some(crop) = cell.crop() {
                info!(
                    event = "crop_died",
                    col = pos.col,
                    row = pos.row,
                    species = ?crop.species,
                    stage = crop.stage,
                    "Crop died of thirst"
                );
                events.push(WorldEvent::CropDied {
                    pos,
                    species: crop.species,
                });
            }
            *cell = Cell {
                item: cell.item,
                ..Cell::bare_soil(now)
            };
            return;
        }

        if cell.fertilizer.active {
            if let Some(applied_at) = cell.fertilizer.applied_at {
                if now.saturating_sub(applied_at) >= self.config.fertilizer_duration_ms {
                    cell.fertilizer.active = false;
                }
            }
        }

        self.update_growth(pos, cell, now, env);
    }

    fn update_moisture(&self, pos: TilePos, cell: &mut Cell, now: SimTime, env: &Environment) {
        let has_crop = cell.crop().is_some();

        match cell.moisture {
            Moisture::Dry { since } => {
                if env.raining && cell.kind == TileKind::Soil && has_crop {
                    cell.set_watered(now);
                    return;
                }
                let Some(since) = since else {
                    if cell.kind.is_soil() {
                        cell.moisture = Moisture::dry_since(now);
                    }
                    return;
                };
                if !has_crop
                    && cell.kind == TileKind::Soil
                    && now.saturating_sub(since) >= self.config.abandon_duration_ms
                {
                    debug!(col = pos.col, row = pos.row, "Abandoned soil reverted to grass");
                    *cell = Cell {
                        item: cell.item,
                        ..Cell::grass()
                    };
                }
            }
            Moisture::Watered { since } => {
                if !env.raining && now.saturating_sub(since) >= self.config.soak_duration_ms {
                    cell.set_dry(now);
                }
            }
        }
    }

    fn update_growth(&self, pos: TilePos, cell: &mut Cell, now: SimTime, env: &Environment) {
        let growable = self.is_growable(cell, now);
        let multiplier = self.growth_multiplier(cell, now, env);

        let Some(crop) = cell.land.crop_mut() else {
            return;
        };
        let delta = now.saturating_sub(crop.evaluated_at);
        crop.evaluated_at = now;

        if crop.is_mature() {
            return;
        }

        if !growable {
            // Paused: shift the anchor so the paused time never counts as growth
            crop.planted_at = (crop.planted_at + delta).min(now);
            return;
        }

        let effective = crop.species.time_per_stage_ms() as f64 / multiplier as f64;
        let elapsed = now.saturating_sub(crop.planted_at) as f64;
        let target = ((elapsed / effective).floor() as u64).min(crop.species.max_stage() as u64) as u8;

        if target > crop.stage {
            debug!(
                col = pos.col,
                row = pos.row,
                species = ?crop.species,
                from = crop.stage,
                to = target,
                "Crop advanced"
            );
            crop.stage = target;
        }
    }

    /// Dry for longer than the warning delay plus the death window
    fn crop_is_dead(&self, cell: &Cell, now: SimTime) -> bool {
        cell.crop().is_some()
            && cell
                .moisture
                .dry_for(now)
                .is_some_and(|dry| dry > self.config.warning_delay_ms + self.config.death_window_ms)
    }

    /// Watered, or dry but still inside the warning delay
    pub fn is_growable(&self, cell: &Cell, now: SimTime) -> bool {
        match cell.moisture {
            Moisture::Watered { .. } => true,
            Moisture::Dry { since: None } => true,
            Moisture::Dry { since: Some(since) } => {
                now.saturating_sub(since) <= self.config.warning_delay_ms
            }
        }
    }

    /// Growth buff outlives the visible fertilizer flag by the warning delay
    pub fn fertilizer_buff_active(&self, cell: &Cell, now: SimTime) -> bool {
        cell.fertilizer.applied_at.is_some_and(|applied_at| {
            now.saturating_sub(applied_at)
                < self.config.fertilizer_duration_ms + self.config.warning_delay_ms
        })
    }

    /// Product of the active growth-rate multipliers
    pub fn growth_multiplier(&self, cell: &Cell, now: SimTime, env: &Environment) -> f32 {
        let mut multiplier = 1.0;
        if self.fertilizer_buff_active(cell, now) {
            multiplier *= self.config.fertilizer_multiplier;
        }
        if env.light_intensity < self.config.night_light_threshold {
            multiplier *= self.config.night_multiplier;
        }
        if env.raining {
            multiplier *= self.config.rain_multiplier;
        }
        multiplier
    }

    /// Indicator shown above a cell
    pub fn status(&self, cell: &Cell, now: SimTime) -> CellStatus {
        let Some(crop) = cell.crop() else {
            return CellStatus::None;
        };

        if crop.is_mature() {
            return CellStatus::ReadyToHarvest;
        }
        if self.crop_is_dead(cell, now) {
            return CellStatus::Dead;
        }

        let needs_water = cell
            .moisture
            .dry_for(now)
            .is_some_and(|dry| dry > self.config.warning_delay_ms);

        let window = self.config.fertilizer_duration_ms + self.config.warning_delay_ms;
        let needs_fertilizer = crop.stage >= self.config.min_fertilize_stage
            && !cell.fertilizer.active
            && cell
                .fertilizer
                .applied_at
                .map_or(true, |applied_at| now.saturating_sub(applied_at) >= window);

        match (needs_water, needs_fertilizer) {
            (true, true) => CellStatus::NeedsBoth,
            (true, false) => CellStatus::NeedsWater,
            (false, true) => CellStatus::NeedsFertilizer,
            (false, false) => CellStatus::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{CropSpecies, CropState, Fertilizer, LandUse};
    use proptest::prelude::*;

    fn config() -> CropConfig {
        CropConfig {
            update_interval_ms: 1_000,
            max_cells_per_update: 100,
            soak_duration_ms: 10_000,
            abandon_duration_ms: 20_000,
            warning_delay_ms: 5_000,
            death_window_ms: 10_000,
            fertilizer_duration_ms: 8_000,
            fertilizer_multiplier: 2.0,
            night_multiplier: 0.5,
            night_light_threshold: 0.3,
            rain_multiplier: 1.25,
            min_fertilize_stage: 1,
        }
    }

    fn planted(species: CropSpecies, now: SimTime) -> Cell {
        Cell {
            land: LandUse::Crop(CropState::new(species, now)),
            ..Cell::bare_soil(now)
        }
    }

    fn run(engine: &mut CropEngine, grid: &mut Grid, from: SimTime, to: SimTime, env: Environment) {
        let mut events = Vec::new();
        let mut now = from;
        while now <= to {
            engine.update(grid, now, &env, &mut events);
            now += 1_000;
        }
    }

    #[test]
    fn test_update_is_rate_limited() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        grid.set(TilePos::new(1, 1), Cell::bare_soil(0));
        let env = Environment::default();
        let mut events = Vec::new();

        assert_eq!(engine.update(&mut grid, 0, &env, &mut events), 1);
        assert_eq!(engine.update(&mut grid, 500, &env, &mut events), 0);
        assert_eq!(engine.update(&mut grid, 1_000, &env, &mut events), 1);
    }

    #[test]
    fn test_watered_cell_dries_after_soak() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let pos = TilePos::new(2, 2);
        let mut cell = planted(CropSpecies::Wheat, 0);
        cell.set_watered(0);
        grid.set(pos, cell);

        run(&mut engine, &mut grid, 0, 9_000, Environment::default());
        assert!(grid.get(pos).is_watered());

        run(&mut engine, &mut grid, 10_000, 10_000, Environment::default());
        assert!(!grid.get(pos).is_watered());
        assert_eq!(grid.get(pos).kind, TileKind::Soil);
    }

    #[test]
    fn test_rain_keeps_soil_wet_and_waters_crops() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let wet = TilePos::new(1, 1);
        let dry = TilePos::new(3, 3);
        let mut cell = planted(CropSpecies::Wheat, 0);
        cell.set_watered(0);
        grid.set(wet, cell);
        grid.set(dry, planted(CropSpecies::Carrot, 0));

        let rain = Environment {
            raining: true,
            light_intensity: 1.0,
        };
        run(&mut engine, &mut grid, 0, 30_000, rain);
        assert!(grid.get(wet).is_watered());
        assert!(grid.get(dry).is_watered());
        assert_eq!(grid.get(dry).kind, TileKind::SoilWet);
    }

    #[test]
    fn test_bare_soil_reverts_to_grass() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let pos = TilePos::new(4, 4);
        grid.set(pos, Cell::bare_soil(0));

        run(&mut engine, &mut grid, 0, 19_000, Environment::default());
        assert_eq!(grid.get(pos).kind, TileKind::Soil);

        run(&mut engine, &mut grid, 20_000, 20_000, Environment::default());
        assert_eq!(grid.get(pos).kind, TileKind::Grass);
        assert_eq!(grid.populated_count(), 0);
    }

    #[test]
    fn test_dry_crop_dies_after_warning_and_death_window() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let pos = TilePos::new(4, 4);
        grid.set(pos, planted(CropSpecies::Wheat, 0));

        run(&mut engine, &mut grid, 0, 15_000, Environment::default());
        assert!(grid.get(pos).crop().is_some());
        assert_eq!(engine.status(grid.get(pos), 15_000), CellStatus::NeedsWater);

        let mut events = Vec::new();
        engine.update(&mut grid, 16_000, &Environment::default(), &mut events);
        let cell = grid.get(pos);
        assert!(cell.crop().is_none());
        assert_eq!(cell.kind, TileKind::Soil);
        assert!(!cell.is_watered());
        assert_eq!(cell.fertilizer, Fertilizer::default());
        assert!(matches!(events[0], WorldEvent::CropDied { .. }));
    }

    #[test]
    fn test_growth_freezes_without_water() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let pos = TilePos::new(1, 1);
        let mut cell = planted(CropSpecies::Carrot, 0);
        cell.set_watered(0);
        grid.set(pos, cell);

        // Carrot: 45s per stage. Watered for 10s, then grace for 5s.
        run(&mut engine, &mut grid, 0, 14_000, Environment::default());
        let anchor_before = grid.get(pos).crop().unwrap().planted_at;
        assert_eq!(anchor_before, 0);

        run(&mut engine, &mut grid, 15_000, 15_000, Environment::default());
        run(&mut engine, &mut grid, 16_000, 16_000, Environment::default());
        let anchor_after = grid.get(pos).crop().unwrap().planted_at;
        assert_eq!(anchor_after, 1_000);
    }

    #[test]
    fn test_multipliers_stack() {
        let engine = CropEngine::new(config());
        let mut cell = planted(CropSpecies::Wheat, 0);
        cell.fertilizer = Fertilizer::applied(0);

        let night_rain = Environment {
            raining: true,
            light_intensity: 0.1,
        };
        let m = engine.growth_multiplier(&cell, 1_000, &night_rain);
        assert!((m - 2.0 * 0.5 * 1.25).abs() < 1e-6);

        // Hidden buff: flag duration 8s + warning 5s
        assert!(engine.fertilizer_buff_active(&cell, 12_999));
        assert!(!engine.fertilizer_buff_active(&cell, 13_000));
    }

    #[test]
    fn test_fertilizer_flag_expires_but_buff_lingers() {
        let mut engine = CropEngine::new(config());
        let mut grid = Grid::new(8, 8);
        let pos = TilePos::new(1, 1);
        let mut cell = planted(CropSpecies::Pumpkin, 0);
        cell.set_watered(0);
        cell.fertilizer = Fertilizer::applied(0);
        grid.set(pos, cell);

        run(&mut engine, &mut grid, 0, 8_000, Environment::default());
        let cell = grid.get(pos);
        assert!(!cell.fertilizer.active);
        assert!(engine.fertilizer_buff_active(cell, 8_000));
    }

    #[test]
    fn test_status_derivation() {
        let engine = CropEngine::new(config());

        let mut cell = planted(CropSpecies::Wheat, 0);
        assert_eq!(engine.status(&cell, 1_000), CellStatus::None);
        assert_eq!(engine.status(&cell, 6_000), CellStatus::NeedsWater);

        cell.land.crop_mut().unwrap().stage = 2;
        assert_eq!(engine.status(&cell, 6_000), CellStatus::NeedsBoth);
        cell.set_watered(6_000);
        assert_eq!(engine.status(&cell, 7_000), CellStatus::NeedsFertilizer);

        cell.fertilizer = Fertilizer::applied(7_000);
        assert_eq!(engine.status(&cell, 8_000), CellStatus::None);
        // Flag expired but the grace window has not
        cell.fertilizer.active = false;
        assert_eq!(engine.status(&cell, 16_000), CellStatus::None);
        assert_eq!(engine.status(&cell, 20_000), CellStatus::NeedsFertilizer);

        cell.land.crop_mut().unwrap().stage = CropSpecies::Wheat.max_stage();
        cell.set_dry(0);
        assert_eq!(engine.status(&cell, 100_000), CellStatus::ReadyToHarvest);

        assert_eq!(engine.status(&Cell::bare_soil(0), 0), CellStatus::None);
    }

    #[test]
    fn test_round_robin_visits_every_cell() {
        let mut cfg = config();
        cfg.max_cells_per_update = 3;
        let mut engine = CropEngine::new(cfg);
        let mut grid = Grid::new(8, 8);
        for col in 0..7 {
            grid.set(TilePos::new(col, 0), Cell::bare_soil(0));
        }

        let env = Environment::default();
        let mut events = Vec::new();
        // 7 cells, 3 per update: after 3 updates every cell has been visited at least once
        for i in 0..3 {
            assert_eq!(engine.update(&mut grid, i * 1_000, &env, &mut events), 3);
        }
        assert_eq!(engine.cursor, 2);

        // Far in the future every visited cell reverts; three more passes reach the rest
        for i in 0..3 {
            engine.update(&mut grid, 100_000 + i * 1_000, &env, &mut events);
        }
        assert_eq!(grid.populated_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_stage_monotone_and_bounded(
            schedule in proptest::collection::vec((any::<bool>(), any::<bool>(), 0.0f32..1.0), 1..120)
        ) {
            let mut engine = CropEngine::new(config());
            let mut grid = Grid::new(4, 4);
            let pos = TilePos::new(1, 1);
            grid.set(pos, planted(CropSpecies::Wheat, 0));

            let mut events = Vec::new();
            let mut last_stage = 0;
            for (i, (raining, water, light)) in schedule.into_iter().enumerate() {
                let now = (i as u64 + 1) * 5_000;
                if water {
                    grid.update(pos, |cell| if cell.crop().is_some() { cell.set_watered(now) });
                }
                let env = Environment { raining, light_intensity: light };
                engine.update(&mut grid, now, &env, &mut events);

                match grid.get(pos).crop() {
                    Some(crop) => {
                        prop_assert!(crop.stage >= last_stage);
                        prop_assert!(crop.stage <= CropSpecies::Wheat.max_stage());
                        last_stage = crop.stage;
                    }
                    None => break,
                }
            }
        }
    }
}
