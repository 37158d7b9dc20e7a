//! Tree regrowth and procedural placement around the player.

use crate::grid::Grid;
use crate::noise::noise;
use farm_core::{
    Cell, SimTime, TileKind, TilePos, TreeConfig, TreeState, WorldEvent, WorldPos, TREE_MATURE,
    TREE_STUMP, TREE_YOUNG,
};
use std::collections::HashSet;
use tracing::debug;

/// Salt mixed into the seed for the second, stage-choosing hash
const STAGE_SALT: u64 = 0x5EED_0F_7EE5;

/// Result of one axe swing
#[derive(Debug, Clone, PartialEq)]
pub struct ChopOutcome {
    pub tree: TreeState,
    /// Wood released when the swing fells the tree
    pub wood: Option<u32>,
}

pub struct TreeEngine {
    config: TreeConfig,
    seed: u64,
    tile_size: f32,
    last_update: Option<SimTime>,
    last_spawn_origin: Option<WorldPos>,
    visited: HashSet<TilePos>,
}

impl TreeEngine {
    pub fn new(config: TreeConfig, seed: u64, tile_size: f32) -> Self {
        Self {
            config,
            seed,
            tile_size,
            last_update: None,
            last_spawn_origin: None,
            visited: HashSet::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Tiles already evaluated for spawning
    pub fn visited(&self) -> impl Iterator<Item = &TilePos> + '_ {
        self.visited.iter()
    }

    pub fn restore_visited(&mut self, tiles: impl IntoIterator<Item = TilePos>) {
        self.visited = tiles.into_iter().collect();
        self.last_spawn_origin = None;
    }

    pub fn update(
        &mut self,
        grid: &mut Grid,
        now: SimTime,
        player: WorldPos,
        events: &mut Vec<WorldEvent>,
    ) {
        if let Some(last) = self.last_update {
            if now.saturating_sub(last) < self.config.update_interval_ms {
                return;
            }
        }
        self.last_update = Some(now);

        self.grow_trees(grid, now, events);

        let moved = self
            .last_spawn_origin
            .map_or(true, |origin| origin.distance(&player) > self.tile_size);
        if moved {
            let spawned = self.spawn_around(grid, player.tile(self.tile_size), now, events);
            if spawned > 0 {
                debug!(spawned, x = player.x, y = player.y, "Spawned trees around player");
            }
            self.last_spawn_origin = Some(player);
        }
    }

    fn grow_trees(&self, grid: &mut Grid, now: SimTime, events: &mut Vec<WorldEvent>) {
        let trees: Vec<(TilePos, TreeState)> = grid
            .cells()
            .filter_map(|(pos, cell)| cell.tree_state().map(|tree| (pos, tree.clone())))
            .collect();

        for (pos, mut tree) in trees {
            let before = tree.stage;

            match tree.stage {
                TREE_STUMP => {
                    if let Some(started) = tree.regrow_started_at {
                        if now.saturating_sub(started) >= self.config.regrow_duration_ms {
                            tree = TreeState::new(TREE_YOUNG, now);
                        }
                    }
                }
                TREE_YOUNG => match tree.last_chop_at.or(tree.regrow_started_at) {
                    Some(anchor) => {
                        if now.saturating_sub(anchor) >= self.config.time_per_stage_ms {
                            tree.stage = TREE_MATURE;
                        }
                    }
                    None => tree.regrow_started_at = Some(now),
                },
                _ => continue,
            }

            if tree.stage != before {
                events.push(WorldEvent::TreeRegrew {
                    pos,
                    stage: tree.stage,
                });
            }
            grid.update(pos, |cell| {
                if let Some(state) = cell.land.tree_mut() {
                    *state = tree;
                }
            });
        }
    }

    /// Evaluate every unvisited tile around `center` exactly once. Returns the number of trees placed.
    pub fn spawn_around(
        &mut self,
        grid: &mut Grid,
        center: TilePos,
        now: SimTime,
        events: &mut Vec<WorldEvent>,
    ) -> usize {
        let radius = self.config.spawn_radius;
        let mut spawned = 0;

        for dr in -radius..=radius {
            for dc in -radius..=radius {
                let pos = center.offset(dc, dr);
                if !grid.in_bounds(pos) {
                    continue;
                }
                // Left unvisited so a later pass can still use it
                if pos.chebyshev_distance(&center) <= self.config.player_clearance {
                    continue;
                }
                if !self.visited.insert(pos) {
                    continue;
                }

                if noise(self.seed, pos.col, pos.row) >= self.config.density {
                    continue;
                }

                let cell = grid.get(pos);
                if cell.kind != TileKind::Grass || !cell.land.is_empty() || cell.item.is_some() {
                    continue;
                }
                if grid.tree_within(pos, self.config.spacing_radius) {
                    continue;
                }

                let stage = if noise(self.seed ^ STAGE_SALT, pos.col, pos.row) < self.config.mature_bias {
                    TREE_MATURE
                } else {
                    TREE_YOUNG
                };
                grid.set(pos, Cell::tree(TreeState::new(stage, now)));
                events.push(WorldEvent::TreeSpawned { pos, stage });
                spawned += 1;
            }
        }

        spawned
    }

    /// Apply one axe swing to a standing tree; stumps cannot be chopped
    pub fn chop(&self, tree: &TreeState, now: SimTime) -> Option<ChopOutcome> {
        if tree.stage < TREE_YOUNG {
            return None;
        }

        let (required, wood) = if tree.stage >= TREE_MATURE {
            (self.config.chops_mature, self.config.wood_mature)
        } else {
            (self.config.chops_young, self.config.wood_young)
        };

        let chops = tree.chop_count + 1;
        if chops >= required {
            return Some(ChopOutcome {
                tree: TreeState::stump(now),
                wood: Some(wood),
            });
        }

        Some(ChopOutcome {
            tree: TreeState {
                chop_count: chops,
                last_chop_at: Some(now),
                ..tree.clone()
            },
            wood: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> TreeConfig {
        TreeConfig {
            update_interval_ms: 1_000,
            regrow_duration_ms: 10_000,
            time_per_stage_ms: 20_000,
            spawn_radius: 6,
            density: 0.3,
            spacing_radius: 2,
            mature_bias: 0.5,
            player_clearance: 1,
            chops_young: 2,
            chops_mature: 3,
            wood_young: 1,
            wood_mature: 4,
        }
    }

    fn tree_positions(grid: &Grid) -> Vec<TilePos> {
        grid.cells()
            .filter(|(_, cell)| cell.tree_state().is_some())
            .map(|(pos, _)| pos)
            .collect()
    }

    #[test]
    fn test_stump_regrows() {
        let mut engine = TreeEngine::new(config(), 1, 16.0);
        let mut grid = Grid::new(10, 10);
        let pos = TilePos::new(3, 3);
        grid.set(pos, Cell::tree(TreeState::stump(0)));
        engine.visited.extend((0..10).flat_map(|c| (0..10).map(move |r| TilePos::new(c, r))));

        let mut events = Vec::new();
        engine.update(&mut grid, 9_000, WorldPos::new(80.0, 80.0), &mut events);
        assert_eq!(grid.get(pos).tree_state().unwrap().stage, TREE_STUMP);

        engine.update(&mut grid, 10_000, WorldPos::new(80.0, 80.0), &mut events);
        let tree = grid.get(pos).tree_state().unwrap();
        assert_eq!(tree.stage, TREE_YOUNG);
        assert_eq!(tree.regrow_started_at, Some(10_000));
        assert!(events.contains(&WorldEvent::TreeRegrew { pos, stage: TREE_YOUNG }));

        engine.update(&mut grid, 30_000, WorldPos::new(80.0, 80.0), &mut events);
        assert_eq!(grid.get(pos).tree_state().unwrap().stage, TREE_MATURE);
    }

    #[test]
    fn test_young_tree_growth_counts_from_last_chop() {
        let mut engine = TreeEngine::new(config(), 1, 16.0);
        engine.visited.extend((0..10).flat_map(|c| (0..10).map(move |r| TilePos::new(c, r))));
        let mut grid = Grid::new(10, 10);
        let pos = TilePos::new(3, 3);
        let tree = TreeState {
            last_chop_at: Some(15_000),
            chop_count: 1,
            ..TreeState::new(TREE_YOUNG, 0)
        };
        grid.set(pos, Cell::tree(tree));

        let mut events = Vec::new();
        engine.update(&mut grid, 25_000, WorldPos::default(), &mut events);
        assert_eq!(grid.get(pos).tree_state().unwrap().stage, TREE_YOUNG);
        engine.update(&mut grid, 35_000, WorldPos::default(), &mut events);
        assert_eq!(grid.get(pos).tree_state().unwrap().stage, TREE_MATURE);
    }

    #[test]
    fn test_spawn_is_idempotent_per_tile() {
        let mut engine = TreeEngine::new(config(), 99, 16.0);
        let mut grid = Grid::new(40, 40);
        let mut events = Vec::new();

        let first = engine.spawn_around(&mut grid, TilePos::new(20, 20), 0, &mut events);
        assert!(first > 0);
        let trees = tree_positions(&grid);

        // Chop every tree away: revisiting must not regenerate any of them
        for pos in &trees {
            grid.set(*pos, Cell::grass());
        }
        let second = engine.spawn_around(&mut grid, TilePos::new(20, 20), 0, &mut events);
        assert_eq!(second, 0);
        assert!(tree_positions(&grid).is_empty());
    }

    #[test]
    fn test_spawn_is_reproducible_for_seed() {
        let mut a = TreeEngine::new(config(), 7, 16.0);
        let mut b = TreeEngine::new(config(), 7, 16.0);
        let mut grid_a = Grid::new(30, 30);
        let mut grid_b = Grid::new(30, 30);
        let mut events = Vec::new();

        a.spawn_around(&mut grid_a, TilePos::new(15, 15), 0, &mut events);
        b.spawn_around(&mut grid_b, TilePos::new(15, 15), 0, &mut events);
        assert_eq!(tree_positions(&grid_a), tree_positions(&grid_b));
    }

    #[test]
    fn test_spawn_skips_used_land_and_player_area() {
        let mut cfg = config();
        cfg.density = 1.0;
        cfg.spacing_radius = 0;
        let mut engine = TreeEngine::new(cfg, 3, 16.0);
        let mut grid = Grid::new(20, 20);
        grid.set(TilePos::new(12, 10), Cell::water());
        grid.set(TilePos::new(8, 10), Cell::bare_soil(0));

        let mut events = Vec::new();
        engine.spawn_around(&mut grid, TilePos::new(10, 10), 0, &mut events);

        assert_eq!(grid.get(TilePos::new(12, 10)).kind, TileKind::Water);
        assert_eq!(grid.get(TilePos::new(8, 10)).kind, TileKind::Soil);
        assert!(grid.get(TilePos::new(10, 10)).tree_state().is_none());
        assert!(grid.get(TilePos::new(11, 11)).tree_state().is_none());
        assert!(grid.get(TilePos::new(12, 12)).tree_state().is_some());
    }

    #[test]
    fn test_update_waits_for_player_to_move() {
        let mut engine = TreeEngine::new(config(), 5, 16.0);
        let mut grid = Grid::new(60, 60);
        let mut events = Vec::new();

        engine.update(&mut grid, 0, WorldPos::new(160.0, 160.0), &mut events);
        let visited = engine.visited().count();
        assert!(visited > 0);

        // Less than a tile away: no new pass
        engine.update(&mut grid, 1_000, WorldPos::new(170.0, 160.0), &mut events);
        assert_eq!(engine.visited().count(), visited);

        engine.update(&mut grid, 2_000, WorldPos::new(260.0, 160.0), &mut events);
        assert!(engine.visited().count() > visited);
    }

    #[test]
    fn test_chop_counts_then_fells() {
        let engine = TreeEngine::new(config(), 0, 16.0);
        let tree = TreeState::new(TREE_MATURE, 0);

        let first = engine.chop(&tree, 100).unwrap();
        assert_eq!(first.wood, None);
        assert_eq!(first.tree.chop_count, 1);
        assert_eq!(first.tree.last_chop_at, Some(100));

        let second = engine.chop(&first.tree, 200).unwrap();
        let third = engine.chop(&second.tree, 300).unwrap();
        assert_eq!(third.wood, Some(4));
        assert!(third.tree.is_stump());
        assert_eq!(third.tree.regrow_started_at, Some(300));

        assert!(engine.chop(&third.tree, 400).is_none());
    }

    proptest! {
        #[test]
        fn prop_trees_respect_spacing(seed: u64, walk in proptest::collection::vec((0i32..50, 0i32..50), 1..6)) {
            let mut engine = TreeEngine::new(config(), seed, 16.0);
            let mut grid = Grid::new(50, 50);
            let mut events = Vec::new();
            for (col, row) in walk {
                engine.spawn_around(&mut grid, TilePos::new(col, row), 0, &mut events);
            }

            let trees = tree_positions(&grid);
            for (i, a) in trees.iter().enumerate() {
                for b in &trees[i + 1..] {
                    prop_assert!(a.chebyshev_distance(b) > 2);
                }
            }
        }
    }
}
