//! Bounded tile store for the world.

use farm_core::{
    Cell, Direction, FenceLinks, Fertilizer, GroundItem, ItemKind, LandUse, Moisture, TileKind, TilePos,
    WorldConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Returned for every coordinate with no stored cell, including out-of-bounds ones
static DEFAULT_CELL: Cell = Cell {
    kind: TileKind::Grass,
    land: LandUse::Empty,
    moisture: Moisture::Dry { since: None },
    fertilizer: Fertilizer {
        active: false,
        applied_at: None,
    },
    item: None,
};

/// A fixed-size grid that only stores cells differing from plain grass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: BTreeMap<TilePos, Cell>,
    #[serde(skip)]
    dirty: bool,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: BTreeMap::new(),
            dirty: true,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.col >= 0 && pos.row >= 0 && pos.col < self.width && pos.row < self.height
    }

    /// Get cell at position; never fails
    pub fn get(&self, pos: TilePos) -> &Cell {
        self.cells.get(&pos).unwrap_or(&DEFAULT_CELL)
    }

    /// Set cell at position and raise the redraw flag if it changed.
    /// Writes outside the grid are ignored.
    pub fn set(&mut self, pos: TilePos, cell: Cell) {
        if self.store(pos, cell) {
            self.dirty = true;
        }
    }

    /// Set cell without touching the redraw flag. Returns whether anything changed.
    pub fn store(&mut self, pos: TilePos, cell: Cell) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }

        if cell.is_default() {
            self.cells.remove(&pos).is_some()
        } else if self.cells.get(&pos) == Some(&cell) {
            false
        } else {
            self.cells.insert(pos, cell);
            true
        }
    }

    /// Mutate a cell in place through a copy; out-of-bounds positions are skipped
    pub fn update<F>(&mut self, pos: TilePos, f: F)
    where
        F: FnOnce(&mut Cell),
    {
        if !self.in_bounds(pos) {
            return;
        }
        let mut cell = self.get(pos).clone();
        f(&mut cell);
        self.set(pos, cell);
    }

    /// Iterator over all stored (non-default) cells in row-stable order
    pub fn cells(&self) -> impl Iterator<Item = (TilePos, &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    pub fn populated_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether any tree (stumps included) stands within `radius` tiles
    pub fn tree_within(&self, pos: TilePos, radius: i32) -> bool {
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if self.get(pos.offset(dc, dr)).tree_state().is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Drop items on a tile, stacking onto an existing pile of the same kind.
    /// A pile of a different kind is replaced.
    pub fn drop_item(&mut self, pos: TilePos, kind: ItemKind, amount: u32, offset: (f32, f32)) {
        if amount == 0 {
            return;
        }
        self.update(pos, |cell| {
            cell.item = match cell.item {
                Some(existing) if existing.kind == kind => Some(GroundItem {
                    amount: existing.amount + amount,
                    ..existing
                }),
                _ => Some(GroundItem {
                    kind,
                    amount,
                    offset,
                }),
            };
        });
    }

    /// Pick up whatever lies on the tile
    pub fn take_item(&mut self, pos: TilePos) -> Option<GroundItem> {
        let item = self.get(pos).item?;
        self.update(pos, |cell| cell.item = None);
        Some(item)
    }

    fn is_solid_fence(&self, pos: TilePos) -> bool {
        self.get(pos).fence_state().is_some_and(|fence| fence.is_solid())
    }

    /// Recompute the connectivity pattern of a tile and its four neighbours
    pub fn refresh_fence_links(&mut self, pos: TilePos) {
        let mut targets = vec![pos];
        targets.extend(Direction::all().iter().map(|side| pos.neighbor(*side)));

        for target in targets {
            if self.get(target).fence_state().is_none() {
                continue;
            }
            let mut links = FenceLinks::default();
            for side in Direction::all() {
                links.set(side, self.is_solid_fence(target.neighbor(side)));
            }
            self.update(target, |cell| {
                if let Some(fence) = cell.land.fence_mut() {
                    fence.links = links;
                }
            });
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the "map needs redraw" flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{FenceLinks, FenceState, TreeState};
    use proptest::prelude::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 12);
        assert_eq!(grid.width, 10);
        assert_eq!(grid.height, 12);
        assert_eq!(grid.populated_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_is_default_grass() {
        let mut grid = Grid::new(10, 10);
        grid.set(TilePos::new(-1, 3), Cell::water());
        grid.set(TilePos::new(10, 0), Cell::water());

        assert_eq!(grid.populated_count(), 0);
        assert_eq!(grid.get(TilePos::new(-1, 3)).kind, TileKind::Grass);
        assert_eq!(grid.get(TilePos::new(10, 0)).kind, TileKind::Grass);
    }

    #[test]
    fn test_setting_default_removes_entry() {
        let mut grid = Grid::new(10, 10);
        let pos = TilePos::new(2, 2);
        grid.set(pos, Cell::water());
        assert_eq!(grid.populated_count(), 1);

        grid.set(pos, Cell::grass());
        assert_eq!(grid.populated_count(), 0);
    }

    #[test]
    fn test_dirty_flag() {
        let mut grid = Grid::new(10, 10);
        assert!(grid.take_dirty());
        assert!(!grid.take_dirty());

        grid.set(TilePos::new(1, 1), Cell::water());
        assert!(grid.take_dirty());

        // Same value again is not a change
        grid.set(TilePos::new(1, 1), Cell::water());
        assert!(!grid.is_dirty());

        assert!(grid.store(TilePos::new(2, 1), Cell::water()));
        assert!(!grid.is_dirty());
    }

    #[test]
    fn test_drop_and_take_items() {
        let mut grid = Grid::new(10, 10);
        let pos = TilePos::new(3, 3);
        grid.drop_item(pos, ItemKind::Meat, 2, (4.0, 4.0));
        grid.drop_item(pos, ItemKind::Meat, 3, (8.0, 8.0));

        let item = grid.get(pos).item.unwrap();
        assert_eq!(item.amount, 5);
        assert_eq!(item.offset, (4.0, 4.0));

        let taken = grid.take_item(pos).unwrap();
        assert_eq!(taken.kind, ItemKind::Meat);
        assert!(grid.get(pos).item.is_none());
        assert_eq!(grid.populated_count(), 0);
        assert!(grid.take_item(pos).is_none());
    }

    #[test]
    fn test_tree_within() {
        let mut grid = Grid::new(10, 10);
        grid.set(TilePos::new(5, 5), Cell::tree(TreeState::stump(0)));
        assert!(grid.tree_within(TilePos::new(7, 7), 2));
        assert!(!grid.tree_within(TilePos::new(8, 5), 2));
    }

    #[test]
    fn test_fence_links_follow_solid_neighbors() {
        let mut grid = Grid::new(10, 10);
        let center = TilePos::new(4, 4);
        let right = TilePos::new(5, 4);
        let below = TilePos::new(4, 5);

        for pos in [center, right, below] {
            grid.set(pos, Cell::fence(FenceState::closed()));
            grid.refresh_fence_links(pos);
        }

        let links = grid.get(center).fence_state().unwrap().links;
        assert_eq!(links.0, FenceLinks::RIGHT | FenceLinks::BOTTOM);
        assert_eq!(grid.get(right).fence_state().unwrap().links.0, FenceLinks::LEFT);

        // Opening the gate on the right cuts the link
        grid.update(right, |cell| cell.land.fence_mut().unwrap().open = true);
        grid.refresh_fence_links(right);
        assert_eq!(grid.get(center).fence_state().unwrap().links.0, FenceLinks::BOTTOM);
    }

    proptest! {
        #[test]
        fn prop_get_never_fails(col in -1000i32..1000, row in -1000i32..1000) {
            let mut grid = Grid::new(16, 16);
            grid.set(TilePos::new(3, 3), Cell::water());
            let cell = grid.get(TilePos::new(col, row));
            if !grid.in_bounds(TilePos::new(col, row)) {
                prop_assert!(cell.is_default());
            }
        }
    }
}
