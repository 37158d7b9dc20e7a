//! Point and box passability queries against the tile grid.

use crate::grid::Grid;
use farm_core::{CollisionConfig, Direction, FenceState, TileKind, TilePos, WorldPos};

/// Axis-aligned rectangle in pixels; edges count as inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Corners, edge midpoints and centre
    pub fn sample_points(&self) -> [WorldPos; 9] {
        let cx = (self.min_x + self.max_x) / 2.0;
        let cy = (self.min_y + self.max_y) / 2.0;
        [
            WorldPos::new(self.min_x, self.min_y),
            WorldPos::new(self.max_x, self.min_y),
            WorldPos::new(self.min_x, self.max_y),
            WorldPos::new(self.max_x, self.max_y),
            WorldPos::new(cx, self.min_y),
            WorldPos::new(cx, self.max_y),
            WorldPos::new(self.min_x, cy),
            WorldPos::new(self.max_x, cy),
            WorldPos::new(cx, cy),
        ]
    }
}

/// Stateless collision queries; holds only hitbox geometry
#[derive(Debug, Clone)]
pub struct CollisionEngine {
    config: CollisionConfig,
    tile_size: f32,
}

impl CollisionEngine {
    pub fn new(config: CollisionConfig, tile_size: f32) -> Self {
        Self { config, tile_size }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn tile_origin(&self, tile: TilePos) -> (f32, f32) {
        (tile.col as f32 * self.tile_size, tile.row as f32 * self.tile_size)
    }

    /// Post hitbox plus one rail per linked side
    pub fn fence_hitboxes(&self, tile: TilePos, fence: &FenceState) -> Vec<Rect> {
        let (ox, oy) = self.tile_origin(tile);
        let half = self.tile_size / 2.0;
        let (cx, cy) = (ox + half, oy + half);
        let post_w = self.config.fence_post_width;
        let post_h = self.config.fence_post_height;
        let rail = self.config.fence_rail_thickness / 2.0;

        let mut boxes = vec![Rect::from_center(cx, cy, post_w, post_h)];
        for side in Direction::all() {
            if !fence.links.has(side) {
                continue;
            }
            boxes.push(match side {
                Direction::Up => Rect::new(cx - rail, oy, cx + rail, cy - post_h / 2.0),
                Direction::Down => Rect::new(cx - rail, cy + post_h / 2.0, cx + rail, oy + self.tile_size),
                Direction::Left => Rect::new(ox, cy - rail, cx - post_w / 2.0, cy + rail),
                Direction::Right => Rect::new(cx + post_w / 2.0, cy - rail, ox + self.tile_size, cy + rail),
            });
        }
        boxes
    }

    /// Trunk hitbox, lifted off the tile's bottom edge by the render offset
    pub fn tree_hitbox(&self, tile: TilePos) -> Rect {
        let (ox, oy) = self.tile_origin(tile);
        let cx = ox + self.tile_size / 2.0;
        let bottom = oy + self.tile_size - self.config.tree_render_offset;
        let half_w = self.config.tree_hitbox_width / 2.0;
        Rect::new(cx - half_w, bottom - self.config.tree_hitbox_height, cx + half_w, bottom)
    }

    /// Whether a single world point is free
    pub fn can_pass_through(&self, grid: &Grid, x: f32, y: f32) -> bool {
        let tile = WorldPos::new(x, y).tile(self.tile_size);
        let cell = grid.get(tile);

        if cell.kind == TileKind::Water {
            return false;
        }

        if let Some(fence) = cell.fence_state() {
            if fence.is_solid()
                && self
                    .fence_hitboxes(tile, fence)
                    .iter()
                    .any(|rect| rect.contains(x, y))
            {
                return false;
            }
        }

        // Stumps block too
        if cell.kind == TileKind::Tree
            && cell.tree_state().is_some()
            && self.tree_hitbox(tile).contains(x, y)
        {
            return false;
        }

        true
    }

    /// Whether a box centred at (cx, cy) hits anything. Edge midpoints are
    /// sampled so obstacles narrower than the box are still caught.
    pub fn check_collision(&self, grid: &Grid, cx: f32, cy: f32, width: f32, height: f32) -> bool {
        Rect::from_center(cx, cy, width, height)
            .sample_points()
            .iter()
            .any(|p| !self.can_pass_through(grid, p.x, p.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{Cell, FenceLinks, TreeState};

    fn engine() -> CollisionEngine {
        CollisionEngine::new(CollisionConfig::default(), 16.0)
    }

    fn fence_grid(links: u8, open: bool) -> Grid {
        let mut grid = Grid::new(10, 10);
        grid.set(
            TilePos::new(2, 2),
            Cell::fence(FenceState {
                open,
                links: FenceLinks(links),
            }),
        );
        grid
    }

    #[test]
    fn test_empty_world_is_passable() {
        let grid = Grid::new(10, 10);
        let engine = engine();
        assert!(engine.can_pass_through(&grid, 40.0, 40.0));
        assert!(engine.can_pass_through(&grid, -100.0, 5000.0));
        assert!(!engine.check_collision(&grid, 40.0, 40.0, 12.0, 12.0));
    }

    #[test]
    fn test_water_blocks_whole_tile() {
        let mut grid = Grid::new(10, 10);
        grid.set(TilePos::new(1, 1), Cell::water());
        let engine = engine();
        assert!(!engine.can_pass_through(&grid, 16.0, 16.0));
        assert!(!engine.can_pass_through(&grid, 31.9, 31.9));
        assert!(engine.can_pass_through(&grid, 32.1, 16.0));
    }

    #[test]
    fn test_fence_post_only() {
        let grid = fence_grid(0, false);
        let engine = engine();
        // Tile (2,2) spans 32..48, centre 40
        assert!(!engine.can_pass_through(&grid, 40.0, 40.0));
        assert!(!engine.can_pass_through(&grid, 43.0, 44.0));
        // Where a right rail would be
        assert!(engine.can_pass_through(&grid, 46.0, 40.0));
        // Where a top rail would be
        assert!(engine.can_pass_through(&grid, 40.0, 33.0));
    }

    #[test]
    fn test_fence_rails_follow_pattern() {
        let grid = fence_grid(FenceLinks::RIGHT | FenceLinks::BOTTOM, false);
        let engine = engine();

        assert!(!engine.can_pass_through(&grid, 46.0, 40.0));
        assert!(!engine.can_pass_through(&grid, 40.0, 47.0));
        assert!(engine.can_pass_through(&grid, 34.0, 40.0));
        assert!(engine.can_pass_through(&grid, 40.0, 33.0));
        // Beside the right rail, strictly outside its thickness
        assert!(engine.can_pass_through(&grid, 46.0, 42.5));
        assert!(engine.can_pass_through(&grid, 46.0, 37.5));
    }

    #[test]
    fn test_all_rails() {
        let grid = fence_grid(0b1111, false);
        let engine = engine();
        for (x, y) in [(40.0, 33.0), (47.0, 40.0), (40.0, 47.0), (33.0, 40.0)] {
            assert!(!engine.can_pass_through(&grid, x, y), "({}, {}) should block", x, y);
        }
        // Tile corners stay open
        for (x, y) in [(33.0, 33.0), (47.0, 33.0), (33.0, 47.0), (47.0, 47.0)] {
            assert!(engine.can_pass_through(&grid, x, y), "({}, {}) should pass", x, y);
        }
    }

    #[test]
    fn test_open_gate_is_passable() {
        let grid = fence_grid(0b1111, true);
        let engine = engine();
        assert!(engine.can_pass_through(&grid, 40.0, 40.0));
        assert!(engine.can_pass_through(&grid, 46.0, 40.0));
    }

    #[test]
    fn test_tree_and_stump_block_trunk_only() {
        let mut grid = Grid::new(10, 10);
        grid.set(TilePos::new(2, 2), Cell::tree(TreeState::stump(0)));
        let engine = engine();

        // Trunk spans x 35..45, y 38..46
        assert!(!engine.can_pass_through(&grid, 40.0, 42.0));
        assert!(engine.can_pass_through(&grid, 40.0, 34.0));
        assert!(engine.can_pass_through(&grid, 40.0, 47.0));
        assert!(engine.can_pass_through(&grid, 33.0, 42.0));
    }

    #[test]
    fn test_box_cannot_straddle_thin_post() {
        let grid = fence_grid(0, false);
        let engine = engine();
        // Corners and centre all miss the post; only the bottom edge midpoint touches it
        assert!(engine.check_collision(&grid, 40.0, 30.0, 14.0, 14.0));
        // Moved clear of the tile
        assert!(!engine.check_collision(&grid, 40.0, 20.0, 14.0, 8.0));
    }
}
