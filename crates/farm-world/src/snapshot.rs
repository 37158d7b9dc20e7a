//! Plain-data snapshot of the world for an external save system.

use crate::animal::Animal;
use crate::grid::Grid;
use farm_core::{Cell, Error, Result, SimTime, TilePos};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub version: u32,
    /// Simulation time the snapshot was taken at
    pub saved_at: SimTime,
    pub width: i32,
    pub height: i32,
    /// Non-default cells only
    pub cells: Vec<(TilePos, Cell)>,
    pub animals: Vec<Animal>,
    /// Tiles already evaluated for tree spawning
    pub visited: Vec<TilePos>,
}

impl WorldSnapshot {
    pub fn capture<'a>(
        grid: &Grid,
        animals: &[Animal],
        visited: impl Iterator<Item = &'a TilePos>,
        now: SimTime,
    ) -> Self {
        let mut visited: Vec<TilePos> = visited.copied().collect();
        visited.sort();

        Self {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            width: grid.width,
            height: grid.height,
            cells: grid.cells().map(|(pos, cell)| (pos, cell.clone())).collect(),
            animals: animals.iter().filter(|a| a.is_alive()).cloned().collect(),
            visited,
        }
    }

    /// Rebuild the grid; cells outside the recorded size are dropped
    pub fn build_grid(&self) -> Grid {
        let mut grid = Grid::new(self.width, self.height);
        for (pos, cell) in &self.cells {
            grid.store(*pos, cell.clone());
        }
        grid.mark_dirty();
        grid
    }

    fn check_version(self) -> Result<Self> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::InvalidState(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::InvalidState(format!(
                "invalid snapshot size {}x{}",
                self.width, self.height
            )));
        }
        Ok(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: WorldSnapshot =
            bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: WorldSnapshot = serde_json::from_str(json)?;
        snapshot.check_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{
        AnimalSpecies, CropSpecies, CropState, FenceState, ItemKind, LandUse, TreeState, WorldPos,
    };

    fn sample() -> WorldSnapshot {
        let mut grid = Grid::new(8, 6);
        let mut soil = Cell::bare_soil(5);
        soil.land = LandUse::Crop(CropState::new(CropSpecies::Pumpkin, 5));
        soil.set_watered(9);
        grid.set(TilePos::new(1, 1), soil);
        grid.set(TilePos::new(2, 1), Cell::tree(TreeState::stump(3)));
        grid.set(TilePos::new(3, 1), Cell::fence(FenceState::closed()));
        grid.set(TilePos::new(4, 4), Cell::water());
        grid.drop_item(TilePos::new(5, 5), ItemKind::Wood, 4, (2.0, 3.0));

        let mut dead = Animal::new(AnimalSpecies::Pig, WorldPos::new(0.0, 0.0), 10.0, 0);
        dead.kill();
        let animals = vec![
            Animal::new(AnimalSpecies::Sheep, WorldPos::new(12.5, 40.0), 66.0, 100),
            dead,
        ];
        let visited = [TilePos::new(3, 0), TilePos::new(0, 2)];

        WorldSnapshot::capture(&grid, &animals, visited.iter(), 1_234)
    }

    #[test]
    fn test_capture() {
        let snapshot = sample();
        assert_eq!(snapshot.cells.len(), 5);
        // Dead animals are not persisted
        assert_eq!(snapshot.animals.len(), 1);
        assert_eq!(snapshot.visited, vec![TilePos::new(0, 2), TilePos::new(3, 0)]);
    }

    #[test]
    fn test_bytes_and_json() {
        let snapshot = sample();

        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(WorldSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let json = snapshot.to_json().unwrap();
        assert_eq!(WorldSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_build_grid() {
        let snapshot = sample();
        let grid = snapshot.build_grid();
        assert_eq!(grid.populated_count(), 5);
        assert_eq!(grid.get(TilePos::new(4, 4)).kind, farm_core::TileKind::Water);
        assert_eq!(grid.get(TilePos::new(5, 5)).item.unwrap().amount, 4);
    }

    #[test]
    fn test_corrupt_input_rejected() {
        assert!(matches!(
            WorldSnapshot::from_bytes(&[1, 2, 3]),
            Err(Error::Serialization(_))
        ));

        let mut snapshot = sample();
        snapshot.version = 99;
        let bytes = snapshot.to_bytes().unwrap();
        assert!(matches!(
            WorldSnapshot::from_bytes(&bytes),
            Err(Error::InvalidState(_))
        ));
    }
}
