//! Core type definitions for the simulation.

use crate::species::{AnimalSpecies, CropSpecies};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Simulation time in milliseconds, read once per tick by the driver.
pub type SimTime = u64;

/// Unique identifier for an animal instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalId(pub Uuid);

impl AnimalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnimalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid coordinate of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub col: i32,
    pub row: i32,
}

impl TilePos {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn offset(&self, dc: i32, dr: i32) -> Self {
        Self {
            col: self.col + dc,
            row: self.row + dr,
        }
    }

    pub fn neighbor(&self, side: Direction) -> Self {
        let (dc, dr) = side.grid_delta();
        self.offset(dc, dr)
    }

    /// Chebyshev distance to another tile
    pub fn chebyshev_distance(&self, other: &TilePos) -> i32 {
        (self.col - other.col).abs().max((self.row - other.row).abs())
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Continuous world position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &WorldPos) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn tile(&self, tile_size: f32) -> TilePos {
        TilePos::new(
            (self.x / tile_size).floor() as i32,
            (self.y / tile_size).floor() as i32,
        )
    }

    pub fn midpoint(&self, other: &WorldPos) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Facing and movement direction (4-way)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn grid_delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn to_delta(&self) -> (f32, f32) {
        let (dx, dy) = self.grid_delta();
        (dx as f32, dy as f32)
    }

    /// Bit order used by fence connectivity: top, right, bottom, left
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Right, Direction::Down, Direction::Left]
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

/// Base category of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Grass,
    Soil,
    SoilWet,
    Water,
    Tree,
    Fence,
}

impl TileKind {
    pub fn is_soil(&self) -> bool {
        matches!(self, TileKind::Soil | TileKind::SoilWet)
    }
}

/// Crop planted on a soil tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropState {
    pub species: CropSpecies,
    pub stage: u8,
    /// Growth anchor. Pauses in growth shift it forward by the paused duration,
    /// so `now - planted_at` only counts time the crop could actually grow.
    pub planted_at: SimTime,
    /// Last time the crop engine evaluated this crop
    pub evaluated_at: SimTime,
}

impl CropState {
    pub fn new(species: CropSpecies, now: SimTime) -> Self {
        Self {
            species,
            stage: 0,
            planted_at: now,
            evaluated_at: now,
        }
    }

    pub fn is_mature(&self) -> bool {
        self.stage >= self.species.max_stage()
    }
}

pub const TREE_STUMP: u8 = 0;
pub const TREE_YOUNG: u8 = 1;
pub const TREE_MATURE: u8 = 2;
pub const TREE_MAX_STAGE: u8 = 3;

/// Tree standing on a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeState {
    pub stage: u8,
    pub chop_count: u32,
    pub last_chop_at: Option<SimTime>,
    pub regrow_started_at: Option<SimTime>,
}

impl TreeState {
    pub fn new(stage: u8, now: SimTime) -> Self {
        Self {
            stage: stage.min(TREE_MAX_STAGE),
            chop_count: 0,
            last_chop_at: None,
            regrow_started_at: Some(now),
        }
    }

    pub fn stump(now: SimTime) -> Self {
        Self::new(TREE_STUMP, now)
    }

    pub fn is_stump(&self) -> bool {
        self.stage == TREE_STUMP
    }
}

/// 4-bit fence connectivity pattern (bit 0 top, 1 right, 2 bottom, 3 left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FenceLinks(pub u8);

impl FenceLinks {
    pub const TOP: u8 = 0b0001;
    pub const RIGHT: u8 = 0b0010;
    pub const BOTTOM: u8 = 0b0100;
    pub const LEFT: u8 = 0b1000;

    pub fn bit(side: Direction) -> u8 {
        match side {
            Direction::Up => Self::TOP,
            Direction::Right => Self::RIGHT,
            Direction::Down => Self::BOTTOM,
            Direction::Left => Self::LEFT,
        }
    }

    pub fn has(&self, side: Direction) -> bool {
        self.0 & Self::bit(side) != 0
    }

    pub fn set(&mut self, side: Direction, linked: bool) {
        if linked {
            self.0 |= Self::bit(side);
        } else {
            self.0 &= !Self::bit(side);
        }
    }
}

/// Fence segment or gate on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FenceState {
    pub open: bool,
    pub links: FenceLinks,
}

impl FenceState {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn is_solid(&self) -> bool {
        !self.open
    }
}

/// Mutually exclusive land uses of a cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum LandUse {
    #[default]
    Empty,
    Crop(CropState),
    Tree(TreeState),
    Fence(FenceState),
}

impl LandUse {
    pub fn is_empty(&self) -> bool {
        matches!(self, LandUse::Empty)
    }

    pub fn crop(&self) -> Option<&CropState> {
        match self {
            LandUse::Crop(crop) => Some(crop),
            _ => None,
        }
    }

    pub fn crop_mut(&mut self) -> Option<&mut CropState> {
        match self {
            LandUse::Crop(crop) => Some(crop),
            _ => None,
        }
    }

    pub fn tree(&self) -> Option<&TreeState> {
        match self {
            LandUse::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut TreeState> {
        match self {
            LandUse::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn fence(&self) -> Option<&FenceState> {
        match self {
            LandUse::Fence(fence) => Some(fence),
            _ => None,
        }
    }

    pub fn fence_mut(&mut self) -> Option<&mut FenceState> {
        match self {
            LandUse::Fence(fence) => Some(fence),
            _ => None,
        }
    }
}

/// Soil moisture; a watered cell has no dry-start time and vice versa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Moisture {
    Dry { since: Option<SimTime> },
    Watered { since: SimTime },
}

impl Default for Moisture {
    fn default() -> Self {
        Moisture::Dry { since: None }
    }
}

impl Moisture {
    pub fn dry_since(now: SimTime) -> Self {
        Moisture::Dry { since: Some(now) }
    }

    pub fn is_watered(&self) -> bool {
        matches!(self, Moisture::Watered { .. })
    }

    /// Time spent dry, if the dry period has a recorded start
    pub fn dry_for(&self, now: SimTime) -> Option<SimTime> {
        match self {
            Moisture::Dry { since: Some(since) } => Some(now.saturating_sub(*since)),
            _ => None,
        }
    }
}

/// Fertilizer applied to a cell. `applied_at` outlives `active` so the hidden
/// growth buff can be measured after the visible flag expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fertilizer {
    pub active: bool,
    pub applied_at: Option<SimTime>,
}

impl Fertilizer {
    pub fn applied(now: SimTime) -> Self {
        Self {
            active: true,
            applied_at: Some(now),
        }
    }
}

/// Item kinds produced or consumed by the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Seed(CropSpecies),
    Produce(CropSpecies),
    Wood,
    Meat,
    Egg,
    Milk,
    Wool,
}

/// Item lying on a tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundItem {
    pub kind: ItemKind,
    pub amount: u32,
    /// Offset within the tile in pixels
    pub offset: (f32, f32),
}

/// Indicator shown above a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellStatus {
    #[default]
    None,
    NeedsWater,
    NeedsFertilizer,
    NeedsBoth,
    ReadyToHarvest,
    Dead,
}

/// Full state of one grid coordinate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub kind: TileKind,
    pub land: LandUse,
    pub moisture: Moisture,
    pub fertilizer: Fertilizer,
    pub item: Option<GroundItem>,
}

impl Cell {
    pub fn grass() -> Self {
        Self::default()
    }

    pub fn water() -> Self {
        Self {
            kind: TileKind::Water,
            ..Self::default()
        }
    }

    /// Tilled, dry soil with nothing planted
    pub fn bare_soil(now: SimTime) -> Self {
        Self {
            kind: TileKind::Soil,
            moisture: Moisture::dry_since(now),
            ..Self::default()
        }
    }

    pub fn tree(tree: TreeState) -> Self {
        Self {
            kind: TileKind::Tree,
            land: LandUse::Tree(tree),
            ..Self::default()
        }
    }

    pub fn fence(fence: FenceState) -> Self {
        Self {
            kind: TileKind::Fence,
            land: LandUse::Fence(fence),
            ..Self::default()
        }
    }

    /// True when the cell carries nothing beyond plain grass
    pub fn is_default(&self) -> bool {
        *self == Cell::default()
    }

    pub fn is_watered(&self) -> bool {
        self.moisture.is_watered()
    }

    pub fn crop(&self) -> Option<&CropState> {
        self.land.crop()
    }

    pub fn tree_state(&self) -> Option<&TreeState> {
        self.land.tree()
    }

    pub fn fence_state(&self) -> Option<&FenceState> {
        self.land.fence()
    }

    pub fn set_watered(&mut self, now: SimTime) {
        self.moisture = Moisture::Watered { since: now };
        if self.kind == TileKind::Soil {
            self.kind = TileKind::SoilWet;
        }
    }

    pub fn set_dry(&mut self, now: SimTime) {
        self.moisture = Moisture::dry_since(now);
        if self.kind == TileKind::SoilWet {
            self.kind = TileKind::Soil;
        }
    }
}

/// Tool held by the player when interacting with a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Hand,
    Hoe,
    Seed(CropSpecies),
    WateringCan,
    Fertilizer,
    Shovel,
    Axe,
    Fence,
}

/// What an animal is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimalAction {
    #[default]
    Idle,
    Walk,
    Eat,
}

/// Why an animal died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    Killed,
}

/// Read-only weather and daylight snapshot pushed in by the driver each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub raining: bool,
    /// Daylight in 0..=1
    pub light_intensity: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            raining: false,
            light_intensity: 1.0,
        }
    }
}

/// Discrete events observed by quest, shop and rendering collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    CropHarvested { pos: TilePos, species: CropSpecies, amount: u32 },
    CropDied { pos: TilePos, species: CropSpecies },
    CropCleared { pos: TilePos, species: CropSpecies },
    TreeSpawned { pos: TilePos, stage: u8 },
    TreeFelled { pos: TilePos, wood: u32 },
    TreeRegrew { pos: TilePos, stage: u8 },
    FenceToggled { pos: TilePos, open: bool },
    ActionCommitted { pos: TilePos, tool: Tool },
    AnimalSpawned { id: AnimalId, species: AnimalSpecies },
    AnimalGrew { id: AnimalId, from: AnimalSpecies, to: AnimalSpecies },
    AnimalDied { id: AnimalId, species: AnimalSpecies, cause: DeathCause, meat: u32 },
    ProductReady { id: AnimalId, item: ItemKind },
    ProductCollected { id: AnimalId, item: ItemKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_pos_to_tile() {
        assert_eq!(WorldPos::new(0.0, 0.0).tile(16.0), TilePos::new(0, 0));
        assert_eq!(WorldPos::new(31.9, 16.0).tile(16.0), TilePos::new(1, 1));
        assert_eq!(WorldPos::new(-0.5, -16.5).tile(16.0), TilePos::new(-1, -2));
    }

    #[test]
    fn test_fence_links_bits() {
        let mut links = FenceLinks::default();
        links.set(Direction::Up, true);
        links.set(Direction::Left, true);
        assert_eq!(links.0, FenceLinks::TOP | FenceLinks::LEFT);
        assert!(links.has(Direction::Up));
        assert!(!links.has(Direction::Right));

        links.set(Direction::Up, false);
        assert_eq!(links.0, FenceLinks::LEFT);
    }

    #[test]
    fn test_moisture_transitions() {
        let mut cell = Cell::bare_soil(100);
        assert_eq!(cell.moisture.dry_for(350), Some(250));

        cell.set_watered(400);
        assert_eq!(cell.kind, TileKind::SoilWet);
        assert_eq!(cell.moisture.dry_for(500), None);

        cell.set_dry(900);
        assert_eq!(cell.kind, TileKind::Soil);
        assert!(!cell.is_watered());
    }

    #[test]
    fn test_default_cell_is_grass() {
        let cell = Cell::default();
        assert_eq!(cell.kind, TileKind::Grass);
        assert!(cell.land.is_empty());
        assert!(cell.is_default());
        assert!(!Cell::water().is_default());
    }

    #[test]
    fn test_tree_stage_clamped() {
        let tree = TreeState::new(9, 0);
        assert_eq!(tree.stage, TREE_MAX_STAGE);
        assert!(TreeState::stump(0).is_stump());
    }
}
