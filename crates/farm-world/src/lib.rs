//! Farm world simulation engine.
//!
//! Owns the tile grid and advances crops, trees, animals and deferred
//! player actions one tick at a time.

pub mod grid;
pub mod noise;
pub mod collision;
pub mod crops;
pub mod trees;
pub mod animal;
pub mod animals;
pub mod scheduler;
pub mod snapshot;
pub mod simulation;

pub use grid::Grid;
pub use noise::noise;
pub use collision::{CollisionEngine, Rect};
pub use crops::CropEngine;
pub use trees::{ChopOutcome, TreeEngine};
pub use animal::Animal;
pub use animals::AnimalEngine;
pub use scheduler::{ActionOutcome, PendingAction, PendingResult, Scheduler, SchedulerStats};
pub use snapshot::WorldSnapshot;
pub use simulation::{Simulation, SimulationStats};
