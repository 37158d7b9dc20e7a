//! Static stats for crop and animal species.

use crate::types::{ItemKind, SimTime};
use serde::{Deserialize, Serialize};

/// Plantable crop species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropSpecies {
    Wheat,
    Carrot,
    Tomato,
    Corn,
    Pumpkin,
}

impl CropSpecies {
    pub fn all() -> [CropSpecies; 5] {
        [
            CropSpecies::Wheat,
            CropSpecies::Carrot,
            CropSpecies::Tomato,
            CropSpecies::Corn,
            CropSpecies::Pumpkin,
        ]
    }

    /// Index of the terminal (harvestable) growth stage
    pub fn max_stage(self) -> u8 {
        match self {
            CropSpecies::Wheat => 4,
            CropSpecies::Carrot => 3,
            CropSpecies::Tomato => 5,
            CropSpecies::Corn => 5,
            CropSpecies::Pumpkin => 6,
        }
    }

    /// Unmodified growth time per stage
    pub fn time_per_stage_ms(self) -> SimTime {
        match self {
            CropSpecies::Wheat => 60_000,
            CropSpecies::Carrot => 45_000,
            CropSpecies::Tomato => 75_000,
            CropSpecies::Corn => 90_000,
            CropSpecies::Pumpkin => 120_000,
        }
    }

    /// Inclusive harvest yield range
    pub fn yield_range(self) -> (u32, u32) {
        match self {
            CropSpecies::Wheat => (2, 4),
            CropSpecies::Carrot => (1, 3),
            CropSpecies::Tomato => (3, 6),
            CropSpecies::Corn => (2, 5),
            CropSpecies::Pumpkin => (1, 2),
        }
    }

    pub fn min_yield(self) -> u32 {
        self.yield_range().0
    }

    pub fn max_yield(self) -> u32 {
        self.yield_range().1
    }
}

/// Animal species, including the juvenile forms of each growth chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimalSpecies {
    Egg,
    Chick,
    Chicken,
    Calf,
    Cow,
    Lamb,
    Sheep,
    Piglet,
    Pig,
}

impl AnimalSpecies {
    /// Next form in the growth chain, if any
    pub fn grows_into(self) -> Option<AnimalSpecies> {
        match self {
            AnimalSpecies::Egg => Some(AnimalSpecies::Chick),
            AnimalSpecies::Chick => Some(AnimalSpecies::Chicken),
            AnimalSpecies::Calf => Some(AnimalSpecies::Cow),
            AnimalSpecies::Lamb => Some(AnimalSpecies::Sheep),
            AnimalSpecies::Piglet => Some(AnimalSpecies::Pig),
            _ => None,
        }
    }

    /// Time spent in this form before growing into the next one
    pub fn growth_duration_ms(self) -> SimTime {
        match self {
            AnimalSpecies::Egg => 120_000,
            AnimalSpecies::Chick => 240_000,
            AnimalSpecies::Calf => 480_000,
            AnimalSpecies::Lamb => 360_000,
            AnimalSpecies::Piglet => 300_000,
            _ => SimTime::MAX,
        }
    }

    /// Species born from two breeding adults
    pub fn offspring(self) -> Option<AnimalSpecies> {
        match self {
            AnimalSpecies::Chicken => Some(AnimalSpecies::Egg),
            AnimalSpecies::Cow => Some(AnimalSpecies::Calf),
            AnimalSpecies::Sheep => Some(AnimalSpecies::Lamb),
            AnimalSpecies::Pig => Some(AnimalSpecies::Piglet),
            _ => None,
        }
    }

    /// Babies and eggs drop no meat and cannot breed
    pub fn is_young(self) -> bool {
        self.grows_into().is_some()
    }

    pub fn is_egg(self) -> bool {
        self == AnimalSpecies::Egg
    }

    pub fn can_move(self) -> bool {
        !self.is_egg()
    }

    /// Walking speed in pixels per second
    pub fn speed(self) -> f32 {
        match self {
            AnimalSpecies::Egg => 0.0,
            AnimalSpecies::Chick => 14.0,
            AnimalSpecies::Chicken => 20.0,
            AnimalSpecies::Calf => 12.0,
            AnimalSpecies::Cow => 10.0,
            AnimalSpecies::Lamb => 14.0,
            AnimalSpecies::Sheep => 12.0,
            AnimalSpecies::Piglet => 16.0,
            AnimalSpecies::Pig => 13.0,
        }
    }

    /// Collision box (width, height) in pixels, centred on the animal
    pub fn hitbox(self) -> (f32, f32) {
        match self {
            AnimalSpecies::Egg => (6.0, 6.0),
            AnimalSpecies::Chick => (8.0, 8.0),
            AnimalSpecies::Chicken => (10.0, 10.0),
            AnimalSpecies::Calf | AnimalSpecies::Lamb | AnimalSpecies::Piglet => (12.0, 10.0),
            AnimalSpecies::Cow => (22.0, 14.0),
            AnimalSpecies::Sheep | AnimalSpecies::Pig => (18.0, 12.0),
        }
    }

    /// Hunger drain relative to the configured base rate
    pub fn hunger_rate(self) -> f32 {
        match self {
            AnimalSpecies::Egg => 0.0,
            AnimalSpecies::Chick | AnimalSpecies::Chicken => 0.8,
            AnimalSpecies::Cow | AnimalSpecies::Pig => 1.2,
            _ => 1.0,
        }
    }

    /// Product periodically yielded by this species
    pub fn product(self) -> Option<ItemKind> {
        match self {
            AnimalSpecies::Chicken => Some(ItemKind::Egg),
            AnimalSpecies::Cow => Some(ItemKind::Milk),
            AnimalSpecies::Sheep => Some(ItemKind::Wool),
            _ => None,
        }
    }

    pub fn production_ms(self) -> SimTime {
        match self {
            AnimalSpecies::Chicken => 180_000,
            AnimalSpecies::Cow => 240_000,
            AnimalSpecies::Sheep => 420_000,
            _ => SimTime::MAX,
        }
    }

    /// (base meat, maximum meat) dropped on death
    pub fn meat_range(self) -> (u32, u32) {
        match self {
            AnimalSpecies::Chicken => (1, 2),
            AnimalSpecies::Cow => (3, 6),
            AnimalSpecies::Sheep => (2, 4),
            AnimalSpecies::Pig => (3, 5),
            _ => (0, 0),
        }
    }
}
