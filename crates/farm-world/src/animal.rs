//! Animal state and management.

use crate::collision::Rect;
use farm_core::{AnimalAction, AnimalId, AnimalSpecies, Direction, SimTime, WorldPos};
use serde::{Deserialize, Serialize};

pub const MAX_HUNGER: f32 = 100.0;

/// Production timer for species that yield a product
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub last_harvest_at: SimTime,
    pub ready: bool,
}

/// An animal in the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub species: AnimalSpecies,
    /// Top-left corner of the sprite
    pub position: WorldPos,
    pub facing: Direction,
    pub hunger: f32,
    pub alive: bool,
    pub action: AnimalAction,
    pub production: Production,
    /// Start of the current growth form; reset on every transition
    pub spawned_at: SimTime,
    pub last_direction_change_at: SimTime,
    pub last_hunger_update_at: SimTime,
    pub starvation_started_at: Option<SimTime>,
    pub eating_until: Option<SimTime>,
    pub last_bred_at: Option<SimTime>,
}

impl Animal {
    pub fn new(species: AnimalSpecies, position: WorldPos, hunger: f32, now: SimTime) -> Self {
        Self {
            id: AnimalId::new(),
            species,
            position,
            facing: Direction::Down,
            hunger: hunger.clamp(0.0, MAX_HUNGER),
            alive: true,
            action: AnimalAction::Idle,
            production: Production {
                last_harvest_at: now,
                ready: false,
            },
            spawned_at: now,
            last_direction_change_at: now,
            last_hunger_update_at: now,
            starvation_started_at: None,
            eating_until: None,
            last_bred_at: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Time spent in the current growth form
    pub fn age_ms(&self, now: SimTime) -> SimTime {
        now.saturating_sub(self.spawned_at)
    }

    /// Visual centre for a sprite anchored at `position`
    pub fn center_at(&self, position: WorldPos) -> WorldPos {
        let (w, h) = self.species.hitbox();
        WorldPos::new(position.x + w / 2.0, position.y + h / 2.0)
    }

    pub fn center(&self) -> WorldPos {
        self.center_at(self.position)
    }

    /// Hitbox the animal would occupy at `position`
    pub fn hitbox_at(&self, position: WorldPos) -> Rect {
        let center = self.center_at(position);
        let (w, h) = self.species.hitbox();
        Rect::from_center(center.x, center.y, w, h)
    }

    /// Hitbox corners plus centre
    pub fn probe_points(&self, position: WorldPos) -> [WorldPos; 5] {
        let rect = self.hitbox_at(position);
        let center = self.center_at(position);
        [
            WorldPos::new(rect.min_x, rect.min_y),
            WorldPos::new(rect.max_x, rect.min_y),
            WorldPos::new(rect.min_x, rect.max_y),
            WorldPos::new(rect.max_x, rect.max_y),
            center,
        ]
    }

    pub fn is_hungry(&self, threshold: f32) -> bool {
        self.hunger < threshold
    }

    pub fn feed(&mut self, amount: f32, now: SimTime, eat_duration: SimTime) {
        self.hunger = (self.hunger + amount).min(MAX_HUNGER);
        self.action = AnimalAction::Eat;
        self.eating_until = Some(now + eat_duration);
    }

    /// Meat dropped on death; grows with age up to the species maximum
    pub fn meat_yield(&self, now: SimTime, age_step: SimTime) -> u32 {
        if self.species.is_young() {
            return 0;
        }
        let (base, max) = self.species.meat_range();
        if base == 0 {
            return 0;
        }
        let bonus = if age_step == 0 {
            0
        } else {
            (self.age_ms(now) / age_step).min(u32::MAX as u64) as u32
        };
        base.saturating_add(bonus).min(max)
    }

    pub fn kill(&mut self) {
        self.alive = false;
        self.action = AnimalAction::Idle;
        self.eating_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animal_creation() {
        let animal = Animal::new(AnimalSpecies::Cow, WorldPos::new(10.0, 20.0), 150.0, 5);

        assert_eq!(animal.species, AnimalSpecies::Cow);
        assert_eq!(animal.hunger, MAX_HUNGER);
        assert!(animal.is_alive());
        assert_eq!(animal.age_ms(105), 100);
        assert_eq!(animal.production.last_harvest_at, 5);
    }

    #[test]
    fn test_center_and_probes() {
        let animal = Animal::new(AnimalSpecies::Chicken, WorldPos::new(0.0, 0.0), 50.0, 0);
        // Chicken hitbox is 10x10
        assert_eq!(animal.center(), WorldPos::new(5.0, 5.0));

        let probes = animal.probe_points(WorldPos::new(10.0, 0.0));
        assert_eq!(probes[0], WorldPos::new(10.0, 0.0));
        assert_eq!(probes[3], WorldPos::new(20.0, 10.0));
        assert_eq!(probes[4], WorldPos::new(15.0, 5.0));
    }

    #[test]
    fn test_feeding_caps_hunger() {
        let mut animal = Animal::new(AnimalSpecies::Pig, WorldPos::default(), 90.0, 0);
        animal.feed(40.0, 1_000, 500);
        assert_eq!(animal.hunger, MAX_HUNGER);
        assert_eq!(animal.action, AnimalAction::Eat);
        assert_eq!(animal.eating_until, Some(1_500));
    }

    #[test]
    fn test_meat_yield() {
        let cow = Animal::new(AnimalSpecies::Cow, WorldPos::default(), 50.0, 0);
        assert_eq!(cow.meat_yield(0, 1_000), 3);
        assert_eq!(cow.meat_yield(2_500, 1_000), 5);
        assert_eq!(cow.meat_yield(100_000, 1_000), 6);

        let calf = Animal::new(AnimalSpecies::Calf, WorldPos::default(), 50.0, 0);
        assert_eq!(calf.meat_yield(100_000, 1_000), 0);
    }
}
