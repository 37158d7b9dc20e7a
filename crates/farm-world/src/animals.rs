//! Animal roster: hunger, starvation, growth, wandering and production.

use crate::animal::Animal;
use crate::collision::CollisionEngine;
use crate::grid::Grid;
use farm_core::{
    AnimalAction, AnimalConfig, AnimalId, AnimalSpecies, DeathCause, Direction, Environment,
    Error, ItemKind, Result, SimTime, WorldEvent, WorldPos,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

pub struct AnimalEngine {
    config: AnimalConfig,
    animals: Vec<Animal>,
    last_update: Option<SimTime>,
}

impl AnimalEngine {
    pub fn new(config: AnimalConfig) -> Self {
        Self {
            config,
            animals: Vec::new(),
            last_update: None,
        }
    }

    pub fn config(&self) -> &AnimalConfig {
        &self.config
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn get(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnimalId) -> Result<&mut Animal> {
        self.animals
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::AnimalNotFound(id))
    }

    pub fn living_count(&self) -> usize {
        self.animals.iter().filter(|a| a.is_alive()).count()
    }

    /// Replace the roster, e.g. from a snapshot
    pub fn restore(&mut self, animals: Vec<Animal>) {
        self.animals = animals;
        self.last_update = None;
    }

    /// Add an animal with the configured starting hunger
    pub fn spawn(
        &mut self,
        species: AnimalSpecies,
        position: WorldPos,
        now: SimTime,
        events: &mut Vec<WorldEvent>,
    ) -> AnimalId {
        let animal = Animal::new(species, position, self.config.initial_hunger, now);
        let id = animal.id;
        debug!(%id, ?species, x = position.x, y = position.y, "Spawned animal");
        events.push(WorldEvent::AnimalSpawned { id, species });
        self.animals.push(animal);
        id
    }

    /// Advance every animal if the update interval has elapsed
    pub fn update(
        &mut self,
        grid: &mut Grid,
        collision: &CollisionEngine,
        now: SimTime,
        env: &Environment,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WorldEvent>,
    ) {
        let dt = match self.last_update {
            Some(last) => {
                let dt = now.saturating_sub(last);
                if dt < self.config.update_interval_ms {
                    return;
                }
                dt
            }
            None => 0,
        };
        self.last_update = Some(now);

        // Animals marked dead last tick leave the roster now
        self.animals.retain(|a| a.is_alive());

        let config = &self.config;
        for animal in self.animals.iter_mut() {
            update_hunger(config, animal, now);

            if starved(config, animal, now) {
                let meat = animal.meat_yield(now, config.meat_age_step_ms);
                drop_meat(grid, collision.tile_size(), animal, meat);
                animal.kill();
                info!(
                    event = "animal_died",
                    id = %animal.id,
                    species = ?animal.species,
                    cause = "starvation",
                    meat,
                    "Animal starved"
                );
                events.push(WorldEvent::AnimalDied {
                    id: animal.id,
                    species: animal.species,
                    cause: DeathCause::Starvation,
                    meat,
                });
                continue;
            }

            update_growth(animal, now, events);
            update_movement(config, grid, collision, animal, now, dt, env, rng);
            update_production(config, animal, now, events);
        }
    }

    /// Top up hunger and start a short eating animation
    pub fn feed(&mut self, id: AnimalId, now: SimTime) -> Result<()> {
        let config = &self.config;
        let animal = self
            .animals
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::AnimalNotFound(id))?;
        if !animal.is_alive() {
            return Err(Error::InvalidState(format!("animal {} is dead", id)));
        }
        if animal.species.is_egg() {
            return Err(Error::InvalidState("eggs cannot be fed".to_string()));
        }

        // Settle the hunger owed since the last pass before topping up
        update_hunger(config, animal, now);
        animal.feed(config.feed_amount, now, config.eat_duration_ms);
        if !animal.is_hungry(config.hunger_warning_threshold) {
            animal.starvation_started_at = None;
        }
        Ok(())
    }

    /// Take the animal's product if it is ready, restarting its timer
    pub fn collect_product(
        &mut self,
        id: AnimalId,
        now: SimTime,
        events: &mut Vec<WorldEvent>,
    ) -> Result<Option<ItemKind>> {
        let animal = self.get_mut(id)?;
        if !animal.is_alive() || !animal.production.ready {
            return Ok(None);
        }
        let Some(item) = animal.species.product() else {
            return Ok(None);
        };

        animal.production.ready = false;
        animal.production.last_harvest_at = now;
        events.push(WorldEvent::ProductCollected { id, item });
        Ok(Some(item))
    }

    /// Kill an animal outright, dropping its meat. Returns the meat dropped.
    pub fn kill(
        &mut self,
        id: AnimalId,
        grid: &mut Grid,
        tile_size: f32,
        now: SimTime,
        events: &mut Vec<WorldEvent>,
    ) -> Result<u32> {
        let age_step = self.config.meat_age_step_ms;
        let animal = self.get_mut(id)?;
        if !animal.is_alive() {
            return Err(Error::InvalidState(format!("animal {} is already dead", id)));
        }

        let meat = animal.meat_yield(now, age_step);
        drop_meat(grid, tile_size, animal, meat);
        animal.kill();
        info!(event = "animal_died", %id, species = ?animal.species, cause = "killed", meat, "Animal killed");
        events.push(WorldEvent::AnimalDied {
            id,
            species: animal.species,
            cause: DeathCause::Killed,
            meat,
        });
        Ok(meat)
    }

    /// Breed two adults of the same species. Returns the offspring's id, or
    /// `None` when the pair is not currently able to breed.
    pub fn breed(
        &mut self,
        a: AnimalId,
        b: AnimalId,
        now: SimTime,
        events: &mut Vec<WorldEvent>,
    ) -> Result<Option<AnimalId>> {
        if a == b {
            return Ok(None);
        }
        let first = self.get(a).ok_or(Error::AnimalNotFound(a))?;
        let second = self.get(b).ok_or(Error::AnimalNotFound(b))?;

        if !self.can_breed(first, now) || !self.can_breed(second, now) {
            return Ok(None);
        }
        if first.species != second.species {
            return Ok(None);
        }
        let Some(child) = first.species.offspring() else {
            return Ok(None);
        };

        let mid = first.center().midpoint(&second.center());
        let (w, h) = child.hitbox();
        let position = WorldPos::new(mid.x - w / 2.0, mid.y - h / 2.0);

        for parent in self.animals.iter_mut().filter(|x| x.id == a || x.id == b) {
            parent.last_bred_at = Some(now);
        }
        let id = self.spawn(child, position, now, events);
        info!(event = "animal_born", %id, species = ?child, "Animals bred");
        Ok(Some(id))
    }

    fn can_breed(&self, animal: &Animal, now: SimTime) -> bool {
        animal.is_alive()
            && !animal.species.is_young()
            && animal.hunger >= self.config.breed_min_hunger
            && animal
                .last_bred_at
                .map_or(true, |t| now.saturating_sub(t) >= self.config.breed_cooldown_ms)
    }
}

fn update_hunger(config: &AnimalConfig, animal: &mut Animal, now: SimTime) {
    let elapsed = now.saturating_sub(animal.last_hunger_update_at) as f32 / 1000.0;
    let decay = config.hunger_decay_per_sec * animal.species.hunger_rate() * elapsed;
    animal.hunger = (animal.hunger - decay).max(0.0);
    animal.last_hunger_update_at = now;

    if animal.is_hungry(config.hunger_warning_threshold) {
        animal.starvation_started_at.get_or_insert(now);
    } else {
        animal.starvation_started_at = None;
    }
}

fn starved(config: &AnimalConfig, animal: &Animal, now: SimTime) -> bool {
    animal
        .starvation_started_at
        .is_some_and(|start| now.saturating_sub(start) >= config.starvation_duration_ms)
}

fn update_growth(animal: &mut Animal, now: SimTime, events: &mut Vec<WorldEvent>) {
    let Some(next) = animal.species.grows_into() else {
        return;
    };
    if animal.age_ms(now) < animal.species.growth_duration_ms() {
        return;
    }

    let from = animal.species;
    animal.species = next;
    animal.spawned_at = now;
    animal.production.last_harvest_at = now;
    animal.production.ready = false;
    debug!(id = %animal.id, ?from, to = ?next, "Animal grew");
    events.push(WorldEvent::AnimalGrew {
        id: animal.id,
        from,
        to: next,
    });
}

#[allow(clippy::too_many_arguments)]
fn update_movement(
    config: &AnimalConfig,
    grid: &Grid,
    collision: &CollisionEngine,
    animal: &mut Animal,
    now: SimTime,
    dt: SimTime,
    env: &Environment,
    rng: &mut ChaCha8Rng,
) {
    if !animal.species.can_move() {
        return;
    }

    if animal.action == AnimalAction::Eat {
        match animal.eating_until {
            Some(until) if now < until => return,
            _ => {
                animal.eating_until = None;
                animal.action = AnimalAction::Idle;
            }
        }
    }

    if env.light_intensity < config.rest_light_threshold {
        animal.action = AnimalAction::Idle;
        return;
    }

    let interval_elapsed =
        now.saturating_sub(animal.last_direction_change_at) >= config.direction_change_interval_ms;
    if interval_elapsed || rng.gen::<f32>() < config.direction_change_chance {
        animal.facing = random_direction(rng);
        animal.action = if rng.gen::<f32>() < config.idle_chance {
            AnimalAction::Idle
        } else {
            AnimalAction::Walk
        };
        animal.last_direction_change_at = now;
    }

    if animal.action != AnimalAction::Walk || dt == 0 {
        return;
    }

    let distance = animal.species.speed() * dt as f32 / 1000.0;
    let (dx, dy) = animal.facing.to_delta();
    let target = WorldPos::new(
        animal.position.x + dx * distance,
        animal.position.y + dy * distance,
    );

    if can_occupy(grid, collision, animal, target) {
        animal.position = target;
    } else {
        // Turn away and rest until the next direction change
        let blocked = animal.facing;
        while animal.facing == blocked {
            animal.facing = random_direction(rng);
        }
        animal.action = AnimalAction::Idle;
        animal.last_direction_change_at = now;
    }
}

fn update_production(
    config: &AnimalConfig,
    animal: &mut Animal,
    now: SimTime,
    events: &mut Vec<WorldEvent>,
) {
    let Some(item) = animal.species.product() else {
        return;
    };
    if animal.production.ready {
        return;
    }

    let mut duration = animal.species.production_ms();
    if animal.is_hungry(config.hunger_warning_threshold) {
        duration = (duration as f64 * config.hungry_production_multiplier as f64) as SimTime;
    }

    if now.saturating_sub(animal.production.last_harvest_at) >= duration {
        animal.production.ready = true;
        debug!(id = %animal.id, ?item, "Product ready");
        events.push(WorldEvent::ProductReady { id: animal.id, item });
    }
}

fn random_direction(rng: &mut ChaCha8Rng) -> Direction {
    Direction::all()[rng.gen_range(0..4)]
}

/// Probe the hitbox corners and centre; the world edge counts as a wall
fn can_occupy(grid: &Grid, collision: &CollisionEngine, animal: &Animal, position: WorldPos) -> bool {
    let max_x = grid.width as f32 * collision.tile_size();
    let max_y = grid.height as f32 * collision.tile_size();

    animal.probe_points(position).iter().all(|p| {
        p.x >= 0.0 && p.y >= 0.0 && p.x < max_x && p.y < max_y && collision.can_pass_through(grid, p.x, p.y)
    })
}

/// Leave meat on the tile under the animal's visual centre
fn drop_meat(grid: &mut Grid, tile_size: f32, animal: &Animal, meat: u32) {
    if meat == 0 {
        return;
    }
    let center = animal.center();
    let tile = center.tile(tile_size);
    let offset = (
        center.x - tile.col as f32 * tile_size,
        center.y - tile.row as f32 * tile_size,
    );
    grid.drop_item(tile, ItemKind::Meat, meat, offset);
}
