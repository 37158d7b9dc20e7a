//! Scripted player that cycles through farm chores.

use farm_core::{AnimalSpecies, CropSpecies, ItemKind, SimTime, TilePos, Tool, WorldEvent, WorldPos};
use farm_world::Simulation;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// Player collision box in pixels
const PLAYER_SIZE: f32 = 12.0;
/// Tiles around the farmer searched for trees and dropped items
const SEARCH_RADIUS: i32 = 8;
/// Pigs beyond this many are slaughtered
const MAX_PIGS: usize = 3;
const FEED_BELOW: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Chore {
    Tend(TilePos),
    BuildFence(TilePos),
    ToggleGate(TilePos),
    Chop,
    Herd,
    Gather,
}

/// Rectangular fenced pen; the gate sits on the bottom edge
#[derive(Debug, Clone, Copy)]
pub struct Pen {
    pub min: TilePos,
    pub max: TilePos,
}

impl Pen {
    fn gate(&self) -> TilePos {
        TilePos::new((self.min.col + self.max.col) / 2, self.max.row)
    }

    fn border(&self) -> Vec<TilePos> {
        let mut tiles = Vec::new();
        for row in self.min.row..=self.max.row {
            for col in self.min.col..=self.max.col {
                let edge = row == self.min.row || row == self.max.row || col == self.min.col || col == self.max.col;
                if edge {
                    tiles.push(TilePos::new(col, row));
                }
            }
        }
        tiles
    }

    fn interior_center(&self, tile_size: f32) -> WorldPos {
        WorldPos::new(
            (self.min.col + self.max.col + 1) as f32 * tile_size / 2.0,
            (self.min.row + self.max.row + 1) as f32 * tile_size / 2.0,
        )
    }
}

pub struct Farmer {
    position: WorldPos,
    tile_size: f32,
    chores: VecDeque<Chore>,
    chore_interval_ms: SimTime,
    next_chore_at: SimTime,
    seed_cycle: usize,
    inventory: HashMap<ItemKind, u32>,
}

impl Farmer {
    pub fn new(plot_min: TilePos, plot_max: TilePos, pen: Pen, tile_size: f32, chore_interval_ms: SimTime) -> Self {
        let mut chores = VecDeque::new();
        for tile in pen.border() {
            chores.push_back(Chore::BuildFence(tile));
        }
        for row in plot_min.row..=plot_max.row {
            for col in plot_min.col..=plot_max.col {
                chores.push_back(Chore::Tend(TilePos::new(col, row)));
            }
            chores.push_back(Chore::Herd);
        }
        chores.push_back(Chore::Chop);
        chores.push_back(Chore::ToggleGate(pen.gate()));
        chores.push_back(Chore::Gather);
        chores.push_back(Chore::ToggleGate(pen.gate()));

        Self {
            position: pen.interior_center(tile_size),
            tile_size,
            chores,
            chore_interval_ms,
            next_chore_at: 0,
            seed_cycle: 0,
            inventory: HashMap::new(),
        }
    }

    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn inventory(&self) -> &HashMap<ItemKind, u32> {
        &self.inventory
    }

    /// Put a starter herd inside the pen
    pub fn stock_pen(sim: &mut Simulation, pen: Pen, now: SimTime) {
        let tile_size = sim.config().world.tile_size;
        let herd = [
            AnimalSpecies::Chicken,
            AnimalSpecies::Chicken,
            AnimalSpecies::Egg,
            AnimalSpecies::Cow,
            AnimalSpecies::Cow,
            AnimalSpecies::Sheep,
            AnimalSpecies::Lamb,
            AnimalSpecies::Pig,
            AnimalSpecies::Pig,
        ];
        let width = (pen.max.col - pen.min.col - 1).max(1);
        for (i, species) in herd.into_iter().enumerate() {
            let i = i as i32;
            let tile = TilePos::new(pen.min.col + 1 + i % width, pen.min.row + 1 + i / width);
            let position = WorldPos::new(tile.col as f32 * tile_size + 2.0, tile.row as f32 * tile_size + 2.0);
            sim.spawn_animal(species, position, now);
        }
    }

    fn add(&mut self, item: ItemKind, amount: u32) {
        *self.inventory.entry(item).or_insert(0) += amount;
    }

    /// Book yields reported by the world
    pub fn observe(&mut self, events: &[WorldEvent]) {
        for event in events {
            match *event {
                WorldEvent::CropHarvested { species, amount, .. } => {
                    self.add(ItemKind::Produce(species), amount);
                    self.add(ItemKind::Seed(species), 1);
                }
                WorldEvent::TreeFelled { wood, .. } => self.add(ItemKind::Wood, wood),
                WorldEvent::ProductCollected { item, .. } => self.add(item, 1),
                _ => {}
            }
        }
    }

    /// Do the next chore when it is due
    pub fn act(&mut self, sim: &mut Simulation, now: SimTime) {
        if now < self.next_chore_at {
            return;
        }
        self.next_chore_at = now + self.chore_interval_ms;

        let Some(chore) = self.chores.pop_front() else {
            return;
        };
        let repeat = match chore {
            Chore::Tend(tile) => {
                self.tend(sim, tile, now);
                true
            }
            // Dropped from the rota once the post is standing
            Chore::BuildFence(tile) => {
                if sim.cell(tile).fence_state().is_some() {
                    false
                } else {
                    self.walk_to(sim, tile.offset(0, 1));
                    sim.interact(Tool::Fence, tile, now);
                    true
                }
            }
            Chore::ToggleGate(tile) => {
                self.walk_to(sim, tile.offset(0, 1));
                sim.interact(Tool::Hand, tile, now);
                true
            }
            Chore::Chop => {
                self.chop(sim, now);
                true
            }
            Chore::Herd => {
                self.herd(sim, now);
                true
            }
            Chore::Gather => {
                self.gather(sim);
                true
            }
        };
        if repeat {
            self.chores.push_back(chore);
        }
    }

    fn tile_center(&self, tile: TilePos) -> WorldPos {
        WorldPos::new(
            (tile.col as f32 + 0.5) * self.tile_size,
            (tile.row as f32 + 0.5) * self.tile_size,
        )
    }

    /// Step onto `tile` if the player box fits there
    fn walk_to(&mut self, sim: &Simulation, tile: TilePos) {
        let target = self.tile_center(tile);
        if !sim.check_collision(target.x, target.y, PLAYER_SIZE, PLAYER_SIZE) {
            self.position = target;
        }
    }

    fn next_seed(&mut self) -> CropSpecies {
        let species = CropSpecies::all();
        let seed = species[self.seed_cycle % species.len()];
        self.seed_cycle += 1;
        seed
    }

    fn tend(&mut self, sim: &mut Simulation, tile: TilePos, now: SimTime) {
        self.walk_to(sim, tile);
        if sim.interact(Tool::Hand, tile, now) || sim.interact(Tool::Hoe, tile, now) {
            return;
        }
        let seed = self.next_seed();
        if sim.interact(Tool::Seed(seed), tile, now) {
            return;
        }
        // Fresh seeds stay in the cycle when planting was not possible
        self.seed_cycle -= 1;
        if !sim.interact(Tool::WateringCan, tile, now) {
            sim.interact(Tool::Fertilizer, tile, now);
        }
    }

    fn chop(&mut self, sim: &mut Simulation, now: SimTime) {
        let here = self.position.tile(self.tile_size);
        let nearest = sim
            .grid()
            .cells()
            .filter(|(pos, cell)| {
                cell.tree_state().is_some_and(|tree| !tree.is_stump())
                    && pos.chebyshev_distance(&here) <= SEARCH_RADIUS
            })
            .min_by_key(|(pos, _)| pos.chebyshev_distance(&here))
            .map(|(pos, _)| pos);

        if let Some(tree) = nearest {
            self.walk_to(sim, tree.offset(0, 1));
            sim.interact(Tool::Axe, tree, now);
        }
    }

    fn herd(&mut self, sim: &mut Simulation, now: SimTime) {
        let animals: Vec<_> = sim
            .animals()
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| (a.id, a.species, a.hunger, a.production.ready))
            .collect();

        for &(id, species, hunger, ready) in &animals {
            if hunger < FEED_BELOW && !species.is_egg() && sim.feed_animal(id, now).is_ok() {
                debug!(%id, ?species, "Fed animal");
            }
            if ready {
                if let Ok(Some(item)) = sim.collect_product(id, now) {
                    debug!(%id, ?item, "Collected product");
                }
            }
        }

        // Breed the first eligible pair of each adult species
        for species in [AnimalSpecies::Chicken, AnimalSpecies::Cow, AnimalSpecies::Sheep, AnimalSpecies::Pig] {
            let pair: Vec<_> = animals
                .iter()
                .filter(|(_, s, _, _)| *s == species)
                .map(|(id, ..)| *id)
                .take(2)
                .collect();
            if let [a, b] = pair.as_slice() {
                if let Ok(Some(child)) = sim.breed_animals(*a, *b, now) {
                    info!(event = "farmer_bred", ?species, %child, "Farmer bred animals");
                }
            }
        }

        let pigs: Vec<_> = animals
            .iter()
            .filter(|(_, s, _, _)| *s == AnimalSpecies::Pig)
            .map(|(id, ..)| *id)
            .collect();
        for id in pigs.iter().skip(MAX_PIGS) {
            if let Ok(meat) = sim.kill_animal(*id, now) {
                debug!(%id, meat, "Slaughtered pig");
            }
        }
    }

    fn gather(&mut self, sim: &mut Simulation) {
        let here = self.position.tile(self.tile_size);
        let piles: Vec<TilePos> = sim
            .grid()
            .cells()
            .filter(|(pos, cell)| cell.item.is_some() && pos.chebyshev_distance(&here) <= SEARCH_RADIUS)
            .map(|(pos, _)| pos)
            .collect();

        for pos in piles {
            if let Some(item) = sim.take_item(pos) {
                self.add(item.kind, item.amount);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{Environment, SimConfig, TileKind};

    fn pen() -> Pen {
        Pen {
            min: TilePos::new(10, 2),
            max: TilePos::new(14, 6),
        }
    }

    fn sim() -> Simulation {
        let mut config = SimConfig::default();
        config.world.width = 24;
        config.world.height = 24;
        config.tree.density = 0.0;
        Simulation::new(config).unwrap()
    }

    #[test]
    fn test_pen_border() {
        let border = pen().border();
        assert_eq!(border.len(), 16);
        assert!(border.contains(&pen().gate()));
        assert_eq!(pen().gate(), TilePos::new(12, 6));
    }

    #[test]
    fn test_farmer_builds_and_plants() {
        let mut sim = sim();
        let mut farmer = Farmer::new(TilePos::new(2, 2), TilePos::new(4, 3), pen(), 16.0, 100);
        Farmer::stock_pen(&mut sim, pen(), 0);
        assert_eq!(sim.animals().len(), 9);

        let env = Environment::default();
        let mut now = 0;
        while now < 30_000 {
            farmer.act(&mut sim, now);
            sim.step(now, &env, farmer.position());
            let events = sim.drain_events();
            farmer.observe(&events);
            now += 16;
        }

        for tile in pen().border() {
            assert!(sim.cell(tile).fence_state().is_some(), "missing fence at {}", tile);
        }
        assert!(sim.cell(TilePos::new(2, 2)).crop().is_some());
        assert!(sim.cell(TilePos::new(4, 3)).kind.is_soil());
        assert_ne!(sim.cell(TilePos::new(3, 2)).kind, TileKind::Grass);
    }

    #[test]
    fn test_observe_books_yields() {
        let mut farmer = Farmer::new(TilePos::new(0, 0), TilePos::new(0, 0), pen(), 16.0, 100);
        farmer.observe(&[
            WorldEvent::CropHarvested {
                pos: TilePos::new(0, 0),
                species: CropSpecies::Corn,
                amount: 4,
            },
            WorldEvent::TreeFelled {
                pos: TilePos::new(1, 1),
                wood: 5,
            },
        ]);
        assert_eq!(farmer.inventory()[&ItemKind::Produce(CropSpecies::Corn)], 4);
        assert_eq!(farmer.inventory()[&ItemKind::Wood], 5);
    }
}
