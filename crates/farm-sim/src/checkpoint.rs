//! Checkpoint and resume for the headless driver.

use anyhow::{Context, Result};
use farm_core::SimTime;
use farm_world::{Simulation, SimulationStats};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Wall-clock seconds when the checkpoint was written
    pub timestamp: i64,
    pub tick: u64,
    pub sim_time: SimTime,
    pub stats: SimulationStats,
    /// Encoded `WorldSnapshot`
    pub world: Vec<u8>,
}

impl Checkpoint {
    pub fn capture(sim: &Simulation, tick: u64) -> Result<Self> {
        let world = sim
            .snapshot()
            .to_bytes()
            .context("Failed to encode world snapshot")?;

        Ok(Self {
            version: CHECKPOINT_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            tick,
            sim_time: sim.now(),
            stats: sim.stats(),
            world,
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self).context("Failed to serialize checkpoint")?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write checkpoint to {:?}", path))?;
        info!(path = ?path, bytes = bytes.len(), tick = self.tick, "Checkpoint written");
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read checkpoint {:?}", path))?;
        let checkpoint: Checkpoint =
            bincode::deserialize(&bytes).context("Failed to deserialize checkpoint")?;
        if checkpoint.version != CHECKPOINT_VERSION {
            anyhow::bail!(
                "Unsupported checkpoint version {} (expected {})",
                checkpoint.version,
                CHECKPOINT_VERSION
            );
        }
        info!(path = ?path, tick = checkpoint.tick, sim_time = checkpoint.sim_time, "Checkpoint loaded");
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{AnimalSpecies, Cell, SimConfig, TilePos, WorldPos};

    #[test]
    fn test_checkpoint_file_round_trip() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.grid_mut().set(TilePos::new(3, 3), Cell::water());
        sim.spawn_animal(AnimalSpecies::Cow, WorldPos::new(80.0, 80.0), 0);

        let path = std::env::temp_dir().join(format!("farm-sim-{}.ckpt", std::process::id()));
        Checkpoint::capture(&sim, 42).unwrap().write(&path).unwrap();
        let loaded = Checkpoint::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.tick, 42);
        assert_eq!(loaded.stats, sim.stats());

        let restored = Simulation::restore_bytes(SimConfig::default(), &loaded.world).unwrap();
        assert_eq!(restored.cell(TilePos::new(3, 3)), &Cell::water());
        assert_eq!(restored.animals().len(), 1);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        assert!(Checkpoint::read("/nonexistent/farm.ckpt").is_err());
    }
}
