//! Deferred tool actions: plan now, apply to the grid after a delay.

use crate::grid::Grid;
use crate::trees::TreeEngine;
use farm_core::{
    Cell, CropSpecies, CropState, Fertilizer, FenceState, LandUse, OverlapPolicy, SchedulerConfig,
    SimTime, TileKind, TilePos, Tool, WorldEvent,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// What a pending action writes when it completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PendingResult {
    /// Swap the base kind of a grass tile that is still unused
    Replace(TileKind),
    /// Soak the soil under the crop that is there when the action lands
    Water(SimTime),
    /// Feed the crop that is there when the action lands
    Fertilize(SimTime),
    /// Overwrite the whole cell with a snapshot taken at plan time
    Cell(Cell),
}

/// Side effect reported to collaborators when an action completes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    None,
    Harvest { species: CropSpecies, amount: u32 },
    Cleared { species: CropSpecies },
    Chop { wood: Option<u32> },
    Gate { open: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub target: TilePos,
    pub tool: Tool,
    pub result: PendingResult,
    pub remaining_frames: u32,
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    pub pending: usize,
    pub committed: u64,
    pub rejected: u64,
    /// Completed actions whose target no longer accepted them
    pub dropped: u64,
}

pub struct Scheduler {
    config: SchedulerConfig,
    min_fertilize_stage: u8,
    queue: Vec<PendingAction>,
    committed: u64,
    rejected: u64,
    dropped: u64,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, min_fertilize_stage: u8) -> Self {
        Self {
            config,
            min_fertilize_stage,
            queue: Vec::new(),
            committed: 0,
            rejected: 0,
            dropped: 0,
        }
    }

    pub fn pending(&self) -> &[PendingAction] {
        &self.queue
    }

    pub fn has_pending(&self, pos: TilePos) -> bool {
        self.queue.iter().any(|action| action.target == pos)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            pending: self.queue.len(),
            committed: self.committed,
            rejected: self.rejected,
            dropped: self.dropped,
        }
    }

    /// Convert a duration into outer-loop frames, never less than one
    pub fn frames_for(&self, duration_ms: SimTime) -> u32 {
        let frames = (duration_ms * self.config.tick_rate_hz as u64).div_ceil(1000);
        frames.clamp(1, u32::MAX as u64) as u32
    }

    /// Work out what `tool` would do to `cell`. The first matching rule wins;
    /// `None` means the interaction does nothing.
    pub fn plan(
        &self,
        tool: Tool,
        pos: TilePos,
        cell: &Cell,
        now: SimTime,
        trees: &TreeEngine,
        rng: &mut ChaCha8Rng,
    ) -> Option<PendingAction> {
        let (result, duration, outcome) = match (tool, &cell.land) {
            (Tool::Hoe, LandUse::Empty) if cell.kind == TileKind::Grass => (
                PendingResult::Replace(TileKind::Soil),
                self.config.hoe_ms,
                ActionOutcome::None,
            ),

            (Tool::Seed(species), LandUse::Empty) if cell.kind.is_soil() => {
                let mut planted = cell.clone();
                planted.land = LandUse::Crop(CropState::new(species, now));
                (PendingResult::Cell(planted), self.config.plant_ms, ActionOutcome::None)
            }

            (Tool::WateringCan, LandUse::Crop(_)) if cell.kind == TileKind::Soil && !cell.is_watered() => (
                PendingResult::Water(now),
                self.config.water_ms,
                ActionOutcome::None,
            ),

            (Tool::Fertilizer, LandUse::Crop(crop))
                if crop.stage >= self.min_fertilize_stage && !cell.fertilizer.active =>
            {
                (PendingResult::Fertilize(now), self.config.fertilize_ms, ActionOutcome::None)
            }

            (Tool::Shovel, LandUse::Crop(crop)) => (
                PendingResult::Cell(Cell {
                    item: cell.item,
                    ..Cell::bare_soil(now)
                }),
                self.config.shovel_ms,
                ActionOutcome::Cleared {
                    species: crop.species,
                },
            ),

            (Tool::Hand, LandUse::Crop(crop)) if crop.is_mature() => {
                let (min, max) = crop.species.yield_range();
                let amount = rng.gen_range(min..=max);
                (
                    PendingResult::Cell(Cell {
                        item: cell.item,
                        ..Cell::bare_soil(now)
                    }),
                    self.config.harvest_ms,
                    ActionOutcome::Harvest {
                        species: crop.species,
                        amount,
                    },
                )
            }

            (Tool::Hand, LandUse::Fence(fence)) => {
                let mut toggled = cell.clone();
                let open = !fence.open;
                if let Some(state) = toggled.land.fence_mut() {
                    state.open = open;
                }
                (PendingResult::Cell(toggled), self.config.gate_ms, ActionOutcome::Gate { open })
            }

            (Tool::Axe, LandUse::Tree(tree)) => {
                let chop = trees.chop(tree, now)?;
                let mut chopped = cell.clone();
                chopped.land = LandUse::Tree(chop.tree);
                (
                    PendingResult::Cell(chopped),
                    self.config.chop_ms,
                    ActionOutcome::Chop { wood: chop.wood },
                )
            }

            (Tool::Fence, LandUse::Empty) if cell.kind == TileKind::Grass && cell.item.is_none() => (
                PendingResult::Cell(Cell::fence(FenceState::closed())),
                self.config.fence_ms,
                ActionOutcome::None,
            ),

            _ => return None,
        };

        Some(PendingAction {
            target: pos,
            tool,
            result,
            remaining_frames: self.frames_for(duration),
            outcome,
        })
    }

    /// Plan and queue an interaction. Returns false when nothing was queued.
    #[instrument(skip(self, grid, trees, rng), fields(col = pos.col, row = pos.row))]
    pub fn interact(
        &mut self,
        grid: &Grid,
        trees: &TreeEngine,
        tool: Tool,
        pos: TilePos,
        now: SimTime,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        if !grid.in_bounds(pos) {
            self.rejected += 1;
            return false;
        }
        if self.config.overlap == OverlapPolicy::RejectOverlap && self.has_pending(pos) {
            debug!(?tool, "Cell already has a pending action");
            self.rejected += 1;
            return false;
        }

        match self.plan(tool, pos, grid.get(pos), now, trees, rng) {
            Some(action) => {
                debug!(?tool, frames = action.remaining_frames, "Queued action");
                self.queue.push(action);
                true
            }
            None => {
                self.rejected += 1;
                false
            }
        }
    }

    /// Count every pending action down by one frame and apply those that
    /// reach zero, in queue order. Returns how many were applied.
    pub fn update(&mut self, grid: &mut Grid, now: SimTime, events: &mut Vec<WorldEvent>) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_iter()
            .map(|mut action| {
                action.remaining_frames = action.remaining_frames.saturating_sub(1);
                action
            })
            .partition(|action| action.remaining_frames == 0);
        self.queue = pending;

        let mut applied = 0;
        for action in done {
            if self.commit(grid, action, now, events) {
                applied += 1;
            }
        }
        applied
    }

    fn commit(&mut self, grid: &mut Grid, action: PendingAction, now: SimTime, events: &mut Vec<WorldEvent>) -> bool {
        let pos = action.target;
        let was_fence = grid.get(pos).fence_state().is_some();

        let Some(cell) = resolve(grid.get(pos), action.result, now) else {
            debug!(col = pos.col, row = pos.row, tool = ?action.tool, "Target changed before the action landed");
            self.dropped += 1;
            return false;
        };
        let is_fence = cell.fence_state().is_some();

        grid.set(pos, cell);
        if was_fence || is_fence {
            grid.refresh_fence_links(pos);
        }
        grid.mark_dirty();
        self.committed += 1;

        events.push(WorldEvent::ActionCommitted {
            pos,
            tool: action.tool,
        });

        match action.outcome {
            ActionOutcome::None => {}
            ActionOutcome::Harvest { species, amount } => {
                info!(event = "crop_harvested", col = pos.col, row = pos.row, ?species, amount, "Crop harvested");
                events.push(WorldEvent::CropHarvested { pos, species, amount });
            }
            ActionOutcome::Cleared { species } => {
                debug!(col = pos.col, row = pos.row, ?species, "Crop cleared");
                events.push(WorldEvent::CropCleared { pos, species });
            }
            ActionOutcome::Chop { wood: Some(wood) } => {
                info!(event = "tree_felled", col = pos.col, row = pos.row, wood, "Tree felled");
                events.push(WorldEvent::TreeFelled { pos, wood });
            }
            ActionOutcome::Chop { wood: None } => {}
            ActionOutcome::Gate { open } => {
                debug!(col = pos.col, row = pos.row, open, "Gate toggled");
                events.push(WorldEvent::FenceToggled { pos, open });
            }
        }
        true
    }
}

/// The cell a completed action leaves behind, or `None` when the current
/// cell no longer accepts it.
fn resolve(current: &Cell, result: PendingResult, now: SimTime) -> Option<Cell> {
    let mut cell = current.clone();
    match result {
        PendingResult::Replace(kind) => {
            if cell.kind != TileKind::Grass || !cell.land.is_empty() {
                return None;
            }
            cell.kind = kind;
            if kind == TileKind::Soil {
                cell.set_dry(now);
            }
        }
        PendingResult::Water(at) => {
            if cell.crop().is_none() || !cell.kind.is_soil() {
                return None;
            }
            if !cell.is_watered() {
                cell.set_watered(at);
            }
        }
        PendingResult::Fertilize(at) => {
            if cell.crop().is_none() || cell.fertilizer.active {
                return None;
            }
            cell.fertilizer = Fertilizer::applied(at);
        }
        PendingResult::Cell(snapshot) => return Some(snapshot),
    }
    Some(cell)
}
