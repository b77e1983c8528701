//! Transit and production tasks.
//!
//! Each task owns exactly one [`Phase`] and is eligible only while the
//! activity is in it. A step issues one menu action, waits (bounded) for the
//! container to show its effect and then writes the next phase.

use crate::config::ActivityKinds;
use crate::wait::{POLL_INTERVAL, poll_until};
use ecto_proto::{
    Action, ActivityState, InventorySnapshot, MenuSelection, Phase, PhaseCounts, Result, Step,
    Task, TaskContext, TaskId,
};
use std::time::Duration;
use tracing::{debug, info, warn};

const EFFECT_TIMEOUT: Duration = Duration::from_millis(5000);

const TRAVEL_MS: u64 = 1000;
const NEXT_ACTION_MS: u64 = 600;
const RETRY_MS: u64 = 1000;

/// One phase of the cycle driven by a single menu action.
#[derive(Debug)]
pub struct ActivityTask {
    id: TaskId,
    phase: Phase,
    action: Action,
    kinds: ActivityKinds,
}

impl ActivityTask {
    fn new(phase: Phase, action: Action, kinds: ActivityKinds) -> Self {
        Self {
            id: TaskId::from(phase.as_str()),
            phase,
            action,
            kinds,
        }
    }

    /// Teleports from the store to the altar.
    pub fn transit(kinds: ActivityKinds) -> Self {
        Self::new(Phase::Transit, Action::Teleport, kinds)
    }

    /// Fills empty buckets with slime.
    pub fn collect_slime(kinds: ActivityKinds) -> Self {
        Self::new(Phase::CollectSlime, Action::CollectSlime, kinds)
    }

    /// Grinds bones into empty pots.
    pub fn grind_bones(kinds: ActivityKinds) -> Self {
        Self::new(Phase::GrindBones, Action::GrindBones, kinds)
    }

    /// Offers slime and bonemeal at the altar.
    pub fn worship(kinds: ActivityKinds) -> Self {
        Self::new(Phase::Worship, Action::Worship, kinds)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn pairs(&self, snapshot: &InventorySnapshot) -> u32 {
        snapshot
            .count(self.kinds.slime)
            .min(snapshot.count(self.kinds.bonemeal))
    }

    /// Whether the container still holds what the action consumes.
    fn has_inputs(&self, snapshot: &InventorySnapshot) -> bool {
        match self.action {
            Action::Teleport => true,
            Action::CollectSlime => snapshot.count(self.kinds.bucket) > 0,
            Action::GrindBones => {
                snapshot.count(self.kinds.primary) > 0 && snapshot.count(self.kinds.pot) > 0
            }
            Action::Worship => self.pairs(snapshot) > 0,
        }
    }

    fn phase_from(&self, snapshot: &InventorySnapshot) -> Phase {
        Phase::from_counts(&PhaseCounts {
            slime: snapshot.count(self.kinds.slime),
            bonemeal: snapshot.count(self.kinds.bonemeal),
            supplies: snapshot.count(self.kinds.primary),
        })
    }

    fn capture(&self, ctx: &TaskContext<'_>) -> Result<InventorySnapshot> {
        InventorySnapshot::capture(ctx.inventory, &self.kinds.all())
    }

    /// Polls until the container shows the action took effect.
    fn await_effect(&self, ctx: &TaskContext<'_>, before: &InventorySnapshot) -> Result<bool> {
        let inventory = ctx.inventory;
        let kinds = &self.kinds;
        let changed = || -> Result<bool> {
            Ok(match self.action {
                Action::Teleport => true,
                Action::CollectSlime => inventory.count(kinds.slime)? > before.count(kinds.slime),
                Action::GrindBones => {
                    inventory.count(kinds.bonemeal)? > before.count(kinds.bonemeal)
                }
                Action::Worship => {
                    let pairs = inventory.count(kinds.slime)?.min(inventory.count(kinds.bonemeal)?);
                    pairs < self.pairs(before)
                }
            })
        };
        poll_until(ctx.clock, ctx.stop, EFFECT_TIMEOUT, POLL_INTERVAL, changed)
    }

    /// Phase after a successful action. Stays put while inputs remain.
    fn next_phase(&self, after: &InventorySnapshot) -> Phase {
        match self.action {
            Action::Teleport => Phase::CollectSlime,
            Action::Worship if self.has_inputs(after) => Phase::Worship,
            Action::Worship => Phase::Restock,
            _ if self.has_inputs(after) => self.phase,
            _ => self.phase_from(after),
        }
    }
}

impl Task for ActivityTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn can_execute(&self, state: &ActivityState) -> bool {
        state.phase == self.phase
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        let before = self.capture(ctx)?;
        if !self.has_inputs(&before) {
            warn!(task = %self.id, %before, "Nothing left to work with, restocking");
            ctx.state.phase = Phase::Restock;
            return Ok(Step::after(RETRY_MS));
        }

        match ctx.actions.perform(self.action)? {
            MenuSelection::Selected => {}
            outcome => {
                debug!(task = %self.id, ?outcome, "Menu action not taken, retrying");
                return Ok(Step::after(RETRY_MS));
            }
        }

        let took_effect = match self.await_effect(ctx, &before) {
            Ok(took_effect) => took_effect,
            Err(e) => {
                let e = e.rethrow_hard_stop()?;
                debug!(task = %self.id, error = %e, "Lost sight of the container while waiting");
                false
            }
        };
        if !took_effect {
            debug!(task = %self.id, "Action had no visible effect yet, retrying");
            return Ok(Step::after(RETRY_MS));
        }

        let after = self.capture(ctx)?;
        if self.action == Action::Worship {
            let offered = self.pairs(&before).saturating_sub(self.pairs(&after));
            ctx.counters.bones_offered += u64::from(offered);
        }

        let next = self.next_phase(&after);
        if next != self.phase {
            info!(task = %self.id, from = %self.phase, to = %next, "Phase complete");
        }
        ctx.state.phase = next;

        Ok(Step::after(if self.action == Action::Teleport {
            TRAVEL_MS
        } else {
            NEXT_ACTION_MS
        }))
    }
}
