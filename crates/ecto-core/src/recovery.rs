//! Phase reconstruction after a reconnect.
//!
//! No checkpoint survives a disconnect. The phase is re-derived from the
//! live container counts alone, and any read failure falls back to a
//! restock.

use crate::config::ActivityKinds;
use ecto_proto::{ActivityState, InventorySnapshot, Phase, PhaseCounts, ResourceQuery, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RecoveryRoutine {
    kinds: ActivityKinds,
}

impl RecoveryRoutine {
    pub fn new(kinds: ActivityKinds) -> Self {
        Self { kinds }
    }

    /// Reads every tracked kind and maps the counts to a phase.
    pub fn derive_phase(&self, inventory: &dyn ResourceQuery) -> Result<Phase> {
        let snapshot = InventorySnapshot::capture(inventory, &self.kinds.all())?;
        let counts = PhaseCounts {
            slime: snapshot.count(self.kinds.slime),
            bonemeal: snapshot.count(self.kinds.bonemeal),
            supplies: snapshot.count(self.kinds.primary),
        };
        let phase = Phase::from_counts(&counts);
        info!(%snapshot, %phase, "Recovered phase from container contents");
        Ok(phase)
    }

    /// Overwrites the activity state with the derived phase.
    ///
    /// Calling this twice on an unchanged container leaves the same state.
    /// An interrupted drain does not survive the reconnect.
    pub fn recover(&self, state: &mut ActivityState, inventory: &dyn ResourceQuery) -> Phase {
        let phase = match self.derive_phase(inventory) {
            Ok(phase) => phase,
            Err(e) => {
                warn!(error = %e, "Could not read container during recovery, restocking");
                Phase::Restock
            }
        };
        *state = ActivityState::new(phase);
        phase
    }
}
