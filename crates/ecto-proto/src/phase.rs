//! The canonical activity phase.
//!
//! One enum replaces a set of independently mutated flags. Tasks read it to
//! decide eligibility and write it when they finish their part of the cycle;
//! the recovery routine rewrites it from container counts after a reconnect.

use serde::{Deserialize, Serialize};

/// Macro-stage of the activity cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Container must be reconciled against the store.
    #[default]
    Restock,
    /// Supplies in hand, travelling to the altar.
    Transit,
    /// Filling containers with slime.
    CollectSlime,
    /// Grinding the primary resource into bonemeal.
    GrindBones,
    /// Both products ready; offering at the altar.
    Worship,
}

impl Phase {
    /// Every phase, in cycle order.
    pub const ALL: [Phase; 5] = [
        Phase::Restock,
        Phase::Transit,
        Phase::CollectSlime,
        Phase::GrindBones,
        Phase::Worship,
    ];

    /// Derives the phase from container counts.
    ///
    /// Both products present wins over anything else, then a single product
    /// or raw supplies mean the cycle continues, and an empty container
    /// means a restock.
    pub fn from_counts(counts: &PhaseCounts) -> Self {
        match (counts.slime > 0, counts.bonemeal > 0) {
            (true, true) => Phase::Worship,
            (true, false) => Phase::GrindBones,
            (false, true) => Phase::CollectSlime,
            (false, false) if counts.supplies > 0 => Phase::Transit,
            (false, false) => Phase::Restock,
        }
    }

    /// Short label for status output.
    pub fn activity_label(self) -> &'static str {
        match self {
            Phase::Restock => "Banking",
            Phase::Transit => "Teleporting",
            Phase::CollectSlime => "Collecting Slime",
            Phase::GrindBones => "Grinding Bones",
            Phase::Worship => "Worshipping",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Restock => "restock",
            Phase::Transit => "transit",
            Phase::CollectSlime => "collect_slime",
            Phase::GrindBones => "grind_bones",
            Phase::Worship => "worship",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts the phase derivation looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    /// Filled slime containers.
    pub slime: u32,
    /// Ground bonemeal.
    pub bonemeal: u32,
    /// Raw supplies: the primary resource only. Empty containers come back
    /// from worship, so on their own they do not continue a cycle.
    pub supplies: u32,
}

/// Shared activity state: the single source of truth tasks read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityState {
    /// Current macro-stage.
    pub phase: Phase,
    /// A pause is due; finish the current cycle and do not start another.
    pub draining_for_pause: bool,
}

impl ActivityState {
    /// Creates a state in the given phase.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            draining_for_pause: false,
        }
    }

    /// Derived view; there is no separate flag to drift out of sync.
    pub fn needs_restock(&self) -> bool {
        self.phase == Phase::Restock
    }

    /// Whether the current position in the cycle is safe to pause at.
    pub fn is_safe_to_pause(&self) -> bool {
        self.phase == Phase::Restock
    }
}
