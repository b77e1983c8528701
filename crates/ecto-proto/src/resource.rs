//! Resource kinds, container snapshots and supply requirements.
//!
//! A [`SupplyRequirement`] is fixed for the lifetime of a run. An
//! [`InventorySnapshot`] is recaptured every time it is needed and never
//! carried across ticks, since the container can change between them.

use crate::{ResourceQuery, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// A named kind of item that can sit in the container or the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKind {
    /// Item identifier as reported by the collaborators.
    pub id: u32,
    /// Display name used in diagnostics.
    pub name: &'static str,
}

impl ResourceKind {
    /// Creates a new resource kind.
    pub const fn new(id: u32, name: &'static str) -> Self {
        Self { id, name }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// What a required resource is used for. Drives the supply decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyRole {
    /// The resource consumed by the activity.
    Primary,
    /// Empty containers filled during the cycle.
    Container,
    /// Reusable item the cycle depends on (teleport anchor).
    Anchor,
}

/// One required kind with its role and target quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplyEntry {
    pub kind: ResourceKind,
    pub role: SupplyRole,
    /// Quantity the container must hold after restocking. Exact for
    /// primary and container kinds, a minimum for anchors.
    pub target: u32,
}

impl SupplyEntry {
    /// Whether a verified count meets this entry. Anchors pass at or above
    /// their target.
    pub fn is_satisfied_by(&self, actual: u32) -> bool {
        match self.role {
            SupplyRole::Anchor => actual >= self.target,
            SupplyRole::Primary | SupplyRole::Container => actual == self.target,
        }
    }
}

/// Quantity that still has to be withdrawn. Never negative.
pub fn quantity_needed(target: u32, current: u32) -> u32 {
    target.saturating_sub(current)
}

/// Ordered set of required kinds and their target quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupplyRequirement {
    entries: Vec<SupplyEntry>,
}

impl SupplyRequirement {
    /// Creates an empty requirement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required kind.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, role: SupplyRole, target: u32) -> Self {
        self.entries.push(SupplyEntry { kind, role, target });
        self
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[SupplyEntry] {
        &self.entries
    }

    /// Entries with the given role, in declaration order.
    pub fn by_role(&self, role: SupplyRole) -> impl Iterator<Item = &SupplyEntry> {
        self.entries.iter().filter(move |e| e.role == role)
    }

    /// All required kinds. This is also the keep-set for depositing.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes how many of each entry must be withdrawn to reach its target.
    pub fn withdrawal_plan(&self, snapshot: &InventorySnapshot) -> Vec<(SupplyEntry, u32)> {
        self.entries
            .iter()
            .map(|e| (*e, quantity_needed(e.target, snapshot.count(e.kind))))
            .collect()
    }

    /// Returns every kind whose count does not satisfy its entry.
    pub fn mismatches(&self, snapshot: &InventorySnapshot) -> Vec<Mismatch> {
        self.entries
            .iter()
            .filter_map(|e| {
                let actual = snapshot.count(e.kind);
                (!e.is_satisfied_by(actual)).then_some(Mismatch {
                    kind: e.kind,
                    expected: e.target,
                    actual,
                })
            })
            .collect()
    }
}

/// A kind whose verified count does not satisfy its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub kind: ResourceKind,
    pub expected: u32,
    pub actual: u32,
}

/// Point-in-time counts of the bounded container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    counts: BTreeMap<ResourceKind, u32>,
    total_occupied: u32,
}

impl InventorySnapshot {
    /// Builds a snapshot from explicit values.
    pub fn from_counts(
        counts: impl IntoIterator<Item = (ResourceKind, u32)>,
        total_occupied: u32,
    ) -> Self {
        Self {
            counts: counts.into_iter().collect(),
            total_occupied,
        }
    }

    /// Reads the current count of every listed kind plus the occupied total.
    pub fn capture(query: &dyn ResourceQuery, kinds: &[ResourceKind]) -> Result<Self> {
        let mut counts = BTreeMap::new();
        for kind in kinds {
            counts.insert(*kind, query.count(*kind)?);
        }
        let total_occupied = query.total_occupied()?;
        Ok(Self {
            counts,
            total_occupied,
        })
    }

    /// Count of a kind; kinds that were not captured count as zero.
    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_occupied(&self) -> u32 {
        self.total_occupied
    }

    /// Sum of the counts of every captured kind.
    pub fn known_total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Strictly more occupied than accounted for by known kinds.
    pub fn has_unwanted(&self) -> bool {
        self.total_occupied > self.known_total()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKind, &u32)> {
        self.counts.iter()
    }
}

impl std::fmt::Display for InventorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind.name, count))
            .collect();
        write!(f, "{} (occupied {})", parts.join(", "), self.total_occupied)
    }
}
