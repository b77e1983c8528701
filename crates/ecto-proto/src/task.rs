//! The task contract.
//!
//! A task is one phase of the activity: an eligibility predicate over the
//! shared [`ActivityState`] and a step function that performs exactly one
//! resumable unit of work.

use crate::{
    ActivityActions, ActivityState, Clock, Mismatch, ResourceKind, ResourceQuery, Result,
    StopSignal, StoreController, SupplyRole,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new task ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A condition that ends the run instead of being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalCondition {
    /// A required resource is absent from the store.
    MissingSupply { role: SupplyRole, kind: ResourceKind },
    /// Post-restock counts do not equal their targets.
    VerificationMismatch(Mismatch),
}

impl std::fmt::Display for TerminalCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSupply { role, kind } => {
                let role = match role {
                    SupplyRole::Primary => "primary resource",
                    SupplyRole::Container => "container",
                    SupplyRole::Anchor => "anchor item",
                };
                write!(f, "missing {role} {kind} in store")
            }
            Self::VerificationMismatch(m) => write!(
                f,
                "verification failed for {}: expected {}, found {}",
                m.kind, m.expected, m.actual
            ),
        }
    }
}

/// What the scheduler should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait at least this long before the next tick.
    Suspend(Duration),
    /// Stop the run.
    Halt(TerminalCondition),
}

impl Step {
    /// Suspends for `millis` milliseconds.
    pub fn after(millis: u64) -> Self {
        Self::Suspend(Duration::from_millis(millis))
    }
}

/// Running totals tasks contribute to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleCounters {
    /// Completed restocks.
    pub restocks: u64,
    /// Primary resources consumed by the final action.
    pub bones_offered: u64,
}

/// Everything a step may touch.
pub struct TaskContext<'a> {
    pub state: &'a mut ActivityState,
    pub inventory: &'a dyn ResourceQuery,
    pub store: &'a mut dyn StoreController,
    pub actions: &'a mut dyn ActivityActions,
    pub clock: &'a dyn Clock,
    pub stop: &'a StopSignal,
    pub counters: &'a mut CycleCounters,
}

/// One phase of the activity.
///
/// `can_execute` must be a pure function of the state. `execute` performs
/// one atomic step and must leave the system resumable, since the next call
/// may come much later or never.
pub trait Task {
    fn id(&self) -> &TaskId;

    fn can_execute(&self, state: &ActivityState) -> bool;

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step>;

    /// Discards in-flight progress after the phase was re-derived.
    fn reset(&mut self) {}
}
