//! Per-run bookkeeping owned by the scheduler.

use ecto_proto::TaskId;
use std::collections::BTreeMap;

/// Counters and connection flags for one run. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Ticks that got past the stop checks.
    pub ticks: u64,
    /// Steps executed per task.
    pub steps: BTreeMap<TaskId, u64>,
    /// Recovery routine invocations, including the startup one.
    pub recoveries: u64,
    /// False between a disconnect and the matching reconnect.
    pub connected: bool,
    /// Set once the startup recovery has run.
    pub initialized: bool,
    /// A reconnect arrived and recovery has not run yet.
    pub recovery_pending: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn record_step(&mut self, id: &TaskId) {
        *self.steps.entry(id.clone()).or_insert(0) += 1;
    }

    pub fn steps_for(&self, id: &TaskId) -> u64 {
        self.steps.get(id).copied().unwrap_or(0)
    }

    pub fn total_steps(&self) -> u64 {
        self.steps.values().sum()
    }
}
