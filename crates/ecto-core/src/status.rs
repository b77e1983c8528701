//! Point-in-time run status, printed by the driver.

use crate::scheduler::TerminationReason;
use chrono::{DateTime, Utc};
use ecto_proto::Phase;
use serde::Serialize;
use std::collections::BTreeMap;

/// Label shown before the first tick has derived a phase.
pub const INITIALIZING_LABEL: &str = "Initializing";

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    /// Human readable activity, e.g. "Grinding Bones".
    pub activity: &'static str,
    pub phase: Phase,
    pub draining_for_pause: bool,
    pub connected: bool,
    pub ticks: u64,
    pub steps: BTreeMap<String, u64>,
    pub restocks: u64,
    pub bones_offered: u64,
    pub recoveries: u64,
    pub seconds_since_progress: u64,
    pub elapsed_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
    pub captured_at: DateTime<Utc>,
}

impl RunStatus {
    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
