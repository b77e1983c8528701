//! Progress watchdog.
//!
//! Halts the run when no progress signal arrives within the configured
//! timeout. Time spent disconnected can be excluded from the count.

use crate::config::WatchdogConfig;
use ecto_proto::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Length of the window before expiry in which warnings are emitted.
pub const WARNING_WINDOW_MS: u64 = 60_000;

/// Minimum gap between two warnings.
pub const WARNING_INTERVAL_MS: u64 = 30_000;

/// Outcome of a single watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// Nothing to report.
    Idle,
    /// Inside the warning window; a warning was just emitted.
    Warning { remaining: Duration },
    /// Timeout exceeded. Reported exactly once per run.
    Expired,
}

pub struct ProgressWatchdog {
    enabled: bool,
    timeout_ms: u64,
    pause_during_logout: bool,
    clock: Arc<dyn Clock>,
    last_progress: u64,
    paused_accumulated: u64,
    paused_since: Option<u64>,
    last_warning: Option<u64>,
    fired: bool,
}

impl ProgressWatchdog {
    pub fn new(config: &WatchdogConfig, clock: Arc<dyn Clock>) -> Self {
        let last_progress = clock.now_millis();
        Self {
            enabled: config.enabled,
            timeout_ms: config.timeout().as_millis() as u64,
            pause_during_logout: config.pause_during_logout,
            clock,
            last_progress,
            paused_accumulated: 0,
            paused_since: None,
            last_warning: None,
            fired: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Time counted toward the timeout since the last progress signal.
    pub fn elapsed_millis(&self) -> u64 {
        let now = self.clock.now_millis();
        let current_pause = self.paused_since.map_or(0, |since| now.saturating_sub(since));
        now.saturating_sub(self.last_progress)
            .saturating_sub(self.paused_accumulated)
            .saturating_sub(current_pause)
    }

    /// Wall-clock time since the last progress signal, pauses included.
    pub fn since_progress(&self) -> Duration {
        Duration::from_millis(self.clock.now_millis().saturating_sub(self.last_progress))
    }

    /// Resets the timeout. Called for every observed progress signal.
    pub fn record_progress(&mut self) {
        let now = self.clock.now_millis();
        self.last_progress = now;
        self.paused_accumulated = 0;
        self.last_warning = None;
        if self.paused_since.is_some() {
            self.paused_since = Some(now);
        }
    }

    /// Stops counting time, if pausing during disconnects is configured.
    pub fn pause(&mut self) {
        if !self.enabled || !self.pause_during_logout || self.paused_since.is_some() {
            return;
        }
        self.paused_since = Some(self.clock.now_millis());
        debug!("Watchdog paused");
    }

    /// Resumes counting time after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        if let Some(since) = self.paused_since.take() {
            let span = self.clock.now_millis().saturating_sub(since);
            self.paused_accumulated += span;
            debug!(paused_ms = span, "Watchdog resumed");
        }
    }

    pub fn check(&mut self) -> WatchdogVerdict {
        if !self.enabled || self.fired {
            return WatchdogVerdict::Idle;
        }

        let elapsed = self.elapsed_millis();
        if elapsed > self.timeout_ms {
            self.fired = true;
            return WatchdogVerdict::Expired;
        }

        let window_start = self.timeout_ms.saturating_sub(WARNING_WINDOW_MS);
        if elapsed > window_start && elapsed < self.timeout_ms {
            let now = self.clock.now_millis();
            let due = self
                .last_warning
                .is_none_or(|at| now.saturating_sub(at) >= WARNING_INTERVAL_MS);
            if due {
                self.last_warning = Some(now);
                let remaining = Duration::from_millis(self.timeout_ms - elapsed);
                warn!(
                    remaining_secs = remaining.as_secs(),
                    "No progress observed; run will stop when the watchdog expires"
                );
                return WatchdogVerdict::Warning { remaining };
            }
        }

        WatchdogVerdict::Idle
    }
}

impl std::fmt::Debug for ProgressWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressWatchdog")
            .field("enabled", &self.enabled)
            .field("timeout_ms", &self.timeout_ms)
            .field("last_progress", &self.last_progress)
            .field("paused_accumulated", &self.paused_accumulated)
            .field("paused_since", &self.paused_since)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}
