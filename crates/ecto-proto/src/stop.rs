//! Cooperative cancellation.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flags checked by the scheduler and by bounded waits.
///
/// A soft stop is honoured at the top of the next tick and lets the current
/// step finish. A hard stop also aborts any wait loop in progress.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stop: Arc<AtomicBool>,
    hard: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops before the next tick.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops immediately, aborting bounded waits.
    pub fn hard_stop(&self) {
        self.hard.store(true, Ordering::SeqCst);
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn is_hard_stopped(&self) -> bool {
        self.hard.load(Ordering::SeqCst)
    }

    /// Returns [`Error::HardStop`] once a hard stop was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_hard_stopped() {
            Err(Error::HardStop)
        } else {
            Ok(())
        }
    }
}
