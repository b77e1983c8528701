//! Lifecycle notifications from the external driver.
//!
//! Connection callbacks can arrive on another thread. They are queued behind
//! a mutex and drained at the top of the next tick, so every write is
//! visible before the tick that acts on it.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A lifecycle event delivered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// Connection lost; progress timing pauses.
    Disconnected,
    /// Connection restored; phase must be re-derived.
    Reconnected,
    /// The external progress signal was observed.
    Progress,
    /// A pause is due; drain the current cycle.
    PauseDue,
}

impl Notification {
    pub fn as_str(self) -> &'static str {
        match self {
            Notification::Disconnected => "disconnected",
            Notification::Reconnected => "reconnected",
            Notification::Progress => "progress",
            Notification::PauseDue => "pause_due",
        }
    }
}

type Shared = Arc<Mutex<Vec<Notification>>>;

fn lock(queue: &Shared) -> MutexGuard<'_, Vec<Notification>> {
    // A panicking producer cannot leave a Vec half-written.
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receiving side, owned by the scheduler.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Shared,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sender handle for the driver's callbacks.
    pub fn notifier(&self) -> Notifier {
        Notifier {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Takes every pending notification in arrival order.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *lock(&self.pending))
    }

    pub fn has_pending(&self) -> bool {
        !lock(&self.pending).is_empty()
    }
}

/// Cloneable, thread-safe sending side.
#[derive(Debug, Clone)]
pub struct Notifier {
    pending: Shared,
}

impl Notifier {
    pub fn notify(&self, notification: Notification) {
        lock(&self.pending).push(notification);
    }

    pub fn disconnected(&self) {
        self.notify(Notification::Disconnected);
    }

    pub fn reconnected(&self) {
        self.notify(Notification::Reconnected);
    }

    pub fn progress(&self) {
        self.notify(Notification::Progress);
    }

    pub fn pause_due(&self) {
        self.notify(Notification::PauseDue);
    }
}
