//! Capability traits implemented by external collaborators.
//!
//! The scheduler and tasks only see these interfaces, so every collaborator
//! can be swapped for a test double.

use crate::{MenuSelection, ResourceKind, Result, UiResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only view of the bounded container and the remote store's stock.
pub trait ResourceQuery {
    /// Number of items of `kind` in the container.
    fn count(&self, kind: ResourceKind) -> Result<u32>;

    /// Number of occupied container slots, whatever they hold.
    fn total_occupied(&self) -> Result<u32>;

    /// Whether the remote store holds at least one of `kind`.
    fn store_contains(&self, kind: ResourceKind) -> Result<bool>;
}

/// Commands against the remote store's interface.
pub trait StoreController {
    fn is_open(&self) -> Result<bool>;

    /// Attempts to open the store. `false` means the attempt did not take.
    fn open(&mut self) -> Result<bool>;

    fn close(&mut self) -> Result<()>;

    /// Deposits everything except the kinds in `keep`.
    fn deposit_all_except(&mut self, keep: &[ResourceKind]) -> Result<bool>;

    /// Withdraws `quantity` of `kind`.
    fn withdraw(&mut self, kind: ResourceKind, quantity: u32) -> Result<bool>;

    /// Currently selected category tab.
    fn selected_category(&self) -> Result<UiResult<u32>>;

    /// Requests a switch to `index`.
    fn select_category(&mut self, index: u32) -> Result<bool>;
}

/// A single action of the activity performed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Teleport,
    CollectSlime,
    GrindBones,
    Worship,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Teleport => "teleport",
            Action::CollectSlime => "collect_slime",
            Action::GrindBones => "grind_bones",
            Action::Worship => "worship",
        }
    }
}

/// Performs activity actions (navigation and interaction live behind this).
pub trait ActivityActions {
    fn perform(&mut self, action: Action) -> Result<MenuSelection>;
}

/// Monotonic time source that can also block the calling thread.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_millis(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Elapsed-time measurement with reset.
#[derive(Clone)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    started_at: u64,
}

impl Stopwatch {
    /// Starts measuring now.
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now_millis();
        Self { clock, started_at }
    }

    pub fn reset(&mut self) {
        self.started_at = self.clock.now_millis();
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.clock.now_millis().saturating_sub(self.started_at)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis())
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Bundle of collaborators injected into the scheduler.
pub struct Capabilities {
    pub inventory: Box<dyn ResourceQuery>,
    pub store: Box<dyn StoreController>,
    pub actions: Box<dyn ActivityActions>,
    pub clock: Arc<dyn Clock>,
}
