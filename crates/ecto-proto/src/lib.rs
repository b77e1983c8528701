//! # ecto-proto
//!
//! Shared types, error definitions, and traits for the Ecto scheduler.
//!
//! This crate provides the vocabulary every other crate speaks:
//! - The canonical activity [`Phase`] and [`ActivityState`]
//! - Resource kinds, container snapshots and supply requirements
//! - Capability traits implemented by external collaborators
//! - The [`Task`] contract and its [`TaskContext`]
//! - Lifecycle notifications and cooperative cancellation

mod capability;
mod error;
mod notification;
mod phase;
mod resource;
mod stop;
mod task;
mod ui;

pub use capability::{
    Action, ActivityActions, Capabilities, Clock, ResourceQuery, Stopwatch, StoreController,
    SystemClock,
};
pub use error::{Error, Result};
pub use notification::{Notification, NotificationQueue, Notifier};
pub use phase::{ActivityState, Phase, PhaseCounts};
pub use resource::{
    InventorySnapshot, Mismatch, ResourceKind, SupplyEntry, SupplyRequirement, SupplyRole,
    quantity_needed,
};
pub use stop::StopSignal;
pub use task::{CycleCounters, Step, Task, TaskContext, TaskId, TerminalCondition};
pub use ui::{MenuSelection, UiResult};
