//! # ecto-core
//!
//! Scheduling and recovery engine for the Ecto activity.
//!
//! This crate provides:
//! - The cooperative [`TaskManager`] and its termination reasons
//! - The resource reconciliation ("banking") state machine
//! - Transit and production tasks, one per activity phase
//! - Phase recovery from live container counts after a reconnect
//! - The progress watchdog
//! - Configuration loading and an in-memory simulated world for tests

mod banking;
mod config;
pub mod items;
mod recovery;
mod scheduler;
mod status;
mod tasks;
pub mod testing;
pub mod wait;
mod watchdog;

pub use banking::{BankingState, RestockTask};
pub use config::{
    ActivityConfig, ActivityKinds, CONTAINER_CAPACITY, ConfigError, EctoConfig, SchedulerConfig,
    WatchdogConfig,
};
pub use items::{BankLocation, BoneType};
pub use recovery::RecoveryRoutine;
pub use scheduler::{RunState, TaskManager, TerminationReason, TickOutcome};
pub use status::{INITIALIZING_LABEL, RunStatus};
pub use tasks::ActivityTask;
pub use watchdog::{ProgressWatchdog, WARNING_INTERVAL_MS, WARNING_WINDOW_MS, WatchdogVerdict};
