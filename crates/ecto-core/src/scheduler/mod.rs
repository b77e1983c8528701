//! Cooperative single-threaded scheduler.
//!
//! The driver calls [`TaskManager::tick`] and waits at least the returned
//! suspension before calling it again. Each tick:
//!
//! 1. honours a pending stop,
//! 2. applies lifecycle notifications queued since the last tick,
//! 3. checks the progress watchdog,
//! 4. runs the recovery routine if a reconnect (or startup) requires it,
//! 5. runs exactly one step of the first eligible task in priority order.

mod run_state;


pub use run_state::RunState;

use crate::banking::RestockTask;
use crate::config::EctoConfig;
use crate::recovery::RecoveryRoutine;
use crate::status::{INITIALIZING_LABEL, RunStatus};
use crate::tasks::ActivityTask;
use crate::watchdog::{ProgressWatchdog, WatchdogVerdict};
use ecto_proto::{
    ActivityState, Capabilities, CycleCounters, Notification, NotificationQueue, Notifier,
    ResourceKind, Step, StopSignal, Stopwatch, SupplyRole, Task, TaskContext, TerminalCondition,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// No progress signal within the watchdog timeout.
    WatchdogExpired,
    /// A required item is neither held nor in the store.
    MissingSupply { role: SupplyRole, kind: ResourceKind },
    /// Restocked counts did not match their targets.
    VerificationMismatch {
        kind: ResourceKind,
        expected: u32,
        actual: u32,
    },
    /// Soft stop requested.
    Stopped,
    /// Hard stop requested.
    Interrupted,
}

impl TerminationReason {
    /// Process exit code for the driver.
    ///
    /// - 0: stopped on request
    /// - 1: missing supplies or failed verification
    /// - 2: watchdog expired
    /// - 130: hard stop (SIGINT = 128 + 2)
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminationReason::Stopped => 0,
            TerminationReason::MissingSupply { .. }
            | TerminationReason::VerificationMismatch { .. } => 1,
            TerminationReason::WatchdogExpired => 2,
            TerminationReason::Interrupted => 130,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::WatchdogExpired => "watchdog_expired",
            TerminationReason::MissingSupply { .. } => "missing_supply",
            TerminationReason::VerificationMismatch { .. } => "verification_mismatch",
            TerminationReason::Stopped => "stopped",
            TerminationReason::Interrupted => "interrupted",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminationReason::Stopped)
    }
}

impl From<TerminalCondition> for TerminationReason {
    fn from(condition: TerminalCondition) -> Self {
        match condition {
            TerminalCondition::MissingSupply { role, kind } => {
                TerminationReason::MissingSupply { role, kind }
            }
            TerminalCondition::VerificationMismatch(m) => TerminationReason::VerificationMismatch {
                kind: m.kind,
                expected: m.expected,
                actual: m.actual,
            },
        }
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Wait at least this long before the next tick.
    Suspend(Duration),
    /// The run is over; further ticks return the same reason.
    Terminated(TerminationReason),
}

impl TickOutcome {
    pub fn suspension(&self) -> Option<Duration> {
        match self {
            TickOutcome::Suspend(duration) => Some(*duration),
            TickOutcome::Terminated(_) => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, TickOutcome::Terminated(_))
    }
}

pub struct TaskManager {
    tasks: Vec<Box<dyn Task>>,
    capabilities: Capabilities,
    state: ActivityState,
    counters: CycleCounters,
    recovery: RecoveryRoutine,
    watchdog: ProgressWatchdog,
    notifications: NotificationQueue,
    stop: StopSignal,
    run: RunState,
    uptime: Stopwatch,
    idle_suspension: Duration,
    fault_suspension: Duration,
    termination: Option<TerminationReason>,
}

impl TaskManager {
    /// Creates a scheduler running the full activity in its fixed priority order.
    pub fn new(config: &EctoConfig, capabilities: Capabilities) -> Self {
        let mut manager = Self::empty(config, capabilities);
        manager.register_tasks(Self::default_tasks(config));
        manager
    }

    /// Creates a scheduler with no tasks registered.
    pub fn empty(config: &EctoConfig, capabilities: Capabilities) -> Self {
        let watchdog = ProgressWatchdog::new(&config.watchdog, capabilities.clock.clone());
        let uptime = Stopwatch::start(capabilities.clock.clone());
        Self {
            tasks: Vec::new(),
            capabilities,
            state: ActivityState::default(),
            counters: CycleCounters::default(),
            recovery: RecoveryRoutine::new(config.activity_kinds()),
            watchdog,
            notifications: NotificationQueue::new(),
            stop: StopSignal::new(),
            run: RunState::new(),
            uptime,
            idle_suspension: Duration::from_millis(config.scheduler.idle_suspension_ms),
            fault_suspension: Duration::from_millis(config.scheduler.fault_suspension_ms),
            termination: None,
        }
    }

    /// Restock, transit, slime, bones, worship.
    pub fn default_tasks(config: &EctoConfig) -> Vec<Box<dyn Task>> {
        let kinds = config.activity_kinds();
        vec![
            Box::new(RestockTask::new(
                config.supply_requirement(),
                config.activity.store_category,
            )),
            Box::new(ActivityTask::transit(kinds.clone())),
            Box::new(ActivityTask::collect_slime(kinds.clone())),
            Box::new(ActivityTask::grind_bones(kinds.clone())),
            Box::new(ActivityTask::worship(kinds)),
        ]
    }

    /// Installs the tasks in priority order, replacing any registered before.
    pub fn register_tasks(&mut self, tasks: Vec<Box<dyn Task>>) {
        let ids: Vec<String> = tasks.iter().map(|t| t.id().to_string()).collect();
        debug!(tasks = ?ids, "Registered tasks");
        self.tasks = tasks;
    }

    /// Sender for lifecycle callbacks from the driver.
    pub fn notifier(&self) -> Notifier {
        self.notifications.notifier()
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn counters(&self) -> CycleCounters {
        self.counters
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Whether the driver may take a break now. Clears a pending drain.
    pub fn can_pause(&mut self) -> bool {
        if self.state.is_safe_to_pause() {
            self.state.draining_for_pause = false;
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> RunStatus {
        let activity = if self.run.initialized {
            self.state.phase.activity_label()
        } else {
            INITIALIZING_LABEL
        };
        RunStatus {
            activity,
            phase: self.state.phase,
            draining_for_pause: self.state.draining_for_pause,
            connected: self.run.connected,
            ticks: self.run.ticks,
            steps: self
                .run
                .steps
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
            restocks: self.counters.restocks,
            bones_offered: self.counters.bones_offered,
            recoveries: self.run.recoveries,
            seconds_since_progress: self.watchdog.since_progress().as_secs(),
            elapsed_secs: self.uptime.elapsed().as_secs(),
            termination: self.termination,
            captured_at: chrono::Utc::now(),
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if let Some(reason) = self.termination {
            return TickOutcome::Terminated(reason);
        }
        if self.stop.is_hard_stopped() {
            return self.terminate(TerminationReason::Interrupted);
        }
        if self.stop.is_stop_requested() {
            return self.terminate(TerminationReason::Stopped);
        }

        self.run.ticks += 1;
        self.apply_notifications();

        if self.watchdog.check() == WatchdogVerdict::Expired {
            error!(
                since_progress_secs = self.watchdog.since_progress().as_secs(),
                "No progress within the watchdog timeout, stopping"
            );
            return self.terminate(TerminationReason::WatchdogExpired);
        }

        if !self.run.connected {
            return TickOutcome::Suspend(self.idle_suspension);
        }

        if !self.run.initialized || self.run.recovery_pending {
            self.recover();
        }

        self.step()
    }

    /// Re-derives the phase from the container and restarts every task's
    /// private state machine. Runs at startup and after every reconnect.
    pub fn recover(&mut self) {
        self.recovery
            .recover(&mut self.state, self.capabilities.inventory.as_ref());
        for task in &mut self.tasks {
            task.reset();
        }
        self.run.recoveries += 1;
        self.run.initialized = true;
        self.run.recovery_pending = false;
    }

    fn apply_notifications(&mut self) {
        for notification in self.notifications.drain() {
            debug!(notification = notification.as_str(), "Lifecycle notification");
            match notification {
                Notification::Disconnected => {
                    self.run.connected = false;
                    self.watchdog.pause();
                }
                Notification::Reconnected => {
                    self.run.connected = true;
                    self.run.recovery_pending = true;
                    self.watchdog.resume();
                }
                Notification::Progress => self.watchdog.record_progress(),
                Notification::PauseDue => {
                    if !self.state.draining_for_pause {
                        info!(phase = %self.state.phase, "Pause due, finishing the current cycle");
                    }
                    self.state.draining_for_pause = true;
                }
            }
        }
    }

    fn step(&mut self) -> TickOutcome {
        let Some(task) = self
            .tasks
            .iter_mut()
            .find(|task| task.can_execute(&self.state))
        else {
            return TickOutcome::Suspend(self.idle_suspension);
        };

        let mut ctx = TaskContext {
            state: &mut self.state,
            inventory: self.capabilities.inventory.as_ref(),
            store: self.capabilities.store.as_mut(),
            actions: self.capabilities.actions.as_mut(),
            clock: self.capabilities.clock.as_ref(),
            stop: &self.stop,
            counters: &mut self.counters,
        };
        let result = task.execute(&mut ctx);
        self.run.record_step(task.id());

        match result {
            Ok(Step::Suspend(duration)) => TickOutcome::Suspend(duration),
            Ok(Step::Halt(condition)) => {
                error!(task = %task.id(), "{condition}");
                self.terminate(condition.into())
            }
            Err(e) if e.is_hard_stop() => {
                info!(task = %task.id(), "Hard stop during step");
                self.terminate(TerminationReason::Interrupted)
            }
            Err(e) => {
                warn!(task = %task.id(), error = %e, "Step failed, retrying");
                TickOutcome::Suspend(self.fault_suspension)
            }
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> TickOutcome {
        info!(reason = reason.as_str(), ticks = self.run.ticks, "Run terminated");
        self.termination = Some(reason);
        TickOutcome::Terminated(reason)
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks.len())
            .field("state", &self.state)
            .field("run", &self.run)
            .field("watchdog", &self.watchdog)
            .field("termination", &self.termination)
            .finish_non_exhaustive()
    }
}
