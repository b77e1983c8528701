//! `ecto run`: the external driver loop.

use crate::scenario::Scenario;
use anyhow::Result;
use clap::Parser;
use ecto_core::testing::ManualClock;
use ecto_core::{EctoConfig, TaskManager, TerminationReason, TickOutcome};
use ecto_proto::{Clock, SystemClock};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Starting world
    #[arg(long, value_enum, default_value_t = Scenario::Fresh)]
    pub scenario: Scenario,

    /// Stop after this many ticks
    #[arg(long, default_value_t = 500)]
    pub max_ticks: u64,

    /// Sleep for real between ticks instead of advancing simulated time
    #[arg(long)]
    pub realtime: bool,

    /// Simulate a disconnect at this tick
    #[arg(long, value_name = "TICK")]
    pub disconnect_at: Option<u64>,

    /// Ticks spent offline after a simulated disconnect
    #[arg(long, default_value_t = 5)]
    pub offline_ticks: u64,

    /// Request a break at this tick; the run stops once it is safe to pause
    #[arg(long, value_name = "TICK")]
    pub pause_at: Option<u64>,
}

/// Drives the scheduler until it terminates. Returns the process exit code.
pub fn execute(config: &EctoConfig, args: &RunArgs) -> Result<i32> {
    let clock: Arc<dyn Clock> = if args.realtime {
        Arc::new(SystemClock::new())
    } else {
        Arc::new(ManualClock::new())
    };

    let world = args.scenario.build(config);
    let mut manager = TaskManager::new(config, world.capabilities(clock.clone()));
    let notifier = manager.notifier();
    world.set_progress_notifier(notifier.clone());
    let stop = manager.stop_signal();

    info!(scenario = ?args.scenario, max_ticks = args.max_ticks, "Starting run");

    let reconnect_at = args.disconnect_at.map(|tick| tick + args.offline_ticks);
    let mut pause_requested = false;
    let mut tick: u64 = 0;

    let reason = loop {
        if tick >= args.max_ticks && !stop.is_stop_requested() {
            info!(ticks = tick, "Tick limit reached, stopping");
            stop.request_stop();
        }
        if args.disconnect_at == Some(tick) {
            info!(tick, "Simulating disconnect");
            notifier.disconnected();
        }
        if reconnect_at == Some(tick) {
            info!(tick, "Simulating reconnect");
            notifier.reconnected();
        }
        if args.pause_at == Some(tick) {
            notifier.pause_due();
            pause_requested = true;
        }

        match manager.tick() {
            TickOutcome::Suspend(wait) => clock.sleep(wait),
            TickOutcome::Terminated(reason) => break reason,
        }

        if pause_requested && manager.can_pause() {
            info!(tick, "Safe to pause, stopping");
            stop.request_stop();
        }
        tick += 1;
    };

    report(&manager, reason)?;
    Ok(reason.exit_code())
}

fn report(manager: &TaskManager, reason: TerminationReason) -> Result<()> {
    let status = manager.status();
    info!(
        reason = reason.as_str(),
        restocks = status.restocks,
        bones_offered = status.bones_offered,
        "Run finished"
    );
    println!("{}", status.to_json()?);
    Ok(())
}
