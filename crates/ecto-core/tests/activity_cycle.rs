//! End-to-end runs of the scheduler over the simulated world.

use ecto_core::items::{BONEMEAL, BUCKET_OF_SLIME, ECTOPHIAL, EMPTY_BUCKET, EMPTY_POT};
use ecto_core::testing::{ManualClock, SimWorld};
use ecto_core::{EctoConfig, TaskManager, TerminationReason, TickOutcome};
use ecto_proto::{ActivityState, Clock, MenuSelection, Phase, SupplyRole};
use std::sync::Arc;
use std::time::Duration;

struct Run {
    manager: TaskManager,
    world: SimWorld,
    clock: Arc<ManualClock>,
}

impl Run {
    fn new(world: SimWorld) -> Self {
        let config = EctoConfig::default();
        let clock = Arc::new(ManualClock::new());
        let manager = TaskManager::new(&config, world.capabilities(clock.clone()));
        let world = world.with_progress_notifier(manager.notifier());
        Self {
            manager,
            world,
            clock,
        }
    }

    /// One driver iteration: tick, then wait out the suspension.
    fn tick(&mut self) -> TickOutcome {
        let outcome = self.manager.tick();
        if let Some(wait) = outcome.suspension() {
            self.clock.advance(wait);
        }
        outcome
    }

    /// Ticks until `done` holds or the run terminates.
    fn drive(&mut self, max_ticks: usize, done: impl Fn(&TaskManager) -> bool) -> Option<TerminationReason> {
        for _ in 0..max_ticks {
            if let TickOutcome::Terminated(reason) = self.tick() {
                return Some(reason);
            }
            if done(&self.manager) {
                return None;
            }
        }
        panic!("run did not settle within {max_ticks} ticks: {:?}", self.manager);
    }

    fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.world
            .calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

fn bones() -> ecto_proto::ResourceKind {
    EctoConfig::default().activity_kinds().primary
}

fn stocked() -> SimWorld {
    SimWorld::new(EctoConfig::default().activity_kinds()).with_full_store()
}

#[test]
fn test_two_full_cycles_from_empty_container() {
    let mut run = Run::new(stocked());

    let halted = run.drive(200, |m| m.counters().restocks == 2 && m.state().phase == Phase::Restock);

    assert!(halted.is_none());
    assert_eq!(run.manager.counters().bones_offered, 16);
    assert_eq!(run.world.stored(bones()), 1_000 - 16);
    assert_eq!(run.world.held(BUCKET_OF_SLIME), 0);
    assert_eq!(run.world.held(BONEMEAL), 0);
    assert!(run.manager.status().steps.contains_key("worship"));
}

#[test]
fn test_scenario_partial_container_restocks_missing_supplies() {
    let mut run = Run::new(stocked().with_held(bones(), 8).with_held(ECTOPHIAL, 1));

    let halted = run.drive(50, |m| m.counters().restocks == 1);

    assert!(halted.is_none());
    assert_eq!(run.calls_matching("withdraw"), vec!["withdraw Pot x8", "withdraw Bucket x8"]);
    assert_eq!(run.world.held(bones()), 8);
    assert_eq!(run.world.held(EMPTY_POT), 8);
    assert_eq!(run.world.held(EMPTY_BUCKET), 8);
    assert_eq!(run.world.held(ECTOPHIAL), 1);
    assert_eq!(run.manager.state().phase, Phase::Transit);
}

#[test]
fn test_scenario_missing_anchor_halts_run() {
    let mut run = Run::new(stocked().with_stored(ECTOPHIAL, 0));

    let halted = run.drive(50, |_| false);

    assert_eq!(
        halted,
        Some(TerminationReason::MissingSupply {
            role: SupplyRole::Anchor,
            kind: ECTOPHIAL,
        })
    );
    assert!(run.calls_matching("withdraw").is_empty());
    assert!(run.manager.status().is_terminated());
}

#[test]
fn test_scenario_unwanted_items_deposited_before_category_and_withdrawals() {
    let mut run = Run::new(stocked().with_junk(2).with_category(ecto_proto::UiResult::Found(3)));

    run.drive(50, |m| m.state().phase == Phase::Transit);

    let calls = run.world.calls();
    let deposit = calls.iter().position(|c| c == "deposit_all_except");
    let switch = calls.iter().position(|c| c == "select_category 0");
    let withdraw = calls.iter().position(|c| c.starts_with("withdraw"));
    assert!(deposit.is_some());
    assert!(deposit < switch);
    assert!(switch < withdraw);
    assert_eq!(run.world.junk(), 0);
}

#[test]
fn test_at_most_one_task_eligible_for_every_state() {
    let tasks = TaskManager::default_tasks(&EctoConfig::default());
    for phase in Phase::ALL {
        for draining_for_pause in [false, true] {
            let state = ActivityState {
                phase,
                draining_for_pause,
            };
            let eligible = tasks.iter().filter(|t| t.can_execute(&state)).count();
            assert!(eligible <= 1, "{eligible} tasks eligible in {state:?}");
            let expected = usize::from(!(phase == Phase::Restock && draining_for_pause));
            assert_eq!(eligible, expected, "{state:?}");
        }
    }
}

#[test]
fn test_phase_stays_consistent_across_reconnects_at_every_point() {
    for reconnect_after in 0..30 {
        let mut run = Run::new(stocked());
        let notifier = run.manager.notifier();
        let bones = bones();

        for tick in 0..120 {
            if tick == reconnect_after {
                notifier.disconnected();
                notifier.reconnected();
            }
            assert!(!run.tick().is_terminated(), "terminated after reconnect at {reconnect_after}");

            let state = run.manager.state();
            if state.phase != Phase::Restock {
                let held = run.world.held(bones) + run.world.held(BUCKET_OF_SLIME) + run.world.held(BONEMEAL);
                assert!(held > 0, "phase {} with nothing to work on (reconnect at {reconnect_after})", state.phase);
            }
            if run.manager.counters().bones_offered >= 8 {
                break;
            }
        }

        assert!(
            run.manager.counters().bones_offered >= 8,
            "cycle never finished after reconnect at {reconnect_after}"
        );
    }
}

#[test]
fn test_recovery_is_idempotent_through_the_scheduler() {
    let world = stocked().with_held(BUCKET_OF_SLIME, 4).with_held(bones(), 4);
    let mut run = Run::new(world);

    run.manager.recover();
    let first = run.manager.state();
    run.manager.recover();

    assert_eq!(run.manager.state(), first);
    assert_eq!(first.phase, Phase::GrindBones);
}

#[test]
fn test_watchdog_stops_run_without_progress() {
    let world = stocked();
    world.set_menu_outcome(Some(MenuSelection::NotOffered));
    let mut run = Run::new(world);

    let halted = run.drive(2_000, |_| false);

    assert_eq!(halted, Some(TerminationReason::WatchdogExpired));
    assert!(run.clock.now_millis() > 300_000);
    assert_eq!(run.manager.tick(), TickOutcome::Terminated(TerminationReason::WatchdogExpired));
}

#[test]
fn test_disconnected_time_does_not_count_toward_watchdog() {
    let world = stocked();
    world.set_menu_outcome(Some(MenuSelection::NotOffered));
    let mut run = Run::new(world);
    let notifier = run.manager.notifier();

    run.drive(20, |m| m.state().phase == Phase::Transit);
    notifier.disconnected();
    for _ in 0..10 {
        assert!(!run.tick().is_terminated());
        run.clock.advance(Duration::from_secs(60));
    }
    notifier.reconnected();

    assert!(!run.tick().is_terminated());
}

#[test]
fn test_hard_stop_mid_withdraw_interrupts_run() {
    let mut run = Run::new(stocked());
    run.world.hard_stop_on_withdraw(run.manager.stop_signal());

    let halted = run.drive(50, |_| false);

    assert_eq!(halted, Some(TerminationReason::Interrupted));
    assert_eq!(run.calls_matching("withdraw").len(), 1);
}
