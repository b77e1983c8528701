use super::*;
use crate::config::EctoConfig;
use crate::items::{ECTOPHIAL, EMPTY_BUCKET, EMPTY_POT};
use crate::testing::{ManualClock, SimWorld};
use ecto_proto::{Clock, CycleCounters, Error, Mismatch, StopSignal, StoreController};

const BONES: ResourceKind = ResourceKind::new(526, "Bones");

struct Harness {
    world: SimWorld,
    store: SimWorld,
    actions: SimWorld,
    clock: ManualClock,
    stop: StopSignal,
    state: ActivityState,
    counters: CycleCounters,
}

impl Harness {
    fn new(world: SimWorld) -> Self {
        Self {
            store: world.clone(),
            actions: world.clone(),
            world,
            clock: ManualClock::new(),
            stop: StopSignal::new(),
            state: ActivityState::new(Phase::Restock),
            counters: CycleCounters::default(),
        }
    }

    fn step(&mut self, task: &mut RestockTask) -> Result<Step> {
        let mut ctx = TaskContext {
            state: &mut self.state,
            inventory: &self.world,
            store: &mut self.store,
            actions: &mut self.actions,
            clock: &self.clock,
            stop: &self.stop,
            counters: &mut self.counters,
        };
        task.execute(&mut ctx)
    }

    /// Steps until the task sits in `target`, returning the states passed through.
    fn advance_to(&mut self, task: &mut RestockTask, target: BankingState) -> Vec<BankingState> {
        let mut trail = vec![task.state()];
        for _ in 0..20 {
            if task.state() == target {
                return trail;
            }
            let step = self.step(task).unwrap();
            assert!(matches!(step, Step::Suspend(_)), "unexpected {step:?} in {}", task.state());
            trail.push(task.state());
        }
        panic!("never reached {target}, trail: {trail:?}");
    }

    /// Steps until the phase leaves `Restock` or the task halts.
    fn run_cycle(&mut self, task: &mut RestockTask) -> (Vec<BankingState>, Option<TerminalCondition>) {
        let mut trail = vec![task.state()];
        for _ in 0..20 {
            match self.step(task).unwrap() {
                Step::Suspend(_) => trail.push(task.state()),
                Step::Halt(condition) => return (trail, Some(condition)),
            }
            if self.state.phase != Phase::Restock {
                return (trail, None);
            }
        }
        panic!("cycle did not finish, trail: {trail:?}");
    }

    fn withdrawals(&self) -> Vec<String> {
        self.world
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("withdraw"))
            .collect()
    }
}

fn config() -> EctoConfig {
    EctoConfig::default()
}

fn restock_task() -> RestockTask {
    RestockTask::new(config().supply_requirement(), 0)
}

fn stocked_world() -> SimWorld {
    SimWorld::new(config().activity_kinds()).with_full_store()
}

#[test]
fn test_eligible_only_when_restocking_and_not_draining() {
    let task = restock_task();
    for phase in Phase::ALL {
        for draining in [false, true] {
            let state = ActivityState {
                phase,
                draining_for_pause: draining,
            };
            assert_eq!(task.can_execute(&state), phase == Phase::Restock && !draining);
        }
    }
}

#[test]
fn test_scenario_partial_container_withdraws_only_whats_missing() {
    let world = stocked_world().with_held(BONES, 8).with_held(ECTOPHIAL, 1);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::Withdrawing);
    let snapshot = InventorySnapshot::capture(&h.world, &task.requirement().kinds()).unwrap();
    let plan: Vec<_> = task
        .requirement()
        .withdrawal_plan(&snapshot)
        .into_iter()
        .map(|(entry, needed)| (entry.kind, needed))
        .collect();
    assert_eq!(plan, vec![(BONES, 0), (EMPTY_POT, 8), (EMPTY_BUCKET, 8), (ECTOPHIAL, 0)]);

    let (trail, halted) = h.run_cycle(&mut task);
    assert!(halted.is_none());
    assert_eq!(h.withdrawals(), vec!["withdraw Pot x8", "withdraw Bucket x8"]);
    assert_eq!(
        trail,
        vec![
            BankingState::Withdrawing,
            BankingState::Verifying,
            BankingState::Complete,
            BankingState::OpeningStore,
        ]
    );
    assert_eq!(h.state.phase, Phase::Transit);
    assert_eq!(h.world.held(EMPTY_POT), 8);
    assert_eq!(h.world.held(EMPTY_BUCKET), 8);
    assert!(!h.world.is_store_open());
    assert_eq!(h.counters.restocks, 1);
}

#[test]
fn test_scenario_missing_anchor_halts_without_withdrawing() {
    let world = stocked_world().with_stored(ECTOPHIAL, 0);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    let (trail, halted) = h.run_cycle(&mut task);

    assert_eq!(
        halted,
        Some(TerminalCondition::MissingSupply {
            role: SupplyRole::Anchor,
            kind: ECTOPHIAL,
        })
    );
    assert_eq!(trail.last(), Some(&BankingState::CheckingSupply));
    assert!(h.withdrawals().is_empty());
    assert_eq!(h.state.phase, Phase::Restock);
}

#[test]
fn test_anchor_held_in_container_counts_as_present() {
    let world = stocked_world().with_stored(ECTOPHIAL, 0).with_held(ECTOPHIAL, 1);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    let (_, halted) = h.run_cycle(&mut task);
    assert!(halted.is_none());
    assert_eq!(h.state.phase, Phase::Transit);
}

#[test]
fn test_missing_supplies_are_classified_in_order() {
    let world = stocked_world().with_stored(BONES, 0).with_stored(EMPTY_POT, 0).with_stored(ECTOPHIAL, 0);
    let mut h = Harness::new(world.clone());
    let mut task = restock_task();
    let (_, halted) = h.run_cycle(&mut task);
    assert_eq!(
        halted,
        Some(TerminalCondition::MissingSupply {
            role: SupplyRole::Primary,
            kind: BONES,
        })
    );

    world.set_stored(BONES, 100);
    let mut h = Harness::new(world);
    let mut task = restock_task();
    let (_, halted) = h.run_cycle(&mut task);
    assert_eq!(
        halted,
        Some(TerminalCondition::MissingSupply {
            role: SupplyRole::Container,
            kind: EMPTY_POT,
        })
    );
}

#[test]
fn test_scenario_unwanted_items_are_deposited_first() {
    let world = stocked_world().with_held(BONES, 3).with_junk(2);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    let trail = h.advance_to(&mut task, BankingState::SwitchingCategory);

    assert_eq!(
        trail,
        vec![
            BankingState::OpeningStore,
            BankingState::AnalyzingContents,
            BankingState::DepositingUnwanted,
            BankingState::SwitchingCategory,
        ]
    );
    assert_eq!(h.world.junk(), 0);
    assert_eq!(h.world.held(BONES), 3);
}

#[test]
fn test_rejected_deposit_retries_same_state() {
    let world = stocked_world().with_junk(4);
    world.set_deposit_accepted(false);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::DepositingUnwanted);
    for _ in 0..3 {
        h.step(&mut task).unwrap();
        assert_eq!(task.state(), BankingState::DepositingUnwanted);
    }

    h.world.set_deposit_accepted(true);
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::SwitchingCategory);
}

#[test]
fn test_verification_mismatch_halts() {
    let world = stocked_world();
    world.set_withdraw_surplus(1);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    let (trail, halted) = h.run_cycle(&mut task);

    assert_eq!(
        halted,
        Some(TerminalCondition::VerificationMismatch(Mismatch {
            kind: BONES,
            expected: 8,
            actual: 9,
        }))
    );
    assert_eq!(trail.last(), Some(&BankingState::Verifying));
    assert_eq!(h.state.phase, Phase::Restock);
}

#[test]
fn test_never_completes_without_verifying_this_cycle() {
    let mut h = Harness::new(stocked_world());
    let mut task = restock_task();
    task.state = BankingState::Complete;

    h.step(&mut task).unwrap();

    assert_eq!(task.state(), BankingState::Verifying);
    assert_eq!(h.state.phase, Phase::Restock);
    assert_eq!(h.counters.restocks, 0);
}

#[test]
fn test_verification_does_not_carry_into_next_cycle() {
    let world = stocked_world();
    let mut h = Harness::new(world.clone());
    let mut task = restock_task();

    let (trail, _) = h.run_cycle(&mut task);
    let verified = trail.iter().position(|s| *s == BankingState::Verifying);
    let completed = trail.iter().position(|s| *s == BankingState::Complete);
    assert!(verified < completed);
    assert!(!task.verified_this_cycle);

    h.state.phase = Phase::Restock;
    task.state = BankingState::Complete;
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::Verifying);
}

#[test]
fn test_category_not_visible_retries() {
    let mut h = Harness::new(stocked_world());
    let mut task = restock_task();
    h.advance_to(&mut task, BankingState::SwitchingCategory);

    h.world.set_category(UiResult::NotVisible);
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::SwitchingCategory);

    h.world.set_category(UiResult::Found(0));
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::CheckingSupply);
}

#[test]
fn test_category_switch_is_confirmed() {
    let world = stocked_world().with_category(UiResult::NotFound);
    let mut h = Harness::new(world);
    let mut task = RestockTask::new(config().supply_requirement(), 2);

    h.advance_to(&mut task, BankingState::CheckingSupply);

    assert!(h.world.calls().contains(&"select_category 2".to_string()));
    assert_eq!(h.store.selected_category().unwrap(), UiResult::Found(2));
}

#[test]
fn test_failed_category_switch_is_not_fatal() {
    let world = stocked_world().with_category(UiResult::Found(1));
    world.set_category_switch(false, false);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    let (_, halted) = h.run_cycle(&mut task);
    assert!(halted.is_none());
    assert_eq!(h.state.phase, Phase::Transit);
}

#[test]
fn test_unconfirmed_category_switch_times_out_then_continues() {
    let world = stocked_world().with_category(UiResult::Found(1));
    world.set_category_switch(true, false);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::SwitchingCategory);
    let before = h.clock.now_millis();
    h.step(&mut task).unwrap();

    assert_eq!(task.state(), BankingState::CheckingSupply);
    assert!(h.clock.now_millis() - before >= 3000);
}

#[test]
fn test_rejected_withdraw_retries() {
    let world = stocked_world();
    world.fail_withdrawals(1);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::Withdrawing);
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::Withdrawing);

    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::Verifying);
    assert_eq!(h.world.held(BONES), 8);
}

#[test]
fn test_short_store_withdraws_what_it_has_then_fails_verification() {
    let world = stocked_world().with_stored(BONES, 3);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::Withdrawing);
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::Verifying);
    assert_eq!(h.world.held(BONES), 3);
    assert_eq!(h.withdrawals(), vec!["withdraw Bones x8"]);

    let halted = h.step(&mut task).unwrap();
    assert_eq!(
        halted,
        Step::Halt(TerminalCondition::VerificationMismatch(Mismatch {
            kind: BONES,
            expected: 8,
            actual: 3,
        }))
    );
    assert_eq!(h.state.phase, Phase::Restock);
}

#[test]
fn test_stacked_teleport_items_pass_verification() {
    let config = EctoConfig::parse_yaml("activity:\n  bank_location: varrock\n").unwrap();
    let teleport = config.activity.bank_location.teleport_item().unwrap();

    let world = SimWorld::new(config.activity_kinds())
        .with_full_store()
        .with_held(teleport, 5);
    let mut h = Harness::new(world);
    let mut task = RestockTask::new(config.supply_requirement(), 0);

    let (trail, halted) = h.run_cycle(&mut task);

    assert!(halted.is_none(), "halted with {halted:?}");
    assert!(trail.contains(&BankingState::Complete));
    assert_eq!(h.world.held(teleport), 5);
    assert!(!h.withdrawals().iter().any(|c| c.starts_with("withdraw Varrock")));
    assert_eq!(h.state.phase, Phase::Transit);
}

#[test]
fn test_closed_store_sends_back_to_opening() {
    let mut h = Harness::new(stocked_world());
    let mut task = restock_task();
    h.advance_to(&mut task, BankingState::CheckingSupply);

    h.world.set_store_open(false);
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::OpeningStore);

    let (_, halted) = h.run_cycle(&mut task);
    assert!(halted.is_none());
    assert_eq!(h.state.phase, Phase::Transit);
}

#[test]
fn test_store_that_will_not_open_is_retried() {
    let world = stocked_world();
    world.fail_opens(2);
    let mut h = Harness::new(world);
    let mut task = restock_task();

    h.step(&mut task).unwrap();
    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::OpeningStore);

    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::AnalyzingContents);
}

#[test]
fn test_hard_stop_during_withdraw_wait_propagates() {
    let world = stocked_world();
    let mut h = Harness::new(world);
    h.world.hard_stop_on_withdraw(h.stop.clone());
    let mut task = restock_task();

    h.advance_to(&mut task, BankingState::Withdrawing);
    let err = h.step(&mut task).unwrap_err();

    assert!(matches!(err, Error::HardStop));
    assert_eq!(task.state(), BankingState::Withdrawing);
}

#[test]
fn test_read_failure_leaves_state_for_retry() {
    let mut h = Harness::new(stocked_world());
    let mut task = restock_task();
    h.advance_to(&mut task, BankingState::AnalyzingContents);

    h.world.fail_reads(1);
    assert!(h.step(&mut task).is_err());
    assert_eq!(task.state(), BankingState::AnalyzingContents);

    h.step(&mut task).unwrap();
    assert_eq!(task.state(), BankingState::SwitchingCategory);
}

#[test]
fn test_teleport_item_becomes_an_anchor() {
    let yaml = "activity:\n  bank_location: varrock\n";
    let config = EctoConfig::parse_yaml(yaml).unwrap();
    let teleport = config.activity.bank_location.teleport_item().unwrap();

    let world = SimWorld::new(config.activity_kinds()).with_full_store().with_stored(teleport, 0);
    let mut h = Harness::new(world);
    let mut task = RestockTask::new(config.supply_requirement(), 0);

    let (_, halted) = h.run_cycle(&mut task);
    assert_eq!(
        halted,
        Some(TerminalCondition::MissingSupply {
            role: SupplyRole::Anchor,
            kind: teleport,
        })
    );
}

#[test]
fn test_reset_restarts_from_opening_store() {
    let mut h = Harness::new(stocked_world());
    let mut task = restock_task();
    h.advance_to(&mut task, BankingState::Verifying);

    task.reset();

    assert_eq!(task.state(), BankingState::OpeningStore);
    assert!(!task.verified_this_cycle);
    let (_, halted) = h.run_cycle(&mut task);
    assert!(halted.is_none());
}
