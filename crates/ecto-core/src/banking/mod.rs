//! Resource reconciliation ("banking").
//!
//! Normalises the container against the store in eight resumable states:
//!
//! ```text
//! OpeningStore -> AnalyzingContents -> [DepositingUnwanted] -> SwitchingCategory
//!     -> CheckingSupply -> Withdrawing -> Verifying -> Complete -> OpeningStore
//! ```
//!
//! Each call to [`Task::execute`] runs one state handler. The current state
//! is the only resumption mechanism, so a step may be followed by an
//! arbitrarily long pause. A missing supply or a failed verification halts
//! the run; everything else is retried on a later tick.

use crate::wait::{POLL_INTERVAL, poll_until};
use ecto_proto::{
    ActivityState, InventorySnapshot, Phase, ResourceKind, Result, Step, SupplyRequirement,
    SupplyRole, Task, TaskContext, TaskId, TerminalCondition, UiResult,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

const OPEN_TIMEOUT: Duration = Duration::from_millis(3000);
const DEPOSIT_TIMEOUT: Duration = Duration::from_millis(3000);
const SWITCH_TIMEOUT: Duration = Duration::from_millis(3000);
const WITHDRAW_TIMEOUT: Duration = Duration::from_millis(2000);

const NEXT_STATE_MS: u64 = 200;
const AFTER_ACTION_MS: u64 = 300;
const RETRY_MS: u64 = 600;
const BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BankingState {
    #[default]
    OpeningStore,
    AnalyzingContents,
    DepositingUnwanted,
    SwitchingCategory,
    CheckingSupply,
    Withdrawing,
    Verifying,
    Complete,
}

impl BankingState {
    pub fn as_str(self) -> &'static str {
        match self {
            BankingState::OpeningStore => "opening_store",
            BankingState::AnalyzingContents => "analyzing_contents",
            BankingState::DepositingUnwanted => "depositing_unwanted",
            BankingState::SwitchingCategory => "switching_category",
            BankingState::CheckingSupply => "checking_supply",
            BankingState::Withdrawing => "withdrawing",
            BankingState::Verifying => "verifying",
            BankingState::Complete => "complete",
        }
    }

    /// States that operate on the open store UI.
    fn needs_open_store(self) -> bool {
        matches!(
            self,
            BankingState::AnalyzingContents
                | BankingState::DepositingUnwanted
                | BankingState::SwitchingCategory
                | BankingState::CheckingSupply
                | BankingState::Withdrawing
        )
    }
}

impl std::fmt::Display for BankingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restocks the container from the store. Eligible only in [`Phase::Restock`].
#[derive(Debug)]
pub struct RestockTask {
    id: TaskId,
    requirement: SupplyRequirement,
    keep: Vec<ResourceKind>,
    category: u32,
    state: BankingState,
    verified_this_cycle: bool,
}

impl RestockTask {
    pub fn new(requirement: SupplyRequirement, category: u32) -> Self {
        let keep = requirement.kinds();
        Self {
            id: TaskId::from("restock"),
            requirement,
            keep,
            category,
            state: BankingState::OpeningStore,
            verified_this_cycle: false,
        }
    }

    pub fn state(&self) -> BankingState {
        self.state
    }

    pub fn requirement(&self) -> &SupplyRequirement {
        &self.requirement
    }

    fn transition(&mut self, next: BankingState) {
        if next != self.state {
            debug!(from = %self.state, to = %next, "Banking transition");
            self.state = next;
        }
    }

    fn snapshot(&self, ctx: &TaskContext<'_>) -> Result<InventorySnapshot> {
        InventorySnapshot::capture(ctx.inventory, &self.keep)
    }

    fn open_store(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        if ctx.store.is_open()? {
            self.transition(BankingState::AnalyzingContents);
            return Ok(Step::after(NEXT_STATE_MS));
        }

        if !ctx.store.open()? {
            debug!("Store did not open, retrying");
            return Ok(Step::after(BACKOFF_MS));
        }

        let store = &*ctx.store;
        if poll_until(ctx.clock, ctx.stop, OPEN_TIMEOUT, POLL_INTERVAL, || store.is_open())? {
            self.transition(BankingState::AnalyzingContents);
            Ok(Step::after(NEXT_STATE_MS))
        } else {
            debug!("Store open not confirmed, retrying");
            Ok(Step::after(RETRY_MS))
        }
    }

    fn analyze_contents(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        let snapshot = self.snapshot(ctx)?;
        debug!(%snapshot, "Analyzed container");

        if snapshot.has_unwanted() {
            info!(
                unwanted_slots = snapshot.total_occupied() - snapshot.known_total(),
                "Container holds unwanted items"
            );
            self.transition(BankingState::DepositingUnwanted);
        } else {
            self.transition(BankingState::SwitchingCategory);
        }
        Ok(Step::after(NEXT_STATE_MS))
    }

    fn deposit_unwanted(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        if !ctx.store.deposit_all_except(&self.keep)? {
            debug!("Deposit not accepted, retrying");
            return Ok(Step::after(RETRY_MS));
        }

        let inventory = ctx.inventory;
        let keep = &self.keep;
        let cleared = poll_until(ctx.clock, ctx.stop, DEPOSIT_TIMEOUT, POLL_INTERVAL, || {
            Ok(!InventorySnapshot::capture(inventory, keep)?.has_unwanted())
        })?;

        if cleared {
            self.transition(BankingState::SwitchingCategory);
            Ok(Step::after(AFTER_ACTION_MS))
        } else {
            debug!("Deposit not reflected in container yet, retrying");
            Ok(Step::after(RETRY_MS))
        }
    }

    fn switch_category(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        let target = self.category;
        match ctx.store.selected_category()? {
            UiResult::NotVisible => {
                debug!("Store categories not visible, retrying");
                return Ok(Step::after(RETRY_MS));
            }
            UiResult::Found(current) if current == target => {
                self.transition(BankingState::CheckingSupply);
                return Ok(Step::after(NEXT_STATE_MS));
            }
            UiResult::Found(current) => {
                debug!(current, target, "Switching store category");
            }
            UiResult::NotFound => {
                debug!(target, "No category selected, switching");
            }
        }

        if ctx.store.select_category(target)? {
            let store = &*ctx.store;
            let confirmed = poll_until(ctx.clock, ctx.stop, SWITCH_TIMEOUT, POLL_INTERVAL, || {
                Ok(store.selected_category()? == UiResult::Found(target))
            })?;
            if !confirmed {
                warn!(target, "Category switch not confirmed, continuing anyway");
            }
        } else {
            warn!(target, "Category switch failed, continuing anyway");
        }

        self.transition(BankingState::CheckingSupply);
        Ok(Step::after(AFTER_ACTION_MS))
    }

    fn check_supply(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        for role in [SupplyRole::Primary, SupplyRole::Container, SupplyRole::Anchor] {
            for entry in self.requirement.by_role(role) {
                let held = ctx.inventory.count(entry.kind)?;
                if held >= entry.target {
                    continue;
                }
                if !ctx.inventory.store_contains(entry.kind)? {
                    return Ok(Step::Halt(TerminalCondition::MissingSupply {
                        role,
                        kind: entry.kind,
                    }));
                }
            }
        }

        self.transition(BankingState::Withdrawing);
        Ok(Step::after(NEXT_STATE_MS))
    }

    fn withdraw(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        let snapshot = self.snapshot(ctx)?;
        let plan = self.requirement.withdrawal_plan(&snapshot);

        for (entry, needed) in plan {
            if needed == 0 {
                continue;
            }
            let kind = entry.kind;

            if !ctx.store.withdraw(kind, needed)? {
                debug!(%kind, needed, "Withdraw rejected, retrying");
                return Ok(Step::after(RETRY_MS));
            }

            let inventory = ctx.inventory;
            let arrived = poll_until(ctx.clock, ctx.stop, WITHDRAW_TIMEOUT, POLL_INTERVAL, || {
                Ok(inventory.count(kind)? >= entry.target)
            })?;
            if !arrived {
                // Accepted but short: let verification name the kind.
                warn!(%kind, expected = entry.target, "Withdrawal did not reach target, verifying");
                self.transition(BankingState::Verifying);
                return Ok(Step::after(AFTER_ACTION_MS));
            }
            debug!(%kind, needed, "Withdrew");
        }

        self.transition(BankingState::Verifying);
        Ok(Step::after(AFTER_ACTION_MS))
    }

    fn verify(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        let snapshot = self.snapshot(ctx)?;
        let mismatches = self.requirement.mismatches(&snapshot);

        if let Some(first) = mismatches.first() {
            for other in &mismatches[1..] {
                debug!(kind = %other.kind, expected = other.expected, actual = other.actual, "Further mismatch");
            }
            return Ok(Step::Halt(TerminalCondition::VerificationMismatch(*first)));
        }

        debug!(%snapshot, "Container verified");
        self.verified_this_cycle = true;
        self.transition(BankingState::Complete);
        Ok(Step::after(NEXT_STATE_MS))
    }

    fn complete(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        if !self.verified_this_cycle {
            debug!("Completion reached without verification, verifying first");
            self.transition(BankingState::Verifying);
            return Ok(Step::after(NEXT_STATE_MS));
        }

        if ctx.store.is_open()? {
            ctx.store.close()?;
        }

        ctx.state.phase = Phase::Transit;
        ctx.counters.restocks += 1;
        self.verified_this_cycle = false;
        self.transition(BankingState::OpeningStore);
        info!(restocks = ctx.counters.restocks, "Restock complete");
        Ok(Step::after(RETRY_MS))
    }
}

impl Task for RestockTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn can_execute(&self, state: &ActivityState) -> bool {
        state.needs_restock() && !state.draining_for_pause
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<Step> {
        if self.state.needs_open_store() && !ctx.store.is_open()? {
            debug!(state = %self.state, "Store closed mid-restock, reopening");
            self.transition(BankingState::OpeningStore);
            return Ok(Step::after(AFTER_ACTION_MS));
        }

        match self.state {
            BankingState::OpeningStore => self.open_store(ctx),
            BankingState::AnalyzingContents => self.analyze_contents(ctx),
            BankingState::DepositingUnwanted => self.deposit_unwanted(ctx),
            BankingState::SwitchingCategory => self.switch_category(ctx),
            BankingState::CheckingSupply => self.check_supply(ctx),
            BankingState::Withdrawing => self.withdraw(ctx),
            BankingState::Verifying => self.verify(ctx),
            BankingState::Complete => self.complete(ctx),
        }
    }

    fn reset(&mut self) {
        if self.state != BankingState::OpeningStore {
            debug!(state = %self.state, "Restarting restock from the top");
        }
        self.state = BankingState::OpeningStore;
        self.verified_this_cycle = false;
    }
}
