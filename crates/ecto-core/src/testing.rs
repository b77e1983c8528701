//! In-memory collaborators for tests and the simulated driver.
//!
//! [`SimWorld`] stands in for the container, the store and the activity
//! menus at once. Clones share the same world, so a test can keep one handle
//! for assertions and fault injection while the scheduler owns the others.

use ecto_proto::{
    Action, ActivityActions, Capabilities, Clock, Error, MenuSelection, Notifier, ResourceKind,
    ResourceQuery, Result, StopSignal, StoreController, UiResult,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::ActivityKinds;

/// Clock whose time only moves when told to. `sleep` advances it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(millis: u64) -> Self {
        Self {
            now: AtomicU64::new(millis),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[derive(Debug)]
struct WorldState {
    kinds: ActivityKinds,
    inventory: BTreeMap<ResourceKind, u32>,
    junk: u32,
    bank: BTreeMap<ResourceKind, u32>,
    store_open: bool,
    open_failures: u32,
    category: UiResult<u32>,
    switch_accepted: bool,
    switch_applies: bool,
    deposit_accepted: bool,
    withdraw_failures: u32,
    withdraw_surplus: u32,
    read_failures: u32,
    menu_override: Option<MenuSelection>,
    hard_stop_on_withdraw: Option<StopSignal>,
    notifier: Option<Notifier>,
    calls: Vec<String>,
}

impl WorldState {
    fn held(&self, kind: ResourceKind) -> u32 {
        self.inventory.get(&kind).copied().unwrap_or(0)
    }

    fn put(&mut self, kind: ResourceKind, quantity: u32) {
        if quantity > 0 {
            *self.inventory.entry(kind).or_insert(0) += quantity;
        }
    }

    fn take(&mut self, kind: ResourceKind, quantity: u32) {
        if let Some(count) = self.inventory.get_mut(&kind) {
            *count = count.saturating_sub(quantity);
            if *count == 0 {
                self.inventory.remove(&kind);
            }
        }
    }

    fn read(&mut self) -> Result<()> {
        if self.read_failures > 0 {
            self.read_failures -= 1;
            return Err(Error::unavailable("inventory"));
        }
        Ok(())
    }

    fn progress(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.progress();
        }
    }
}

/// Shared simulated world.
#[derive(Debug, Clone)]
pub struct SimWorld {
    state: Rc<RefCell<WorldState>>,
}

impl SimWorld {
    /// An empty container, an empty closed store showing category 0.
    pub fn new(kinds: ActivityKinds) -> Self {
        Self {
            state: Rc::new(RefCell::new(WorldState {
                kinds,
                inventory: BTreeMap::new(),
                junk: 0,
                bank: BTreeMap::new(),
                store_open: false,
                open_failures: 0,
                category: UiResult::Found(0),
                switch_accepted: true,
                switch_applies: true,
                deposit_accepted: true,
                withdraw_failures: 0,
                withdraw_surplus: 0,
                read_failures: 0,
                menu_override: None,
                hard_stop_on_withdraw: None,
                notifier: None,
                calls: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn with_held(self, kind: ResourceKind, quantity: u32) -> Self {
        self.state.borrow_mut().put(kind, quantity);
        self
    }

    #[must_use]
    pub fn with_stored(self, kind: ResourceKind, quantity: u32) -> Self {
        self.state.borrow_mut().bank.insert(kind, quantity);
        self
    }

    /// Occupies slots with items no tracked kind accounts for.
    #[must_use]
    pub fn with_junk(self, slots: u32) -> Self {
        self.state.borrow_mut().junk = slots;
        self
    }

    #[must_use]
    pub fn with_category(self, category: UiResult<u32>) -> Self {
        self.state.borrow_mut().category = category;
        self
    }

    /// Stocks the store with plenty of every supply and anchor kind.
    #[must_use]
    pub fn with_full_store(self) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let kinds: Vec<ResourceKind> = state
                .kinds
                .supplies()
                .chain(state.kinds.anchors.iter().copied())
                .collect();
            for kind in kinds {
                state.bank.insert(kind, 1_000);
            }
        }
        self
    }

    /// Emits a progress notification whenever an action consumes bones.
    #[must_use]
    pub fn with_progress_notifier(self, notifier: Notifier) -> Self {
        self.set_progress_notifier(notifier);
        self
    }

    pub fn set_progress_notifier(&self, notifier: Notifier) {
        self.state.borrow_mut().notifier = Some(notifier);
    }

    /// Boxes clones of this world as the full capability set.
    pub fn capabilities(&self, clock: Arc<dyn Clock>) -> Capabilities {
        Capabilities {
            inventory: Box::new(self.clone()),
            store: Box::new(self.clone()),
            actions: Box::new(self.clone()),
            clock,
        }
    }

    pub fn held(&self, kind: ResourceKind) -> u32 {
        self.state.borrow().held(kind)
    }

    pub fn stored(&self, kind: ResourceKind) -> u32 {
        self.state.borrow().bank.get(&kind).copied().unwrap_or(0)
    }

    pub fn junk(&self) -> u32 {
        self.state.borrow().junk
    }

    pub fn is_store_open(&self) -> bool {
        self.state.borrow().store_open
    }

    pub fn set_held(&self, kind: ResourceKind, quantity: u32) {
        let mut state = self.state.borrow_mut();
        state.inventory.remove(&kind);
        state.put(kind, quantity);
    }

    pub fn set_stored(&self, kind: ResourceKind, quantity: u32) {
        self.state.borrow_mut().bank.insert(kind, quantity);
    }

    pub fn set_store_open(&self, open: bool) {
        self.state.borrow_mut().store_open = open;
    }

    pub fn fail_opens(&self, attempts: u32) {
        self.state.borrow_mut().open_failures = attempts;
    }

    pub fn fail_withdrawals(&self, attempts: u32) {
        self.state.borrow_mut().withdraw_failures = attempts;
    }

    pub fn fail_reads(&self, reads: u32) {
        self.state.borrow_mut().read_failures = reads;
    }

    /// Every withdrawal delivers this many items more than requested.
    pub fn set_withdraw_surplus(&self, surplus: u32) {
        self.state.borrow_mut().withdraw_surplus = surplus;
    }

    pub fn set_deposit_accepted(&self, accepted: bool) {
        self.state.borrow_mut().deposit_accepted = accepted;
    }

    pub fn set_category(&self, category: UiResult<u32>) {
        self.state.borrow_mut().category = category;
    }

    /// `accepted` is what `select_category` reports, `applies` whether the
    /// selection actually changes.
    pub fn set_category_switch(&self, accepted: bool, applies: bool) {
        let mut state = self.state.borrow_mut();
        state.switch_accepted = accepted;
        state.switch_applies = applies;
    }

    /// Forces every menu interaction to end with `selection`.
    pub fn set_menu_outcome(&self, selection: Option<MenuSelection>) {
        self.state.borrow_mut().menu_override = selection;
    }

    /// Triggers `stop.hard_stop()` on the next withdrawal, which then never lands.
    pub fn hard_stop_on_withdraw(&self, stop: StopSignal) {
        self.state.borrow_mut().hard_stop_on_withdraw = Some(stop);
    }

    /// Collaborator calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl ResourceQuery for SimWorld {
    fn count(&self, kind: ResourceKind) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        state.read()?;
        Ok(state.held(kind))
    }

    fn total_occupied(&self) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        state.read()?;
        Ok(state.inventory.values().sum::<u32>() + state.junk)
    }

    fn store_contains(&self, kind: ResourceKind) -> Result<bool> {
        let state = self.state.borrow();
        Ok(state.bank.get(&kind).is_some_and(|count| *count > 0))
    }
}

impl StoreController for SimWorld {
    fn is_open(&self) -> Result<bool> {
        Ok(self.state.borrow().store_open)
    }

    fn open(&mut self) -> Result<bool> {
        self.record("open".to_string());
        let mut state = self.state.borrow_mut();
        if state.open_failures > 0 {
            state.open_failures -= 1;
            return Ok(false);
        }
        state.store_open = true;
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        self.record("close".to_string());
        self.state.borrow_mut().store_open = false;
        Ok(())
    }

    fn deposit_all_except(&mut self, keep: &[ResourceKind]) -> Result<bool> {
        self.record("deposit_all_except".to_string());
        let mut state = self.state.borrow_mut();
        if !state.store_open || !state.deposit_accepted {
            return Ok(false);
        }

        let unwanted: Vec<(ResourceKind, u32)> = state
            .inventory
            .iter()
            .filter(|(kind, _)| !keep.contains(kind))
            .map(|(kind, count)| (*kind, *count))
            .collect();
        for (kind, count) in unwanted {
            state.inventory.remove(&kind);
            *state.bank.entry(kind).or_insert(0) += count;
        }
        state.junk = 0;
        Ok(true)
    }

    fn withdraw(&mut self, kind: ResourceKind, quantity: u32) -> Result<bool> {
        self.record(format!("withdraw {} x{}", kind.name, quantity));
        let mut state = self.state.borrow_mut();
        if let Some(stop) = state.hard_stop_on_withdraw.take() {
            stop.hard_stop();
            return Ok(true);
        }
        if !state.store_open {
            return Ok(false);
        }
        if state.withdraw_failures > 0 {
            state.withdraw_failures -= 1;
            return Ok(false);
        }

        let stored = state.bank.get(&kind).copied().unwrap_or(0);
        if stored == 0 {
            return Ok(false);
        }
        let moved = quantity.min(stored);
        state.bank.insert(kind, stored - moved);
        let surplus = state.withdraw_surplus;
        state.put(kind, moved + surplus);
        Ok(true)
    }

    fn selected_category(&self) -> Result<UiResult<u32>> {
        let state = self.state.borrow();
        if !state.store_open {
            return Ok(UiResult::NotVisible);
        }
        Ok(state.category)
    }

    fn select_category(&mut self, index: u32) -> Result<bool> {
        self.record(format!("select_category {index}"));
        let mut state = self.state.borrow_mut();
        if !state.switch_accepted {
            return Ok(false);
        }
        if state.switch_applies {
            state.category = UiResult::Found(index);
        }
        Ok(true)
    }
}

impl ActivityActions for SimWorld {
    fn perform(&mut self, action: Action) -> Result<MenuSelection> {
        self.record(format!("perform {}", action.as_str()));
        let mut state = self.state.borrow_mut();
        if let Some(selection) = state.menu_override {
            return Ok(selection);
        }

        let kinds = state.kinds.clone();

        match action {
            Action::Teleport => {}
            Action::CollectSlime => {
                let filled = state.held(kinds.bucket);
                state.take(kinds.bucket, filled);
                state.put(kinds.slime, filled);
            }
            Action::GrindBones => {
                let ground = state.held(kinds.primary).min(state.held(kinds.pot));
                state.take(kinds.primary, ground);
                state.take(kinds.pot, ground);
                state.put(kinds.bonemeal, ground);
                if ground > 0 {
                    state.progress();
                }
            }
            Action::Worship => {
                let offered = state.held(kinds.slime).min(state.held(kinds.bonemeal));
                state.take(kinds.slime, offered);
                state.take(kinds.bonemeal, offered);
                state.put(kinds.pot, offered);
                state.put(kinds.bucket, offered);
                if offered > 0 {
                    state.progress();
                }
            }
        }
        Ok(MenuSelection::Selected)
    }
}
