//! Tick-driven state machine layered on callback tables.
//!
//! A [`StateMachine`] keeps a requested state and the state the previous
//! tick finished in. Requests made with [`change_state`](StateMachine::change_state)
//! are deferred: each [`tick`](StateMachine::tick) first runs the update
//! hooks of the current state and then, if the state differs from the last
//! one, fires exit, transition and enter hooks in that order.

mod handle;

pub use handle::StateHandle;

use crate::callback::{
    accumulate, Bindings, Callback, CallbackTable, DispatchError, KeyPolicy, Owner, Role,
    SubscriberId,
};
use crate::core::{
    Guard, Key, KeySource, StateHistory, StateTransition, TransitionKey, DEFAULT_HISTORY_LIMIT,
};
use chrono::Utc;
use handle::StateCore;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

type ChangedHook = Box<dyn FnMut(&Key, &Key)>;

/// Finite state machine with update, enter, exit and transition hooks.
///
/// # Example
///
/// ```rust
/// use switchyard::machine::StateMachine;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let mut machine = StateMachine::default();
/// machine.add_state("Idle");
/// machine.add_state("Run");
///
/// let sink = Rc::clone(&log);
/// machine.on_exit("Idle", move || sink.borrow_mut().push("exit Idle")).unwrap();
/// let sink = Rc::clone(&log);
/// machine
///     .on_transition("Idle", "Run", move || sink.borrow_mut().push("Idle -> Run"))
///     .unwrap();
/// let sink = Rc::clone(&log);
/// machine.on_enter("Run", move || sink.borrow_mut().push("enter Run")).unwrap();
///
/// machine.change_state("Idle", true).unwrap();
/// machine.tick().unwrap();
/// machine.change_state("Run", false).unwrap();
/// machine.tick().unwrap();
///
/// assert_eq!(*log.borrow(), vec!["exit Idle", "Idle -> Run", "enter Run"]);
/// ```
pub struct StateMachine {
    core: Rc<RefCell<StateCore>>,
    update: CallbackTable<Key>,
    enter: CallbackTable<Key>,
    exit: CallbackTable<Key>,
    transitions: CallbackTable<TransitionKey>,
    on_changed: Option<ChangedHook>,
    history: StateHistory,
    ticks: u64,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(KeyPolicy::default())
    }
}

impl StateMachine {
    pub fn new(policy: KeyPolicy) -> Self {
        Self::with_options(policy, None, DEFAULT_HISTORY_LIMIT)
    }

    pub(crate) fn with_options(policy: KeyPolicy, label: Option<String>, history_limit: usize) -> Self {
        Self {
            core: Rc::new(RefCell::new(StateCore::new(policy, label))),
            update: CallbackTable::new(policy).with_role(Role::Update),
            enter: CallbackTable::new(policy).with_role(Role::Enter),
            exit: CallbackTable::new(policy).with_role(Role::Exit),
            transitions: CallbackTable::new(policy),
            on_changed: None,
            history: StateHistory::with_limit(history_limit),
            ticks: 0,
        }
    }

    /// A machine whose states are exactly the keys of `S`.
    pub fn from_source<S: KeySource>(policy: KeyPolicy) -> Self {
        let mut machine = Self::new(policy);
        machine.add_states::<S>();
        machine
    }

    pub fn policy(&self) -> KeyPolicy {
        self.core.borrow().policy
    }

    pub fn label(&self) -> Option<String> {
        self.core.borrow().label.clone()
    }

    /// Declare one state. Returns whether it was new.
    pub fn add_state(&mut self, state: impl Into<Key>) -> bool {
        let state = state.into();
        self.enter.add_key(state.clone());
        self.exit.add_key(state.clone());
        self.update.add_key(state.clone());
        self.core.borrow_mut().known.insert(state)
    }

    /// Declare every key of `S` as a state and close the state set.
    pub fn add_states<S: KeySource>(&mut self) {
        self.seed_states(S::keys());
    }

    pub(crate) fn seed_states(&mut self, keys: Vec<Key>) {
        self.update.seed(keys.iter().cloned());
        self.enter.seed(keys.iter().cloned());
        self.exit.seed(keys.iter().cloned());
        self.core.borrow_mut().known.extend(keys);
    }

    /// Known states, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &Key> {
        self.update.keys()
    }

    pub fn has_state(&self, state: impl Into<Key>) -> bool {
        self.update.has_key(&state.into())
    }

    // Registering a hook for an unknown state declares it, unless the state set is closed.
    fn admit(&mut self, state: &Key) -> Result<(), DispatchError> {
        if self.update.has_key(state) {
            return Ok(());
        }
        if !self.update.accepts(state) {
            return Err(DispatchError::UnknownKey {
                key: state.to_string(),
            });
        }
        self.add_state(state.clone());
        Ok(())
    }

    /// Run `callback` on every tick spent in `state`.
    pub fn on_update<F>(&mut self, state: impl Into<Key>, callback: F) -> Result<SubscriberId, DispatchError>
    where
        F: Callback<()>,
    {
        let state = state.into();
        self.admit(&state)?;
        self.update.register(state, callback)
    }

    pub fn on_enter<F>(&mut self, state: impl Into<Key>, callback: F) -> Result<SubscriberId, DispatchError>
    where
        F: Callback<()>,
    {
        let state = state.into();
        self.admit(&state)?;
        self.enter.register(state, callback)
    }

    pub fn on_exit<F>(&mut self, state: impl Into<Key>, callback: F) -> Result<SubscriberId, DispatchError>
    where
        F: Callback<()>,
    {
        let state = state.into();
        self.admit(&state)?;
        self.exit.register(state, callback)
    }

    /// Run `callback` when a tick moves from `from` to `to`.
    ///
    /// Registering a transition onto the same state is a no-op and returns
    /// `Ok(None)`. `from` may be the initial key.
    pub fn on_transition<F>(
        &mut self,
        from: impl Into<Key>,
        to: impl Into<Key>,
        callback: F,
    ) -> Result<Option<SubscriberId>, DispatchError>
    where
        F: Callback<()>,
    {
        let key = TransitionKey::new(from, to);
        if key.is_self_loop() {
            return Ok(None);
        }
        if !key.from.is_initial() {
            self.admit(&key.from)?;
        }
        self.admit(&key.to)?;
        self.transitions.register(key, callback).map(Some)
    }

    pub fn remove_update(&mut self, state: impl Into<Key>, id: SubscriberId) -> bool {
        self.update.unregister(&state.into(), id)
    }

    pub fn remove_enter(&mut self, state: impl Into<Key>, id: SubscriberId) -> bool {
        self.enter.unregister(&state.into(), id)
    }

    pub fn remove_exit(&mut self, state: impl Into<Key>, id: SubscriberId) -> bool {
        self.exit.unregister(&state.into(), id)
    }

    pub fn remove_transition(&mut self, from: impl Into<Key>, to: impl Into<Key>, id: SubscriberId) -> bool {
        self.transitions.unregister(&TransitionKey::new(from, to), id)
    }

    /// Whether any hook was ever registered for `from -> to`.
    pub fn has_transition(&self, from: impl Into<Key>, to: impl Into<Key>) -> bool {
        self.transitions.has_key(&TransitionKey::new(from, to))
    }

    /// Called once per processed transition, before any exit hook.
    pub fn set_on_state_changed<F>(&mut self, hook: F)
    where
        F: FnMut(&Key, &Key) + 'static,
    {
        self.on_changed = Some(Box::new(hook));
    }

    pub fn add_guard(&mut self, guard: Guard) {
        self.core.borrow_mut().guards.push(guard);
    }

    /// See [`StateHandle::change_state`].
    pub fn change_state(&self, target: impl Into<Key>, force: bool) -> Result<bool, DispatchError> {
        self.handle().change_state(target, force)
    }

    pub fn handle(&self) -> StateHandle {
        StateHandle::new(Rc::clone(&self.core))
    }

    pub fn state(&self) -> Key {
        self.core.borrow().state.clone()
    }

    pub fn last_state(&self) -> Key {
        self.core.borrow().last_state.clone()
    }

    pub fn is_state<I, T>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<Key>,
    {
        self.handle().is_state(keys)
    }

    pub fn is_state_changed(&self) -> bool {
        self.handle().is_state_changed()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Bind the owner's update, enter and exit handlers.
    pub fn attach_owner<O: Owner>(&mut self, owner: &Rc<RefCell<O>>) -> Result<usize, DispatchError> {
        self.attach_with(owner, &Bindings::of())
    }

    /// Bind `bindings` for `owner`; nothing is bound if any table rejects them.
    pub fn attach_with<O: 'static>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        bindings: &Bindings<O>,
    ) -> Result<usize, DispatchError> {
        accumulate([
            self.update.check_bindings(bindings),
            self.enter.check_bindings(bindings),
            self.exit.check_bindings(bindings),
        ])?;

        // Transition hooks are registered manually only.
        Ok(self.update.attach_with(owner, bindings)?
            + self.enter.attach_with(owner, bindings)?
            + self.exit.attach_with(owner, bindings)?)
    }

    pub fn detach_owner<O>(&mut self, owner: &Rc<RefCell<O>>) -> usize {
        self.update.detach_owner(owner) + self.enter.detach_owner(owner) + self.exit.detach_owner(owner)
    }

    /// Run one dispatch cycle.
    ///
    /// 1. Update hooks of the current state.
    /// 2. If the state now differs from the last tick's: the state-changed
    ///    hook, exit hooks of the old state, transition hooks of the pair and
    ///    enter hooks of the new state.
    /// 3. The processed state becomes the last state.
    ///
    /// Every phase runs even if an earlier one failed; all failures are
    /// returned together. A change requested by an exit, transition or
    /// enter hook is left pending for the next tick.
    pub fn tick(&mut self) -> Result<(), DispatchError> {
        self.ticks += 1;
        let mut results = Vec::with_capacity(4);

        let current = self.state();
        results.push(self.update.invoke(&current, ()));

        let from = self.last_state();
        let to = self.state();
        if from != to {
            debug!(
                machine = self.core.borrow().label.as_deref().unwrap_or("machine"),
                from = %from,
                to = %to,
                tick = self.ticks,
                "transition"
            );
            if let Some(hook) = self.on_changed.as_mut() {
                hook(&from, &to);
            }
            results.push(self.exit.invoke(&from, ()));
            results.push(
                self.transitions
                    .invoke(&TransitionKey::new(from.clone(), to.clone()), ()),
            );
            results.push(self.enter.invoke(&to, ()));

            self.history.record(StateTransition {
                from,
                to: to.clone(),
                tick: self.ticks,
                timestamp: Utc::now(),
            });
        }

        self.core.borrow_mut().last_state = to;
        accumulate(results)
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.state())
            .field("last_state", &self.last_state())
            .field("states", &self.update.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Moves;

    impl KeySource for Moves {
        fn keys() -> Vec<Key> {
            vec![Key::from("Idle"), Key::from("Run")]
        }
    }

    fn logger(log: &Log, line: &str) -> impl Fn() + 'static {
        let log = Rc::clone(log);
        let line = line.to_string();
        move || log.borrow_mut().push(line.clone())
    }

    fn hooked_machine(log: &Log) -> StateMachine {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);
        for state in ["Idle", "Run"] {
            machine.on_enter(state, logger(log, &format!("enter {state}"))).unwrap();
            machine.on_exit(state, logger(log, &format!("exit {state}"))).unwrap();
        }
        machine
            .on_transition("Idle", "Run", logger(log, "Idle -> Run"))
            .unwrap();
        machine
    }

    #[test]
    fn forced_initial_state_enters_once() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);

        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();

        assert_eq!(*log.borrow(), vec!["enter Idle"]);
        assert!(machine.is_state(["Idle"]));
        assert!(!machine.is_state_changed());

        machine.tick().unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn transition_fires_exit_transition_enter_in_order() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        log.borrow_mut().clear();

        assert_eq!(machine.change_state("Run", false), Ok(true));
        assert!(machine.is_state_changed());
        machine.tick().unwrap();

        assert_eq!(*log.borrow(), vec!["exit Idle", "Idle -> Run", "enter Run"]);
        assert_eq!(machine.state(), Key::from("Run"));
        assert_eq!(machine.last_state(), Key::from("Run"));
    }

    #[test]
    fn round_trip_before_tick_fires_nothing() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        log.borrow_mut().clear();

        machine.change_state("Run", false).unwrap();
        machine.change_state("Idle", false).unwrap();
        machine.tick().unwrap();

        assert!(log.borrow().is_empty());
        assert!(machine.is_state(["Idle"]));
    }

    #[test]
    fn update_fires_every_tick() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        machine.on_update("Idle", logger(&log, "update Idle")).unwrap();
        machine.change_state("Idle", true).unwrap();

        for _ in 0..3 {
            machine.tick().unwrap();
        }

        let updates = log.borrow().iter().filter(|l| *l == "update Idle").count();
        assert_eq!(updates, 3);
        assert_eq!(machine.ticks(), 3);
    }

    #[test]
    fn self_transition_is_not_registered() {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);

        assert_eq!(machine.on_transition("Idle", "Idle", || {}), Ok(None));
        assert!(!machine.has_transition("Idle", "Idle"));
    }

    #[test]
    fn strict_machine_rejects_unknown_states() {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);

        assert_eq!(
            machine.on_enter("Fly", || {}).map(|_| ()),
            Err(DispatchError::UnknownKey { key: "Fly".into() })
        );
        assert!(machine.change_state("Fly", false).is_err());
        assert!(!machine.has_state("Fly"));
    }

    #[test]
    fn lenient_machine_declares_states_on_registration() {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Lenient);

        machine.on_enter("Fly", || {}).unwrap();

        assert!(machine.has_state("Fly"));
        assert_eq!(machine.change_state("Fly", false), Ok(true));
        assert_eq!(machine.change_state("Swim", false), Ok(false));
    }

    #[test]
    fn state_changed_hook_runs_before_exit() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        let sink = Rc::clone(&log);
        machine.set_on_state_changed(move |from, to| {
            sink.borrow_mut().push(format!("changed {from} -> {to}"));
        });
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        log.borrow_mut().clear();

        machine.change_state("Run", false).unwrap();
        machine.tick().unwrap();

        assert_eq!(log.borrow()[0], "changed Idle -> Run");
        assert_eq!(log.borrow()[1], "exit Idle");
    }

    #[test]
    fn guard_blocks_unforced_changes() {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);
        machine.add_guard(Guard::into_state("Run", |from: &Key| from != "Idle"));
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();

        assert_eq!(machine.change_state("Run", false), Ok(false));
        assert!(machine.is_state(["Idle"]));
        assert_eq!(machine.change_state("Run", true), Ok(true));
    }

    #[test]
    fn guard_reading_the_machine_sees_the_pending_state() {
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);
        let handle = machine.handle();
        machine.add_guard(Guard::new(move |_: &Key, _: &Key| handle.last_state() == handle.state()));
        machine.change_state("Idle", true).unwrap();

        assert_eq!(machine.change_state("Run", false), Ok(false));
        machine.tick().unwrap();
        assert_eq!(machine.change_state("Run", false), Ok(true));
        assert!(machine.is_state(["Run"]));
    }

    #[test]
    fn change_requested_by_enter_hook_waits_for_next_tick() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        let handle = machine.handle();
        machine
            .on_enter("Idle", move || {
                handle.change_state("Run", false).unwrap();
            })
            .unwrap();

        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        assert!(machine.is_state(["Run"]));
        assert!(machine.is_state_changed());
        assert_eq!(machine.last_state(), Key::from("Idle"));

        machine.tick().unwrap();
        assert!(log.borrow().contains(&"enter Run".to_string()));
        assert!(!machine.is_state_changed());
    }

    #[test]
    fn history_records_processed_transitions() {
        let log = Log::default();
        let mut machine = hooked_machine(&log);
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        machine.change_state("Run", false).unwrap();
        machine.tick().unwrap();
        machine.tick().unwrap();

        let path: Vec<String> = machine.history().path().iter().map(|k| k.to_string()).collect();
        assert_eq!(path, vec!["<initial>", "Idle", "Run"]);
        assert_eq!(machine.history().last().map(|t| t.tick), Some(2));
    }

    #[derive(Default)]
    struct Runner {
        log: Vec<&'static str>,
    }

    impl Runner {
        fn update_idle(&mut self) {
            self.log.push("update Idle");
        }

        fn enter_run(&mut self) {
            self.log.push("enter Run");
        }

        fn exit_idle(&mut self) {
            self.log.push("exit Idle");
        }

        fn enter_fly(&mut self) {}
    }

    impl Owner for Runner {
        fn bindings(bindings: &mut Bindings<Self>) {
            bindings
                .update("Idle", Runner::update_idle)
                .exit("Idle", Runner::exit_idle)
                .enter("Run", Runner::enter_run);
        }
    }

    #[test]
    fn attached_owner_receives_hooks() {
        let runner = Rc::new(RefCell::new(Runner::default()));
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);

        assert_eq!(machine.attach_owner(&runner), Ok(3));
        assert_eq!(machine.attach_owner(&runner), Ok(0));
        machine.change_state("Idle", true).unwrap();
        machine.tick().unwrap();
        machine.change_state("Run", false).unwrap();
        machine.tick().unwrap();

        // the second tick updates the requested state, Run, which has no update hook
        assert_eq!(runner.borrow().log, vec!["update Idle", "exit Idle", "enter Run"]);
        assert!(!machine.has_transition("Idle", "Run"));
        assert_eq!(machine.detach_owner(&runner), 3);
    }

    #[test]
    fn released_owner_is_reported_by_tick() {
        let runner = Rc::new(RefCell::new(Runner::default()));
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);
        machine.attach_owner(&runner).unwrap();
        machine.change_state("Idle", true).unwrap();
        drop(runner);

        let result = machine.tick();

        assert_eq!(
            result,
            Err(DispatchError::UseAfterRelease { key: "Idle".into() })
        );
        assert!(machine.is_state(["Idle"]));
        assert!(!machine.is_state_changed());
    }

    #[test]
    fn rejected_owner_is_not_bound_anywhere() {
        let runner = Rc::new(RefCell::new(Runner::default()));
        let mut bindings = Bindings::<Runner>::of();
        bindings.enter("Fly", Runner::enter_fly);
        let mut machine = StateMachine::from_source::<Moves>(KeyPolicy::Strict);

        assert!(machine.attach_with(&runner, &bindings).is_err());
        assert_eq!(machine.detach_owner(&runner), 0);
    }
}
