//! Named-event multiplexer.

use crate::callback::{
    ArgList, Args, Bindings, Callback, CallbackTable, DispatchError, KeyPolicy, Owner, Role,
    SubscriberId,
};
use crate::core::{Key, KeySource};
use std::cell::RefCell;
use std::rc::Rc;

/// Event bus over a single callback table.
///
/// Event names are [`Key`]s, so `&str`, `String` and any key declared with
/// [`key_enum!`](crate::key_enum) or [`key_marker!`](crate::key_marker)
/// can be used interchangeably. Owners attach their `on` handlers.
///
/// # Example
///
/// ```rust
/// use switchyard::bus::EventBus;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let total = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&total);
///
/// let mut bus = EventBus::default();
/// bus.register("Score", move |points: i32| sink.set(sink.get() + points)).unwrap();
///
/// bus.emit("Score", (10,)).unwrap();
/// assert_eq!(total.get(), 10);
/// assert!(bus.has_fired("Score"));
/// assert!(!bus.has_fired("Score"));
/// ```
pub struct EventBus {
    table: CallbackTable<Key>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(KeyPolicy::default())
    }
}

impl EventBus {
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            table: CallbackTable::new(policy).with_role(Role::On),
        }
    }

    /// A bus whose events are exactly the keys of `S` (under a strict policy).
    pub fn from_source<S: KeySource>(policy: KeyPolicy) -> Self {
        let mut bus = Self::new(policy);
        bus.add_events(S::keys());
        bus
    }

    pub(crate) fn add_events<I: IntoIterator<Item = Key>>(&mut self, events: I) {
        self.table.seed(events);
    }

    pub fn policy(&self) -> KeyPolicy {
        self.table.policy()
    }

    pub fn register<A, F>(&mut self, event: impl Into<Key>, handler: F) -> Result<SubscriberId, DispatchError>
    where
        A: Args,
        F: Callback<A>,
    {
        self.table.register(event.into(), handler)
    }

    pub fn unregister(&mut self, event: impl Into<Key>, id: SubscriberId) -> bool {
        self.table.unregister(&event.into(), id)
    }

    /// Deliver `args` to every handler of `event` taking that argument tuple.
    pub fn emit<A: Args>(&mut self, event: impl Into<Key>, args: A) -> Result<(), DispatchError> {
        self.table.invoke(&event.into(), args)
    }

    pub fn emit_list(&mut self, event: impl Into<Key>, args: &ArgList) -> Result<(), DispatchError> {
        self.table.invoke_list(&event.into(), args)
    }

    /// Whether `event` was emitted since the last check; clears the flag.
    pub fn has_fired(&mut self, event: impl Into<Key>) -> bool {
        self.table.consume_fired(&event.into())
    }

    pub fn has_event(&self, event: impl Into<Key>) -> bool {
        self.table.has_key(&event.into())
    }

    /// Known event names, in creation order.
    pub fn events(&self) -> impl Iterator<Item = &Key> {
        self.table.keys()
    }

    /// Clear every fired flag.
    pub fn reset(&mut self) {
        self.table.reset_fired();
    }

    pub fn attach_owner<O: Owner>(&mut self, owner: &Rc<RefCell<O>>) -> Result<usize, DispatchError> {
        self.table.attach_owner(owner)
    }

    pub fn attach_with<O: 'static>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        bindings: &Bindings<O>,
    ) -> Result<usize, DispatchError> {
        self.table.attach_with(owner, bindings)
    }

    pub fn detach_owner<O>(&mut self, owner: &Rc<RefCell<O>>) -> usize {
        self.table.detach_owner(owner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("policy", &self.table.policy())
            .field("events", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Signals;

    impl KeySource for Signals {
        fn keys() -> Vec<Key> {
            vec![Key::from("Score"), Key::from("Reset")]
        }
    }

    #[test]
    fn emit_reaches_handler_and_sets_flag_once() {
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let mut bus = EventBus::default();
        bus.register("Score", move |n: i32| sink.set(n)).unwrap();

        bus.emit("Score", (10,)).unwrap();

        assert_eq!(seen.get(), 10);
        assert!(bus.has_fired("Score"));
        assert!(!bus.has_fired("Score"));
    }

    #[test]
    fn emit_of_unknown_event_is_silent() {
        let mut bus = EventBus::from_source::<Signals>(KeyPolicy::Strict);

        assert_eq!(bus.emit("Nothing", ()), Ok(()));
        assert!(!bus.has_fired("Nothing"));
        assert!(!bus.has_event("Nothing"));
    }

    #[test]
    fn handlers_of_other_arities_are_skipped() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        let sink = Rc::clone(&calls);
        bus.register("Score", move || sink.borrow_mut().push("none".to_string()))
            .unwrap();
        let sink = Rc::clone(&calls);
        bus.register("Score", move |n: i32, why: String| {
            sink.borrow_mut().push(format!("{n} {why}"))
        })
        .unwrap();

        bus.emit("Score", (5, "combo".to_string())).unwrap();
        bus.emit("Score", ()).unwrap();

        assert_eq!(*calls.borrow(), vec!["5 combo", "none"]);
    }

    #[test]
    fn mismatched_arguments_are_an_error() {
        let mut bus = EventBus::default();
        bus.register("Score", |_: i32| {}).unwrap();

        let result = bus.emit("Score", ("ten",));

        assert!(matches!(
            result,
            Err(DispatchError::SignatureMismatch { ref key, .. }) if key == "Score"
        ));
    }

    #[test]
    fn emit_list_dispatches_dynamic_arguments() {
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let mut bus = EventBus::default();
        bus.register("Score", move |a: i32, b: i32| sink.set(a + b)).unwrap();

        bus.emit_list("Score", &ArgList::new().arg(2).arg(3)).unwrap();

        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn emit_list_rejects_five_arguments() {
        let mut bus = EventBus::default();
        let args = ArgList::new().arg(1).arg(2).arg(3).arg(4).arg(5);

        assert_eq!(
            bus.emit_list("Score", &args),
            Ok(()),
            "absent events are a silent miss even for long lists"
        );

        bus.register("Score", |_: i32| {}).unwrap();
        assert!(matches!(
            bus.emit_list("Score", &args),
            Err(DispatchError::UnsupportedArity { arity: 5, .. })
        ));
        assert!(!bus.has_fired("Score"));
    }

    #[test]
    fn reset_clears_pending_flags() {
        let mut bus = EventBus::from_source::<Signals>(KeyPolicy::Strict);
        bus.emit("Score", ()).unwrap();
        bus.emit("Reset", ()).unwrap();

        bus.reset();

        assert!(!bus.has_fired("Score"));
        assert!(!bus.has_fired("Reset"));
    }

    #[test]
    fn strict_bus_rejects_unknown_events() {
        let mut bus = EventBus::from_source::<Signals>(KeyPolicy::Strict);

        assert!(bus.register("Jump", || {}).is_err());
        assert_eq!(bus.events().count(), 2);
    }

    #[derive(Default)]
    struct Scoreboard {
        total: i32,
    }

    impl Scoreboard {
        fn on_score(&mut self, points: i32) {
            self.total += points;
        }

        fn on_reset(&mut self) {
            self.total = 0;
        }
    }

    impl Owner for Scoreboard {
        fn bindings(bindings: &mut Bindings<Self>) {
            bindings
                .on("Score", Scoreboard::on_score)
                .on("Reset", Scoreboard::on_reset);
        }
    }

    #[test]
    fn owner_attached_twice_is_called_once() {
        let board = Rc::new(RefCell::new(Scoreboard::default()));
        let mut bus = EventBus::from_source::<Signals>(KeyPolicy::Strict);

        bus.attach_owner(&board).unwrap();
        bus.attach_owner(&board).unwrap();
        bus.emit("Score", (7,)).unwrap();

        assert_eq!(board.borrow().total, 7);
    }

    #[test]
    fn detach_stops_owner_handlers() {
        let board = Rc::new(RefCell::new(Scoreboard::default()));
        let mut bus = EventBus::from_source::<Signals>(KeyPolicy::Strict);
        bus.attach_owner(&board).unwrap();

        assert_eq!(bus.detach_owner(&board), 2);
        assert_eq!(bus.detach_owner(&board), 0);
        bus.emit("Score", (7,)).unwrap();

        assert_eq!(board.borrow().total, 0);
    }
}
