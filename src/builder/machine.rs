//! Builder for constructing state machines.

use super::config::{resolve, DispatchConfig};
use super::error::BuildError;
use crate::callback::{DispatchError, KeyPolicy, Owner};
use crate::core::{Guard, Key, KeySource, SourceRegistry, DEFAULT_HISTORY_LIMIT};
use crate::machine::StateMachine;
use std::cell::RefCell;
use std::rc::Rc;

type Attach = Box<dyn FnOnce(&mut StateMachine) -> Result<usize, DispatchError>>;

/// Builder for [`StateMachine`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::StateMachineBuilder;
/// use switchyard::key_enum;
///
/// key_enum! {
///     enum Door {
///         Closed,
///         Open,
///     }
/// }
///
/// let mut machine = StateMachineBuilder::new()
///     .states::<Door>()
///     .initial(Door::Closed)
///     .label("door")
///     .build()
///     .unwrap();
///
/// machine.tick().unwrap();
/// assert!(machine.is_state([Door::Closed]));
/// ```
pub struct StateMachineBuilder {
    policy: KeyPolicy,
    label: Option<String>,
    history_limit: usize,
    seed: Vec<Key>,
    extra: Vec<Key>,
    initial: Option<Key>,
    guards: Vec<Guard>,
    owners: Vec<Attach>,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self {
            policy: KeyPolicy::default(),
            label: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            seed: Vec::new(),
            extra: Vec::new(),
            initial: None,
            guards: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Start from a configuration, resolving its state source in `registry`.
    pub fn from_config(config: &DispatchConfig, registry: &SourceRegistry) -> Result<Self, BuildError> {
        let mut builder = Self::new()
            .policy(config.policy)
            .history_limit(config.history_limit);
        builder.label = config.label.clone();
        builder.initial = config.initial.as_deref().map(Key::from);
        if let Some(keys) = resolve(registry, config.states.as_deref())? {
            builder.seed.extend(keys);
        }
        Ok(builder)
    }

    pub fn policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Declare the keys of `S` as the machine's closed state set.
    pub fn states<S: KeySource>(mut self) -> Self {
        self.seed.extend(S::keys());
        self
    }

    /// Declare one more state without closing the set.
    pub fn state(mut self, state: impl Into<Key>) -> Self {
        self.extra.push(state.into());
        self
    }

    /// State requested at build time, entered on the first tick.
    pub fn initial(mut self, state: impl Into<Key>) -> Self {
        self.initial = Some(state.into());
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Attach `owner` once the machine is built.
    pub fn owner<O: Owner>(mut self, owner: &Rc<RefCell<O>>) -> Self {
        let owner = Rc::clone(owner);
        self.owners
            .push(Box::new(move |machine: &mut StateMachine| machine.attach_owner(&owner)));
        self
    }

    /// Build the state machine.
    /// Returns an error if the initial state is unknown to a strict machine
    /// or an owner declares handlers for unknown states.
    pub fn build(self) -> Result<StateMachine, BuildError> {
        let mut machine = StateMachine::with_options(self.policy, self.label, self.history_limit);
        if !self.seed.is_empty() {
            machine.seed_states(self.seed);
        }
        for state in self.extra {
            machine.add_state(state);
        }

        if let Some(initial) = self.initial {
            if !machine.has_state(&initial) && self.policy == KeyPolicy::Strict {
                return Err(BuildError::UnknownInitialState(initial.to_string()));
            }
            machine.change_state(initial, true)?;
        }
        for guard in self.guards {
            machine.add_guard(guard);
        }
        for attach in self.owners {
            attach(&mut machine)?;
        }

        Ok(machine)
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Bindings;

    struct Phases;

    impl KeySource for Phases {
        fn keys() -> Vec<Key> {
            vec![Key::from("Start"), Key::from("Done")]
        }
    }

    #[test]
    fn builder_seeds_states() {
        let machine = StateMachineBuilder::new().states::<Phases>().build().unwrap();

        assert!(machine.has_state("Start"));
        assert!(machine.has_state("Done"));
        assert!(machine.state().is_initial());
    }

    #[test]
    fn builder_rejects_unknown_initial_state() {
        let result = StateMachineBuilder::new()
            .states::<Phases>()
            .initial("Middle")
            .build();

        assert!(matches!(result, Err(BuildError::UnknownInitialState(name)) if name == "Middle"));
    }

    #[test]
    fn lenient_builder_forces_unknown_initial_state() {
        let machine = StateMachineBuilder::new()
            .policy(KeyPolicy::Lenient)
            .states::<Phases>()
            .initial("Middle")
            .build()
            .unwrap();

        assert!(machine.is_state(["Middle"]));
    }

    #[test]
    fn extra_states_keep_the_set_open() {
        let mut machine = StateMachineBuilder::new().state("Start").build().unwrap();

        assert!(machine.on_enter("Later", || {}).is_ok());
        assert!(machine.has_state("Later"));
    }

    #[test]
    fn builder_uses_config() {
        let mut registry = SourceRegistry::new();
        registry.register::<Phases>("phases");
        let config = DispatchConfig {
            states: Some("phases".into()),
            initial: Some("Start".into()),
            label: Some("job".into()),
            history_limit: 1,
            ..DispatchConfig::default()
        };

        let mut machine = StateMachineBuilder::from_config(&config, &registry)
            .unwrap()
            .build()
            .unwrap();
        machine.tick().unwrap();
        machine.change_state("Done", false).unwrap();
        machine.tick().unwrap();

        assert_eq!(machine.label().as_deref(), Some("job"));
        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.history().last().map(|t| t.to.clone()), Some(Key::from("Done")));
    }

    #[test]
    fn config_with_unregistered_source_fails() {
        let config = DispatchConfig {
            states: Some("missing".into()),
            ..DispatchConfig::default()
        };

        let result = StateMachineBuilder::from_config(&config, &SourceRegistry::new());

        assert!(matches!(result, Err(BuildError::UnknownKeySource(_))));
    }

    struct Worker {
        started: bool,
    }

    impl Worker {
        fn enter_start(&mut self) {
            self.started = true;
        }
    }

    impl Owner for Worker {
        fn bindings(bindings: &mut Bindings<Self>) {
            bindings.enter("Start", Worker::enter_start);
        }
    }

    struct Stray;

    impl Owner for Stray {
        fn bindings(bindings: &mut Bindings<Self>) {
            bindings.enter("Middle", |_: &mut Stray| {});
        }
    }

    #[test]
    fn builder_attaches_owners() {
        let worker = Rc::new(RefCell::new(Worker { started: false }));
        let mut machine = StateMachineBuilder::new()
            .states::<Phases>()
            .initial("Start")
            .owner(&worker)
            .build()
            .unwrap();

        machine.tick().unwrap();

        assert!(worker.borrow().started);
    }

    #[test]
    fn builder_reports_owner_with_unknown_states() {
        let stray = Rc::new(RefCell::new(Stray));

        let result = StateMachineBuilder::new()
            .states::<Phases>()
            .owner(&stray)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Dispatch(DispatchError::UnknownKey { key })) if key == "Middle"
        ));
    }
}
