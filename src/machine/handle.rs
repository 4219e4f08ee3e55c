//! Shared view of a machine's current and previous state.

use crate::callback::{DispatchError, KeyPolicy};
use crate::core::{Guard, Key};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, warn};

#[derive(Debug)]
pub(crate) struct StateCore {
    pub(crate) state: Key,
    pub(crate) last_state: Key,
    pub(crate) known: HashSet<Key>,
    pub(crate) policy: KeyPolicy,
    pub(crate) guards: Vec<Guard>,
    pub(crate) label: Option<String>,
}

impl StateCore {
    pub(crate) fn new(policy: KeyPolicy, label: Option<String>) -> Self {
        Self {
            state: Key::initial(),
            last_state: Key::initial(),
            known: HashSet::new(),
            policy,
            guards: Vec::new(),
            label,
        }
    }
}

/// Cloneable handle onto a [`StateMachine`](super::StateMachine)'s state.
///
/// Handles are how hooks and owners request state changes: they can be
/// captured by closures or stored in an owner and used while the machine
/// is in the middle of a tick. Every handle of a machine sees the same
/// state.
///
/// # Example
///
/// ```rust
/// use switchyard::machine::StateMachine;
///
/// let mut machine = StateMachine::default();
/// machine.add_state("Idle");
/// machine.add_state("Run");
///
/// let handle = machine.handle();
/// machine.on_update("Idle", move || {
///     handle.change_state("Run", false).unwrap();
/// }).unwrap();
///
/// machine.change_state("Idle", true).unwrap();
/// machine.tick().unwrap();
///
/// // the update hook of Idle ran first and requested Run
/// assert!(machine.is_state(["Run"]));
/// assert!(!machine.is_state_changed());
/// ```
#[derive(Clone)]
pub struct StateHandle {
    core: Rc<RefCell<StateCore>>,
}

impl StateHandle {
    pub(crate) fn new(core: Rc<RefCell<StateCore>>) -> Self {
        Self { core }
    }

    /// Request `target` as the next state.
    ///
    /// Nothing fires until the next tick, and a later request before that
    /// tick replaces this one. Unless `force` is set the target must be a
    /// known state, differ from the current one and pass every guard.
    ///
    /// Returns whether the requested state changed. An unknown target is
    /// [`DispatchError::UnknownKey`] under [`KeyPolicy::Strict`] and a
    /// silent `Ok(false)` under [`KeyPolicy::Lenient`].
    pub fn change_state(&self, target: impl Into<Key>, force: bool) -> Result<bool, DispatchError> {
        let target = target.into();
        let (from, label, guards) = {
            let core = self.core.borrow();
            if core.state == target {
                return Ok(false);
            }
            if !force && !core.known.contains(&target) {
                return match core.policy {
                    KeyPolicy::Strict => Err(DispatchError::UnknownKey {
                        key: target.to_string(),
                    }),
                    KeyPolicy::Lenient => Ok(false),
                };
            }
            let guards = if force { Vec::new() } else { core.guards.clone() };
            (core.state.clone(), core.label.clone(), guards)
        };
        let label = label.as_deref().unwrap_or("machine");

        // Guards may read the state through other handles.
        if let Some(index) = guards.iter().position(|g| !g.check(&from, &target)) {
            warn!(machine = label, from = %from, to = %target, guard = index, "state change blocked");
            return Ok(false);
        }

        debug!(machine = label, from = %from, to = %target, force, "state requested");
        self.core.borrow_mut().state = target;
        Ok(true)
    }

    /// The requested current state.
    pub fn state(&self) -> Key {
        self.core.borrow().state.clone()
    }

    /// The state the last tick finished in.
    pub fn last_state(&self) -> Key {
        self.core.borrow().last_state.clone()
    }

    /// Whether the current state is any of `keys`.
    pub fn is_state<I, T>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<Key>,
    {
        let core = self.core.borrow();
        keys.into_iter().map(Into::<Key>::into).any(|k| k == core.state)
    }

    /// Whether a change is pending, i.e. not yet processed by a tick.
    pub fn is_state_changed(&self) -> bool {
        let core = self.core.borrow();
        core.state != core.last_state
    }

    pub fn has_state(&self, key: impl Into<Key>) -> bool {
        self.core.borrow().known.contains(&key.into())
    }
}

impl std::fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("StateHandle")
            .field("state", &core.state)
            .field("last_state", &core.last_state)
            .finish()
    }
}
