//! Keys naming callback slots, states and events.
//!
//! Every table in the crate is keyed by a value-comparable identifier.
//! Plain names (events, states) use [`Key`]; transition tables use the
//! ordered pair [`TransitionKey`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Symbolic name of a state or event.
///
/// Enumerants and marker constants normalize to their text, so
/// `Key::from(BattleState::Idle)` and `Key::from("Idle")` are equal.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Key;
///
/// let idle = Key::from("Idle");
/// assert_eq!(idle, Key::new("Idle".to_string()));
/// assert_eq!(idle.as_str(), "Idle");
/// assert!(Key::initial().is_initial());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(name: String) -> Self {
        Key(name)
    }

    /// The distinguished key a state machine starts in.
    ///
    /// It is the empty name, which matches no registered state.
    pub fn initial() -> Self {
        Key(String::new())
    }

    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key(name.clone())
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            f.write_str("<initial>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.0)
    }
}

/// Ordered `(from, to)` pair naming a transition slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    pub from: Key,
    pub to: Key,
}

impl TransitionKey {
    pub fn new(from: impl Into<Key>, to: impl Into<Key>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// A transition onto the same state never gets a slot.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

impl Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Bound shared by every type usable as a table key.
pub trait TableKey: Clone + Eq + Hash + Debug + Display + 'static {
    /// The plain name used to look up owner bindings, if this key kind has one.
    fn binding_name(&self) -> Option<&Key> {
        None
    }
}

impl TableKey for Key {
    fn binding_name(&self) -> Option<&Key> {
        Some(self)
    }
}

impl TableKey for TransitionKey {}
