//! Guard predicates consulted before a requested state change.

use super::key::Key;
use std::fmt;
use std::rc::Rc;

/// Predicate over a requested `(from, to)` state change.
///
/// Guards may read the machine's state through a
/// [`StateHandle`](crate::machine::StateHandle) but must not request state
/// changes themselves. Forced changes bypass every guard.
///
/// # Example
///
/// ```rust
/// use switchyard::core::{Guard, Key};
///
/// // Nothing leaves the ending state.
/// let no_escape = Guard::new(|from: &Key, _to: &Key| from != "Ending");
///
/// assert!(no_escape.check(&Key::from("Idle"), &Key::from("Run")));
/// assert!(!no_escape.check(&Key::from("Ending"), &Key::from("Idle")));
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Rc<dyn Fn(&Key, &Key) -> bool>,
}

impl Guard {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Key, &Key) -> bool + 'static,
    {
        Guard {
            predicate: Rc::new(predicate),
        }
    }

    /// Guard that only applies when the change targets `to`.
    pub fn into_state<F>(to: impl Into<Key>, predicate: F) -> Self
    where
        F: Fn(&Key) -> bool + 'static,
    {
        let to = to.into();
        Guard::new(move |from, target| target != &to || predicate(from))
    }

    pub fn check(&self, from: &Key, to: &Key) -> bool {
        (self.predicate)(from, to)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
