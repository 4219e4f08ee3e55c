//! Keys, key sources and the state-level value types.
//!
//! - [`Key`] / [`TransitionKey`]: value-compared slot identifiers
//! - [`KeySource`] / [`SourceRegistry`]: finite key sets used to seed tables
//! - [`Guard`]: predicates vetoing requested state changes
//! - [`StateHistory`]: bounded record of completed transitions

mod guard;
mod history;
mod key;
mod source;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_LIMIT};
pub use key::{Key, TableKey, TransitionKey};
pub use source::{KeySource, SourceRegistry};
