//! Callback dispatch: keyed slots of arity-typed subscribers.
//!
//! A [`CallbackTable`] maps keys to [`CallbackSlot`]s. Each slot holds
//! subscribers taking 0 to [`MAX_ARITY`] arguments and a fired flag set on
//! every invocation. Owners attach declared methods through [`Owner`]
//! bindings and are only weakly referenced by the table.

mod args;
mod error;
mod owner;
mod slot;
mod table;

pub use args::{ArgList, Args, Callback, OwnerMethod, Signature, MAX_ARITY};
pub use error::DispatchError;
pub use owner::{Bindings, Owner, OwnerId, Role};
pub use slot::{CallbackSlot, SubscriberId};
pub use table::{CallbackTable, KeyPolicy};

pub(crate) use error::accumulate;
