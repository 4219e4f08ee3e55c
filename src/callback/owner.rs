//! Owner bindings: the explicit replacement for name-convention method scanning.
//!
//! An owner declares, once per type, which of its methods handle which
//! keys and in which [`Role`]. Tables look these declarations up when the
//! owner is attached and keep only a weak reference to the owner itself.

use super::args::{
    call_from, erase_method, Args, CallError, ErasedCall, ErasedMethod, OwnerMethod, Signature,
};
use crate::core::Key;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// The hook family a table dispatches.
///
/// Mirrors the four handler prefixes an owner can declare: event handlers,
/// per-tick state updates, state entry and state exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    On,
    Update,
    Enter,
    Exit,
}

impl Role {
    pub fn prefix(self) -> &'static str {
        match self {
            Role::On => "on",
            Role::Update => "update",
            Role::Enter => "enter",
            Role::Exit => "exit",
        }
    }

    /// Conventional handler name for `key` in this role, e.g. `enter_Idle`.
    pub fn method_name(self, key: &Key) -> String {
        format!("{}_{}", self.prefix(), key.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A type whose methods can be attached to tables by declaration.
///
/// # Example
///
/// ```rust
/// use switchyard::callback::{Bindings, Owner, Role};
///
/// struct Hud {
///     score: i32,
/// }
///
/// impl Hud {
///     fn on_score(&mut self, points: i32) {
///         self.score += points;
///     }
///
///     fn enter_paused(&mut self) {}
/// }
///
/// impl Owner for Hud {
///     fn bindings(bindings: &mut Bindings<Self>) {
///         bindings
///             .on("Score", Hud::on_score)
///             .enter("Paused", Hud::enter_paused);
///     }
/// }
///
/// let bindings = Bindings::<Hud>::of();
/// assert_eq!(bindings.len(), 2);
/// assert!(bindings.contains(Role::Enter, &"Paused".into()));
/// ```
pub trait Owner: Sized + 'static {
    fn bindings(bindings: &mut Bindings<Self>);
}

pub(crate) struct Binding<O> {
    pub(crate) role: Role,
    pub(crate) key: Key,
    pub(crate) signature: Signature,
    pub(crate) method: ErasedMethod<O>,
}

/// Declared handlers of one owner type.
pub struct Bindings<O> {
    entries: Vec<Binding<O>>,
}

impl<O: 'static> Default for Bindings<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: 'static> Bindings<O> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Collect the declarations of an [`Owner`] type.
    pub fn of() -> Self
    where
        O: Owner,
    {
        let mut bindings = Self::new();
        O::bindings(&mut bindings);
        bindings
    }

    /// Handle event `key` with a method taking 0 to 4 arguments.
    pub fn on<A, M>(&mut self, key: impl Into<Key>, method: M) -> &mut Self
    where
        A: Args,
        M: OwnerMethod<O, A>,
    {
        self.insert(Role::On, key.into(), Signature::of::<A>(), erase_method(method))
    }

    /// Run `method` on every tick spent in `state`.
    pub fn update<M>(&mut self, state: impl Into<Key>, method: M) -> &mut Self
    where
        M: OwnerMethod<O, ()>,
    {
        self.insert(Role::Update, state.into(), Signature::of::<()>(), erase_method(method))
    }

    pub fn enter<M>(&mut self, state: impl Into<Key>, method: M) -> &mut Self
    where
        M: OwnerMethod<O, ()>,
    {
        self.insert(Role::Enter, state.into(), Signature::of::<()>(), erase_method(method))
    }

    pub fn exit<M>(&mut self, state: impl Into<Key>, method: M) -> &mut Self
    where
        M: OwnerMethod<O, ()>,
    {
        self.insert(Role::Exit, state.into(), Signature::of::<()>(), erase_method(method))
    }

    // One handler per (role, key): a redeclaration replaces the earlier one.
    fn insert(
        &mut self,
        role: Role,
        key: Key,
        signature: Signature,
        method: ErasedMethod<O>,
    ) -> &mut Self {
        let binding = Binding {
            role,
            key,
            signature,
            method,
        };
        match self
            .entries
            .iter_mut()
            .find(|b| b.role == binding.role && b.key == binding.key)
        {
            Some(existing) => *existing = binding,
            None => self.entries.push(binding),
        }
        self
    }

    /// Keys declared for `role`, in declaration order.
    pub fn members(&self, role: Role) -> impl Iterator<Item = &Key> {
        self.entries
            .iter()
            .filter(move |b| b.role == role)
            .map(|b| &b.key)
    }

    pub fn contains(&self, role: Role, key: &Key) -> bool {
        self.find(role, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn find(&self, role: Role, key: &Key) -> Option<&Binding<O>> {
        self.entries.iter().find(|b| b.role == role && &b.key == key)
    }
}

impl<O> fmt::Debug for Bindings<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|b| b.role.method_name(&b.key)))
            .finish()
    }
}

/// Identity of an attached owner (its allocation address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(usize);

impl OwnerId {
    pub fn of<O>(owner: &Rc<RefCell<O>>) -> Self {
        OwnerId(Rc::as_ptr(owner) as *const () as usize)
    }
}

/// Weak, identity-only reference to an owner.
#[derive(Clone)]
pub(crate) struct OwnerRef {
    id: OwnerId,
    alive: Weak<dyn Any>,
}

impl OwnerRef {
    pub(crate) fn new<O: 'static>(owner: &Rc<RefCell<O>>) -> Self {
        let weak: Weak<RefCell<O>> = Rc::downgrade(owner);
        Self {
            id: OwnerId::of(owner),
            alive: weak,
        }
    }

    pub(crate) fn id(&self) -> OwnerId {
        self.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Wrap a bound method so that it upgrades the owner on every call.
pub(crate) fn bind_call<O: 'static>(owner: &Rc<RefCell<O>>, method: ErasedMethod<O>) -> ErasedCall {
    let weak = Rc::downgrade(owner);
    call_from(move |payload| {
        let owner = weak.upgrade().ok_or(CallError::Released)?;
        let mut guard = owner.try_borrow_mut().map_err(|_| CallError::Busy)?;
        (*method)(&mut *guard, payload)
    })
}
