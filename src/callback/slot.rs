//! A single named slot: subscribers bucketed by arity plus a fired flag.

use super::args::{
    erase_callback, ArgList, Args, CallError, Callback, ErasedCall, Payload, Signature, MAX_ARITY,
};
use super::error::{accumulate, DispatchError};
use super::owner::{bind_call, Bindings, OwnerId, OwnerRef, Role};
use crate::core::TableKey;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SubscriberId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct Subscriber {
    id: SubscriberId,
    owner: Option<OwnerRef>,
    signature: Signature,
    call: ErasedCall,
}

/// Subscribers of one key.
///
/// Subscribers are kept in one bucket per arity and run in registration
/// order. Explicit subscriptions and owner bindings share the buckets, so
/// their relative order is their registration order too.
///
/// # Example
///
/// ```rust
/// use switchyard::callback::CallbackSlot;
/// use switchyard::core::Key;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let total = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&total);
///
/// let mut slot = CallbackSlot::new(Key::from("Score"));
/// slot.subscribe(move |points: i32| sink.set(sink.get() + points));
///
/// slot.invoke((10,)).unwrap();
/// assert_eq!(total.get(), 10);
/// assert!(slot.consume_fired());
/// assert!(!slot.consume_fired());
/// ```
pub struct CallbackSlot<K: TableKey> {
    key: K,
    buckets: [Vec<Subscriber>; MAX_ARITY + 1],
    fired: bool,
}

impl<K: TableKey> CallbackSlot<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            buckets: Default::default(),
            fired: false,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Subscribe a closure taking 0 to 4 arguments.
    pub fn subscribe<A, F>(&mut self, callback: F) -> SubscriberId
    where
        A: Args,
        F: Callback<A>,
    {
        self.push(Signature::of::<A>(), erase_callback(callback), None)
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.len();
        for bucket in &mut self.buckets {
            bucket.retain(|s| s.id != id);
        }
        self.len() != before
    }

    /// Bind the owner's handler for this key in `role`, if it declares one.
    ///
    /// Binding an owner that is already bound is a no-op. Returns whether a
    /// new subscriber was added.
    pub fn bind_owner<O: 'static>(
        &mut self,
        owner: &Rc<RefCell<O>>,
        bindings: &Bindings<O>,
        role: Role,
    ) -> bool {
        let Some(name) = self.key.binding_name() else {
            return false;
        };
        let Some(binding) = bindings.find(role, name) else {
            return false;
        };

        let id = OwnerId::of(owner);
        // A dead reference with the same address belongs to a previous owner.
        for bucket in &mut self.buckets {
            bucket.retain(|s| match &s.owner {
                Some(r) => r.id() != id || r.is_alive(),
                None => true,
            });
        }
        if self.is_bound(id) {
            return false;
        }

        let call = bind_call(owner, binding.method.clone());
        self.push(binding.signature.clone(), call, Some(OwnerRef::new(owner)));
        true
    }

    /// Remove every subscriber bound for `owner`. Returns how many were removed.
    pub fn unbind_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.len();
        for bucket in &mut self.buckets {
            bucket.retain(|s| s.owner.as_ref().map_or(true, |r| r.id() != owner));
        }
        before - self.len()
    }

    pub fn is_bound(&self, owner: OwnerId) -> bool {
        self.subscribers()
            .any(|s| s.owner.as_ref().is_some_and(|r| r.id() == owner))
    }

    /// Call every subscriber accepting `A`, then mark the slot as fired.
    pub fn invoke<A: Args>(&mut self, args: A) -> Result<(), DispatchError> {
        self.dispatch(&A::signature(), Payload::Typed(&args))
    }

    /// Like [`invoke`](Self::invoke) with a dynamically typed argument list.
    pub fn invoke_list(&mut self, args: &ArgList) -> Result<(), DispatchError> {
        if args.len() > MAX_ARITY {
            return Err(DispatchError::UnsupportedArity {
                key: self.key.to_string(),
                arity: args.len(),
                max: MAX_ARITY,
            });
        }
        self.dispatch(&args.signature(), Payload::List(args))
    }

    fn dispatch(
        &mut self,
        signature: &Signature,
        payload: Payload<'_>,
    ) -> Result<(), DispatchError> {
        let matching: Vec<ErasedCall> = self.buckets[signature.arity()]
            .iter()
            .filter(|s| &s.signature == signature)
            .map(|s| Rc::clone(&s.call))
            .collect();

        trace!(key = %self.key, subscribers = matching.len(), "invoke");

        let outcome = if matching.is_empty() && !self.is_empty() {
            Err(DispatchError::SignatureMismatch {
                key: self.key.to_string(),
                found: signature.to_string(),
            })
        } else {
            accumulate(
                matching
                    .iter()
                    .map(|call| (**call)(payload).map_err(|e| self.call_error(e, signature))),
            )
        };

        self.fired = true;
        outcome
    }

    fn call_error(&self, error: CallError, signature: &Signature) -> DispatchError {
        let key = self.key.to_string();
        match error {
            CallError::Mismatch => DispatchError::SignatureMismatch {
                key,
                found: signature.to_string(),
            },
            CallError::Released => {
                warn!(key = %key, "owner released without detach");
                DispatchError::UseAfterRelease { key }
            }
            CallError::Busy => DispatchError::OwnerBusy { key },
        }
    }

    /// Whether the slot fired since the last check; clears the flag.
    pub fn consume_fired(&mut self) -> bool {
        std::mem::take(&mut self.fired)
    }

    /// Whether the slot fired since the last check, without clearing it.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn reset_fired(&mut self) {
        self.fired = false;
    }

    /// Total subscribers across all arities.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    fn subscribers(&self) -> impl Iterator<Item = &Subscriber> {
        self.buckets.iter().flatten()
    }

    fn push(
        &mut self,
        signature: Signature,
        call: ErasedCall,
        owner: Option<OwnerRef>,
    ) -> SubscriberId {
        let id = SubscriberId::next();
        self.buckets[signature.arity()].push(Subscriber {
            id,
            owner,
            signature,
            call,
        });
        id
    }
}
