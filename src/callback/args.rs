//! Arity dispatch: typed argument tuples of 0 to 4 parameters.
//!
//! Handlers are plain closures (`Fn()`, `Fn(T0)`, ... `Fn(T0, T1, T2, T3)`)
//! or owner methods (`fn(&mut O, T0, ..)`). Arguments travel as tuples
//! implementing [`Args`]; each subscriber is stored with the [`Signature`]
//! of the tuple it accepts and only receives matching invocations.
//!
//! [`ArgList`] is the dynamic fallback: a list of boxed values whose
//! signature is only known at runtime.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// Maximum number of parameters a handler may take.
pub const MAX_ARITY: usize = 4;

/// Ordered parameter types of a handler or invocation.
///
/// Equality only considers the `TypeId`s; the names are kept for messages.
#[derive(Clone, Debug)]
pub struct Signature {
    params: Vec<(TypeId, &'static str)>,
}

impl Signature {
    pub fn of<A: Args>() -> Self {
        A::signature()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.params.iter().map(|(_, name)| *name).collect()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|((a, _), (b, _))| a == b)
    }
}

impl Eq for Signature {}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_names().join(", "))
    }
}

/// Argument tuple of arity 0 to [`MAX_ARITY`].
///
/// Implemented for `()`, `(T0,)`, `(T0, T1)`, `(T0, T1, T2)` and
/// `(T0, T1, T2, T3)`. Larger tuples have no implementation, so a handler
/// with too many parameters is rejected when it is registered.
pub trait Args: Clone + 'static {
    const ARITY: usize;

    fn signature() -> Signature;

    /// Rebuild the tuple from a dynamic list, if the types line up.
    fn from_list(list: &ArgList) -> Option<Self>;
}

macro_rules! impl_args {
    ($arity:expr; $($t:ident => $idx:tt),*) => {
        impl<$($t: Clone + 'static),*> Args for ($($t,)*) {
            const ARITY: usize = $arity;

            fn signature() -> Signature {
                Signature {
                    params: vec![$((TypeId::of::<$t>(), type_name::<$t>())),*],
                }
            }

            #[allow(unused_variables)]
            fn from_list(list: &ArgList) -> Option<Self> {
                if list.len() != Self::ARITY {
                    return None;
                }
                Some(($(list.get::<$t>($idx)?.clone(),)*))
            }
        }
    };
}

impl_args!(0;);
impl_args!(1; T0 => 0);
impl_args!(2; T0 => 0, T1 => 1);
impl_args!(3; T0 => 0, T1 => 1, T2 => 2);
impl_args!(4; T0 => 0, T1 => 1, T2 => 2, T3 => 3);

/// Dynamically typed argument list.
///
/// # Example
///
/// ```rust
/// use switchyard::callback::ArgList;
///
/// let args = ArgList::new().arg(10_i32).arg("bonus".to_string());
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.get::<i32>(0), Some(&10));
/// assert_eq!(args.get::<i32>(1), None);
/// ```
#[derive(Default)]
pub struct ArgList {
    values: Vec<Box<dyn Any>>,
    names: Vec<&'static str>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Any>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any>(&mut self, value: T) {
        self.values.push(Box::new(value));
        self.names.push(type_name::<T>());
    }

    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.downcast_ref::<T>()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn signature(&self) -> Signature {
        Signature {
            params: self
                .values
                .iter()
                .zip(&self.names)
                .map(|(value, name)| (Any::type_id(&**value), *name))
                .collect(),
        }
    }
}

impl fmt::Debug for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgList").field(&self.names).finish()
    }
}

/// Arguments as handed to an erased subscriber.
#[derive(Clone, Copy)]
pub(crate) enum Payload<'a> {
    Typed(&'a dyn Any),
    List(&'a ArgList),
}

impl Payload<'_> {
    fn extract<A: Args>(self) -> Option<A> {
        match self {
            Payload::Typed(value) => value.downcast_ref::<A>().cloned(),
            Payload::List(list) => A::from_list(list),
        }
    }
}

/// Why an erased subscriber did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallError {
    Mismatch,
    Released,
    Busy,
}

pub(crate) type ErasedCall = Rc<dyn for<'a> Fn(Payload<'a>) -> Result<(), CallError>>;
pub(crate) type ErasedMethod<O> =
    Rc<dyn for<'o, 'a> Fn(&'o mut O, Payload<'a>) -> Result<(), CallError>>;

pub(crate) fn call_from<F>(call: F) -> ErasedCall
where
    F: for<'a> Fn(Payload<'a>) -> Result<(), CallError> + 'static,
{
    Rc::new(call)
}

fn method_from<O, F>(method: F) -> ErasedMethod<O>
where
    F: for<'o, 'a> Fn(&'o mut O, Payload<'a>) -> Result<(), CallError> + 'static,
{
    Rc::new(method)
}

/// A closure subscribed with argument tuple `A`.
pub trait Callback<A: Args>: 'static {
    fn invoke(&self, args: A);
}

/// An owner method bound with argument tuple `A`.
pub trait OwnerMethod<O, A: Args>: 'static {
    fn invoke(&self, owner: &mut O, args: A);
}

macro_rules! impl_handlers {
    ($($t:ident $v:ident),*) => {
        impl<F, $($t),*> Callback<($($t,)*)> for F
        where
            F: Fn($($t),*) + 'static,
            $($t: Clone + 'static,)*
        {
            fn invoke(&self, args: ($($t,)*)) {
                let ($($v,)*) = args;
                (self)($($v),*)
            }
        }

        impl<O, F, $($t),*> OwnerMethod<O, ($($t,)*)> for F
        where
            F: Fn(&mut O, $($t),*) + 'static,
            $($t: Clone + 'static,)*
        {
            fn invoke(&self, owner: &mut O, args: ($($t,)*)) {
                let ($($v,)*) = args;
                (self)(owner, $($v),*)
            }
        }
    };
}

impl_handlers!();
impl_handlers!(T0 a0);
impl_handlers!(T0 a0, T1 a1);
impl_handlers!(T0 a0, T1 a1, T2 a2);
impl_handlers!(T0 a0, T1 a1, T2 a2, T3 a3);

pub(crate) fn erase_callback<A, F>(callback: F) -> ErasedCall
where
    A: Args,
    F: Callback<A>,
{
    call_from(move |payload| {
        let args = payload.extract::<A>().ok_or(CallError::Mismatch)?;
        callback.invoke(args);
        Ok(())
    })
}

pub(crate) fn erase_method<O, A, M>(method: M) -> ErasedMethod<O>
where
    O: 'static,
    A: Args,
    M: OwnerMethod<O, A>,
{
    method_from(move |owner: &mut O, payload| {
        let args = payload.extract::<A>().ok_or(CallError::Mismatch)?;
        method.invoke(owner, args);
        Ok(())
    })
}
