//! Macros declaring key sources.

/// Declare an enum whose variants are keys.
///
/// The enum implements [`KeySource`](crate::core::KeySource) in variant
/// order and converts into [`Key`](crate::core::Key) by variant name.
///
/// # Example
///
/// ```
/// use switchyard::core::{Key, KeySource};
/// use switchyard::key_enum;
///
/// key_enum! {
///     pub enum Phase {
///         Idle,
///         Moving,
///     }
/// }
///
/// assert_eq!(Phase::Moving.name(), "Moving");
/// assert_eq!(Key::from(Phase::Idle), Key::from("Idle"));
/// assert_eq!(Phase::key_at(1), Some(Key::from("Moving")));
/// ```
#[macro_export]
macro_rules! key_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        impl $crate::core::KeySource for $name {
            fn keys() -> Vec<$crate::core::Key> {
                vec![$($crate::core::Key::from(stringify!($variant))),*]
            }
        }

        impl From<$name> for $crate::core::Key {
            fn from(value: $name) -> Self {
                $crate::core::Key::from(value.name())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// Declare a marker struct of string key constants.
///
/// A constant without a value uses its own name. A marker may extend a
/// parent marker; its keys are the parent's followed by its own. The
/// parent's constants stay on the parent.
///
/// # Example
///
/// ```
/// use switchyard::core::{Key, KeySource};
/// use switchyard::key_marker;
///
/// key_marker! {
///     pub struct Base {
///         Idle,
///         Hurt = "Damaged",
///     }
/// }
///
/// key_marker! {
///     pub struct Hero: Base {
///         Casting,
///     }
/// }
///
/// assert_eq!(Base::Hurt, "Damaged");
/// assert_eq!(
///     Hero::keys(),
///     vec![Key::from("Idle"), Key::from("Damaged"), Key::from("Casting")]
/// );
/// ```
#[macro_export]
macro_rules! key_marker {
    (@value $konst:ident) => {
        stringify!($konst)
    };
    (@value $konst:ident $value:expr) => {
        $value
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $parent:ty)? {
            $(
                $(#[$konst_meta:meta])*
                $konst:ident $(= $value:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        $vis struct $name;

        #[allow(non_upper_case_globals)]
        impl $name {
            $(
                $(#[$konst_meta])*
                pub const $konst: &'static str = $crate::key_marker!(@value $konst $($value)?);
            )*
        }

        impl $crate::core::KeySource for $name {
            fn keys() -> Vec<$crate::core::Key> {
                #[allow(unused_mut)]
                let mut keys: Vec<$crate::core::Key> = Vec::new();
                $(keys.extend(<$parent as $crate::core::KeySource>::keys());)?
                $(keys.push($crate::core::Key::from(Self::$konst));)*
                keys
            }
        }
    };
}
