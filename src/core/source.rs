//! Key sources: the finite set of keys a table is seeded with.
//!
//! A key source is either an enum declared with [`key_enum!`](crate::key_enum)
//! or a marker struct of string constants declared with
//! [`key_marker!`](crate::key_marker). Sources can also be registered by name
//! in a [`SourceRegistry`] so configuration can refer to them.

use super::key::Key;
use std::collections::BTreeMap;

/// A type that enumerates a fixed, ordered set of keys.
///
/// # Example
///
/// ```rust
/// use switchyard::core::{Key, KeySource};
///
/// struct Phases;
///
/// impl KeySource for Phases {
///     fn keys() -> Vec<Key> {
///         vec![Key::from("Start"), Key::from("End")]
///     }
/// }
///
/// assert_eq!(Phases::key_at(1), Some(Key::from("End")));
/// assert_eq!(Phases::key_at(2), None);
/// ```
pub trait KeySource {
    /// All keys, in declaration order.
    fn keys() -> Vec<Key>;

    /// The key declared at `index`, or `None` when out of range.
    fn key_at(index: usize) -> Option<Key> {
        Self::keys().into_iter().nth(index)
    }

    fn contains(key: &Key) -> bool {
        Self::keys().iter().any(|k| k == key)
    }
}

type KeyFn = fn() -> Vec<Key>;

/// Name -> key source lookup.
///
/// Stands in for scanning a namespace for enum and marker types: sources
/// are listed explicitly once at startup.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, KeyFn>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `K` under `name`, replacing any earlier source of that name.
    pub fn register<K: KeySource>(&mut self, name: impl Into<String>) -> &mut Self {
        self.sources.insert(name.into(), K::keys);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Keys of the source registered under `name`.
    pub fn keys(&self, name: &str) -> Option<Vec<Key>> {
        self.sources.get(name).map(|keys| keys())
    }

    /// Registered source names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sources.keys()).finish()
    }
}
