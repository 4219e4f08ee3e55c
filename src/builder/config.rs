//! Serializable configuration for machines and buses.

use super::error::BuildError;
use crate::callback::KeyPolicy;
use crate::core::{Key, SourceRegistry, DEFAULT_HISTORY_LIMIT};
use serde::{Deserialize, Serialize};

/// Settings shared by [`StateMachineBuilder`](super::StateMachineBuilder)
/// and [`EventBusBuilder`](super::EventBusBuilder).
///
/// Key sets are referred to by the name they were registered under in a
/// [`SourceRegistry`]. Every field is optional in JSON.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::DispatchConfig;
/// use switchyard::callback::KeyPolicy;
///
/// let config = DispatchConfig::from_json(r#"{ "policy": "lenient", "states": "battler" }"#).unwrap();
///
/// assert_eq!(config.policy, KeyPolicy::Lenient);
/// assert_eq!(config.states.as_deref(), Some("battler"));
/// assert_eq!(config.history_limit, 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub policy: KeyPolicy,
    /// Completed transitions kept in the history; zero disables it
    pub history_limit: usize,
    /// Name used in log output
    pub label: Option<String>,
    /// Registered source seeding a machine's states
    pub states: Option<String>,
    /// Registered source seeding a bus's events
    pub events: Option<String>,
    /// State a machine starts in (entered on its first tick)
    pub initial: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: KeyPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            label: None,
            states: None,
            events: None,
            initial: None,
        }
    }
}

impl DispatchConfig {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn resolve(registry: &SourceRegistry, name: Option<&str>) -> Result<Option<Vec<Key>>, BuildError> {
    match name {
        None => Ok(None),
        Some(name) => registry
            .keys(name)
            .map(Some)
            .ok_or_else(|| BuildError::UnknownKeySource(name.to_string())),
    }
}
