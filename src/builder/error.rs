//! Build errors for machine and bus builders.

use crate::callback::DispatchError;
use thiserror::Error;

/// Errors that can occur when building state machines and event buses.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown key source '{0}'. Register it with SourceRegistry::register first")]
    UnknownKeySource(String),

    #[error("Initial state '{0}' is not a declared state")]
    UnknownInitialState(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
