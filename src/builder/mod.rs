//! Builder API for ergonomic machine and bus construction.
//!
//! This module provides fluent builders, a serializable configuration and
//! macros declaring key sources.

pub mod bus;
pub mod config;
pub mod error;
pub mod machine;
pub mod macros;

pub use bus::EventBusBuilder;
pub use config::DispatchConfig;
pub use error::BuildError;
pub use machine::StateMachineBuilder;
