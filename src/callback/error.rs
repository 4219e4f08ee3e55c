//! Dispatch errors and failure accumulation.

use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Errors raised by registration and dispatch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("Unknown key '{key}'")]
    UnknownKey { key: String },

    #[error("Unsupported arity {arity} for '{key}' (at most {max} parameters)")]
    UnsupportedArity {
        key: String,
        arity: usize,
        max: usize,
    },

    #[error("No subscriber of '{key}' accepts ({found})")]
    SignatureMismatch { key: String, found: String },

    #[error("Owner bound to '{key}' was released without being detached")]
    UseAfterRelease { key: String },

    #[error("Owner bound to '{key}' is already borrowed")]
    OwnerBusy { key: String },

    #[error("{} dispatch failures", .0.len())]
    Several(Vec<DispatchError>),
}

impl DispatchError {
    /// Collapse a list of failures: one stays as is, more become `Several`.
    pub(crate) fn from_failures(failures: Vec<DispatchError>) -> Self {
        let mut flat = Vec::with_capacity(failures.len());
        for failure in failures {
            match failure {
                DispatchError::Several(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            DispatchError::Several(flat)
        }
    }

    /// Every individual failure carried by this error.
    pub fn failures(&self) -> Vec<&DispatchError> {
        match self {
            DispatchError::Several(inner) => inner.iter().collect(),
            other => vec![other],
        }
    }
}

/// Run-everything-then-report: accumulate every failure instead of
/// stopping at the first one.
pub(crate) fn accumulate<I>(results: I) -> Result<(), DispatchError>
where
    I: IntoIterator<Item = Result<(), DispatchError>>,
{
    let checks: Vec<Validation<(), NonEmptyVec<DispatchError>>> = results
        .into_iter()
        .map(|result| match result {
            Ok(()) => Validation::success(()),
            Err(error) => Validation::fail(error),
        })
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(DispatchError::from_failures(
            errors.iter().cloned().collect(),
        )),
    }
}
