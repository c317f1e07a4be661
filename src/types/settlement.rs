//! The tagged terminal outcome of a run.
//!
//! Every run produces exactly one [`Settlement`], even when the record it
//! belongs to could no longer be written (stale run, retired container).
//! Callers awaiting a specific invocation therefore always get a definitive
//! answer.
//!
//! The three variants mirror the terminal statuses:
//!
//! - `Complete(T)`: the body returned a value
//! - `Failed(TaskError)`: the body failed with a domain error
//! - `Aborted(CancelReason)`: the run was cancelled

use super::cancel::CancelReason;
use super::status::TaskStatus;
use crate::error::TaskError;

/// The terminal outcome of one run of a task body.
#[derive(Debug, Clone)]
pub enum Settlement<T> {
    /// The run returned a value.
    Complete(T),
    /// The run failed with a domain error.
    Failed(TaskError),
    /// The run was cancelled.
    Aborted(CancelReason),
}

impl<T> Settlement<T> {
    /// Returns the terminal status this settlement maps to.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        match self {
            Self::Complete(_) => TaskStatus::Complete,
            Self::Failed(_) => TaskStatus::Failed,
            Self::Aborted(_) => TaskStatus::Aborted,
        }
    }

    /// Returns true if the run completed with a value.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Returns true if the run failed with a domain error.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Returns the completed value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Complete(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the settling error, if any.
    ///
    /// This is `Some` only for `Failed`; an aborted settlement carries a
    /// [`CancelReason`] instead (see [`Settlement::reason`]).
    #[must_use]
    pub const fn error(&self) -> Option<&TaskError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the cancellation reason, if the run was aborted.
    #[must_use]
    pub const fn reason(&self) -> Option<&CancelReason> {
        match self {
            Self::Aborted(r) => Some(r),
            _ => None,
        }
    }

    /// Converts this settlement into a standard `Result`.
    ///
    /// An aborted settlement maps to a cancellation-kind [`TaskError`], so
    /// a single `?` propagates both failure and cancellation to an
    /// enclosing body.
    pub fn into_result(self) -> Result<T, TaskError> {
        match self {
            Self::Complete(v) => Ok(v),
            Self::Failed(e) => Err(e),
            Self::Aborted(r) => Err(TaskError::cancelled(r)),
        }
    }

    /// Maps the completed value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Settlement<U> {
        match self {
            Self::Complete(v) => Settlement::Complete(f(v)),
            Self::Failed(e) => Settlement::Failed(e),
            Self::Aborted(r) => Settlement::Aborted(r),
        }
    }
}

impl<T> From<Result<T, TaskError>> for Settlement<T> {
    fn from(result: Result<T, TaskError>) -> Self {
        match result {
            Ok(v) => Self::Complete(v),
            Err(e) => match e.take_reason() {
                Ok(reason) => Self::Aborted(reason),
                Err(e) => Self::Failed(e),
            },
        }
    }
}
