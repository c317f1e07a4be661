//! The task record: durable status, error, and result of one task.
//!
//! A record is the only shared mutable state in the runtime. It is owned
//! by a [`TaskHandle`](crate::handle::TaskHandle) and mutated exclusively
//! through the transition methods here, called by the runner and by
//! `abort()`/`reset()`. Invariants:
//!
//! - at most one of {error, result} is populated: error iff
//!   `Failed | Aborted`, result iff `Complete`
//! - an active scope is installed iff the status is `Pending`
//! - finalization requires the settling run's [`ScopeId`] to match the
//!   active scope (the stale-run guard); a mismatch is silently discarded

use crate::error::TaskError;
use crate::scope::{CancelScope, ScopeId};
use crate::types::{Settlement, TaskStatus};

/// The durable record of one task's lifecycle.
#[derive(Debug)]
pub struct TaskRecord<T> {
    status: TaskStatus,
    error: Option<TaskError>,
    result: Option<T>,
    active_scope: Option<CancelScope>,
}

impl<T> TaskRecord<T> {
    /// Creates a fresh record in `Init`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: TaskStatus::Init,
            error: None,
            result: None,
            active_scope: None,
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the settling error, if the record is `Failed` or `Aborted`.
    #[must_use]
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    /// Returns the settled value, if the record is `Complete`.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Returns the scope of the in-flight run, if the record is `Pending`.
    #[must_use]
    pub fn active_scope(&self) -> Option<&CancelScope> {
        self.active_scope.as_ref()
    }

    /// Takes the active scope away from a pending record.
    ///
    /// Used when a new run displaces a pending one: the caller aborts the
    /// returned scope outside the record lock. The status stays `Pending`
    /// for the instant until [`enter_pending`](Self::enter_pending)
    /// installs the new run.
    pub(crate) fn displace(&mut self) -> Option<CancelScope> {
        if self.status.is_pending() {
            self.active_scope.take()
        } else {
            None
        }
    }

    /// Moves the record to `Pending` for a fresh run.
    ///
    /// Clears any previous error/result and installs the run's scope.
    pub(crate) fn enter_pending(&mut self, scope: CancelScope) {
        self.status = TaskStatus::Pending;
        self.error = None;
        self.result = None;
        self.active_scope = Some(scope);
    }

    /// Applies a settlement to the record, guarded against stale runs.
    ///
    /// The write happens only if the record is still `Pending` and `run`
    /// is the active scope; otherwise the attempt is discarded and `false`
    /// is returned. The caller keeps its settlement either way.
    pub(crate) fn finalize(&mut self, run: ScopeId, settlement: &Settlement<T>) -> bool
    where
        T: Clone,
    {
        if !self.status.is_pending() {
            return false;
        }
        match &self.active_scope {
            Some(scope) if scope.id() == run => {}
            _ => return false,
        }

        self.status = settlement.status();
        self.active_scope = None;
        match settlement {
            Settlement::Complete(value) => {
                self.error = None;
                self.result = Some(value.clone());
            }
            Settlement::Failed(error) => {
                self.error = Some(error.clone());
                self.result = None;
            }
            Settlement::Aborted(reason) => {
                self.error = Some(TaskError::cancelled(reason.clone()));
                self.result = None;
            }
        }
        true
    }

    /// Forces the record back to `Init`, dropping error, result, and scope.
    ///
    /// The caller is responsible for aborting a pending scope first; any
    /// in-flight run that settles later fails the stale-run guard and
    /// leaves the `Init` state untouched.
    pub(crate) fn force_reset(&mut self) {
        self.status = TaskStatus::Init;
        self.error = None;
        self.result = None;
        self.active_scope = None;
    }
}

impl<T> Default for TaskRecord<T> {
    fn default() -> Self {
        Self::new()
    }
}
