//! Shared handle to a task record: the container boundary.
//!
//! A [`TaskHandle`] is the concrete form of the "external state container"
//! at the runtime's edge. It owns the record behind a mutex plus a
//! liveness flag, and exposes the full caller surface: status/error/result
//! observation, `abort()`, `reset()`, and `retire()`.
//!
//! The mutex is held only for synchronous transitions, never across an
//! await, and never while aborting a scope (abort listeners re-enter the
//! record). Liveness is checked immediately before every finalization
//! write; a retired handle silently skips all writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::TaskError;
use crate::record::TaskRecord;
use crate::scope::ScopeId;
use crate::types::{CancelReason, Settlement, TaskStatus};

struct Slot<T> {
    record: Mutex<TaskRecord<T>>,
    live: AtomicBool,
}

/// A cloneable handle to one task's record.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// Creates a handle to a fresh record in `Init`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                record: Mutex::new(TaskRecord::new()),
                live: AtomicBool::new(true),
            }),
        }
    }

    /// Returns the record's current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.with_record(|record| record.status())
    }

    /// Returns the settling error, if the record is `Failed` or `Aborted`.
    #[must_use]
    pub fn error(&self) -> Option<TaskError> {
        self.with_record(|record| record.error().cloned())
    }

    /// Returns true if the record currently has a run in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    /// Returns true while the owning container is live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.slot.live.load(Ordering::SeqCst)
    }

    /// Marks the container as no longer live.
    ///
    /// Any in-flight run is aborted and unwinds as a cancellation; from
    /// this point every record write is silently skipped, though runs
    /// still return their settlement to their own caller.
    pub fn retire(&self) {
        self.slot.live.store(false, Ordering::SeqCst);
        self.abort_with(CancelReason::retired());
    }

    /// Requests cancellation of the in-flight run, if any.
    ///
    /// No-op unless the record is `Pending`. The active scope's flag is
    /// set synchronously; the run itself only stops at its next gate call
    /// or await. Returns true if an abort was triggered.
    pub fn abort(&self) -> bool {
        self.abort_with(CancelReason::new(crate::types::CancelKind::User))
    }

    /// Requests cancellation with an explicit reason.
    pub fn abort_with(&self, reason: CancelReason) -> bool {
        // Clone the scope out of the lock before aborting: the abort
        // listener finalizes the record and takes this same lock.
        let scope = self.with_record(|record| record.active_scope().cloned());
        match scope {
            Some(scope) => scope.abort(&reason),
            None => false,
        }
    }

    /// Aborts any in-flight run and forces the record back to `Init`.
    ///
    /// The reset is optimistic: status is `Init` the instant this returns,
    /// independent of whether the aborted run has finished unwinding. The
    /// stale-run guard keeps the late settlement from overwriting it.
    pub fn reset(&self) {
        self.abort_with(CancelReason::reset());
        self.with_record(TaskRecord::force_reset);
    }

    /// Runs `f` with the record lock held.
    pub(crate) fn with_record<R>(&self, f: impl FnOnce(&mut TaskRecord<T>) -> R) -> R {
        let mut record = self.slot.record.lock().expect("lock poisoned");
        f(&mut record)
    }

    /// Applies a settlement under the liveness and stale-run guards.
    ///
    /// Returns true if the record was written.
    pub(crate) fn finalize(&self, run: ScopeId, settlement: &Settlement<T>) -> bool
    where
        T: Clone,
    {
        if !self.is_live() {
            tracing::trace!(scope = %run, "finalization skipped: container retired");
            return false;
        }
        let written = self.with_record(|record| record.finalize(run, settlement));
        if written {
            tracing::debug!(scope = %run, status = %settlement.status(), "run finalized");
        } else {
            tracing::trace!(scope = %run, "finalization skipped: stale run");
        }
        written
    }
}

impl<T: Clone> TaskHandle<T> {
    /// Returns the settled value, if the record is `Complete`.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        self.with_record(|record| record.result().cloned())
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for TaskHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("status", &self.status())
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::CancelScope;
    use crate::types::CancelKind;

    #[test]
    fn abort_is_noop_unless_pending() {
        let handle: TaskHandle<i32> = TaskHandle::new();
        assert!(!handle.abort());
        assert_eq!(handle.status(), TaskStatus::Init);
    }

    #[test]
    fn abort_flags_the_active_scope() {
        let handle: TaskHandle<i32> = TaskHandle::new();
        let scope = CancelScope::new();
        handle.with_record(|record| record.enter_pending(scope.clone()));

        assert!(handle.abort());
        assert!(scope.is_aborted());
        assert_eq!(scope.reason().map(|r| r.kind), Some(CancelKind::User));
        // abort() never rewrites status by itself; the run observes the
        // flag and settles.
        assert_eq!(handle.status(), TaskStatus::Pending);
    }

    #[test]
    fn reset_is_synchronous_and_optimistic() {
        let handle: TaskHandle<i32> = TaskHandle::new();
        let scope = CancelScope::new();
        handle.with_record(|record| record.enter_pending(scope.clone()));

        handle.reset();
        assert_eq!(handle.status(), TaskStatus::Init);
        assert!(scope.is_aborted());
        assert_eq!(scope.reason().map(|r| r.kind), Some(CancelKind::Reset));

        // The displaced run settles late; Init stays.
        assert!(!handle.finalize(
            scope.id(),
            &Settlement::Aborted(CancelReason::reset())
        ));
        assert_eq!(handle.status(), TaskStatus::Init);
    }

    #[test]
    fn retired_handle_skips_all_writes() {
        let handle: TaskHandle<i32> = TaskHandle::new();
        let scope = CancelScope::new();
        handle.with_record(|record| record.enter_pending(scope.clone()));

        handle.retire();
        assert!(!handle.is_live());
        assert!(scope.is_aborted());
        assert_eq!(scope.reason().map(|r| r.kind), Some(CancelKind::Retired));

        assert!(!handle.finalize(scope.id(), &Settlement::Complete(3)));
    }

    #[test]
    fn finalize_writes_once_per_run() {
        let handle: TaskHandle<i32> = TaskHandle::new();
        let scope = CancelScope::new();
        handle.with_record(|record| record.enter_pending(scope.clone()));

        assert!(handle.finalize(scope.id(), &Settlement::Complete(1)));
        assert!(!handle.finalize(scope.id(), &Settlement::Complete(2)));
        assert_eq!(handle.result(), Some(1));
    }
}
