//! The body context and gate: guarded execution under cancellation.
//!
//! Every running body receives a [`TaskCtx`]: the abort signal for its run
//! plus [`TaskCtx::exec`], the gate through which the body performs
//! mutations and starts nested tasks. The gate refuses with a cancellation
//! error once the run is cancelled, superseded, or its container retired.
//! Work fired through the gate stays safe to call after cancellation: it
//! degrades to an error instead of mutating state.
//!
//! There is no ambient "current scope": the enclosing scope travels
//! explicitly, from `TaskCtx` into the [`Gate`] handed to the callback,
//! and from there into any nested run. Misattribution across tasks is
//! impossible by construction.

use std::future::Future;

use crate::error::{Result, TaskError};
use crate::handle::TaskHandle;
use crate::runner;
use crate::scope::CancelScope;
use crate::types::{CancelKind, CancelReason, Settlement};

/// The context handed to a running task body.
#[derive(Clone)]
pub struct TaskCtx<T> {
    handle: TaskHandle<T>,
    scope: CancelScope,
}

impl<T> TaskCtx<T> {
    pub(crate) fn new(handle: TaskHandle<T>, scope: CancelScope) -> Self {
        Self { handle, scope }
    }

    /// Returns this run's abort signal.
    ///
    /// `signal().is_aborted()` is the synchronous check; `signal()
    /// .aborted().await` suspends until the run is cancelled.
    #[must_use]
    pub fn signal(&self) -> &CancelScope {
        &self.scope
    }

    /// Returns true if this run has been cancelled.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.scope.is_aborted()
    }

    /// Runs a callback through the gate.
    ///
    /// The precondition is checked first: if the owning container is no
    /// longer live, the run's scope is aborted, or this run is no longer
    /// the record's active pending run, the callback never executes and a
    /// cancellation error is returned. Otherwise the callback receives a
    /// [`Gate`] carrying this run's scope and its future is awaited.
    ///
    /// A nested task's failure or cancellation started via
    /// [`Gate::run`] surfaces here as an ordinary `Err`, so `?` inside
    /// the body is all the propagation a task author needs.
    pub async fn exec<R, F, Fut>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Gate) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.gate_check()?;
        let gate = Gate {
            scope: self.scope.clone(),
        };
        f(gate).await
    }

    /// The gate precondition. Every refusal is a cancellation error.
    fn gate_check(&self) -> Result<()> {
        if !self.handle.is_live() {
            tracing::trace!(scope = %self.scope.id(), "gate refused: container retired");
            return Err(TaskError::cancelled(CancelReason::retired()));
        }
        if self.scope.is_aborted() {
            let reason = self.scope.reason().unwrap_or_default();
            tracing::trace!(scope = %self.scope.id(), %reason, "gate refused: scope aborted");
            return Err(TaskError::cancelled(reason));
        }
        let active = self
            .handle
            .with_record(|record| record.active_scope().map(CancelScope::id));
        if active != Some(self.scope.id()) {
            tracing::trace!(scope = %self.scope.id(), "gate refused: run no longer active");
            return Err(TaskError::cancelled(CancelReason {
                kind: CancelKind::Superseded,
                message: Some("run is no longer active"),
            }));
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for TaskCtx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCtx")
            .field("scope", &self.scope.id())
            .field("aborted", &self.scope.is_aborted())
            .finish()
    }
}

/// The gate passed to an [`exec`](TaskCtx::exec) callback.
///
/// It carries the enclosing run's scope; nested runs started through it
/// are linked to that scope so cancelling the outer task cancels them
/// transitively.
#[derive(Debug, Clone)]
pub struct Gate {
    scope: CancelScope,
}

impl Gate {
    /// Returns the enclosing run's scope.
    #[must_use]
    pub fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Runs a nested task linked to the enclosing run.
    ///
    /// The nested settlement is unwrapped: a completed value is returned,
    /// while a failed or aborted settlement becomes an `Err` that bubbles
    /// out of the enclosing `exec` call.
    pub async fn run<U, F, Fut>(&self, handle: &TaskHandle<U>, body: F) -> Result<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(TaskCtx<U>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        self.run_settled(handle, body).await.into_result()
    }

    /// Runs a nested task linked to the enclosing run, keeping the full
    /// settlement instead of unwrapping it.
    ///
    /// The record enters `Pending` synchronously, before the returned
    /// future is first polled.
    pub fn run_settled<U, F, Fut>(
        &self,
        handle: &TaskHandle<U>,
        body: F,
    ) -> impl Future<Output = Settlement<U>>
    where
        U: Clone + Send + 'static,
        F: FnOnce(TaskCtx<U>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        runner::run_linked(handle, Some(&self.scope), body)
    }
}
