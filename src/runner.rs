//! Run orchestration: one execution of a task body, settled exactly once.
//!
//! [`run`] (and its scope-linked internal variant) implements the full
//! lifecycle of a single run:
//!
//! 1. displace and abort any run still pending on the record
//! 2. create the run's [`CancelScope`], linked to the enclosing one
//! 3. install `Pending` synchronously, before any suspension
//! 4. drive the body, racing it against the abort signal
//! 5. on abort, finalize the record `Aborted` immediately via listener
//! 6. compute the terminal settlement (abort dominates all other ends)
//! 7. apply it under the stale-run guard and return it regardless
//!
//! The returned future resolves only after finalization happened or the
//! guard proved it moot, so callers never observe a dangling pending
//! state after awaiting a settlement.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::TaskError;
use crate::gate::TaskCtx;
use crate::handle::TaskHandle;
use crate::record::TaskRecord;
use crate::scope::{Aborted, CancelScope};
use crate::types::{CancelReason, Settlement};

/// Starts a run of `body` against `handle`'s record.
///
/// The record is `Pending` the moment this returns, before the returned
/// future is first polled, so a caller inspecting status right after
/// `run()` always observes `Pending`. Await the future for the run's
/// [`Settlement`].
pub fn run<T, F, Fut>(handle: &TaskHandle<T>, body: F) -> impl Future<Output = Settlement<T>>
where
    T: Clone + Send + 'static,
    F: FnOnce(TaskCtx<T>) -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    run_linked(handle, None, body)
}

/// Starts a run, linking its scope to `parent` when given.
///
/// Nested runs go through [`Gate::run`](crate::gate::Gate::run), which
/// supplies the enclosing scope here.
pub(crate) fn run_linked<T, F, Fut>(
    handle: &TaskHandle<T>,
    parent: Option<&CancelScope>,
    body: F,
) -> impl Future<Output = Settlement<T>>
where
    T: Clone + Send + 'static,
    F: FnOnce(TaskCtx<T>) -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    // Step 1: a still-pending run is displaced. Abort it outside the
    // record lock; its settlement becomes Aborted(Superseded) through the
    // listener below, and its late natural completion fails the guard.
    if let Some(displaced) = handle.with_record(TaskRecord::displace) {
        displaced.abort(&CancelReason::superseded());
    }

    // Step 2: the run's own scope, chained to the enclosing run if this
    // run was started from inside a gate.
    let scope = CancelScope::child_of(parent);
    tracing::debug!(scope = %scope.id(), linked = parent.is_some(), "run starting");

    // Step 3: Pending and the active scope are installed synchronously.
    handle.with_record(|record| record.enter_pending(scope.clone()));

    // Step 5: an abort finalizes the record immediately and synchronously,
    // without waiting for the body to unwind. The guard in finalize()
    // makes this safe against reset() and newer runs.
    {
        let handle = handle.clone();
        let run_id = scope.id();
        scope.on_abort(move |reason: &CancelReason| {
            handle.finalize(run_id, &Settlement::Aborted(reason.clone()));
        });
    }

    let ctx = TaskCtx::new(handle.clone(), scope.clone());
    let handle = handle.clone();
    let drive = Drive {
        body: Box::pin(body(ctx)),
        signal: scope.aborted(),
    };

    async move {
        // Steps 4 and 6.
        let driven = drive.await;
        let settlement = settle(driven, &scope);

        // Step 7: the loser of a finalization race is a no-op, but the
        // settlement is returned to this run's caller either way.
        handle.finalize(scope.id(), &settlement);
        settlement
    }
}

/// Computes the terminal settlement for a driven body.
///
/// An aborted scope dominates every other way the body ended; a thrown
/// cancellation error also settles as Aborted; panics settle as Failed.
fn settle<T>(driven: Driven<T>, scope: &CancelScope) -> Settlement<T> {
    match driven {
        Driven::Aborted(reason) => Settlement::Aborted(reason),
        Driven::Body(_) if scope.is_aborted() => {
            Settlement::Aborted(scope.reason().unwrap_or_default())
        }
        Driven::Body(Ok(result)) => Settlement::from(result),
        Driven::Body(Err(payload)) => {
            Settlement::Failed(TaskError::panicked(payload_message(payload.as_ref())))
        }
    }
}

/// How the driving of a body ended.
enum Driven<T> {
    /// The body ran to its own end: returned, errored, or panicked.
    Body(std::thread::Result<crate::Result<T>>),
    /// The abort signal won the race while the body was still suspended.
    Aborted(CancelReason),
}

/// Races the body against the run's abort signal, catching panics.
struct Drive<Fut> {
    body: Pin<Box<Fut>>,
    signal: Aborted,
}

impl<T, Fut> Future for Drive<Fut>
where
    Fut: Future<Output = crate::Result<T>>,
{
    type Output = Driven<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // The signal is polled first so an abort that happened while the
        // body was suspended wins without the body running another step.
        if let Poll::Ready(reason) = Pin::new(&mut this.signal).poll(cx) {
            return Poll::Ready(Driven::Aborted(reason));
        }

        let polled = catch_unwind(AssertUnwindSafe(|| this.body.as_mut().poll(cx)));
        match polled {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(result)) => Poll::Ready(Driven::Body(Ok(result))),
            Err(payload) => Poll::Ready(Driven::Body(Err(payload))),
        }
    }
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
