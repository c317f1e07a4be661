//! Cancellation scopes: one abortable flag per run, chainable to a parent.
//!
//! A [`CancelScope`] is created by the runner for the duration of one run
//! and is the unit of cancellation: aborting it is what makes the run
//! settle as `Aborted`. Scopes chain: a run started from inside another
//! run's gate links its scope to the enclosing one, so aborting an outer
//! scope aborts every scope transitively created under it, depth-first and
//! synchronously. The task bodies themselves only observe the flag at
//! their next gate call or await.
//!
//! The handle is a cheap `Arc` clone. External code never aborts a scope
//! directly; it goes through `TaskHandle::abort`/`reset`, which resolve
//! the record's active scope first.

use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::task::{Context, Poll, Waker};

use crate::types::CancelReason;

/// Identity of one scope, unique per process.
///
/// Records remember the id of their active run's scope; finalization
/// compares ids so a stale run can never clobber a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Trait for abort listeners.
pub trait AbortListener: Send + Sync {
    /// Called exactly once when the scope aborts.
    fn on_abort(&self, reason: &CancelReason);
}

impl<F> AbortListener for F
where
    F: Fn(&CancelReason) + Send + Sync,
{
    fn on_abort(&self, reason: &CancelReason) {
        self(reason);
    }
}

/// Internal shared state for a cancellation scope.
struct ScopeState {
    /// Unique scope identity.
    id: ScopeId,
    /// Whether the scope has been aborted (monotonic).
    aborted: AtomicBool,
    /// The cancellation reason (set when aborted).
    reason: RwLock<Option<CancelReason>>,
    /// Child scopes linked to this one (hierarchical cancellation).
    children: RwLock<Vec<CancelScope>>,
    /// Listeners to notify on abort.
    listeners: RwLock<Vec<Box<dyn AbortListener>>>,
}

/// The cancellation scope bound to one run of a task.
#[derive(Clone)]
pub struct CancelScope {
    state: Arc<ScopeState>,
}

impl CancelScope {
    /// Creates a new, unlinked scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(ScopeState {
                id: ScopeId::next(),
                aborted: AtomicBool::new(false),
                reason: RwLock::new(None),
                children: RwLock::new(Vec::new()),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Creates a scope linked to `parent` when one is given.
    ///
    /// A linked scope aborts when its parent aborts. Linking under an
    /// already-aborted parent aborts the new scope immediately.
    #[must_use]
    pub(crate) fn child_of(parent: Option<&Self>) -> Self {
        let scope = Self::new();
        if let Some(parent) = parent {
            parent.adopt(&scope);
        }
        scope
    }

    /// Returns this scope's identity.
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.state.id
    }

    /// Returns true if the scope has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if aborted.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.state.reason.read().expect("lock poisoned").clone()
    }

    /// Aborts this scope with the given reason.
    ///
    /// Returns true if this call triggered the abort (first caller wins).
    /// Listeners are notified exactly once, then child scopes are aborted
    /// depth-first with `ParentCancelled`; by the time this returns, every
    /// descendant's flag is already set.
    pub fn abort(&self, reason: &CancelReason) -> bool {
        if self
            .state
            .aborted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        *self.state.reason.write().expect("lock poisoned") = Some(reason.clone());
        tracing::debug!(scope = %self.state.id, %reason, "scope aborted");

        let listeners = {
            let mut listeners = self.state.listeners.write().expect("lock poisoned");
            std::mem::take(&mut *listeners)
        };

        // Notify listeners without holding the lock to avoid reentrancy
        // deadlocks (a listener may finalize a record, which takes the
        // record lock).
        for listener in listeners {
            listener.on_abort(reason);
        }

        let children = {
            let children = self.state.children.read().expect("lock poisoned");
            children.clone()
        };
        let parent_reason = CancelReason::parent_cancelled();
        for child in children {
            child.abort(&parent_reason);
        }

        true
    }

    /// Links `child` so that aborting this scope aborts it too.
    fn adopt(&self, child: &Self) {
        // Hold the children lock across the aborted check to avoid a
        // TOCTOU race: abort() sets the flag (SeqCst) *before* reading
        // children, so if we observe !aborted under the write lock the
        // in-flight abort() will see our child when it reads the list.
        let mut children = self.state.children.write().expect("lock poisoned");
        if self.is_aborted() {
            drop(children);
            child.abort(&CancelReason::parent_cancelled());
        } else {
            children.push(child.clone());
        }
    }

    /// Adds a listener to be notified on abort.
    ///
    /// Registering on an already-aborted scope fires the listener
    /// immediately.
    pub fn on_abort(&self, listener: impl AbortListener + 'static) {
        // Same TOCTOU discipline as adopt(): check under the write lock.
        let mut listeners = self.state.listeners.write().expect("lock poisoned");
        if self.is_aborted() {
            drop(listeners);
            if let Some(reason) = self.reason() {
                listener.on_abort(&reason);
            }
        } else {
            listeners.push(Box::new(listener));
        }
    }

    /// Returns a future that resolves with the reason once this scope
    /// aborts.
    ///
    /// This is the awaitable half of the abort signal handed to task
    /// bodies; `is_aborted` is the synchronous half.
    #[must_use]
    pub fn aborted(&self) -> Aborted {
        Aborted {
            scope: self.clone(),
            waker: Arc::new(Mutex::new(None)),
            registered: false,
        }
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelScope")
            .field("id", &self.state.id)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// Future returned by [`CancelScope::aborted`].
pub struct Aborted {
    scope: CancelScope,
    waker: Arc<Mutex<Option<Waker>>>,
    registered: bool,
}

impl Future for Aborted {
    type Output = CancelReason;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.scope.is_aborted() {
            return Poll::Ready(this.scope.reason().unwrap_or_default());
        }

        *this.waker.lock().expect("lock poisoned") = Some(cx.waker().clone());
        if !this.registered {
            this.registered = true;
            let slot = Arc::clone(&this.waker);
            this.scope.on_abort(move |_: &CancelReason| {
                if let Some(waker) = slot.lock().expect("lock poisoned").take() {
                    waker.wake();
                }
            });
        }

        // The abort may have fired between the flag check and listener
        // registration; re-check so we never sleep through it.
        if this.scope.is_aborted() {
            Poll::Ready(this.scope.reason().unwrap_or_default())
        } else {
            Poll::Pending
        }
    }
}
