//! Concurrent gate usage within one body, and gate refusal for contexts
//! that outlive their run.
//!
//! The context is plain data and can be cloned out of a body; the gate
//! check is what keeps such a stale context from mutating anything once
//! its run is over.

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use taskscope::{run, CancelKind, TaskCtx, TaskError, TaskHandle, TaskStatus};

type Stash = Arc<Mutex<Option<TaskCtx<u32>>>>;

fn stash() -> Stash {
    Arc::new(Mutex::new(None))
}

fn take(stash: &Stash) -> TaskCtx<u32> {
    stash
        .lock()
        .expect("lock poisoned")
        .take()
        .expect("body stashed its context")
}

#[test]
fn one_failing_branch_fails_the_parent_but_not_its_sibling() {
    init_test_logging();
    let parent: TaskHandle<u32> = TaskHandle::new();
    let side: TaskHandle<u32> = TaskHandle::new();

    let side2 = side.clone();
    let settlement = block_on(run(&parent, move |ctx| async move {
        let ok_branch = ctx.exec(move |gate| async move {
            gate.run(&side2, |_ctx| async { Ok(10) }).await
        });
        let err_branch = ctx.exec(|_gate| async { Err(TaskError::user("branch failed")) });

        let (ok, err) = zip(ok_branch, err_branch).await;
        let _ = ok?;
        err
    }));

    assert!(settlement.is_failed());
    assert_eq!(
        settlement.error().and_then(TaskError::message),
        Some("branch failed")
    );
    assert_eq!(parent.status(), TaskStatus::Failed);
    // The branch that already settled keeps its own terminal record.
    assert_eq!(side.status(), TaskStatus::Complete);
    assert_eq!(side.result(), Some(10));
}

#[test]
fn stale_context_is_refused_after_the_run_settled() {
    init_test_logging();
    let task: TaskHandle<u32> = TaskHandle::new();
    let slot = stash();

    let stashed = slot.clone();
    let settlement = block_on(run(&task, move |ctx| async move {
        *stashed.lock().expect("lock poisoned") = Some(ctx.clone());
        Ok(1)
    }));
    assert!(settlement.is_complete());

    let executed = Arc::new(Mutex::new(false));
    let flag = executed.clone();
    let refused = block_on(take(&slot).exec(move |_gate| async move {
        *flag.lock().expect("lock poisoned") = true;
        Ok(0)
    }));

    let err = refused.expect_err("stale context must be refused");
    assert!(err.is_cancelled());
    assert_eq!(err.reason().map(|r| r.kind), Some(CancelKind::Superseded));
    // The callback never ran and the record is untouched.
    assert!(!*executed.lock().expect("lock poisoned"));
    assert_eq!(task.status(), TaskStatus::Complete);
    assert_eq!(task.result(), Some(1));
}

#[test]
fn stale_context_is_refused_after_retirement() {
    init_test_logging();
    let task: TaskHandle<u32> = TaskHandle::new();
    let slot = stash();

    let stashed = slot.clone();
    let settlement = block_on(run(&task, move |ctx| async move {
        *stashed.lock().expect("lock poisoned") = Some(ctx.clone());
        Ok(1)
    }));
    assert!(settlement.is_complete());

    task.retire();
    let refused = block_on(take(&slot).exec(|_gate| async { Ok(0) }));

    let err = refused.expect_err("retired container must refuse the gate");
    assert!(err.is_cancelled());
    assert_eq!(err.reason().map(|r| r.kind), Some(CancelKind::Retired));
}

#[test]
fn context_of_an_aborted_run_is_refused_with_the_abort_reason() {
    init_test_logging();
    let task: TaskHandle<u32> = TaskHandle::new();
    let slot = stash();

    let stashed = slot.clone();
    let fut = run(&task, move |ctx| async move {
        *stashed.lock().expect("lock poisoned") = Some(ctx.clone());
        ctx.signal().aborted().await;
        Ok(1)
    });

    let (settlement, ()) = block_on(zip(fut, async {
        assert!(task.abort());
    }));
    assert!(settlement.is_aborted());

    let refused = block_on(take(&slot).exec(|_gate| async { Ok(0) }));
    let err = refused.expect_err("aborted run must refuse the gate");
    assert!(err.is_cancelled());
    assert_eq!(err.reason().map(|r| r.kind), Some(CancelKind::User));
}

#[test]
fn parallel_branches_both_complete() {
    init_test_logging();
    let parent: TaskHandle<u32> = TaskHandle::new();
    let left: TaskHandle<u32> = TaskHandle::new();
    let right: TaskHandle<u32> = TaskHandle::new();

    let (l, r) = (left.clone(), right.clone());
    let settlement = block_on(run(&parent, move |ctx| async move {
        let a = ctx.exec(move |gate| async move { gate.run(&l, |_ctx| async { Ok(2) }).await });
        let b = ctx.exec(move |gate| async move { gate.run(&r, |_ctx| async { Ok(3) }).await });
        let (a, b) = zip(a, b).await;
        Ok(a? * b?)
    }));

    assert_eq!(settlement.value(), Some(&6));
    assert_eq!(left.result(), Some(2));
    assert_eq!(right.result(), Some(3));
}
