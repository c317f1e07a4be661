//! Taskscope: observable, cancellable, composable task lifecycles.
//!
//! # Overview
//!
//! Taskscope manages asynchronous operations as tasks: units of work with
//! a small observable status machine (init / pending / complete / failed /
//! aborted) plus the error or value that settled them. Calling code and UI
//! layers can render progress and cancel work without manual bookkeeping,
//! and a task body may start other tasks, with cancellation and failure of
//! an inner task propagating deterministically to the outer one.
//!
//! # Core Guarantees
//!
//! - **Pending is immediate**: a record reads `Pending` the instant a run
//!   starts, before any suspension
//! - **Exactly-once settlement**: every run produces one [`Settlement`];
//!   the record is finalized at most once per run
//! - **Stale runs never clobber**: a liveness + active-scope check guards
//!   every record write, so a displaced or reset run settles quietly
//! - **Hierarchical cancellation**: scopes chain through the gate;
//!   aborting an outer run aborts every run transitively started under
//!   it, synchronously and depth-first
//! - **Cancellation is attributed**: every abort carries a
//!   [`CancelReason`] saying why
//!
//! # Example
//!
//! ```
//! use taskscope::{run, TaskHandle, TaskStatus};
//!
//! let task: TaskHandle<u32> = TaskHandle::new();
//! let fut = run(&task, |ctx| async move {
//!     // gated mutations degrade to a cancellation error once aborted
//!     ctx.exec(|_gate| async { Ok(2 + 2) }).await
//! });
//! assert_eq!(task.status(), TaskStatus::Pending);
//!
//! let settlement = futures_lite::future::block_on(fut);
//! assert_eq!(settlement.value(), Some(&4));
//! assert_eq!(task.status(), TaskStatus::Complete);
//! ```
//!
//! # Module Structure
//!
//! - [`types`]: status machine, cancellation reasons, settlements
//! - [`scope`]: per-run cancellation scopes with listener chaining
//! - [`record`]: the durable task record and its transitions
//! - [`handle`]: the shared container boundary (`abort`/`reset`/`retire`)
//! - [`gate`]: the body context and guarded execution gate
//! - [`runner`]: run orchestration and exactly-once finalization
//! - [`error`]: error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod gate;
pub mod handle;
pub mod record;
pub mod runner;
pub mod scope;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use error::{ErrorKind, Result, TaskError};
pub use gate::{Gate, TaskCtx};
pub use handle::TaskHandle;
pub use record::TaskRecord;
pub use runner::run;
pub use scope::{AbortListener, Aborted, CancelScope, ScopeId};
pub use types::{CancelKind, CancelReason, Settlement, TaskStatus};
