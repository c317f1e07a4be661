//! Core types for the task lifecycle runtime.
//!
//! - [`status`]: the five-state status machine
//! - [`cancel`]: cancellation kinds and attributed reasons
//! - [`settlement`]: the tagged terminal outcome of a run

pub mod cancel;
pub mod settlement;
pub mod status;

pub use cancel::{CancelKind, CancelReason};
pub use settlement::Settlement;
pub use status::TaskStatus;
