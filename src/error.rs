//! Error types and error handling strategy for taskscope.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Cancellation is the only error kind a caller must special-case:
//!   gate refusal, abort-induced finalization, reset-while-pending, and
//!   retired containers all surface as `ErrorKind::Cancelled`
//! - Panics in task bodies are isolated and converted to
//!   `ErrorKind::Panicked` failures
//! - Stale-run suppression is silent: discarding an outdated finalization
//!   is an invariant of the runtime, never an error

use core::fmt;
use std::sync::Arc;

use crate::types::CancelReason;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation was cancelled.
    Cancelled,
    /// Domain error raised by a task body.
    User,
    /// The task body panicked.
    Panicked,
    /// Internal runtime error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns true if this kind represents cancellation.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// The main error type for taskscope operations.
#[derive(Debug, Clone)]
pub struct TaskError {
    kind: ErrorKind,
    reason: Option<CancelReason>,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl TaskError {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: None,
            message: None,
            source: None,
        }
    }

    /// Creates a cancellation error from a structured reason.
    #[must_use]
    pub fn cancelled(reason: CancelReason) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            reason: Some(reason),
            message: None,
            source: None,
        }
    }

    /// Creates a domain error with a message.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(message)
    }

    /// Creates an error for a caught body panic.
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panicked).with_message(message)
    }

    /// Creates an internal error (runtime bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns the cancellation reason, if this is a cancellation error.
    #[must_use]
    pub const fn reason(&self) -> Option<&CancelReason> {
        self.reason.as_ref()
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Extracts the cancellation reason, or gives the error back.
    ///
    /// A cancellation error without an attached reason yields the default
    /// user reason.
    pub fn take_reason(self) -> std::result::Result<CancelReason, Self> {
        if self.is_cancelled() {
            Ok(self.reason.unwrap_or_default())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.reason) {
            (ErrorKind::Cancelled, Some(reason)) => write!(f, "cancelled: {reason}")?,
            (ErrorKind::Cancelled, None) => write!(f, "cancelled")?,
            (kind, _) => write!(f, "{kind:?}")?,
        }
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// A specialized `Result` type for taskscope operations.
pub type Result<T> = std::result::Result<T, TaskError>;
