//! The task status machine.
//!
//! A task record moves through five states:
//!
//! ```text
//! Init --run--> Pending
//! Pending --settle success--> Complete
//! Pending --settle failure--> Failed
//! Pending --settle cancelled--> Aborted
//! Complete|Failed|Aborted --run--> Pending   (fresh run)
//! any --reset--> Init
//! ```
//!
//! `Complete`, `Failed`, and `Aborted` are terminal: a record in one of
//! them only leaves it through a fresh run or a reset.

use core::fmt;

/// The lifecycle state of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskStatus {
    /// No run has been started since creation or the last reset.
    Init,
    /// A run is in flight.
    Pending,
    /// The last run returned a value.
    Complete,
    /// The last run failed with a domain error.
    Failed,
    /// The last run was cancelled.
    Aborted,
}

impl TaskStatus {
    /// Returns true if this status is terminal (a run has settled).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Aborted)
    }

    /// Returns true if a run is currently in flight.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if a new run may start from this status.
    ///
    /// Every status admits a new run; a pending one is displaced first.
    #[must_use]
    pub const fn can_start(self) -> bool {
        true
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Pending => write!(f, "pending"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminality() {
        assert!(!TaskStatus::Init.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(TaskStatus::Complete.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Aborted.is_terminal());
    }

    #[test]
    fn pending_predicate() {
        assert!(TaskStatus::Pending.is_pending());
        assert!(!TaskStatus::Init.is_pending());
        assert!(!TaskStatus::Aborted.is_pending());
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("{}", TaskStatus::Init), "init");
        assert_eq!(format!("{}", TaskStatus::Pending), "pending");
        assert_eq!(format!("{}", TaskStatus::Complete), "complete");
        assert_eq!(format!("{}", TaskStatus::Failed), "failed");
        assert_eq!(format!("{}", TaskStatus::Aborted), "aborted");
    }
}
