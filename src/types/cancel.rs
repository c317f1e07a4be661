//! Cancellation reason and kind types.
//!
//! Cancellation in taskscope is attributed, never anonymous: every aborted
//! run records why it stopped. This module defines the types that describe
//! why cancellation occurred.

use core::fmt;

/// The kind of cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CancelKind {
    /// Explicit cancellation requested through `abort()`.
    User,
    /// A newer run of the same task displaced this one.
    Superseded,
    /// The record was reset while this run was pending.
    Reset,
    /// Cancellation due to the enclosing run's scope being aborted.
    ParentCancelled,
    /// The owning container is no longer live.
    Retired,
}

impl CancelKind {
    /// Returns the severity of this cancellation kind.
    ///
    /// Higher severity cancellations take precedence when strengthening.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Superseded => 1,
            Self::Reset => 2,
            Self::ParentCancelled => 3,
            Self::Retired => 4,
        }
    }
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Superseded => write!(f, "superseded"),
            Self::Reset => write!(f, "reset"),
            Self::ParentCancelled => write!(f, "parent cancelled"),
            Self::Retired => write!(f, "retired"),
        }
    }
}

/// The reason for a cancellation, including kind and optional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
}

impl CancelReason {
    /// Creates a new cancellation reason with the given kind.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a user cancellation reason with a message.
    #[must_use]
    pub const fn user(message: &'static str) -> Self {
        Self {
            kind: CancelKind::User,
            message: Some(message),
        }
    }

    /// Creates a superseded cancellation reason (a newer run displaced this one).
    #[must_use]
    pub const fn superseded() -> Self {
        Self::new(CancelKind::Superseded)
    }

    /// Creates a reset cancellation reason.
    #[must_use]
    pub const fn reset() -> Self {
        Self::new(CancelKind::Reset)
    }

    /// Creates a parent-cancelled cancellation reason.
    #[must_use]
    pub const fn parent_cancelled() -> Self {
        Self::new(CancelKind::ParentCancelled)
    }

    /// Creates a retired cancellation reason (container no longer live).
    #[must_use]
    pub const fn retired() -> Self {
        Self::new(CancelKind::Retired)
    }

    /// Strengthens this reason with another, keeping the more severe one.
    ///
    /// Returns `true` if the reason was changed.
    pub fn strengthen(&mut self, other: &Self) -> bool {
        if other.kind > self.kind {
            self.kind = other.kind;
            self.message = other.message;
            return true;
        }

        if other.kind < self.kind {
            return false;
        }

        match (self.message, other.message) {
            (None, Some(msg)) => {
                self.message = Some(msg);
                true
            }
            (Some(current), Some(candidate)) if candidate < current => {
                self.message = Some(candidate);
                true
            }
            _ => false,
        }
    }

    /// Returns the kind of this cancellation reason.
    #[must_use]
    pub const fn kind(&self) -> CancelKind {
        self.kind
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        Self::new(CancelKind::User)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(CancelKind::User.severity() < CancelKind::Superseded.severity());
        assert!(CancelKind::Superseded.severity() < CancelKind::Reset.severity());
        assert!(CancelKind::Reset.severity() < CancelKind::ParentCancelled.severity());
        assert!(CancelKind::ParentCancelled.severity() < CancelKind::Retired.severity());
    }

    #[test]
    fn strengthen_takes_more_severe() {
        let mut reason = CancelReason::new(CancelKind::User);
        assert!(reason.strengthen(&CancelReason::superseded()));
        assert_eq!(reason.kind, CancelKind::Superseded);

        assert!(reason.strengthen(&CancelReason::retired()));
        assert_eq!(reason.kind, CancelKind::Retired);

        // Less severe must not change the reason.
        assert!(!reason.strengthen(&CancelReason::reset()));
        assert_eq!(reason.kind, CancelKind::Retired);
    }

    #[test]
    fn strengthen_is_idempotent() {
        let mut reason = CancelReason::reset();
        assert!(!reason.strengthen(&CancelReason::reset()));
        assert_eq!(reason.kind, CancelKind::Reset);
    }

    #[test]
    fn strengthen_same_kind_picks_deterministic_message() {
        let mut reason = CancelReason::user("b");
        assert!(reason.strengthen(&CancelReason::user("a")));
        assert_eq!(reason.kind, CancelKind::User);
        assert_eq!(reason.message, Some("a"));
    }

    #[test]
    fn strengthen_resets_message_when_kind_increases() {
        let mut reason = CancelReason::user("please stop");
        assert!(reason.strengthen(&CancelReason::retired()));
        assert_eq!(reason.kind, CancelKind::Retired);
        assert_eq!(reason.message, None);
    }

    #[test]
    fn display_includes_message() {
        let reason = CancelReason::user("deadline passed");
        assert_eq!(format!("{reason}"), "user: deadline passed");
        assert_eq!(format!("{}", CancelReason::superseded()), "superseded");
    }
}
