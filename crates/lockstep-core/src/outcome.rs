//! Command outcomes.
//!
//! A version conflict and a domain rule violation are expected results of
//! issuing a command, so they are modelled as values rather than errors.

use thiserror::Error;
use uuid::Uuid;

/// The result of a command that reached the aggregate cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome<S> {
    /// The gate accepted the transition; the event is in the log and the
    /// cache publishes `new_state`.
    Accepted {
        /// The state published by this transition.
        new_state: S,
    },
    /// The caller's snapshot was stale. Nothing was written; re-fetch and
    /// retry.
    Conflict {
        /// The aggregate that was contended.
        aggregate_id: Uuid,
        /// The version the caller's snapshot carried.
        attempted_version: i64,
        /// The live gate version at the time of the attempt.
        current_version: i64,
    },
    /// The command is not valid for the aggregate's current state.
    DomainRuleViolation {
        /// Why the command was refused.
        reason: String,
    },
}

impl<S> CommandOutcome<S> {
    /// Returns the published state if the command was accepted.
    #[must_use]
    pub fn accepted(self) -> Option<S> {
        match self {
            Self::Accepted { new_state } => Some(new_state),
            Self::Conflict { .. } | Self::DomainRuleViolation { .. } => None,
        }
    }

    /// Whether the command lost a version race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Refusal produced by a domain decision before any version is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct RuleViolation {
    /// Why the command was refused.
    pub reason: String,
}

impl RuleViolation {
    /// Creates a violation with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
