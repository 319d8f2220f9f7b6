//! Domain error types.
//!
//! Version conflicts and rule violations are ordinary command outcomes
//! (see [`crate::outcome::CommandOutcome`]) and never appear here. The
//! variants below are faults: they stop processing of the affected
//! aggregate rather than let it continue on a broken stream.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An aggregate has no events and has never been created.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A replayed stream is missing a version or repeats one.
    #[error("replay gap on aggregate {aggregate_id}: expected version {expected}, found {found}")]
    ReplayGap {
        /// The aggregate being rebuilt.
        aggregate_id: Uuid,
        /// The version the fold needed next.
        expected: i64,
        /// The version actually present at that position.
        found: i64,
    },

    /// A replayed stream contains an event belonging to another aggregate.
    #[error("stream mismatch: expected events for aggregate {expected}, found {found}")]
    StreamMismatch {
        /// The aggregate being rebuilt.
        expected: Uuid,
        /// The aggregate named by the offending event.
        found: Uuid,
    },

    /// The event log refused or failed an append after the version gate
    /// had accepted the transition.
    #[error("log append failed on aggregate {aggregate_id} at version {version}: {reason}")]
    LogAppendFailure {
        /// The aggregate whose stream could not be extended.
        aggregate_id: Uuid,
        /// The version the rejected event carried.
        version: i64,
        /// Reason reported by the log.
        reason: String,
    },

    /// The aggregate is halted after an integrity fault and must be
    /// recovered from the event log before accepting commands again.
    #[error("aggregate {0} is quarantined pending recovery")]
    AggregateQuarantined(Uuid),

    /// A stored payload could not be decoded.
    #[error("event deserialization failed: {0}")]
    Deserialization(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
