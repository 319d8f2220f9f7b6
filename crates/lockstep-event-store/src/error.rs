//! Append refusals shared by the event log implementations.

use lockstep_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Why a log refused to extend a stream.
#[derive(Debug, Error)]
pub enum AppendError {
    /// The event is addressed to a different stream than the append call.
    #[error("event belongs to aggregate {found}, not {expected}")]
    WrongStream {
        /// The stream named by the append call.
        expected: Uuid,
        /// The aggregate named by the event.
        found: Uuid,
    },

    /// The event does not extend the stream by exactly one version.
    #[error("version {found} does not follow last stored version {last} of aggregate {aggregate_id}")]
    OutOfSequence {
        /// The stream being appended to.
        aggregate_id: Uuid,
        /// The last version already stored.
        last: i64,
        /// The version carried by the event.
        found: i64,
    },

    /// The backing store failed.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AppendError {
    pub(crate) fn check(aggregate_id: Uuid, last: i64, event_aggregate_id: Uuid, version: i64) -> Result<(), Self> {
        if event_aggregate_id != aggregate_id {
            return Err(Self::WrongStream {
                expected: aggregate_id,
                found: event_aggregate_id,
            });
        }
        if version != last + 1 {
            return Err(Self::OutOfSequence {
                aggregate_id,
                last,
                found: version,
            });
        }
        Ok(())
    }
}

impl From<AppendError> for DomainError {
    fn from(err: AppendError) -> Self {
        DomainError::Infrastructure(err.to_string())
    }
}
