//! Replay engine: rebuilds aggregate state by folding its event stream.

use uuid::Uuid;

use crate::aggregate::AggregateState;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::event_log::StoredEvent;

/// Folds `events` over the zero state of `aggregate_id`.
///
/// The stream must be in log order and carry versions exactly `1..=N`.
/// A gap, a duplicate or an out-of-order entry is an integrity fault and
/// fails the whole rebuild; nothing is skipped or guessed. The fold keeps
/// no cursor, so calling it again on the same input yields the same state.
///
/// # Errors
///
/// Returns `DomainError::ReplayGap` if versions are not contiguous from 1,
/// or `DomainError::StreamMismatch` if an event names another aggregate.
pub fn rebuild<S: AggregateState>(aggregate_id: Uuid, events: &[S::Event]) -> Result<S, DomainError> {
    events
        .iter()
        .try_fold(S::initial(aggregate_id), |state, event| {
            check_next(aggregate_id, state.version() + 1, event)?;
            Ok(state.apply(event))
        })
}

/// Decodes stored events and folds them with [`rebuild`].
///
/// # Errors
///
/// Returns `DomainError::Deserialization` if a payload cannot be decoded,
/// otherwise the same errors as [`rebuild`].
pub fn rebuild_stored<S: AggregateState>(
    aggregate_id: Uuid,
    stored: &[StoredEvent],
) -> Result<S, DomainError> {
    let events = stored
        .iter()
        .map(<S::Event as DomainEvent>::from_stored)
        .collect::<Result<Vec<_>, _>>()?;
    rebuild(aggregate_id, &events)
}

fn check_next<E: DomainEvent>(aggregate_id: Uuid, expected: i64, event: &E) -> Result<(), DomainError> {
    let meta = event.metadata();
    if meta.aggregate_id != aggregate_id {
        return Err(DomainError::StreamMismatch {
            expected: aggregate_id,
            found: meta.aggregate_id,
        });
    }
    if meta.version != expected {
        return Err(DomainError::ReplayGap {
            aggregate_id,
            expected,
            found: meta.version,
        });
    }
    Ok(())
}
