//! Aggregate state abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Materialized state of one aggregate instance.
///
/// State is a value: `apply` never mutates `self` and always returns the
/// successor. The same `(state, event)` pair must always produce the same
/// successor, so that folding a stream from [`AggregateState::initial`]
/// reproduces exactly what the synchronous command path published.
pub trait AggregateState: Clone + PartialEq + Send + Sync + std::fmt::Debug {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The zero state of an aggregate that has seen no events.
    fn initial(id: Uuid) -> Self;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the version of the last applied event, 0 before any.
    fn version(&self) -> i64;

    /// Returns the successor state after `event`.
    #[must_use]
    fn apply(&self, event: &Self::Event) -> Self;
}
