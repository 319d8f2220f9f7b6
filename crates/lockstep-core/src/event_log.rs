//! Event log abstraction.
//!
//! The log is append-only and ordered by version within each aggregate
//! stream. The aggregate cache only appends after a version gate has
//! accepted the transition, and only reads whole streams on cold start.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Version the aggregate reaches with this event.
    pub version: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only, per-aggregate ordered event store.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends a single event to the end of an aggregate stream.
    ///
    /// Implementations must refuse an event whose version is not exactly
    /// one past the last version already stored for the aggregate.
    async fn append(&self, aggregate_id: Uuid, event: StoredEvent) -> Result<(), DomainError>;

    /// Reads the full stream of an aggregate, ordered by version.
    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;
}
