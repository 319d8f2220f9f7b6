//! Minimal aggregate used by this crate's unit tests.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateState;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};
use crate::event_log::StoredEvent;

pub(crate) const INCREMENTED_EVENT_TYPE: &str = "counter.incremented";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Counter {
    pub id: Uuid,
    pub version: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Incremented {
    pub by: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct CounterEvent {
    pub metadata: EventMetadata,
    pub kind: Incremented,
}

impl DomainEvent for CounterEvent {
    fn event_type(&self) -> &str {
        INCREMENTED_EVENT_TYPE
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).expect("Incremented serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DomainError::Deserialization(e.to_string()))?;
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}

impl AggregateState for Counter {
    type Event = CounterEvent;

    fn initial(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            total: 0,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&self, event: &CounterEvent) -> Self {
        Self {
            id: self.id,
            version: event.metadata.version,
            total: self.total + event.kind.by,
        }
    }
}

pub(crate) fn counter_event(aggregate_id: Uuid, version: i64, by: i64) -> CounterEvent {
    let correlation_id = Uuid::new_v4();
    CounterEvent {
        metadata: EventMetadata {
            event_id: Uuid::new_v4(),
            event_type: INCREMENTED_EVENT_TYPE.to_owned(),
            aggregate_id,
            version,
            correlation_id,
            causation_id: correlation_id,
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        },
        kind: Incremented { by },
    }
}
