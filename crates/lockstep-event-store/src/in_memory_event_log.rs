//! In-memory implementation of the `EventLog` trait.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use lockstep_core::error::DomainError;
use lockstep_core::event_log::{EventLog, StoredEvent};

use crate::error::AppendError;

/// Process-local event log. Appends cannot fail except on a sequencing
/// violation, which the version gate already rules out for the cache's own
/// writes.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored for an aggregate.
    #[must_use]
    pub fn stream_len(&self, aggregate_id: Uuid) -> usize {
        self.streams.lock().get(&aggregate_id).map_or(0, Vec::len)
    }

    /// Identifiers of every aggregate with at least one event.
    #[must_use]
    pub fn aggregate_ids(&self) -> Vec<Uuid> {
        self.streams.lock().keys().copied().collect()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, aggregate_id: Uuid, event: StoredEvent) -> Result<(), DomainError> {
        let mut streams = self.streams.lock();
        let stream = streams.entry(aggregate_id).or_default();
        let last = stream.last().map_or(0, |e| e.version);
        AppendError::check(aggregate_id, last, event.aggregate_id, event.version)?;
        debug!(%aggregate_id, version = event.version, event_type = %event.event_type, "event appended");
        stream.push(event);
        Ok(())
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams
            .lock()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }
}
