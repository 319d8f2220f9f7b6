//! Test event logs — `EventLog` implementations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lockstep_core::error::DomainError;
use lockstep_core::event_log::{EventLog, StoredEvent};
use tokio::sync::Notify;
use uuid::Uuid;

/// An event log that keeps every append in memory, in arrival order, and
/// serves `read_all` from what it holds. It performs no sequencing checks,
/// so tests can seed it with broken streams.
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    events: Mutex<Vec<StoredEvent>>,
}

impl RecordingEventLog {
    /// Create an empty recording log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that already holds `events`.
    #[must_use]
    pub fn with_events(events: Vec<StoredEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    /// Returns a snapshot of every event held, seeded ones included.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventLog for RecordingEventLog {
    async fn append(&self, _aggregate_id: Uuid, event: StoredEvent) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }
}

/// An event log that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn append(&self, _aggregate_id: Uuid, _event: StoredEvent) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn read_all(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Wraps another log and holds the append of one version until released.
///
/// Lets a test park a winning command between the version gate and the
/// publish, so other commands observe the pre-commit snapshot.
pub struct PausingEventLog {
    inner: Arc<dyn EventLog>,
    pause_at: i64,
    entered: Notify,
    release: Notify,
}

impl std::fmt::Debug for PausingEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PausingEventLog")
            .field("pause_at", &self.pause_at)
            .finish_non_exhaustive()
    }
}

impl PausingEventLog {
    /// Pause the append that carries `pause_at`.
    #[must_use]
    pub fn new(inner: Arc<dyn EventLog>, pause_at: i64) -> Self {
        Self {
            inner,
            pause_at,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Waits until the paused append has been reached.
    pub async fn wait_until_paused(&self) {
        self.entered.notified().await;
    }

    /// Lets the paused append continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl EventLog for PausingEventLog {
    async fn append(&self, aggregate_id: Uuid, event: StoredEvent) -> Result<(), DomainError> {
        if event.version == self.pause_at {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.append(aggregate_id, event).await
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_all(aggregate_id).await
    }
}
