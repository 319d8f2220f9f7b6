//! `PostgreSQL` implementation of the `EventLog` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use lockstep_core::error::DomainError;
use lockstep_core::event_log::{EventLog, StoredEvent};

use crate::error::AppendError;
use crate::schema::{INSERT_EVENT, SELECT_LAST_VERSION, SELECT_STREAM};

/// PostgreSQL-backed event log.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Creates a new `PgEventLog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_in_tx(&self, aggregate_id: Uuid, event: &StoredEvent) -> Result<(), AppendError> {
        let mut tx = self.pool.begin().await?;

        let last: Option<i64> = sqlx::query_scalar(SELECT_LAST_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await?;
        let last = last.unwrap_or(0);
        AppendError::check(aggregate_id, last, event.aggregate_id, event.version)?;

        let inserted = sqlx::query(INSERT_EVENT)
            .bind(event.event_id)
            .bind(event.aggregate_id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.version)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;
        match inserted {
            Ok(_) => {}
            // A concurrent writer took the same version between our read and
            // insert; the unique constraint is the final arbiter.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(AppendError::OutOfSequence {
                    aggregate_id,
                    last: event.version,
                    found: event.version,
                });
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_stored_event(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        version: row.try_get("version")?,
        correlation_id: row.try_get("correlation_id")?,
        causation_id: row.try_get("causation_id")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl EventLog for PgEventLog {
    #[instrument(skip_all, fields(aggregate_id = %aggregate_id, version = event.version))]
    async fn append(&self, aggregate_id: Uuid, event: StoredEvent) -> Result<(), DomainError> {
        self.append_in_tx(aggregate_id, &event).await?;
        debug!("event appended");
        Ok(())
    }

    #[instrument(skip_all, fields(aggregate_id = %aggregate_id))]
    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(SELECT_STREAM)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(format!("event loading failed: {e}")))?;
        rows.iter()
            .map(row_to_stored_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::Infrastructure(format!("event row decoding failed: {e}")))
    }
}
