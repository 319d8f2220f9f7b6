//! Event store database schema.

/// SQL to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS domain_events (
    event_id        UUID PRIMARY KEY,
    aggregate_id    UUID NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    version         BIGINT NOT NULL CHECK (version > 0),
    correlation_id  UUID NOT NULL,
    causation_id    UUID NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS idx_domain_events_correlation_id
    ON domain_events (correlation_id);
";

/// Selects a full stream in version order.
pub(crate) const SELECT_STREAM: &str = r"
SELECT event_id, aggregate_id, event_type, payload, version,
       correlation_id, causation_id, occurred_at
FROM domain_events
WHERE aggregate_id = $1
ORDER BY version ASC
";

/// Reads the highest version stored for a stream.
pub(crate) const SELECT_LAST_VERSION: &str =
    "SELECT MAX(version) FROM domain_events WHERE aggregate_id = $1";

/// Inserts one event.
pub(crate) const INSERT_EVENT: &str = r"
INSERT INTO domain_events
    (event_id, aggregate_id, event_type, payload, version,
     correlation_id, causation_id, occurred_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";
