//! Event log implementations for Lockstep.
//!
//! `InMemoryEventLog` keeps streams in process memory; `PgEventLog` stores
//! them in PostgreSQL. Both refuse an append that does not extend its
//! stream by exactly one version.

pub mod error;
pub mod in_memory_event_log;
pub mod pg_event_log;
pub mod schema;
