//! Lockstep Core — version-gated aggregate cache and replay abstractions.
//!
//! This crate defines the traits and primitives every bounded context
//! builds on: the version gate, the aggregate cache that publishes state
//! only through that gate, the replay fold used on cold start, and the
//! event log contract. It contains no infrastructure code.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod event_log;
pub mod gate;
pub mod outcome;
pub mod replay;

#[cfg(test)]
pub(crate) mod testing;
