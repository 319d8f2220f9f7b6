//! Lockstep API — HTTP surface over the order service.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
