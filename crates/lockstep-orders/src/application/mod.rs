//! Application services for the Order context.

pub mod command_handlers;
pub mod query_handlers;
pub mod service;
