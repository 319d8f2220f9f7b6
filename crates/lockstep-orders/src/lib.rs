//! Lockstep — Order bounded context.
//!
//! An order collects line items, carries a running total that is flagged
//! stale whenever the items change, and moves through the lifecycle
//! `Uninitialized -> Open -> Closed | Cancelled`.

pub mod application;
pub mod domain;
