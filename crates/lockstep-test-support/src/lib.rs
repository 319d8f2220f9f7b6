//! Shared test doubles for the Lockstep aggregate engine.

mod clock;
mod event_log;

pub use clock::{FixedClock, SteppingClock};
pub use event_log::{FailingEventLog, PausingEventLog, RecordingEventLog};
