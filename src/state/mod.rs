//! State management module
//!
//! This module contains the countdown engine, its clock and scheduler
//! boundary, and the application state shared with the HTTP layer.

pub mod app_state;
pub mod clock;
#[cfg(test)]
pub mod manual;
pub mod session;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, ChatOutcome};
pub use clock::{Clock, Scheduler, SystemClock, TickCallback, TickHandle};
#[cfg(test)]
pub use manual::{ManualClock, ManualScheduler};
pub use session::{Session, SessionDurations};
pub use timer_state::{CompletionPolicy, TimerEngine, TimerEvent, TimerSnapshot, TimerState};
