//! Background tasks module
//!
//! This module contains the tokio scheduler that drives the countdown and
//! the task that reacts to completed sessions.

pub mod completion_notifier;
pub mod ticker;

// Re-export main items
pub use completion_notifier::completion_notifier_task;
pub use ticker::TokioScheduler;
