//! Pomodoro Chat - A focus-session countdown timer with an assistant chat proxy
//!
//! This library provides a drift-free countdown engine over focus and break
//! sessions, plus an HTTP surface that drives it and forwards chat messages
//! to a remote assistant backend.

pub mod config;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{AppState, Session, TimerEngine, TimerEvent};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
