//! Utility functions module
//!
//! This module contains time formatting helpers and signal handling.

pub mod format;
pub mod signals;

// Re-export main functions
pub use format::{format_clock, format_uptime};
pub use signals::shutdown_signal;
