//! External service clients
//!
//! This module contains the client for the remote chat backend.

pub mod chat;

// Re-export main types
pub use chat::{ChatClient, ChatError, Message, Role};
