//! Configuration and CLI argument handling

use std::time::Duration;
use clap::Parser;

use crate::state::{CompletionPolicy, SessionDurations};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "pomodoro-chat")]
#[command(about = "A focus-session countdown timer with an assistant chat proxy")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Focus session length in seconds
    #[arg(long, default_value = "1500", value_parser = clap::value_parser!(u64).range(1..3600))]
    pub focus_secs: u64,

    /// Short break length in seconds
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..3600))]
    pub short_break_secs: u64,

    /// Long break length in seconds
    #[arg(long, default_value = "900", value_parser = clap::value_parser!(u64).range(1..3600))]
    pub long_break_secs: u64,

    /// Select the next session automatically when one completes
    #[arg(long)]
    pub auto_advance: bool,

    /// Ask the chat assistant for advice when a session completes
    #[arg(long)]
    pub notify_assistant: bool,

    /// Chat backend endpoint
    #[arg(long, default_value = "http://127.0.0.1:3000/api/chat")]
    pub chat_url: String,

    /// Chat backend request timeout in seconds
    #[arg(long, default_value = "30")]
    pub chat_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn durations(&self) -> SessionDurations {
        SessionDurations::new(self.focus_secs, self.short_break_secs, self.long_break_secs)
    }

    pub fn completion_policy(&self) -> CompletionPolicy {
        if self.auto_advance {
            CompletionPolicy::AutoAdvance
        } else {
            CompletionPolicy::Stay
        }
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }
}
