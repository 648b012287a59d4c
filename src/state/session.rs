//! Session variants and their nominal durations

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One named countdown configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Session {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Session {
    pub const ALL: [Session; 3] = [Session::Focus, Session::ShortBreak, Session::LongBreak];

    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Focus => "focus",
            Session::ShortBreak => "short-break",
            Session::LongBreak => "long-break",
        }
    }

    /// Session selected after this one completes when auto-advance is on
    pub fn next(self) -> Session {
        match self {
            Session::Focus => Session::ShortBreak,
            Session::ShortBreak | Session::LongBreak => Session::Focus,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Session {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "focus" | "pomodoro" => Ok(Session::Focus),
            "short-break" | "short_break" | "short" => Ok(Session::ShortBreak),
            "long-break" | "long_break" | "long" => Ok(Session::LongBreak),
            other => Err(format!("Unknown session: {}", other)),
        }
    }
}

/// Nominal duration of each session in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDurations {
    pub focus: u64,
    pub short_break: u64,
    pub long_break: u64,
}

impl SessionDurations {
    pub fn new(focus: u64, short_break: u64, long_break: u64) -> Self {
        Self {
            focus,
            short_break,
            long_break,
        }
    }

    pub fn nominal(&self, session: Session) -> u64 {
        match session {
            Session::Focus => self.focus,
            Session::ShortBreak => self.short_break,
            Session::LongBreak => self.long_break,
        }
    }
}

impl Default for SessionDurations {
    fn default() -> Self {
        Self::new(1500, 300, 900)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("focus".parse::<Session>().unwrap(), Session::Focus);
        assert_eq!("Pomodoro".parse::<Session>().unwrap(), Session::Focus);
        assert_eq!("short-break".parse::<Session>().unwrap(), Session::ShortBreak);
        assert_eq!("long".parse::<Session>().unwrap(), Session::LongBreak);
        assert!("nap".parse::<Session>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for session in Session::ALL {
            assert_eq!(session.to_string().parse::<Session>().unwrap(), session);
        }
    }

    #[test]
    fn next_alternates_focus_and_break() {
        assert_eq!(Session::Focus.next(), Session::ShortBreak);
        assert_eq!(Session::ShortBreak.next(), Session::Focus);
        assert_eq!(Session::LongBreak.next(), Session::Focus);
    }

    #[test]
    fn default_durations() {
        let durations = SessionDurations::default();
        assert_eq!(durations.nominal(Session::Focus), 1500);
        assert_eq!(durations.nominal(Session::ShortBreak), 300);
        assert_eq!(durations.nominal(Session::LongBreak), 900);
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&Session::ShortBreak).unwrap();
        assert_eq!(json, "\"short-break\"");
    }
}
