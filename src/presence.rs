use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest status note the messaging protocol will carry, in bytes
pub const MAX_NOTE_LENGTH: usize = 1007;

/// Presence status broadcast to peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Online,
    Away,
    Busy,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Away => "away",
            UserStatus::Busy => "busy",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(UserStatus::Online),
            "away" => Ok(UserStatus::Away),
            "busy" => Ok(UserStatus::Busy),
            other => Err(CommandError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: /status <online|away|busy> [\"note\"]")]
    Usage,

    #[error("invalid status: {0}")]
    UnknownStatus(String),
}

/// `/status <status> ["note"]`
static RE_STATUS_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^/status\s+(\S+)(?:\s+(.*?))?\s*$"#).unwrap());

/// A status change, as issued by the user or by auto-away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCommand {
    pub status: UserStatus,
    /// New note; `None` keeps the current one
    pub note: Option<String>,
}

impl StatusCommand {
    pub fn new(status: UserStatus, note: impl Into<String>) -> Self {
        Self {
            status,
            note: Some(truncate_note(&note.into()).to_string()),
        }
    }

    pub fn status_only(status: UserStatus) -> Self {
        Self { status, note: None }
    }

    /// Parse a `/status` command line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let caps = RE_STATUS_COMMAND
            .captures(line.trim())
            .ok_or(CommandError::Usage)?;

        let status: UserStatus = caps[1].parse()?;
        match caps.get(2) {
            Some(note) if !note.as_str().is_empty() => {
                Ok(Self::new(status, unquote(note.as_str())))
            }
            _ => Ok(Self::status_only(status)),
        }
    }
}

impl fmt::Display for StatusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.note {
            Some(note) => write!(f, "/status {} \"{}\"", self.status, note),
            None => write!(f, "/status {}", self.status),
        }
    }
}

/// Strip one pair of surrounding double quotes
pub fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Clip a note to `MAX_NOTE_LENGTH` bytes on a char boundary
pub fn truncate_note(note: &str) -> &str {
    if note.len() <= MAX_NOTE_LENGTH {
        return note;
    }
    let mut end = MAX_NOTE_LENGTH;
    while !note.is_char_boundary(end) {
        end -= 1;
    }
    &note[..end]
}

/// The application's presence API, as seen by auto-away.
///
/// Implementors are shared behind the application's interaction lock; every
/// call happens with that lock held.
pub trait PresenceHost: Send {
    fn status(&self) -> UserStatus;

    fn note(&self) -> String;

    /// Apply a status change through the same path a user command takes
    fn run_status_command(&mut self, command: &StatusCommand);
}
