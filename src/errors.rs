//! Error types for the pairing bot.
//!
//! A single closed enum so callers can tell a recoverable command mistake
//! (reply and move on) apart from fatal transport and storage failures.

#[derive(Debug)]
pub enum BotError {
    /// Zulip rejected the bot's credentials. Fatal.
    Authentication(String),
    /// The chat transport failed (network error, unexpected status).
    Transport(String),
    /// The record store failed to read, write or flush.
    Persistence(String),
    /// A payload could not be encoded or decoded.
    Serde(serde_json::Error),
    /// The message text does not start with a recognized command token.
    /// Carries the raw text so the reply can quote it verbatim.
    InvalidCommand(String),
    Io(std::io::Error),
}

impl BotError {
    /// Only invalid commands are recoverable: they produce a normal reply
    /// and the message loop keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidCommand(_))
    }
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication(msg) => write!(f, "Authentication error: {msg}"),
            Self::Transport(msg) => write!(f, "Transport error: {msg}"),
            Self::Persistence(msg) => write!(f, "Persistence error: {msg}"),
            Self::Serde(e) => write!(f, "Serialization error: {e}"),
            Self::InvalidCommand(raw) => write!(f, "Not a valid command: {raw}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for BotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serde(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e)
    }
}

impl From<std::io::Error> for BotError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
