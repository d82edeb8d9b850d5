//! Command parsing for inbound private messages.
//!
//! Raw message text becomes a `Command` variant carrying its parsed
//! argument payload, or `BotError::InvalidCommand` with the original text.

#[cfg(test)]
#[path = "command_tests.rs"]
mod command_tests;

use crate::errors::BotError;

/// A recognized bot command with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add` / `a` — register interests.
    Add { interests: Vec<String> },
    /// `remove` / `r` / `rm` — drop interests.
    Remove { interests: Vec<String> },
    /// `list` / `l` / `ls` — show the sender's interests.
    List,
    /// `search` / `s` — find people interested in any of the terms.
    Search { terms: Vec<String> },
    /// `help` / `h` — command reference.
    Help,
}

impl Command {
    /// Parse raw message text into a command.
    ///
    /// The first whitespace-delimited word selects the command,
    /// case-insensitively; everything after it is the argument tail,
    /// trimmed and lower-cased. `list` and `help` accept and ignore a
    /// tail. Text that does not start with a known token yields
    /// `BotError::InvalidCommand` carrying the text verbatim.
    pub fn parse(text: &str) -> Result<Command, BotError> {
        let trimmed = text.trim();
        let (token, tail) = match trimmed.split_once(char::is_whitespace) {
            Some((token, tail)) => (token, tail),
            None => (trimmed, ""),
        };
        let tail = tail.trim().to_lowercase();

        match token.to_lowercase().as_str() {
            "add" | "a" => Ok(Command::Add {
                interests: split_args(&tail),
            }),
            "remove" | "r" | "rm" => Ok(Command::Remove {
                interests: split_args(&tail),
            }),
            "list" | "l" | "ls" => Ok(Command::List),
            "search" | "s" => Ok(Command::Search {
                terms: split_args(&tail),
            }),
            "help" | "h" => Ok(Command::Help),
            _ => Err(BotError::InvalidCommand(text.to_string())),
        }
    }
}

/// Split a comma-separated argument tail into terms: trim each piece,
/// drop empties, preserve order.
///
/// Only literal comma-separated terms are supported; boolean operators
/// (and/or) remain future work.
pub fn split_args(tail: &str) -> Vec<String> {
    tail.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized form used for every interest comparison: trimmed and
/// lower-cased, nothing else (no stemming, no punctuation stripping).
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
