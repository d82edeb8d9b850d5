//! Interest registry: the data operations behind each command.
//!
//! Owns the record store. Every mutating operation is fetch → mutate →
//! put → flush, completed before the next message is processed, and every
//! operation returns the human-readable reply text.

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::command::{normalize, Command};
use crate::errors::BotError;
use crate::store::{RecordStore, UserRecord};

pub struct InterestRegistry<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> InterestRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Dispatch a parsed command for a sender and produce the reply text.
    pub fn dispatch(
        &self,
        command: &Command,
        sender_id: &str,
        full_name: &str,
    ) -> Result<String, BotError> {
        match command {
            Command::Add { interests } => self.add(interests, sender_id, full_name),
            Command::Remove { interests } => self.remove(interests, sender_id),
            Command::List => self.list(sender_id),
            Command::Search { terms } => self.search(terms),
            Command::Help => Ok(help()),
        }
    }

    /// Union the given interests into the sender's record and remember
    /// their display name. Re-adding an existing interest is a no-op.
    pub fn add(
        &self,
        interests: &[String],
        sender_id: &str,
        full_name: &str,
    ) -> Result<String, BotError> {
        let interests = effective(interests);

        let mut record = self
            .fetch(sender_id)?
            .unwrap_or_else(|| UserRecord::new(full_name));
        record.full_name = full_name.to_string();
        for interest in &interests {
            record.interests.insert(interest.clone());
        }
        record.touch();
        self.persist(sender_id, &record)?;

        info!(sender_id, interests = ?record.interests, "interests saved");
        Ok(format!("Saved {}", interests.join(", ")))
    }

    /// Remove matching interests. An absent record behaves as an empty
    /// interest set and nothing is created. The reply names both the
    /// effective removal list and the set as it was before removal.
    pub fn remove(&self, interests: &[String], sender_id: &str) -> Result<String, BotError> {
        let interests = effective(interests);

        let Some(mut record) = self.fetch(sender_id)? else {
            return Ok(removed_reply(&interests, &BTreeSet::new()));
        };

        let prior = record.interests.clone();
        for interest in &interests {
            record.interests.remove(interest);
        }
        record.touch();
        self.persist(sender_id, &record)?;

        info!(sender_id, interests = ?record.interests, "interests updated");
        Ok(removed_reply(&interests, &prior))
    }

    /// Read-only: render the sender's current interests as a bullet list.
    pub fn list(&self, sender_id: &str) -> Result<String, BotError> {
        let interests = self
            .fetch(sender_id)?
            .map(|record| record.interests)
            .unwrap_or_default();

        if interests.is_empty() {
            return Ok(
                "You're not interested in pairing on anything yet. \
                 Send `add <topic>` to register an interest."
                    .to_string(),
            );
        }

        let mut reply = String::from("You're currently interested in pairing on:");
        for interest in &interests {
            reply.push_str("\n- ");
            reply.push_str(interest);
        }
        Ok(reply)
    }

    /// Scan every stored record for interests containing any query term
    /// (case-insensitive substring). Each matching record contributes one
    /// line listing every interest of theirs that matched.
    pub fn search(&self, terms: &[String]) -> Result<String, BotError> {
        let terms = effective(terms);
        let queried = terms.join(", ");

        let mut lines = Vec::new();
        for (sender_id, record) in self.all()? {
            // Term-major so matches group by query argument, as replies
            // have always read.
            let mut matched: Vec<&str> = Vec::new();
            for term in &terms {
                for interest in &record.interests {
                    if interest.contains(term.as_str()) && !matched.contains(&interest.as_str()) {
                        matched.push(interest);
                    }
                }
            }
            if !matched.is_empty() {
                debug!(sender_id = %sender_id, ?matched, "search hit");
                lines.push(format!(
                    "{} is interested in {}",
                    record.full_name,
                    matched.join(", ")
                ));
            }
        }

        if lines.is_empty() {
            return Ok(format!(
                "Sorry, I did not find any one who is interested in {queried} :("
            ));
        }

        Ok(format!(
            "The following people are interested in {queried}:\n{}",
            lines.join("\n")
        ))
    }

    fn fetch(&self, sender_id: &str) -> Result<Option<UserRecord>, BotError> {
        self.store
            .get(sender_id)
            .map_err(|e| BotError::Persistence(e.to_string()))
    }

    fn persist(&self, sender_id: &str, record: &UserRecord) -> Result<(), BotError> {
        self.store
            .put(sender_id, record)
            .map_err(|e| BotError::Persistence(e.to_string()))?;
        self.store
            .flush()
            .map_err(|e| BotError::Persistence(e.to_string()))
    }

    fn all(&self) -> Result<Vec<(String, UserRecord)>, BotError> {
        self.store
            .records()
            .map_err(|e| BotError::Persistence(e.to_string()))
    }
}

/// Static command reference. Pure function, no store access.
pub fn help() -> String {
    concat!(
        "To use Pairing Bot, send it a PM using the commands below:\n",
        "\n",
        "Command | Description\n",
        ":--- | :---\n",
        "`add or a <comma separated topics>` | Adds the topics to your list of interests. Example: `add haskell` or `add clojure, js`\n",
        "`remove, r or rm <comma separated topics>` | Removes the topics from your list of interests if present. Example: `remove js` or `remove js, erlang`\n",
        "`search or s <comma separated topics>` | Lists people interested in one or more of the topics. Example: `search js, python`\n",
        "`list, l or ls` | Lists your currently saved interests\n",
        "`help or h` | Shows this table\n",
        "\n",
        "Made with :heart_decoration: at Recurse Center\n",
    )
    .to_string()
}

/// Normalize an argument list and drop pieces that end up empty. The
/// result is the "effective" list that replies report.
fn effective(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| normalize(arg))
        .filter(|arg| !arg.is_empty())
        .collect()
}

fn removed_reply(removed: &[String], prior: &BTreeSet<String>) -> String {
    let prior: Vec<&str> = prior.iter().map(String::as_str).collect();
    format!("Removed {} from {}", removed.join(", "), prior.join(", "))
}
