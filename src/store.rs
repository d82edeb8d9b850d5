//! Persistent per-user interest records.
//!
//! # Schema
//!
//! ```text
//! user_records: sender_id -> UserRecord (serde_json)
//! ```
//!
//! The store is the only durable state the bot has. Every mutating command
//! writes the record and flushes before the next message is consumed.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const USER_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_records");

/// One user's stored state, keyed by their stable sender id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name; last value observed on an `add` wins.
    pub full_name: String,
    /// Normalized (trimmed, lower-cased) interests. A set, so re-adding
    /// is a no-op and iteration order is deterministic.
    #[serde(default)]
    pub interests: BTreeSet<String>,
    /// Unix timestamp of the last mutation.
    #[serde(default)]
    pub updated_at: i64,
}

impl UserRecord {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            interests: BTreeSet::new(),
            updated_at: Utc::now().timestamp(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
    }
}

/// Errors from the redb-backed store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The injected mapping the interest registry operates on.
///
/// Four operations: point read, point write, full scan, durable flush.
/// `records` exists because search scans every record per query; no index
/// is maintained. Iteration order is the store's key order and is stable
/// for identical contents.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, sender_id: &str) -> Result<Option<UserRecord>, Self::Error>;

    fn put(&self, sender_id: &str, record: &UserRecord) -> Result<(), Self::Error>;

    fn records(&self) -> Result<Vec<(String, UserRecord)>, Self::Error>;

    fn flush(&self) -> Result<(), Self::Error>;
}

/// Embedded redb store. Each `put` is an atomic committed transaction.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the record database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        // Ensure the table exists so reads before the first write succeed.
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(USER_RECORDS)?;
        }
        txn.commit()?;

        info!(path = %path.display(), "record store opened");
        Ok(Self { db })
    }
}

impl RecordStore for RedbStore {
    type Error = StoreError;

    fn get(&self, sender_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USER_RECORDS)?;
        match table.get(sender_id)? {
            Some(raw) => {
                let record = serde_json::from_slice(raw.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put(&self, sender_id: &str, record: &UserRecord) -> Result<(), StoreError> {
        let value =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USER_RECORDS)?;
            table.insert(sender_id, value.as_slice())?;
        }
        txn.commit()?;

        debug!(sender_id, "record written");
        Ok(())
    }

    fn records(&self) -> Result<Vec<(String, UserRecord)>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USER_RECORDS)?;

        let mut out = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            let record = serde_json::from_slice(value.value())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            out.push((key.value().to_string(), record));
        }
        Ok(out)
    }

    fn flush(&self) -> Result<(), StoreError> {
        // Commits are already durable; an empty committed transaction
        // guarantees everything before it is on disk.
        let txn = self.db.begin_write()?;
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> RedbStore {
        RedbStore::open(&dir.path().join("records.redb")).expect("open store")
    }

    fn record(name: &str, interests: &[&str]) -> UserRecord {
        let mut r = UserRecord::new(name);
        r.interests = interests.iter().map(|s| s.to_string()).collect();
        r
    }

    #[test]
    fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.get("42").unwrap(), None);
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let r = record("Ada Lovelace", &["ocaml", "rust"]);
        store.put("42", &r).unwrap();

        let back = store.get("42").unwrap().expect("record exists");
        assert_eq!(back, r);
    }

    #[test]
    fn test_put_overwrites_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.put("42", &record("Old Name", &["go"])).unwrap();
        store.put("42", &record("New Name", &["rust"])).unwrap();

        let back = store.get("42").unwrap().unwrap();
        assert_eq!(back.full_name, "New Name");
        assert!(back.interests.contains("rust"));
        assert!(!back.interests.contains("go"));
    }

    #[test]
    fn test_records_iterates_in_key_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.put("30", &record("C", &[])).unwrap();
        store.put("10", &record("A", &[])).unwrap();
        store.put("20", &record("B", &[])).unwrap();

        let keys: Vec<String> = store.records().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["10", "20", "30"]);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.put("42", &record("Ada Lovelace", &["rust"])).unwrap();
            store.flush().unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        let back = store.get("42").unwrap().expect("record persisted");
        assert_eq!(back.full_name, "Ada Lovelace");
        assert!(back.interests.contains("rust"));
    }

    #[test]
    fn test_flush_on_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.flush().unwrap();
    }

    #[test]
    fn test_record_deserializes_without_optional_fields() {
        let r: UserRecord = serde_json::from_str(r#"{"full_name":"Ada"}"#).unwrap();
        assert_eq!(r.full_name, "Ada");
        assert!(r.interests.is_empty());
        assert_eq!(r.updated_at, 0);
    }
}
