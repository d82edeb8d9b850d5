//! Mock record stores for unit testing without a database file.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use crate::store::{RecordStore, UserRecord};

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// In-memory store. `BTreeMap` gives the same stable key-ordered
/// iteration as the real store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<String, UserRecord>>>,
    flushes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the registry.
    pub fn seed(&self, sender_id: &str, record: UserRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(sender_id.to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, sender_id: &str) -> Result<Option<UserRecord>, Infallible> {
        Ok(self.records.lock().unwrap().get(sender_id).cloned())
    }

    fn put(&self, sender_id: &str, record: &UserRecord) -> Result<(), Infallible> {
        self.records
            .lock()
            .unwrap()
            .insert(sender_id.to_string(), record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<(String, UserRecord)>, Infallible> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> Result<(), Infallible> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── FailingStore ──────────────────────────────────────────────────────────────

/// Store whose every operation fails, for exercising persistence error
/// paths.
#[derive(Clone, Default)]
pub struct FailingStore;

#[derive(Debug)]
pub struct MockStoreError(pub &'static str);

impl std::fmt::Display for MockStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockStoreError {}

impl RecordStore for FailingStore {
    type Error = MockStoreError;

    fn get(&self, _sender_id: &str) -> Result<Option<UserRecord>, MockStoreError> {
        Err(MockStoreError("store unavailable"))
    }

    fn put(&self, _sender_id: &str, _record: &UserRecord) -> Result<(), MockStoreError> {
        Err(MockStoreError("store unavailable"))
    }

    fn records(&self) -> Result<Vec<(String, UserRecord)>, MockStoreError> {
        Err(MockStoreError("store unavailable"))
    }

    fn flush(&self) -> Result<(), MockStoreError> {
        Err(MockStoreError("store unavailable"))
    }
}
