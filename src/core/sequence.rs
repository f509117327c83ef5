//! Allocation state: the last sequence issued per group key
//!
//! Reserving a sequence is a single read-modify-write. The in-memory store
//! holds a mutex across it; the SQLite store runs it inside an immediate
//! transaction so separate processes never observe the same counter.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use thiserror::Error;

use crate::core::identity::GroupKey;

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Persistent or in-process counter store keyed by group key
pub trait SequenceStore: Send + Sync {
    /// Last sequence issued for a group (0 if none)
    fn last_issued(&self, key: &GroupKey) -> Result<u32, SequenceStoreError>;

    /// Atomically issue the next sequence for a group.
    ///
    /// The issued value is always greater than both the stored counter and
    /// `floor`, so callers can pass the highest sequence they already see in
    /// their records.
    fn reserve(&self, key: &GroupKey, floor: u32) -> Result<u32, SequenceStoreError>;

    /// All known groups and their last issued sequence, ordered by key
    fn groups(&self) -> Result<Vec<(GroupKey, u32)>, SequenceStoreError>;
}

fn next_after(key: &GroupKey, last: u32, floor: u32) -> Result<u32, SequenceStoreError> {
    last.max(floor)
        .checked_add(1)
        .ok_or_else(|| SequenceStoreError::Overflow(key.to_string()))
}

/// Mutex-guarded store for tests and single-process use
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    counters: Mutex<BTreeMap<GroupKey, u32>>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceStore for MemorySequenceStore {
    fn last_issued(&self, key: &GroupKey) -> Result<u32, SequenceStoreError> {
        let counters = self
            .counters
            .lock()
            .map_err(|_| SequenceStoreError::Poisoned)?;
        Ok(counters.get(key).copied().unwrap_or(0))
    }

    fn reserve(&self, key: &GroupKey, floor: u32) -> Result<u32, SequenceStoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| SequenceStoreError::Poisoned)?;
        let last = counters.get(key).copied().unwrap_or(0);
        let next = next_after(key, last, floor)?;
        counters.insert(key.clone(), next);
        Ok(next)
    }

    fn groups(&self) -> Result<Vec<(GroupKey, u32)>, SequenceStoreError> {
        let counters = self
            .counters
            .lock()
            .map_err(|_| SequenceStoreError::Poisoned)?;
        Ok(counters.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}

/// SQLite-backed store at `.creg/sequences.db`
#[derive(Debug, Clone)]
pub struct SqliteSequenceStore {
    db_path: PathBuf,
}

impl SqliteSequenceStore {
    /// Open (creating if needed) the store at the given path
    pub fn open(db_path: &Path) -> Result<Self, SequenceStoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_connection(db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sequences (
                group_key TEXT PRIMARY KEY,
                last_issued INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn open_connection(path: &Path) -> Result<Connection, SequenceStoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

impl SequenceStore for SqliteSequenceStore {
    fn last_issued(&self, key: &GroupKey) -> Result<u32, SequenceStoreError> {
        let conn = open_connection(&self.db_path)?;
        let last: Option<u32> = conn
            .query_row(
                "SELECT last_issued FROM sequences WHERE group_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last.unwrap_or(0))
    }

    fn reserve(&self, key: &GroupKey, floor: u32) -> Result<u32, SequenceStoreError> {
        let mut conn = open_connection(&self.db_path)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: Option<u32> = tx
            .query_row(
                "SELECT last_issued FROM sequences WHERE group_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let next = next_after(key, last.unwrap_or(0), floor)?;

        tx.execute(
            "INSERT INTO sequences (group_key, last_issued, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(group_key) DO UPDATE SET last_issued = excluded.last_issued, \
             updated_at = excluded.updated_at",
            params![key.as_str(), next, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        tracing::debug!(group = %key, sequence = next, "reserved sequence");
        Ok(next)
    }

    fn groups(&self) -> Result<Vec<(GroupKey, u32)>, SequenceStoreError> {
        let conn = open_connection(&self.db_path)?;
        let mut stmt =
            conn.prepare("SELECT group_key, last_issued FROM sequences ORDER BY group_key")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let last: u32 = row.get(1)?;
            Ok((key, last))
        })?;

        let mut groups = Vec::new();
        for row in rows {
            let (key, last) = row?;
            groups.push((GroupKey::from_stored(key), last));
        }
        Ok(groups)
    }
}

#[derive(Debug, Error)]
pub enum SequenceStoreError {
    #[error("sequence counter for group '{0}' overflowed")]
    Overflow(String),

    #[error("sequence store lock poisoned")]
    Poisoned,

    #[error("sequence database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
