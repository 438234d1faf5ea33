use crate::append_log::AppendLog;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tether_core::{Result, ShortCode, UrlRecord};
use tracing::trace;

struct IndexState {
    records: HashMap<ShortCode, UrlRecord>,
    log: AppendLog,
}

/// The in-memory `short code -> record` index paired with its durable log.
///
/// One reader/writer lock covers both. Every insert appends to the log and
/// updates the map inside the same write section, so the two never
/// diverge. A code already present is never appended again, which makes
/// this the dedup layer in front of the log: concurrent saves of one URL
/// serialize on the lock and only the first writer appends.
///
/// The lock is synchronous and its guards are not `Send`, so it can never
/// be held across an `.await` on backend I/O.
pub struct DurableIndex {
    state: RwLock<IndexState>,
}

impl DurableIndex {
    /// Opens the log at `path` and rebuilds the index from it.
    ///
    /// Later lines for a code replace earlier ones, but a tombstone seen on
    /// any line survives.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (log, replayed) = AppendLog::open(path)?;

        let mut records: HashMap<ShortCode, UrlRecord> = HashMap::with_capacity(replayed.len());
        for mut record in replayed {
            if let Some(previous) = records.get(&record.short_code) {
                record.deleted |= previous.deleted;
            }
            records.insert(record.short_code.clone(), record);
        }

        Ok(Self {
            state: RwLock::new(IndexState { records, log }),
        })
    }

    /// Returns a copy of the record for `code`, if indexed.
    pub fn get(&self, code: &str) -> Option<UrlRecord> {
        self.state.read().records.get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.state.read().records.contains_key(code)
    }

    /// Appends `record` to the log and indexes it, unless its code is
    /// already indexed.
    ///
    /// Returns `true` if this call appended. If the append fails the
    /// record is not indexed either.
    pub fn insert_if_absent(&self, record: UrlRecord) -> Result<bool> {
        if self.contains(record.short_code.as_str()) {
            trace!(code = %record.short_code, "already indexed, skipping log append");
            return Ok(false);
        }

        let mut state = self.state.write();
        Self::insert_locked(&mut state, record)
    }

    /// Like [`insert_if_absent`](Self::insert_if_absent) for many records
    /// under one write section. Returns how many were appended.
    pub fn insert_all_if_absent(&self, records: impl IntoIterator<Item = UrlRecord>) -> Result<usize> {
        let mut state = self.state.write();
        let mut appended = 0;
        for record in records {
            if Self::insert_locked(&mut state, record)? {
                appended += 1;
            }
        }
        Ok(appended)
    }

    fn insert_locked(state: &mut IndexState, record: UrlRecord) -> Result<bool> {
        if state.records.contains_key(&record.short_code) {
            trace!(code = %record.short_code, "already indexed, skipping log append");
            return Ok(false);
        }

        state.log.append(&record)?;
        state.records.insert(record.short_code.clone(), record);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forces the log down to disk.
    pub fn sync(&self) -> Result<()> {
        self.state.read().log.sync()
    }
}

impl std::fmt::Debug for DurableIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DurableIndex")
            .field("path", &state.log.path())
            .field("records", &state.records.len())
            .finish()
    }
}
