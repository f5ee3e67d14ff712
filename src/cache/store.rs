// In-memory commit store.
// Holds merged commit records keyed by id plus the last-refresh watermark.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::feed::CommitRecord;

/// A stored record plus the order in which its id was first seen.
#[derive(Debug, Clone)]
struct CacheEntry {
    seq: u64,
    record: CommitRecord,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the cache, newest commit first.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<CommitRecord>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Size and watermark of the cache, read under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    pub len: usize,
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Outcome of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Ids that were not cached before.
    pub inserted: usize,
    /// Ids that replaced an existing record.
    pub updated: usize,
    /// Records in the cache after the merge.
    pub total: usize,
}

/// Concurrency-safe commit cache.
///
/// Readers share the lock; a merge takes it exclusively, so a snapshot never
/// sees half of a batch. The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct CommitCache {
    state: RwLock<CacheState>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert a batch by id and stamp the refresh time.
    pub fn merge(&self, records: Vec<CommitRecord>) -> MergeSummary {
        self.merge_at(records, Utc::now())
    }

    pub(crate) fn merge_at(&self, records: Vec<CommitRecord>, now: DateTime<Utc>) -> MergeSummary {
        let mut guard = self.write();
        let state = &mut *guard;
        let mut summary = MergeSummary::default();

        for record in records {
            let seq = state.next_seq;
            match state.entries.entry(record.id.clone()) {
                Entry::Occupied(mut slot) => {
                    slot.get_mut().record = record;
                    summary.updated += 1;
                }
                Entry::Vacant(slot) => {
                    slot.insert(CacheEntry { seq, record });
                    state.next_seq += 1;
                    summary.inserted += 1;
                }
            }
        }

        // The watermark never moves backwards, even if the wall clock does.
        state.last_refreshed = Some(state.last_refreshed.map_or(now, |prev| prev.max(now)));
        summary.total = state.entries.len();
        summary
    }

    /// Copy every record out, sorted by author date (newest first).
    ///
    /// Malformed timestamps sort last; equal timestamps keep first-insertion order.
    pub fn snapshot(&self) -> Snapshot {
        let (mut entries, last_refreshed) = {
            let state = self.read();
            let entries: Vec<CacheEntry> = state.entries.values().cloned().collect();
            (entries, state.last_refreshed)
        };

        entries.sort_by_cached_key(|entry| (Reverse(entry.record.sort_key()), entry.seq));

        Snapshot {
            records: entries.into_iter().map(|entry| entry.record).collect(),
            last_refreshed,
        }
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.read();
        CacheStatus {
            len: state.entries.len(),
            last_refreshed: state.last_refreshed,
        }
    }

    pub fn len(&self) -> usize {
        self.status().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.status().last_refreshed
    }
}
