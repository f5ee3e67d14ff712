// Cache module for merged commit records.
// Volatile, in-memory only; rebuilt from GitHub on every start.

pub mod store;

pub use store::{CacheStatus, CommitCache, MergeSummary, Snapshot};
