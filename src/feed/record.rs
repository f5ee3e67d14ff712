// Commit feed value types.
// Defines the merged commit record and the paging types served to callers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::github::{RepoCommit, Repository, SearchCommit};

/// Default number of records per page.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page a caller may request.
pub const MAX_LIMIT: usize = 100;

/// A single commit in the aggregated feed.
///
/// Records are replaced wholesale in the cache, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub repo_name: String,
    pub message: String,
    /// Author date as RFC 3339 in UTC.
    pub timestamp: String,
    pub url: String,
    pub is_private: bool,
}

impl CommitRecord {
    /// Build a record from a repository listing, tagged with that repository.
    pub fn from_repo_commit(commit: RepoCommit, repo: &Repository) -> Self {
        Self {
            id: commit.sha,
            repo_name: repo.name.clone(),
            message: commit.commit.message,
            timestamp: format_timestamp(commit.commit.author.date),
            url: commit.html_url,
            is_private: repo.private,
        }
    }

    /// Build a record from a commit search hit.
    pub fn from_search_commit(commit: SearchCommit) -> Self {
        Self {
            id: commit.sha,
            repo_name: commit.repository.name,
            message: commit.commit.message,
            timestamp: format_timestamp(commit.commit.author.date),
            url: commit.html_url,
            is_private: commit.repository.private,
        }
    }

    /// Parsed author date, if the timestamp is well formed.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Ordering key; malformed timestamps count as the earliest instant.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.authored_at().unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Format a timestamp the way the feed stores it (`2024-05-01T10:00:00Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    /// Normalize raw caller input: pages below 1 become 1, limits outside
    /// `1..=100` fall back to the default.
    pub fn new(page: i64, limit: i64) -> Self {
        let page = usize::try_from(page).ok().filter(|p| *p >= 1).unwrap_or(1);
        let limit = usize::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Index of the first record on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of the feed plus the total number of records at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub records: Vec<CommitRecord>,
    pub total_count: usize,
}
