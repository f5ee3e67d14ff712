// GitHub API response types.
// Defines structs for deserializing the REST responses the commit feed reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
    pub login: String,
}

/// GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub private: bool,
}

/// Git author or committer signature inside a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: DateTime<Utc>,
}

/// The git-level part of a commit (message and signatures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: Signature,
}

/// Commit as returned by the list-commits endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
}

/// Minimal repository reference embedded in search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

/// Commit as returned by the commit search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
    pub repository: RepositoryRef,
}

/// Search response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}

/// Published release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    /// Page number to request next, if the `Link` header advertised one.
    pub next_page: Option<u32>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}
