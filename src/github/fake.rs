// In-memory hosting API for tests.
// Serves canned repositories, commits, and search hits with small pages.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use crate::error::{FeedError, Result};

use super::api::HostingApi;
use super::types::{
    CommitDetail, Owner, Paged, Release, RepoCommit, Repository, RepositoryRef, SearchCommit,
    Signature,
};

pub const LOGIN: &str = "octocat";

#[derive(Default)]
pub struct FakeApi {
    pub page_size: usize,
    pub repos: Vec<Repository>,
    pub commits: HashMap<String, Vec<RepoCommit>>,
    pub failing_repos: HashSet<String>,
    pub empty_repos: HashSet<String>,
    pub search_hits: Vec<SearchCommit>,
    pub fail_repo_listing: bool,
    /// Number of upcoming search calls that answer with a rate-limit error.
    pub rate_limited_searches: AtomicU32,
    pub release_tag: Option<String>,
    pub search_calls: AtomicU32,
    pub user_calls: AtomicU32,
    pub requested_search_pages: Mutex<Vec<u32>>,
}

impl FakeApi {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn with_repo(mut self, name: &str, private: bool, commits: Vec<RepoCommit>) -> Self {
        self.repos.push(repository(name, private));
        self.commits.insert(name.to_string(), commits);
        self
    }

    fn page<T: Clone>(&self, items: &[T], page: u32) -> Paged<T> {
        let size = self.page_size.max(1);
        let start = (page as usize - 1) * size;
        let chunk: Vec<T> = items.iter().skip(start).take(size).cloned().collect();
        let next_page = (start + size < items.len()).then_some(page + 1);
        Paged {
            items: chunk,
            next_page,
        }
    }
}

pub fn repository(name: &str, private: bool) -> Repository {
    Repository {
        id: name.len() as u64,
        name: name.to_string(),
        full_name: format!("{}/{}", LOGIN, name),
        owner: Owner {
            id: 1,
            login: LOGIN.to_string(),
        },
        private,
    }
}

fn detail(message: &str, date: DateTime<Utc>) -> CommitDetail {
    CommitDetail {
        message: message.to_string(),
        author: Signature {
            name: Some("Octo Cat".to_string()),
            email: Some("octo@example.com".to_string()),
            date,
        },
    }
}

pub fn repo_commit(sha: &str, message: &str, date: DateTime<Utc>) -> RepoCommit {
    RepoCommit {
        sha: sha.to_string(),
        html_url: format!("https://github.com/{}/commit/{}", LOGIN, sha),
        commit: detail(message, date),
    }
}

pub fn search_commit(sha: &str, repo: &str, private: bool, date: DateTime<Utc>) -> SearchCommit {
    SearchCommit {
        sha: sha.to_string(),
        html_url: format!("https://github.com/{}/{}/commit/{}", LOGIN, repo, sha),
        commit: detail(&format!("commit {}", sha), date),
        repository: RepositoryRef {
            name: repo.to_string(),
            private,
        },
    }
}

impl HostingApi for FakeApi {
    async fn current_user(&self) -> Result<Owner> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Owner {
            id: 1,
            login: LOGIN.to_string(),
        })
    }

    async fn owned_repos(&self, page: u32, _per_page: u32) -> Result<Paged<Repository>> {
        if self.fail_repo_listing {
            return Err(FeedError::Unauthorized);
        }
        Ok(self.page(&self.repos, page))
    }

    async fn repo_commits(
        &self,
        _owner: &str,
        repo: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<Paged<RepoCommit>> {
        if self.failing_repos.contains(repo) {
            return Err(FeedError::Other(format!("HTTP 500 Internal Server Error: {}", repo)));
        }
        if self.empty_repos.contains(repo) {
            return Err(FeedError::EmptyRepository(repo.to_string()));
        }
        let commits = self.commits.get(repo).cloned().unwrap_or_default();
        Ok(self.page(&commits, page))
    }

    async fn search_commits(
        &self,
        author: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<Paged<SearchCommit>> {
        assert_eq!(author, LOGIN);
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_search_pages.lock().unwrap().push(page);

        let throttled = self
            .rate_limited_searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(FeedError::RateLimited {
                reset_at: "unknown".to_string(),
            });
        }
        Ok(self.page(&self.search_hits, page))
    }

    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        match &self.release_tag {
            Some(tag) => Ok(Release {
                tag_name: tag.clone(),
                name: None,
                published_at: None,
            }),
            None => Err(FeedError::NotFound(format!(
                "/repos/{}/{}/releases/latest",
                owner, repo
            ))),
        }
    }
}
