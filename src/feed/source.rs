// Commit source adapter.
// Pulls full and incremental commit history from the hosting API, with rate-limit backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};
use crate::github::{HostingApi, Repository};

use super::record::CommitRecord;

/// Page size for every paginated listing.
pub const PAGE_SIZE: u32 = 100;

/// Where the refresh scheduler gets its commits from.
pub trait CommitSource: Send + Sync {
    /// Every commit in every repository owned by the principal.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<CommitRecord>>> + Send;

    /// Commits authored strictly after `watermark`, newest first.
    fn fetch_since(
        &self,
        watermark: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<CommitRecord>>> + Send;
}

/// Retry settings for transient API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Run `call`, retrying transient failures with exponential backoff.
async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "transient GitHub error, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Commit source backed by the GitHub REST API.
pub struct GitHubCommitSource<A> {
    api: Arc<A>,
    retry: RetryPolicy,
    login: OnceCell<String>,
}

impl<A: HostingApi> GitHubCommitSource<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
            login: OnceCell::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Login of the authenticated principal, resolved once.
    async fn login(&self) -> Result<&str> {
        let login = self
            .login
            .get_or_try_init(|| async {
                let user = with_retry(self.retry, "get user", || self.api.current_user()).await?;
                Ok::<_, FeedError>(user.login)
            })
            .await?;
        Ok(login.as_str())
    }

    /// All repositories owned by the principal, following every page.
    async fn owned_repos(&self) -> Result<Vec<Repository>> {
        let api = &self.api;
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let batch =
                with_retry(self.retry, "list repositories", move || api.owned_repos(page, PAGE_SIZE))
                    .await?;
            repos.extend(batch.items);
            match batch.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        Ok(repos)
    }

    /// Full history of one repository. Missing or empty repositories yield nothing.
    async fn repo_history(&self, repo: &Repository) -> Result<Vec<CommitRecord>> {
        let api = &self.api;
        let owner = repo.owner.login.as_str();
        let name = repo.name.as_str();
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let result = with_retry(self.retry, "list commits", move || {
                api.repo_commits(owner, name, page, PAGE_SIZE)
            })
            .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) if e.is_empty_result() => {
                    debug!(repo = %repo.full_name, error = %e, "no commits to list");
                    break;
                }
                Err(e) => return Err(e),
            };

            records.extend(
                batch
                    .items
                    .into_iter()
                    .map(|commit| CommitRecord::from_repo_commit(commit, repo)),
            );
            match batch.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        Ok(records)
    }
}

impl<A: HostingApi> CommitSource for GitHubCommitSource<A> {
    async fn fetch_all(&self) -> Result<Vec<CommitRecord>> {
        let repos = self.owned_repos().await?;
        info!(repositories = repos.len(), "fetching full commit history");

        let mut records = Vec::new();
        for repo in &repos {
            match self.repo_history(repo).await {
                Ok(commits) => {
                    debug!(repo = %repo.full_name, commits = commits.len(), "fetched repository history");
                    records.extend(commits);
                }
                Err(e) => {
                    warn!(repo = %repo.full_name, error = %e, "skipping repository, failed to fetch commits");
                }
            }
        }
        Ok(records)
    }

    async fn fetch_since(&self, watermark: DateTime<Utc>) -> Result<Vec<CommitRecord>> {
        let api = &self.api;
        let login = self.login().await?;
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let result = with_retry(self.retry, "search commits", move || {
                api.search_commits(login, page, PAGE_SIZE)
            })
            .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) if e.is_empty_result() => break,
                Err(e) => return Err(e),
            };

            for commit in batch.items {
                // Results are newest first: everything from here on is already known.
                if commit.commit.author.date <= watermark {
                    debug!(page, found = records.len(), "reached watermark");
                    return Ok(records);
                }
                records.push(CommitRecord::from_search_commit(commit));
            }

            match batch.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{FakeApi, repo_commit, search_commit};
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::Ordering;

    fn minutes_ago(minutes: i64) -> DateTime<Utc> {
        Utc::now() - ChronoDuration::minutes(minutes)
    }

    #[tokio::test]
    async fn test_fetch_all_walks_every_page() {
        let api = FakeApi::new(2)
            .with_repo(
                "blog",
                false,
                vec![
                    repo_commit("b1", "one", minutes_ago(1)),
                    repo_commit("b2", "two", minutes_ago(2)),
                    repo_commit("b3", "three", minutes_ago(3)),
                ],
            )
            .with_repo("dotfiles", true, vec![repo_commit("d1", "init", minutes_ago(4))])
            .with_repo("empty", false, Vec::new());
        let source = GitHubCommitSource::new(Arc::new(api));

        let records = source.fetch_all().await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "b3", "d1"]);
        assert_eq!(records[3].repo_name, "dotfiles");
        assert!(records[3].is_private);
        assert!(!records[0].is_private);
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failing_repository() {
        let mut api = FakeApi::new(10)
            .with_repo("good", false, vec![repo_commit("g1", "ok", minutes_ago(1))])
            .with_repo("broken", false, vec![repo_commit("x1", "never", minutes_ago(2))])
            .with_repo("fresh", false, Vec::new());
        api.failing_repos.insert("broken".to_string());
        api.empty_repos.insert("fresh".to_string());
        let source = GitHubCommitSource::new(Arc::new(api));

        let records = source.fetch_all().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "g1");
    }

    #[tokio::test]
    async fn test_fetch_all_fails_when_repositories_cannot_be_listed() {
        let mut api = FakeApi::new(10);
        api.fail_repo_listing = true;
        let source = GitHubCommitSource::new(Arc::new(api));

        let result = source.fetch_all().await;
        assert!(matches!(result, Err(FeedError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_fetch_since_stops_at_watermark() {
        let watermark = minutes_ago(30);
        let mut api = FakeApi::new(2);
        api.search_hits = vec![
            search_commit("n1", "blog", false, minutes_ago(1)),
            search_commit("n2", "secret", true, minutes_ago(10)),
            search_commit("n3", "blog", false, minutes_ago(20)),
            search_commit("edge", "blog", false, watermark),
            search_commit("old", "blog", false, minutes_ago(60)),
            search_commit("older", "blog", false, minutes_ago(90)),
        ];
        let api = Arc::new(api);
        let source = GitHubCommitSource::new(Arc::clone(&api));

        let records = source.fetch_since(watermark).await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert!(records[1].is_private);
        assert_eq!(records[1].repo_name, "secret");
        // Page 3 is never requested once the watermark is reached on page 2.
        assert_eq!(*api.requested_search_pages.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fetch_since_resolves_login_once() {
        let api = Arc::new(FakeApi::new(10));
        let source = GitHubCommitSource::new(Arc::clone(&api));

        source.fetch_since(minutes_ago(5)).await.unwrap();
        source.fetch_since(minutes_ago(5)).await.unwrap();

        assert_eq!(api.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_since_retries_rate_limit_with_backoff() {
        let mut api = FakeApi::new(10);
        api.search_hits = vec![search_commit("n1", "blog", false, minutes_ago(1))];
        api.rate_limited_searches.store(2, Ordering::SeqCst);
        let api = Arc::new(api);
        let source = GitHubCommitSource::new(Arc::clone(&api));

        let start = tokio::time::Instant::now();
        let records = source.fetch_since(minutes_ago(30)).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 3);
        // 1s before the second attempt, 2s before the third.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_since_gives_up_after_three_attempts() {
        let api = FakeApi::new(10);
        api.rate_limited_searches.store(5, Ordering::SeqCst);
        let api = Arc::new(api);
        let source = GitHubCommitSource::new(Arc::clone(&api));

        let result = source.fetch_since(minutes_ago(30)).await;

        assert!(matches!(result, Err(FeedError::RateLimited { .. })));
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_custom_retry_policy_limits_attempts() {
        let api = FakeApi::new(10);
        api.rate_limited_searches.store(5, Ordering::SeqCst);
        let api = Arc::new(api);
        let source = GitHubCommitSource::new(Arc::clone(&api)).with_retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(5),
        });

        let result = source.fetch_since(minutes_ago(30)).await;

        assert!(matches!(result, Err(FeedError::RateLimited { .. })));
        assert_eq!(api.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_transient_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = with_retry(RetryPolicy::default(), "test", || {
            calls += 1;
            async { Err(FeedError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(FeedError::Unauthorized)));
        assert_eq!(calls, 1);
    }
}
