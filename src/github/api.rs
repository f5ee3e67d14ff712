// Hosting API abstraction.
// The commit source talks to GitHub only through this trait so tests can swap in fakes.

use std::future::Future;

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{Owner, Paged, Release, RepoCommit, Repository, SearchCommit};

/// Remote source-control host the commit feed reads from.
///
/// Futures are `Send` so they can be awaited inside spawned refresh tasks.
pub trait HostingApi: Send + Sync {
    /// Resolve the authenticated principal.
    fn current_user(&self) -> impl Future<Output = Result<Owner>> + Send;

    /// One page of repositories owned by the principal.
    fn owned_repos(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Paged<Repository>>> + Send;

    /// One page of commits for `owner/repo`.
    fn repo_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Paged<RepoCommit>>> + Send;

    /// One page of commits authored by `author`, newest first.
    fn search_commits(
        &self,
        author: &str,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Paged<SearchCommit>>> + Send;

    /// Latest release of `owner/repo`.
    fn latest_release(&self, owner: &str, repo: &str)
    -> impl Future<Output = Result<Release>> + Send;
}

impl HostingApi for GitHubClient {
    async fn current_user(&self) -> Result<Owner> {
        self.get_current_user().await
    }

    async fn owned_repos(&self, page: u32, per_page: u32) -> Result<Paged<Repository>> {
        self.get_owned_repos(page, per_page).await
    }

    async fn repo_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Paged<RepoCommit>> {
        self.get_repo_commits(owner, repo, page, per_page).await
    }

    async fn search_commits(
        &self,
        author: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Paged<SearchCommit>> {
        self.search_commits_by_author(author, page, per_page).await
    }

    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        self.get_latest_release(owner, repo).await
    }
}
