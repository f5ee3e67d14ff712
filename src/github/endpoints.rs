// GitHub API endpoint functions.
// Provides typed methods for the endpoints the commit feed depends on.

use serde::de::DeserializeOwned;

use crate::error::Result;

use super::client::{GitHubClient, next_page};
use super::types::{Owner, Paged, Release, RepoCommit, Repository, SearchCommit, SearchResponse};

/// Read a JSON array body along with the `Link` header's next page.
async fn paged<T: DeserializeOwned>(response: reqwest::Response) -> Result<Paged<T>> {
    let next_page = next_page(&response);
    let items: Vec<T> = response.json().await?;
    Ok(Paged { items, next_page })
}

impl GitHubClient {
    /// Get the authenticated user.
    pub async fn get_current_user(&self) -> Result<Owner> {
        let response = self.get("/user").await?;
        let user: Owner = response.json().await?;
        Ok(user)
    }

    /// Get repositories owned by the authenticated user, public and private.
    pub async fn get_owned_repos(&self, page: u32, per_page: u32) -> Result<Paged<Repository>> {
        let params = [
            ("type", "owner"),
            ("page", &page.to_string()),
            ("per_page", &per_page.to_string()),
        ];
        let response = self.get_with_params("/user/repos", &params).await?;
        paged(response).await
    }

    /// Get commits on the default branch of a repository.
    pub async fn get_repo_commits(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Paged<RepoCommit>> {
        let params = [
            ("page", &page.to_string()),
            ("per_page", &per_page.to_string()),
        ];
        let response = self
            .get_with_params(&format!("/repos/{}/{}/commits", owner, repo), &params)
            .await?;
        paged(response).await
    }

    /// Search commits authored by a user, newest author date first.
    pub async fn search_commits_by_author(
        &self,
        author: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Paged<SearchCommit>> {
        let query = format!("author:{}", author);
        let params = [
            ("q", query.as_str()),
            ("sort", "author-date"),
            ("order", "desc"),
            ("page", &page.to_string()),
            ("per_page", &per_page.to_string()),
        ];
        let response = self.get_with_params("/search/commits", &params).await?;
        let next_page = next_page(&response);
        let wrapper: SearchResponse<SearchCommit> = response.json().await?;
        Ok(Paged {
            items: wrapper.items,
            next_page,
        })
    }

    /// Get the latest published release of a repository.
    pub async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let response = self
            .get(&format!("/repos/{}/{}/releases/latest", owner, repo))
            .await?;
        let release: Release = response.json().await?;
        Ok(release)
    }
}
