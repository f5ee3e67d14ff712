// GitHub API module.
// Provides the REST client, response types, and the trait the feed consumes.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use api::HostingApi;
pub use client::{DEFAULT_REQUEST_TIMEOUT, GITHUB_API_BASE, GitHubClient};
pub use types::*;
