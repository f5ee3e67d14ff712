// GitHub API HTTP client.
// Handles authentication, rate limiting, pagination headers, and status mapping.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT},
};

use crate::error::{FeedError, Result};

use super::types::RateLimit;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Default bound on a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub API client with authentication and rate limit tracking.
///
/// Shared between concurrent refresh cycles, so all methods take `&self`.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient {
    /// Create a new GitHub client with the given token.
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(FeedError::MissingToken);
        }

        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| FeedError::Other(e.to_string()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("commit-feed"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(FeedError::Api)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Get the most recently observed rate limit information.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make a GET request to the GitHub API.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.get(&url).send().await.map_err(FeedError::Api)?;

        self.update_rate_limit(&response);
        check_response(response).await
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_params<T: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(FeedError::Api)?;

        self.update_rate_limit(&response);
        check_response(response).await
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let mut rate_limit = self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(limit) = header_u64(response, "x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header_u64(response, "x-ratelimit-remaining") {
            rate_limit.remaining = remaining;
        }
        if let Some(reset) = header_u64(response, "x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
    }
}

fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Check response status and convert errors.
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // GitHub signals primary rate limits with 403 and zero remaining calls.
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && header_u64(&response, "x-ratelimit-remaining") == Some(0));
    if rate_limited {
        let reset_at = header_u64(&response, "x-ratelimit-reset")
            .and_then(|reset| chrono::DateTime::from_timestamp(reset as i64, 0))
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Err(FeedError::RateLimited { reset_at });
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(FeedError::Unauthorized),
        StatusCode::NOT_FOUND => Err(FeedError::NotFound(response.url().to_string())),
        StatusCode::CONFLICT => Err(FeedError::EmptyRepository(response.url().to_string())),
        StatusCode::FORBIDDEN => Err(FeedError::Other(format!(
            "Forbidden: {}",
            response.text().await.unwrap_or_default()
        ))),
        status => Err(FeedError::Other(format!(
            "HTTP {}: {}",
            status,
            response.text().await.unwrap_or_default()
        ))),
    }
}

/// Page number advertised as `rel="next"` in a response's `Link` header.
pub fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_next_page)
}

/// Parse `<url>; rel="next", <url>; rel="last"` and return the next page number.
pub fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|part| {
        let (target, params) = part.trim().split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().trim_start_matches("rel=").trim_matches('"') == "next");
        if !is_next {
            return None;
        }

        let url = Url::parse(target.trim().trim_start_matches('<').trim_end_matches('>')).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}
