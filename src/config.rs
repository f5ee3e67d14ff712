// Service configuration.
// Every setting can be given as a flag or an environment variable; flags win.

use std::time::Duration;

use clap::Parser;

use crate::error::{FeedError, Result};
use crate::feed::DEFAULT_STALE_AFTER;
use crate::github::{DEFAULT_REQUEST_TIMEOUT, GITHUB_API_BASE};
use crate::sync::SchedulerConfig;

/// Serve a privacy-redacted feed of your GitHub commits
#[derive(Parser, Debug, Clone)]
#[command(name = "commit-feed", version, about, long_about = None)]
pub struct Config {
    /// GitHub token used for every API call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_BASE)]
    pub github_api_url: String,

    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to run the HTTP server on
    #[arg(short, long, env = "PORT", default_value_t = 5432)]
    pub port: u16,

    /// Origins allowed by CORS (comma separated); any origin when empty
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Seconds between periodic cache refreshes
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = SchedulerConfig::default().interval.as_secs())]
    pub refresh_interval_secs: u64,

    /// Cache age in seconds after which a read triggers a refresh
    #[arg(long, env = "STALE_AFTER_SECS", default_value_t = DEFAULT_STALE_AFTER.as_secs())]
    pub stale_after_secs: u64,

    /// Timeout in seconds for a single GitHub request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Timeout in seconds for fetching the full commit history
    #[arg(long, env = "FULL_FETCH_TIMEOUT_SECS", default_value_t = SchedulerConfig::default().full_fetch_timeout.as_secs())]
    pub full_fetch_timeout_secs: u64,

    /// Timeout in seconds for an incremental commit fetch
    #[arg(long, env = "INCREMENTAL_FETCH_TIMEOUT_SECS", default_value_t = SchedulerConfig::default().incremental_fetch_timeout.as_secs())]
    pub incremental_fetch_timeout_secs: u64,

    /// Repository (owner/name) whose latest release is reported by /api/version
    #[arg(long, env = "RELEASE_REPO")]
    pub release_repo: Option<String>,
}

impl Config {
    /// Reject values that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.github_token.trim().is_empty() {
            return Err(FeedError::MissingToken);
        }

        let durations = [
            ("refresh interval", self.refresh_interval_secs),
            ("stale threshold", self.stale_after_secs),
            ("request timeout", self.request_timeout_secs),
            ("full fetch timeout", self.full_fetch_timeout_secs),
            ("incremental fetch timeout", self.incremental_fetch_timeout_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(FeedError::Config(format!("{} must be at least one second", name)));
        }

        self.release_repo()?;
        Ok(())
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.refresh_interval_secs),
            full_fetch_timeout: Duration::from_secs(self.full_fetch_timeout_secs),
            incremental_fetch_timeout: Duration::from_secs(self.incremental_fetch_timeout_secs),
        }
    }

    /// `release_repo` split into owner and name.
    pub fn release_repo(&self) -> Result<Option<(String, String)>> {
        let Some(repo) = self.release_repo.as_deref() else {
            return Ok(None);
        };

        match repo.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Some((owner.to_string(), name.to_string())))
            }
            _ => Err(FeedError::Config(format!(
                "release repository must look like owner/name, got {:?}",
                repo
            ))),
        }
    }
}
