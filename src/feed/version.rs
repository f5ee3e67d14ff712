// Release version lookup.
// Reports the latest release tag of a configured repository.

use std::sync::Arc;

use tracing::warn;

use crate::github::HostingApi;

/// Shown when the repository has no release or an empty tag.
pub const NO_RELEASE: &str = "v0.0";
/// Shown when the version cannot be determined.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Looks up the latest release tag of `owner/name`.
pub struct ReleaseSource<A> {
    api: Arc<A>,
    repo: Option<(String, String)>,
}

impl<A: HostingApi> ReleaseSource<A> {
    pub fn new(api: Arc<A>, repo: Option<(String, String)>) -> Self {
        Self { api, repo }
    }

    pub async fn current_version(&self) -> String {
        let Some((owner, name)) = &self.repo else {
            return UNKNOWN_VERSION.to_string();
        };

        match self.api.latest_release(owner, name).await {
            Ok(release) if release.tag_name.trim().is_empty() => NO_RELEASE.to_string(),
            Ok(release) => release.tag_name,
            Err(e) if e.is_empty_result() => NO_RELEASE.to_string(),
            Err(e) => {
                warn!(owner = %owner, repo = %name, error = %e, "failed to look up latest release");
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}
