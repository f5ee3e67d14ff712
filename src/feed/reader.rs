// Read path for the commit feed.
// Serves pages from cache snapshots and nudges a refresh when data is stale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::CommitCache;
use crate::sync::RefreshTrigger;

use super::record::{CommitRecord, Page, PageRequest};

/// Default age after which a read asks for a refresh.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Stale-while-revalidate reader over the commit cache.
pub struct FeedReader<T> {
    cache: Arc<CommitCache>,
    trigger: T,
    stale_after: Duration,
}

impl<T: RefreshTrigger> FeedReader<T> {
    pub fn new(cache: Arc<CommitCache>, trigger: T, stale_after: Duration) -> Self {
        Self {
            cache,
            trigger,
            stale_after,
        }
    }

    /// One page of the feed, newest first. Never fails and never waits on a
    /// refresh: stale data is served while a refresh is requested.
    pub fn get_page(&self, request: PageRequest) -> Page {
        self.get_page_at(request, Utc::now())
    }

    fn get_page_at(&self, request: PageRequest, now: DateTime<Utc>) -> Page {
        let snapshot = self.cache.snapshot();

        if is_stale(snapshot.last_refreshed, now, self.stale_after) {
            debug!(
                last_refreshed = ?snapshot.last_refreshed,
                "commit cache is stale, requesting refresh"
            );
            self.trigger.request_refresh();
        }

        paginate(snapshot.records, request)
    }
}

/// Never-refreshed caches count as stale; a watermark in the future does not.
fn is_stale(last_refreshed: Option<DateTime<Utc>>, now: DateTime<Utc>, stale_after: Duration) -> bool {
    match last_refreshed {
        None => true,
        Some(at) => now
            .signed_duration_since(at)
            .to_std()
            .map(|age| age > stale_after)
            .unwrap_or(false),
    }
}

/// Slice `records` for `request`; out-of-range pages are empty.
pub fn paginate(records: Vec<CommitRecord>, request: PageRequest) -> Page {
    let total_count = records.len();
    let start = request.offset();
    if start >= total_count {
        return Page {
            records: Vec::new(),
            total_count,
        };
    }

    let end = start.saturating_add(request.limit()).min(total_count);
    Page {
        records: records.into_iter().skip(start).take(end - start).collect(),
        total_count,
    }
}
