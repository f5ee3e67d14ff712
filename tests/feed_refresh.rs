// End-to-end refresh and read path over the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::watch;

use commit_feed::cache::CommitCache;
use commit_feed::error::Result;
use commit_feed::feed::{
    CommitRecord, CommitSource, FeedReader, Obfuscator, PageRequest, REDACTED_URL,
    format_timestamp,
};
use commit_feed::sync::{RefreshKind, RefreshReport, RefreshScheduler, SchedulerConfig};

struct ScriptedSource {
    full: Vec<CommitRecord>,
    incremental: Mutex<VecDeque<Vec<CommitRecord>>>,
    watermarks: Mutex<Vec<DateTime<Utc>>>,
}

impl CommitSource for ScriptedSource {
    async fn fetch_all(&self) -> Result<Vec<CommitRecord>> {
        Ok(self.full.clone())
    }

    async fn fetch_since(&self, watermark: DateTime<Utc>) -> Result<Vec<CommitRecord>> {
        self.watermarks.lock().unwrap().push(watermark);
        Ok(self.incremental.lock().unwrap().pop_front().unwrap_or_default())
    }
}

fn commit(id: &str, repo: &str, private: bool, minutes_ago: i64) -> CommitRecord {
    CommitRecord {
        id: id.to_string(),
        repo_name: repo.to_string(),
        message: format!("work on {}", repo),
        timestamp: format_timestamp(Utc::now() - ChronoDuration::minutes(minutes_ago)),
        url: format!("https://github.com/octocat/{}/commit/{}", repo, id),
        is_private: private,
    }
}

#[tokio::test]
async fn test_refresh_then_read_newest_first() {
    let source = ScriptedSource {
        full: vec![
            commit("c2", "blog", false, 20),
            commit("c1", "secret-lab", true, 30),
            commit("c3", "blog", false, 10),
        ],
        incremental: Mutex::new(VecDeque::from([vec![commit("c4", "secret-lab", true, 1)]])),
        watermarks: Mutex::new(Vec::new()),
    };

    let cache = Arc::new(CommitCache::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&cache),
        source,
        Obfuscator::with_seed(7),
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            ..SchedulerConfig::default()
        },
        shutdown_rx,
    ));

    let refresh_loop = Arc::clone(&scheduler).start().await;
    let reader = FeedReader::new(
        Arc::clone(&cache),
        Arc::clone(&scheduler),
        Duration::from_secs(900),
    );

    let page = reader.get_page(PageRequest::new(1, 20));
    let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c3", "c2", "c1"]);
    assert_eq!(page.total_count, 3);

    let private = &page.records[2];
    assert!(private.is_private);
    assert_eq!(private.url, REDACTED_URL);
    assert_ne!(private.repo_name, "secret-lab");
    assert_eq!(page.records[0].repo_name, "blog");

    let report = scheduler.refresh().await.unwrap();
    assert!(matches!(
        report,
        RefreshReport::Completed {
            kind: RefreshKind::Incremental,
            fetched: 1,
            ..
        }
    ));

    let page = reader.get_page(PageRequest::new(1, 2));
    let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c4", "c3"]);
    assert_eq!(page.total_count, 4);

    shutdown_tx.send(true).unwrap();
    refresh_loop.await.unwrap();
}
