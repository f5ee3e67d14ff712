// commit-feed entry point.
// Serves a paginated, privacy-redacted feed of the authenticated user's GitHub commits.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commit_feed::cache::CommitCache;
use commit_feed::config::Config;
use commit_feed::feed::{FeedReader, GitHubCommitSource, Obfuscator, ReleaseSource};
use commit_feed::github::GitHubClient;
use commit_feed::routes::{self, AppState};
use commit_feed::sync::RefreshScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("invalid configuration")?;

    let client = Arc::new(
        GitHubClient::new(
            &config.github_token,
            &config.github_api_url,
            config.request_timeout(),
        )
        .context("failed to build GitHub client")?,
    );

    let cache = Arc::new(CommitCache::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&cache),
        GitHubCommitSource::new(Arc::clone(&client)),
        Obfuscator::from_time(),
        config.scheduler_config(),
        shutdown_rx,
    ));

    // Initial fill happens before the listener opens.
    let refresh_loop = Arc::clone(&scheduler).start().await;
    info!(
        cached = cache.len(),
        rate_limit_remaining = client.rate_limit().remaining,
        "commit cache ready"
    );

    let state = Arc::new(AppState {
        reader: FeedReader::new(Arc::clone(&cache), scheduler, config.stale_after()),
        releases: ReleaseSource::new(client, config.release_repo()?),
    });

    let app = routes::create_router(state)
        .layer(routes::cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    refresh_loop.await.context("refresh loop panicked")?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
