// commit-feed library.
// GitHub commit aggregation behind a warm, privacy-redacted in-memory cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod github;
pub mod routes;
pub mod sync;
