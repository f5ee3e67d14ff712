// Commit feed module.
// Record types, private-commit redaction, the GitHub commit source, and the read path.

pub mod obfuscate;
pub mod reader;
pub mod record;
pub mod source;
pub mod version;

pub use obfuscate::{Obfuscator, REDACTED_URL};
pub use reader::{DEFAULT_STALE_AFTER, FeedReader, paginate};
pub use record::{CommitRecord, DEFAULT_LIMIT, MAX_LIMIT, Page, PageRequest, format_timestamp};
pub use source::{CommitSource, GitHubCommitSource, RetryPolicy};
pub use version::ReleaseSource;
