//! Forager - Resilient Retrieval Core
//!
//! The proxy-backed HTTP retrieval layer of a long-running web harvester.
//!
//! ## Features
//!
//! - Whitelist of known-good proxies with cooldown-based health tracking
//! - Round-robin rotation with optional background list refresh
//! - Candidate sourcing from public proxy-list sites with quality ranking
//! - Exponential backoff with jitter, tuned per failure class
//! - Retrying HTTP client that survives proxy churn and server errors
//! - Concurrent run statistics with a per-status-code histogram

pub mod backoff;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod proxy;
pub mod stats;

pub use config::Config;
pub use error::{ForagerError, Result};
pub use http::{HttpClientConfig, PageResponse, ResilientHttpClient};
pub use proxy::{ProxyManager, WhitelistHandle, WhitelistManager};
pub use stats::ScraperStatistics;
