//! Proxy source fetchers
//!
//! Each source pulls candidate proxies from a public endpoint; a fetch
//! tolerates partial/malformed rows by skipping them. One failing source
//! never blocks the others.

mod free_proxy_list;
mod geonode;
mod proxyscrape;

pub use free_proxy_list::FreeProxyListSource;
pub use geonode::GeonodeSource;
pub use proxyscrape::ProxyScrapeSource;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{AnonymityLevel, CandidateProxy};

/// A fetcher producing candidate proxies from one public source
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<CandidateProxy>>;

    fn name(&self) -> &'static str;
}

/// Drop transparent proxies and invalid IPs, then sort by quality score
/// descending and recency of last-checked descending.
pub fn filter_and_rank(mut candidates: Vec<CandidateProxy>) -> Vec<CandidateProxy> {
    candidates.retain(|c| c.anonymity != AnonymityLevel::Transparent && c.has_valid_ip());
    candidates.sort_by(|a, b| {
        b.quality_score()
            .cmp(&a.quality_score())
            .then(a.checked_age_secs().cmp(&b.checked_age_secs()))
    });
    candidates
}

/// Fetch from every source, isolating per-source failures.
pub async fn fetch_all(
    sources: &[Box<dyn ProxySource>],
    client: &reqwest::Client,
) -> Vec<CandidateProxy> {
    let mut all = Vec::new();
    for source in sources {
        match source.fetch(client).await {
            Ok(candidates) => {
                info!(
                    source = source.name(),
                    count = candidates.len(),
                    "Fetched proxy candidates"
                );
                all.extend(candidates);
            }
            Err(e) => {
                warn!(source = source.name(), "Proxy source fetch failed: {}", e);
            }
        }
    }
    all
}
