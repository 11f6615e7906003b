//! ProxyScrape structured API source

use async_trait::async_trait;
use serde::Deserialize;

use super::ProxySource;
use crate::error::{ForagerError, Result};
use crate::models::{AnonymityLevel, CandidateProxy};

const PROXYSCRAPE_URL: &str =
    "https://api.proxyscrape.com/v4/free-proxy-list/get?request=display_proxies&format=json";

#[derive(Deserialize)]
struct ProxyScrapePayload {
    proxies: Vec<ProxyScrapeRow>,
}

#[derive(Deserialize)]
struct ProxyScrapeRow {
    ip: String,
    port: u16,
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    anonymity: String,
    #[serde(default)]
    ip_data: Option<IpData>,
}

#[derive(Deserialize)]
struct IpData {
    #[serde(default, rename = "countryCode")]
    country_code: String,
}

/// Free-proxy aggregator returning the full list as one JSON payload
pub struct ProxyScrapeSource {
    url: String,
}

impl ProxyScrapeSource {
    pub fn new() -> Self {
        Self {
            url: PROXYSCRAPE_URL.to_string(),
        }
    }

    /// Point the source at a different endpoint (tests, mirrors).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for ProxyScrapeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_payload(raw: &str) -> Result<Vec<CandidateProxy>> {
    let payload: ProxyScrapePayload =
        serde_json::from_str(raw).map_err(|e| ForagerError::SourceFetch {
            source_name: "api.proxyscrape.com",
            message: e.to_string(),
        })?;

    let candidates = payload
        .proxies
        .into_iter()
        .filter(|row| !row.ip.is_empty() && row.port != 0)
        .map(|row| CandidateProxy {
            ip: row.ip,
            port: row.port,
            country: row
                .ip_data
                .map(|d| d.country_code)
                .unwrap_or_default(),
            anonymity: AnonymityLevel::parse(&row.anonymity),
            https: row.protocol.eq_ignore_ascii_case("https"),
            last_checked: String::new(),
        })
        .collect();

    Ok(candidates)
}

#[async_trait]
impl ProxySource for ProxyScrapeSource {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<CandidateProxy>> {
        let body = client.get(&self.url).send().await?.text().await?;
        parse_payload(&body)
    }

    fn name(&self) -> &'static str {
        "api.proxyscrape.com"
    }
}
