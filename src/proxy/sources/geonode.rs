//! Geonode proxy-list API source

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::ProxySource;
use crate::error::{ForagerError, Result};
use crate::models::{AnonymityLevel, CandidateProxy};

const GEONODE_URL: &str = "https://proxylist.geonode.com/api/proxy-list";
const DEFAULT_LIMIT: u32 = 100;

#[derive(Deserialize)]
struct GeonodePayload {
    data: Vec<GeonodeRow>,
}

#[derive(Deserialize)]
struct GeonodeRow {
    ip: String,
    /// Geonode serializes the port as a string
    port: String,
    #[serde(default)]
    country: String,
    #[serde(default, rename = "anonymityLevel")]
    anonymity_level: String,
    #[serde(default)]
    protocols: Vec<String>,
    /// Unix timestamp of the source's last liveness check
    #[serde(default, rename = "lastChecked")]
    last_checked: i64,
}

/// Structured API source taking a result-count limit parameter
pub struct GeonodeSource {
    url: String,
    limit: u32,
}

impl GeonodeSource {
    pub fn new(limit: u32) -> Self {
        Self {
            url: GEONODE_URL.to_string(),
            limit: limit.max(1),
        }
    }

    pub fn with_url(url: impl Into<String>, limit: u32) -> Self {
        Self {
            url: url.into(),
            limit: limit.max(1),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}?limit={}&page=1&sort_by=lastChecked&sort_type=desc",
            self.url, self.limit
        )
    }
}

impl Default for GeonodeSource {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

fn parse_payload(raw: &str) -> Result<Vec<CandidateProxy>> {
    let payload: GeonodePayload =
        serde_json::from_str(raw).map_err(|e| ForagerError::SourceFetch {
            source_name: "proxylist.geonode.com",
            message: e.to_string(),
        })?;

    let now = Utc::now().timestamp();
    let candidates = payload
        .data
        .into_iter()
        .filter_map(|row| {
            let port: u16 = row.port.parse().ok()?;
            let age_secs = (now - row.last_checked).max(0);
            Some(CandidateProxy {
                ip: row.ip,
                port,
                country: row.country,
                anonymity: AnonymityLevel::parse(&row.anonymity_level),
                https: row.protocols.iter().any(|p| p.eq_ignore_ascii_case("https")),
                last_checked: if row.last_checked > 0 {
                    format!("{} secs ago", age_secs)
                } else {
                    String::new()
                },
            })
        })
        .collect();

    Ok(candidates)
}

#[async_trait]
impl ProxySource for GeonodeSource {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<CandidateProxy>> {
        let body = client.get(self.request_url()).send().await?.text().await?;
        parse_payload(&body)
    }

    fn name(&self) -> &'static str {
        "proxylist.geonode.com"
    }
}
