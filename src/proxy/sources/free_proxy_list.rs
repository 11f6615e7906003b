//! free-proxy-list.net HTML table source

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::ProxySource;
use crate::error::{ForagerError, Result};
use crate::models::{AnonymityLevel, CandidateProxy};

const FREE_PROXY_LIST_URL: &str = "https://free-proxy-list.net/";

/// Expected column layout of the proxy table:
/// IP, port, country, country code (unused), anonymity, (unused),
/// HTTPS flag ("yes"/other), last-checked text.
const EXPECTED_COLUMNS: usize = 8;

/// HTML table scrape of a public proxy-list page
pub struct FreeProxyListSource {
    url: String,
}

impl FreeProxyListSource {
    pub fn new() -> Self {
        Self {
            url: FREE_PROXY_LIST_URL.to_string(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for FreeProxyListSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_proxy_table(body: &str) -> Result<Vec<CandidateProxy>> {
    let doc = Html::parse_document(body);
    let row_selector = Selector::parse("table tbody tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut candidates = Vec::new();
    for row in doc.select(&row_selector) {
        let cols: Vec<String> = row
            .select(&td_selector)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();

        // Malformed/short rows are skipped, never abort the fetch.
        if cols.len() < EXPECTED_COLUMNS {
            continue;
        }

        let Ok(port) = cols[1].parse::<u16>() else {
            continue;
        };

        candidates.push(CandidateProxy {
            ip: cols[0].clone(),
            port,
            country: cols[2].clone(),
            anonymity: AnonymityLevel::parse(&cols[4]),
            https: cols[6].eq_ignore_ascii_case("yes"),
            last_checked: cols[7].clone(),
        });
    }

    if candidates.is_empty() {
        return Err(ForagerError::EmptySource);
    }
    Ok(candidates)
}

#[async_trait]
impl ProxySource for FreeProxyListSource {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<CandidateProxy>> {
        let body = client
            .get(&self.url)
            .header("Accept-Language", "en-US,en;q=0.8")
            .send()
            .await?
            .text()
            .await?;
        parse_proxy_table(&body)
    }

    fn name(&self) -> &'static str {
        "free-proxy-list.net"
    }
}
