//! HTTP transport seam
//!
//! The retrying client talks to the network through this trait so tests can
//! substitute a scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

/// Raw result of one transport-level request attempt
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// One HTTP request attempt, optionally through a proxy
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        url: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<TransportResponse>;
}

/// reqwest-backed transport
///
/// Proxy settings are fixed at client-build time in reqwest, so a client is
/// built per proxy URL and cached for reuse.
pub struct ReqwestTransport {
    direct: reqwest::Client,
    per_proxy: DashMap<String, reqwest::Client>,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let user_agent =
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string();
        let direct = reqwest::Client::builder()
            .user_agent(&user_agent)
            .build()?;
        Ok(Self {
            direct,
            per_proxy: DashMap::new(),
            user_agent,
        })
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<reqwest::Client> {
        let Some(proxy_url) = proxy else {
            return Ok(self.direct.clone());
        };

        if let Some(client) = self.per_proxy.get(proxy_url) {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .proxy(reqwest::Proxy::all(proxy_url)?)
            .build()?;
        self.per_proxy.insert(proxy_url.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        url: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let client = self.client_for(proxy)?;
        let response = client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
