//! Retrying HTTP client
//!
//! Orchestrates one logical request: proxy selection, transport call,
//! outcome classification, backoff/rotation/retry loop, and statistics
//! recording.

mod transport;

pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backoff::{PROXY_ERROR_BACKOFF, SERVER_ERROR_BACKOFF};
use crate::error::{ForagerError, Result};
use crate::models::{ErrorKind, RequestOutcome};
use crate::proxy::manager::ProxyManager;
use crate::stats::ScraperStatistics;

/// Retrying client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total attempt budget per logical request
    pub max_attempts: u32,
    /// Per-attempt timeout
    pub request_timeout: Duration,
    /// Retry non-404 4xx responses as if they were server errors
    pub retry_client_errors: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            request_timeout: Duration::from_secs(30),
            retry_client_errors: false,
        }
    }
}

/// Terminal body-carrying result of a successful logical request
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
    pub proxy_used: Option<String>,
    /// Retries that preceded the successful attempt
    pub retries: u32,
}

/// HTTP client with proxy rotation, classified retries, and backoff
pub struct ResilientHttpClient {
    transport: Arc<dyn HttpTransport>,
    manager: Option<Arc<dyn ProxyManager>>,
    stats: Arc<ScraperStatistics>,
    config: HttpClientConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ResilientHttpClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        manager: Option<Arc<dyn ProxyManager>>,
        stats: Arc<ScraperStatistics>,
        config: HttpClientConfig,
    ) -> Result<Self> {
        if config.max_attempts == 0 {
            return Err(ForagerError::InvalidConfig(
                "max_attempts must be positive".into(),
            ));
        }
        Ok(Self {
            transport,
            manager,
            stats,
            config,
            shutdown: None,
        })
    }

    /// Attach a cancellation signal; retry waits observe it.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn stats(&self) -> Arc<ScraperStatistics> {
        self.stats.clone()
    }

    /// Caller-driven rotation: move off the current proxy before the next
    /// request.
    pub fn rotate_proxy(&self) {
        if let Some(manager) = &self.manager {
            manager.rotate();
        }
    }

    /// Diagnostic string: the proxy layer's view, or "no proxy" when
    /// proxying is disabled.
    pub fn proxy_status(&self) -> String {
        match &self.manager {
            Some(manager) => manager.status(),
            None => "no proxy".to_string(),
        }
    }

    /// Execute one logical GET with retries, backoff, and proxy rotation.
    pub async fn get(&self, url: &str) -> Result<PageResponse> {
        self.stats.request_started();
        let started = Instant::now();
        let mut last_proxy = None;
        let result = self.get_inner(url, &mut last_proxy).await;
        self.stats.request_finished();

        let outcome = self.outcome_of(&result, last_proxy, started.elapsed());
        self.record_outcome(&outcome);
        result
    }

    async fn get_inner(
        &self,
        url: &str,
        last_proxy: &mut Option<String>,
    ) -> Result<PageResponse> {
        let mut attempt = 0u32;
        let mut last_error = String::new();

        loop {
            attempt += 1;
            let proxy = match &self.manager {
                Some(manager) => match manager.next_proxy() {
                    Some(proxy) => Some(proxy),
                    // Proxying is on but nothing is eligible right now;
                    // surface that instead of silently going direct.
                    None => return Err(ForagerError::NoProxiesAvailable),
                },
                None => None,
            };
            last_proxy.clone_from(&proxy);

            debug!(
                url,
                attempt,
                max = self.config.max_attempts,
                proxy = proxy.as_deref().unwrap_or("none"),
                "Issuing request"
            );

            match self
                .transport
                .execute(url, proxy.as_deref(), self.config.request_timeout)
                .await
            {
                Ok(response) => {
                    self.stats.record_status(response.status);
                    self.stats.record_bytes_received(response.body.len() as u64);

                    match classify_status(response.status) {
                        StatusClass::Success => {
                            self.report_success(proxy.as_deref());
                            return Ok(PageResponse {
                                status: response.status,
                                body: response.body,
                                proxy_used: proxy,
                                retries: attempt - 1,
                            });
                        }
                        StatusClass::NotFound => {
                            // Terminal, counted separately from failures.
                            return Err(ForagerError::NotFound { url: url.into() });
                        }
                        StatusClass::ClientError if !self.config.retry_client_errors => {
                            return Err(ForagerError::ClientError {
                                status: response.status,
                                url: url.into(),
                            });
                        }
                        StatusClass::ClientError | StatusClass::ServerError => {
                            warn!(
                                url,
                                status = response.status,
                                attempt,
                                "Retryable HTTP status"
                            );
                            last_error = format!("HTTP {}", response.status);
                            self.report_failure(proxy.as_deref());

                            if attempt >= self.config.max_attempts {
                                break;
                            }
                            self.wait(SERVER_ERROR_BACKOFF.delay(attempt)).await?;
                        }
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        url,
                        attempt,
                        proxy = proxy.as_deref().unwrap_or("none"),
                        "Request attempt failed: {}", e
                    );
                    last_error = e.to_string();
                    self.report_failure(proxy.as_deref());

                    if attempt >= self.config.max_attempts {
                        break;
                    }
                    self.wait(PROXY_ERROR_BACKOFF.delay(attempt)).await?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ForagerError::RequestExhausted {
            attempts: attempt,
            last_error,
        })
    }

    fn report_success(&self, proxy: Option<&str>) {
        if let (Some(manager), Some(proxy)) = (&self.manager, proxy) {
            manager.report_success(proxy);
        }
    }

    fn report_failure(&self, proxy: Option<&str>) {
        if let (Some(manager), Some(proxy)) = (&self.manager, proxy) {
            manager.report_failure(proxy);
        }
    }

    /// Sleep for the backoff delay, bailing out early on cancellation. The
    /// delay only suspends this request's own continuation.
    async fn wait(&self, delay: Duration) -> Result<()> {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        let mut shutdown = shutdown.clone();
        if *shutdown.borrow() {
            return Err(ForagerError::Cancelled);
        }

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Err(ForagerError::Cancelled);
                    }
                }
            }
        }
    }

    /// Build the bookkeeping record for a finished logical request.
    /// `proxy_used` is the proxy of the last attempt, so failed requests
    /// keep their proxy attribution too.
    fn outcome_of(
        &self,
        result: &Result<PageResponse>,
        proxy_used: Option<String>,
        elapsed: Duration,
    ) -> RequestOutcome {
        match result {
            Ok(response) => RequestOutcome::success(
                response.status,
                response.proxy_used.clone(),
                elapsed,
            ),
            Err(ForagerError::NotFound { .. }) => {
                RequestOutcome::failure(Some(404), proxy_used, elapsed, ErrorKind::NotFound)
            }
            Err(ForagerError::ClientError { status, .. }) => {
                RequestOutcome::failure(Some(*status), proxy_used, elapsed, ErrorKind::ClientError)
            }
            Err(ForagerError::Cancelled) => {
                RequestOutcome::failure(None, proxy_used, elapsed, ErrorKind::Cancelled)
            }
            Err(ForagerError::RequestExhausted { last_error, .. }) => {
                let kind = if last_error.starts_with("HTTP ") {
                    ErrorKind::ServerError
                } else {
                    ErrorKind::Network
                };
                RequestOutcome::failure(None, proxy_used, elapsed, kind)
            }
            Err(_) => RequestOutcome::failure(None, proxy_used, elapsed, ErrorKind::Network),
        }
    }

    fn record_outcome(&self, outcome: &RequestOutcome) {
        self.stats.record_processed();
        match outcome.error_kind {
            ErrorKind::None => self.stats.record_success(),
            ErrorKind::NotFound => self.stats.record_not_found(),
            ErrorKind::Cancelled => self.stats.record_skipped(),
            ErrorKind::ClientError | ErrorKind::ServerError | ErrorKind::Network => {
                self.stats.record_failed()
            }
        }
    }
}

enum StatusClass {
    Success,
    NotFound,
    ClientError,
    ServerError,
}

fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=399 => StatusClass::Success,
        404 => StatusClass::NotFound,
        400..=499 => StatusClass::ClientError,
        // 5xx, and anything outside the ordinary ranges, is retried as a
        // server-side problem.
        _ => StatusClass::ServerError,
    }
}
