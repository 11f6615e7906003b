//! Dynamically-refreshing proxy rotator
//!
//! Wraps the plain rotator with a provider that can refetch its proxy list
//! on an interval or on demand. Refresh failures keep the stale list in
//! service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, instrument, warn};

use crate::proxy::manager::ProxyManager;
use crate::proxy::provider::ProxyProvider;
use crate::proxy::rotator::ProxyRotator;
use crate::proxy::sources::ProxySource;

/// Dynamic rotator configuration
#[derive(Debug, Clone)]
pub struct DynamicRotatorConfig {
    /// Whether the background refresh loop runs at all
    pub auto_update: bool,
    /// Interval between background refreshes
    pub update_interval: Duration,
}

impl Default for DynamicRotatorConfig {
    fn default() -> Self {
        Self {
            auto_update: true,
            update_interval: Duration::from_secs(1800),
        }
    }
}

/// Round-robin rotator whose list is refreshed from a provider
pub struct DynamicProxyRotator {
    rotator: Arc<ProxyRotator>,
    provider: Arc<ProxyProvider>,
    sources: Vec<Box<dyn ProxySource>>,
    config: DynamicRotatorConfig,
    last_update: Mutex<Option<DateTime<Utc>>>,
}

impl DynamicProxyRotator {
    /// Build the rotator, reusing the provider's already-accumulated list
    /// when it has one and performing an initial source load otherwise.
    pub async fn new(
        provider: Arc<ProxyProvider>,
        sources: Vec<Box<dyn ProxySource>>,
        config: DynamicRotatorConfig,
    ) -> Self {
        let rotator = Self {
            rotator: Arc::new(ProxyRotator::disabled()),
            provider,
            sources,
            config,
            last_update: Mutex::new(None),
        };

        if rotator.provider.is_empty() {
            rotator.force_update().await;
        } else {
            rotator.rotator.replace(rotator.provider.proxies());
            *rotator.last_update.lock() = Some(Utc::now());
        }

        rotator
    }

    /// Out-of-band refresh: stage fresh candidates from the sources, run
    /// the validation sweep, and swap the promoted list in. When the
    /// refresh yields nothing the stale list keeps serving.
    pub async fn force_update(&self) {
        let staged = self.provider.load_from_sources(&self.sources).await;
        let promoted = self.provider.validate_candidates().await;
        let proxies = self.provider.proxies();

        if proxies.is_empty() {
            warn!("Proxy refresh produced no proxies, keeping previous list");
            return;
        }

        self.rotator.replace(proxies);
        *self.last_update.lock() = Some(Utc::now());
        info!(
            staged,
            promoted,
            total = self.rotator.len(),
            "Proxy rotator list refreshed"
        );
    }

    /// Human-readable summary: proxy count and last update time.
    pub fn status(&self) -> String {
        let last = match *self.last_update.lock() {
            Some(t) => t.to_rfc3339(),
            None => "never".to_string(),
        };
        format!("{} proxies, last update {}", self.rotator.len(), last)
    }

    pub fn rotator(&self) -> Arc<ProxyRotator> {
        self.rotator.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.rotator.is_enabled()
    }

    /// Run the background refresh loop until shutdown.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if !self.config.auto_update {
            return;
        }

        info!(
            "Starting proxy rotator auto-update ({}s interval)",
            self.config.update_interval.as_secs()
        );

        let mut ticker = interval(self.config.update_interval);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.force_update().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Proxy rotator auto-update stopped");
                        break;
                    }
                }
            }
        }
    }
}

impl ProxyManager for DynamicProxyRotator {
    fn next_proxy(&self) -> Option<String> {
        self.rotator.next()
    }

    fn report_success(&self, proxy_url: &str) {
        self.rotator.report_success(proxy_url);
    }

    fn report_failure(&self, proxy_url: &str) {
        self.rotator.report_failure(proxy_url);
    }

    fn rotate(&self) {
        self.rotator.rotate();
    }

    fn status(&self) -> String {
        DynamicProxyRotator::status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::provider::ProviderConfig;

    fn seeded_provider(urls: &[&str]) -> Arc<ProxyProvider> {
        let provider = ProxyProvider::new(ProviderConfig::default()).unwrap();
        provider.add_many(urls.iter().copied());
        Arc::new(provider)
    }

    #[tokio::test]
    async fn test_reuses_preloaded_provider_list() {
        let provider = seeded_provider(&["http://a:80", "http://b:80"]);
        let rotator = DynamicProxyRotator::new(
            provider,
            Vec::new(),
            DynamicRotatorConfig {
                auto_update: false,
                update_interval: Duration::from_secs(60),
            },
        )
        .await;

        assert!(rotator.is_enabled());
        assert_eq!(rotator.next_proxy().as_deref(), Some("http://a:80"));
        assert_eq!(rotator.next_proxy().as_deref(), Some("http://b:80"));
        assert!(rotator.status().contains("2 proxies"));
    }

    #[tokio::test]
    async fn test_empty_provider_and_no_sources_stays_disabled() {
        let provider = seeded_provider(&[]);
        let rotator = DynamicProxyRotator::new(
            provider,
            Vec::new(),
            DynamicRotatorConfig::default(),
        )
        .await;

        assert!(!rotator.is_enabled());
        assert_eq!(rotator.next_proxy(), None);
        assert!(rotator.status().contains("last update never"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_list() {
        let provider = seeded_provider(&["http://a:80"]);
        let rotator = DynamicProxyRotator::new(
            provider.clone(),
            Vec::new(),
            DynamicRotatorConfig {
                auto_update: false,
                update_interval: Duration::from_secs(60),
            },
        )
        .await;

        provider.clear();
        rotator.force_update().await;

        // The stale list keeps serving.
        assert_eq!(rotator.next_proxy().as_deref(), Some("http://a:80"));
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let provider = seeded_provider(&["http://a:80"]);
        let rotator = Arc::new(
            DynamicProxyRotator::new(
                provider,
                Vec::new(),
                DynamicRotatorConfig {
                    auto_update: true,
                    update_interval: Duration::from_secs(3600),
                },
            )
            .await,
        );

        let (tx, rx) = watch::channel(false);
        let task = {
            let rotator = rotator.clone();
            tokio::spawn(async move { rotator.run(rx).await })
        };

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
