//! Whitelist of known-good proxies
//!
//! Per-entry health bookkeeping with a single cooldown clock, a sticky
//! current proxy, round-robin scanning, retry-budget eviction, and periodic
//! persistence through the store abstraction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::models::{ProxyEntry, WhitelistSnapshot};
use crate::proxy::manager::ProxyManager;
use crate::proxy::store::WhitelistStore;

/// Whitelist behavior configuration
#[derive(Debug, Clone)]
pub struct WhitelistConfig {
    /// Minimum elapsed time since last use before a proxy is eligible again.
    /// One clock governs both routine reuse spacing and failure recovery.
    pub cooldown: Duration,
    /// Failures tolerated before an entry is evicted permanently
    pub max_retry_attempts: u32,
    /// Interval between automatic snapshot saves
    pub autosave_interval: Duration,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(600),
            max_retry_attempts: 3,
            autosave_interval: Duration::from_secs(300),
        }
    }
}

struct WhitelistState {
    entries: Vec<ProxyEntry>,
    /// Round-robin scan cursor, persisted across calls and wrapping
    cursor: usize,
    /// Sticky current proxy: keep reusing the proxy that last succeeded
    /// instead of rotating on every call
    current: Option<String>,
}

/// Owner of the known-good proxy list
///
/// All entry mutations and cursor movement happen under one lock; the lock
/// is never held across persistence I/O.
pub struct WhitelistManager {
    state: Mutex<WhitelistState>,
    store: Arc<dyn WhitelistStore>,
    config: WhitelistConfig,
}

impl WhitelistManager {
    pub fn new(store: Arc<dyn WhitelistStore>, config: WhitelistConfig) -> Self {
        Self {
            state: Mutex::new(WhitelistState {
                entries: Vec::new(),
                cursor: 0,
                current: None,
            }),
            store,
            config,
        }
    }

    /// Replace the in-memory list from the store. Called once at startup;
    /// resets the scan cursor and the sticky current proxy.
    pub async fn load_state(&self) {
        let snapshot = self.store.load().await;
        let count = snapshot.entries.len();

        let mut state = self.state.lock();
        state.entries = snapshot.entries;
        state.cursor = 0;
        state.current = None;
        drop(state);

        info!(count, "Whitelist loaded");
    }

    /// Number of whitelisted proxies.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Look up a copy of an entry, mainly for diagnostics and tests.
    pub fn entry(&self, proxy_url: &str) -> Option<ProxyEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .find(|e| e.proxy_url == proxy_url)
            .cloned()
    }

    /// Cheap copy of the current entry list for persistence.
    fn snapshot(&self) -> WhitelistSnapshot {
        WhitelistSnapshot::new(self.state.lock().entries.clone())
    }

    /// Serialize and persist the current whitelist.
    pub async fn save(&self) -> Result<()> {
        // Snapshot under the lock, write outside it.
        let snapshot = self.snapshot();
        self.store.save(&snapshot).await
    }

    /// Next usable proxy: the sticky current proxy when set, otherwise the
    /// first entry past cooldown in a bounded round-robin scan of at most
    /// one full cycle.
    pub fn get_next_proxy(&self) -> Option<String> {
        let mut state = self.state.lock();

        if let Some(current) = state.current.clone() {
            return Some(current);
        }

        let len = state.entries.len();
        if len == 0 {
            return None;
        }

        let now = Utc::now();
        let cooldown = chrono::Duration::from_std(self.config.cooldown).unwrap_or_default();

        for offset in 0..len {
            let idx = (state.cursor + offset) % len;
            if state.entries[idx].is_available(now, cooldown) {
                state.cursor = (idx + 1) % len;
                return Some(state.entries[idx].proxy_url.clone());
            }
        }

        debug!("Whitelist scan found no proxy outside cooldown");
        None
    }

    /// Record a success: reset the entry's failure state, stamp `last_used`,
    /// and make this proxy the sticky current one. Unknown URLs are
    /// inserted as fresh trusted entries.
    pub fn record_success(&self, proxy_url: &str) {
        let now = Utc::now();
        let mut state = self.state.lock();

        match state.entries.iter_mut().find(|e| e.proxy_url == proxy_url) {
            Some(entry) => entry.mark_success(now),
            None => {
                let mut entry = ProxyEntry::new(proxy_url);
                entry.last_used = now;
                state.entries.push(entry);
                debug!(proxy = proxy_url, "Added proxy to whitelist after success");
            }
        }

        state.current = Some(proxy_url.to_string());
    }

    /// Record a failure: bump the retry count, start the failure streak
    /// timestamp if needed, and evict permanently once the retry budget is
    /// exhausted. Clears the sticky current proxy if it matches.
    pub fn record_failure(&self, proxy_url: &str) {
        let now = Utc::now();
        let mut state = self.state.lock();

        if state.current.as_deref() == Some(proxy_url) {
            state.current = None;
        }

        let Some(idx) = state.entries.iter().position(|e| e.proxy_url == proxy_url) else {
            debug!(proxy = proxy_url, "Failure reported for unknown proxy");
            return;
        };

        let retry_count = state.entries[idx].mark_failure(now);
        if retry_count >= self.config.max_retry_attempts {
            state.entries.remove(idx);
            // Keep the cursor pointing at the same logical position.
            if idx < state.cursor {
                state.cursor -= 1;
            }
            if !state.entries.is_empty() {
                state.cursor %= state.entries.len();
            } else {
                state.cursor = 0;
            }
            warn!(
                proxy = proxy_url,
                retries = retry_count,
                "Proxy evicted from whitelist after exhausting retry budget"
            );
        } else {
            debug!(
                proxy = proxy_url,
                retries = retry_count,
                "Proxy failure recorded"
            );
        }
    }

    /// Handle a daily-quota signal from the target site. A known proxy just
    /// has its `last_used` refreshed, putting it into cooldown without
    /// marking a failure. An unknown proxy is inserted as trusted, since a
    /// quota response proves the proxy itself works.
    pub fn record_daily_limit_reached(&self, proxy_url: &str) {
        let now = Utc::now();
        let mut state = self.state.lock();

        if state.current.as_deref() == Some(proxy_url) {
            state.current = None;
        }

        match state.entries.iter_mut().find(|e| e.proxy_url == proxy_url) {
            Some(entry) => {
                entry.last_used = now;
                info!(proxy = proxy_url, "Proxy hit daily limit, cooling down");
            }
            None => {
                let mut entry = ProxyEntry::new(proxy_url);
                entry.last_used = now;
                state.entries.push(entry);
                // Promotion happens without an independent liveness probe.
                warn!(
                    proxy = proxy_url,
                    "Unknown proxy promoted to whitelist on daily-limit signal"
                );
            }
        }
    }

    /// Drop the sticky current proxy so the next selection rotates.
    pub fn clear_current(&self) {
        self.state.lock().current = None;
    }

    /// Run the autosave loop until shutdown, then perform one final save.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting whitelist autosave ({}s interval)",
            self.config.autosave_interval.as_secs()
        );

        let mut ticker = interval(self.config.autosave_interval);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.save().await {
                        warn!("Whitelist autosave failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Stop ticking first, then take the final synchronous save.
        if let Err(e) = self.save().await {
            warn!("Final whitelist save failed: {}", e);
        }
        info!("Whitelist autosave stopped");
    }
}

impl ProxyManager for WhitelistManager {
    fn next_proxy(&self) -> Option<String> {
        self.get_next_proxy()
    }

    fn report_success(&self, proxy_url: &str) {
        self.record_success(proxy_url);
    }

    fn report_failure(&self, proxy_url: &str) {
        self.record_failure(proxy_url);
    }

    fn rotate(&self) {
        self.clear_current();
    }

    fn status(&self) -> String {
        let state = self.state.lock();
        match &state.current {
            Some(current) => format!(
                "whitelist: {} proxies, current {}",
                state.entries.len(),
                current
            ),
            None => format!("whitelist: {} proxies, no current", state.entries.len()),
        }
    }
}

/// Handle for stopping the whitelist autosave loop
pub struct WhitelistHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl WhitelistHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for WhitelistHandle {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::store::MemoryStore;

    fn manager_with(cooldown: Duration, max_retries: u32) -> WhitelistManager {
        WhitelistManager::new(
            Arc::new(MemoryStore::new()),
            WhitelistConfig {
                cooldown,
                max_retry_attempts: max_retries,
                autosave_interval: Duration::from_secs(300),
            },
        )
    }

    #[test]
    fn test_success_inserts_and_sets_sticky() {
        let manager = manager_with(Duration::from_secs(60), 3);
        manager.record_success("http://a:80");

        let entry = manager.entry("http://a:80").unwrap();
        assert!(!entry.is_failed);
        assert_eq!(entry.retry_count, 0);

        // Sticky current wins even though the entry itself is in cooldown.
        assert_eq!(manager.get_next_proxy().as_deref(), Some("http://a:80"));
    }

    #[test]
    fn test_eviction_after_retry_budget() {
        let manager = manager_with(Duration::from_secs(0), 3);
        manager.record_success("http://a:80");

        manager.record_failure("http://a:80");
        manager.record_failure("http://a:80");
        assert!(manager.entry("http://a:80").is_some());

        manager.record_failure("http://a:80");
        assert!(manager.entry("http://a:80").is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_intervening_success_resets_budget() {
        let manager = manager_with(Duration::from_secs(0), 3);
        manager.record_success("http://a:80");

        manager.record_failure("http://a:80");
        manager.record_failure("http://a:80");
        manager.record_success("http://a:80");
        assert_eq!(manager.entry("http://a:80").unwrap().retry_count, 0);

        // Needs a fresh full budget of failures to evict.
        manager.record_failure("http://a:80");
        manager.record_failure("http://a:80");
        assert!(manager.entry("http://a:80").is_some());
        manager.record_failure("http://a:80");
        assert!(manager.entry("http://a:80").is_none());
    }

    #[test]
    fn test_failure_clears_sticky_current() {
        let manager = manager_with(Duration::from_millis(0), 5);
        manager.record_success("http://a:80");
        manager.record_success("http://b:80");
        assert_eq!(manager.get_next_proxy().as_deref(), Some("http://b:80"));

        manager.record_failure("http://b:80");
        // Sticky cleared; scan picks an available entry instead.
        let next = manager.get_next_proxy();
        assert!(next.is_some());
        assert_ne!(next.as_deref(), None);
    }

    #[test]
    fn test_daily_limit_promotes_unknown_as_trusted() {
        let manager = manager_with(Duration::from_secs(60), 3);
        manager.record_daily_limit_reached("http://new:80");

        let entry = manager.entry("http://new:80").unwrap();
        assert!(!entry.is_failed);
        assert_eq!(entry.retry_count, 0);
        // Quota signal puts it straight into cooldown.
        assert_eq!(manager.get_next_proxy(), None);
    }

    #[test]
    fn test_daily_limit_cools_down_known_proxy_without_failure() {
        let manager = manager_with(Duration::from_secs(60), 3);
        manager.record_success("http://a:80");
        manager.record_failure("http://a:80");
        let retries_before = manager.entry("http://a:80").unwrap().retry_count;

        manager.record_daily_limit_reached("http://a:80");
        let entry = manager.entry("http://a:80").unwrap();
        assert_eq!(entry.retry_count, retries_before);
        assert!(!entry.is_available(
            Utc::now(),
            chrono::Duration::from_std(Duration::from_secs(60)).unwrap()
        ));
    }

    #[test]
    fn test_get_next_honors_cooldown() {
        let manager = manager_with(Duration::from_secs(3600), 3);
        manager.record_success("http://a:80");
        manager.clear_current();

        // last_used was just stamped; the only entry is inside cooldown.
        assert_eq!(manager.get_next_proxy(), None);
    }

    #[test]
    fn test_round_robin_visits_each_eligible_once_per_cycle() {
        let manager = manager_with(Duration::from_secs(0), 3);
        // load_state-style insertion through the store keeps last_used at
        // epoch, so everything starts eligible.
        {
            let mut state = manager.state.lock();
            state.entries = vec![
                ProxyEntry::new("http://a:80"),
                ProxyEntry::new("http://b:80"),
                ProxyEntry::new("http://c:80"),
            ];
        }

        let first_cycle: Vec<_> = (0..3).filter_map(|_| manager.get_next_proxy()).collect();
        assert_eq!(first_cycle, vec!["http://a:80", "http://b:80", "http://c:80"]);

        // Next cycle starts over in the same order.
        assert_eq!(manager.get_next_proxy().as_deref(), Some("http://a:80"));
    }

    #[tokio::test]
    async fn test_load_state_replaces_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(&WhitelistSnapshot::new(vec![
                ProxyEntry::new("http://persisted:80"),
            ]))
            .await
            .unwrap();

        let manager = WhitelistManager::new(store, WhitelistConfig::default());
        manager.record_success("http://transient:80");

        manager.load_state().await;
        assert_eq!(manager.len(), 1);
        assert!(manager.entry("http://persisted:80").is_some());
        assert!(manager.entry("http://transient:80").is_none());
        // Sticky current was reset along with the list.
        assert_eq!(manager.get_next_proxy().as_deref(), Some("http://persisted:80"));
    }

    #[tokio::test]
    async fn test_autosave_loop_saves_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(WhitelistManager::new(
            store.clone(),
            WhitelistConfig {
                cooldown: Duration::from_secs(60),
                max_retry_attempts: 3,
                autosave_interval: Duration::from_secs(3600),
            },
        ));
        manager.record_success("http://a:80");

        let (handle, shutdown_rx) = WhitelistHandle::new();
        let task = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.run(shutdown_rx).await })
        };

        handle.shutdown();
        task.await.unwrap();

        // Final synchronous save happened despite no tick firing.
        assert_eq!(store.saved_entries(), 1);
    }
}
