//! Round-robin proxy rotation over a fixed list

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::proxy::manager::ProxyManager;

/// Rotates over an ordered list of proxy URLs
///
/// A rotator built from an empty list is disabled; every rotator with a
/// non-empty list is enabled. The cursor advances atomically and wraps.
pub struct ProxyRotator {
    proxies: RwLock<Vec<String>>,
    index: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies: RwLock::new(proxies),
            index: AtomicUsize::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_enabled(&self) -> bool {
        !self.proxies.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.proxies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.read().is_empty()
    }

    /// Next proxy in round-robin order, or `None` when disabled.
    pub fn next(&self) -> Option<String> {
        let proxies = self.proxies.read();
        if proxies.is_empty() {
            return None;
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % proxies.len();
        proxies.get(idx).cloned()
    }

    /// Swap in a new proxy list, resetting the cursor so the changed list
    /// length cannot skew the rotation order.
    pub fn replace(&self, proxies: Vec<String>) {
        let mut guard = self.proxies.write();
        *guard = proxies;
        self.index.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.proxies.read().clone()
    }
}

impl ProxyManager for ProxyRotator {
    fn next_proxy(&self) -> Option<String> {
        self.next()
    }

    fn report_success(&self, _proxy_url: &str) {
        // The fixed-list rotator keeps no per-proxy health state.
    }

    fn report_failure(&self, _proxy_url: &str) {}

    fn rotate(&self) {
        self.index.fetch_add(1, Ordering::Relaxed);
    }

    fn status(&self) -> String {
        if self.is_enabled() {
            format!("rotating over {} proxies", self.len())
        } else {
            "disabled (no proxies)".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rotator_disabled() {
        let rotator = ProxyRotator::disabled();
        assert!(!rotator.is_enabled());
        assert_eq!(rotator.next(), None);
        assert_eq!(rotator.status(), "disabled (no proxies)");
    }

    #[test]
    fn test_round_robin_wraps() {
        let rotator = ProxyRotator::new(vec![
            "http://a:80".to_string(),
            "http://b:80".to_string(),
            "http://c:80".to_string(),
        ]);
        assert!(rotator.is_enabled());

        assert_eq!(rotator.next().as_deref(), Some("http://a:80"));
        assert_eq!(rotator.next().as_deref(), Some("http://b:80"));
        assert_eq!(rotator.next().as_deref(), Some("http://c:80"));
        assert_eq!(rotator.next().as_deref(), Some("http://a:80"));
    }

    #[test]
    fn test_replace_resets_cursor() {
        let rotator = ProxyRotator::new(vec!["http://a:80".to_string(), "http://b:80".to_string()]);
        rotator.next();

        rotator.replace(vec!["http://x:80".to_string(), "http://y:80".to_string()]);
        assert_eq!(rotator.next().as_deref(), Some("http://x:80"));
    }

    #[test]
    fn test_manager_rotate_advances() {
        let rotator = ProxyRotator::new(vec!["http://a:80".to_string(), "http://b:80".to_string()]);
        rotator.rotate();
        assert_eq!(rotator.next_proxy().as_deref(), Some("http://b:80"));
    }
}
