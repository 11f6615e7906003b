//! Proxy selection capability shared by the whitelist and the rotator

/// Capability for selecting proxies and reporting request outcomes
///
/// The retrying HTTP client depends on this trait, not on a concrete
/// manager, so the whitelist and the simple rotator are interchangeable.
pub trait ProxyManager: Send + Sync {
    /// Next usable proxy URL, or `None` when nothing is eligible.
    fn next_proxy(&self) -> Option<String>;

    /// Record a successful request through the given proxy.
    fn report_success(&self, proxy_url: &str);

    /// Record a failed request through the given proxy.
    fn report_failure(&self, proxy_url: &str);

    /// Caller-driven rotation: drop any short-term proxy preference so the
    /// next selection moves on.
    fn rotate(&self);

    /// Human-readable diagnostic summary.
    fn status(&self) -> String;
}
