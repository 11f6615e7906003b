use std::env;
use std::time::Duration;

use crate::error::{ForagerError, Result};
use crate::http::HttpClientConfig;
use crate::proxy::provider::ProviderConfig;
use crate::proxy::whitelist::WhitelistConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Proxy layer configuration
    pub proxy: ProxyConfig,
    /// Retrying HTTP client configuration
    pub http: HttpConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Whether requests go through proxies at all (default: true)
    pub enabled: bool,
    /// Static proxy list (comma-separated, may be empty)
    pub static_proxies: Vec<String>,
    /// Path of the whitelist snapshot file
    pub whitelist_path: String,
    /// Cooldown before a whitelisted proxy is eligible again, seconds
    pub cooldown_secs: u64,
    /// Failures tolerated before eviction from the whitelist
    pub max_retry_attempts: u32,
    /// Whitelist autosave interval, seconds
    pub autosave_interval_secs: u64,
    /// Proxy-list source page URL override (empty = built-in sources)
    pub source_url: String,
    /// Capacity of the untested candidate pool
    pub untested_pool_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-attempt request timeout, seconds
    pub request_timeout_secs: u64,
    /// Total attempt budget per logical request
    pub max_attempts: u32,
    /// Retry non-404 4xx responses
    pub retry_client_errors: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            proxy: ProxyConfig {
                enabled: get_env_or("FORAGER_PROXY_ENABLED", "true")
                    .parse()
                    .unwrap_or(true),
                static_proxies: get_env_or("FORAGER_STATIC_PROXIES", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                whitelist_path: get_env_or("FORAGER_WHITELIST_PATH", "whitelist.json"),
                cooldown_secs: get_env_or("FORAGER_COOLDOWN_SECS", "600")
                    .parse()
                    .unwrap_or(600),
                max_retry_attempts: get_env_or("FORAGER_MAX_RETRY_ATTEMPTS", "3")
                    .parse()
                    .unwrap_or(3),
                autosave_interval_secs: get_env_or("FORAGER_AUTOSAVE_SECS", "300")
                    .parse()
                    .unwrap_or(300),
                source_url: get_env_or("FORAGER_PROXY_SOURCE_URL", ""),
                untested_pool_capacity: parse_pool_capacity()?,
            },
            http: HttpConfig {
                request_timeout_secs: get_env_or("FORAGER_REQUEST_TIMEOUT", "30")
                    .parse()
                    .unwrap_or(30),
                max_attempts: get_env_or("FORAGER_HTTP_MAX_ATTEMPTS", "5")
                    .parse()
                    .unwrap_or(5),
                retry_client_errors: get_env_or("FORAGER_RETRY_CLIENT_ERRORS", "false")
                    .parse()
                    .unwrap_or(false),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
            },
        })
    }

    /// Whitelist manager settings derived from this configuration
    pub fn whitelist_config(&self) -> WhitelistConfig {
        WhitelistConfig {
            cooldown: Duration::from_secs(self.proxy.cooldown_secs),
            max_retry_attempts: self.proxy.max_retry_attempts,
            autosave_interval: Duration::from_secs(self.proxy.autosave_interval_secs),
        }
    }

    /// Proxy provider settings derived from this configuration
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            pool_capacity: self.proxy.untested_pool_capacity,
            ..ProviderConfig::default()
        }
    }

    /// Retrying client settings derived from this configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            max_attempts: self.http.max_attempts,
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            retry_client_errors: self.http.retry_client_errors,
        }
    }
}

fn parse_pool_capacity() -> Result<usize> {
    let raw = get_env_or("FORAGER_POOL_CAPACITY", "1000");
    let capacity: usize = raw.parse().map_err(|_| {
        ForagerError::InvalidConfig("FORAGER_POOL_CAPACITY must be a valid number".into())
    })?;
    if capacity == 0 {
        return Err(ForagerError::InvalidConfig(
            "FORAGER_POOL_CAPACITY must be positive".into(),
        ));
    }
    Ok(capacity)
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "FORAGER_PROXY_ENABLED",
        "FORAGER_STATIC_PROXIES",
        "FORAGER_WHITELIST_PATH",
        "FORAGER_COOLDOWN_SECS",
        "FORAGER_MAX_RETRY_ATTEMPTS",
        "FORAGER_AUTOSAVE_SECS",
        "FORAGER_PROXY_SOURCE_URL",
        "FORAGER_POOL_CAPACITY",
        "FORAGER_REQUEST_TIMEOUT",
        "FORAGER_HTTP_MAX_ATTEMPTS",
        "FORAGER_RETRY_CLIENT_ERRORS",
        "LOG_LEVEL",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert!(config.proxy.enabled);
        assert!(config.proxy.static_proxies.is_empty());
        assert_eq!(config.proxy.whitelist_path, "whitelist.json");
        assert_eq!(config.proxy.cooldown_secs, 600);
        assert_eq!(config.proxy.max_retry_attempts, 3);
        assert_eq!(config.proxy.untested_pool_capacity, 1000);
        assert_eq!(config.http.max_attempts, 5);
        assert!(!config.http.retry_client_errors);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("FORAGER_PROXY_ENABLED", "false");
        env::set_var(
            "FORAGER_STATIC_PROXIES",
            "http://a.example:3128, socks5://b.example:1080",
        );
        env::set_var("FORAGER_COOLDOWN_SECS", "120");
        env::set_var("FORAGER_POOL_CAPACITY", "50");
        env::set_var("FORAGER_HTTP_MAX_ATTEMPTS", "7");

        let config = Config::from_env().unwrap();

        assert!(!config.proxy.enabled);
        assert_eq!(
            config.proxy.static_proxies,
            vec![
                "http://a.example:3128".to_string(),
                "socks5://b.example:1080".to_string()
            ]
        );
        assert_eq!(config.proxy.cooldown_secs, 120);
        assert_eq!(config.proxy.untested_pool_capacity, 50);
        assert_eq!(config.http.max_attempts, 7);
    }

    #[test]
    fn test_config_rejects_bad_pool_capacity() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("FORAGER_POOL_CAPACITY", "not-a-number");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ForagerError::InvalidConfig(_)
        ));

        env::set_var("FORAGER_POOL_CAPACITY", "0");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ForagerError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_derived_configs() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("FORAGER_COOLDOWN_SECS", "60");
        env::set_var("FORAGER_REQUEST_TIMEOUT", "10");
        env::set_var("FORAGER_POOL_CAPACITY", "25");

        let config = Config::from_env().unwrap();
        assert_eq!(config.whitelist_config().cooldown, Duration::from_secs(60));
        assert_eq!(
            config.http_client_config().request_timeout,
            Duration::from_secs(10)
        );
        assert_eq!(config.provider_config().pool_capacity, 25);
    }
}
