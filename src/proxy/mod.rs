//! Proxy pooling, health tracking, and rotation
//!
//! The whitelist manager owns the durable set of known-good proxies; the
//! rotator pair offers a simpler round-robin alternative. Both implement the
//! [`ProxyManager`] capability the HTTP client depends on.

pub mod dynamic;
pub mod manager;
pub mod pool;
pub mod provider;
pub mod rotator;
pub mod sources;
pub mod store;
pub mod whitelist;

pub use dynamic::{DynamicProxyRotator, DynamicRotatorConfig};
pub use manager::ProxyManager;
pub use pool::{UntestedProxyPool, DEFAULT_POOL_CAPACITY};
pub use provider::{ProviderConfig, ProxyProvider};
pub use rotator::ProxyRotator;
pub use sources::{filter_and_rank, ProxySource};
pub use store::{dump_proxy_list, JsonFileStore, MemoryStore, WhitelistStore};
pub use whitelist::{WhitelistConfig, WhitelistHandle, WhitelistManager};
