//! Tracing setup for harvester binaries
//!
//! Library code only emits `tracing` events; binaries call [`init`] once at
//! startup to install a subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the given level is applied to this
/// crate and `warn` to everything else. Calling this more than once is a
/// no-op, which keeps it safe in tests.
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("forager={},warn", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
