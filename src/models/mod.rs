//! Data model types shared across the retrieval core

mod outcome;
mod proxy;

pub use outcome::{ErrorKind, RequestOutcome};
pub use proxy::{
    AnonymityLevel, CandidateProxy, ProxyEntry, WhitelistSnapshot, WHITELIST_VERSION,
};
