use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Current whitelist snapshot format version
pub const WHITELIST_VERSION: u32 = 1;

/// Health record for a single whitelisted proxy
///
/// `retry_count` resets to 0 on any reported success. `failed_since` is set
/// exactly once per failure streak (first failure after a success) and
/// cleared on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEntry {
    pub proxy_url: String,
    pub last_used: DateTime<Utc>,
    pub is_failed: bool,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_since: Option<DateTime<Utc>>,
}

impl ProxyEntry {
    /// Create a fresh trusted entry, dated far enough in the past to be
    /// immediately eligible for selection.
    pub fn new(proxy_url: impl Into<String>) -> Self {
        Self {
            proxy_url: proxy_url.into(),
            last_used: DateTime::<Utc>::UNIX_EPOCH,
            is_failed: false,
            retry_count: 0,
            failed_since: None,
        }
    }

    /// Availability predicate: a single cooldown clock governs both routine
    /// reuse spacing and failure recovery.
    pub fn is_available(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        now - self.last_used > cooldown
    }

    /// Apply a reported success.
    pub fn mark_success(&mut self, now: DateTime<Utc>) {
        self.is_failed = false;
        self.retry_count = 0;
        self.failed_since = None;
        self.last_used = now;
    }

    /// Apply a reported failure. Returns the new retry count.
    pub fn mark_failure(&mut self, now: DateTime<Utc>) -> u32 {
        self.retry_count += 1;
        self.is_failed = true;
        if self.failed_since.is_none() {
            self.failed_since = Some(now);
        }
        self.retry_count
    }
}

/// Versioned unit of whitelist persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistSnapshot {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub entries: Vec<ProxyEntry>,
}

impl WhitelistSnapshot {
    pub fn new(entries: Vec<ProxyEntry>) -> Self {
        Self {
            version: WHITELIST_VERSION,
            last_updated: Utc::now(),
            entries,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// Anonymity classification of a scraped proxy candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymityLevel {
    Transparent,
    Anonymous,
    Elite,
}

impl AnonymityLevel {
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        if s.contains("elite") {
            AnonymityLevel::Elite
        } else if s.contains("anonymous") {
            AnonymityLevel::Anonymous
        } else {
            AnonymityLevel::Transparent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnonymityLevel::Transparent => "transparent",
            AnonymityLevel::Anonymous => "anonymous",
            AnonymityLevel::Elite => "elite",
        }
    }
}

impl std::fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pre-vetting proxy record produced by a source fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProxy {
    pub ip: String,
    pub port: u16,
    pub country: String,
    pub anonymity: AnonymityLevel,
    pub https: bool,
    /// Free-form "last checked" age text from the source ("32 secs ago")
    pub last_checked: String,
}

impl CandidateProxy {
    /// Proxy URL in `scheme://host:port` form.
    pub fn url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.ip, self.port)
    }

    /// Whether the IP field parses as a valid address.
    pub fn has_valid_ip(&self) -> bool {
        self.ip.parse::<std::net::IpAddr>().is_ok()
    }

    /// Seconds since the source last checked this proxy, parsed from the
    /// age text. Unparseable text ranks as very stale.
    pub fn checked_age_secs(&self) -> u64 {
        parse_age_text(&self.last_checked).unwrap_or(u64::MAX)
    }

    /// Quality score, monotonic in anonymity level and recency.
    pub fn quality_score(&self) -> u64 {
        let anonymity_score: u64 = match self.anonymity {
            AnonymityLevel::Elite => 3000,
            AnonymityLevel::Anonymous => 2000,
            AnonymityLevel::Transparent => 0,
        };
        let https_score = if self.https { 500 } else { 0 };
        // Recency contributes up to 1000 points, decaying over an hour.
        let age = self.checked_age_secs().min(3600);
        let recency_score = 1000 - age * 1000 / 3600;
        anonymity_score + https_score + recency_score
    }
}

/// Parse source age text like "32 secs ago", "5 mins ago", "1 hour ago".
fn parse_age_text(text: &str) -> Option<u64> {
    let mut parts = text.split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.to_lowercase();
    let multiplier = if unit.starts_with("sec") {
        1
    } else if unit.starts_with("min") {
        60
    } else if unit.starts_with("hour") {
        3600
    } else if unit.starts_with("day") {
        86400
    } else {
        return None;
    };
    Some(value * multiplier)
}
