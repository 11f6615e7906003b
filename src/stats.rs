//! Concurrency-safe run statistics
//!
//! Atomic counters plus a status-code histogram, incremented from many
//! in-flight requests and read continuously by progress logging.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Statistics for one scraper run
///
/// Created at run start; `mark_finished` stamps the end time at completion.
#[derive(Debug)]
pub struct ScraperStatistics {
    processed: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    found: AtomicU64,
    not_found: AtomicU64,
    items_collected: AtomicU64,
    bytes_received: AtomicU64,
    active_requests: AtomicI64,
    status_codes: DashMap<u16, u64>,
    started: Instant,
    started_at: DateTime<Utc>,
    ended_at: Mutex<Option<DateTime<Utc>>>,
}

impl ScraperStatistics {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            found: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            items_collected: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            active_requests: AtomicI64::new(0),
            status_codes: DashMap::new(),
            started: Instant::now(),
            started_at: Utc::now(),
            ended_at: Mutex::new(None),
        }
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_items_collected(&self, count: u64) {
        self.items_collected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Count one occurrence of an HTTP status code.
    pub fn record_status(&self, code: u16) {
        self.status_codes
            .entry(code)
            .and_modify(|c| *c += 1)
            .or_insert(1);
    }

    pub fn request_started(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);
    }

    /// Stamp the end of the run. Only the first call takes effect.
    pub fn mark_finished(&self) {
        let mut ended = self.ended_at.lock();
        if ended.is_none() {
            *ended = Some(Utc::now());
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    pub fn items_collected(&self) -> u64 {
        self.items_collected.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn active_requests(&self) -> i64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    pub fn status_count(&self, code: u16) -> u64 {
        self.status_codes.get(&code).map(|v| *v).unwrap_or(0)
    }

    /// One-line progress summary with elapsed wall time.
    pub fn summary(&self) -> String {
        format!(
            "processed={} success={} failed={} skipped={} found={} not_found={} \
             items={} bytes={} active={} elapsed={:.1}s",
            self.processed(),
            self.success(),
            self.failed(),
            self.skipped(),
            self.found(),
            self.not_found(),
            self.items_collected(),
            self.bytes_received(),
            self.active_requests(),
            self.started.elapsed().as_secs_f64(),
        )
    }

    /// Summary plus the status-code histogram sorted by code.
    pub fn detailed_summary(&self) -> String {
        let mut codes: Vec<(u16, u64)> = self
            .status_codes
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        codes.sort_by_key(|(code, _)| *code);

        let histogram = codes
            .iter()
            .map(|(code, count)| format!("{}: {}", code, count))
            .collect::<Vec<_>>()
            .join(", ");

        let window = match *self.ended_at.lock() {
            Some(ended) => format!("{} .. {}", self.started_at.to_rfc3339(), ended.to_rfc3339()),
            None => format!("{} .. running", self.started_at.to_rfc3339()),
        };

        format!("{}\nrun: {}\nstatus codes: [{}]", self.summary(), window, histogram)
    }
}

impl Default for ScraperStatistics {
    fn default() -> Self {
        Self::new()
    }
}
