//! Bounded FIFO of not-yet-vetted proxy candidates
//!
//! Fed by the source fetchers and drained by a validator. Both full and
//! empty are immediate non-error conditions signaled by return value.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::{ForagerError, Result};

/// Default candidate capacity
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

/// Bounded, deduplicated FIFO of raw proxy URL strings
pub struct UntestedProxyPool {
    inner: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl UntestedProxyPool {
    /// Create a pool with the given capacity. Zero capacity is rejected at
    /// construction time.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ForagerError::InvalidConfig(
                "untested pool capacity must be positive".into(),
            ));
        }
        Ok(Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    /// Enqueue a candidate. Returns `false` when the pool is full or the
    /// URL is already queued. The linear duplicate scan is fine at this
    /// pool size.
    pub fn add(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        let mut queue = self.inner.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        if queue.iter().any(|existing| *existing == url) {
            return false;
        }
        queue.push_back(url);
        true
    }

    /// Dequeue the oldest candidate, if any.
    pub fn take_next(&self) -> Option<String> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Drop up to `n` of the oldest candidates, returning how many were
    /// removed.
    pub fn remove_oldest(&self, n: usize) -> usize {
        let mut queue = self.inner.lock();
        let count = n.min(queue.len());
        queue.drain(..count);
        count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
