//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for judging how much backend work the cache saves
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Requests seen by `request_info`
    requests: AtomicU64,
    /// Requests whose raw range ends at "now"
    cacheable_requests: AtomicU64,
    /// Requests that were shortened to an incremental range
    partial_requests: AtomicU64,
    /// Cacheable requests that had to be fetched in full
    full_requests: AtomicU64,
    /// Entries dropped because a signature changed or continuity broke
    invalidations: AtomicU64,
    frames_appended: AtomicU64,
    frames_amended: AtomicU64,
    /// Cached frames replaced after their schema changed
    frames_replaced: AtomicU64,
    /// Frames dropped because trimming left them empty
    frames_evicted: AtomicU64,
    /// Total span, in ms, the callers asked for
    requested_span_ms: AtomicU64,
    /// Total span, in ms, actually sent to the backend
    queried_span_ms: AtomicU64,
    /// Current number of entries
    entry_count: AtomicU64,
}

impl CacheStats {
    /// Create new cache statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request and the span it asked for versus the span that will be queried
    pub fn record_request(&self, cacheable: bool, requested_span_ms: i64, queried_span_ms: i64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if cacheable {
            self.cacheable_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.requested_span_ms
            .fetch_add(requested_span_ms.max(0) as u64, Ordering::Relaxed);
        self.queried_span_ms
            .fetch_add(queried_span_ms.max(0) as u64, Ordering::Relaxed);
    }

    /// Record an incremental request
    pub fn record_partial(&self) {
        self.partial_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cacheable request fetched in full
    pub fn record_full(&self) {
        self.full_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record dropped entries
    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a new series added to an entry
    pub fn record_appended(&self) {
        self.frames_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cached series extended with fresh rows
    pub fn record_amended(&self) {
        self.frames_amended.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cached series replaced after a schema change
    pub fn record_replaced(&self) {
        self.frames_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a series dropped by trimming
    pub fn record_evicted(&self) {
        self.frames_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Update entry count
    pub fn set_entry_count(&self, count: u64) {
        self.entry_count.store(count, Ordering::Relaxed);
    }

    /// Get total requests
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Get requests whose range ends at "now"
    pub fn cacheable_requests(&self) -> u64 {
        self.cacheable_requests.load(Ordering::Relaxed)
    }

    /// Get incremental requests
    pub fn partial_requests(&self) -> u64 {
        self.partial_requests.load(Ordering::Relaxed)
    }

    /// Get cacheable requests fetched in full
    pub fn full_requests(&self) -> u64 {
        self.full_requests.load(Ordering::Relaxed)
    }

    /// Get dropped entries
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Get series appended
    pub fn frames_appended(&self) -> u64 {
        self.frames_appended.load(Ordering::Relaxed)
    }

    /// Get series amended
    pub fn frames_amended(&self) -> u64 {
        self.frames_amended.load(Ordering::Relaxed)
    }

    /// Get series replaced
    pub fn frames_replaced(&self) -> u64 {
        self.frames_replaced.load(Ordering::Relaxed)
    }

    /// Get series evicted
    pub fn frames_evicted(&self) -> u64 {
        self.frames_evicted.load(Ordering::Relaxed)
    }

    /// Get total requested span in ms
    pub fn requested_span_ms(&self) -> u64 {
        self.requested_span_ms.load(Ordering::Relaxed)
    }

    /// Get total queried span in ms
    pub fn queried_span_ms(&self) -> u64 {
        self.queried_span_ms.load(Ordering::Relaxed)
    }

    /// Get current entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    /// Share of cacheable requests served incrementally (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let cacheable = self.cacheable_requests() as f64;
        if cacheable == 0.0 {
            0.0
        } else {
            self.partial_requests() as f64 / cacheable
        }
    }

    /// Share of the requested time span that never reached the backend (0.0 to 1.0)
    pub fn span_savings(&self) -> f64 {
        let requested = self.requested_span_ms() as f64;
        if requested == 0.0 {
            0.0
        } else {
            1.0 - self.queried_span_ms() as f64 / requested
        }
    }

    /// Reset all counters except the entry count
    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.cacheable_requests,
            &self.partial_requests,
            &self.full_requests,
            &self.invalidations,
            &self.frames_appended,
            &self.frames_amended,
            &self.frames_replaced,
            &self.frames_evicted,
            &self.requested_span_ms,
            &self.queried_span_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            requests: AtomicU64::new(self.requests()),
            cacheable_requests: AtomicU64::new(self.cacheable_requests()),
            partial_requests: AtomicU64::new(self.partial_requests()),
            full_requests: AtomicU64::new(self.full_requests()),
            invalidations: AtomicU64::new(self.invalidations()),
            frames_appended: AtomicU64::new(self.frames_appended()),
            frames_amended: AtomicU64::new(self.frames_amended()),
            frames_replaced: AtomicU64::new(self.frames_replaced()),
            frames_evicted: AtomicU64::new(self.frames_evicted()),
            requested_span_ms: AtomicU64::new(self.requested_span_ms()),
            queried_span_ms: AtomicU64::new(self.queried_span_ms()),
            entry_count: AtomicU64::new(self.entry_count()),
        }
    }
}
