//! Incremental query cache implementation

use crate::config::CacheConfig;
use crate::identity::{ExprSigner, FieldIdent, TargetIdentity, TargetSignature, TargetSigner};
use crate::interpolate::{Interpolator, NoOpInterpolator};
use crate::stats::CacheStats;
use crate::table;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use tsq_core::{is_time_column, Frame, QueryRequest, QueryTarget, Result};

/// Frames cached for one target
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Signature the frames were fetched with
    pub signature: TargetSignature,
    /// End of the request window the frames were last committed for (epoch ms)
    pub prev_to: i64,
    pub frames: Vec<Frame>,
}

/// Outcome of [`QueryCache::request_info`]
#[derive(Debug, Clone)]
pub struct CacheRequestInfo {
    /// The request to send to the backend, possibly with a later `from`
    pub requests: Vec<QueryRequest>,
    /// Signatures of every target that has one; hand these back to `proc_frames`
    pub targ_sigs: AHashMap<TargetIdentity, TargetSignature>,
    /// Whether the response should be merged into the cache
    pub should_cache: bool,
    /// Whether the range was shortened to fetch only what the cache lacks
    pub partial: bool,
}

impl CacheRequestInfo {
    /// The request to execute
    pub fn request(&self) -> Option<&QueryRequest> {
        self.requests.first()
    }
}

/// Cache that extends the frames of now-relative panel queries instead of refetching them.
///
/// A refresh cycle is `request_info` → execute the returned request →
/// `proc_frames`. Calls are atomic with respect to each other, but two
/// overlapping cycles for the same target are not ordered; callers must
/// serialize refreshes per panel.
pub struct QueryCache {
    entries: Mutex<AHashMap<TargetIdentity, CacheEntry>>,
    config: CacheConfig,
    signer: Arc<dyn TargetSigner>,
    interpolator: Arc<dyn Interpolator>,
    stats: Arc<CacheStats>,
}

impl QueryCache {
    /// Create a new query cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            config,
            signer: Arc::new(ExprSigner),
            interpolator: Arc::new(NoOpInterpolator),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Replace the function that computes target signatures
    pub fn with_signer(mut self, signer: impl TargetSigner + 'static) -> Self {
        self.signer = Arc::new(signer);
        self
    }

    /// Replace the template variable resolver used before signing
    pub fn with_interpolator(mut self, interpolator: impl Interpolator + 'static) -> Self {
        self.interpolator = Arc::new(interpolator);
        self
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the entry cached for a target
    pub fn entry(&self, ident: &TargetIdentity) -> Option<CacheEntry> {
        self.entries.lock().get(ident).cloned()
    }

    /// Remove the entry for a target
    pub fn invalidate(&self, ident: &TargetIdentity) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.remove(ident).is_some();
        if removed {
            self.stats.record_invalidations(1);
            self.stats.set_entry_count(entries.len() as u64);
        }
        removed
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        self.stats.record_invalidations(entries.len() as u64);
        entries.clear();
        self.stats.set_entry_count(0);
    }

    /// Signature of a target, or `None` when it has no expression to sign
    pub fn target_signature(
        &self,
        request: &QueryRequest,
        target: &QueryTarget,
    ) -> Option<TargetSignature> {
        let expr = target.expr.as_deref().filter(|e| !e.trim().is_empty())?;
        let expr = self.interpolator.interpolate(expr, &request.scoped_vars);
        Some(self.signer.sign(request, target, &expr))
    }

    /// Decide whether `request` can be served partly from cache.
    ///
    /// When every target's signature matches its cached entry and the new
    /// window continues where the cached one ended, the returned request
    /// starts one overlap window before the cached end. Otherwise the
    /// entries of all the request's targets are dropped and the request is
    /// returned unchanged.
    pub fn request_info(&self, request: &QueryRequest) -> CacheRequestInfo {
        let should_cache = self.config.enabled && request.range.raw.is_relative_to_now();
        let requested_span = request.range.span_ms();

        let signed: Vec<(TargetIdentity, Option<TargetSignature>)> = request
            .targets
            .iter()
            .map(|target| {
                (
                    TargetIdentity::for_target(request, target),
                    self.target_signature(request, target),
                )
            })
            .collect();

        let targ_sigs: AHashMap<TargetIdentity, TargetSignature> = signed
            .iter()
            .filter_map(|(ident, sig)| sig.clone().map(|sig| (ident.clone(), sig)))
            .collect();

        if !should_cache {
            self.stats
                .record_request(false, requested_span, requested_span);
            return CacheRequestInfo {
                requests: vec![request.clone()],
                targ_sigs,
                should_cache,
                partial: false,
            };
        }

        let mut entries = self.entries.lock();
        let mut do_partial = true;
        let mut prev_to: Option<i64> = None;

        for (ident, sig) in &signed {
            match (sig, entries.get(ident)) {
                (Some(sig), Some(entry)) if entry.signature == *sig => {
                    do_partial =
                        request.range.to > entry.prev_to && request.range.from <= entry.prev_to;
                    prev_to = Some(prev_to.map_or(entry.prev_to, |p| p.min(entry.prev_to)));
                }
                (None, _) => {
                    debug!(ident = %ident, "target has no signature, querying full range");
                    do_partial = false;
                }
                _ => do_partial = false,
            }
            if !do_partial {
                break;
            }
        }

        if let (true, Some(prev_to)) = (do_partial, prev_to) {
            let mut partial = request.clone();
            partial.range.from = (prev_to - self.config.overlap_ms()).max(request.range.from);

            debug!(
                request_id = %request.request_id,
                from = partial.range.from,
                to = partial.range.to,
                original_from = request.range.from,
                "issuing incremental query"
            );
            self.stats
                .record_request(true, requested_span, partial.range.span_ms());
            self.stats.record_partial();

            return CacheRequestInfo {
                requests: vec![partial],
                targ_sigs,
                should_cache,
                partial: true,
            };
        }

        let mut removed = 0;
        for (ident, _) in &signed {
            if entries.remove(ident).is_some() {
                removed += 1;
            }
        }
        debug!(
            request_id = %request.request_id,
            invalidated = removed,
            "querying full range"
        );
        self.stats.record_invalidations(removed);
        self.stats.set_entry_count(entries.len() as u64);
        self.stats
            .record_request(true, requested_span, requested_span);
        self.stats.record_full();

        CacheRequestInfo {
            requests: vec![request.clone()],
            targ_sigs,
            should_cache,
            partial: false,
        }
    }

    /// Merge fresh response frames into the cache and return the full frame set.
    ///
    /// Frames are returned untouched when `info.should_cache` is false.
    /// Otherwise every series is extended with its fresh rows, clipped to
    /// the request window, committed, and returned as a deep copy.
    pub fn proc_frames(
        &self,
        request: &QueryRequest,
        info: &CacheRequestInfo,
        fresh: Vec<Frame>,
    ) -> Result<Vec<Frame>> {
        if !info.should_cache {
            return Ok(fresh);
        }

        let (from, to) = (request.range.from, request.range.to);

        let mut groups: Vec<(TargetIdentity, Vec<Frame>)> = Vec::new();
        for frame in fresh {
            let ident = TargetIdentity::for_frame(request, &frame);
            match groups.iter_mut().find(|(i, _)| *i == ident) {
                Some((_, frames)) => frames.push(frame),
                None => groups.push((ident, vec![frame])),
            }
        }

        let mut entries = self.entries.lock();

        // Targets the backend returned nothing for keep their cached series
        for target in &request.targets {
            let ident = TargetIdentity::for_target(request, target);
            if info.targ_sigs.contains_key(&ident)
                && entries.contains_key(&ident)
                && !groups.iter().any(|(i, _)| *i == ident)
            {
                groups.push((ident, Vec::new()));
            }
        }

        let mut out = Vec::new();
        for (ident, frames) in groups {
            let Some(signature) = info.targ_sigs.get(&ident) else {
                trace!(ident = %ident, frames = frames.len(), "no signature, passing frames through");
                out.extend(frames);
                continue;
            };

            // Arrays are shared, so the committed entry stays intact until the merge succeeds
            let mut cached = entries
                .get(&ident)
                .map(|entry| entry.frames.clone())
                .unwrap_or_default();

            for frame in frames {
                if let Some(uncached) = self.merge_frame(&mut cached, frame)? {
                    out.push(uncached);
                }
            }

            let mut kept = Vec::with_capacity(cached.len());
            for mut frame in cached {
                let trimmed = table::trim(&frame.columns(), from, to)?;
                frame.set_columns(trimmed)?;
                if frame.is_empty() {
                    trace!(ident = %ident, series = ?frame.name(), "evicting empty series");
                    self.stats.record_evicted();
                } else {
                    kept.push(frame);
                }
            }

            for frame in &kept {
                out.push(frame.deep_clone()?);
            }

            entries.insert(
                ident,
                CacheEntry {
                    signature: signature.clone(),
                    prev_to: to,
                    frames: kept,
                },
            );
        }

        self.stats.set_entry_count(entries.len() as u64);
        Ok(out)
    }

    /// Merge one fresh frame into a target's cached frames.
    ///
    /// Returns the frame back when it cannot be cached and should be
    /// passed through as is.
    fn merge_frame(&self, cached: &mut Vec<Frame>, frame: Frame) -> Result<Option<Frame>> {
        if frame.is_empty() || frame.fields().is_empty() {
            return Ok(None);
        }
        let Some(series) = FieldIdent::of_frame(&frame) else {
            trace!(frame = ?frame.name(), "frame has no value field, skipping");
            return Ok(None);
        };
        let rows = frame.len();
        if frame.fields().iter().any(|f| f.len() != rows) {
            warn!(series = ?series, rows, "fields have differing lengths, frame not cached");
            return Ok(Some(frame));
        }
        let time_type = frame.fields()[0].values().data_type();
        if !is_time_column(time_type) {
            warn!(series = ?series, time_type = %time_type, "unsupported time column, frame not cached");
            return Ok(Some(frame));
        }

        let existing = cached
            .iter_mut()
            .find(|c| FieldIdent::of_frame(c).as_ref() == Some(&series));

        match existing {
            None => {
                let mut frame = frame;
                let sorted = table::sort_by_time(&frame.columns())?;
                frame.set_columns(sorted)?;
                trace!(series = ?series, rows = frame.len(), "appending new series");
                self.stats.record_appended();
                cached.push(frame);
            }
            Some(existing) => {
                if same_schema(existing, &frame) {
                    let merged = table::amend(&existing.columns(), &frame.columns())?;
                    existing.set_columns(merged)?;
                    trace!(series = ?series, rows = existing.len(), "amended series");
                    self.stats.record_amended();
                } else {
                    warn!(
                        series = ?series,
                        cached_fields = existing.fields().len(),
                        fresh_fields = frame.fields().len(),
                        "series schema changed, replacing cached frame"
                    );
                    let mut frame = frame;
                    let sorted = table::sort_by_time(&frame.columns())?;
                    frame.set_columns(sorted)?;
                    self.stats.record_replaced();
                    *existing = frame;
                }
            }
        }
        Ok(None)
    }
}

fn same_schema(cached: &Frame, fresh: &Frame) -> bool {
    cached.fields().len() == fresh.fields().len()
        && cached
            .fields()
            .iter()
            .zip(fresh.fields())
            .all(|(a, b)| a.values().data_type() == b.values().data_type())
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.config.enabled)
            .field("overlap_window", &self.config.overlap_window)
            .field("current_entries", &self.len())
            .finish()
    }
}
