//! Incremental Query Cache for dashboard panels
//!
//! Dashboards refresh now-relative panels on a timer, and each refresh asks
//! the backend for the whole visible window even though most of it was
//! fetched seconds ago. This crate keeps the frames of every panel target and
//! rewrites refresh requests so only the tail of the window is queried.
//!
//! # Features
//!
//! - **Incremental Requests**: The range start moves up to one overlap window before the cached end
//! - **Signatures**: Cached frames are reused only while expression, interval and raw range stay the same
//! - **Series Merging**: Fresh rows replace cached ones over the span they cover
//! - **Trimming**: Rows that scroll out of the window are evicted
//! - **Thread-Safe**: Safe for concurrent access using `Mutex`
//! - **Statistics**: Track partial requests, invalidations and span saved
//!
//! # Example
//!
//! ```ignore
//! use tsq_cache::{CacheConfig, QueryCache};
//!
//! let cache = QueryCache::new(CacheConfig::default());
//!
//! let info = cache.request_info(&request);
//! let fresh = backend.query(info.request().unwrap())?;
//! let frames = cache.proc_frames(&request, &info, fresh)?;
//! ```

pub mod cache;
pub mod config;
pub mod identity;
pub mod interpolate;
pub mod stats;
pub mod table;

pub use cache::{CacheEntry, CacheRequestInfo, QueryCache};
pub use config::CacheConfig;
pub use identity::{ExprSigner, FieldIdent, TargetIdentity, TargetSignature, TargetSigner};
pub use interpolate::{Interpolator, NoOpInterpolator, TemplateInterpolator};
pub use stats::CacheStats;
