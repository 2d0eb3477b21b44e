//! Cache configuration options

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tsq_core::{QueryError, Result};

/// Configuration for the incremental query cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Span before the previous end that every incremental query fetches again,
    /// so late-arriving samples near "now" are picked up
    #[serde(with = "human_duration")]
    pub overlap_window: Duration,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            overlap_window: Duration::from_secs(10 * 60), // 10 minutes
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with a custom overlap window
    pub fn new(overlap_window: Duration) -> Self {
        Self {
            overlap_window,
            enabled: true,
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the overlap window
    pub fn with_overlap_window(mut self, overlap_window: Duration) -> Self {
        self.overlap_window = overlap_window;
        self
    }

    /// Set the overlap window from a human duration such as `10m` or `30s`
    pub fn with_overlap(self, overlap: &str) -> Result<Self> {
        let overlap_window = humantime::parse_duration(overlap)
            .map_err(|e| QueryError::InvalidDuration(format!("{}: {}", overlap, e)))?;
        Ok(self.with_overlap_window(overlap_window))
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn overlap_ms(&self) -> i64 {
        i64::try_from(self.overlap_window.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CacheConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

mod human_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}
