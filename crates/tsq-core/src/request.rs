//! Query request descriptors issued by dashboard panels

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The relative marker a raw range boundary carries when it tracks the wall clock
pub const NOW: &str = "now";

/// Template variables in scope for a request, by name
pub type ScopedVars = BTreeMap<String, String>;

/// Unparsed time range as the user entered it, e.g. `now-6h` to `now`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawTimeRange {
    pub from: String,
    pub to: String,
}

impl RawTimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// `true` when the upper bound is literally `now`
    pub fn is_relative_to_now(&self) -> bool {
        self.to == NOW
    }
}

/// Absolute time range in epoch milliseconds along with its raw form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
    pub raw: RawTimeRange,
}

impl TimeRange {
    pub fn new(from: i64, to: i64, raw: RawTimeRange) -> Self {
        Self { from, to, raw }
    }

    pub fn span_ms(&self) -> i64 {
        (self.to - self.from).max(0)
    }
}

/// One query of a panel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTarget {
    pub ref_id: String,
    #[serde(default)]
    pub expr: Option<String>,
    /// Per-target interval override
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub exemplar: bool,
}

impl QueryTarget {
    pub fn new(ref_id: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            expr: Some(expr.into()),
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn with_exemplar(mut self, exemplar: bool) -> Self {
        self.exemplar = exemplar;
        self
    }
}

/// A panel's request: every target shares one time range and one backend round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub request_id: String,
    #[serde(default, rename = "dashboardUID")]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: Option<i64>,
    pub targets: Vec<QueryTarget>,
    pub range: TimeRange,
    pub interval: String,
    pub interval_ms: i64,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
}

impl QueryRequest {
    pub fn new(targets: Vec<QueryTarget>, range: TimeRange, interval_ms: i64) -> Self {
        Self {
            request_id: String::new(),
            dashboard_uid: None,
            panel_id: None,
            targets,
            range,
            interval: format!("{}ms", interval_ms),
            interval_ms,
            scoped_vars: ScopedVars::new(),
        }
    }

    pub fn with_panel(mut self, dashboard_uid: impl Into<String>, panel_id: i64) -> Self {
        self.dashboard_uid = Some(dashboard_uid.into());
        self.panel_id = Some(panel_id);
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_scoped_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scoped_vars.insert(name.into(), value.into());
        self
    }
}
