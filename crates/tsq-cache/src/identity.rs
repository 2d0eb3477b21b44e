//! Cache keys: target identities, target signatures and series identities
//!
//! All keys are structured records hashed field by field, so a label value
//! or expression containing a separator character can never collide with
//! a different key.

use std::collections::BTreeMap;
use std::fmt;
use tsq_core::{Field, FieldType, Frame, Labels, QueryRequest, QueryTarget, RawTimeRange};

/// The visual slot a target occupies: dashboard, panel and query ref.
///
/// Stays the same when the query text, interval or time range changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetIdentity {
    pub dashboard_uid: Option<String>,
    pub panel_id: Option<i64>,
    pub ref_id: String,
}

impl TargetIdentity {
    pub fn new(
        dashboard_uid: Option<String>,
        panel_id: Option<i64>,
        ref_id: impl Into<String>,
    ) -> Self {
        Self {
            dashboard_uid,
            panel_id,
            ref_id: ref_id.into(),
        }
    }

    pub fn for_target(request: &QueryRequest, target: &QueryTarget) -> Self {
        Self::new(
            request.dashboard_uid.clone(),
            request.panel_id,
            target.ref_id.clone(),
        )
    }

    /// Identity of the target that produced a response frame
    pub fn for_frame(request: &QueryRequest, frame: &Frame) -> Self {
        Self::new(
            request.dashboard_uid.clone(),
            request.panel_id,
            frame.ref_id().unwrap_or_default(),
        )
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uid = self.dashboard_uid.as_deref().unwrap_or("-");
        match self.panel_id {
            Some(panel_id) => write!(f, "{}|{}|{}", uid, panel_id, self.ref_id),
            None => write!(f, "{}|-|{}", uid, self.ref_id),
        }
    }
}

/// What a target currently means. Cached frames are only extended while
/// the signature stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetSignature {
    /// Expression with template variables resolved
    pub expr: String,
    pub interval: String,
    pub range_raw: RawTimeRange,
    /// Per-target options that change the shape of the result
    pub flags: BTreeMap<String, String>,
}

impl TargetSignature {
    pub fn new(expr: impl Into<String>, interval: impl Into<String>, range_raw: RawTimeRange) -> Self {
        Self {
            expr: expr.into(),
            interval: interval.into(),
            range_raw,
            flags: BTreeMap::new(),
        }
    }

    pub fn with_flag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.flags.insert(key.into(), value.to_string());
        self
    }
}

/// Computes the signature of a target from its interpolated expression
pub trait TargetSigner: Send + Sync {
    fn sign(&self, request: &QueryRequest, target: &QueryTarget, expr: &str) -> TargetSignature;
}

/// Default signer: expression, effective interval, raw range and exemplar mode
#[derive(Debug, Default, Clone)]
pub struct ExprSigner;

impl TargetSigner for ExprSigner {
    fn sign(&self, request: &QueryRequest, target: &QueryTarget, expr: &str) -> TargetSignature {
        let interval = target
            .interval
            .clone()
            .unwrap_or_else(|| request.interval.clone());
        TargetSignature::new(expr, interval, request.range.raw.clone())
            .with_flag("exemplar", target.exemplar)
    }
}

impl<F> TargetSigner for F
where
    F: Fn(&QueryRequest, &QueryTarget, &str) -> TargetSignature + Send + Sync,
{
    fn sign(&self, request: &QueryRequest, target: &QueryTarget, expr: &str) -> TargetSignature {
        self(request, target, expr)
    }
}

/// Identity of one series within a target, taken from a frame's value field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldIdent {
    pub field_type: FieldType,
    pub name: String,
    pub labels: Labels,
}

impl FieldIdent {
    pub fn of(field: &Field) -> Self {
        Self {
            field_type: field.field_type(),
            name: field.name().to_string(),
            labels: field.labels().clone(),
        }
    }

    /// `None` for frames without a value field
    pub fn of_frame(frame: &Frame) -> Option<Self> {
        frame.value_field().map(Self::of)
    }
}
