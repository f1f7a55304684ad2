//! Per-resource run reports.

use featline_core::{FetchError, ResourceKind};
use featline_ingestion::{FetchOutcome, NormalizeStats};
use serde::{Serialize, Serializer};

fn error_message<S: Serializer>(error: &Option<FetchError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// What happened to one resource during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub resource: ResourceKind,
    /// Pages received.
    pub requests: usize,
    /// Raw records received, before normalization.
    pub records: usize,
    pub stats: NormalizeStats,
    /// Error that ended the fetch early; the resource is degraded if set.
    #[serde(serialize_with = "error_message")]
    pub error: Option<FetchError>,
}

impl ResourceReport {
    pub fn new(outcome: &FetchOutcome, stats: NormalizeStats) -> Self {
        Self {
            resource: outcome.kind,
            requests: outcome.requests,
            records: outcome.records.len(),
            stats,
            error: outcome.error.clone(),
        }
    }

    /// True when the resource's data is partial or missing.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
