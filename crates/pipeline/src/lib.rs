//! End-to-end feature-table runs for the featline system.
//!
//! This crate provides:
//! - Concurrent per-resource fetching with independent pacing
//! - Normalization, indicator computation and alignment of one run
//! - Per-resource reports of degraded or missing inputs

pub mod pipeline;
pub mod report;

pub use pipeline::{Pipeline, PipelineOutput};
pub use report::ResourceReport;
