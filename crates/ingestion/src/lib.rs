//! Data ingestion and normalization for the featline system.
//!
//! This crate handles:
//! - Resource descriptors for the paginated market-data API
//! - Page transport (HTTP, or any [`PageSource`])
//! - Request pacing
//! - Window-advance and cursor pagination
//! - Normalization of raw records into canonical series

pub mod fetcher;
pub mod normalizer;
pub mod pacer;
pub mod resource;
pub mod source;

pub use fetcher::{FetchOutcome, PagedFetcher, RetryPolicy};
pub use normalizer::{NormalizeStats, Normalized, SeriesNormalizer, SeriesRecord};
pub use pacer::Pacer;
pub use resource::{FieldRef, Pagination, ResourceDescriptor};
pub use source::{HttpPageSource, Page, PageRequest, PageSource, RawRecord};
