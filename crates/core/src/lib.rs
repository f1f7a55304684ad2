//! Core types and configuration for the featline system.
//!
//! This crate provides shared types used across all other crates:
//! - Time windows and canonical market-data series
//! - Indicator and feature rows
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod series;
pub mod types;

pub use config::Config;
pub use error::{Error, FetchError, MalformedRecord, Result};
pub use series::{CanonicalSeries, Timestamped};
pub use types::*;
