//! Normalization of raw API records into canonical series.
//!
//! The API returns numbers as strings, timestamps as either strings or
//! integers, and pages in whatever order the endpoint prefers. The normalizer
//! coerces every record, drops the ones that cannot be coerced, resolves
//! duplicate timestamps (last record in fetch order wins) and sorts.

use featline_core::{
    ts_to_datetime, CanonicalSeries, Candle, FundingRate, LongShortRatio, MalformedRecord,
    OpenInterest, ResourceKind, Timestamped, TimestampMs,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::resource::{FieldRef, ResourceDescriptor};
use crate::source::RawRecord;

/// Coerce a JSON value holding epoch milliseconds.
pub(crate) fn coerce_timestamp(value: &Value) -> Option<TimestampMs> {
    let ts = match value {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    ts_to_datetime(ts).map(|_| ts)
}

/// Coerce a JSON value holding a finite number, given as string or number.
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    let x = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

fn numeric(raw: &Value, field: FieldRef) -> Result<f64, MalformedRecord> {
    let value = field
        .get(raw)
        .ok_or_else(|| MalformedRecord::missing(field.name()))?;
    coerce_f64(value).ok_or_else(|| MalformedRecord::not_numeric(field.name()))
}

/// A canonical record that can be built from one raw API record.
pub trait SeriesRecord: Timestamped + Sized {
    /// Build the record; the timestamp has already been extracted.
    fn from_raw(raw: &Value, ts_ms: TimestampMs) -> Result<Self, MalformedRecord>;
}

impl SeriesRecord for Candle {
    // [start, open, high, low, close, volume, turnover]
    fn from_raw(raw: &Value, ts_ms: TimestampMs) -> Result<Self, MalformedRecord> {
        Ok(Candle {
            ts_ms,
            open: numeric(raw, FieldRef::Index(1))?,
            high: numeric(raw, FieldRef::Index(2))?,
            low: numeric(raw, FieldRef::Index(3))?,
            close: numeric(raw, FieldRef::Index(4))?,
            volume: numeric(raw, FieldRef::Index(5))?,
            turnover: numeric(raw, FieldRef::Index(6))?,
        })
    }
}

impl SeriesRecord for FundingRate {
    fn from_raw(raw: &Value, ts_ms: TimestampMs) -> Result<Self, MalformedRecord> {
        Ok(FundingRate {
            ts_ms,
            rate: numeric(raw, FieldRef::Key("fundingRate"))?,
        })
    }
}

impl SeriesRecord for OpenInterest {
    fn from_raw(raw: &Value, ts_ms: TimestampMs) -> Result<Self, MalformedRecord> {
        Ok(OpenInterest {
            ts_ms,
            open_interest: numeric(raw, FieldRef::Key("openInterest"))?,
        })
    }
}

impl SeriesRecord for LongShortRatio {
    fn from_raw(raw: &Value, ts_ms: TimestampMs) -> Result<Self, MalformedRecord> {
        Ok(LongShortRatio {
            ts_ms,
            buy_ratio: numeric(raw, FieldRef::Key("buyRatio"))?,
            sell_ratio: numeric(raw, FieldRef::Key("sellRatio"))?,
        })
    }
}

/// Counters from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    /// Raw records received.
    pub input: usize,
    /// Records in the canonical series.
    pub kept: usize,
    /// Records dropped because a field was absent or not numeric.
    pub dropped_malformed: usize,
    /// Records replaced by a later record with the same timestamp.
    pub duplicates: usize,
    /// Consecutive timestamps further apart than the interval hint.
    pub gaps: usize,
}

/// A canonical series with the statistics of its normalization.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub series: CanonicalSeries<T>,
    pub stats: NormalizeStats,
}

/// Turns raw records of one resource into a canonical series.
#[derive(Debug, Clone)]
pub struct SeriesNormalizer {
    kind: Option<ResourceKind>,
    time_field: FieldRef,
    interval_hint_ms: i64,
}

impl SeriesNormalizer {
    pub fn new(time_field: FieldRef, interval_hint_ms: i64) -> Self {
        Self {
            kind: None,
            time_field,
            interval_hint_ms,
        }
    }

    /// Normalizer matching a resource descriptor.
    pub fn for_resource(descriptor: &ResourceDescriptor) -> Self {
        Self {
            kind: Some(descriptor.kind),
            time_field: descriptor.time_field,
            interval_hint_ms: descriptor.interval_hint_ms,
        }
    }

    pub fn normalize<T: SeriesRecord>(&self, raw: Vec<RawRecord>) -> Normalized<T> {
        let input = raw.len();
        let mut dropped_malformed = 0;

        let records = raw.iter().filter_map(|r| {
            let parsed = self
                .time_field
                .get(r)
                .ok_or_else(|| MalformedRecord::missing(self.time_field.name()))
                .and_then(|v| {
                    coerce_timestamp(v)
                        .ok_or_else(|| MalformedRecord::not_numeric(self.time_field.name()))
                })
                .and_then(|ts| T::from_raw(r, ts));
            match parsed {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(resource = ?self.kind, error = %e, "dropping record");
                    dropped_malformed += 1;
                    None
                }
            }
        });
        let (series, duplicates) = CanonicalSeries::from_records(records);

        let gaps = series
            .records()
            .windows(2)
            .filter(|w| w[1].ts_ms() - w[0].ts_ms() > self.interval_hint_ms)
            .count();

        let stats = NormalizeStats {
            input,
            kept: series.len(),
            dropped_malformed,
            duplicates,
            gaps,
        };
        info!(
            resource = ?self.kind,
            input = stats.input,
            kept = stats.kept,
            dropped = stats.dropped_malformed,
            duplicates = stats.duplicates,
            gaps = stats.gaps,
            "series normalized"
        );
        Normalized { series, stats }
    }
}
