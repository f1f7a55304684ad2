//! Canonical, timestamp-keyed series.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{
    Candle, FundingRate, IndicatorRow, LongShortRatio, OpenInterest, TimestampMs,
};

/// Anything keyed by a millisecond timestamp.
pub trait Timestamped {
    fn ts_ms(&self) -> TimestampMs;
}

impl Timestamped for Candle {
    fn ts_ms(&self) -> TimestampMs {
        self.ts_ms
    }
}

impl Timestamped for FundingRate {
    fn ts_ms(&self) -> TimestampMs {
        self.ts_ms
    }
}

impl Timestamped for OpenInterest {
    fn ts_ms(&self) -> TimestampMs {
        self.ts_ms
    }
}

impl Timestamped for LongShortRatio {
    fn ts_ms(&self) -> TimestampMs {
        self.ts_ms
    }
}

impl Timestamped for IndicatorRow {
    fn ts_ms(&self) -> TimestampMs {
        self.candle.ts_ms
    }
}

/// Series with strictly increasing, unique timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries<T> {
    records: Vec<T>,
}

impl<T: Timestamped> CanonicalSeries<T> {
    /// An empty series (a missing or failed resource).
    pub fn empty() -> Self {
        Self { records: Vec::new() }
    }

    /// Build from records in fetch order.
    ///
    /// Duplicate timestamps keep the last record seen. Returns the series and
    /// the number of records replaced by a later duplicate.
    pub fn from_records<I>(records: I) -> (Self, usize)
    where
        I: IntoIterator<Item = T>,
    {
        let mut by_ts: BTreeMap<TimestampMs, T> = BTreeMap::new();
        let mut duplicates = 0;
        for record in records {
            if by_ts.insert(record.ts_ms(), record).is_some() {
                duplicates += 1;
            }
        }
        let series = Self {
            records: by_ts.into_values().collect(),
        };
        (series, duplicates)
    }

    /// Wrap records that are already strictly increasing.
    pub fn from_sorted(records: Vec<T>) -> Result<Self> {
        if let Some(w) = records.windows(2).find(|w| w[0].ts_ms() >= w[1].ts_ms()) {
            return Err(Error::data(format!(
                "series not strictly increasing at {} -> {}",
                w[0].ts_ms(),
                w[1].ts_ms()
            )));
        }
        Ok(Self { records })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn first_ts(&self) -> Option<TimestampMs> {
        self.records.first().map(Timestamped::ts_ms)
    }

    pub fn last_ts(&self) -> Option<TimestampMs> {
        self.records.last().map(Timestamped::ts_ms)
    }

    /// Index of the latest record at or before `ts_ms`.
    pub fn index_at_or_before(&self, ts_ms: TimestampMs) -> Option<usize> {
        let upper = self.records.partition_point(|r| r.ts_ms() <= ts_ms);
        upper.checked_sub(1)
    }

    /// Latest record at or before `ts_ms`.
    pub fn at_or_before(&self, ts_ms: TimestampMs) -> Option<&T> {
        self.index_at_or_before(ts_ms).map(|i| &self.records[i])
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T: Timestamped> Default for CanonicalSeries<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, T> IntoIterator for &'a CanonicalSeries<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(ts_ms: i64, rate: f64) -> FundingRate {
        FundingRate { ts_ms, rate }
    }

    #[test]
    fn test_from_records_sorts_and_keeps_last() {
        let (series, dups) = CanonicalSeries::from_records(vec![
            rate(300, 0.3),
            rate(100, 0.1),
            rate(200, 0.2),
            rate(100, 0.15),
        ]);

        assert_eq!(dups, 1);
        let ts: Vec<i64> = series.iter().map(|r| r.ts_ms).collect();
        assert_eq!(ts, vec![100, 200, 300]);
        assert_eq!(series.records()[0].rate, 0.15);
    }

    #[test]
    fn test_from_sorted_rejects_duplicates() {
        assert!(CanonicalSeries::from_sorted(vec![rate(1, 0.0), rate(1, 0.0)]).is_err());
        assert!(CanonicalSeries::from_sorted(vec![rate(2, 0.0), rate(1, 0.0)]).is_err());
        assert!(CanonicalSeries::from_sorted(vec![rate(1, 0.0), rate(2, 0.0)]).is_ok());
    }

    #[test]
    fn test_at_or_before() {
        let (series, _) =
            CanonicalSeries::from_records(vec![rate(100, 0.1), rate(200, 0.2), rate(300, 0.3)]);

        assert!(series.at_or_before(99).is_none());
        assert_eq!(series.at_or_before(100).unwrap().ts_ms, 100);
        assert_eq!(series.at_or_before(250).unwrap().ts_ms, 200);
        assert_eq!(series.at_or_before(10_000).unwrap().ts_ms, 300);
    }

    #[test]
    fn test_empty_series() {
        let series: CanonicalSeries<FundingRate> = CanonicalSeries::empty();
        assert!(series.is_empty());
        assert!(series.first_ts().is_none());
        assert!(series.at_or_before(0).is_none());
    }
}
