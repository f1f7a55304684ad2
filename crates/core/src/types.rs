//! Core data types for the featline system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Convert a timestamp to its hour boundary.
#[inline]
pub fn ts_to_hour(ts_ms: TimestampMs) -> TimestampMs {
    ts_ms.div_euclid(HOUR_MS) * HOUR_MS
}

/// Convert a timestamp to its UTC calendar-day boundary.
#[inline]
pub fn ts_to_day(ts_ms: TimestampMs) -> TimestampMs {
    ts_ms.div_euclid(DAY_MS) * DAY_MS
}

/// Convert a timestamp to a UTC datetime, if it is representable.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// Half-open time range `[start, end)` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: TimestampMs,
    end: TimestampMs,
}

impl TimeWindow {
    /// Create a window; `start` must be strictly before `end`.
    pub fn new(start: TimestampMs, end: TimestampMs) -> Result<Self> {
        if start >= end {
            return Err(Error::data(format!(
                "empty time window: start {start} >= end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the `days` days that end at `now_ms`.
    pub fn lookback(now_ms: TimestampMs, days: u32) -> Result<Self> {
        Self::new(now_ms - days as i64 * DAY_MS, now_ms)
    }

    #[inline]
    pub fn start(&self) -> TimestampMs {
        self.start
    }

    #[inline]
    pub fn end(&self) -> TimestampMs {
        self.end
    }

    #[inline]
    pub fn contains(&self, ts_ms: TimestampMs) -> bool {
        ts_ms >= self.start && ts_ms < self.end
    }

    /// Same window with a later start, or `None` once `start` reaches the end.
    pub fn advanced_to(&self, start: TimestampMs) -> Option<Self> {
        Self::new(start, self.end).ok()
    }

    /// Consecutive fixed-width sub-windows covering this window.
    ///
    /// The last slice is clipped to the window end.
    pub fn slices(&self, width_ms: i64) -> impl Iterator<Item = TimeWindow> {
        let end = self.end;
        let width = width_ms.max(1);
        let mut cursor = self.start;
        std::iter::from_fn(move || {
            if cursor >= end {
                return None;
            }
            let slice = TimeWindow {
                start: cursor,
                end: (cursor + width).min(end),
            };
            cursor = slice.end;
            Some(slice)
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (ts_to_datetime(self.start), ts_to_datetime(self.end)) {
            (Some(s), Some(e)) => write!(f, "[{}, {})", s.format("%Y-%m-%d %H:%M:%S"), e.format("%Y-%m-%d %H:%M:%S")),
            _ => write!(f, "[{}, {})", self.start, self.end),
        }
    }
}

/// Logical resources served by the market-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Hourly OHLCV candles (the primary series).
    HourlyKlines,
    /// Daily OHLCV candles.
    DailyKlines,
    /// Funding rate, roughly every 8 hours.
    FundingRate,
    /// Open interest, hourly.
    OpenInterest,
    /// Buy/sell account ratio.
    LongShortRatio,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::HourlyKlines => "hourly_klines",
            ResourceKind::DailyKlines => "daily_klines",
            ResourceKind::FundingRate => "funding_rate",
            ResourceKind::OpenInterest => "open_interest",
            ResourceKind::LongShortRatio => "long_short_ratio",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV candle with quote turnover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time (ms).
    pub ts_ms: TimestampMs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base asset volume.
    pub volume: f64,
    /// Quote asset volume.
    pub turnover: f64,
}

/// Funding rate settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub ts_ms: TimestampMs,
    pub rate: f64,
}

/// Open interest observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenInterest {
    pub ts_ms: TimestampMs,
    pub open_interest: f64,
}

/// Long/short account ratio observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongShortRatio {
    pub ts_ms: TimestampMs,
    pub buy_ratio: f64,
    pub sell_ratio: f64,
}

/// Candle extended with rolling indicators.
///
/// `None` means the indicator's window has not been fully observed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub candle: Candle,
    /// True range.
    pub tr: Option<f64>,
    pub atr: Option<f64>,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub avg_gain: Option<f64>,
    pub avg_loss: Option<f64>,
    pub rsi: Option<f64>,
    /// EMA seeded from the first close, so it is defined from the first row.
    pub ema: f64,
}

impl IndicatorRow {
    #[inline]
    pub fn ts_ms(&self) -> TimestampMs {
        self.candle.ts_ms
    }
}

/// Output columns of the feature table, in emission order.
pub const FEATURE_COLUMNS: [&str; 21] = [
    "time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "turnover",
    "ATR",
    "MA5",
    "MA10",
    "MA20",
    "BB_upper",
    "BB_lower",
    "RSI",
    "EMA",
    "ATR_daily",
    "MA20_daily",
    "RSI_daily",
    "EMA_daily",
    "fundingRate",
    "openInterest",
];

/// Timestamps of the rows each joined field was taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSources {
    pub daily_ts: Option<TimestampMs>,
    pub funding_ts: Option<TimestampMs>,
    pub open_interest_ts: Option<TimestampMs>,
}

/// One row of the hourly feature table.
///
/// Field order matches [`FEATURE_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(rename = "time")]
    pub ts_ms: TimestampMs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub turnover: f64,
    #[serde(rename = "ATR")]
    pub atr: Option<f64>,
    #[serde(rename = "MA5")]
    pub ma5: Option<f64>,
    #[serde(rename = "MA10")]
    pub ma10: Option<f64>,
    #[serde(rename = "MA20")]
    pub ma20: Option<f64>,
    #[serde(rename = "BB_upper")]
    pub bb_upper: Option<f64>,
    #[serde(rename = "BB_lower")]
    pub bb_lower: Option<f64>,
    #[serde(rename = "RSI")]
    pub rsi: Option<f64>,
    #[serde(rename = "EMA")]
    pub ema: f64,
    #[serde(rename = "ATR_daily")]
    pub daily_atr: Option<f64>,
    #[serde(rename = "MA20_daily")]
    pub daily_ma20: Option<f64>,
    #[serde(rename = "RSI_daily")]
    pub daily_rsi: Option<f64>,
    #[serde(rename = "EMA_daily")]
    pub daily_ema: Option<f64>,
    #[serde(rename = "fundingRate")]
    pub funding_rate: Option<f64>,
    #[serde(rename = "openInterest")]
    pub open_interest: Option<f64>,
    /// Provenance of the joined fields; not part of the table.
    #[serde(skip)]
    pub sources: JoinSources,
}

impl FeatureRow {
    /// Start a row from an hourly indicator row with no joined fields.
    pub fn from_hourly(row: &IndicatorRow) -> Self {
        let c = &row.candle;
        Self {
            ts_ms: c.ts_ms,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            turnover: c.turnover,
            atr: row.atr,
            ma5: row.ma5,
            ma10: row.ma10,
            ma20: row.ma20,
            bb_upper: row.bb_upper,
            bb_lower: row.bb_lower,
            rsi: row.rsi,
            ema: row.ema,
            daily_atr: None,
            daily_ma20: None,
            daily_rsi: None,
            daily_ema: None,
            funding_rate: None,
            open_interest: None,
            sources: JoinSources::default(),
        }
    }

    /// Values of every column after `time`, in [`FEATURE_COLUMNS`] order.
    pub fn values(&self) -> [Option<f64>; 20] {
        [
            Some(self.open),
            Some(self.high),
            Some(self.low),
            Some(self.close),
            Some(self.volume),
            Some(self.turnover),
            self.atr,
            self.ma5,
            self.ma10,
            self.ma20,
            self.bb_upper,
            self.bb_lower,
            self.rsi,
            Some(self.ema),
            self.daily_atr,
            self.daily_ma20,
            self.daily_rsi,
            self.daily_ema,
            self.funding_rate,
            self.open_interest,
        ]
    }
}
