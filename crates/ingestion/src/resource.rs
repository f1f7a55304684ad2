//! Resource descriptors for the paginated market-data API.
//!
//! A descriptor carries everything the fetch loop needs to know about one
//! logical resource: endpoint, parameter names, page size, where the record
//! timestamp lives, and which pagination style the endpoint uses.

use featline_core::config::{InstrumentConfig, ResourceConfig};
use featline_core::{Error, ResourceKind, Result, TimeWindow, TimestampMs, DAY_MS, HOUR_MS};
use serde_json::Value;

use crate::normalizer::coerce_timestamp;
use crate::source::PageRequest;

/// Location of a field inside a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef {
    /// Positional field of an array record (candles).
    Index(usize),
    /// Named field of an object record.
    Key(&'static str),
}

impl FieldRef {
    pub fn get<'a>(&self, raw: &'a Value) -> Option<&'a Value> {
        match *self {
            FieldRef::Index(i) => raw.as_array().and_then(|a| a.get(i)),
            FieldRef::Key(k) => raw.get(k),
        }
    }

    /// Record timestamp, if present and coercible.
    pub fn timestamp(&self, raw: &Value) -> Option<TimestampMs> {
        self.get(raw).and_then(coerce_timestamp)
    }

    pub fn name(&self) -> String {
        match *self {
            FieldRef::Index(i) => format!("[{i}]"),
            FieldRef::Key(k) => k.to_string(),
        }
    }
}

/// How an endpoint pages through a time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Next request starts one millisecond after the newest record of a full page.
    WindowAdvance,
    /// Fixed-width sub-windows, each drained with server continuation cursors.
    Cursor { slice_ms: i64 },
}

/// Parameters that change between the requests of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub window: TimeWindow,
    pub cursor: Option<String>,
}

/// Static description of one API resource.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Endpoint path, appended to the API base URL.
    pub path: &'static str,
    /// Name of the interval/period parameter, if the endpoint takes one.
    pub interval_param: Option<&'static str>,
    pub interval: String,
    pub start_param: &'static str,
    pub end_param: &'static str,
    /// Maximum records per page.
    pub limit: u32,
    pub time_field: FieldRef,
    pub pagination: Pagination,
    /// Native spacing between records.
    pub interval_hint_ms: i64,
}

impl ResourceDescriptor {
    /// Build the descriptor of `kind` from its paging configuration.
    pub fn from_config(kind: ResourceKind, config: &ResourceConfig) -> Result<Self> {
        let pagination = match config.slice_hours {
            Some(0) => {
                return Err(Error::config(format!("{kind}: slice_hours must be positive")));
            }
            Some(hours) => Pagination::Cursor {
                slice_ms: hours as i64 * HOUR_MS,
            },
            None => Pagination::WindowAdvance,
        };
        let interval_hint_ms = match kind {
            ResourceKind::FundingRate => 8 * HOUR_MS,
            _ => parse_interval_ms(&config.interval).ok_or_else(|| {
                Error::config(format!("{kind}: unknown interval `{}`", config.interval))
            })?,
        };

        let (path, interval_param, start_param, end_param, time_field) = match kind {
            ResourceKind::HourlyKlines | ResourceKind::DailyKlines => (
                "/v5/market/kline",
                Some("interval"),
                "start",
                "end",
                FieldRef::Index(0),
            ),
            ResourceKind::FundingRate => (
                "/v5/market/funding/history",
                None,
                "startTime",
                "endTime",
                FieldRef::Key("fundingRateTimestamp"),
            ),
            ResourceKind::OpenInterest => (
                "/v5/market/open-interest",
                Some("intervalTime"),
                "startTime",
                "endTime",
                FieldRef::Key("timestamp"),
            ),
            ResourceKind::LongShortRatio => (
                "/v5/market/account-ratio",
                Some("period"),
                "startTime",
                "endTime",
                FieldRef::Key("timestamp"),
            ),
        };

        Ok(Self {
            kind,
            path,
            interval_param,
            interval: config.interval.clone(),
            start_param,
            end_param,
            limit: config.limit,
            time_field,
            pagination,
            interval_hint_ms,
        })
    }

    /// Build the request for one page.
    pub fn request(&self, instrument: &InstrumentConfig, params: &PageParams) -> PageRequest {
        let mut query = vec![
            ("category".to_string(), instrument.category.clone()),
            ("symbol".to_string(), instrument.symbol.clone()),
        ];
        if let Some(name) = self.interval_param {
            query.push((name.to_string(), self.interval.clone()));
        }
        query.push((self.start_param.to_string(), params.window.start().to_string()));
        query.push((self.end_param.to_string(), params.window.end().to_string()));
        query.push(("limit".to_string(), self.limit.to_string()));
        if let Some(cursor) = &params.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        PageRequest {
            path: self.path.to_string(),
            params: query,
        }
    }
}

/// Parse an API interval string into milliseconds.
///
/// Accepts kline minute counts (`"60"`), kline letters (`"D"`, `"W"`) and
/// period strings (`"5min"`, `"1h"`, `"8h"`, `"1d"`).
pub fn parse_interval_ms(interval: &str) -> Option<i64> {
    let s = interval.trim();
    match s {
        "D" => return Some(DAY_MS),
        "W" => return Some(7 * DAY_MS),
        _ => {}
    }
    if let Ok(minutes) = s.parse::<i64>() {
        return (minutes > 0).then_some(minutes * 60_000);
    }
    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = s.split_at(split);
    let count: i64 = count.parse().ok().filter(|c| *c > 0)?;
    let unit_ms = match unit {
        "min" | "m" => 60_000,
        "h" => HOUR_MS,
        "d" => DAY_MS,
        _ => return None,
    };
    Some(count * unit_ms)
}
