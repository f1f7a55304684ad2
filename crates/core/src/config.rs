//! Configuration structures for the featline system.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ResourceKind;

/// Main configuration for a feature-table run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument configuration.
    pub instrument: InstrumentConfig,
    /// Remote API configuration.
    pub api: ApiConfig,
    /// Per-resource paging configuration.
    pub resources: ResourcesConfig,
    /// Indicator periods.
    pub indicators: IndicatorConfig,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a JSON configuration; missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject configurations that cannot produce a feature table.
    pub fn validate(&self) -> Result<()> {
        if self.instrument.symbol.trim().is_empty() {
            return Err(Error::config("instrument.symbol must not be empty"));
        }
        if self.api.max_retries == 0 {
            return Err(Error::config("api.max_retries must be at least 1"));
        }
        for (name, resource) in self.resources.named() {
            if resource.limit == 0 {
                return Err(Error::config(format!("resources.{name}.limit must be positive")));
            }
            if resource.slice_hours == Some(0) {
                return Err(Error::config(format!(
                    "resources.{name}.slice_hours must be positive"
                )));
            }
        }
        self.indicators.validate()?;
        if self.pipeline.lookback_days == 0 {
            return Err(Error::config("pipeline.lookback_days must be positive"));
        }
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Trading symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Product category (e.g., "linear").
    pub category: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            category: "linear".to_string(),
        }
    }
}

/// Remote API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Delay between consecutive requests of one resource (ms).
    pub pacing_ms: u64,
    /// Attempts per request before a transport failure becomes fatal.
    pub max_retries: u32,
    /// Initial backoff after a transport failure (ms), doubled per attempt.
    pub retry_backoff_ms: u64,
    /// Backoff cap (ms).
    pub retry_backoff_max_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bybit.com".to_string(),
            request_timeout_ms: 10_000,
            pacing_ms: 1_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            retry_backoff_max_ms: 16_000,
        }
    }
}

/// Paging parameters of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Maximum records per page.
    pub limit: u32,
    /// Width of cursor sub-windows in hours; `None` for window-advance paging.
    pub slice_hours: Option<u32>,
    /// Interval or period parameter sent with the request.
    pub interval: String,
}

/// Paging configuration for every resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub hourly_klines: ResourceConfig,
    pub daily_klines: ResourceConfig,
    pub funding_rate: ResourceConfig,
    pub open_interest: ResourceConfig,
    pub long_short_ratio: ResourceConfig,
}

impl ResourcesConfig {
    /// Paging parameters of `kind`.
    pub fn get(&self, kind: ResourceKind) -> &ResourceConfig {
        match kind {
            ResourceKind::HourlyKlines => &self.hourly_klines,
            ResourceKind::DailyKlines => &self.daily_klines,
            ResourceKind::FundingRate => &self.funding_rate,
            ResourceKind::OpenInterest => &self.open_interest,
            ResourceKind::LongShortRatio => &self.long_short_ratio,
        }
    }

    fn named(&self) -> impl Iterator<Item = (&'static str, &ResourceConfig)> {
        [
            ResourceKind::HourlyKlines,
            ResourceKind::DailyKlines,
            ResourceKind::FundingRate,
            ResourceKind::OpenInterest,
            ResourceKind::LongShortRatio,
        ]
        .into_iter()
        .map(|kind| (kind.as_str(), self.get(kind)))
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            hourly_klines: ResourceConfig {
                limit: 1000,
                slice_hours: None,
                interval: "60".to_string(),
            },
            daily_klines: ResourceConfig {
                limit: 1000,
                slice_hours: None,
                interval: "D".to_string(),
            },
            funding_rate: ResourceConfig {
                limit: 200,
                slice_hours: Some(8),
                interval: "8h".to_string(),
            },
            open_interest: ResourceConfig {
                limit: 200,
                slice_hours: Some(1),
                interval: "1h".to_string(),
            },
            long_short_ratio: ResourceConfig {
                limit: 500,
                slice_hours: Some(24),
                interval: "1h".to_string(),
            },
        }
    }
}

/// Indicator periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// ATR window.
    pub atr_period: usize,
    /// Bollinger window.
    pub bb_period: usize,
    /// Bollinger band width in standard deviations.
    pub bb_k: f64,
    /// Short moving average window.
    pub ma_short: usize,
    /// Middle moving average window.
    pub ma_mid: usize,
    /// Long moving average window.
    pub ma_long: usize,
    /// RSI window.
    pub rsi_period: usize,
    /// EMA span.
    pub ema_span: usize,
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("atr_period", self.atr_period),
            ("bb_period", self.bb_period),
            ("ma_short", self.ma_short),
            ("ma_mid", self.ma_mid),
            ("ma_long", self.ma_long),
            ("rsi_period", self.rsi_period),
            ("ema_span", self.ema_span),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(Error::config(format!("indicators.{name} must be positive")));
        }
        if self.bb_period < 2 {
            return Err(Error::config("indicators.bb_period needs at least 2 observations"));
        }
        if !(self.bb_k > 0.0) {
            return Err(Error::config("indicators.bb_k must be positive"));
        }
        Ok(())
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            bb_period: 20,
            bb_k: 2.0,
            ma_short: 5,
            ma_mid: 10,
            ma_long: 20,
            rsi_period: 14,
            ema_span: 20,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Days of history to fetch.
    pub lookback_days: u32,
    /// Also fetch the long/short ratio series.
    pub fetch_long_short_ratio: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            fetch_long_short_ratio: false,
        }
    }
}
