//! Indicator computation engine.
//!
//! Runs every indicator over a canonical candle series in one pass and emits
//! one [`IndicatorRow`] per candle.

use featline_core::config::IndicatorConfig;
use featline_core::{CanonicalSeries, Candle, IndicatorRow};
use tracing::debug;

use crate::{
    atr::AverageTrueRange, bollinger::BollingerBands, ema::Ema, rolling::RollingWindow, rsi::Rsi,
};

/// Indicator computation engine.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    /// Create an engine from indicator configuration.
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Extend every candle with its indicators.
    ///
    /// Short series are not an error: indicators whose window is not yet
    /// filled are `None`.
    pub fn compute(&self, series: &CanonicalSeries<Candle>) -> Vec<IndicatorRow> {
        let cfg = &self.config;
        let mut atr = AverageTrueRange::new(cfg.atr_period);
        let mut bollinger = BollingerBands::new(cfg.bb_period, cfg.bb_k);
        let mut ma_short = RollingWindow::new(cfg.ma_short);
        let mut ma_mid = RollingWindow::new(cfg.ma_mid);
        let mut ma_long = RollingWindow::new(cfg.ma_long);
        let mut rsi = Rsi::new(cfg.rsi_period);
        let mut ema = Ema::new(cfg.ema_span);

        let rows: Vec<IndicatorRow> = series
            .iter()
            .map(|candle| {
                let (tr, atr_value) = atr.update(candle);
                let bands = bollinger.update(candle.close);
                ma_short.push(candle.close);
                ma_mid.push(candle.close);
                ma_long.push(candle.close);
                let rsi_value = rsi.update(candle.close);

                IndicatorRow {
                    candle: candle.clone(),
                    tr: Some(tr),
                    atr: atr_value,
                    ma5: ma_short.mean(),
                    ma10: ma_mid.mean(),
                    ma20: ma_long.mean(),
                    bb_upper: bands.map(|b| b.upper),
                    bb_lower: bands.map(|b| b.lower),
                    avg_gain: rsi_value.map(|v| v.avg_gain),
                    avg_loss: rsi_value.map(|v| v.avg_loss),
                    rsi: rsi_value.map(|v| v.rsi),
                    ema: ema.update(candle.close),
                }
            })
            .collect();

        debug!(
            rows = rows.len(),
            first_atr = rows.iter().position(|r| r.atr.is_some()),
            first_rsi = rows.iter().position(|r| r.rsi.is_some()),
            "indicators computed"
        );
        rows
    }
}
