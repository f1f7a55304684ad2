//! True range and average true range.

use featline_core::Candle;

use crate::rolling::RollingWindow;

/// True range of a candle given the previous close.
///
/// Without a previous close only the candle's own range is available.
pub fn true_range(candle: &Candle, prev_close: Option<f64>) -> f64 {
    let range = candle.high - candle.low;
    match prev_close {
        Some(pc) => range
            .max((candle.high - pc).abs())
            .max((candle.low - pc).abs()),
        None => range,
    }
}

/// Streaming ATR: trailing simple mean of true range.
#[derive(Debug, Clone)]
pub struct AverageTrueRange {
    window: RollingWindow,
    prev_close: Option<f64>,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Self {
        Self {
            window: RollingWindow::new(period),
            prev_close: None,
        }
    }

    /// Add a candle; returns `(true range, ATR)`.
    pub fn update(&mut self, candle: &Candle) -> (f64, Option<f64>) {
        let tr = true_range(candle, self.prev_close);
        self.prev_close = Some(candle.close);
        self.window.push(tr);
        (tr, self.window.mean())
    }
}
