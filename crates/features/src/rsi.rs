//! Relative strength index with simple (non-Wilder) averaging.

use crate::rolling::RollingWindow;

/// RSI and its intermediate averages at one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiValue {
    pub avg_gain: f64,
    pub avg_loss: f64,
    pub rsi: f64,
}

/// RSI from average gain and loss.
///
/// A zero average loss means an infinite RS, which is RSI 100.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Streaming RSI over close-to-close changes.
///
/// The first close has no change, so a period of `n` needs `n + 1` closes.
#[derive(Debug, Clone)]
pub struct Rsi {
    gains: RollingWindow,
    losses: RollingWindow,
    prev_close: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            gains: RollingWindow::new(period),
            losses: RollingWindow::new(period),
            prev_close: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<RsiValue> {
        let prev = self.prev_close.replace(close)?;
        let delta = close - prev;
        self.gains.push(delta.max(0.0));
        self.losses.push((-delta).max(0.0));

        let avg_gain = self.gains.mean()?;
        let avg_loss = self.losses.mean()?;
        Some(RsiValue {
            avg_gain,
            avg_loss,
            rsi: rsi_from_averages(avg_gain, avg_loss),
        })
    }
}
