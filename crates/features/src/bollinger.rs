//! Bollinger bands over closes.

use crate::rolling::RollingWindow;

/// Upper and lower band at one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub lower: f64,
}

/// Streaming Bollinger bands: trailing mean plus/minus `k` sample deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    window: RollingWindow,
    k: f64,
}

impl BollingerBands {
    pub fn new(period: usize, k: f64) -> Self {
        Self {
            window: RollingWindow::new(period),
            k,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<Bands> {
        self.window.push(close);
        let mean = self.window.mean()?;
        let sd = self.window.std_dev()?;
        Some(Bands {
            upper: mean + self.k * sd,
            lower: mean - self.k * sd,
        })
    }
}
