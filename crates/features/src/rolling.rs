//! Trailing fixed-length windows.
//!
//! Every rolling indicator here is defined only once its window has been
//! completely observed; before that the accessors return `None`.

use std::collections::VecDeque;

use statrs::statistics::Statistics;

/// Fixed-length trailing window of observations.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Window length in observations.
    window: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    /// Add an observation, evicting the oldest once the window is full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Check if the window is full.
    pub fn is_ready(&self) -> bool {
        self.window > 0 && self.values.len() >= self.window
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Trailing simple mean.
    ///
    /// Summed afresh on every call so an all-zero window is exactly zero.
    pub fn mean(&self) -> Option<f64> {
        self.is_ready()
            .then(|| self.values.iter().sum::<f64>() / self.window as f64)
    }

    /// Trailing sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_ready() || self.window < 2 {
            return None;
        }
        let sd = self.values.iter().copied().std_dev();
        // Round-off on a constant window can come back as NaN.
        Some(if sd.is_nan() { 0.0 } else { sd })
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
