//! Exponential moving average seeded from the first close.

/// Streaming EMA with `alpha = 2 / (span + 1)`.
///
/// The first value is the first observation itself, not an SMA seed, so the
/// EMA is defined from the first row on.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span as f64 + 1.0),
            value: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_seeded_from_first_value() {
        let mut ema = Ema::new(20);
        assert_eq!(ema.update(100.0), 100.0);
        let alpha = 2.0 / 21.0;
        assert_relative_eq!(ema.update(121.0), 100.0 + alpha * 21.0);
        assert_relative_eq!(ema.alpha(), alpha);
    }

    #[test]
    fn test_span_one_tracks_input() {
        let mut ema = Ema::new(1);
        ema.update(3.0);
        assert_eq!(ema.update(7.0), 7.0);
    }
}
