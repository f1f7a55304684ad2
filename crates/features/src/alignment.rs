//! Alignment of secondary series onto the hourly timeline.
//!
//! Every joined field is looked up backward: a row at `t` only ever sees
//! source rows stamped at or before `t`.

use featline_core::{
    ts_to_day, ts_to_hour, CanonicalSeries, FeatureRow, FundingRate, IndicatorRow, OpenInterest,
    Timestamped, TimestampMs, HOUR_MS,
};
use tracing::info;

/// Index of the latest record at or before `ts_ms` in a sorted slice.
fn index_at_or_before<T: Timestamped>(records: &[T], ts_ms: TimestampMs) -> Option<usize> {
    records.partition_point(|r| r.ts_ms() <= ts_ms).checked_sub(1)
}

/// Resample funding settlements onto a regular grid by linear interpolation.
///
/// Grid points run from the first anchor (rounded up to the step) to the last
/// anchor. Nothing is produced outside the anchors.
pub fn interpolate_funding(
    funding: &CanonicalSeries<FundingRate>,
    step_ms: i64,
) -> Vec<(TimestampMs, f64)> {
    let anchors = funding.records();
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return Vec::new();
    };
    let step = step_ms.max(1);

    let mut grid = Vec::new();
    let mut t = (first.ts_ms + step - 1).div_euclid(step) * step;
    while t <= last.ts_ms {
        // `t >= first`, so there is always an anchor at or before it.
        let i = anchors.partition_point(|a| a.ts_ms <= t);
        let a0 = &anchors[i - 1];
        let value = match anchors.get(i) {
            Some(a1) if a0.ts_ms < t => {
                let w = (t - a0.ts_ms) as f64 / (a1.ts_ms - a0.ts_ms) as f64;
                a0.rate + (a1.rate - a0.rate) * w
            }
            _ => a0.rate,
        };
        grid.push((t, value));
        t += step;
    }
    grid
}

/// Builds the hourly feature table.
#[derive(Debug, Clone)]
pub struct AlignmentEngine {
    /// Grid step of the resampled funding series.
    funding_step_ms: i64,
}

impl AlignmentEngine {
    pub fn new() -> Self {
        Self {
            funding_step_ms: HOUR_MS,
        }
    }

    /// Join daily indicators, funding and open interest onto hourly rows.
    ///
    /// Missing or partial secondary series leave their fields `None`.
    pub fn align(
        &self,
        hourly: &[IndicatorRow],
        daily: &[IndicatorRow],
        funding: &CanonicalSeries<FundingRate>,
        open_interest: &CanonicalSeries<OpenInterest>,
    ) -> Vec<FeatureRow> {
        let funding_grid = interpolate_funding(funding, self.funding_step_ms);

        let rows: Vec<FeatureRow> = hourly
            .iter()
            .map(|h| {
                let t = h.ts_ms();
                let mut row = FeatureRow::from_hourly(h);

                if let Some(d) = index_at_or_before(daily, ts_to_day(t)).map(|i| &daily[i]) {
                    row.daily_atr = d.atr;
                    row.daily_ma20 = d.ma20;
                    row.daily_rsi = d.rsi;
                    row.daily_ema = Some(d.ema);
                    row.sources.daily_ts = Some(d.ts_ms());
                }

                let grid_idx = funding_grid.partition_point(|(g, _)| *g <= ts_to_hour(t));
                if let Some(&(g, rate)) = grid_idx.checked_sub(1).map(|i| &funding_grid[i]) {
                    row.funding_rate = Some(rate);
                    row.sources.funding_ts = Some(g);
                }

                if let Some(oi) = open_interest.at_or_before(t) {
                    row.open_interest = Some(oi.open_interest);
                    row.sources.open_interest_ts = Some(oi.ts_ms);
                }
                row
            })
            .collect();

        info!(
            rows = rows.len(),
            with_daily = rows.iter().filter(|r| r.sources.daily_ts.is_some()).count(),
            with_funding = rows.iter().filter(|r| r.funding_rate.is_some()).count(),
            with_open_interest = rows.iter().filter(|r| r.open_interest.is_some()).count(),
            "feature table aligned"
        );
        rows
    }
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self::new()
    }
}
