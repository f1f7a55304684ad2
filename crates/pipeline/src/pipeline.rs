//! One feature-table run.
//!
//! Every resource is fetched on its own task with its own [`Pacer`]; the
//! tasks share nothing but a stop signal. Once all fetches have ended the
//! series are normalized, the candles get their indicators and everything is
//! aligned onto the hourly timeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use featline_core::{
    CanonicalSeries, Candle, Config, Error, FeatureRow, FetchError, FundingRate, LongShortRatio,
    OpenInterest, ResourceKind, Result, TimeWindow, TimestampMs,
};
use featline_features::{AlignmentEngine, IndicatorEngine};
use featline_ingestion::{
    FetchOutcome, HttpPageSource, Normalized, Pacer, PageSource, PagedFetcher, ResourceDescriptor,
    RetryPolicy, SeriesNormalizer, SeriesRecord,
};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::report::ResourceReport;

/// Result of a run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The hourly feature table.
    pub features: Vec<FeatureRow>,
    /// Long/short ratio series, when requested.
    pub long_short_ratio: Option<CanonicalSeries<LongShortRatio>>,
    /// One report per fetched resource.
    pub reports: Vec<ResourceReport>,
}

impl PipelineOutput {
    pub fn report(&self, kind: ResourceKind) -> Option<&ResourceReport> {
        self.reports.iter().find(|r| r.resource == kind)
    }

    /// Resources whose data is partial or missing.
    pub fn degraded(&self) -> impl Iterator<Item = &ResourceReport> {
        self.reports.iter().filter(|r| r.is_degraded())
    }
}

/// Fetch-normalize-compute-align pipeline.
pub struct Pipeline {
    config: Config,
    fetcher: PagedFetcher,
    indicators: IndicatorEngine,
    alignment: AlignmentEngine,
}

impl Pipeline {
    /// Create a pipeline over any page source.
    pub fn new(config: Config, source: Arc<dyn PageSource>) -> Result<Self> {
        config.validate()?;
        let fetcher = PagedFetcher::new(
            source,
            config.instrument.clone(),
            RetryPolicy::from_config(&config.api),
        );
        Ok(Self {
            indicators: IndicatorEngine::new(&config.indicators),
            alignment: AlignmentEngine::new(),
            fetcher,
            config,
        })
    }

    /// Create a pipeline talking to the configured REST API.
    pub fn from_config(config: Config) -> Result<Self> {
        let source = HttpPageSource::new(&config.api)?;
        Self::new(config, Arc::new(source))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resources fetched by a run, primary first.
    fn resources(&self) -> Vec<ResourceKind> {
        let mut kinds = vec![
            ResourceKind::HourlyKlines,
            ResourceKind::DailyKlines,
            ResourceKind::FundingRate,
            ResourceKind::OpenInterest,
        ];
        if self.config.pipeline.fetch_long_short_ratio {
            kinds.push(ResourceKind::LongShortRatio);
        }
        kinds
    }

    /// Run over the configured lookback ending now.
    pub async fn run_latest(&self) -> Result<PipelineOutput> {
        self.run_lookback(Utc::now().timestamp_millis()).await
    }

    /// Run over the configured lookback ending at `now_ms`.
    pub async fn run_lookback(&self, now_ms: TimestampMs) -> Result<PipelineOutput> {
        let window = TimeWindow::lookback(now_ms, self.config.pipeline.lookback_days)?;
        self.run(window).await
    }

    /// Build the feature table for `window`.
    ///
    /// Fails only when the hourly candles cannot be fetched completely; every
    /// other resource degrades to partial or empty data.
    pub async fn run(&self, window: TimeWindow) -> Result<PipelineOutput> {
        let kinds = self.resources();
        let descriptors: HashMap<ResourceKind, ResourceDescriptor> = kinds
            .iter()
            .map(|&kind| {
                ResourceDescriptor::from_config(kind, self.config.resources.get(kind))
                    .map(|d| (kind, d))
            })
            .collect::<Result<_>>()?;
        info!(window = %window, resources = kinds.len(), "run started");

        let mut outcomes = self.fetch_all(&kinds, &descriptors, window).await?;

        let mut take = |kind: ResourceKind| {
            outcomes.remove(&kind).unwrap_or_else(|| FetchOutcome {
                kind,
                records: Vec::new(),
                requests: 0,
                error: Some(FetchError::Cancelled),
            })
        };
        let mut reports = Vec::with_capacity(kinds.len());

        let hourly: Normalized<Candle> =
            normalize(&descriptors, take(ResourceKind::HourlyKlines), &mut reports);
        let daily: Normalized<Candle> =
            normalize(&descriptors, take(ResourceKind::DailyKlines), &mut reports);
        let funding: Normalized<FundingRate> =
            normalize(&descriptors, take(ResourceKind::FundingRate), &mut reports);
        let open_interest: Normalized<OpenInterest> =
            normalize(&descriptors, take(ResourceKind::OpenInterest), &mut reports);
        let long_short_ratio = if self.config.pipeline.fetch_long_short_ratio {
            let ratio: Normalized<LongShortRatio> =
                normalize(&descriptors, take(ResourceKind::LongShortRatio), &mut reports);
            Some(ratio.series)
        } else {
            None
        };

        if hourly.series.is_empty() {
            return Err(Error::data(format!("no hourly candles in {window}")));
        }

        let hourly_rows = self.indicators.compute(&hourly.series);
        let daily_rows = self.indicators.compute(&daily.series);
        let features = self.alignment.align(
            &hourly_rows,
            &daily_rows,
            &funding.series,
            &open_interest.series,
        );

        for report in reports.iter().filter(|r| r.is_degraded()) {
            warn!(
                resource = %report.resource,
                records = report.records,
                error = ?report.error,
                "resource degraded"
            );
        }
        info!(rows = features.len(), "run finished");

        Ok(PipelineOutput {
            features,
            long_short_ratio,
            reports,
        })
    }

    /// Fetch every resource concurrently.
    ///
    /// A failed primary fetch raises the stop signal so the siblings end early,
    /// then surfaces as [`Error::PrimaryFetch`].
    async fn fetch_all(
        &self,
        kinds: &[ResourceKind],
        descriptors: &HashMap<ResourceKind, ResourceDescriptor>,
        window: TimeWindow,
    ) -> Result<HashMap<ResourceKind, FetchOutcome>> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let pacing = Duration::from_millis(self.config.api.pacing_ms);

        let mut tasks = JoinSet::new();
        for kind in kinds {
            let Some(descriptor) = descriptors.get(kind).cloned() else {
                continue;
            };
            let fetcher = self.fetcher.clone();
            let stop = stop_rx.clone();
            tasks.spawn(async move {
                let mut pacer = Pacer::new(pacing);
                fetcher
                    .fetch_until_stopped(&descriptor, window, &mut pacer, stop)
                    .await
            });
        }

        let mut outcomes = HashMap::with_capacity(kinds.len());
        let mut primary_failure = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| Error::Other(format!("fetch task failed: {e}")))?;
            if outcome.kind == ResourceKind::HourlyKlines {
                if let Some(e) = &outcome.error {
                    error!(error = %e, "primary fetch failed, stopping remaining fetches");
                    // Receivers may all be gone already.
                    let _ = stop_tx.send(true);
                    primary_failure = Some(e.clone());
                }
            }
            outcomes.insert(outcome.kind, outcome);
        }

        match primary_failure {
            Some(source) => Err(Error::PrimaryFetch {
                resource: ResourceKind::HourlyKlines,
                source,
            }),
            None => Ok(outcomes),
        }
    }
}

fn normalize<T: SeriesRecord>(
    descriptors: &HashMap<ResourceKind, ResourceDescriptor>,
    outcome: FetchOutcome,
    reports: &mut Vec<ResourceReport>,
) -> Normalized<T> {
    let normalized = match descriptors.get(&outcome.kind) {
        Some(descriptor) => {
            SeriesNormalizer::for_resource(descriptor).normalize(outcome.records.clone())
        }
        None => Normalized {
            series: CanonicalSeries::empty(),
            stats: Default::default(),
        },
    };
    reports.push(ResourceReport::new(&outcome, normalized.stats));
    normalized
}
