//! Paginated resource fetching.
//!
//! [`PagedFetcher`] drives one resource over an arbitrary [`TimeWindow`]. The
//! request loop is shared; the two pagination styles differ only in their
//! [`PaginationStrategy`]: how the next request is derived and when the range
//! is exhausted. Requests of one fetch are strictly sequential.

use std::sync::Arc;
use std::time::Duration;

use featline_core::config::{ApiConfig, InstrumentConfig};
use featline_core::{FetchError, ResourceKind, TimeWindow};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::pacer::Pacer;
use crate::resource::{FieldRef, PageParams, Pagination, ResourceDescriptor};
use crate::source::{Page, PageRequest, PageSource, RawRecord};

/// Records gathered by one fetch, with the error that ended it early, if any.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub kind: ResourceKind,
    /// Records in fetch order, page after page.
    pub records: Vec<RawRecord>,
    /// Pages successfully received.
    pub requests: usize,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            requests: 0,
            error: None,
        }
    }

    /// True when the whole window was covered without error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded retry with doubling backoff for transport failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_backoff: Duration::from_millis(config.retry_backoff_max_ms),
        }
    }

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

/// Decides the next request of a paginated fetch.
pub trait PaginationStrategy: Send {
    /// Parameters of the next request, or `None` once the range is exhausted.
    fn next_params(&self) -> Option<PageParams>;

    /// Fold a received page into the strategy state.
    fn advance(&mut self, page: &Page) -> Result<(), FetchError>;
}

/// Window-advance pagination.
///
/// A full page moves the window start to one millisecond past its newest
/// record; a short page, or a start that reaches the window end, exhausts the
/// range. A full page that does not move the start forward is a stall.
#[derive(Debug, Clone)]
pub struct WindowAdvance {
    kind: ResourceKind,
    remaining: Option<TimeWindow>,
    limit: usize,
    time_field: FieldRef,
}

impl WindowAdvance {
    pub fn new(kind: ResourceKind, window: TimeWindow, limit: u32, time_field: FieldRef) -> Self {
        Self {
            kind,
            remaining: Some(window),
            limit: limit as usize,
            time_field,
        }
    }
}

impl PaginationStrategy for WindowAdvance {
    fn next_params(&self) -> Option<PageParams> {
        self.remaining.map(|window| PageParams {
            window,
            cursor: None,
        })
    }

    fn advance(&mut self, page: &Page) -> Result<(), FetchError> {
        let Some(current) = self.remaining else {
            return Ok(());
        };
        if page.list.len() < self.limit {
            self.remaining = None;
            return Ok(());
        }

        // Newest record rather than positional last, so descending pages advance too.
        let newest = page
            .list
            .iter()
            .filter_map(|r| self.time_field.timestamp(r))
            .max();
        let next_start = newest.map_or(current.start(), |ts| ts + 1);
        if next_start <= current.start() {
            return Err(FetchError::PaginationStalled {
                resource: self.kind,
                current_start: current.start(),
                next_start,
            });
        }
        self.remaining = current.advanced_to(next_start);
        Ok(())
    }
}

/// Cursor pagination over fixed-width sub-windows.
///
/// Each sub-window is requested repeatedly with the cursor returned by the
/// previous page until the server stops returning one.
#[derive(Debug, Clone)]
pub struct CursorSlices {
    kind: ResourceKind,
    slices: Vec<TimeWindow>,
    current: usize,
    cursor: Option<String>,
}

impl CursorSlices {
    pub fn new(kind: ResourceKind, window: TimeWindow, slice_ms: i64) -> Self {
        Self {
            kind,
            slices: window.slices(slice_ms).collect(),
            current: 0,
            cursor: None,
        }
    }
}

impl PaginationStrategy for CursorSlices {
    fn next_params(&self) -> Option<PageParams> {
        self.slices.get(self.current).map(|window| PageParams {
            window: *window,
            cursor: self.cursor.clone(),
        })
    }

    fn advance(&mut self, page: &Page) -> Result<(), FetchError> {
        match page.cursor() {
            Some(next) if self.cursor.as_deref() == Some(next) => {
                let start = self.slices.get(self.current).map_or(0, |w| w.start());
                Err(FetchError::PaginationStalled {
                    resource: self.kind,
                    current_start: start,
                    next_start: start,
                })
            }
            Some(next) => {
                self.cursor = Some(next.to_string());
                Ok(())
            }
            None => {
                self.current += 1;
                self.cursor = None;
                Ok(())
            }
        }
    }
}

/// Build the strategy matching a descriptor's pagination style.
pub fn strategy_for(
    descriptor: &ResourceDescriptor,
    window: TimeWindow,
) -> Box<dyn PaginationStrategy> {
    match descriptor.pagination {
        Pagination::WindowAdvance => Box::new(WindowAdvance::new(
            descriptor.kind,
            window,
            descriptor.limit,
            descriptor.time_field,
        )),
        Pagination::Cursor { slice_ms } => {
            Box::new(CursorSlices::new(descriptor.kind, window, slice_ms))
        }
    }
}

/// Resolves once `stop` carries `true`; never resolves if the sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Fetches complete time ranges of paginated resources.
#[derive(Clone)]
pub struct PagedFetcher {
    source: Arc<dyn PageSource>,
    instrument: InstrumentConfig,
    retry: RetryPolicy,
}

impl PagedFetcher {
    pub fn new(source: Arc<dyn PageSource>, instrument: InstrumentConfig, retry: RetryPolicy) -> Self {
        Self {
            source,
            instrument,
            retry,
        }
    }

    /// Fetch every record of `descriptor` inside `window`.
    pub async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        window: TimeWindow,
        pacer: &mut Pacer,
    ) -> FetchOutcome {
        let (_keep_open, stop) = watch::channel(false);
        self.fetch_until_stopped(descriptor, window, pacer, stop).await
    }

    /// Like [`fetch`](Self::fetch), but gives up with [`FetchError::Cancelled`]
    /// as soon as `stop` turns `true`. Records received so far are kept.
    pub async fn fetch_until_stopped(
        &self,
        descriptor: &ResourceDescriptor,
        window: TimeWindow,
        pacer: &mut Pacer,
        mut stop: watch::Receiver<bool>,
    ) -> FetchOutcome {
        let kind = descriptor.kind;
        let mut strategy = strategy_for(descriptor, window);
        let mut outcome = FetchOutcome::new(kind);
        info!(resource = %kind, window = %window, "fetch started");

        while let Some(params) = strategy.next_params() {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => {
                    outcome.error = Some(FetchError::Cancelled);
                    break;
                }
                _ = pacer.ready() => {}
            }

            let request = descriptor.request(&self.instrument, &params);
            debug!(
                resource = %kind,
                start = params.window.start(),
                end = params.window.end(),
                cursor = ?params.cursor,
                "requesting page"
            );

            let page = match self.send_with_retry(kind, &request, &mut stop).await {
                Ok(page) => page,
                Err(e) => {
                    error!(resource = %kind, error = %e, records = outcome.records.len(), "fetch aborted");
                    outcome.error = Some(e);
                    break;
                }
            };
            outcome.requests += 1;
            debug!(resource = %kind, count = page.list.len(), "page received");

            let advanced = strategy.advance(&page);
            outcome.records.extend(page.list);
            if let Err(e) = advanced {
                error!(resource = %kind, error = %e, "pagination stalled");
                outcome.error = Some(e);
                break;
            }
        }

        info!(
            resource = %kind,
            requests = outcome.requests,
            records = outcome.records.len(),
            complete = outcome.is_complete(),
            "fetch finished"
        );
        outcome
    }

    /// Send one request, retrying transport failures with doubling backoff.
    async fn send_with_retry(
        &self,
        kind: ResourceKind,
        request: &PageRequest,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<Page, FetchError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.source.fetch_page(request).await {
                Ok(page) => return Ok(page),
                Err(FetchError::Transport { message, .. }) if attempt < self.retry.max_attempts => {
                    warn!(
                        resource = %kind,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %message,
                        "transport failure, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = stopped(stop) => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    attempt += 1;
                }
                Err(FetchError::Transport { message, .. }) => {
                    return Err(FetchError::Transport {
                        attempts: attempt,
                        message,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::normalizer::SeriesNormalizer;
    use featline_core::config::ResourceConfig;
    use featline_core::{Candle, HOUR_MS};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const BASE_TS: i64 = 1_700_000_000_000 - 1_700_000_000_000 % HOUR_MS;

    /// Serves `total` hourly candles the way the kline endpoint pages them.
    struct CandleServer {
        timestamps: Vec<i64>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl CandleServer {
        fn new(total: usize) -> Self {
            Self {
                timestamps: (0..total as i64).map(|i| BASE_TS + i * HOUR_MS).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for CandleServer {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
            self.requests.lock().unwrap().push(request.clone());
            let start: i64 = request.param("start").unwrap().parse().unwrap();
            let end: i64 = request.param("end").unwrap().parse().unwrap();
            let limit: usize = request.param("limit").unwrap().parse().unwrap();
            let list = self
                .timestamps
                .iter()
                .filter(|&&ts| ts >= start && ts < end)
                .take(limit)
                .map(|ts| json!([ts.to_string(), "1", "2", "0.5", "1.5", "10", "15"]))
                .collect();
            Ok(Page {
                list,
                next_page_cursor: None,
            })
        }
    }

    /// Replays a fixed script of responses, then empty pages.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Page, FetchError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Page, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Page, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::default()))
        }
    }

    /// Always answers with the same full page.
    struct StuckSource {
        page: Page,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl PageSource for StuckSource {
        async fn fetch_page(&self, _request: &PageRequest) -> Result<Page, FetchError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.page.clone())
        }
    }

    fn kline_descriptor(limit: u32) -> ResourceDescriptor {
        ResourceDescriptor::from_config(
            ResourceKind::HourlyKlines,
            &ResourceConfig {
                limit,
                slice_hours: None,
                interval: "60".to_string(),
            },
        )
        .unwrap()
    }

    fn funding_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::from_config(
            ResourceKind::FundingRate,
            &ResourceConfig {
                limit: 200,
                slice_hours: Some(8),
                interval: "8h".to_string(),
            },
        )
        .unwrap()
    }

    fn fetcher(source: Arc<dyn PageSource>) -> PagedFetcher {
        PagedFetcher::new(source, InstrumentConfig::default(), RetryPolicy::none())
    }

    fn candle_page(timestamps: &[i64]) -> Page {
        Page {
            list: timestamps
                .iter()
                .map(|ts| json!([ts.to_string(), "1", "2", "0.5", "1.5", "10", "15"]))
                .collect(),
            next_page_cursor: None,
        }
    }

    fn funding_page(timestamps: &[i64], cursor: Option<&str>) -> Page {
        Page {
            list: timestamps
                .iter()
                .map(|ts| json!({ "fundingRate": "0.0001", "fundingRateTimestamp": ts.to_string() }))
                .collect(),
            next_page_cursor: cursor.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_window_advance_pages_450_records() {
        let server = Arc::new(CandleServer::new(450));
        let window = TimeWindow::new(BASE_TS, BASE_TS + 1_000 * HOUR_MS).unwrap();

        let outcome = fetcher(server.clone())
            .fetch(&kline_descriptor(200), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.requests, 3);
        assert_eq!(server.request_count(), 3);
        assert_eq!(outcome.records.len(), 450);

        let normalized = SeriesNormalizer::for_resource(&kline_descriptor(200))
            .normalize::<Candle>(outcome.records.clone());
        assert_eq!(normalized.series.len(), 450);
        assert_eq!(normalized.stats.duplicates, 0);

        let requests = server.requests.lock().unwrap();
        let starts: Vec<&str> = requests.iter().map(|r| r.param("start").unwrap()).collect();
        assert_eq!(starts[0], BASE_TS.to_string());
        assert_eq!(starts[1], (BASE_TS + 199 * HOUR_MS + 1).to_string());
        assert_eq!(starts[2], (BASE_TS + 399 * HOUR_MS + 1).to_string());
    }

    #[tokio::test]
    async fn test_window_advance_empty_final_page_ends_fetch() {
        let server = Arc::new(CandleServer::new(400));
        let window = TimeWindow::new(BASE_TS, BASE_TS + 1_000 * HOUR_MS).unwrap();

        let outcome = fetcher(server.clone())
            .fetch(&kline_descriptor(200), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.requests, 3);
        assert_eq!(outcome.records.len(), 400);
    }

    #[tokio::test]
    async fn test_window_advance_stops_at_window_end() {
        // The newest record of a full page sits on the last millisecond of the window.
        let end = BASE_TS + 2 * HOUR_MS;
        let source = Arc::new(ScriptedSource::new(vec![Ok(candle_page(&[BASE_TS, end - 1]))]));
        let window = TimeWindow::new(BASE_TS, end).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&kline_descriptor(2), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_window_advance_handles_descending_pages() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(candle_page(&[BASE_TS + HOUR_MS, BASE_TS])),
            Ok(candle_page(&[BASE_TS + 2 * HOUR_MS])),
        ]));
        let window = TimeWindow::new(BASE_TS, BASE_TS + 10 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&kline_descriptor(2), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(source.calls(), 2);
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test]
    async fn test_stall_detected_on_first_backward_page() {
        let start = BASE_TS + 100 * HOUR_MS;
        let source = Arc::new(StuckSource {
            page: candle_page(&[BASE_TS, BASE_TS + HOUR_MS]),
            calls: Mutex::new(0),
        });
        let window = TimeWindow::new(start, start + 1_000 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&kline_descriptor(2), window, &mut Pacer::unpaced())
            .await;

        assert!(matches!(
            outcome.error,
            Some(FetchError::PaginationStalled { current_start, .. }) if current_start == start
        ));
        assert_eq!(*source.calls.lock().unwrap(), 1);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn test_stall_detected_within_one_extra_request() {
        // Newest record equals the window start: the first page nudges the
        // start by 1ms, the repeat of the same page is the stall.
        let start = BASE_TS + HOUR_MS;
        let source = Arc::new(StuckSource {
            page: candle_page(&[BASE_TS, start]),
            calls: Mutex::new(0),
        });
        let window = TimeWindow::new(start, start + 1_000 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&kline_descriptor(2), window, &mut Pacer::unpaced())
            .await;

        assert!(matches!(outcome.error, Some(FetchError::PaginationStalled { .. })));
        assert_eq!(*source.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cursor_pages_within_slices() {
        // Two 8h slices; the first needs two pages.
        let t0 = BASE_TS;
        let t8 = BASE_TS + 8 * HOUR_MS;
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(funding_page(&[t0], Some("c1"))),
            Ok(funding_page(&[t0 + HOUR_MS], None)),
            Ok(funding_page(&[t8], Some(""))),
        ]));
        let window = TimeWindow::new(t0, t0 + 16 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&funding_descriptor(), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.requests, 3);
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test]
    async fn test_cursor_strategy_carries_cursor_and_moves_slices() {
        let window = TimeWindow::new(0, 16 * HOUR_MS).unwrap();
        let mut strategy = CursorSlices::new(ResourceKind::FundingRate, window, 8 * HOUR_MS);

        let first = strategy.next_params().unwrap();
        assert_eq!(first.window, TimeWindow::new(0, 8 * HOUR_MS).unwrap());
        assert_eq!(first.cursor, None);

        strategy.advance(&funding_page(&[0], Some("c1"))).unwrap();
        assert_eq!(strategy.next_params().unwrap().cursor.as_deref(), Some("c1"));

        strategy.advance(&funding_page(&[], None)).unwrap();
        let second = strategy.next_params().unwrap();
        assert_eq!(second.window.start(), 8 * HOUR_MS);
        assert_eq!(second.cursor, None);

        strategy.advance(&funding_page(&[], None)).unwrap();
        assert!(strategy.next_params().is_none());
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_a_stall() {
        let source = Arc::new(StuckSource {
            page: funding_page(&[BASE_TS], Some("same")),
            calls: Mutex::new(0),
        });
        let window = TimeWindow::new(BASE_TS, BASE_TS + 8 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&funding_descriptor(), window, &mut Pacer::unpaced())
            .await;

        assert!(matches!(outcome.error, Some(FetchError::PaginationStalled { .. })));
        assert_eq!(*source.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_api_error_keeps_partial_records() {
        let t0 = BASE_TS;
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(funding_page(&[t0], None)),
            Err(FetchError::api(10006, "Too many visits")),
            Ok(funding_page(&[t0 + 16 * HOUR_MS], None)),
        ]));
        let window = TimeWindow::new(t0, t0 + 24 * HOUR_MS).unwrap();

        let outcome = fetcher(source.clone())
            .fetch(&funding_descriptor(), window, &mut Pacer::unpaced())
            .await;

        assert_eq!(outcome.error, Some(FetchError::api(10006, "Too many visits")));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(FetchError::transport("connection reset")),
            Err(FetchError::transport("connection reset")),
            Ok(candle_page(&[BASE_TS])),
        ]));
        let retry = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        let fetcher = PagedFetcher::new(source.clone(), InstrumentConfig::default(), retry);
        let window = TimeWindow::new(BASE_TS, BASE_TS + 10 * HOUR_MS).unwrap();

        let start = tokio::time::Instant::now();
        let outcome = fetcher
            .fetch(&kline_descriptor(200), window, &mut Pacer::unpaced())
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(source.calls(), 3);
        // 100ms + 200ms of backoff.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_become_fatal_after_retries() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(FetchError::transport("timeout")),
            Err(FetchError::transport("timeout")),
        ]));
        let retry = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(10),
        };
        let fetcher = PagedFetcher::new(source.clone(), InstrumentConfig::default(), retry);
        let window = TimeWindow::new(BASE_TS, BASE_TS + HOUR_MS).unwrap();

        let outcome = fetcher
            .fetch(&kline_descriptor(200), window, &mut Pacer::unpaced())
            .await;

        assert_eq!(
            outcome.error,
            Some(FetchError::Transport {
                attempts: 2,
                message: "timeout".to_string()
            })
        );
        assert_eq!(outcome.requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let server = Arc::new(CandleServer::new(450));
        let window = TimeWindow::new(BASE_TS, BASE_TS + 1_000 * HOUR_MS).unwrap();
        let mut pacer = Pacer::new(Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let outcome = fetcher(server)
            .fetch(&kline_descriptor(200), window, &mut pacer)
            .await;

        assert_eq!(outcome.requests, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_cancels_between_requests() {
        let server = Arc::new(CandleServer::new(450));
        let window = TimeWindow::new(BASE_TS, BASE_TS + 1_000 * HOUR_MS).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let fetcher = fetcher(server.clone());
        let descriptor = kline_descriptor(200);

        let task = tokio::spawn(async move {
            let mut pacer = Pacer::new(Duration::from_secs(10));
            fetcher
                .fetch_until_stopped(&descriptor, window, &mut pacer, stop_rx)
                .await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        stop_tx.send(true).unwrap();
        let outcome = task.await.unwrap();

        assert_eq!(outcome.error, Some(FetchError::Cancelled));
        assert_eq!(outcome.requests, 1);
        assert_eq!(outcome.records.len(), 200);
    }
}
