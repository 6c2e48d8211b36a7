use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::cache::MetadataCache;
use super::clock::{Clock, SystemClock};
use super::report::{MetadataSource, ReportRow, StatusReport};
use crate::config::AppConfig;
use crate::extractor::{Extraction, ProductExtractor};
use crate::models::{InitialStockPolicy, MonitoredItem, StockStatus};
use crate::plugins::{DispatchSummary, NotificationEvent, NotificationSink};
use crate::scraper::{FetchError, PageFetcher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    /// Pause between consecutive batches of checks within a cycle.
    pub item_delay: Duration,
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    /// Upper bound on handing one event to every channel.
    pub notify_timeout: Duration,
    pub initial_stock_policy: InitialStockPolicy,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            item_delay: Duration::from_millis(2000),
            concurrency: 1,
            fetch_timeout: Duration::from_secs(15),
            notify_timeout: Duration::from_secs(30),
            initial_stock_policy: InitialStockPolicy::Notify,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.check_interval(),
            item_delay: Duration::from_millis(config.monitor.item_delay_ms),
            concurrency: config.monitor.concurrency.max(1),
            fetch_timeout: config.request_timeout(),
            // Channels time out on their own; leave them room to report why.
            notify_timeout: config.notification_timeout() + Duration::from_secs(5),
            initial_stock_policy: config.monitor.initial_stock_policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every watched URL came back in stock.
    Completed,
    /// The shutdown signal fired first.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub cycles: u32,
    pub notifications: usize,
}

/// Receives progress while the monitor runs. Every hook defaults to doing
/// nothing.
pub trait CycleReporter: Send + Sync {
    fn cycle_started(&self, _cycle: u32, _active: usize) {}

    /// Called once per row, in input order, after the whole cycle is checked.
    fn item_checked(&self, _position: usize, _total: usize, _row: &ReportRow) {}

    fn cycle_finished(&self, _report: &StatusReport) {}

    fn waiting(&self, _interval: Duration) {}

    fn finished(&self, _summary: &RunSummary) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl CycleReporter for NullReporter {}

type CheckResult = (String, Result<Extraction, FetchError>);

/// Drives check cycles over a shrinking set of product URLs until every one
/// of them has been seen in stock.
pub struct StockMonitor {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ProductExtractor>,
    notifier: Arc<dyn NotificationSink>,
    reporter: Arc<dyn CycleReporter>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
    items: HashMap<String, MonitoredItem>,
    active: Vec<String>,
    cache: MetadataCache,
    cycle: u32,
    notifications: usize,
}

impl StockMonitor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ProductExtractor>,
        notifier: Arc<dyn NotificationSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            notifier,
            reporter: Arc::new(NullReporter),
            clock: Arc::new(SystemClock),
            settings,
            items: HashMap::new(),
            active: Vec::new(),
            cache: MetadataCache::new(),
            cycle: 0,
            notifications: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// URLs still being checked, in input order.
    pub fn active_urls(&self) -> &[String] {
        &self.active
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn item(&self, url: &str) -> Option<&MonitoredItem> {
        self.items.get(url)
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Add URLs to the active set. Blank entries and repeats are ignored, and
    /// URLs that already left the set do not come back.
    pub fn track<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() || self.items.contains_key(url) {
                continue;
            }
            self.items.insert(url.to_string(), MonitoredItem::new(url));
            self.active.push(url.to_string());
        }
        metrics::gauge!("restock_active_items").set(self.active.len() as f64);
    }

    pub async fn run<I, S>(&mut self, urls: I) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_until(urls, std::future::pending::<()>()).await
    }

    /// Run cycles until the active set is empty or `shutdown` resolves,
    /// whichever comes first. Shutdown is honoured mid-cycle and mid-sleep.
    pub async fn run_until<I, S, F>(&mut self, urls: I, shutdown: F) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Future<Output = ()>,
    {
        self.track(urls);
        tokio::pin!(shutdown);

        let outcome = loop {
            let report = tokio::select! {
                report = self.run_cycle() => report,
                _ = &mut shutdown => break RunOutcome::Interrupted,
            };

            if report.complete {
                break RunOutcome::Completed;
            }

            let interval = self.settings.interval;
            tracing::debug!("Waiting {}s before next check", interval.as_secs());
            self.reporter.waiting(interval);

            tokio::select! {
                _ = self.clock.sleep(interval) => {}
                _ = &mut shutdown => break RunOutcome::Interrupted,
            }
        };

        let summary = RunSummary {
            outcome,
            cycles: self.cycle,
            notifications: self.notifications,
        };

        match outcome {
            RunOutcome::Completed => tracing::info!(
                "All items in stock after {} check(s), {} notification(s) sent",
                summary.cycles,
                summary.notifications
            ),
            RunOutcome::Interrupted => tracing::info!(
                "Monitoring stopped after {} check(s), {} item(s) still out of stock",
                summary.cycles,
                self.active.len()
            ),
        }

        self.reporter.finished(&summary);
        summary
    }

    /// Check every active URL once, then prune the ones found in stock.
    pub async fn run_cycle(&mut self) -> StatusReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let urls = self.active.clone();

        tracing::info!("Check #{}: {} item(s) to check", cycle, urls.len());
        self.reporter.cycle_started(cycle, urls.len());

        let results = self.check_all(&urls).await;

        // All checks are in; only now is any state touched.
        let total = results.len();
        let mut rows = Vec::with_capacity(total);
        let mut restocked = Vec::new();
        for (index, (url, result)) in results.into_iter().enumerate() {
            let row = self.apply_check(&url, result).await;
            self.reporter.item_checked(index + 1, total, &row);
            if row.status.is_in_stock() {
                restocked.push(url);
            }
            rows.push(row);
        }

        self.active.retain(|url| !restocked.contains(url));
        metrics::gauge!("restock_active_items").set(self.active.len() as f64);

        let report = StatusReport {
            cycle,
            generated_at: self.clock.now(),
            rows,
            remaining: self.active.len(),
            complete: self.active.is_empty(),
        };

        tracing::info!("{}", report.summary());
        self.reporter.cycle_finished(&report);
        report
    }

    async fn check_all(&self, urls: &[String]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(urls.len());

        for (index, chunk) in urls.chunks(self.settings.concurrency.max(1)).enumerate() {
            if index > 0 && !self.settings.item_delay.is_zero() {
                self.clock.sleep(self.settings.item_delay).await;
            }
            let checks = chunk.iter().map(|url| self.check_url(url));
            results.extend(join_all(checks).await);
        }

        results
    }

    async fn check_url(&self, url: &str) -> CheckResult {
        let timeout = self.settings.fetch_timeout;
        let fetched = match tokio::time::timeout(timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Transient(format!(
                "no response within {}s",
                timeout.as_secs_f32()
            ))),
        };

        let result = fetched.map(|html| self.extractor.extract(&html));
        (url.to_string(), result)
    }

    async fn apply_check(&mut self, url: &str, result: Result<Extraction, FetchError>) -> ReportRow {
        let now = self.clock.now();

        let (status, fetched, source, error) = match result {
            Ok(extraction) => {
                let source = if self.cache.merge(url, &extraction.product, now) {
                    MetadataSource::Live
                } else {
                    self.fallback_source(url)
                };
                if extraction.stock.is_none() {
                    tracing::warn!("Could not determine stock status for {}", url);
                }
                (extraction.status(), true, source, None)
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!("Fetch failed for {}: {}", url, err.message());
                } else {
                    tracing::error!("Fetch failed for {}: {}", url, err.message());
                }
                metrics::counter!("restock_fetch_failures_total").increment(1);
                (StockStatus::Unknown, false, self.fallback_source(url), Some(err.to_string()))
            }
        };

        metrics::counter!("restock_checks_total", "status" => status.as_str()).increment(1);

        let item = self
            .items
            .entry(url.to_string())
            .or_insert_with(|| MonitoredItem::new(url));
        let first_reading = item.is_first_determinate_reading();
        let already_notified = item.notified;
        item.record_check(status, fetched, now);
        let last_success = item.last_success;

        let mut notified = false;
        if status.is_in_stock() && !already_notified {
            if first_reading && self.settings.initial_stock_policy == InitialStockPolicy::Skip {
                tracing::info!("{} was already in stock at its first check, not notifying", url);
            } else {
                self.notify(url, now).await;
                notified = true;
            }
        }

        ReportRow {
            url: url.to_string(),
            status,
            product: self.cache.product(url).cloned(),
            source,
            last_checked: last_success,
            error,
            notified,
        }
    }

    async fn notify(&mut self, url: &str, at: chrono::DateTime<chrono::Utc>) {
        let event = NotificationEvent::in_stock(url, self.cache.product(url).cloned(), at);
        tracing::info!("{} is in stock, sending notifications", event.product_name());

        let summary = match tokio::time::timeout(self.settings.notify_timeout, self.notifier.notify_in_stock(&event)).await {
            Ok(summary) => summary,
            Err(_) => {
                tracing::warn!("Notifications for {} timed out after {:?}", url, self.settings.notify_timeout);
                DispatchSummary::default()
            }
        };
        for (channel, error) in &summary.failures {
            tracing::warn!("{} notification for {} not delivered: {}", channel, url, error);
        }

        // Delivery failures do not keep the item around.
        if let Some(item) = self.items.get_mut(url) {
            item.notified = true;
        }
        self.notifications += 1;
    }

    fn fallback_source(&self, url: &str) -> MetadataSource {
        if self.cache.contains(url) {
            MetadataSource::Cached
        } else {
            MetadataSource::Missing
        }
    }
}
