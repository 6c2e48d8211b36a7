// Shared fixtures for the integration tests
// Pages are served by wiremock and read through the real HTTP fetcher and extractor

pub mod config_tests;
pub mod monitor_tests;
pub mod notification_tests;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restock_watcher::config::ScraperConfig;
use restock_watcher::core::{CycleReporter, ManualClock, MonitorSettings, StatusReport, StockMonitor};
use restock_watcher::extractor::SelectorExtractor;
use restock_watcher::models::InitialStockPolicy;
use restock_watcher::plugins::{DispatchSummary, NotificationEvent, NotificationSink};
use restock_watcher::scraper::HttpFetcher;

pub fn product_page(brand: &str, name: &str, price: &str, in_stock: bool) -> String {
    let availability = if in_stock {
        r#"<button data-auto-id="add-to-bag">Add To Bag</button>"#.to_string()
    } else {
        r#"<div class="error-color">Sorry, this item is currently unavailable.</div>"#.to_string()
    };

    format!(
        r#"<html>
<body>
    <h1 class="product-title">
        <label class="subtitle-2">{brand}</label>
        <span class="subtitle-1">{name}</span>
    </h1>
    <span class="product-id">Web ID: 1234567</span>
    <div class="lowest-sale-price"><span class="price">{price}</span></div>
    <div class="long-description">A test product.</div>
    <span class="rating-average">4.5</span>
    <span class="rating-description">(12)</span>
    {availability}
</body>
</html>"#
    )
}

/// Serve `body` at `route` for the next `times` requests. Earlier mounts win
/// while they still have requests left.
pub async fn serve(server: &MockServer, route: &str, status: u16, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Serve `body` at `route` for every remaining request.
pub async fn serve_always(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn urls(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.url.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify_in_stock(&self, event: &NotificationEvent) -> DispatchSummary {
        self.events.lock().unwrap().push(event.clone());
        DispatchSummary {
            attempted: 1,
            delivered: 1,
            failures: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<StatusReport>>,
}

impl CycleReporter for RecordingReporter {
    fn cycle_finished(&self, report: &StatusReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

pub fn test_settings() -> MonitorSettings {
    MonitorSettings {
        interval: Duration::from_secs(60),
        item_delay: Duration::from_millis(10),
        concurrency: 1,
        fetch_timeout: Duration::from_secs(5),
        notify_timeout: Duration::from_secs(5),
        initial_stock_policy: InitialStockPolicy::Notify,
    }
}

pub fn scraper_config() -> ScraperConfig {
    ScraperConfig {
        request_timeout_secs: 5,
        ..Default::default()
    }
}

pub struct Harness {
    pub monitor: StockMonitor,
    pub sink: Arc<RecordingSink>,
    pub reporter: Arc<RecordingReporter>,
    pub clock: Arc<ManualClock>,
}

/// A monitor wired to the real fetcher and extractor, a recording sink and a
/// manual clock.
pub fn harness(settings: MonitorSettings) -> Harness {
    let config = scraper_config();
    let fetcher = HttpFetcher::new(&config).expect("http client");
    let extractor = SelectorExtractor::new(&config.selectors).expect("default selectors");
    let sink = Arc::new(RecordingSink::default());
    let reporter = Arc::new(RecordingReporter::default());
    let clock = Arc::new(ManualClock::default());

    let monitor = StockMonitor::new(Arc::new(fetcher), Arc::new(extractor), sink.clone(), settings)
        .with_clock(clock.clone())
        .with_reporter(reporter.clone());

    Harness {
        monitor,
        sink,
        reporter,
        clock,
    }
}
