// Notification channels wired through the dispatcher and the monitor

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restock_watcher::core::{ManualClock, RunOutcome, StockMonitor};
use restock_watcher::extractor::SelectorExtractor;
use restock_watcher::plugins::notifiers::sms::SmsOptions;
use restock_watcher::plugins::notifiers::webhook::WebhookOptions;
use restock_watcher::plugins::notifiers::{SmsNotifier, WebhookNotifier};
use restock_watcher::plugins::{NotificationManager, NotificationSink};
use restock_watcher::scraper::HttpFetcher;

use super::*;

fn webhook(server: &MockServer) -> WebhookNotifier {
    webhook_with_timeout(server, Duration::from_secs(5))
}

fn webhook_with_timeout(server: &MockServer, timeout: Duration) -> WebhookNotifier {
    WebhookNotifier::new(WebhookOptions {
        webhook_url: format!("{}/webhook", server.uri()),
        username: Some("Restock Watcher".to_string()),
        timeout,
    })
    .unwrap()
}

fn sms(server: &MockServer) -> SmsNotifier {
    SmsNotifier::new(SmsOptions {
        account_sid: "AC42".to_string(),
        auth_token: "token".to_string(),
        from_number: "+15550001111".to_string(),
        to_number: "+15552223333".to_string(),
        api_base: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_test_reaches_every_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_string_contains("Test Notification"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC42/Messages.json"))
        .and(body_string_contains("test+notification"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sid": "SM1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager = NotificationManager::new();
    manager.register(Box::new(webhook(&server)));
    manager.register(Box::new(sms(&server)));

    let summary = manager.send_test().await;
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.delivered, 2);
    assert!(summary.all_delivered());
}

#[tokio::test]
async fn test_failing_channel_is_reported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC42/Messages.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let mut manager = NotificationManager::new();
    manager.register(Box::new(webhook(&server)));
    manager.register(Box::new(sms(&server)));

    let event = restock_watcher::plugins::NotificationEvent::in_stock(
        "https://www.macys.com/shop/product/x?ID=1",
        None,
        chrono::Utc::now(),
    );
    let summary = manager.notify_in_stock(&event).await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "sms");
}

#[tokio::test]
async fn test_monitor_alerts_through_webhook() {
    let server = MockServer::start().await;
    serve_always(&server, "/shop/product/coat", 200, &product_page("Cole Haan", "Parka", "$210.00", true)).await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_string_contains("Cole Haan Parka"))
        .and(body_string_contains("/shop/product/coat"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager = NotificationManager::new();
    manager.register(Box::new(webhook(&server)));

    let config = scraper_config();
    let mut monitor = StockMonitor::new(
        Arc::new(HttpFetcher::new(&config).unwrap()),
        Arc::new(SelectorExtractor::new(&config.selectors).unwrap()),
        Arc::new(manager),
        test_settings(),
    )
    .with_clock(Arc::new(ManualClock::default()));

    let summary = monitor
        .run([format!("{}/shop/product/coat", server.uri())])
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.notifications, 1);
}

#[tokio::test]
async fn test_no_channels_means_silent_run() {
    let server = MockServer::start().await;
    serve_always(&server, "/shop/product/socks", 200, &product_page("B", "Socks", "$9.00", true)).await;

    let config = scraper_config();
    let mut monitor = StockMonitor::new(
        Arc::new(HttpFetcher::new(&config).unwrap()),
        Arc::new(SelectorExtractor::new(&config.selectors).unwrap()),
        Arc::new(NotificationManager::new()),
        test_settings(),
    )
    .with_clock(Arc::new(ManualClock::default()));

    let summary = monitor
        .run([format!("{}/shop/product/socks", server.uri())])
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert!(monitor.active_urls().is_empty());
}

#[tokio::test]
async fn test_unresponsive_webhook_does_not_block_monitoring() {
    let server = MockServer::start().await;
    serve_always(&server, "/shop/product/gloves", 200, &product_page("UGG", "Gloves", "$60.00", true)).await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(3600)))
        .mount(&server)
        .await;

    let mut manager = NotificationManager::new();
    manager.register(Box::new(webhook_with_timeout(&server, Duration::from_millis(300))));

    let config = scraper_config();
    let mut monitor = StockMonitor::new(
        Arc::new(HttpFetcher::new(&config).unwrap()),
        Arc::new(SelectorExtractor::new(&config.selectors).unwrap()),
        Arc::new(manager),
        test_settings(),
    )
    .with_clock(Arc::new(ManualClock::default()));

    let url = format!("{}/shop/product/gloves", server.uri());
    let summary = tokio::time::timeout(Duration::from_secs(20), monitor.run([url]))
        .await
        .expect("monitoring should finish while the webhook hangs");

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.cycles, 1);
    assert!(monitor.active_urls().is_empty());
}
