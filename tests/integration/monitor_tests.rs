// Full check cycles against pages served over HTTP

use std::time::Duration;
use wiremock::MockServer;

use restock_watcher::core::{MetadataSource, RunOutcome};
use restock_watcher::models::{InitialStockPolicy, StockStatus};

use super::*;

#[tokio::test]
async fn test_restock_is_detected_and_notified_once() {
    let server = MockServer::start().await;
    let out_page = product_page("Levi's", "501 Original Jeans", "$59.50", false);
    let in_page = product_page("Levi's", "501 Original Jeans", "$49.99", true);
    serve(&server, "/shop/product/jeans", 200, &out_page, 2).await;
    serve_always(&server, "/shop/product/jeans", 200, &in_page).await;

    let url = format!("{}/shop/product/jeans", server.uri());
    let mut h = harness(test_settings());
    let summary = h.monitor.run([url.clone()]).await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.cycles, 3);
    assert_eq!(h.sink.urls(), vec![url.clone()]);
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(60); 2]);

    let events = h.sink.events.lock().unwrap();
    let product = events[0].product.as_ref().expect("metadata");
    assert_eq!(product.brand.as_deref(), Some("Levi's"));
    assert_eq!(product.product_id.as_deref(), Some("1234567"));
    assert_eq!(product.price.as_deref(), Some("$49.99"));

    let reports = h.reporter.reports.lock().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].rows[0].status, StockStatus::OutOfStock);
    assert!(reports[2].complete);
    assert!(reports[2].rows[0].notified);
}

#[tokio::test]
async fn test_server_errors_fall_back_to_cached_metadata() {
    let server = MockServer::start().await;
    let out_page = product_page("Nike", "Air Max 90", "$130.00", false);
    serve(&server, "/shop/product/shoes", 200, &out_page, 1).await;
    serve(&server, "/shop/product/shoes", 503, "busy", 1).await;
    serve_always(&server, "/shop/product/shoes", 200, &product_page("Nike", "Air Max 90", "$130.00", true)).await;

    let url = format!("{}/shop/product/shoes", server.uri());
    let mut h = harness(test_settings());
    h.monitor.track([url.clone()]);

    let first = h.monitor.run_cycle().await;
    let cached = h.monitor.cache().get(&url).cloned().expect("cached after first check");

    let second = h.monitor.run_cycle().await;
    assert_eq!(second.rows[0].status, StockStatus::Unknown);
    assert_eq!(second.rows[0].source, MetadataSource::Cached);
    assert_eq!(second.rows[0].name(), "Air Max 90");
    assert_eq!(second.rows[0].last_checked, first.rows[0].last_checked);
    assert_eq!(h.monitor.cache().get(&url), Some(&cached));
    assert!(h.sink.urls().is_empty());

    let third = h.monitor.run_cycle().await;
    assert!(third.complete);
    assert_eq!(h.sink.urls(), vec![url]);
}

#[tokio::test]
async fn test_one_broken_url_does_not_stop_the_others() {
    let server = MockServer::start().await;
    serve_always(&server, "/shop/product/a", 200, &product_page("A", "Alpha", "$1.00", true)).await;
    serve_always(&server, "/shop/product/b", 404, "gone").await;
    serve_always(&server, "/shop/product/c", 200, &product_page("C", "Gamma", "$3.00", false)).await;

    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|name| format!("{}/shop/product/{}", server.uri(), name))
        .collect();

    let mut h = harness(test_settings());
    h.monitor.track(&urls);
    let report = h.monitor.run_cycle().await;

    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.rows[0].status, StockStatus::InStock);
    assert_eq!(report.rows[1].status, StockStatus::Unknown);
    assert_eq!(report.rows[1].source, MetadataSource::Missing);
    assert_eq!(report.rows[1].identifier(), "N/A");
    assert_eq!(report.rows[2].status, StockStatus::OutOfStock);
    assert_eq!(report.remaining, 2);
    assert_eq!(h.monitor.active_urls(), &[urls[1].clone(), urls[2].clone()]);

    // Courtesy delay between the three sequential checks
    assert_eq!(h.clock.sleeps(), vec![Duration::from_millis(10); 2]);
}

#[tokio::test]
async fn test_page_without_stock_signal_is_unknown() {
    let server = MockServer::start().await;
    serve_always(
        &server,
        "/shop/product/lamp",
        200,
        r#"<html><body><h1 class="product-title"><span class="subtitle-1">Desk Lamp</span></h1></body></html>"#,
    )
    .await;

    let url = format!("{}/shop/product/lamp", server.uri());
    let mut h = harness(test_settings());
    h.monitor.track([url.clone()]);
    let report = h.monitor.run_cycle().await;

    assert_eq!(report.rows[0].status, StockStatus::Unknown);
    assert_eq!(report.rows[0].source, MetadataSource::Live);
    assert_eq!(report.rows[0].name(), "Desk Lamp");
    assert!(!report.complete);
}

#[tokio::test]
async fn test_skip_policy_with_initially_available_item() {
    let server = MockServer::start().await;
    serve_always(&server, "/shop/product/hat", 200, &product_page("K", "Beanie", "$20.00", true)).await;

    let url = format!("{}/shop/product/hat", server.uri());
    let mut settings = test_settings();
    settings.initial_stock_policy = InitialStockPolicy::Skip;

    let mut h = harness(settings);
    let summary = h.monitor.run([url]).await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.notifications, 0);
    assert!(h.sink.urls().is_empty());
}

#[tokio::test]
async fn test_concurrent_checks_report_in_input_order() {
    let server = MockServer::start().await;
    for (index, name) in ["one", "two", "three", "four"].iter().enumerate() {
        let page = product_page("Brand", name, "$5.00", index % 2 == 0);
        serve_always(&server, &format!("/shop/product/{}", name), 200, &page).await;
    }

    let urls: Vec<String> = ["one", "two", "three", "four"]
        .iter()
        .map(|name| format!("{}/shop/product/{}", server.uri(), name))
        .collect();

    let mut settings = test_settings();
    settings.concurrency = 4;
    let mut h = harness(settings);
    h.monitor.track(&urls);
    let report = h.monitor.run_cycle().await;

    let names: Vec<&str> = report.rows.iter().map(|row| row.name()).collect();
    assert_eq!(names, vec!["one", "two", "three", "four"]);
    assert_eq!(h.sink.urls(), vec![urls[0].clone(), urls[2].clone()]);
    assert!(h.clock.sleeps().is_empty());
}
