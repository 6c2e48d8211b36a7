// Configuration and input validation as the binary uses them

use rstest::rstest;
use std::io::Write;
use std::time::Duration;

use restock_watcher::config::{AppConfig, DEFAULT_PRODUCT_URL_PREFIX};
use restock_watcher::core::MonitorSettings;
use restock_watcher::models::InitialStockPolicy;
use restock_watcher::utils::validate_urls;

#[test]
fn test_partition_against_custom_prefix() {
    let partition = validate_urls(
        ["https://site.com/product/1", "https://other.com/x"],
        "https://site.com/product/",
    );

    assert_eq!(partition.valid, vec!["https://site.com/product/1".to_string()]);
    assert_eq!(partition.invalid, vec!["https://other.com/x".to_string()]);
}

#[rstest]
#[case("https://www.macys.com/shop/product/levis-501-jeans?ID=2913385", true)]
#[case("https://www.macys.com/shop/featured/jeans", false)]
#[case("http://www.macys.com/shop/product/levis-501-jeans?ID=2913385", false)]
#[case("macys.com/shop/product/x", false)]
fn test_default_prefix_targets_product_pages(#[case] url: &str, #[case] valid: bool) {
    let partition = validate_urls([url], DEFAULT_PRODUCT_URL_PREFIX);
    assert_eq!(partition.has_valid(), valid);
    assert_eq!(partition.has_invalid(), !valid);
}

#[test]
fn test_partition_keeps_input_order() {
    let urls = vec![
        format!("{}c?ID=3", DEFAULT_PRODUCT_URL_PREFIX),
        "https://example.com/nope".to_string(),
        format!("{}a?ID=1", DEFAULT_PRODUCT_URL_PREFIX),
    ];

    let partition = validate_urls(&urls, DEFAULT_PRODUCT_URL_PREFIX);
    assert_eq!(partition.valid, vec![urls[0].clone(), urls[2].clone()]);
}

#[test]
fn test_monitor_settings_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[monitor]
interval_secs = 300
item_delay_ms = 750
concurrency = 3
initial_stock_policy = "skip"

[scraper]
request_timeout_secs = 8
"#
    )?;

    let config = AppConfig::load(Some(file.path()))?;
    let settings = MonitorSettings::from_config(&config);

    assert_eq!(settings.interval, Duration::from_secs(300));
    assert_eq!(settings.item_delay, Duration::from_millis(750));
    assert_eq!(settings.concurrency, 3);
    assert_eq!(settings.fetch_timeout, Duration::from_secs(8));
    assert_eq!(settings.initial_stock_policy, InitialStockPolicy::Skip);
    Ok(())
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = AppConfig::load(Some(std::path::Path::new("/nonexistent/restock.toml")));
    assert!(result.is_err());
}
