use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use restock_watcher::config::{AppConfig, ConfigOverrides};
use restock_watcher::core::{MonitorSettings, RunOutcome, StockMonitor};
use restock_watcher::extractor::SelectorExtractor;
use restock_watcher::plugins::notifiers::email::EmailConfig;
use restock_watcher::plugins::notifiers::sms::SmsOptions;
use restock_watcher::plugins::notifiers::webhook::WebhookOptions;
use restock_watcher::plugins::notifiers::{EmailNotifier, SmsNotifier, WebhookNotifier};
use restock_watcher::plugins::NotificationManager;
use restock_watcher::printer::ConsolePrinter;
use restock_watcher::scraper::HttpFetcher;
use restock_watcher::utils::validation::{is_valid_email, is_valid_phone_number};
use restock_watcher::utils::validate_urls;

#[derive(Parser, Debug)]
#[command(name = "restock-watcher", version, about = "Watch product pages and get notified when they are back in stock")]
struct Cli {
    /// Product page URLs to watch
    urls: Vec<String>,

    /// Seconds between checks
    #[arg(short, long)]
    interval: Option<u64>,

    /// Show full product details and untruncated tables
    #[arg(short, long)]
    verbose: bool,

    /// Send a test notification through every configured channel and exit
    #[arg(short, long)]
    test: bool,

    /// Email address to notify
    #[arg(long)]
    email_to: Option<String>,

    /// Phone number to text, in E.164 format
    #[arg(long)]
    phone_to: Option<String>,

    /// Discord-compatible webhook URL to post to
    #[arg(long)]
    webhook_url: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Continue without asking when some URLs are invalid
    #[arg(short, long)]
    yes: bool,

    /// Keep invalid URLs in the watch list instead of dropping them
    #[arg(long)]
    include_invalid: bool,

    /// Milliseconds to wait between item checks
    #[arg(long)]
    item_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let printer = ConsolePrinter::new(cli.verbose, cli.yes);

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            printer.print_error(&format!("Invalid configuration: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };
    if let Err(e) = config.apply_overrides(&cli.overrides()) {
        printer.print_error(&format!("Invalid configuration: {}", e));
        return Ok(ExitCode::FAILURE);
    }
    let printer = ConsolePrinter::new(config.monitor.verbose, cli.yes);

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = init_tracing(config.monitor.verbose, config.logging.file.as_deref())?;
    info!("Starting Restock Watcher...");

    let notifications = build_notifications(&cli, &config, &printer);

    if cli.test {
        return Ok(run_notification_test(&notifications, &printer).await);
    }

    if cli.urls.is_empty() {
        printer.print_error("No URLs provided");
        print_usage(&printer);
        return Ok(ExitCode::FAILURE);
    }

    let partition = validate_urls(&cli.urls, &config.monitor.url_prefix);
    if !partition.has_valid() {
        printer.print_warning("No valid URLs were supplied");
        printer.print_info(&format!("Please use URLs that start with {}", config.monitor.url_prefix));
        print_usage(&printer);
        printer.print_error("Exiting...");
        return Ok(ExitCode::FAILURE);
    }

    let mut urls = partition.valid.clone();
    if partition.has_invalid() {
        printer.print_error("Invalid URLs were found:");
        for url in &partition.invalid {
            println!("{}", url);
        }
        if !printer.confirm("Would you like to proceed?", true)? {
            return Ok(ExitCode::FAILURE);
        }
        if cli.include_invalid {
            urls.extend(partition.invalid.iter().cloned());
        }
    }

    printer.print_info("Watching:");
    for url in &urls {
        println!("{}", url);
    }

    let fetcher = HttpFetcher::new(&config.scraper).context("Failed to build HTTP client")?;
    let extractor = SelectorExtractor::new(&config.scraper.selectors).context("Failed to compile selectors")?;

    let mut monitor = StockMonitor::new(
        Arc::new(fetcher),
        Arc::new(extractor),
        Arc::new(notifications),
        MonitorSettings::from_config(&config),
    )
    .with_reporter(Arc::new(printer.clone()));

    let summary = monitor
        .run_until(urls, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    if summary.outcome == RunOutcome::Interrupted {
        info!("Interrupted with {} item(s) still out of stock", monitor.active_urls().len());
    }
    info!("Shutting down...");
    Ok(ExitCode::SUCCESS)
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval_secs: self.interval,
            item_delay_ms: self.item_delay_ms,
            webhook_url: self.webhook_url.clone(),
            verbose: self.verbose,
        }
    }
}

fn init_tracing(verbose: bool, file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let default_directive = if verbose { "restock_watcher=debug" } else { "restock_watcher=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    match file {
        Some(file) => {
            let path = Path::new(file);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().context("logging.file must name a file")?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// Register every channel the operator asked for. A channel that cannot be
/// set up is reported and left out.
fn build_notifications(cli: &Cli, config: &AppConfig, printer: &ConsolePrinter) -> NotificationManager {
    let mut manager = NotificationManager::new();
    let settings = &config.notifications;
    let timeout = config.notification_timeout();

    if let Some(email_to) = &cli.email_to {
        let notifier = if !is_valid_email(email_to) {
            Err(format!("'{}' is not a valid email address", email_to))
        } else {
            EmailConfig::from_settings(&settings.smtp, email_to, timeout)
                .and_then(|email| EmailNotifier::new(email).map_err(|e| e.to_string()))
        };
        match notifier {
            Ok(notifier) => {
                printer.print_info(&format!("Email notifications will be sent to {}", notifier.recipient()));
                manager.register(Box::new(notifier));
            }
            Err(e) => printer.print_warning(&format!("Email notifications disabled: {}", e)),
        }
    }

    if let Some(phone_to) = &cli.phone_to {
        let notifier = if !is_valid_phone_number(phone_to) {
            Err(format!("'{}' is not an E.164 phone number", phone_to))
        } else {
            SmsOptions::from_settings(&settings.sms, phone_to, timeout)
                .and_then(|options| SmsNotifier::new(options).map_err(|e| e.to_string()))
        };
        match notifier {
            Ok(notifier) => {
                printer.print_info(&format!("SMS notifications will be sent to {}", notifier.recipient()));
                manager.register(Box::new(notifier));
            }
            Err(e) => printer.print_warning(&format!("SMS notifications disabled: {}", e)),
        }
    }

    if settings.webhook.url.is_some() {
        let notifier = WebhookOptions::from_settings(&settings.webhook, timeout)
            .and_then(|options| WebhookNotifier::new(options).map_err(|e| e.to_string()));
        match notifier {
            Ok(notifier) => {
                printer.print_info("Webhook notifications enabled");
                manager.register(Box::new(notifier));
            }
            Err(e) => printer.print_warning(&format!("Webhook notifications disabled: {}", e)),
        }
    }

    manager
}

async fn run_notification_test(notifications: &NotificationManager, printer: &ConsolePrinter) -> ExitCode {
    if notifications.is_empty() {
        printer.print_error("No notification channels configured");
        printer.print_info("Pass --email-to, --phone-to or --webhook-url to choose where alerts go");
        return ExitCode::FAILURE;
    }

    printer.print_info("Running notification test...");
    let summary = notifications.send_test().await;

    for channel in notifications.channel_types() {
        match summary.failures.iter().find(|(failed, _)| *failed == channel) {
            Some((_, error)) => printer.print_error(&format!("{} test failed: {}", channel, error)),
            None => printer.print_success(&format!("{} test sent", channel)),
        }
    }

    if summary.all_delivered() {
        printer.print_success("All notification tests completed successfully!");
        ExitCode::SUCCESS
    } else {
        printer.print_error("Some notification tests failed");
        ExitCode::FAILURE
    }
}

fn print_usage(printer: &ConsolePrinter) {
    printer.print_info("Example usage:");
    printer.print_info(
        "restock-watcher \"url1\" \"url2\" -i 60 -v --email-to recipient@email.com --phone-to \"+1234567890\"",
    );
    printer.print_info("To test notifications: restock-watcher -t --email-to recipient@email.com --phone-to \"+1234567890\"");
}
