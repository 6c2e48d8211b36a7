use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::models::InitialStockPolicy;

pub const DEFAULT_PRODUCT_URL_PREFIX: &str = "https://www.macys.com/shop/product/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub scraper: ScraperConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub item_delay_ms: u64,
    pub concurrency: usize,
    pub initial_stock_policy: InitialStockPolicy,
    pub url_prefix: String,
    pub verbose: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            item_delay_ms: 2000,
            concurrency: 1,
            initial_stock_policy: InitialStockPolicy::Notify,
            url_prefix: DEFAULT_PRODUCT_URL_PREFIX.to_string(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub selectors: SiteSelectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            selectors: SiteSelectors::default(),
        }
    }
}

/// CSS selectors describing where a product page keeps its stock signal and
/// metadata. The defaults target Macy's product pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteSelectors {
    pub out_of_stock: String,
    pub out_of_stock_text: String,
    pub add_to_bag: String,
    pub product_id: String,
    pub product_id_prefix: String,
    pub brand: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub rating: String,
    pub review_count: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            out_of_stock: "div.error-color, div.large".to_string(),
            out_of_stock_text: "sorry, this item is currently unavailable".to_string(),
            add_to_bag: r#"button[data-auto-id="add-to-bag"]"#.to_string(),
            product_id: "span.product-id".to_string(),
            product_id_prefix: "Web ID:".to_string(),
            brand: "h1.product-title label.subtitle-2".to_string(),
            name: "h1.product-title span.subtitle-1".to_string(),
            price: ".lowest-sale-price .price, .price-wrapper .price, [data-auto-id=\"product-price\"]".to_string(),
            description: "div.long-description".to_string(),
            rating: "span.rating-average".to_string(),
            review_count: "span.rating-description".to_string(),
        }
    }
}

impl SiteSelectors {
    fn all(&self) -> [(&'static str, &str); 9] {
        [
            ("out_of_stock", &self.out_of_stock),
            ("add_to_bag", &self.add_to_bag),
            ("product_id", &self.product_id),
            ("brand", &self.brand),
            ("name", &self.name),
            ("price", &self.price),
            ("description", &self.description),
            ("rating", &self.rating),
            ("review_count", &self.review_count),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Upper bound on a single channel delivery.
    pub timeout_secs: u64,
    pub smtp: SmtpConfig,
    pub sms: SmsConfig,
    pub webhook: WebhookConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            smtp: SmtpConfig::default(),
            sms: SmsConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Restock Watcher".to_string(),
            use_tls: true,
        }
    }
}

impl SmtpConfig {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Sender address, falling back to the login username.
    pub fn sender(&self) -> Option<&str> {
        self.from_address.as_deref().or(self.username.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: "https://api.twilio.com".to_string(),
        }
    }
}

impl SmsConfig {
    pub fn has_credentials(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub username: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: "Restock Watcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: Option<String>,
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interval_secs: Option<u64>,
    pub item_delay_ms: Option<u64>,
    pub webhook_url: Option<String>,
    pub verbose: bool,
}

impl AppConfig {
    /// Build the configuration from defaults, an optional TOML file and
    /// `RESTOCK__*` environment variables, in that order of precedence.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            // Local config (ignored by git)
            None => builder.add_source(File::with_name("restock").required(false)),
        };

        let s = builder
            .add_source(
                Environment::with_prefix("RESTOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_env_credentials();
        config.validate()?;
        Ok(config)
    }

    /// Layer command-line values on top of the loaded configuration and
    /// validate the result, so a bad flag is rejected like a bad file value.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(interval) = overrides.interval_secs {
            self.monitor.interval_secs = interval;
        }
        if let Some(delay) = overrides.item_delay_ms {
            self.monitor.item_delay_ms = delay;
        }
        if let Some(url) = &overrides.webhook_url {
            self.notifications.webhook.url = Some(url.clone());
        }
        self.monitor.verbose |= overrides.verbose;
        self.validate()
    }

    /// Fill missing credentials from the conventional variable names.
    fn apply_env_credentials(&mut self) {
        let smtp = &mut self.notifications.smtp;
        if smtp.username.is_none() {
            smtp.username = env::var("EMAIL_FROM").ok();
        }
        if smtp.password.is_none() {
            smtp.password = env::var("EMAIL_PASSWORD").ok();
        }

        let sms = &mut self.notifications.sms;
        if sms.account_sid.is_none() {
            sms.account_sid = env::var("TWILIO_ACCOUNT_SID").ok();
        }
        if sms.auth_token.is_none() {
            sms.auth_token = env::var("TWILIO_AUTH_TOKEN").ok();
        }
        if sms.from_number.is_none() {
            sms.from_number = env::var("TWILIO_FROM_NUMBER").ok();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate monitor configuration
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Message("Monitor interval_secs must be greater than 0".into()));
        }

        if self.monitor.concurrency == 0 {
            return Err(ConfigError::Message("Monitor concurrency must be greater than 0".into()));
        }

        if Url::parse(&self.monitor.url_prefix).is_err() {
            return Err(ConfigError::Message("Invalid monitor url_prefix format".into()));
        }

        // Validate scraper configuration
        if self.scraper.request_timeout_secs == 0 {
            return Err(ConfigError::Message("Scraper request_timeout_secs must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        for (field, selector) in self.scraper.selectors.all() {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!("Invalid CSS selector for {}: {}", field, selector)));
            }
        }

        // Validate notification configuration
        if self.notifications.timeout_secs == 0 {
            return Err(ConfigError::Message("Notifications timeout_secs must be greater than 0".into()));
        }

        if self.notifications.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if Url::parse(&self.notifications.sms.api_base).is_err() {
            return Err(ConfigError::Message("Invalid SMS api_base URL format".into()));
        }

        if let Some(webhook_url) = &self.notifications.webhook.url {
            if Url::parse(webhook_url).is_err() {
                return Err(ConfigError::Message("Invalid webhook URL format".into()));
            }
        }

        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.request_timeout_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notifications.timeout_secs)
    }
}
