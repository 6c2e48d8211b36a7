use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;

use crate::config::ScraperConfig;
use crate::utils::error::AppError;

/// Why a page could not be retrieved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Worth trying again next cycle: timeouts, connection errors, 5xx, 429.
    #[error("transient fetch failure: {0}")]
    Transient(String),
    /// Will not get better on its own: bad URL, 404 and other 4xx.
    #[error("permanent fetch failure: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            FetchError::Transient(message) | FetchError::Permanent(message) => message,
        }
    }

    fn from_status(status: StatusCode) -> Self {
        let message = format!("HTTP {}", status);
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
            FetchError::Transient(message)
        } else {
            FetchError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::Permanent(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status)
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

/// Retrieves raw page markup for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP fetcher sharing one browser-like session across requests.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        let language = header::HeaderValue::from_str(&config.accept_language)
            .map_err(|e| AppError::Validation(format!("Invalid accept_language header: {}", e)))?;
        headers.insert(header::ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FetchError::Permanent(format!("Invalid URL '{}': {}", url, e)))?;

        let start_time = std::time::Instant::now();
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Fetch of {} returned {}", url, status);
            return Err(FetchError::from_status(status));
        }

        let body = response.text().await?;
        tracing::debug!(
            "Fetched {} ({} bytes) in {}ms",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}
