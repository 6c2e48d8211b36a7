use crate::config::SmsConfig;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SmsOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl SmsOptions {
    pub fn from_settings(sms: &SmsConfig, to_number: &str, timeout: Duration) -> Result<Self, String> {
        let account_sid = sms.account_sid.as_deref().ok_or("Missing Twilio account SID (set TWILIO_ACCOUNT_SID)")?;
        let auth_token = sms.auth_token.as_deref().ok_or("Missing Twilio auth token (set TWILIO_AUTH_TOKEN)")?;
        let from_number = sms.from_number.as_deref().ok_or("Missing sender number (set TWILIO_FROM_NUMBER)")?;

        Ok(SmsOptions {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
            to_number: to_number.trim().to_string(),
            api_base: sms.api_base.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

/// Sends text messages through Twilio's Messages API.
pub struct SmsNotifier {
    options: SmsOptions,
    client: Client,
}

impl SmsNotifier {
    pub fn new(options: SmsOptions) -> Result<Self, AppError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { options, client })
    }

    pub fn recipient(&self) -> &str {
        &self.options.to_number
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.options.api_base, self.options.account_sid
        )
    }

    fn format_message(event: &NotificationEvent) -> String {
        event.body()
    }
}

#[async_trait]
impl NotifierPlugin for SmsNotifier {
    fn name(&self) -> &str {
        "SMS Notifier"
    }

    fn plugin_type(&self) -> &str {
        "sms"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("To", self.options.to_number.clone());
        form_body.insert("From", self.options.from_number.clone());
        form_body.insert("Body", Self::format_message(event));

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::debug!("Twilio error ({}): {}", status, error_body);
            return Ok(NotificationResult::failed(format!("Twilio returned {}", status)));
        }

        let message: MessageResponse = response.json().await?;
        Ok(NotificationResult::delivered(message.sid))
    }
}
