use crate::config::SmtpConfig;
use crate::plugins::traits::{EventKind, NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub to_email: String,
    pub use_tls: bool,
    pub timeout: Duration,
}

impl EmailConfig {
    /// Combine the SMTP settings with a recipient; fails when login
    /// credentials are missing.
    pub fn from_settings(smtp: &SmtpConfig, to_email: &str, timeout: Duration) -> Result<Self, String> {
        let username = smtp.username.as_deref().ok_or("Missing SMTP username (set EMAIL_FROM)")?;
        let password = smtp.password.as_deref().ok_or("Missing SMTP password (set EMAIL_PASSWORD)")?;
        let from_email = smtp.sender().unwrap_or(username);

        if to_email.trim().is_empty() {
            return Err("Missing recipient email".to_string());
        }

        Ok(EmailConfig {
            smtp_server: smtp.host.clone(),
            smtp_port: smtp.port,
            username: username.to_string(),
            password: password.to_string(),
            from_email: from_email.to_string(),
            from_name: smtp.from_name.clone(),
            to_email: to_email.trim().to_string(),
            use_tls: smtp.use_tls,
            timeout,
        })
    }
}

pub struct EmailNotifier {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server).map_err(|e| {
                AppError::Plugin {
                    plugin_type: "email".to_string(),
                    message: format!("Invalid SMTP relay {}: {}", config.smtp_server, e),
                }
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .timeout(Some(config.timeout))
            .build();

        Ok(Self { config, mailer })
    }

    pub fn recipient(&self) -> &str {
        &self.config.to_email
    }

    fn build_message(&self, event: &NotificationEvent) -> Result<Message, AppError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = self
            .config
            .to_email
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(event.subject())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(event.body()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format_html_body(event)),
                    ),
            )?;

        Ok(email)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_html_body(event: &NotificationEvent) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body { font-family: Arial, sans-serif; margin: 20px; }
        .header { background: #e8f5e8; border-left: 4px solid #4CAF50; padding: 15px; }
        .details { margin: 15px 0; }
    </style>
</head>
<body>
"#,
    );

    match event.kind {
        EventKind::Test => {
            html.push_str(&format!(
                "    <div class=\"header\">{}</div>\n",
                escape_html(&event.body())
            ));
        }
        EventKind::InStock => {
            html.push_str(&format!(
                "    <div class=\"header\"><strong>{}</strong> is now in stock!</div>\n",
                escape_html(&event.product_name())
            ));
            html.push_str("    <div class=\"details\">\n");
            if let Some(product) = &event.product {
                if let Some(price) = &product.price {
                    html.push_str(&format!("        <strong>Price:</strong> {}<br>\n", escape_html(price)));
                }
                if let Some(id) = &product.product_id {
                    html.push_str(&format!("        <strong>Web ID:</strong> {}<br>\n", escape_html(id)));
                }
            }
            let url = escape_html(&event.url);
            html.push_str(&format!("        <a href=\"{}\">{}</a>\n", url, url));
            html.push_str("    </div>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let email = self.build_message(event)?;

        match self.mailer.send(email).await {
            Ok(_response) => Ok(NotificationResult::delivered(format!("email-{}", event.id))),
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}
