// Notifier plugin implementations
pub mod email;
pub mod sms;
pub mod webhook;

pub use email::EmailNotifier;
pub use sms::SmsNotifier;
pub use webhook::WebhookNotifier;
