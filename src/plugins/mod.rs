pub mod traits;
pub mod manager;
pub mod notifiers;

pub use manager::{DispatchSummary, NotificationManager, NotificationSink};
pub use traits::{NotificationEvent, NotifierPlugin};
