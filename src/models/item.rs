use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StockStatus;

/// A URL under watch and what the monitor has learned about it so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoredItem {
    pub url: String,
    pub status: StockStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub checks: u32,
    pub failures: u32,
    pub seen_out_of_stock: bool,
    pub notified: bool,
}

impl MonitoredItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: StockStatus::Unknown,
            last_checked: None,
            last_success: None,
            checks: 0,
            failures: 0,
            seen_out_of_stock: false,
            notified: false,
        }
    }

    /// Record the outcome of one check attempt.
    ///
    /// `fetched` is false when the page could not be retrieved; the status is
    /// then `Unknown` for this cycle.
    pub fn record_check(&mut self, status: StockStatus, fetched: bool, at: DateTime<Utc>) {
        self.status = status;
        self.checks += 1;
        self.last_checked = Some(at);

        if fetched {
            self.last_success = Some(at);
        } else {
            self.failures += 1;
        }

        if status == StockStatus::OutOfStock {
            self.seen_out_of_stock = true;
        }
    }

    /// Whether an in-stock reading now would be the first determinate
    /// reading for this item.
    pub fn is_first_determinate_reading(&self) -> bool {
        !self.seen_out_of_stock
    }
}
