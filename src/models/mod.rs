use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod item;
pub mod product;

// Re-exports for convenience
pub use item::*;
pub use product::*;

/// Stock state of a monitored product page.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    Unknown,
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Unknown => "unknown",
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::Unknown => "Unknown",
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }

    pub fn is_in_stock(&self) -> bool {
        matches!(self, StockStatus::InStock)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do with an item that is already in stock the first time its
/// stock signal is read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialStockPolicy {
    /// Notify on the first in-stock reading, even at the first check.
    #[default]
    Notify,
    /// Only notify when an out-of-stock reading preceded the in-stock one.
    Skip,
}

pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
