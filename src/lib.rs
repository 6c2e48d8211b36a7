pub mod config;
pub mod core;
pub mod extractor;
pub mod models;
pub mod plugins;
pub mod printer;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use core::{StatusReport, StockMonitor};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
