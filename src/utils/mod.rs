pub mod error;
pub mod validation;

pub use error::{AppError, Result};
pub use validation::{UrlPartition, validate_urls};
