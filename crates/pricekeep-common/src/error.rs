//! Error types shared across Pricekeep crates

use thiserror::Error;

use crate::money::PriceParseError;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while interpreting user-supplied price and date text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("Invalid price: {0}")]
    Price(#[from] PriceParseError),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    Date(String),
}
