//! Error types for calendar providers

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for calendar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Calendar provider errors
#[derive(Error, Debug)]
pub enum Error {
    /// Market code is not known to the provider
    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    /// Provider has no calendar data for the requested date
    #[error("No calendar coverage for {market} on {date}")]
    OutOfCoverage {
        /// Market code
        market: String,
        /// Requested date
        date: NaiveDate,
    },

    /// Calendar data failed validation
    #[error("Invalid calendar data: {0}")]
    InvalidData(String),

    /// Calendar file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
