//! Error types for settlement checks

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
///
/// Configuration and data errors are surfaced to the caller as-is;
/// `NoCutOffDefined` is recovered inside the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Market code not recognised
    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    /// Market timezone identifier not recognised
    #[error("Invalid timezone '{timezone}' for market {market}")]
    InvalidTimezone {
        /// Market code
        market: String,
        /// Timezone identifier
        timezone: String,
    },

    /// Instrument type has no configured profile
    #[error("Unknown instrument type: {0}")]
    UnknownInstrumentType(String),

    /// Trade date is not a common business day (strict mode only)
    #[error("Invalid trade date {date}: {reason}")]
    InvalidTradeDate {
        /// Requested trade date
        date: NaiveDate,
        /// Closure details per market
        reason: String,
    },

    /// No qualifying day within the search horizon
    #[error("No business day found for {markets} within {horizon_days} days of {from}")]
    NoBusinessDayFound {
        /// Market codes searched
        markets: String,
        /// Search start
        from: NaiveDate,
        /// Horizon in calendar days
        horizon_days: u32,
    },

    /// Market has no such cut-off on the date
    #[error("No {cut_off} cut-off defined for {market} on {date}")]
    NoCutOffDefined {
        /// Market code
        market: String,
        /// Cut-off name
        cut_off: String,
        /// Date evaluated
        date: NaiveDate,
    },

    /// Calendar provider error
    #[error("Calendar error: {0}")]
    Calendar(market_calendar::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<market_calendar::Error> for Error {
    fn from(err: market_calendar::Error) -> Self {
        match err {
            market_calendar::Error::UnknownMarket(code) => Error::UnknownMarket(code),
            other => Error::Calendar(other),
        }
    }
}
