//! Settlement Check
//!
//! Determines whether a cross-border securities trade will settle on its
//! expected value date, given both markets' calendars, session hours and
//! settlement-instruction cut-offs.
//!
//! # Architecture
//!
//! A check runs in one synchronous pass:
//!
//! 1. **Validation**: the trade date must be a business day in both markets
//!    (strict mode rejects it, lenient mode advances it)
//! 2. **Normalization**: the execution time is converted to UTC
//! 3. **Cut-offs**: each market's cut-offs are evaluated at that instant
//! 4. **Value date**: each market counts its settlement cycle, then a merge
//!    scan finds the first common settlement day
//! 5. **Classification**: `UNLIKELY` > `AT_RISK` > `LIKELY`, first match wins
//!
//! All calendar reads go through a request-scoped memo, so each
//! (market, date) pair reaches the provider at most once per check.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use market_calendar::CalendarData;
//! use settlement::{Config, SettlementEngine, SettlementRequest};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let calendar = CalendarData::from_file("calendars.toml")?.into_calendar()?;
//!     let engine = SettlementEngine::new(Arc::new(calendar), Config::default())?;
//!
//!     let request = SettlementRequest::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), "JP", "HK")
//!         .executed_at(Utc.with_ymd_and_hms(2026, 1, 5, 3, 0, 0).unwrap());
//!     let result = engine.check_settlement(&request)?;
//!
//!     println!("{}: {}", result.status, result.message);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod timezone;
pub mod memo;
pub mod business_day;
pub mod cutoff;
pub mod sessions;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, TradeDatePolicy};
pub use business_day::BusinessDayResolver;
pub use cutoff::CutOffEvaluator;
pub use timezone::TimezoneNormalizer;
pub use engine::{classify_status, SettlementEngine, SharedCalendar};
