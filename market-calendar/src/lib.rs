//! Market Calendar
//!
//! Market definitions, holiday schedules and the read-only query interface
//! settlement logic uses to ask about them.
//!
//! # Architecture
//!
//! - **[`CalendarProvider`]**: the one capability trait every data source
//!   implements (market lookup, per-day facts, sessions, cut-offs)
//! - **[`StaticCalendar`]**: in-memory adapter, built in code or from a
//!   TOML file via [`CalendarData`]
//! - **[`CachedCalendar`]**: explicit (market, date) cache around any
//!   provider, safe to share between threads
//!
//! # Example
//!
//! ```no_run
//! use market_calendar::{CalendarData, CalendarProvider, MarketCode};
//!
//! fn main() -> market_calendar::Result<()> {
//!     let calendar = CalendarData::from_file("calendars.toml")?.into_calendar()?;
//!     let jp = MarketCode::new("JP");
//!     let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
//!
//!     println!("JP open: {}", calendar.is_business_day(&jp, date)?);
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
pub mod provider;
pub mod static_calendar;
pub mod data;
pub mod cache;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use provider::CalendarProvider;
pub use static_calendar::{Coverage, StaticCalendar};
pub use data::CalendarData;
pub use cache::CachedCalendar;
