//! Calendar data files
//!
//! TOML layout:
//!
//! ```toml
//! [[markets]]
//! code = "JP"
//! name = "Japan"
//! timezone = "Asia/Tokyo"
//! settlement_cycle = 1
//! cut_offs = { depository = "14:00:00" }
//!
//! [[markets.sessions]]
//! open = "09:00:00"
//! close = "15:30:00"
//! lunch_break = { start = "11:30:00", end = "12:30:00" }
//!
//! [[holidays]]
//! market = "JP"
//! date = "2026-01-01"
//! name = "New Year's Day"
//!
//! [[coverage]]
//! market = "JP"
//! start = "2026-01-01"
//! end = "2026-12-31"
//! ```

use crate::{static_calendar::Coverage, types::*, Error, Result, StaticCalendar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coverage window for one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageEntry {
    /// Market code
    pub market: MarketCode,
    /// First covered date
    pub start: NaiveDate,
    /// Last covered date
    pub end: NaiveDate,
}

/// Contents of a calendar data file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarData {
    /// Market definitions
    #[serde(default)]
    pub markets: Vec<Market>,

    /// Holidays and manual overrides
    #[serde(default)]
    pub holidays: Vec<Holiday>,

    /// Coverage windows
    #[serde(default)]
    pub coverage: Vec<CoverageEntry>,
}

impl CalendarData {
    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse calendar data: {}", e)))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build a static calendar from the loaded data
    pub fn into_calendar(self) -> Result<StaticCalendar> {
        let mut calendar = StaticCalendar::new();

        for market in self.markets {
            calendar.insert_market(market)?;
        }
        let holiday_count = self.holidays.len();
        for holiday in self.holidays {
            calendar.add_holiday(holiday)?;
        }
        for entry in self.coverage {
            calendar.set_coverage(
                &entry.market,
                Coverage {
                    start: entry.start,
                    end: entry.end,
                },
            )?;
        }

        tracing::info!(
            "Loaded calendar data: {} markets, {} holidays",
            calendar.market_codes().len(),
            holiday_count
        );
        Ok(calendar)
    }
}
