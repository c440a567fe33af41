//! In-memory calendar adapter
//!
//! Holds market definitions and holiday lists in memory. Built either
//! programmatically or from a TOML calendar file (see [`crate::data`]).
//!
//! # Day rules
//!
//! - A **business day** is not in the market's week mask and has no holiday
//!   entry that affects trading.
//! - A **settlement day** is a business day with no holiday entry that
//!   affects settlement (settlement-only holidays trade but do not settle).
//! - A half day trades with its sessions truncated at `early_close`.

use crate::{types::*, CalendarProvider, Error, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Date range for which a market's calendar data is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// First covered date (inclusive)
    pub start: NaiveDate,
    /// Last covered date (inclusive)
    pub end: NaiveDate,
}

impl Coverage {
    /// Whether `date` lies inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone)]
struct MarketCalendar {
    market: Market,
    holidays: BTreeMap<NaiveDate, Holiday>,
    coverage: Option<Coverage>,
}

/// Calendar provider backed by in-memory market and holiday tables
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    markets: BTreeMap<MarketCode, MarketCalendar>,
}

impl StaticCalendar {
    /// Create empty calendar
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market, replacing any existing definition and its holidays
    pub fn insert_market(&mut self, market: Market) -> Result<()> {
        validate_market(&market)?;

        tracing::debug!("Registered market {} ({})", market.code, market.timezone);
        self.markets.insert(
            market.code.clone(),
            MarketCalendar {
                market,
                holidays: BTreeMap::new(),
                coverage: None,
            },
        );
        Ok(())
    }

    /// Restrict a market's data to a coverage window
    pub fn set_coverage(&mut self, code: &MarketCode, coverage: Coverage) -> Result<()> {
        if coverage.start > coverage.end {
            return Err(Error::InvalidData(format!(
                "Coverage for {} starts after it ends ({} > {})",
                code, coverage.start, coverage.end
            )));
        }
        self.entry_mut(code)?.coverage = Some(coverage);
        Ok(())
    }

    /// Add a holiday or manual override.
    ///
    /// An existing entry for the same market and date is replaced.
    pub fn add_holiday(&mut self, holiday: Holiday) -> Result<()> {
        if let Some(early_close) = holiday.early_close {
            let entry = self.entry(&holiday.market)?;
            let opens = entry.market.intervals().first().map(|s| s.open);
            if opens.map_or(false, |open| early_close <= open) {
                return Err(Error::InvalidData(format!(
                    "Early close {} on {} for {} is before the market opens",
                    early_close, holiday.date, holiday.market
                )));
            }
        }

        let entry = self.entry_mut(&holiday.market)?;
        if let Some(previous) = entry.holidays.insert(holiday.date, holiday.clone()) {
            tracing::debug!(
                "Replaced holiday '{}' for {} on {} with '{}'",
                previous.name,
                holiday.market,
                holiday.date,
                holiday.name
            );
        }
        Ok(())
    }

    /// Holidays for a market within `[start, end]`, ordered by date
    pub fn holidays(&self, code: &MarketCode, start: NaiveDate, end: NaiveDate) -> Result<Vec<Holiday>> {
        let entry = self.entry(code)?;
        if start > end {
            return Ok(vec![]);
        }
        Ok(entry.holidays.range(start..=end).map(|(_, h)| h.clone()).collect())
    }

    /// Registered market codes, sorted
    pub fn market_codes(&self) -> Vec<MarketCode> {
        self.markets.keys().cloned().collect()
    }

    fn entry(&self, code: &MarketCode) -> Result<&MarketCalendar> {
        self.markets
            .get(code)
            .ok_or_else(|| Error::UnknownMarket(code.to_string()))
    }

    fn entry_mut(&mut self, code: &MarketCode) -> Result<&mut MarketCalendar> {
        self.markets
            .get_mut(code)
            .ok_or_else(|| Error::UnknownMarket(code.to_string()))
    }

    fn covered_entry(&self, code: &MarketCode, date: NaiveDate) -> Result<&MarketCalendar> {
        let entry = self.entry(code)?;
        match entry.coverage {
            Some(coverage) if !coverage.contains(date) => Err(Error::OutOfCoverage {
                market: code.to_string(),
                date,
            }),
            _ => Ok(entry),
        }
    }

    fn day_of(entry: &MarketCalendar, date: NaiveDate) -> CalendarDay {
        let is_weekend = entry.market.is_weekend(date);
        let holiday = entry.holidays.get(&date).cloned();

        let trading_closed = holiday.as_ref().map_or(false, |h| h.affects_trading);
        let settlement_closed = holiday.as_ref().map_or(false, |h| h.affects_settlement);

        let is_business_day = !is_weekend && !trading_closed;
        let shortened_session = is_business_day
            && holiday.as_ref().map_or(false, |h| h.early_close.is_some());

        CalendarDay {
            market: entry.market.code.clone(),
            date,
            is_business_day,
            is_settlement_day: is_business_day && !settlement_closed,
            is_weekend,
            holiday,
            shortened_session,
        }
    }
}

impl CalendarProvider for StaticCalendar {
    fn market(&self, code: &MarketCode) -> Result<Market> {
        Ok(self.entry(code)?.market.clone())
    }

    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> Result<CalendarDay> {
        let entry = self.covered_entry(market, date)?;
        Ok(Self::day_of(entry, date))
    }

    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> Result<Vec<LocalSession>> {
        let entry = self.covered_entry(market, date)?;
        let day = Self::day_of(entry, date);
        if !day.is_business_day {
            return Ok(vec![]);
        }

        let intervals = entry.market.intervals();
        let early_close = day.holiday.as_ref().and_then(|h| h.early_close);
        Ok(match early_close {
            Some(close) => truncate(intervals, close),
            None => intervals,
        })
    }

    fn cut_offs(&self, market: &MarketCode, date: NaiveDate) -> Result<BTreeMap<String, NaiveTime>> {
        let entry = self.covered_entry(market, date)?;
        let day = Self::day_of(entry, date);
        if !day.is_business_day {
            return Ok(BTreeMap::new());
        }

        let mut cut_offs = entry.market.cut_offs.clone();
        if let Some(holiday) = &day.holiday {
            cut_offs.extend(holiday.cut_offs.iter().map(|(k, v)| (k.clone(), *v)));
        }
        Ok(cut_offs)
    }
}

fn truncate(intervals: Vec<LocalSession>, close: NaiveTime) -> Vec<LocalSession> {
    intervals
        .into_iter()
        .filter(|s| s.open < close)
        .map(|s| LocalSession::new(s.open, s.close.min(close)))
        .collect()
}

fn validate_market(market: &Market) -> Result<()> {
    if market.code.as_str().is_empty() {
        return Err(Error::InvalidData("Market code is empty".to_string()));
    }

    if market.settlement_cycle == 0 {
        return Err(Error::InvalidData(format!(
            "{}: settlement cycle must be at least T+1",
            market.code
        )));
    }

    let mut instruments = std::collections::BTreeSet::new();
    for (instrument, cycle) in &market.cycle_overrides {
        if *cycle == 0 {
            return Err(Error::InvalidData(format!(
                "{}: {} settlement cycle must be at least T+1",
                market.code, instrument
            )));
        }
        if !instruments.insert(instrument.trim().to_ascii_lowercase()) {
            return Err(Error::InvalidData(format!(
                "{}: duplicate cycle override for {}",
                market.code, instrument
            )));
        }
    }

    if let Some(day) = market.week_mask.iter().find(|d| **d > 6) {
        return Err(Error::InvalidData(format!(
            "{}: week mask day {} out of range 0-6",
            market.code, day
        )));
    }

    for session in &market.sessions {
        if session.open >= session.close {
            return Err(Error::InvalidData(format!(
                "{}: session opens at {} but closes at {}",
                market.code, session.open, session.close
            )));
        }
        if let Some(lunch) = session.lunch_break {
            if !(session.open < lunch.start && lunch.start < lunch.end && lunch.end < session.close) {
                return Err(Error::InvalidData(format!(
                    "{}: lunch break {}-{} outside session {}-{}",
                    market.code, lunch.start, lunch.end, session.open, session.close
                )));
            }
        }
    }

    Ok(())
}
