//! Calendar provider capability
//!
//! The single read-only query interface through which settlement logic sees
//! calendar data. Concrete adapters (static files, exchange data feeds,
//! caches) implement this trait; callers never branch on the data source.

use crate::{types::*, Result};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only source of market definitions and per-day calendar facts
pub trait CalendarProvider {
    /// Look up a market definition
    fn market(&self, code: &MarketCode) -> Result<Market>;

    /// Calendar facts for one market and date
    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> Result<CalendarDay>;

    /// Whether the market trades on `date`
    fn is_business_day(&self, market: &MarketCode, date: NaiveDate) -> Result<bool> {
        Ok(self.calendar_day(market, date)?.is_business_day)
    }

    /// Whether the market settles on `date`
    fn is_settlement_day(&self, market: &MarketCode, date: NaiveDate) -> Result<bool> {
        Ok(self.calendar_day(market, date)?.is_settlement_day)
    }

    /// Ordered trading intervals for `date`, empty if the market does not trade
    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> Result<Vec<LocalSession>>;

    /// Cut-off times in force on `date`, empty if none are defined
    fn cut_offs(&self, market: &MarketCode, date: NaiveDate) -> Result<BTreeMap<String, NaiveTime>>;
}

impl<P: CalendarProvider + ?Sized> CalendarProvider for Arc<P> {
    fn market(&self, code: &MarketCode) -> Result<Market> {
        (**self).market(code)
    }

    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> Result<CalendarDay> {
        (**self).calendar_day(market, date)
    }

    fn is_business_day(&self, market: &MarketCode, date: NaiveDate) -> Result<bool> {
        (**self).is_business_day(market, date)
    }

    fn is_settlement_day(&self, market: &MarketCode, date: NaiveDate) -> Result<bool> {
        (**self).is_settlement_day(market, date)
    }

    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> Result<Vec<LocalSession>> {
        (**self).sessions(market, date)
    }

    fn cut_offs(&self, market: &MarketCode, date: NaiveDate) -> Result<BTreeMap<String, NaiveTime>> {
        (**self).cut_offs(market, date)
    }
}
