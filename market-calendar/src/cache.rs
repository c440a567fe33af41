//! Shared calendar cache
//!
//! Memoizes provider answers keyed by (market, date). Calendar facts for a
//! confirmed date never change, so entries live until the cache is dropped.
//! Errors are passed through and never stored.

use crate::{types::*, CalendarProvider, Result};
use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use std::collections::BTreeMap;

type DayKey = (MarketCode, NaiveDate);

/// Caching decorator around any [`CalendarProvider`]
#[derive(Debug)]
pub struct CachedCalendar<P> {
    inner: P,
    markets: DashMap<MarketCode, Market>,
    days: DashMap<DayKey, CalendarDay>,
    sessions: DashMap<DayKey, Vec<LocalSession>>,
    cut_offs: DashMap<DayKey, BTreeMap<String, NaiveTime>>,
}

impl<P: CalendarProvider> CachedCalendar<P> {
    /// Wrap a provider
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            markets: DashMap::new(),
            days: DashMap::new(),
            sessions: DashMap::new(),
            cut_offs: DashMap::new(),
        }
    }

    /// Wrapped provider
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached calendar days
    pub fn cached_days(&self) -> usize {
        self.days.len()
    }
}

impl<P: CalendarProvider> CalendarProvider for CachedCalendar<P> {
    fn market(&self, code: &MarketCode) -> Result<Market> {
        if let Some(market) = self.markets.get(code) {
            return Ok(market.clone());
        }
        let market = self.inner.market(code)?;
        self.markets.insert(code.clone(), market.clone());
        Ok(market)
    }

    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> Result<CalendarDay> {
        let key = (market.clone(), date);
        if let Some(day) = self.days.get(&key) {
            return Ok(day.clone());
        }
        let day = self.inner.calendar_day(market, date)?;
        self.days.insert(key, day.clone());
        Ok(day)
    }

    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> Result<Vec<LocalSession>> {
        let key = (market.clone(), date);
        if let Some(sessions) = self.sessions.get(&key) {
            return Ok(sessions.clone());
        }
        let sessions = self.inner.sessions(market, date)?;
        self.sessions.insert(key, sessions.clone());
        Ok(sessions)
    }

    fn cut_offs(&self, market: &MarketCode, date: NaiveDate) -> Result<BTreeMap<String, NaiveTime>> {
        let key = (market.clone(), date);
        if let Some(cut_offs) = self.cut_offs.get(&key) {
            return Ok(cut_offs.clone());
        }
        let cut_offs = self.inner.cut_offs(market, date)?;
        self.cut_offs.insert(key, cut_offs.clone());
        Ok(cut_offs)
    }
}
