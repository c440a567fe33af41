//! Request-scoped calendar memo
//!
//! Every settlement check reads the provider through a [`RequestCalendar`],
//! so each (market, date) pair is fetched at most once per request whatever
//! the underlying adapter does. The memo lives on the stack of one check and
//! is never shared.

use chrono::{NaiveDate, NaiveTime};
use market_calendar::{CalendarDay, CalendarProvider, LocalSession, Market, MarketCode, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

type DayKey = (MarketCode, NaiveDate);

/// Memoizing view over a provider for the duration of one request
pub struct RequestCalendar<'a> {
    provider: &'a dyn CalendarProvider,
    markets: RefCell<HashMap<MarketCode, Market>>,
    days: RefCell<HashMap<DayKey, CalendarDay>>,
    sessions: RefCell<HashMap<DayKey, Vec<LocalSession>>>,
    cut_offs: RefCell<HashMap<DayKey, BTreeMap<String, NaiveTime>>>,
}

impl std::fmt::Debug for RequestCalendar<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCalendar")
            .field("days", &self.days.borrow().len())
            .finish()
    }
}

impl<'a> RequestCalendar<'a> {
    /// Wrap a provider
    pub fn new(provider: &'a dyn CalendarProvider) -> Self {
        Self {
            provider,
            markets: RefCell::new(HashMap::new()),
            days: RefCell::new(HashMap::new()),
            sessions: RefCell::new(HashMap::new()),
            cut_offs: RefCell::new(HashMap::new()),
        }
    }
}

impl CalendarProvider for RequestCalendar<'_> {
    fn market(&self, code: &MarketCode) -> Result<Market> {
        if let Some(market) = self.markets.borrow().get(code) {
            return Ok(market.clone());
        }
        let market = self.provider.market(code)?;
        self.markets.borrow_mut().insert(code.clone(), market.clone());
        Ok(market)
    }

    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> Result<CalendarDay> {
        let key = (market.clone(), date);
        if let Some(day) = self.days.borrow().get(&key) {
            return Ok(day.clone());
        }
        let day = self.provider.calendar_day(market, date)?;
        self.days.borrow_mut().insert(key, day.clone());
        Ok(day)
    }

    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> Result<Vec<LocalSession>> {
        let key = (market.clone(), date);
        if let Some(sessions) = self.sessions.borrow().get(&key) {
            return Ok(sessions.clone());
        }
        let sessions = self.provider.sessions(market, date)?;
        self.sessions.borrow_mut().insert(key, sessions.clone());
        Ok(sessions)
    }

    fn cut_offs(&self, market: &MarketCode, date: NaiveDate) -> Result<BTreeMap<String, NaiveTime>> {
        let key = (market.clone(), date);
        if let Some(cut_offs) = self.cut_offs.borrow().get(&key) {
            return Ok(cut_offs.clone());
        }
        let cut_offs = self.provider.cut_offs(market, date)?;
        self.cut_offs.borrow_mut().insert(key, cut_offs.clone());
        Ok(cut_offs)
    }
}
