//! Business-day resolution
//!
//! Forward scans over one or more market calendars, each bounded by the
//! configured horizon in calendar days. Multi-market searches use a merge
//! scan: the candidate date only moves forward, to the first qualifying day
//! of whichever market rejects it, so the work is the sum of each market's
//! advances rather than their product.

use crate::types::{DayRule, SettlementPath, SkippedDay};
use crate::{Error, Result};
use chrono::NaiveDate;
use market_calendar::{CalendarDay, CalendarProvider, MarketCode};

impl DayRule {
    /// Whether `day` satisfies the rule
    pub fn admits(&self, day: &CalendarDay) -> bool {
        match self {
            DayRule::Business => day.is_business_day,
            DayRule::Settlement => day.is_settlement_day,
        }
    }

    /// Why `day` fails the rule, `None` if it passes
    pub fn rejection(&self, day: &CalendarDay) -> Option<String> {
        match self {
            DayRule::Business => day.closure_reason(),
            DayRule::Settlement => day.non_settlement_reason(),
        }
    }
}

/// Business-day arithmetic over a calendar provider
pub struct BusinessDayResolver<'a> {
    calendar: &'a dyn CalendarProvider,
    horizon_days: u32,
}

impl std::fmt::Debug for BusinessDayResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessDayResolver")
            .field("horizon_days", &self.horizon_days)
            .finish()
    }
}

impl<'a> BusinessDayResolver<'a> {
    /// Create resolver with a search horizon in calendar days
    pub fn new(calendar: &'a dyn CalendarProvider, horizon_days: u32) -> Self {
        Self {
            calendar,
            horizon_days,
        }
    }

    /// Search horizon in calendar days
    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Smallest business day strictly after `date`
    pub fn next_business_day(&self, market: &MarketCode, date: NaiveDate) -> Result<NaiveDate> {
        self.next_business_day_with(market, date, DayRule::Business)
    }

    /// Smallest day strictly after `date` satisfying `rule`
    pub fn next_business_day_with(
        &self,
        market: &MarketCode,
        date: NaiveDate,
        rule: DayRule,
    ) -> Result<NaiveDate> {
        self.step(market, date, rule, &mut Vec::new())
    }

    /// Apply [`Self::next_business_day`] `n` times; `n = 0` returns `date`
    pub fn add_business_days(&self, market: &MarketCode, date: NaiveDate, n: u32) -> Result<NaiveDate> {
        self.add_business_days_with(market, date, n, DayRule::Business)
    }

    /// Apply [`Self::next_business_day_with`] `n` times
    pub fn add_business_days_with(
        &self,
        market: &MarketCode,
        date: NaiveDate,
        n: u32,
        rule: DayRule,
    ) -> Result<NaiveDate> {
        Ok(self.settlement_path(market, date, n, rule)?.date)
    }

    /// Count `cycle` qualifying days forward from `trade_date`, recording
    /// every day passed over and why
    pub fn settlement_path(
        &self,
        market: &MarketCode,
        trade_date: NaiveDate,
        cycle: u32,
        rule: DayRule,
    ) -> Result<SettlementPath> {
        let mut skipped = Vec::new();
        let mut date = trade_date;
        for _ in 0..cycle {
            date = self.step(market, date, rule, &mut skipped)?;
        }

        tracing::debug!(
            "{} T+{} from {} lands on {} ({} days skipped)",
            market,
            cycle,
            trade_date,
            date,
            skipped.len()
        );
        Ok(SettlementPath { date, skipped })
    }

    /// Smallest date on or after `date` that is a business day in both markets
    pub fn next_common_business_day(
        &self,
        a: &MarketCode,
        b: &MarketCode,
        date: NaiveDate,
    ) -> Result<NaiveDate> {
        self.next_common_day_among(&[a.clone(), b.clone()], date, DayRule::Business)
    }

    /// Smallest date on or after `date` satisfying `rule` in every market.
    ///
    /// Returns `date` unchanged when it already qualifies everywhere.
    pub fn next_common_day_among(
        &self,
        markets: &[MarketCode],
        date: NaiveDate,
        rule: DayRule,
    ) -> Result<NaiveDate> {
        let limit = self.limit(date);
        let mut candidate = date;

        'scan: loop {
            for market in markets {
                let next = self.first_on_or_after(market, candidate, rule, limit, markets, date)?;
                if next > candidate {
                    tracing::debug!("{} rejects {}, advancing to {}", market, candidate, next);
                    candidate = next;
                    continue 'scan;
                }
            }
            return Ok(candidate);
        }
    }

    /// Every date in `[start, end]` that is a business day in both markets
    pub fn common_business_days(
        &self,
        a: &MarketCode,
        b: &MarketCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let mut days = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            if self.calendar.is_business_day(a, date)? && self.calendar.is_business_day(b, date)? {
                days.push(date);
            }
        }
        Ok(days)
    }

    fn step(
        &self,
        market: &MarketCode,
        from: NaiveDate,
        rule: DayRule,
        skipped: &mut Vec<SkippedDay>,
    ) -> Result<NaiveDate> {
        let markets = std::slice::from_ref(market);
        for date in from.iter_days().skip(1).take(self.horizon_days as usize) {
            let day = self.day(market, date, markets, from)?;
            match rule.rejection(&day) {
                None => return Ok(date),
                Some(reason) => skipped.push(SkippedDay { date, reason }),
            }
        }
        Err(self.not_found(markets, from))
    }

    fn first_on_or_after(
        &self,
        market: &MarketCode,
        candidate: NaiveDate,
        rule: DayRule,
        limit: NaiveDate,
        markets: &[MarketCode],
        from: NaiveDate,
    ) -> Result<NaiveDate> {
        for date in candidate.iter_days().take_while(|d| *d <= limit) {
            if rule.admits(&self.day(market, date, markets, from)?) {
                return Ok(date);
            }
        }
        Err(self.not_found(markets, from))
    }

    fn day(
        &self,
        market: &MarketCode,
        date: NaiveDate,
        markets: &[MarketCode],
        from: NaiveDate,
    ) -> Result<CalendarDay> {
        self.calendar.calendar_day(market, date).map_err(|err| match err {
            market_calendar::Error::OutOfCoverage { .. } => {
                tracing::debug!("Calendar coverage ends for {} at {}", market, date);
                self.not_found(markets, from)
            }
            other => other.into(),
        })
    }

    fn limit(&self, date: NaiveDate) -> NaiveDate {
        date.iter_days()
            .nth(self.horizon_days as usize)
            .unwrap_or(NaiveDate::MAX)
    }

    fn not_found(&self, markets: &[MarketCode], from: NaiveDate) -> Error {
        let markets: Vec<&str> = markets.iter().map(|m| m.as_str()).collect();
        Error::NoBusinessDayFound {
            markets: markets.join("/"),
            from,
            horizon_days: self.horizon_days,
        }
    }
}
