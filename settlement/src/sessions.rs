//! Trading session analysis
//!
//! Session phases, simultaneous trading windows between two markets and
//! next open/close lookups. Sessions are taken per local calendar date of
//! each market and compared as absolute instants.

use crate::timezone::TimezoneNormalizer;
use crate::types::{OverlapWindow, SessionPhase};
use crate::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use market_calendar::{CalendarProvider, LocalSession, Market, MarketCode};

/// Absolute `[open, close)` interval
pub type Interval = (DateTime<Utc>, DateTime<Utc>);

/// Phase of a trading day at a local time, given the day's ordered intervals
pub fn session_phase(intervals: &[LocalSession], time: NaiveTime) -> SessionPhase {
    let (first, last) = match (intervals.first(), intervals.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return SessionPhase::Closed,
    };
    if time < first.open {
        return SessionPhase::PreMarket;
    }
    if time >= last.close {
        return SessionPhase::PostMarket;
    }

    match intervals.iter().position(|s| s.contains(time)) {
        Some(_) if intervals.len() == 1 => SessionPhase::Regular,
        Some(0) => SessionPhase::Morning,
        Some(i) if i == intervals.len() - 1 => SessionPhase::Afternoon,
        Some(_) => SessionPhase::Regular,
        None => SessionPhase::Lunch,
    }
}

/// Intersection of two sorted, non-overlapping interval lists
pub fn intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].0.max(b[j].0);
        let end = a[i].1.min(b[j].1);
        if start < end {
            out.push((start, end));
        }
        if a[i].1 <= b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Session queries against a calendar
pub struct SessionView<'a> {
    calendar: &'a dyn CalendarProvider,
    normalizer: TimezoneNormalizer,
}

impl std::fmt::Debug for SessionView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionView").finish_non_exhaustive()
    }
}

impl<'a> SessionView<'a> {
    /// Create view
    pub fn new(calendar: &'a dyn CalendarProvider, normalizer: TimezoneNormalizer) -> Self {
        Self {
            calendar,
            normalizer,
        }
    }

    /// Trading intervals of `market` on its local `date`, as instants
    pub fn absolute_sessions(&self, market: &Market, date: NaiveDate) -> Result<Vec<Interval>> {
        self.calendar
            .sessions(&market.code, date)?
            .iter()
            .map(|s| {
                Ok((
                    self.normalizer.at(date, s.open, market)?,
                    self.normalizer.at(date, s.close, market)?,
                ))
            })
            .collect()
    }

    /// Windows where both markets trade on `date`
    pub fn overlap(&self, a: &MarketCode, b: &MarketCode, date: NaiveDate) -> Result<Vec<OverlapWindow>> {
        let market_a = self.calendar.market(a)?;
        let market_b = self.calendar.market(b)?;
        let sessions_a = self.absolute_sessions(&market_a, date)?;
        let sessions_b = self.absolute_sessions(&market_b, date)?;

        intersect(&sessions_a, &sessions_b)
            .into_iter()
            .map(|(start, end)| {
                Ok(OverlapWindow {
                    start,
                    end,
                    start_local_a: self.normalizer.to_local(start, &market_a)?,
                    end_local_a: self.normalizer.to_local(end, &market_a)?,
                    start_local_b: self.normalizer.to_local(start, &market_b)?,
                    end_local_b: self.normalizer.to_local(end, &market_b)?,
                    duration_minutes: (end - start).num_minutes(),
                })
            })
            .collect()
    }

    /// Trading phase of `market` at `instant`
    pub fn phase_at(&self, market: &Market, instant: DateTime<Utc>) -> Result<SessionPhase> {
        let local = self.normalizer.to_local(instant, market)?;
        let sessions = self.calendar.sessions(&market.code, local.date())?;
        Ok(session_phase(&sessions, local.time()))
    }

    /// Close of the session containing `instant`, if trading
    pub fn current_close(&self, market: &Market, instant: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let date = self.normalizer.to_local(instant, market)?.date();
        Ok(self
            .absolute_sessions(market, date)?
            .into_iter()
            .find(|(open, close)| *open <= instant && instant < *close)
            .map(|(_, close)| close))
    }

    /// First session open strictly after `instant`, searching up to
    /// `horizon_days` local dates ahead
    pub fn next_open(
        &self,
        market: &Market,
        instant: DateTime<Utc>,
        horizon_days: u32,
    ) -> Result<Option<DateTime<Utc>>> {
        let today = self.normalizer.to_local(instant, market)?.date();
        for date in today.iter_days().take(horizon_days as usize + 1) {
            let open = self
                .absolute_sessions(market, date)?
                .into_iter()
                .map(|(open, _)| open)
                .find(|open| *open > instant);
            if open.is_some() {
                return Ok(open);
            }
        }
        Ok(None)
    }
}
