//! Core calendar types
//!
//! Markets, trading sessions, holidays and the per-day facts a provider
//! answers with. All types are immutable value objects once built.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the depository settlement-instruction cut-off
pub const DEPOSITORY_CUT_OFF: &str = "depository";

/// Market identifier (e.g. `JP`, `HK`)
///
/// Codes are upper-cased and trimmed on construction so lookups are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MarketCode(String);

impl MarketCode {
    /// Create new market code
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MarketCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<&str> for MarketCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<MarketCode> for String {
    fn from(code: MarketCode) -> Self {
        code.0
    }
}

impl fmt::Display for MarketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contiguous local-time trading interval, `[open, close)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalSession {
    /// Session open (local wall clock)
    pub open: NaiveTime,
    /// Session close (local wall clock, exclusive)
    pub close: NaiveTime,
}

impl LocalSession {
    /// Create new session interval
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Whether `time` falls inside the interval
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open <= time && time < self.close
    }

    /// Length in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.close - self.open).num_minutes()
    }
}

/// Midday break inside a trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunchBreak {
    /// Break start (local)
    pub start: NaiveTime,
    /// Break end (local)
    pub end: NaiveTime,
}

/// A trading session with an optional lunch break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSession {
    /// Open time (local)
    pub open: NaiveTime,
    /// Close time (local)
    pub close: NaiveTime,
    /// Lunch break, if the market closes midday
    #[serde(default)]
    pub lunch_break: Option<LunchBreak>,
}

impl TradingSession {
    /// Split into contiguous intervals around the lunch break
    pub fn intervals(&self) -> Vec<LocalSession> {
        match self.lunch_break {
            Some(lunch) => vec![
                LocalSession::new(self.open, lunch.start),
                LocalSession::new(lunch.end, self.close),
            ],
            None => vec![LocalSession::new(self.open, self.close)],
        }
    }
}

/// Immutable market descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Market code
    pub code: MarketCode,

    /// Display name
    pub name: String,

    /// IANA timezone name (e.g. `Asia/Tokyo`)
    pub timezone: String,

    /// Trading sessions per regular day
    pub sessions: Vec<TradingSession>,

    /// Default settlement cycle in business days (T+n)
    #[serde(default = "default_settlement_cycle")]
    pub settlement_cycle: u32,

    /// Settlement cycle overrides by instrument type
    #[serde(default)]
    pub cycle_overrides: BTreeMap<String, u32>,

    /// Named cut-off times (local)
    #[serde(default)]
    pub cut_offs: BTreeMap<String, NaiveTime>,

    /// Local currency
    #[serde(default)]
    pub currency: Option<String>,

    /// Days of week that are never business days (0=Mon, .., 6=Sun)
    #[serde(default = "default_week_mask")]
    pub week_mask: Vec<u8>,
}

fn default_settlement_cycle() -> u32 {
    1
}

fn default_week_mask() -> Vec<u8> {
    vec![5, 6]
}

impl Market {
    /// Settlement cycle for an instrument type.
    ///
    /// An instrument override replaces the market default. Instrument
    /// names match case-insensitively.
    pub fn cycle_for(&self, instrument: &str) -> u32 {
        let instrument = instrument.trim();
        self.cycle_overrides
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(instrument))
            .map(|(_, cycle)| *cycle)
            .unwrap_or(self.settlement_cycle)
    }

    /// Whether `date` falls on one of the market's non-working weekdays
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        let day = date.weekday().num_days_from_monday() as u8;
        self.week_mask.contains(&day)
    }

    /// Regular-day trading intervals, ordered by open time
    pub fn intervals(&self) -> Vec<LocalSession> {
        let mut intervals: Vec<LocalSession> =
            self.sessions.iter().flat_map(|s| s.intervals()).collect();
        intervals.sort();
        intervals
    }

    /// Weekdays excluded from the working week
    pub fn weekend_days(&self) -> Vec<Weekday> {
        self.week_mask
            .iter()
            .filter_map(|d| Weekday::try_from(*d).ok())
            .collect()
    }
}

/// Type of holiday or closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    /// Market closed all day
    FullDay,
    /// Shortened session
    HalfDay,
    /// Unscheduled closure (e.g. typhoon signal)
    SpecialClosure,
}

impl fmt::Display for HolidayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolidayKind::FullDay => write!(f, "full day"),
            HolidayKind::HalfDay => write!(f, "half day"),
            HolidayKind::SpecialClosure => write!(f, "special closure"),
        }
    }
}

/// Holiday calendar entry for one market and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    /// Market code
    pub market: MarketCode,

    /// Holiday date
    pub date: NaiveDate,

    /// Holiday name
    pub name: String,

    /// Holiday type
    #[serde(default = "default_holiday_kind")]
    pub kind: HolidayKind,

    /// Whether trading is suspended
    #[serde(default = "default_true")]
    pub affects_trading: bool,

    /// Whether settlement is suspended
    #[serde(default = "default_true")]
    pub affects_settlement: bool,

    /// Early close on a shortened session
    #[serde(default)]
    pub early_close: Option<NaiveTime>,

    /// Cut-off times replacing the market's regular ones on this date
    #[serde(default)]
    pub cut_offs: BTreeMap<String, NaiveTime>,
}

fn default_holiday_kind() -> HolidayKind {
    HolidayKind::FullDay
}

fn default_true() -> bool {
    true
}

impl Holiday {
    /// Full-day closure affecting both trading and settlement
    pub fn full_day(market: impl Into<MarketCode>, date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            date,
            name: name.into(),
            kind: HolidayKind::FullDay,
            affects_trading: true,
            affects_settlement: true,
            early_close: None,
            cut_offs: BTreeMap::new(),
        }
    }

    /// Shortened session closing at `early_close`
    pub fn half_day(
        market: impl Into<MarketCode>,
        date: NaiveDate,
        name: impl Into<String>,
        early_close: NaiveTime,
    ) -> Self {
        Self {
            kind: HolidayKind::HalfDay,
            affects_trading: false,
            affects_settlement: false,
            early_close: Some(early_close),
            ..Self::full_day(market, date, name)
        }
    }

    /// Day open for trading but closed for settlement
    pub fn settlement_only(
        market: impl Into<MarketCode>,
        date: NaiveDate,
        name: impl Into<String>,
    ) -> Self {
        Self {
            affects_trading: false,
            ..Self::full_day(market, date, name)
        }
    }

    /// Unscheduled closure
    pub fn special_closure(
        market: impl Into<MarketCode>,
        date: NaiveDate,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: HolidayKind::SpecialClosure,
            ..Self::full_day(market, date, name)
        }
    }
}

/// Per (market, date) calendar facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// Market code
    pub market: MarketCode,

    /// Date
    pub date: NaiveDate,

    /// Open for trading
    pub is_business_day: bool,

    /// Open for settlement
    pub is_settlement_day: bool,

    /// Falls on a non-working weekday
    pub is_weekend: bool,

    /// Holiday entry for the date, if any
    pub holiday: Option<Holiday>,

    /// Trading ends early
    pub shortened_session: bool,
}

impl CalendarDay {
    /// Why the market is closed, or `None` if it trades
    pub fn closure_reason(&self) -> Option<String> {
        if self.is_business_day {
            return None;
        }
        Some(match (&self.holiday, self.is_weekend) {
            (Some(holiday), _) => holiday.name.clone(),
            (None, true) => "Weekend".to_string(),
            (None, false) => "Market closed".to_string(),
        })
    }

    /// Why settlement cannot occur, or `None` if it can
    pub fn non_settlement_reason(&self) -> Option<String> {
        if self.is_settlement_day {
            return None;
        }
        Some(match (&self.holiday, self.is_weekend) {
            (_, true) => "Weekend".to_string(),
            (Some(holiday), false) => holiday.name.clone(),
            (None, false) => "Settlement closed".to_string(),
        })
    }
}
