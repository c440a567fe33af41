//! Shared fixtures: Japan, Hong Kong and US calendars for 2026

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use market_calendar::{
    CalendarDay, CalendarProvider, Holiday, LocalSession, LunchBreak, Market, MarketCode,
    StaticCalendar, TradingSession, DEPOSITORY_CUT_OFF,
};
use settlement::{Config, SettlementEngine};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn utc(m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, m, d, h, mi, 0).unwrap()
}

fn session(open: NaiveTime, close: NaiveTime, lunch: Option<(NaiveTime, NaiveTime)>) -> TradingSession {
    TradingSession {
        open,
        close,
        lunch_break: lunch.map(|(start, end)| LunchBreak { start, end }),
    }
}

pub fn japan() -> Market {
    let mut cut_offs = BTreeMap::new();
    cut_offs.insert(DEPOSITORY_CUT_OFF.to_string(), time(14, 0));
    Market {
        code: MarketCode::new("JP"),
        name: "Japan Exchange".to_string(),
        timezone: "Asia/Tokyo".to_string(),
        sessions: vec![session(time(9, 0), time(15, 30), Some((time(11, 30), time(12, 30))))],
        settlement_cycle: 1,
        cycle_overrides: BTreeMap::new(),
        cut_offs,
        currency: Some("JPY".to_string()),
        week_mask: vec![5, 6],
    }
}

pub fn hong_kong() -> Market {
    let mut cut_offs = BTreeMap::new();
    cut_offs.insert(DEPOSITORY_CUT_OFF.to_string(), time(15, 45));
    cut_offs.insert("wire".to_string(), time(16, 30));
    let mut cycle_overrides = BTreeMap::new();
    cycle_overrides.insert("bond".to_string(), 2);
    Market {
        code: MarketCode::new("HK"),
        name: "Hong Kong Exchange".to_string(),
        timezone: "Asia/Hong_Kong".to_string(),
        sessions: vec![session(time(9, 30), time(16, 0), Some((time(12, 0), time(13, 0))))],
        settlement_cycle: 1,
        cycle_overrides,
        cut_offs,
        currency: Some("HKD".to_string()),
        week_mask: vec![5, 6],
    }
}

pub fn united_states() -> Market {
    let mut cut_offs = BTreeMap::new();
    cut_offs.insert(DEPOSITORY_CUT_OFF.to_string(), time(11, 30));
    Market {
        code: MarketCode::new("US"),
        name: "New York".to_string(),
        timezone: "America/New_York".to_string(),
        sessions: vec![session(time(9, 30), time(16, 0), None)],
        settlement_cycle: 1,
        cycle_overrides: BTreeMap::new(),
        cut_offs,
        currency: Some("USD".to_string()),
        week_mask: vec![5, 6],
    }
}

pub fn calendar() -> StaticCalendar {
    let mut calendar = StaticCalendar::new();
    calendar.insert_market(japan()).unwrap();
    calendar.insert_market(hong_kong()).unwrap();
    calendar.insert_market(united_states()).unwrap();

    let holidays = vec![
        Holiday::full_day("JP", date(1, 1), "New Year's Day"),
        Holiday::full_day("JP", date(1, 2), "New Year Holiday"),
        Holiday::full_day("JP", date(1, 3), "New Year Holiday"),
        Holiday::full_day("JP", date(2, 11), "National Foundation Day"),
        Holiday::full_day("JP", date(2, 23), "Emperor's Birthday"),
        Holiday::full_day("HK", date(1, 1), "New Year's Day"),
        Holiday::full_day("HK", date(2, 17), "Lunar New Year"),
        Holiday::full_day("HK", date(2, 18), "Lunar New Year"),
        Holiday::full_day("HK", date(2, 19), "Lunar New Year"),
        Holiday::full_day("HK", date(4, 3), "Good Friday"),
        Holiday::full_day("HK", date(4, 6), "Easter Monday"),
        Holiday::half_day("HK", date(12, 24), "Christmas Eve", time(12, 0)),
        Holiday::full_day("HK", date(12, 25), "Christmas Day"),
        Holiday::full_day("US", date(1, 1), "New Year's Day"),
        Holiday::full_day("US", date(4, 3), "Good Friday"),
        Holiday::full_day("US", date(7, 3), "Independence Day (observed)"),
        Holiday::full_day("US", date(12, 25), "Christmas Day"),
    ];
    for holiday in holidays {
        calendar.add_holiday(holiday).unwrap();
    }
    calendar
}

pub fn engine() -> SettlementEngine {
    engine_with(Config::default())
}

pub fn engine_with(config: Config) -> SettlementEngine {
    SettlementEngine::new(Arc::new(calendar()), config).unwrap()
}

/// Provider recording every call per (method, market, date)
pub struct RecordingProvider {
    pub inner: StaticCalendar,
    pub calls: Mutex<HashMap<(&'static str, String, Option<NaiveDate>), usize>>,
}

impl RecordingProvider {
    pub fn new(inner: StaticCalendar) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, method: &'static str, market: &MarketCode, date: Option<NaiveDate>) {
        let mut calls = self.calls.lock().unwrap();
        *calls.entry((method, market.to_string(), date)).or_insert(0) += 1;
    }

    pub fn max_calls_per_key(&self) -> usize {
        self.calls.lock().unwrap().values().copied().max().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl CalendarProvider for RecordingProvider {
    fn market(&self, code: &MarketCode) -> market_calendar::Result<Market> {
        self.record("market", code, None);
        self.inner.market(code)
    }

    fn calendar_day(&self, market: &MarketCode, date: NaiveDate) -> market_calendar::Result<CalendarDay> {
        self.record("calendar_day", market, Some(date));
        self.inner.calendar_day(market, date)
    }

    fn is_business_day(&self, market: &MarketCode, date: NaiveDate) -> market_calendar::Result<bool> {
        self.record("is_business_day", market, Some(date));
        self.inner.is_business_day(market, date)
    }

    fn is_settlement_day(&self, market: &MarketCode, date: NaiveDate) -> market_calendar::Result<bool> {
        self.record("is_settlement_day", market, Some(date));
        self.inner.is_settlement_day(market, date)
    }

    fn sessions(&self, market: &MarketCode, date: NaiveDate) -> market_calendar::Result<Vec<LocalSession>> {
        self.record("sessions", market, Some(date));
        self.inner.sessions(market, date)
    }

    fn cut_offs(
        &self,
        market: &MarketCode,
        date: NaiveDate,
    ) -> market_calendar::Result<BTreeMap<String, NaiveTime>> {
        self.record("cut_offs", market, Some(date));
        self.inner.cut_offs(market, date)
    }
}
