//! Timezone normalization
//!
//! Converts between a market's local wall clock and UTC using the IANA
//! database from `chrono-tz`, so daylight-saving rules are applied per date.
//!
//! - Ambiguous local times (clocks falling back) resolve to the earlier instant
//! - Local times inside a spring-forward gap resolve to the first valid
//!   instant after the gap

use crate::{Error, Result};
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use market_calendar::Market;

/// Longest DST gap searched past, in minutes
const MAX_GAP_MINUTES: i64 = 180;

/// Stateless local/absolute time converter
#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneNormalizer;

impl TimezoneNormalizer {
    /// Create new normalizer
    pub fn new() -> Self {
        Self
    }

    /// Resolve a market's timezone
    pub fn zone(&self, market: &Market) -> Result<Tz> {
        market
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::InvalidTimezone {
                market: market.code.to_string(),
                timezone: market.timezone.clone(),
            })
    }

    /// Local wall-clock time in `market` to an absolute instant
    pub fn to_absolute(&self, local: NaiveDateTime, market: &Market) -> Result<DateTime<Utc>> {
        let tz = self.zone(market)?;
        resolve_local(tz, local).ok_or_else(|| Error::InvalidTimezone {
            market: market.code.to_string(),
            timezone: market.timezone.clone(),
        })
    }

    /// Absolute instant to local wall-clock time in `market`
    pub fn to_local(&self, instant: DateTime<Utc>, market: &Market) -> Result<NaiveDateTime> {
        let tz = self.zone(market)?;
        Ok(instant.with_timezone(&tz).naive_local())
    }

    /// Offset of `market`'s wall clock from UTC at `instant`, in minutes
    pub fn utc_offset_minutes(&self, instant: DateTime<Utc>, market: &Market) -> Result<i32> {
        let tz = self.zone(market)?;
        let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
        Ok(offset.local_minus_utc() / 60)
    }

    /// Local `time` on `date` in `market` as an absolute instant
    pub fn at(&self, date: NaiveDate, time: NaiveTime, market: &Market) -> Result<DateTime<Utc>> {
        self.to_absolute(date.and_time(time), market)
    }
}

fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => Some(a.min(b).with_timezone(&Utc)),
        LocalResult::None => {
            let base = local.with_second(0)?.with_nanosecond(0)?;
            (1..=MAX_GAP_MINUTES).find_map(|minutes| {
                tz.from_local_datetime(&(base + Duration::minutes(minutes)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            })
        }
    }
}
