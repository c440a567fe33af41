//! Cut-off evaluation
//!
//! Classifies an absolute instant against a market's named cut-off on a date:
//!
//! ```text
//!        Before          |     Warning      |  After
//! -----------------------+------------------+--------------->
//!               deadline - window        deadline
//! ```
//!
//! The deadline itself is `After`.

use crate::config::CutOffConfig;
use crate::timezone::TimezoneNormalizer;
use crate::types::{CutOffEvaluation, CutOffPosition};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use market_calendar::{CalendarProvider, MarketCode};

/// Classify `instant` relative to `deadline` with a warning window
pub fn classify(instant: DateTime<Utc>, deadline: DateTime<Utc>, window: Duration) -> CutOffPosition {
    // A window reaching past the representable range covers every earlier instant
    let warns = deadline
        .checked_sub_signed(window)
        .map_or(true, |start| instant >= start);
    if instant >= deadline {
        CutOffPosition::After
    } else if warns {
        CutOffPosition::Warning
    } else {
        CutOffPosition::Before
    }
}

/// Evaluates named cut-offs against the calendar
pub struct CutOffEvaluator<'a> {
    calendar: &'a dyn CalendarProvider,
    normalizer: TimezoneNormalizer,
    config: &'a CutOffConfig,
}

impl std::fmt::Debug for CutOffEvaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutOffEvaluator")
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> CutOffEvaluator<'a> {
    /// Create evaluator
    pub fn new(
        calendar: &'a dyn CalendarProvider,
        normalizer: TimezoneNormalizer,
        config: &'a CutOffConfig,
    ) -> Self {
        Self {
            calendar,
            normalizer,
            config,
        }
    }

    /// Evaluate `instant` against `market`'s `cut_off` on `date`.
    ///
    /// Fails with [`Error::NoCutOffDefined`] when the market has no such
    /// cut-off that day.
    pub fn evaluate(
        &self,
        instant: DateTime<Utc>,
        market: &MarketCode,
        date: NaiveDate,
        cut_off: &str,
    ) -> Result<CutOffEvaluation> {
        let descriptor = self.calendar.market(market)?;
        let local_time = self
            .calendar
            .cut_offs(market, date)?
            .get(cut_off)
            .copied()
            .ok_or_else(|| Error::NoCutOffDefined {
                market: market.to_string(),
                cut_off: cut_off.to_string(),
                date,
            })?;

        let deadline = self.normalizer.at(date, local_time, &descriptor)?;
        let window = Duration::minutes(self.config.warning_minutes_for(market));
        let position = classify(instant, deadline, window);

        Ok(CutOffEvaluation {
            market: market.clone(),
            cut_off: cut_off.to_string(),
            date,
            local_time: Some(local_time),
            deadline: Some(deadline),
            position,
            margin_seconds: Some((deadline - instant).num_seconds()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use market_calendar::{Market, StaticCalendar, DEPOSITORY_CUT_OFF};
    use std::collections::BTreeMap;

    fn calendar() -> StaticCalendar {
        let mut cut_offs = BTreeMap::new();
        cut_offs.insert(
            DEPOSITORY_CUT_OFF.to_string(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        let mut calendar = StaticCalendar::new();
        calendar
            .insert_market(Market {
                code: MarketCode::new("JP"),
                name: "Japan".to_string(),
                timezone: "Asia/Tokyo".to_string(),
                sessions: vec![],
                settlement_cycle: 1,
                cycle_overrides: BTreeMap::new(),
                cut_offs,
                currency: Some("JPY".to_string()),
                week_mask: vec![5, 6],
            })
            .unwrap();
        calendar
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, h, m, 0).unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        let deadline = at(5, 0);
        let window = Duration::minutes(30);

        assert_eq!(classify(at(4, 29), deadline, window), CutOffPosition::Before);
        assert_eq!(classify(at(4, 30), deadline, window), CutOffPosition::Warning);
        assert_eq!(classify(at(4, 59), deadline, window), CutOffPosition::Warning);
        assert_eq!(classify(at(5, 0), deadline, window), CutOffPosition::After);
    }

    #[test]
    fn test_classify_window_beyond_date_range() {
        let deadline = at(5, 0);
        let window = Duration::days(1_000_000_000);

        assert_eq!(classify(at(0, 0), deadline, window), CutOffPosition::Warning);
        assert_eq!(classify(at(5, 0), deadline, window), CutOffPosition::After);
    }

    #[test]
    fn test_evaluate_positions() {
        let calendar = calendar();
        let config = CutOffConfig::default();
        let evaluator = CutOffEvaluator::new(&calendar, TimezoneNormalizer::new(), &config);
        let jp = MarketCode::new("JP");
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        let likely = evaluator.evaluate(at(3, 0), &jp, date, DEPOSITORY_CUT_OFF).unwrap();
        assert_eq!(likely.position, CutOffPosition::Before);
        assert_eq!(likely.deadline, Some(at(5, 0)));
        assert_eq!(likely.margin_seconds, Some(7200));

        let warning = evaluator.evaluate(at(4, 45), &jp, date, DEPOSITORY_CUT_OFF).unwrap();
        assert_eq!(warning.position, CutOffPosition::Warning);

        let exact = evaluator.evaluate(at(5, 0), &jp, date, DEPOSITORY_CUT_OFF).unwrap();
        assert_eq!(exact.position, CutOffPosition::After);
        assert_eq!(exact.margin_seconds, Some(0));

        let late = evaluator.evaluate(at(5, 30), &jp, date, DEPOSITORY_CUT_OFF).unwrap();
        assert_eq!(late.position, CutOffPosition::After);
        assert_eq!(late.margin_seconds, Some(-1800));
    }

    #[test]
    fn test_market_window_override() {
        let calendar = calendar();
        let mut config = CutOffConfig::default();
        config.market_warning_minutes.insert("JP".to_string(), 180);
        let evaluator = CutOffEvaluator::new(&calendar, TimezoneNormalizer::new(), &config);
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        let evaluation = evaluator
            .evaluate(at(3, 0), &MarketCode::new("JP"), date, DEPOSITORY_CUT_OFF)
            .unwrap();
        assert_eq!(evaluation.position, CutOffPosition::Warning);
    }

    #[test]
    fn test_missing_cut_off() {
        let calendar = calendar();
        let config = CutOffConfig::default();
        let evaluator = CutOffEvaluator::new(&calendar, TimezoneNormalizer::new(), &config);
        let jp = MarketCode::new("JP");

        // Saturday: no cut-offs
        let saturday = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let result = evaluator.evaluate(at(3, 0), &jp, saturday, DEPOSITORY_CUT_OFF);
        assert!(matches!(result, Err(Error::NoCutOffDefined { .. })));

        let weekday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let result = evaluator.evaluate(at(3, 0), &jp, weekday, "wire");
        assert!(matches!(result, Err(Error::NoCutOffDefined { .. })));
    }
}
