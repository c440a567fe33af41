//! End-to-end settlement check scenarios

mod common;

use common::*;
use market_calendar::{Coverage, Holiday, Market, MarketCode, StaticCalendar};
use settlement::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn jp_hk(trade_date: chrono::NaiveDate) -> SettlementRequest {
    SettlementRequest::new(trade_date, "JP", "HK")
}

// ============================================================================
// Status scenarios
// ============================================================================

#[test]
fn test_holiday_in_both_markets_advances_trade_date() {
    let engine = engine();
    let result = engine.check_settlement(&jp_hk(date(1, 1))).unwrap();

    assert_eq!(result.status, SettlementStatus::Unlikely);
    assert!(result.trade_date_advanced);
    assert_eq!(result.requested_trade_date, date(1, 1));
    assert_eq!(result.trade_date, date(1, 5));
    assert_eq!(result.settlement_date, date(1, 6));
    assert_eq!(result.next_viable_trade_date, Some(date(1, 6)));

    match &result.reasons[0] {
        Reason::TradeDateAdvanced { resolved, closures, .. } => {
            assert_eq!(*resolved, date(1, 5));
            assert_eq!(closures.len(), 2);
            assert_eq!(closures[0].reason, "New Year's Day");
        }
        other => panic!("unexpected reason: {:?}", other),
    }
    assert!(result.message.contains("advanced to 2026-01-05"));
}

#[test]
fn test_two_hours_before_cut_off_is_likely() {
    let engine = engine();
    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Likely);
    assert_eq!(result.settlement_date, date(1, 6));
    assert_eq!(result.cycle_label(), "T+1");
    assert_eq!(result.markets[0].position, Some(CutOffPosition::Before));
    assert_eq!(result.markets[0].cut_offs[0].margin_seconds, Some(7200));
    assert!(result
        .message
        .contains("JP depository cut-off (14:00 local) met with 120 min to spare"));
    assert!(result
        .message
        .contains("HK depository cut-off (15:45 local) met with 285 min to spare"));
}

#[test]
fn test_warning_window_is_at_risk() {
    let engine = engine();
    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 4, 45));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::AtRisk);
    assert_eq!(result.markets[0].position, Some(CutOffPosition::Warning));
    assert_eq!(result.markets[1].position, Some(CutOffPosition::Before));
    assert_eq!(
        result.message,
        "Settlement on 2026-01-06 is at risk: JP depository cut-off (14:00 local) is only 15 min away"
    );
}

#[test]
fn test_after_one_cut_off_is_unlikely() {
    let engine = engine();
    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 5, 30));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Unlikely);
    assert_eq!(result.markets[0].position, Some(CutOffPosition::After));
    assert_eq!(result.markets[1].position, Some(CutOffPosition::Before));
    assert_eq!(result.next_viable_trade_date, Some(date(1, 6)));
    assert!(result
        .message
        .contains("Execution is 30 min past JP depository cut-off (14:00 local)"));
    assert!(result.message.contains("next viable trade date is 2026-01-06"));
}

#[test]
fn test_exact_cut_off_instant_is_after() {
    let engine = engine();
    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 5, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Unlikely);
    assert_eq!(result.markets[0].cut_offs[0].position, CutOffPosition::After);
    assert_eq!(result.markets[0].cut_offs[0].margin_seconds, Some(0));
}

#[test]
fn test_omitted_execution_time_uses_calendar_only() {
    let engine = engine();
    let result = engine.check_settlement(&jp_hk(date(1, 5))).unwrap();

    assert_eq!(result.status, SettlementStatus::Likely);
    assert!(result.reasons.contains(&Reason::ExecutionTimeOmitted));
    assert!(result.markets.iter().all(|m| m.cut_offs.is_empty()));
    assert_eq!(result.execution_within_overlap, None);
}

#[test]
fn test_local_execution_time() {
    let engine = engine();
    let local = date(1, 5).and_time(time(12, 0));
    let request = jp_hk(date(1, 5)).executed_local("JP", local);
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.execution_instant, Some(utc(1, 5, 3, 0)));
    assert_eq!(result.status, SettlementStatus::Likely);
    assert_eq!(result.markets[1].execution_local, Some(date(1, 5).and_time(time(11, 0))));
    assert_eq!(result.markets[1].session_phase, Some(SessionPhase::Morning));
    assert_eq!(result.markets[0].session_phase, Some(SessionPhase::Lunch));
}

// ============================================================================
// Configuration and data errors
// ============================================================================

#[test]
fn test_strict_mode_rejects_holiday() {
    let config = Config {
        trade_date_policy: TradeDatePolicy::Strict,
        ..Config::default()
    };
    let engine = engine_with(config);

    let result = engine.check_settlement(&jp_hk(date(1, 2)));
    match result {
        Err(Error::InvalidTradeDate { date: d, reason }) => {
            assert_eq!(d, date(1, 2));
            assert_eq!(reason, "JP: New Year Holiday");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_unknown_market_and_instrument() {
    let engine = engine();

    let unknown = SettlementRequest::new(date(1, 5), "JP", "XX");
    assert!(matches!(
        engine.check_settlement(&unknown),
        Err(Error::UnknownMarket(code)) if code == "XX"
    ));

    let warrant = jp_hk(date(1, 5)).instrument("warrant");
    assert!(matches!(
        engine.check_settlement(&warrant),
        Err(Error::UnknownInstrumentType(_))
    ));
}

#[test]
fn test_invalid_timezone_is_configuration_error() {
    let mut calendar = calendar();
    calendar
        .insert_market(Market {
            code: MarketCode::new("ZZ"),
            timezone: "Atlantis/Capital".to_string(),
            ..japan()
        })
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let request = SettlementRequest::new(date(1, 5), "JP", "ZZ");
    assert!(matches!(
        engine.check_settlement(&request),
        Err(Error::InvalidTimezone { .. })
    ));
}

#[test]
fn test_coverage_gap_is_no_business_day_found() {
    let mut calendar = calendar();
    calendar
        .set_coverage(&MarketCode::new("HK"), Coverage { start: date(1, 1), end: date(1, 6) })
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let result = engine.check_settlement(&jp_hk(date(1, 6)));
    assert!(matches!(result, Err(Error::NoBusinessDayFound { .. })));
}

#[test]
fn test_oversized_warning_window_rejected() {
    let mut config = Config::default();
    config.cut_off.warning_window_minutes = 1_000_000_000_000;
    let result = SettlementEngine::new(Arc::new(calendar()), config);
    assert!(matches!(result, Err(Error::Config(_))));

    let mut config = Config::default();
    config.cut_off.market_warning_minutes.insert("JP".to_string(), 10_000);
    let result = SettlementEngine::new(Arc::new(calendar()), config);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_zero_settlement_cycle_rejected() {
    let mut calendar = calendar();
    let result = calendar.insert_market(Market {
        code: MarketCode::new("SG"),
        settlement_cycle: 0,
        ..hong_kong()
    });
    assert!(matches!(result, Err(market_calendar::Error::InvalidData(_))));
}

#[test]
fn test_missing_cut_off_treated_as_after() {
    let mut calendar = calendar();
    calendar
        .insert_market(Market {
            code: MarketCode::new("SG"),
            name: "Singapore".to_string(),
            timezone: "Asia/Singapore".to_string(),
            cut_offs: BTreeMap::new(),
            ..hong_kong()
        })
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let request = SettlementRequest::new(date(1, 5), "JP", "SG").executed_at(utc(1, 5, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Unlikely);
    let sg = &result.markets[1];
    assert_eq!(sg.position, Some(CutOffPosition::After));
    assert!(!sg.cut_offs[0].is_defined());
    assert!(result
        .reasons
        .iter()
        .any(|r| matches!(r, Reason::NoCutOffDefined { market, .. } if market.as_str() == "SG")));
}

// ============================================================================
// Settlement dates
// ============================================================================

#[test]
fn test_lunar_new_year_aligns_value_date() {
    let engine = engine();
    let request = jp_hk(date(2, 16)).executed_at(utc(2, 16, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Likely);
    assert_eq!(result.markets[0].settlement_date, date(2, 17));
    assert_eq!(result.markets[1].settlement_date, date(2, 20));
    assert_eq!(result.markets[1].skipped_days.len(), 3);
    assert_eq!(result.settlement_date, date(2, 20));
    assert!(result.reasons.contains(&Reason::ValueDateAligned {
        market: MarketCode::new("JP"),
        scheduled: date(2, 17),
        common: date(2, 20),
    }));
}

#[test]
fn test_delay_warning_flags_long_holiday() {
    let config = Config {
        delay_warning_days: Some(3),
        ..Config::default()
    };
    let engine = engine_with(config);
    let request = jp_hk(date(2, 16)).executed_at(utc(2, 16, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::AtRisk);
    assert_eq!(result.calendar_days_to_settle(), 4);
    assert!(result.message.contains("4 calendar days after the trade date"));
}

#[test]
fn test_bond_cycle_override_and_instrument_cut_offs() {
    let mut config = Config::default();
    config
        .instruments
        .get_mut("bond")
        .unwrap()
        .cut_offs
        .push("wire".to_string());
    let engine = engine_with(config);

    let request = jp_hk(date(1, 5)).instrument("Bond").executed_at(utc(1, 5, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.markets[0].cycle, 1);
    assert_eq!(result.markets[1].cycle, 2);
    assert_eq!(result.settlement_date, date(1, 7));
    assert_eq!(result.cycle_label(), "T+2");
    assert_eq!(result.markets[0].cut_offs.len(), 1);
    let hk_cut_offs: Vec<&str> = result.markets[1].cut_offs.iter().map(|c| c.cut_off.as_str()).collect();
    assert_eq!(hk_cut_offs, vec!["depository", "wire"]);
}

#[test]
fn test_cycle_override_key_is_case_insensitive() {
    let mut cycle_overrides = BTreeMap::new();
    cycle_overrides.insert("Bond".to_string(), 2);
    let mut calendar = calendar();
    calendar
        .insert_market(Market {
            cycle_overrides,
            ..hong_kong()
        })
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let request = jp_hk(date(1, 5)).instrument("bond");
    let result = engine.check_settlement(&request).unwrap();
    assert_eq!(result.markets[1].cycle, 2);
    assert_eq!(result.settlement_date, date(1, 7));
}

#[test]
fn test_special_closure_override() {
    let mut calendar = calendar();
    calendar
        .add_holiday(Holiday::special_closure("HK", date(1, 7), "Typhoon Signal No. 8"))
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let result = engine.check_settlement(&jp_hk(date(1, 6))).unwrap();
    assert_eq!(result.markets[0].settlement_date, date(1, 7));
    assert_eq!(result.markets[1].settlement_date, date(1, 8));
    assert_eq!(result.markets[1].skipped_days[0].reason, "Typhoon Signal No. 8");
    assert_eq!(result.settlement_date, date(1, 8));
}

#[test]
fn test_same_market_trade() {
    let engine = engine();
    let request = SettlementRequest::new(date(1, 5), "JP", "jp").executed_at(utc(1, 5, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.status, SettlementStatus::Likely);
    assert_eq!(result.markets.len(), 1);
    assert_eq!(result.settlement_date, date(1, 6));
    assert_eq!(result.overlap.len(), 2);
}

#[test]
fn test_dst_shifts_us_cut_off() {
    let engine = engine();

    // 11:30 EST is 16:30Z in January
    let winter = SettlementRequest::new(date(1, 15), "US", "US").executed_at(utc(1, 15, 15, 45));
    let result = engine.check_settlement(&winter).unwrap();
    assert_eq!(result.status, SettlementStatus::Likely);

    // 11:30 EDT is 15:30Z in July
    let summer = SettlementRequest::new(date(7, 15), "US", "US").executed_at(utc(7, 15, 15, 45));
    let result = engine.check_settlement(&summer).unwrap();
    assert_eq!(result.status, SettlementStatus::Unlikely);
    assert_eq!(result.markets[0].cut_offs[0].deadline, Some(utc(7, 15, 15, 30)));
}

// ============================================================================
// Trade-date context
// ============================================================================

#[test]
fn test_deadlines_and_overlap() {
    let engine = engine();
    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 2, 0));
    let result = engine.check_settlement(&request).unwrap();

    let order: Vec<(String, &str)> = result
        .deadlines
        .iter()
        .map(|d| (d.market.to_string(), d.name.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("JP".to_string(), "depository"),
            ("JP".to_string(), "close"),
            ("HK".to_string(), "depository"),
            ("HK".to_string(), "close"),
        ]
    );
    assert!(result.deadlines.iter().all(|d| d.passed == Some(false)));

    assert_eq!(result.overlap.len(), 3);
    assert_eq!(result.execution_within_overlap, Some(true));
}

#[test]
fn test_half_day_close_in_deadlines() {
    let engine = engine();
    let result = engine
        .check_settlement(&SettlementRequest::new(date(12, 24), "HK", "HK"))
        .unwrap();

    let close = result
        .deadlines
        .iter()
        .find(|d| d.kind == DeadlineKind::MarketClose)
        .unwrap();
    assert_eq!(close.local_time, time(12, 0));
    // Dec 25 closed, Dec 26-27 weekend
    assert_eq!(result.settlement_date, date(12, 28));
}

// ============================================================================
// Calendar views
// ============================================================================

#[test]
fn test_common_business_days() {
    let engine = engine();
    let (jp, hk) = (MarketCode::new("JP"), MarketCode::new("HK"));

    let days = engine.common_business_days(&jp, &hk, date(2, 9), date(2, 24)).unwrap();
    assert_eq!(
        days,
        vec![date(2, 9), date(2, 10), date(2, 12), date(2, 13), date(2, 16), date(2, 20), date(2, 24)]
    );

    assert!(matches!(
        engine.common_business_days(&jp, &MarketCode::new("XX"), date(2, 9), date(2, 10)),
        Err(Error::UnknownMarket(_))
    ));
}

#[test]
fn test_day_comparison() {
    let engine = engine();
    let days = engine
        .day_comparison(&MarketCode::new("JP"), &MarketCode::new("HK"), date(1, 1), date(1, 7))
        .unwrap();

    assert_eq!(days.len(), 7);
    assert!(days[0].any_holiday());
    assert!(!days[1].both_trading());
    assert!(days[4].both_trading());
    assert!(days[4].both_settlement());
}

#[test]
fn test_day_comparison_checks_markets_for_empty_range() {
    let engine = engine();
    let (jp, unknown) = (MarketCode::new("JP"), MarketCode::new("XX"));

    assert!(matches!(
        engine.day_comparison(&jp, &unknown, date(1, 7), date(1, 1)),
        Err(Error::UnknownMarket(code)) if code == "XX"
    ));
    assert!(engine
        .day_comparison(&jp, &MarketCode::new("HK"), date(1, 7), date(1, 1))
        .unwrap()
        .is_empty());
}

#[test]
fn test_market_snapshot_during_lunch() {
    let engine = engine();
    let snapshot = engine
        .market_snapshot(&MarketCode::new("JP"), utc(1, 5, 2, 45))
        .unwrap();

    assert_eq!(snapshot.phase, SessionPhase::Lunch);
    assert!(!snapshot.is_open());
    assert_eq!(snapshot.next_open, Some(utc(1, 5, 3, 30)));
    assert_eq!(snapshot.next_close, None);
    assert_eq!(snapshot.cut_offs.len(), 1);
    assert_eq!(snapshot.cut_offs[0].position, CutOffPosition::Before);
}

#[test]
fn test_market_snapshot_on_holiday() {
    let engine = engine();
    let snapshot = engine
        .market_snapshot(&MarketCode::new("HK"), utc(2, 17, 3, 0))
        .unwrap();

    assert_eq!(snapshot.phase, SessionPhase::Closed);
    assert_eq!(snapshot.day.closure_reason().as_deref(), Some("Lunar New Year"));
    assert!(snapshot.cut_offs.is_empty());
    // Feb 18-19 holidays, next open Fri Feb 20 09:30 HKT
    assert_eq!(snapshot.next_open, Some(utc(2, 20, 1, 30)));
}

#[test]
fn test_pair_snapshot_while_both_trade() {
    let engine = engine();
    let (jp, hk) = (MarketCode::new("JP"), MarketCode::new("HK"));

    // 11:00 JST, 10:00 HKT: both in the morning session
    let pair = engine.pair_snapshot(&jp, &hk, utc(1, 5, 2, 0)).unwrap();
    assert!(pair.both_open);
    assert!(pair.both_trading_today);
    assert_eq!(pair.offset_difference_minutes, 60);
    assert_eq!(pair.offset_difference_hours(), 1.0);
    let window = pair.next_overlap.unwrap();
    assert_eq!((window.start, window.end), (utc(1, 5, 1, 30), utc(1, 5, 2, 30)));
}

#[test]
fn test_pair_snapshot_during_lunch_and_after_close() {
    let engine = engine();
    let (jp, hk) = (MarketCode::new("JP"), MarketCode::new("HK"));

    let lunch = engine.pair_snapshot(&jp, &hk, utc(1, 5, 3, 0)).unwrap();
    assert!(!lunch.both_open);
    assert!(lunch.market_b.is_open());
    assert_eq!(lunch.next_overlap.unwrap().start, utc(1, 5, 3, 30));

    // Friday evening: next overlap is Monday morning
    let weekend = engine.pair_snapshot(&jp, &hk, utc(1, 9, 7, 0)).unwrap();
    assert!(!weekend.both_open);
    assert_eq!(weekend.next_overlap.unwrap().start, utc(1, 12, 1, 30));
}

#[test]
fn test_pair_snapshot_offset_across_us_dst() {
    let engine = engine();
    let (jp, us) = (MarketCode::new("JP"), MarketCode::new("US"));

    let before = engine.pair_snapshot(&jp, &us, utc(3, 6, 12, 0)).unwrap();
    assert_eq!(before.offset_difference_minutes, 14 * 60);

    let after = engine.pair_snapshot(&jp, &us, utc(3, 9, 12, 0)).unwrap();
    assert_eq!(after.offset_difference_minutes, 13 * 60);
    assert!(after.both_trading_today);
    assert!(!after.both_open);
    // Tokyo and New York sessions never coincide
    assert_eq!(after.next_overlap, None);

    assert!(matches!(
        engine.pair_snapshot(&jp, &MarketCode::new("XX"), utc(3, 9, 12, 0)),
        Err(Error::UnknownMarket(_))
    ));
}

// ============================================================================
// Engine properties
// ============================================================================

#[test]
fn test_deterministic_results() {
    let engine = engine();
    let request = jp_hk(date(2, 16)).executed_at(utc(2, 16, 4, 50));

    let first = engine.check_settlement(&request).unwrap();
    let second = engine.check_settlement(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_provider_called_once_per_key() {
    let provider = Arc::new(RecordingProvider::new(calendar()));
    let config = Config {
        delay_warning_days: Some(10),
        ..Config::default()
    };
    let engine = SettlementEngine::new(provider.clone(), config).unwrap();

    let request = jp_hk(date(2, 14)).executed_at(utc(2, 16, 3, 0));
    let result = engine.check_settlement(&request).unwrap();

    assert_eq!(result.trade_date, date(2, 16));
    assert!(provider.total_calls() > 0);
    assert_eq!(provider.max_calls_per_key(), 1);
}

#[test]
fn test_concurrent_checks() {
    let engine = engine();
    let requests: Vec<SettlementRequest> = vec![
        jp_hk(date(1, 5)).executed_at(utc(1, 5, 3, 0)),
        jp_hk(date(1, 5)).executed_at(utc(1, 5, 4, 45)),
        SettlementRequest::new(date(2, 16), "HK", "US").executed_at(utc(2, 16, 3, 0)),
        SettlementRequest::new(date(7, 2), "US", "JP"),
    ];
    let sequential: Vec<SettlementResult> = requests
        .iter()
        .map(|r| engine.check_settlement(r).unwrap())
        .collect();

    let engine = &engine;
    let parallel: Vec<SettlementResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|r| scope.spawn(move || engine.check_settlement(r).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn test_cached_calendar_shared_between_engines() {
    let cache = Arc::new(market_calendar::CachedCalendar::new(calendar()));
    let first = SettlementEngine::new(cache.clone(), Config::default()).unwrap();
    let second = SettlementEngine::new(cache.clone(), Config::default()).unwrap();

    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 3, 0));
    let a = first.check_settlement(&request).unwrap();
    let b = second.check_settlement(&request).unwrap();

    assert_eq!(a, b);
    assert!(cache.cached_days() > 0);
}

#[test]
fn test_empty_static_calendar() {
    let engine = SettlementEngine::new(Arc::new(StaticCalendar::new()), Config::default()).unwrap();
    assert!(matches!(
        engine.check_settlement(&jp_hk(date(1, 5))),
        Err(Error::UnknownMarket(_))
    ));
}

#[test]
fn test_bundled_calendar_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/calendars.toml");
    let calendar = market_calendar::CalendarData::from_file(path)
        .unwrap()
        .into_calendar()
        .unwrap();
    let engine = SettlementEngine::new(Arc::new(calendar), Config::default()).unwrap();

    let request = jp_hk(date(1, 5)).executed_at(utc(1, 5, 3, 0));
    let result = engine.check_settlement(&request).unwrap();
    assert_eq!(result.status, SettlementStatus::Likely);
    assert_eq!(result.settlement_date, date(1, 6));

    // Coverage ends with the year
    let year_end = SettlementRequest::new(date(12, 30), "JP", "US");
    assert!(matches!(
        engine.check_settlement(&year_end),
        Err(Error::NoBusinessDayFound { .. })
    ));
}
