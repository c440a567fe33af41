//! Main settlement engine
//!
//! Orchestrates trade-date validation, business-day resolution, cut-off
//! evaluation and status classification for one request at a time.

use crate::{
    business_day::BusinessDayResolver,
    config::{Config, InstrumentConfig, TradeDatePolicy},
    cutoff::CutOffEvaluator,
    memo::RequestCalendar,
    sessions::SessionView,
    timezone::TimezoneNormalizer,
    types::*,
    Error, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use market_calendar::{CalendarProvider, Market, MarketCode};
use std::sync::Arc;

/// Shared calendar handle
pub type SharedCalendar = Arc<dyn CalendarProvider + Send + Sync>;

/// Status from the classification inputs, first match wins:
/// `Unlikely` if the trade date was invalid or any cut-off is passed,
/// `AtRisk` if any cut-off is imminent or settlement is delayed,
/// `Likely` otherwise.
pub fn classify_status(
    trade_date_valid: bool,
    worst_position: Option<CutOffPosition>,
    delayed: bool,
) -> SettlementStatus {
    if !trade_date_valid || worst_position == Some(CutOffPosition::After) {
        SettlementStatus::Unlikely
    } else if worst_position == Some(CutOffPosition::Warning) || delayed {
        SettlementStatus::AtRisk
    } else {
        SettlementStatus::Likely
    }
}

/// Settlement engine
pub struct SettlementEngine {
    /// Calendar provider
    calendar: SharedCalendar,

    /// Timezone normalizer
    normalizer: TimezoneNormalizer,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-market working state while a check runs
struct Leg {
    market: Market,
    cut_offs: Vec<CutOffEvaluation>,
    position: Option<CutOffPosition>,
    path: SettlementPath,
    cycle: u32,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(calendar: SharedCalendar, config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Settlement engine ready: horizon {} days, warning window {} min, {:?} trade dates",
            config.business_days.max_horizon_days,
            config.cut_off.warning_window_minutes,
            config.trade_date_policy
        );

        Ok(Self {
            calendar,
            normalizer: TimezoneNormalizer::new(),
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether a trade will settle on its expected value date
    pub fn check_settlement(&self, request: &SettlementRequest) -> Result<SettlementResult> {
        let memo = RequestCalendar::new(self.calendar.as_ref());
        let resolver = BusinessDayResolver::new(&memo, self.config.business_days.max_horizon_days);
        let sessions = SessionView::new(&memo, self.normalizer);

        // Step 1: Resolve markets, zones and instrument
        let buy = memo.market(&request.buy_market)?;
        let sell = memo.market(&request.sell_market)?;
        self.normalizer.zone(&buy)?;
        self.normalizer.zone(&sell)?;
        let instrument = self.config.instrument(&request.instrument)?;
        let instrument_key = request.instrument.trim().to_ascii_lowercase();

        let markets: Vec<Market> = if buy.code == sell.code {
            vec![buy]
        } else {
            vec![buy, sell]
        };
        let codes: Vec<MarketCode> = markets.iter().map(|m| m.code.clone()).collect();

        // Step 2: Validate trade date
        let mut reasons = Vec::new();
        let requested = request.trade_date;
        let closures = self.closures(&memo, &codes, requested)?;
        let trade_date = if closures.is_empty() {
            requested
        } else {
            let detail = describe_closures(&closures);
            if self.config.trade_date_policy == TradeDatePolicy::Strict {
                return Err(Error::InvalidTradeDate {
                    date: requested,
                    reason: detail,
                });
            }

            let resolved = resolver.next_common_day_among(&codes, requested, DayRule::Business)?;
            tracing::info!(
                "Trade date {} not a common business day ({}), advanced to {}",
                requested,
                detail,
                resolved
            );
            reasons.push(Reason::TradeDateAdvanced {
                requested,
                resolved,
                closures,
            });
            resolved
        };
        let trade_date_valid = trade_date == requested;

        // Step 3: Normalize execution time
        let instant = match &request.execution {
            None => {
                reasons.push(Reason::ExecutionTimeOmitted);
                None
            }
            Some(ExecutionTime::Absolute { at }) => Some(*at),
            Some(ExecutionTime::Local { market, at }) => {
                let market = memo.market(market)?;
                Some(self.normalizer.to_absolute(*at, &market)?)
            }
        };

        // Step 4: Evaluate cut-offs and count settlement cycles per market
        let evaluator = CutOffEvaluator::new(&memo, self.normalizer, &self.config.cut_off);
        let mut legs = Vec::with_capacity(markets.len());
        for market in markets {
            let cut_offs = match instant {
                Some(at) => {
                    let names = self.cut_off_names(&market, instrument);
                    self.evaluate_cut_offs(&evaluator, at, &market, trade_date, &names, &mut reasons)?
                }
                None => Vec::new(),
            };
            let position = cut_offs.iter().map(|e| e.position).max();

            // Step 5: Per-market settlement date
            let cycle = market.cycle_for(&instrument_key);
            let path =
                resolver.settlement_path(&market.code, trade_date, cycle, self.config.value_date_rule)?;

            legs.push(Leg {
                market,
                cut_offs,
                position,
                path,
                cycle,
            });
        }

        // Common value date from the latest per-market date
        let latest = legs.iter().map(|l| l.path.date).max().unwrap_or(trade_date);
        let settlement_date =
            resolver.next_common_day_among(&codes, latest, self.config.value_date_rule)?;
        for leg in &legs {
            if leg.path.date != settlement_date {
                reasons.push(Reason::ValueDateAligned {
                    market: leg.market.code.clone(),
                    scheduled: leg.path.date,
                    common: settlement_date,
                });
            }
        }

        let calendar_days = (settlement_date - trade_date).num_days();
        let delayed = match self.config.delay_warning_days {
            Some(threshold) if calendar_days > i64::from(threshold) => {
                reasons.push(Reason::SettlementDelayed {
                    settlement_date,
                    calendar_days,
                    threshold_days: threshold,
                });
                true
            }
            _ => false,
        };

        // Step 6: Classify
        let worst = legs.iter().filter_map(|l| l.position).max();
        let status = classify_status(trade_date_valid, worst, delayed);

        let next_viable_trade_date = match status {
            SettlementStatus::Unlikely => next_viable_trade_date(&resolver, &codes, trade_date)?,
            _ => None,
        };

        // Trade-date context: deadlines and simultaneous trading
        let overlap = sessions.overlap(&request.buy_market, &request.sell_market, trade_date)?;
        let execution_within_overlap = instant.map(|at| overlap.iter().any(|w| w.contains(at)));
        let deadlines = self.deadlines(&sessions, &legs, trade_date, instant)?;

        let mut markets = Vec::with_capacity(legs.len());
        for leg in legs {
            let (execution_local, session_phase) = match instant {
                Some(at) => (
                    Some(self.normalizer.to_local(at, &leg.market)?),
                    Some(sessions.phase_at(&leg.market, at)?),
                ),
                None => (None, None),
            };
            markets.push(MarketLeg {
                market: leg.market.code,
                cycle: leg.cycle,
                settlement_date: leg.path.date,
                skipped_days: leg.path.skipped,
                cut_offs: leg.cut_offs,
                position: leg.position,
                execution_local,
                session_phase,
            });
        }

        let message = compose_message(status, settlement_date, &reasons, next_viable_trade_date);
        tracing::info!(
            "Settlement check {} T={} {}: {} (value date {})",
            request.market_pair(),
            trade_date,
            request.instrument,
            status,
            settlement_date
        );

        Ok(SettlementResult {
            status,
            message,
            requested_trade_date: requested,
            trade_date,
            trade_date_advanced: !trade_date_valid,
            settlement_date,
            execution_instant: instant,
            markets,
            reasons,
            deadlines,
            overlap,
            execution_within_overlap,
            next_viable_trade_date,
        })
    }

    /// Dates in `[start, end]` that are business days in both markets
    pub fn common_business_days(
        &self,
        a: &MarketCode,
        b: &MarketCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let memo = RequestCalendar::new(self.calendar.as_ref());
        memo.market(a)?;
        memo.market(b)?;
        BusinessDayResolver::new(&memo, self.config.business_days.max_horizon_days)
            .common_business_days(a, b, start, end)
    }

    /// Calendar facts for both markets on every date in `[start, end]`
    pub fn day_comparison(
        &self,
        a: &MarketCode,
        b: &MarketCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CommonDayInfo>> {
        let memo = RequestCalendar::new(self.calendar.as_ref());
        memo.market(a)?;
        memo.market(b)?;
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| {
                Ok(CommonDayInfo {
                    date,
                    market_a: memo.calendar_day(a, date)?,
                    market_b: memo.calendar_day(b, date)?,
                })
            })
            .collect()
    }

    /// Windows on `date` when both markets trade
    pub fn trading_overlap(&self, a: &MarketCode, b: &MarketCode, date: NaiveDate) -> Result<Vec<OverlapWindow>> {
        let memo = RequestCalendar::new(self.calendar.as_ref());
        SessionView::new(&memo, self.normalizer).overlap(a, b, date)
    }

    /// State of a market at an instant
    pub fn market_snapshot(&self, code: &MarketCode, at: DateTime<Utc>) -> Result<MarketSnapshot> {
        let memo = RequestCalendar::new(self.calendar.as_ref());
        let sessions = SessionView::new(&memo, self.normalizer);
        let evaluator = CutOffEvaluator::new(&memo, self.normalizer, &self.config.cut_off);

        let market = memo.market(code)?;
        let local_time = self.normalizer.to_local(at, &market)?;
        let date = local_time.date();
        let day = memo.calendar_day(code, date)?;
        let phase = sessions.phase_at(&market, at)?;

        let (next_open, next_close) = if phase.is_trading() {
            (None, sessions.current_close(&market, at)?)
        } else {
            let horizon = self.config.business_days.max_horizon_days;
            (sessions.next_open(&market, at, horizon)?, None)
        };

        let cut_offs = memo
            .cut_offs(code, date)?
            .keys()
            .map(|name| evaluator.evaluate(at, code, date, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(MarketSnapshot {
            market: market.code,
            at,
            local_time,
            day,
            phase,
            next_open,
            next_close,
            cut_offs,
        })
    }

    /// Both markets at one instant, with the current or next window when
    /// both trade
    pub fn pair_snapshot(&self, a: &MarketCode, b: &MarketCode, at: DateTime<Utc>) -> Result<PairSnapshot> {
        let market_a = self.market_snapshot(a, at)?;
        let market_b = self.market_snapshot(b, at)?;

        let memo = RequestCalendar::new(self.calendar.as_ref());
        let sessions = SessionView::new(&memo, self.normalizer);
        let descriptor_a = memo.market(a)?;
        let descriptor_b = memo.market(b)?;
        let offset_difference_minutes = self.normalizer.utc_offset_minutes(at, &descriptor_a)?
            - self.normalizer.utc_offset_minutes(at, &descriptor_b)?;

        let horizon = self.config.business_days.max_horizon_days as usize;
        let mut next_overlap = None;
        for date in market_a.local_time.date().iter_days().take(horizon + 1) {
            next_overlap = sessions
                .overlap(a, b, date)?
                .into_iter()
                .find(|window| window.end > at);
            if next_overlap.is_some() {
                break;
            }
        }
        if next_overlap.is_none() {
            tracing::debug!("No {}/{} overlap within {} days of {}", a, b, horizon, at);
        }

        Ok(PairSnapshot {
            both_open: market_a.is_open() && market_b.is_open(),
            both_trading_today: market_a.day.is_business_day && market_b.day.is_business_day,
            market_a,
            market_b,
            offset_difference_minutes,
            next_overlap,
        })
    }

    fn closures(
        &self,
        calendar: &dyn CalendarProvider,
        codes: &[MarketCode],
        date: NaiveDate,
    ) -> Result<Vec<MarketClosure>> {
        let mut closures = Vec::new();
        for code in codes {
            if let Some(reason) = calendar.calendar_day(code, date)?.closure_reason() {
                closures.push(MarketClosure {
                    market: code.clone(),
                    reason,
                });
            }
        }
        Ok(closures)
    }

    /// Primary cut-off first, then instrument cut-offs the market defines
    fn cut_off_names(&self, market: &Market, instrument: &InstrumentConfig) -> Vec<String> {
        let primary = &self.config.cut_off.primary;
        let mut names = vec![primary.clone()];
        for name in &instrument.cut_offs {
            if name != primary && market.cut_offs.contains_key(name) && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn evaluate_cut_offs(
        &self,
        evaluator: &CutOffEvaluator<'_>,
        at: DateTime<Utc>,
        market: &Market,
        date: NaiveDate,
        names: &[String],
        reasons: &mut Vec<Reason>,
    ) -> Result<Vec<CutOffEvaluation>> {
        let mut evaluations = Vec::with_capacity(names.len());
        for name in names {
            match evaluator.evaluate(at, &market.code, date, name) {
                Ok(evaluation) => {
                    reasons.extend(cut_off_reason(&evaluation));
                    evaluations.push(evaluation);
                }
                Err(Error::NoCutOffDefined { .. }) => {
                    tracing::warn!(
                        "{} has no {} cut-off on {}, treating as passed",
                        market.code,
                        name,
                        date
                    );
                    reasons.push(Reason::NoCutOffDefined {
                        market: market.code.clone(),
                        cut_off: name.clone(),
                        date,
                    });
                    evaluations.push(CutOffEvaluation::undefined(market.code.clone(), name.clone(), date));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(evaluations)
    }

    fn deadlines(
        &self,
        sessions: &SessionView<'_>,
        legs: &[Leg],
        date: NaiveDate,
        instant: Option<DateTime<Utc>>,
    ) -> Result<Vec<Deadline>> {
        let mut deadlines = Vec::new();
        for leg in legs {
            for evaluation in &leg.cut_offs {
                if let (Some(local_time), Some(at)) = (evaluation.local_time, evaluation.deadline) {
                    deadlines.push(Deadline {
                        market: leg.market.code.clone(),
                        kind: DeadlineKind::CutOff,
                        name: evaluation.cut_off.clone(),
                        local_time,
                        at,
                        passed: instant.map(|i| i >= at),
                    });
                }
            }

            if let Some((_, close)) = sessions.absolute_sessions(&leg.market, date)?.last() {
                deadlines.push(Deadline {
                    market: leg.market.code.clone(),
                    kind: DeadlineKind::MarketClose,
                    name: "close".to_string(),
                    local_time: self.normalizer.to_local(*close, &leg.market)?.time(),
                    at: *close,
                    passed: instant.map(|i| i >= *close),
                });
            }
        }
        deadlines.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.market.cmp(&b.market)));
        Ok(deadlines)
    }
}

/// Next common business day after `trade_date`, or `None` when calendar
/// data runs out before one is found
fn next_viable_trade_date(
    resolver: &BusinessDayResolver<'_>,
    codes: &[MarketCode],
    trade_date: NaiveDate,
) -> Result<Option<NaiveDate>> {
    let next = match trade_date.succ_opt() {
        Some(next) => next,
        None => return Ok(None),
    };
    match resolver.next_common_day_among(codes, next, DayRule::Business) {
        Ok(date) => Ok(Some(date)),
        Err(Error::NoBusinessDayFound { .. }) => {
            tracing::debug!("No viable trade date found after {}", trade_date);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn describe_closures(closures: &[MarketClosure]) -> String {
    closures
        .iter()
        .map(|c| format!("{}: {}", c.market, c.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

fn cut_off_reason(evaluation: &CutOffEvaluation) -> Option<Reason> {
    let market = evaluation.market.clone();
    let cut_off = evaluation.cut_off.clone();
    let local_time = evaluation.local_time?;
    let margin_minutes = evaluation.margin_seconds? / 60;

    Some(match evaluation.position {
        CutOffPosition::After => Reason::CutOffPassed {
            market,
            cut_off,
            local_time,
            minutes_late: -margin_minutes,
        },
        CutOffPosition::Warning => Reason::CutOffImminent {
            market,
            cut_off,
            local_time,
            minutes_remaining: margin_minutes,
        },
        CutOffPosition::Before => Reason::CutOffMet {
            market,
            cut_off,
            local_time,
            minutes_remaining: margin_minutes,
        },
    })
}

fn compose_message(
    status: SettlementStatus,
    settlement_date: NaiveDate,
    reasons: &[Reason],
    next_viable: Option<NaiveDate>,
) -> String {
    let headline = match status {
        SettlementStatus::Likely => format!("Settlement on {} is likely", settlement_date),
        SettlementStatus::AtRisk => format!("Settlement on {} is at risk", settlement_date),
        SettlementStatus::Unlikely => format!("Settlement on {} is unlikely", settlement_date),
    };

    let mut details: Vec<String> = reasons
        .iter()
        .filter(|r| r.severity() == status)
        .map(|r| r.to_string())
        .collect();
    if let Some(date) = next_viable {
        details.push(format!("next viable trade date is {}", date));
    }

    if details.is_empty() {
        headline
    } else {
        format!("{}: {}", headline, details.join("; "))
    }
}
