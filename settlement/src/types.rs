//! Settlement check request and result types

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use market_calendar::{CalendarDay, MarketCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which calendar predicate a day must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRule {
    /// Trading (business) day
    Business,
    /// Settlement day
    Settlement,
}

/// Execution instant as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionTime {
    /// Absolute instant
    Absolute {
        /// UTC instant
        at: DateTime<Utc>,
    },
    /// Wall-clock time in a market's timezone
    Local {
        /// Market whose timezone applies
        market: MarketCode,
        /// Local date and time
        at: NaiveDateTime,
    },
}

/// Settlement check request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Trade date (T)
    pub trade_date: NaiveDate,

    /// Buy-side market
    pub buy_market: MarketCode,

    /// Sell-side market
    pub sell_market: MarketCode,

    /// Execution time; cut-offs are skipped when absent
    pub execution: Option<ExecutionTime>,

    /// Instrument type
    pub instrument: String,
}

impl SettlementRequest {
    /// Create an equity request without execution time
    pub fn new(
        trade_date: NaiveDate,
        buy_market: impl Into<MarketCode>,
        sell_market: impl Into<MarketCode>,
    ) -> Self {
        Self {
            trade_date,
            buy_market: buy_market.into(),
            sell_market: sell_market.into(),
            execution: None,
            instrument: "equity".to_string(),
        }
    }

    /// Set an absolute execution instant
    pub fn executed_at(mut self, at: DateTime<Utc>) -> Self {
        self.execution = Some(ExecutionTime::Absolute { at });
        self
    }

    /// Set a market-local execution time
    pub fn executed_local(mut self, market: impl Into<MarketCode>, at: NaiveDateTime) -> Self {
        self.execution = Some(ExecutionTime::Local {
            market: market.into(),
            at,
        });
        self
    }

    /// Set the instrument type
    pub fn instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = instrument.into();
        self
    }

    /// Market pair label, e.g. `JP/HK`
    pub fn market_pair(&self) -> String {
        format!("{}/{}", self.buy_market, self.sell_market)
    }
}

/// Overall settlement outlook, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    /// Settles on the computed value date
    Likely,
    /// Settles only if instructions beat an imminent cut-off
    AtRisk,
    /// Will not settle on the expected value date
    Unlikely,
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementStatus::Likely => write!(f, "LIKELY"),
            SettlementStatus::AtRisk => write!(f, "AT_RISK"),
            SettlementStatus::Unlikely => write!(f, "UNLIKELY"),
        }
    }
}

/// Position of an instant relative to a cut-off.
///
/// Ordered from best to worst, so the maximum of several positions is the
/// most conservative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CutOffPosition {
    /// Earlier than the warning window
    Before,
    /// Inside the warning window
    Warning,
    /// At or after the cut-off
    After,
}

/// Result of evaluating one cut-off for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutOffEvaluation {
    /// Market code
    pub market: MarketCode,

    /// Cut-off name
    pub cut_off: String,

    /// Date the cut-off applies to
    pub date: NaiveDate,

    /// Local cut-off time, `None` if undefined that day
    pub local_time: Option<NaiveTime>,

    /// Cut-off as an absolute instant
    pub deadline: Option<DateTime<Utc>>,

    /// Classification of the execution instant
    pub position: CutOffPosition,

    /// Seconds from the instant to the deadline (negative once passed)
    pub margin_seconds: Option<i64>,
}

impl CutOffEvaluation {
    /// Evaluation for a cut-off the market does not define on `date`
    pub fn undefined(market: MarketCode, cut_off: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            market,
            cut_off: cut_off.into(),
            date,
            local_time: None,
            deadline: None,
            position: CutOffPosition::After,
            margin_seconds: None,
        }
    }

    /// Whether the cut-off existed on the date
    pub fn is_defined(&self) -> bool {
        self.local_time.is_some()
    }
}

/// A day skipped while counting the settlement cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDay {
    /// Skipped date
    pub date: NaiveDate,
    /// Closure reason (weekend, holiday name)
    pub reason: String,
}

/// Settlement path for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPath {
    /// Settlement date reached
    pub date: NaiveDate,
    /// Days passed over on the way
    pub skipped: Vec<SkippedDay>,
}

/// Trading phase of a market at a local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before the first session opens
    PreMarket,
    /// First of several sessions
    Morning,
    /// Between sessions
    Lunch,
    /// Last of several sessions
    Afternoon,
    /// Single or intermediate session
    Regular,
    /// After the last session closes
    PostMarket,
    /// No trading that day
    Closed,
}

impl SessionPhase {
    /// Whether the market is trading
    pub fn is_trading(&self) -> bool {
        matches!(
            self,
            SessionPhase::Morning | SessionPhase::Afternoon | SessionPhase::Regular
        )
    }
}

/// Interval during which two markets trade simultaneously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapWindow {
    /// Overlap start
    pub start: DateTime<Utc>,
    /// Overlap end (exclusive)
    pub end: DateTime<Utc>,
    /// Start in the first market's local time
    pub start_local_a: NaiveDateTime,
    /// End in the first market's local time
    pub end_local_a: NaiveDateTime,
    /// Start in the second market's local time
    pub start_local_b: NaiveDateTime,
    /// End in the second market's local time
    pub end_local_b: NaiveDateTime,
    /// Length in minutes
    pub duration_minutes: i64,
}

impl OverlapWindow {
    /// Whether `instant` lies inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Kind of operational deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    /// Named settlement cut-off
    CutOff,
    /// Close of the last trading session
    MarketClose,
}

/// Operational deadline on the trade date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    /// Market code
    pub market: MarketCode,
    /// Deadline kind
    pub kind: DeadlineKind,
    /// Cut-off name or `close`
    pub name: String,
    /// Local time
    pub local_time: NaiveTime,
    /// Absolute instant
    pub at: DateTime<Utc>,
    /// Whether the execution instant is at or past the deadline
    pub passed: Option<bool>,
}

/// Why a market is closed on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketClosure {
    /// Market code
    pub market: MarketCode,
    /// Closure reason
    pub reason: String,
}

/// A contributing factor to the settlement status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// Trade date was not a common business day and was moved forward
    TradeDateAdvanced {
        /// Requested trade date
        requested: NaiveDate,
        /// Trade date used
        resolved: NaiveDate,
        /// Closed markets on the requested date
        closures: Vec<MarketClosure>,
    },
    /// No execution time given
    ExecutionTimeOmitted,
    /// Execution at or after a cut-off
    CutOffPassed {
        /// Market code
        market: MarketCode,
        /// Cut-off name
        cut_off: String,
        /// Local cut-off time
        local_time: NaiveTime,
        /// Minutes past the cut-off
        minutes_late: i64,
    },
    /// Execution inside a cut-off's warning window
    CutOffImminent {
        /// Market code
        market: MarketCode,
        /// Cut-off name
        cut_off: String,
        /// Local cut-off time
        local_time: NaiveTime,
        /// Minutes left
        minutes_remaining: i64,
    },
    /// Execution comfortably before a cut-off
    CutOffMet {
        /// Market code
        market: MarketCode,
        /// Cut-off name
        cut_off: String,
        /// Local cut-off time
        local_time: NaiveTime,
        /// Minutes left
        minutes_remaining: i64,
    },
    /// Market has no cut-off on the trade date
    NoCutOffDefined {
        /// Market code
        market: MarketCode,
        /// Cut-off name
        cut_off: String,
        /// Trade date
        date: NaiveDate,
    },
    /// A market's own value date was moved to the common value date
    ValueDateAligned {
        /// Market code
        market: MarketCode,
        /// Market's own settlement date
        scheduled: NaiveDate,
        /// Common settlement date
        common: NaiveDate,
    },
    /// Value date unusually far from the trade date
    SettlementDelayed {
        /// Common settlement date
        settlement_date: NaiveDate,
        /// Calendar days after the trade date
        calendar_days: i64,
        /// Configured threshold
        threshold_days: u32,
    },
}

impl Reason {
    /// Status this reason drives the result towards
    pub fn severity(&self) -> SettlementStatus {
        match self {
            Reason::TradeDateAdvanced { .. }
            | Reason::CutOffPassed { .. }
            | Reason::NoCutOffDefined { .. } => SettlementStatus::Unlikely,
            Reason::CutOffImminent { .. } | Reason::SettlementDelayed { .. } => {
                SettlementStatus::AtRisk
            }
            Reason::ExecutionTimeOmitted
            | Reason::CutOffMet { .. }
            | Reason::ValueDateAligned { .. } => SettlementStatus::Likely,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::TradeDateAdvanced {
                requested,
                resolved,
                closures,
            } => {
                let detail: Vec<String> = closures
                    .iter()
                    .map(|c| format!("{}: {}", c.market, c.reason))
                    .collect();
                write!(
                    f,
                    "Trade date {} is not a common business day ({}); advanced to {}",
                    requested,
                    detail.join("; "),
                    resolved
                )
            }
            Reason::ExecutionTimeOmitted => {
                write!(f, "No execution time given; cut-offs not evaluated")
            }
            Reason::CutOffPassed {
                market,
                cut_off,
                local_time,
                minutes_late,
            } => write!(
                f,
                "Execution is {} min past {} {} cut-off ({} local)",
                minutes_late,
                market,
                cut_off,
                local_time.format("%H:%M")
            ),
            Reason::CutOffImminent {
                market,
                cut_off,
                local_time,
                minutes_remaining,
            } => write!(
                f,
                "{} {} cut-off ({} local) is only {} min away",
                market,
                cut_off,
                local_time.format("%H:%M"),
                minutes_remaining
            ),
            Reason::CutOffMet {
                market,
                cut_off,
                local_time,
                minutes_remaining,
            } => write!(
                f,
                "{} {} cut-off ({} local) met with {} min to spare",
                market,
                cut_off,
                local_time.format("%H:%M"),
                minutes_remaining
            ),
            Reason::NoCutOffDefined {
                market,
                cut_off,
                date,
            } => write!(
                f,
                "{} has no {} cut-off on {}; not open for settlement operations",
                market, cut_off, date
            ),
            Reason::ValueDateAligned {
                market,
                scheduled,
                common,
            } => write!(
                f,
                "{} value date {} moved to common value date {}",
                market, scheduled, common
            ),
            Reason::SettlementDelayed {
                settlement_date,
                calendar_days,
                threshold_days,
            } => write!(
                f,
                "Value date {} is {} calendar days after the trade date (threshold {})",
                settlement_date, calendar_days, threshold_days
            ),
        }
    }
}

/// Settlement details for one side of the trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLeg {
    /// Market code
    pub market: MarketCode,

    /// Settlement cycle applied (T+n)
    pub cycle: u32,

    /// Market's own settlement date
    pub settlement_date: NaiveDate,

    /// Days skipped while counting the cycle
    pub skipped_days: Vec<SkippedDay>,

    /// Cut-off evaluations at the execution instant
    pub cut_offs: Vec<CutOffEvaluation>,

    /// Worst cut-off position, `None` without execution time
    pub position: Option<CutOffPosition>,

    /// Execution instant in market-local time
    pub execution_local: Option<NaiveDateTime>,

    /// Trading phase at the execution instant
    pub session_phase: Option<SessionPhase>,
}

/// Outcome of a settlement check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Overall status
    pub status: SettlementStatus,

    /// Human-readable explanation
    pub message: String,

    /// Trade date as requested
    pub requested_trade_date: NaiveDate,

    /// Trade date actually used
    pub trade_date: NaiveDate,

    /// Whether the trade date was moved forward
    pub trade_date_advanced: bool,

    /// Common settlement (value) date
    pub settlement_date: NaiveDate,

    /// Execution instant, if given
    pub execution_instant: Option<DateTime<Utc>>,

    /// Buy side, then sell side
    pub markets: Vec<MarketLeg>,

    /// Factors behind the status
    pub reasons: Vec<Reason>,

    /// Cut-offs and closes on the trade date, in time order
    pub deadlines: Vec<Deadline>,

    /// Trading-hour overlap on the trade date
    pub overlap: Vec<OverlapWindow>,

    /// Whether execution fell inside an overlap window
    pub execution_within_overlap: Option<bool>,

    /// Next common business day after the trade date when settlement is unlikely
    pub next_viable_trade_date: Option<NaiveDate>,
}

impl SettlementResult {
    /// Settlement cycle label relative to the trade date, e.g. `T+1`
    pub fn cycle_label(&self) -> String {
        let cycle = self.markets.iter().map(|m| m.cycle).max().unwrap_or(0);
        format!("T+{}", cycle)
    }

    /// Calendar days from trade date to settlement date
    pub fn calendar_days_to_settle(&self) -> i64 {
        (self.settlement_date - self.trade_date).num_days()
    }
}

/// Calendar facts for two markets on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonDayInfo {
    /// Date
    pub date: NaiveDate,
    /// First market
    pub market_a: CalendarDay,
    /// Second market
    pub market_b: CalendarDay,
}

impl CommonDayInfo {
    /// Both markets trade
    pub fn both_trading(&self) -> bool {
        self.market_a.is_business_day && self.market_b.is_business_day
    }

    /// Both markets settle
    pub fn both_settlement(&self) -> bool {
        self.market_a.is_settlement_day && self.market_b.is_settlement_day
    }

    /// Either market has a holiday entry
    pub fn any_holiday(&self) -> bool {
        self.market_a.holiday.is_some() || self.market_b.holiday.is_some()
    }
}

/// State of a market at an instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Market code
    pub market: MarketCode,

    /// Instant observed
    pub at: DateTime<Utc>,

    /// Local date and time
    pub local_time: NaiveDateTime,

    /// Calendar facts for the local date
    pub day: CalendarDay,

    /// Trading phase
    pub phase: SessionPhase,

    /// Next session open (absolute), if not currently trading
    pub next_open: Option<DateTime<Utc>>,

    /// Close of the current session (absolute), if trading
    pub next_close: Option<DateTime<Utc>>,

    /// Cut-offs for the local date
    pub cut_offs: Vec<CutOffEvaluation>,
}

impl MarketSnapshot {
    /// Whether the market is trading at the instant
    pub fn is_open(&self) -> bool {
        self.phase.is_trading()
    }
}

/// Two markets side by side at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSnapshot {
    /// First market
    pub market_a: MarketSnapshot,

    /// Second market
    pub market_b: MarketSnapshot,

    /// UTC offset of A minus UTC offset of B at the instant, in minutes
    pub offset_difference_minutes: i32,

    /// Both markets trading at the instant
    pub both_open: bool,

    /// Both markets' local dates are business days
    pub both_trading_today: bool,

    /// Current or next window when both trade, within the search horizon
    pub next_overlap: Option<OverlapWindow>,
}

impl PairSnapshot {
    /// Offset difference in hours (fractional for half-hour zones)
    pub fn offset_difference_hours(&self) -> f64 {
        f64::from(self.offset_difference_minutes) / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        let worst = [CutOffPosition::Before, CutOffPosition::After, CutOffPosition::Warning]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, CutOffPosition::After);
        assert!(CutOffPosition::Before < CutOffPosition::Warning);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SettlementStatus::AtRisk).unwrap();
        assert_eq!(json, "\"AT_RISK\"");
        assert_eq!(SettlementStatus::Unlikely.to_string(), "UNLIKELY");
    }

    #[test]
    fn test_request_builder() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let request = SettlementRequest::new(date, "jp", "hk").instrument("bond");

        assert_eq!(request.market_pair(), "JP/HK");
        assert_eq!(request.instrument, "bond");
        assert!(request.execution.is_none());
    }

    #[test]
    fn test_reason_display() {
        let reason = Reason::CutOffPassed {
            market: MarketCode::new("JP"),
            cut_off: "depository".to_string(),
            local_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            minutes_late: 30,
        };
        assert_eq!(
            reason.to_string(),
            "Execution is 30 min past JP depository cut-off (14:00 local)"
        );
    }
}
