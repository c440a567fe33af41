//! Configuration for settlement checks

use crate::types::DayRule;
use market_calendar::{MarketCode, DEPOSITORY_CUT_OFF};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Longest accepted cut-off warning window (one day)
pub const MAX_WARNING_WINDOW_MINUTES: i64 = 1440;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Calendar data file used by the command-line tool
    pub calendar_file: PathBuf,

    /// Business-day search configuration
    pub business_days: BusinessDayConfig,

    /// Cut-off evaluation configuration
    pub cut_off: CutOffConfig,

    /// What to do when the trade date is not a common business day
    pub trade_date_policy: TradeDatePolicy,

    /// Day predicate used when counting the settlement cycle
    pub value_date_rule: DayRule,

    /// Flag settlement as at risk when the value date lies more than this
    /// many calendar days after the trade date (disabled when unset)
    pub delay_warning_days: Option<u32>,

    /// Known instrument types
    pub instruments: BTreeMap<String, InstrumentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut instruments = BTreeMap::new();
        for name in ["equity", "etf", "bond"] {
            instruments.insert(name.to_string(), InstrumentConfig::default());
        }

        Self {
            service_name: "settlement-check".to_string(),
            calendar_file: PathBuf::from("./data/calendars.toml"),
            business_days: BusinessDayConfig::default(),
            cut_off: CutOffConfig::default(),
            trade_date_policy: TradeDatePolicy::default(),
            value_date_rule: DayRule::Settlement,
            delay_warning_days: None,
            instruments,
        }
    }
}

/// Business-day search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessDayConfig {
    /// Maximum calendar days searched before giving up (default: 30)
    pub max_horizon_days: u32,
}

impl Default for BusinessDayConfig {
    fn default() -> Self {
        Self {
            max_horizon_days: 30,
        }
    }
}

/// Cut-off evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CutOffConfig {
    /// Warning window before each cut-off in minutes (default: 30)
    pub warning_window_minutes: i64,

    /// Per-market warning window overrides in minutes
    pub market_warning_minutes: BTreeMap<String, i64>,

    /// Cut-off evaluated for every instrument
    pub primary: String,
}

impl Default for CutOffConfig {
    fn default() -> Self {
        Self {
            warning_window_minutes: 30,
            market_warning_minutes: BTreeMap::new(),
            primary: DEPOSITORY_CUT_OFF.to_string(),
        }
    }
}

impl CutOffConfig {
    /// Warning window for a market in minutes
    pub fn warning_minutes_for(&self, market: &MarketCode) -> i64 {
        self.market_warning_minutes
            .get(market.as_str())
            .copied()
            .unwrap_or(self.warning_window_minutes)
    }
}

/// Instrument type profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Cut-offs relevant to the instrument, in addition to the primary one
    #[serde(default)]
    pub cut_offs: Vec<String>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            cut_offs: vec![DEPOSITORY_CUT_OFF.to_string()],
        }
    }
}

/// Trade-date validation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDatePolicy {
    /// Reject a trade date that is not a common business day
    Strict,
    /// Advance to the next common business day and record it
    #[default]
    Lenient,
}

impl std::str::FromStr for TradeDatePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TradeDatePolicy::Strict),
            "lenient" => Ok(TradeDatePolicy::Lenient),
            other => Err(crate::Error::Config(format!(
                "Unknown trade date policy: {}",
                other
            ))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(days) = std::env::var("SETTLEMENT_HORIZON_DAYS") {
            config.business_days.max_horizon_days = days.parse().map_err(|e| {
                crate::Error::Config(format!("SETTLEMENT_HORIZON_DAYS: {}", e))
            })?;
        }

        if let Ok(minutes) = std::env::var("SETTLEMENT_WARNING_MINUTES") {
            config.cut_off.warning_window_minutes = minutes.parse().map_err(|e| {
                crate::Error::Config(format!("SETTLEMENT_WARNING_MINUTES: {}", e))
            })?;
        }

        if let Ok(policy) = std::env::var("SETTLEMENT_TRADE_DATE_POLICY") {
            config.trade_date_policy = policy.parse()?;
        }

        if let Ok(path) = std::env::var("SETTLEMENT_CALENDAR_FILE") {
            config.calendar_file = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check configuration invariants
    pub fn validate(&self) -> crate::Result<()> {
        if self.business_days.max_horizon_days == 0 {
            return Err(crate::Error::Config(
                "max_horizon_days must be at least 1".to_string(),
            ));
        }

        let windows = std::iter::once(("default", self.cut_off.warning_window_minutes)).chain(
            self.cut_off
                .market_warning_minutes
                .iter()
                .map(|(market, minutes)| (market.as_str(), *minutes)),
        );
        for (scope, minutes) in windows {
            if !(0..=MAX_WARNING_WINDOW_MINUTES).contains(&minutes) {
                return Err(crate::Error::Config(format!(
                    "Warning window {} min ({}) outside 0-{}",
                    minutes, scope, MAX_WARNING_WINDOW_MINUTES
                )));
            }
        }

        if self.instruments.is_empty() {
            return Err(crate::Error::Config(
                "At least one instrument type must be configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Look up an instrument profile
    pub fn instrument(&self, name: &str) -> crate::Result<&InstrumentConfig> {
        self.instruments
            .get(&name.trim().to_ascii_lowercase())
            .ok_or_else(|| crate::Error::UnknownInstrumentType(name.to_string()))
    }
}
