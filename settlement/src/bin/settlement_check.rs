//! Settlement Check Binary
//!
//! Runs one settlement check against a TOML calendar file and prints the
//! result as JSON.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use market_calendar::{CachedCalendar, CalendarData};
use settlement::{Config, SettlementEngine, SettlementRequest, TradeDatePolicy};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Check whether a cross-market trade settles on its expected value date
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Cli {
    /// Calendar data file (TOML)
    #[arg(long)]
    calendar: Option<PathBuf>,

    /// Engine configuration file (TOML); environment variables otherwise
    #[arg(long, env = "SETTLEMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Buy-side market code
    #[arg(long)]
    buy: String,

    /// Sell-side market code
    #[arg(long)]
    sell: String,

    /// Trade date (YYYY-MM-DD)
    #[arg(long)]
    trade_date: NaiveDate,

    /// Execution instant (RFC 3339)
    #[arg(long, conflicts_with = "local_time")]
    executed_at: Option<DateTime<Utc>>,

    /// Execution time in a market's local time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, requires = "local_market")]
    local_time: Option<NaiveDateTime>,

    /// Market whose timezone `--local-time` is expressed in
    #[arg(long)]
    local_market: Option<String>,

    /// Instrument type
    #[arg(long, default_value = "equity")]
    instrument: String,

    /// Reject trade dates that are not common business days
    #[arg(long)]
    strict: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            Config::from_file(path)?
        }
        None => Config::from_env()?,
    };
    if cli.strict {
        config.trade_date_policy = TradeDatePolicy::Strict;
    }

    // Load calendars
    let calendar_path = cli.calendar.clone().unwrap_or_else(|| config.calendar_file.clone());
    let calendar = CalendarData::from_file(&calendar_path)
        .and_then(|data| data.into_calendar())
        .with_context(|| format!("loading calendar data from {}", calendar_path.display()))?;

    let engine = SettlementEngine::new(Arc::new(CachedCalendar::new(calendar)), config)?;

    let mut request = SettlementRequest::new(cli.trade_date, cli.buy.as_str(), cli.sell.as_str())
        .instrument(cli.instrument.as_str());
    if let Some(at) = cli.executed_at {
        request = request.executed_at(at);
    }
    if let (Some(at), Some(market)) = (cli.local_time, cli.local_market.as_deref()) {
        request = request.executed_local(market, at);
    }

    let result = engine.check_settlement(&request)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
