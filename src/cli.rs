//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvTradeReport;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::synthetic_adapter::SyntheticAdapter;
use crate::domain::backtest::{Replay, ReplayConfig};
use crate::domain::config_validation::{parse_ratio_list, validate_config};
use crate::domain::error::ReplayError;
use crate::domain::execution::{LifecycleManager, RiskConfig};
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::{FixedOptimizer, Optimizer, SweepOptimizer, FIXED_RISK_REWARD_RATIO};
use crate::domain::pipeline::enrich;
use crate::domain::runner::ReplayRunner;
use crate::domain::strategy::{
    ParseVariantError, StrategyParams, StrategyVariant, DEFAULT_RISK_REWARD_RATIO,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_INTERVAL: &str = "1h";
pub const DEFAULT_BAR_LIMIT: i64 = 2000;

#[derive(Parser, Debug)]
#[command(name = "replaytrader", about = "Replay a trading strategy over historical bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay bars tick by tick and report the trades
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV bar file, overrides [data] source and path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Trade history CSV output
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        max_ticks: Option<usize>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the indicators of the most recent bars
    Inspect {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        last: usize,
    },
}

impl Cli {
    pub fn config_path(&self) -> &Path {
        match &self.command {
            Command::Run { config, .. }
            | Command::Validate { config }
            | Command::Inspect { config, .. } => config,
        }
    }

    /// `[logging] level` from the config file, if it can be read.
    pub fn log_level(&self) -> Option<String> {
        FileConfigAdapter::from_file(self.config_path())
            .ok()?
            .get_string("logging", "level")
    }
}

pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Logger from `RUST_LOG` (default `info`); a config level overrides it.
pub fn init_logging(config_level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = config_level {
        builder.filter_level(parse_level(level));
    }
    let _ = builder.try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            data,
            output,
            max_ticks,
        } => run_replay(&config, data.as_deref(), output.as_deref(), max_ticks),
        Command::Validate { config } => run_validate(&config),
        Command::Inspect { config, data, last } => run_inspect(&config, data.as_deref(), last),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ReplayError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

fn non_negative_usize(adapter: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<usize, ReplayError> {
    let value = adapter.get_int(section, key, default);
    usize::try_from(value).map_err(|_| ReplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{} must be non-negative", key),
    })
}

pub fn build_replay_config(
    adapter: &dyn ConfigPort,
    max_ticks_override: Option<usize>,
) -> Result<ReplayConfig, ReplayError> {
    let max_ticks = match max_ticks_override {
        Some(n) => Some(n),
        None if adapter.get_string("replay", "max_ticks").is_some() => {
            Some(non_negative_usize(adapter, "replay", "max_ticks", 0)?)
        }
        None => None,
    };
    let tick_interval_ms = non_negative_usize(adapter, "replay", "tick_interval_ms", 0)?;

    Ok(ReplayConfig {
        initial_balance: adapter.get_double("replay", "initial_balance", 10_000.0),
        window_cap: non_negative_usize(adapter, "replay", "window_cap", 2000)?,
        recalibration_interval: non_negative_usize(adapter, "replay", "recalibration_interval", 100)?,
        recalibration_lookback: non_negative_usize(adapter, "replay", "recalibration_lookback", 500)?,
        history_fraction: adapter.get_double("replay", "history_fraction", 0.15),
        max_history: non_negative_usize(adapter, "replay", "max_history", 1000)?,
        commission_pct: adapter.get_double("replay", "commission_pct", 0.0),
        tick_interval: Duration::from_millis(tick_interval_ms as u64),
        max_ticks,
        initial_params: StrategyParams {
            risk_reward_ratio: adapter.get_double(
                "strategy",
                "risk_reward_ratio",
                DEFAULT_RISK_REWARD_RATIO,
            ),
        },
    })
}

pub fn build_risk_config(adapter: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        risk_per_trade: adapter.get_double("risk", "risk_per_trade", defaults.risk_per_trade),
        min_position: adapter.get_double("risk", "min_position", defaults.min_position),
        max_position_fraction: adapter.get_double(
            "risk",
            "max_position_fraction",
            defaults.max_position_fraction,
        ),
        max_risk_fraction: adapter.get_double("risk", "max_risk_fraction", defaults.max_risk_fraction),
        atr_stop_multiplier: adapter.get_double(
            "risk",
            "atr_stop_multiplier",
            defaults.atr_stop_multiplier,
        ),
    }
}

pub fn build_variant(adapter: &dyn ConfigPort) -> Result<StrategyVariant, ReplayError> {
    match adapter.get_string("strategy", "variant") {
        None => Ok(StrategyVariant::default()),
        Some(name) => name.parse().map_err(|e: ParseVariantError| {
            ReplayError::ConfigInvalid {
                section: "strategy".into(),
                key: "variant".into(),
                reason: e.to_string(),
            }
        }),
    }
}

pub fn build_optimizer(
    adapter: &dyn ConfigPort,
    lifecycle: &LifecycleManager,
    replay_config: &ReplayConfig,
) -> Result<Box<dyn Optimizer>, ReplayError> {
    let kind = adapter
        .get_string("strategy", "optimizer")
        .unwrap_or_else(|| "fixed".to_string());

    match kind.trim().to_ascii_lowercase().as_str() {
        "fixed" => Ok(Box::new(FixedOptimizer::new(adapter.get_double(
            "strategy",
            "fixed_ratio",
            FIXED_RISK_REWARD_RATIO,
        )))),
        "sweep" => {
            let ratios = parse_ratio_list(adapter.get_string("strategy", "sweep_ratios").as_deref())?;
            Ok(Box::new(SweepOptimizer::new(
                ratios,
                lifecycle.clone(),
                replay_config.initial_balance,
                replay_config.commission_pct,
            )))
        }
        other => Err(ReplayError::ConfigInvalid {
            section: "strategy".into(),
            key: "optimizer".into(),
            reason: format!("unknown optimizer '{}'", other),
        }),
    }
}

/// Where bars come from: `--data` wins over `[data] source`.
pub fn build_bar_source(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<Box<dyn BarSource>, ReplayError> {
    if let Some(path) = data_override {
        return Ok(Box::new(CsvAdapter::new(path.to_path_buf())));
    }

    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_ascii_lowercase().as_str() {
        "synthetic" => {
            let seed = adapter.get_int("data", "seed", 42);
            Ok(Box::new(SyntheticAdapter::new(seed as u64)))
        }
        "csv" => {
            let path = adapter
                .get_string("data", "path")
                .ok_or_else(|| ReplayError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(path))))
        }
        other => Err(ReplayError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{}'", other),
        }),
    }
}

/// Symbol, interval and bar limit from `[data]`.
pub fn data_request(adapter: &dyn ConfigPort) -> Result<(String, String, usize), ReplayError> {
    let symbol = adapter
        .get_string("data", "symbol")
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
    let interval = adapter
        .get_string("data", "interval")
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    let limit = non_negative_usize(adapter, "data", "bars", DEFAULT_BAR_LIMIT)?;
    Ok((symbol, interval, limit))
}

/// Load, replay and summarise. Returns the finished replay.
pub fn execute_replay(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
    max_ticks: Option<usize>,
) -> Result<Replay, ReplayError> {
    let replay_config = build_replay_config(adapter, max_ticks)?;
    let variant = build_variant(adapter)?;
    let lifecycle = LifecycleManager::new(variant, build_risk_config(adapter));
    let optimizer = build_optimizer(adapter, &lifecycle, &replay_config)?;

    let (symbol, interval, limit) = data_request(adapter)?;
    let source = build_bar_source(adapter, data_override)?;
    let bars = source.fetch_bars(&symbol, &interval, limit)?;

    info!(
        "replaying {} {} with {} ({} optimizer)",
        symbol,
        interval,
        lifecycle.engine().variant(),
        optimizer.name()
    );
    let replay = Replay::from_bars(replay_config, &symbol, bars, lifecycle, optimizer)?;

    let mut runner = ReplayRunner::new(replay);
    runner.run(|outcome| {
        if let Some(params) = outcome.recalibrated {
            info!(
                "tick {}: risk/reward now {:.2}",
                outcome.tick, params.risk_reward_ratio
            );
        }
        ControlFlow::Continue(())
    });

    Ok(runner.into_replay())
}

fn run_replay(
    config_path: &Path,
    data_override: Option<&Path>,
    output_path: Option<&Path>,
    max_ticks: Option<usize>,
) -> Result<(), ReplayError> {
    let adapter = load_config(config_path)?;
    let replay = execute_replay(&adapter, data_override, max_ticks)?;
    let account = replay.account();
    let metrics = Metrics::compute(account);

    eprintln!("\n=== Replay Results ===");
    eprintln!("Ticks:            {}", replay.ticks());
    eprintln!("Final Balance:    {:.2}", metrics.final_balance);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Closed Trades:    {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Risk/Reward:      {:.2}", replay.params().risk_reward_ratio);
    if let Some(open) = account.open_position() {
        eprintln!(
            "Open Position:    #{} {} at {:.4}",
            open.id, open.side, open.entry_price
        );
    }

    if let Some(output) = output_path {
        CsvTradeReport.write(account, &output.display().to_string())?;
        eprintln!("\nTrades written to: {}", output.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ReplayError> {
    let adapter = load_config(config_path)?;
    let replay_config = build_replay_config(&adapter, None)?;
    let variant = build_variant(&adapter)?;
    let lifecycle = LifecycleManager::new(variant, build_risk_config(&adapter));
    let optimizer = build_optimizer(&adapter, &lifecycle, &replay_config)?;
    build_bar_source(&adapter, None)?;

    eprintln!("Config validated successfully");
    eprintln!("  Strategy:   {}", lifecycle.engine().variant());
    eprintln!("  Optimizer:  {}", optimizer.name());
    eprintln!("  Balance:    {:.2}", replay_config.initial_balance);
    eprintln!("  Window cap: {}", replay_config.window_cap);
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn run_inspect(config_path: &Path, data_override: Option<&Path>, last: usize) -> Result<(), ReplayError> {
    let adapter = load_config(config_path)?;
    let window_cap = build_replay_config(&adapter, None)?.window_cap;
    let (symbol, interval, limit) = data_request(&adapter)?;
    let source = build_bar_source(&adapter, data_override)?;
    let bars = source.fetch_bars(&symbol, &interval, limit.min(window_cap))?;
    let enriched = enrich(&bars);

    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>7} {:>10} {:>10} {:>8} {:>7} {:>8}",
        "time", "close", "ema50", "ema200", "rsi", "macd_hist", "atr", "trend", "risk", "cross"
    );
    for e in enriched.iter().skip(enriched.len().saturating_sub(last)) {
        let ind = &e.indicators;
        println!(
            "{:<20} {:>12.2} {:>12} {:>12} {:>7} {:>10} {:>10} {:>8} {:>7} {:>8}",
            e.bar.time.format("%Y-%m-%d %H:%M:%S"),
            e.bar.close,
            fmt_opt(ind.ema50),
            fmt_opt(ind.ema200),
            fmt_opt(ind.rsi),
            fmt_opt(ind.macd.map(|m| m.histogram)),
            fmt_opt(ind.atr),
            format!("{:?}", ind.trend),
            format!("{:?}", ind.risk_zone),
            format!("{:?}", ind.cross.kind),
        );
    }
    Ok(())
}
