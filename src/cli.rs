//! CLI definition and dispatch.
//!
//! Command output goes to stdout; diagnostics go through `tracing` to stderr.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvMetricsAdapter, CsvPriceAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::alerts::{Anomaly, TierChange};
use crate::domain::catalog::{catalog, IndicatorSpec};
use crate::domain::config_validation::validate_config;
use crate::domain::derive::derive;
use crate::domain::error::PulseError;
use crate::domain::format::thousands;
use crate::domain::price::closes;
use crate::domain::raw_metrics::{MetricDefaults, MetricKey, RawMetrics};
use crate::domain::signal_builder::{build_signals, SignalRecord};
use crate::domain::verdict::{aggregate, Verdict};
use crate::ports::config_port::ConfigPort;
use crate::ports::metrics_port::{MetricsPort, PriceSeriesPort};

#[derive(Parser, Debug)]
#[command(name = "btcpulse", about = "Composite Bitcoin accumulation signal")]
pub struct Cli {
    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a metrics snapshot and print the verdict
    Evaluate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Snapshot CSV, overriding [metrics] path
        #[arg(short, long)]
        metrics: Option<PathBuf>,
        /// Daily closes CSV for technical metrics
        #[arg(long)]
        daily: Option<PathBuf>,
        /// Weekly closes CSV for technical metrics
        #[arg(long)]
        weekly: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        /// Skip change detection and the signal log
        #[arg(long)]
        no_history: bool,
    },
    /// List the indicator catalog
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Derive technical metrics from close series as key,value rows
    Derive {
        #[arg(long)]
        daily: PathBuf,
        #[arg(long)]
        weekly: Option<PathBuf>,
        /// Spot price, defaults to the last daily close
        #[arg(long)]
        price: Option<f64>,
    },
    /// Show the daily tier log
    History {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Simulate signal-adjusted weekly DCA against the tier log
    SimulateDca {
        #[arg(short, long)]
        config: PathBuf,
        /// Execution prices CSV (date,close)
        #[arg(short, long)]
        prices: PathBuf,
        /// Weekly amount, overriding [dca] weekly_amount
        #[arg(long)]
        amount: Option<f64>,
        /// Current price, defaults to the last execution price
        #[arg(long)]
        price: Option<f64>,
        /// Execute on every row instead of Mondays of completed weeks
        #[arg(long)]
        all_rows: bool,
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), PulseError> {
    match command {
        Command::Evaluate {
            config,
            metrics,
            daily,
            weekly,
            json,
            no_history,
        } => run_evaluate(
            config.as_deref(),
            metrics.as_deref(),
            daily.as_deref(),
            weekly.as_deref(),
            json,
            no_history,
        ),
        Command::Catalog { json } => run_catalog(json),
        Command::Derive {
            daily,
            weekly,
            price,
        } => run_derive(&daily, weekly.as_deref(), price),
        Command::History { config } => run_history(&config),
        Command::SimulateDca {
            config,
            prices,
            amount,
            price,
            all_rows,
            json,
        } => run_simulate_dca(&config, &prices, amount, price, all_rows, json),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Load and validate a config file, or an empty config when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, PulseError> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), PulseError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

fn load_closes(path: &Path) -> Result<Vec<f64>, PulseError> {
    Ok(closes(&CsvPriceAdapter::new(path.to_path_buf()).load_closes()?))
}

/// Derived technical readings for the given close files.
fn technical_metrics(
    daily: &Path,
    weekly: Option<&Path>,
    price: Option<f64>,
) -> Result<RawMetrics, PulseError> {
    let daily_closes = load_closes(daily)?;
    let weekly_closes = match weekly {
        Some(path) => load_closes(path)?,
        None => Vec::new(),
    };
    let price = match price.or_else(|| daily_closes.last().copied()) {
        Some(p) => p,
        None => {
            return Err(PulseError::InsufficientData {
                what: "daily closes".into(),
                have: 0,
                need: 1,
            });
        }
    };
    Ok(derive(&daily_closes, &weekly_closes, price)?.to_raw_metrics())
}

#[derive(Serialize)]
struct EvaluationOutput<'a> {
    as_of: Option<DateTime<Utc>>,
    price: Option<f64>,
    tier_label: &'static str,
    tier_description: &'static str,
    verdict: &'a Verdict,
    signals: &'a [SignalRecord],
    tier_change: Option<TierChange>,
    anomalies: &'a [Anomaly],
}

#[derive(Default)]
struct Changes {
    tier_change: Option<TierChange>,
    anomalies: Vec<Anomaly>,
}

fn run_evaluate(
    config_path: Option<&Path>,
    metrics_path: Option<&Path>,
    daily: Option<&Path>,
    weekly: Option<&Path>,
    json: bool,
    no_history: bool,
) -> Result<(), PulseError> {
    let config = load_config(config_path)?;

    let snapshot_path = match metrics_path {
        Some(p) => p.to_path_buf(),
        None => config
            .get_string("metrics", "path")
            .map(PathBuf::from)
            .ok_or_else(|| PulseError::ConfigMissing {
                section: "metrics".into(),
                key: "path".into(),
            })?,
    };
    let snapshot = CsvMetricsAdapter::new(snapshot_path).load_snapshot()?;

    let raw = match daily {
        Some(daily) => {
            let mut raw = technical_metrics(daily, weekly, snapshot.price)?;
            raw.merge(snapshot);
            raw
        }
        None => snapshot,
    };

    let defaults = MetricDefaults::from_config(&config)?;
    let signals = build_signals(&raw, catalog(), &defaults)?;
    let verdict = aggregate(&signals)?;
    tracing::info!(tier = %verdict.tier, score = verdict.score, "evaluated");

    let changes = if no_history {
        Changes::default()
    } else {
        track_history(&config, &verdict, &raw)?
    };

    if json {
        return print_json(&EvaluationOutput {
            as_of: raw.as_of,
            price: raw.price,
            tier_label: verdict.tier.label(),
            tier_description: verdict.tier.description(),
            verdict: &verdict,
            signals: &signals,
            tier_change: changes.tier_change,
            anomalies: &changes.anomalies,
        });
    }

    print_evaluation(&raw, &verdict, &signals, &changes);
    Ok(())
}

#[cfg(feature = "sqlite")]
fn open_history(
    config: &dyn ConfigPort,
) -> Result<Option<crate::adapters::sqlite_adapter::SqliteAdapter>, PulseError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    if config.get_string("history", "path").is_none() {
        return Ok(None);
    }
    let adapter = SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    Ok(Some(adapter))
}

fn track_history(
    config: &dyn ConfigPort,
    verdict: &Verdict,
    raw: &RawMetrics,
) -> Result<Changes, PulseError> {
    #[cfg(feature = "sqlite")]
    {
        use crate::domain::alerts::{
            detect_anomalies, detect_tier_change, store_current, AnomalyThresholds,
        };
        use crate::domain::dca::record_tier;

        let Some(store) = open_history(config)? else {
            tracing::debug!("no [history] path configured, skipping change detection");
            return Ok(Changes::default());
        };
        let thresholds = AnomalyThresholds::from_config(config)?;
        let changes = Changes {
            tier_change: detect_tier_change(&store, verdict.tier)?,
            anomalies: detect_anomalies(&store, raw, &thresholds)?,
        };
        store_current(&store, verdict.tier, raw)?;

        let today = raw.as_of.unwrap_or_else(Utc::now).date_naive();
        record_tier(&store, today, verdict.tier)?;
        Ok(changes)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, verdict, raw);
        tracing::debug!("built without sqlite, skipping change detection");
        Ok(Changes::default())
    }
}

fn print_evaluation(raw: &RawMetrics, verdict: &Verdict, signals: &[SignalRecord], changes: &Changes) {
    if let Some(price) = raw.price {
        println!("BTC price: ${}", thousands(price));
    }
    if let Some(as_of) = raw.as_of {
        println!("As of:     {}", as_of.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("Verdict:   {} (score {:.1})", verdict.tier, verdict.score);
    println!(
        "Signals:   {} BUY / {} CAUTION / {} SELL of {}",
        verdict.buy_count, verdict.caution_count, verdict.sell_count, verdict.total
    );
    println!("{}", verdict.tier.description());
    println!();

    for record in signals {
        println!(
            "{:<17} {:<22} {:<34} {:<8}{}",
            record.category.label(),
            record.name,
            record.display,
            record.signal.label(),
            if record.degraded { " (default)" } else { "" }
        );
    }

    if let Some(change) = &changes.tier_change {
        println!();
        println!("Change: {change}");
    }
    for anomaly in &changes.anomalies {
        println!("Anomaly: {anomaly}");
    }
}

#[derive(Serialize)]
struct CatalogEntry {
    id: String,
    name: &'static str,
    category: &'static str,
    buy_zone: &'static str,
    sell_zone: &'static str,
    description: &'static str,
}

impl From<&IndicatorSpec> for CatalogEntry {
    fn from(spec: &IndicatorSpec) -> Self {
        Self {
            id: spec.id.to_string(),
            name: spec.name,
            category: spec.category.label(),
            buy_zone: spec.buy_zone,
            sell_zone: spec.sell_zone,
            description: spec.description,
        }
    }
}

fn run_catalog(json: bool) -> Result<(), PulseError> {
    let entries: Vec<CatalogEntry> = catalog().iter().map(CatalogEntry::from).collect();
    if json {
        return print_json(&entries);
    }
    for entry in &entries {
        println!(
            "{:<17} {:<22} buy {:<24} sell {}",
            entry.category, entry.name, entry.buy_zone, entry.sell_zone
        );
    }
    Ok(())
}

fn run_derive(daily: &Path, weekly: Option<&Path>, price: Option<f64>) -> Result<(), PulseError> {
    let raw = technical_metrics(daily, weekly, price)?;

    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    let csv_err = |e: csv::Error| PulseError::Io(std::io::Error::other(e));
    wtr.write_record(["key", "value"]).map_err(csv_err)?;
    if let Some(price) = raw.price {
        wtr.write_record(["price", price.to_string().as_str()]).map_err(csv_err)?;
    }
    if let Some(triggered) = raw.pi_triggered {
        wtr.write_record(["pi_triggered", triggered.to_string().as_str()])
            .map_err(csv_err)?;
    }
    for key in MetricKey::ALL {
        if let Some(value) = raw.get(key) {
            wtr.write_record([key.as_str(), value.to_string().as_str()])
                .map_err(csv_err)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(feature = "sqlite")]
fn open_required_history(
    config: &dyn ConfigPort,
) -> Result<crate::adapters::sqlite_adapter::SqliteAdapter, PulseError> {
    open_history(config)?.ok_or_else(|| PulseError::ConfigMissing {
        section: "history".into(),
        key: "path".into(),
    })
}

fn run_history(config_path: &Path) -> Result<(), PulseError> {
    #[cfg(feature = "sqlite")]
    {
        use crate::domain::alerts::PREV_VERDICT_KEY;
        use crate::ports::history_port::{HistoryStore, SignalLog};

        let config = load_config(Some(config_path))?;
        let store = open_required_history(&config)?;

        if let Some(previous) = store.get_previous(PREV_VERDICT_KEY)? {
            println!("Last verdict: {previous}");
        }
        let entries = store.entries()?;
        if entries.is_empty() {
            println!("No tiers logged yet.");
        }
        for (date, tier) in entries {
            println!("{date}  {tier}");
        }
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config_path;
        Err(PulseError::History {
            reason: "sqlite feature is required for history".into(),
        })
    }
}

fn run_simulate_dca(
    config_path: &Path,
    prices_path: &Path,
    amount: Option<f64>,
    price: Option<f64>,
    all_rows: bool,
    json: bool,
) -> Result<(), PulseError> {
    #[cfg(feature = "sqlite")]
    {
        use crate::domain::config_validation::weekly_amount;
        use crate::domain::dca::{monday_executions, simulate};
        use crate::ports::history_port::SignalLog;

        let config = load_config(Some(config_path))?;
        let store = open_required_history(&config)?;
        let amount = match amount {
            Some(a) => a,
            None => weekly_amount(&config)?,
        };

        let points = CsvPriceAdapter::new(prices_path.to_path_buf()).load_closes()?;
        let executions = if all_rows {
            points.clone()
        } else {
            monday_executions(&points)
        };
        let current_price = match price.or_else(|| points.last().map(|p| p.close)) {
            Some(p) => p,
            None => {
                return Err(PulseError::InsufficientData {
                    what: "execution prices".into(),
                    have: 0,
                    need: 1,
                });
            }
        };

        let report = simulate(&store.entries()?, &executions, amount, current_price)?;
        if json {
            return print_json(&report);
        }

        println!(
            "Weekly amount ${} over {} executions ({} skipped), priced at ${}",
            thousands(report.weekly_amount),
            report.executed,
            report.skipped,
            thousands(report.current_price)
        );
        for (label, plan) in [("Standard", &report.standard), ("Adjusted", &report.adjusted)] {
            println!(
                "{:<9} invested ${:<10} value ${:<10} P&L {:+.1}%  {:.6} BTC",
                label,
                thousands(plan.invested),
                thousands(plan.value),
                plan.pnl_pct,
                plan.btc
            );
        }
        let leader = if report.difference >= 0.0 {
            "Signal-adjusted leads"
        } else {
            "Standard DCA leads"
        };
        println!(
            "Difference: ${} ({:+.1}%), {}",
            thousands(report.difference),
            report.difference_pct,
            leader
        );
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, prices_path, amount, price, all_rows, json);
        Err(PulseError::History {
            reason: "sqlite feature is required for simulate-dca".into(),
        })
    }
}

fn run_validate(config_path: &Path) -> Result<(), PulseError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(Some(config_path))?;
    let defaults = MetricDefaults::from_config(&config)?;
    let overridden = config.keys("defaults").len();
    println!(
        "Config OK: {} indicators, {} metric defaults ({} overridden)",
        catalog().len(),
        MetricKey::ALL.len(),
        overridden
    );
    tracing::debug!(?defaults, "resolved defaults");
    Ok(())
}
