//! CSV file metrics and price adapters.
//!
//! Snapshot files hold `key,value` rows. Keys are metric names plus the
//! context keys `price`, `pi_triggered`, `fear_greed_label` and `as_of`
//! (RFC 3339). An empty value leaves the metric missing. Price files hold
//! `date,close` rows with ISO dates.

use crate::domain::error::PulseError;
use crate::domain::price::PricePoint;
use crate::domain::raw_metrics::{MetricKey, RawMetrics};
use crate::ports::metrics_port::{MetricsPort, PriceSeriesPort};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};

fn read_file(path: &Path) -> Result<String, PulseError> {
    fs::read_to_string(path).map_err(|e| PulseError::MetricsSource {
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

fn parse_number(key: &str, value: &str) -> Result<f64, PulseError> {
    value.parse().map_err(|e| PulseError::MetricsSource {
        reason: format!("invalid value for {}: '{}' ({})", key, value, e),
    })
}

fn parse_flag(value: &str) -> Result<bool, PulseError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(PulseError::MetricsSource {
            reason: format!("invalid value for pi_triggered: '{}'", other),
        }),
    }
}

/// Parse a `key,value` snapshot.
pub fn parse_snapshot(content: &str) -> Result<RawMetrics, PulseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut raw = RawMetrics::new();

    for result in rdr.records() {
        let record = result.map_err(|e| PulseError::MetricsSource {
            reason: format!("CSV parse error: {}", e),
        })?;
        let key = record.get(0).ok_or_else(|| PulseError::MetricsSource {
            reason: "missing key column".into(),
        })?;
        let value = record.get(1).unwrap_or("");
        if value.is_empty() {
            continue;
        }

        let key = key.to_ascii_lowercase();
        match key.as_str() {
            "price" => raw.price = Some(parse_number(&key, value)?),
            "pi_triggered" => raw.pi_triggered = Some(parse_flag(value)?),
            "fear_greed_label" => raw.fear_greed_label = Some(value.to_string()),
            "as_of" => {
                let ts = DateTime::parse_from_rfc3339(value).map_err(|e| {
                    PulseError::MetricsSource {
                        reason: format!("invalid as_of timestamp '{}': {}", value, e),
                    }
                })?;
                raw.as_of = Some(ts.with_timezone(&Utc));
            }
            other => {
                let metric: MetricKey = other.parse()?;
                raw.insert(metric, parse_number(other, value)?);
            }
        }
    }

    Ok(raw)
}

/// Parse a `date,close` series, oldest first.
pub fn parse_closes(content: &str) -> Result<Vec<PricePoint>, PulseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut points = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| PulseError::MetricsSource {
            reason: format!("CSV parse error: {}", e),
        })?;

        let date_str = record.get(0).ok_or_else(|| PulseError::MetricsSource {
            reason: "missing date column".into(),
        })?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            PulseError::MetricsSource {
                reason: format!("invalid date format: {}", e),
            }
        })?;

        let close_str = record.get(1).ok_or_else(|| PulseError::MetricsSource {
            reason: "missing close column".into(),
        })?;
        let close = parse_number("close", close_str)?;

        points.push(PricePoint::new(date, close));
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

pub struct CsvMetricsAdapter {
    path: PathBuf,
}

impl CsvMetricsAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetricsPort for CsvMetricsAdapter {
    fn load_snapshot(&self) -> Result<RawMetrics, PulseError> {
        let raw = parse_snapshot(&read_file(&self.path)?)?;
        tracing::debug!(path = %self.path.display(), metrics = raw.len(), "loaded snapshot");
        Ok(raw)
    }
}

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PriceSeriesPort for CsvPriceAdapter {
    fn load_closes(&self) -> Result<Vec<PricePoint>, PulseError> {
        parse_closes(&read_file(&self.path)?)
    }
}
