//! Configuration validation.
//!
//! Checks every section before an evaluation touches metrics or history.

use crate::domain::alerts::{AnomalyThresholds, WATCHED};
use crate::domain::error::PulseError;
use crate::domain::raw_metrics::{MetricDefaults, MetricKey};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_WEEKLY_AMOUNT: f64 = 100.0;

/// Non-metric keys allowed in `[defaults]`.
const DEFAULT_CONTEXT_KEYS: [&str; 2] = ["pi_triggered", "fear_greed_label"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PulseError> {
    validate_metrics(config)?;
    validate_history(config)?;
    validate_defaults(config)?;
    validate_anomaly(config)?;
    weekly_amount(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> PulseError {
    PulseError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_metrics(config: &dyn ConfigPort) -> Result<(), PulseError> {
    match config.get_string("metrics", "path") {
        Some(path) if path.trim().is_empty() => {
            Err(invalid("metrics", "path", "path must not be empty"))
        }
        _ => Ok(()),
    }
}

fn validate_history(config: &dyn ConfigPort) -> Result<(), PulseError> {
    if let Some(path) = config.get_string("history", "path") {
        if path.trim().is_empty() {
            return Err(invalid("history", "path", "path must not be empty"));
        }
    }
    if let Some(raw) = config.get_string("history", "pool_size") {
        match raw.trim().parse::<i64>() {
            Ok(n) if n >= 1 => {}
            _ => return Err(invalid("history", "pool_size", "pool_size must be at least 1")),
        }
    }
    Ok(())
}

fn validate_defaults(config: &dyn ConfigPort) -> Result<(), PulseError> {
    for key in config.keys("defaults") {
        if DEFAULT_CONTEXT_KEYS.contains(&key.as_str()) {
            continue;
        }
        if key.parse::<MetricKey>().is_err() {
            return Err(invalid("defaults", &key, "not a known metric"));
        }
    }
    MetricDefaults::from_config(config).map(|_| ())
}

fn validate_anomaly(config: &dyn ConfigPort) -> Result<(), PulseError> {
    for key in config.keys("anomaly") {
        if !WATCHED.iter().any(|(metric, _)| metric.as_str() == key) {
            return Err(invalid("anomaly", &key, "not a watched metric"));
        }
        if let Some(raw) = config.get_string("anomaly", &key) {
            if raw.trim().parse::<f64>().is_err() {
                return Err(invalid("anomaly", &key, "threshold must be a number"));
            }
        }
    }
    AnomalyThresholds::from_config(config).map(|_| ())
}

/// Weekly DCA amount from `[dca] weekly_amount`, 100 when absent.
pub fn weekly_amount(config: &dyn ConfigPort) -> Result<f64, PulseError> {
    let Some(raw) = config.get_string("dca", "weekly_amount") else {
        return Ok(DEFAULT_WEEKLY_AMOUNT);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(invalid("dca", "weekly_amount", "weekly_amount must be positive")),
    }
}
