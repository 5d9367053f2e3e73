//! Change detection between consecutive evaluations.
//!
//! Compares the current verdict tier and a few volatile metrics against the
//! values a [`HistoryStore`] kept from the previous run.

use serde::Serialize;
use std::fmt;

use crate::domain::error::PulseError;
use crate::domain::raw_metrics::{MetricKey, RawMetrics};
use crate::domain::verdict::Tier;
use crate::ports::config_port::ConfigPort;
use crate::ports::history_port::HistoryStore;

pub const PREV_VERDICT_KEY: &str = "prev_verdict";

/// Metrics watched for sudden moves, with their display labels.
pub const WATCHED: [(MetricKey, &str); 3] = [
    (MetricKey::FearGreed, "Fear & Greed Index"),
    (MetricKey::Chg24h, "BTC 24h price"),
    (MetricKey::MvrvZscore, "MVRV Z-Score"),
];

fn previous_key(metric: MetricKey) -> String {
    format!("prev_{}", metric.as_str())
}

/// Minimum absolute move that counts as an anomaly, per watched metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    pub fear_greed: f64,
    pub chg_24h: f64,
    pub mvrv_zscore: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            fear_greed: 15.0,
            chg_24h: 8.0,
            mvrv_zscore: 0.3,
        }
    }
}

impl AnomalyThresholds {
    /// Read overrides from the `[anomaly]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PulseError> {
        let defaults = Self::default();
        let read = |key: &str, default: f64| -> Result<f64, PulseError> {
            let value = config.get_double("anomaly", key, default);
            if value.is_finite() && value > 0.0 {
                Ok(value)
            } else {
                Err(PulseError::ConfigInvalid {
                    section: "anomaly".into(),
                    key: key.into(),
                    reason: "threshold must be a positive number".into(),
                })
            }
        };
        Ok(Self {
            fear_greed: read("fear_greed", defaults.fear_greed)?,
            chg_24h: read("chg_24h", defaults.chg_24h)?,
            mvrv_zscore: read("mvrv_zscore", defaults.mvrv_zscore)?,
        })
    }

    pub fn for_metric(&self, metric: MetricKey) -> Option<f64> {
        match metric {
            MetricKey::FearGreed => Some(self.fear_greed),
            MetricKey::Chg24h => Some(self.chg_24h),
            MetricKey::MvrvZscore => Some(self.mvrv_zscore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierChange {
    pub previous: Tier,
    pub current: Tier,
}

impl fmt::Display for TierChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "overall signal changed from '{}' to '{}'",
            self.previous, self.current
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Jumped,
    Dropped,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Jumped => "jumped",
            Direction::Dropped => "dropped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub metric: MetricKey,
    pub label: &'static str,
    pub previous: f64,
    pub current: f64,
    pub delta: f64,
    pub direction: Direction,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} from {:.1} to {:.1}",
            self.label,
            self.direction.as_str(),
            self.previous,
            self.current
        )
    }
}

/// Tier change against the stored previous verdict. `None` on the first run
/// or when the tier is unchanged.
pub fn detect_tier_change(
    store: &dyn HistoryStore,
    current: Tier,
) -> Result<Option<TierChange>, PulseError> {
    let Some(stored) = store.get_previous(PREV_VERDICT_KEY)? else {
        return Ok(None);
    };
    let previous = match stored.parse::<Tier>() {
        Ok(tier) => tier,
        Err(reason) => {
            tracing::warn!(%reason, "ignoring unreadable previous verdict");
            return Ok(None);
        }
    };
    if previous == current {
        return Ok(None);
    }
    tracing::info!(from = %previous, to = %current, "verdict tier changed");
    Ok(Some(TierChange { previous, current }))
}

/// Watched metrics whose move since the previous run reaches its threshold.
pub fn detect_anomalies(
    store: &dyn HistoryStore,
    raw: &RawMetrics,
    thresholds: &AnomalyThresholds,
) -> Result<Vec<Anomaly>, PulseError> {
    let mut anomalies = Vec::new();
    for (metric, label) in WATCHED {
        let Some(current) = raw.get(metric).filter(|v| v.is_finite()) else {
            continue;
        };
        let previous = store
            .get_previous(&previous_key(metric))?
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        let (Some(previous), Some(threshold)) = (previous, thresholds.for_metric(metric)) else {
            continue;
        };

        let delta = (current - previous).abs();
        if delta >= threshold {
            let direction = if current > previous {
                Direction::Jumped
            } else {
                Direction::Dropped
            };
            tracing::info!(metric = %metric, previous, current, "metric anomaly");
            anomalies.push(Anomaly {
                metric,
                label,
                previous,
                current,
                delta,
                direction,
            });
        }
    }
    Ok(anomalies)
}

/// Store the current tier and watched metrics for the next run. A watched
/// metric missing from `raw` is stored empty so it is not compared next time.
pub fn store_current(
    store: &dyn HistoryStore,
    tier: Tier,
    raw: &RawMetrics,
) -> Result<(), PulseError> {
    store.set_current(PREV_VERDICT_KEY, tier.label())?;
    for (metric, _) in WATCHED {
        let value = raw
            .get(metric)
            .filter(|v| v.is_finite())
            .map(|v| v.to_string())
            .unwrap_or_default();
        store.set_current(&previous_key(metric), &value)?;
    }
    Ok(())
}
