//! Raw metric snapshot and degraded-mode defaults.
//!
//! A [`RawMetrics`] snapshot is handed to the signal builder once per
//! evaluation cycle. Any metric that is absent, non-finite, or negative where
//! the metric cannot be negative is replaced by the value in
//! [`MetricDefaults`] and the resulting signal record is marked degraded.
//! Defaults are illustrative placeholders, not verified readings.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::PulseError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    FearGreed,
    MvrvZscore,
    Nupl,
    PuellMultiple,
    RhodlRatio,
    ReserveRisk,
    MayerMultiple,
    Ma200w,
    PctAbove200w,
    Ma2yrRatio,
    Ahr999,
    Rsi14,
    RsiWeekly,
    PiRatio,
    BtcDominance,
    AltcoinSeason,
    Cbbi,
    GliNow,
    GliYoy,
    DxyValue,
    DxyChange,
    Btc90d,
    Spx90d,
    SpxDivergence,
    Chg24h,
}

impl MetricKey {
    pub const ALL: [MetricKey; 25] = [
        MetricKey::FearGreed,
        MetricKey::MvrvZscore,
        MetricKey::Nupl,
        MetricKey::PuellMultiple,
        MetricKey::RhodlRatio,
        MetricKey::ReserveRisk,
        MetricKey::MayerMultiple,
        MetricKey::Ma200w,
        MetricKey::PctAbove200w,
        MetricKey::Ma2yrRatio,
        MetricKey::Ahr999,
        MetricKey::Rsi14,
        MetricKey::RsiWeekly,
        MetricKey::PiRatio,
        MetricKey::BtcDominance,
        MetricKey::AltcoinSeason,
        MetricKey::Cbbi,
        MetricKey::GliNow,
        MetricKey::GliYoy,
        MetricKey::DxyValue,
        MetricKey::DxyChange,
        MetricKey::Btc90d,
        MetricKey::Spx90d,
        MetricKey::SpxDivergence,
        MetricKey::Chg24h,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::FearGreed => "fear_greed",
            MetricKey::MvrvZscore => "mvrv_zscore",
            MetricKey::Nupl => "nupl",
            MetricKey::PuellMultiple => "puell_multiple",
            MetricKey::RhodlRatio => "rhodl_ratio",
            MetricKey::ReserveRisk => "reserve_risk",
            MetricKey::MayerMultiple => "mayer_multiple",
            MetricKey::Ma200w => "ma_200w",
            MetricKey::PctAbove200w => "pct_above_200w",
            MetricKey::Ma2yrRatio => "ma_2yr_ratio",
            MetricKey::Ahr999 => "ahr999",
            MetricKey::Rsi14 => "rsi_14",
            MetricKey::RsiWeekly => "rsi_weekly",
            MetricKey::PiRatio => "pi_ratio",
            MetricKey::BtcDominance => "btc_dominance",
            MetricKey::AltcoinSeason => "altcoin_season",
            MetricKey::Cbbi => "cbbi",
            MetricKey::GliNow => "gli_now",
            MetricKey::GliYoy => "gli_yoy",
            MetricKey::DxyValue => "dxy_value",
            MetricKey::DxyChange => "dxy_chg",
            MetricKey::Btc90d => "btc_90d",
            MetricKey::Spx90d => "spx_90d",
            MetricKey::SpxDivergence => "spx_divergence",
            MetricKey::Chg24h => "chg_24h",
        }
    }

    /// Metrics that are ratios, indices or prices and cannot be negative.
    pub fn non_negative(&self) -> bool {
        !matches!(
            self,
            MetricKey::MvrvZscore
                | MetricKey::Nupl
                | MetricKey::PctAbove200w
                | MetricKey::GliYoy
                | MetricKey::DxyChange
                | MetricKey::Btc90d
                | MetricKey::Spx90d
                | MetricKey::SpxDivergence
                | MetricKey::Chg24h
        )
    }

    /// Whether `value` is a usable reading for this metric.
    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && !(self.non_negative() && value < 0.0)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        MetricKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == key)
            .ok_or(PulseError::UnknownMetric { key })
    }
}

/// One evaluation cycle's worth of readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetrics {
    values: HashMap<MetricKey, f64>,
    pub pi_triggered: Option<bool>,
    pub price: Option<f64>,
    pub fear_greed_label: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
}

impl RawMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MetricKey, value: f64) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: MetricKey, value: f64) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: MetricKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `other` into `self`; readings in `other` win.
    pub fn merge(&mut self, other: RawMetrics) {
        self.values.extend(other.values);
        if other.pi_triggered.is_some() {
            self.pi_triggered = other.pi_triggered;
        }
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.fear_greed_label.is_some() {
            self.fear_greed_label = other.fear_greed_label;
        }
        if other.as_of.is_some() {
            self.as_of = other.as_of;
        }
    }
}

/// A value resolved from a snapshot, with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub value: f64,
    pub degraded: bool,
}

/// Fallback values used when a reading is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefaults {
    values: HashMap<MetricKey, f64>,
    pub pi_triggered: bool,
    pub fear_greed_label: String,
}

impl Default for MetricDefaults {
    fn default() -> Self {
        let values = HashMap::from([
            (MetricKey::FearGreed, 50.0),
            (MetricKey::MvrvZscore, 0.44),
            (MetricKey::Nupl, 0.19),
            (MetricKey::PuellMultiple, 0.77),
            (MetricKey::RhodlRatio, 1033.0),
            (MetricKey::ReserveRisk, 0.0013),
            (MetricKey::MayerMultiple, 0.64),
            (MetricKey::Ma200w, 58_500.0),
            (MetricKey::PctAbove200w, 50.0),
            (MetricKey::Ma2yrRatio, 1.16),
            (MetricKey::Ahr999, 0.33),
            (MetricKey::Rsi14, 35.0),
            (MetricKey::RsiWeekly, 40.0),
            (MetricKey::PiRatio, 0.34),
            (MetricKey::BtcDominance, 55.0),
            (MetricKey::AltcoinSeason, 43.0),
            (MetricKey::Cbbi, 31.0),
            (MetricKey::GliNow, 19.0),
            (MetricKey::GliYoy, -10.0),
            (MetricKey::DxyValue, 104.0),
            (MetricKey::DxyChange, 0.0),
            (MetricKey::Btc90d, -28.0),
            (MetricKey::Spx90d, 5.0),
            (MetricKey::SpxDivergence, -33.0),
            (MetricKey::Chg24h, 0.0),
        ]);
        Self {
            values,
            pi_triggered: false,
            fear_greed_label: "Neutral".to_string(),
        }
    }
}

impl MetricDefaults {
    /// Built-in defaults, overridden by any keys in the `[defaults]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PulseError> {
        let mut defaults = Self::default();
        for key in MetricKey::ALL {
            let Some(raw) = config.get_string("defaults", key.as_str()) else {
                continue;
            };
            let value: f64 = raw.trim().parse().map_err(|_| PulseError::ConfigInvalid {
                section: "defaults".into(),
                key: key.as_str().into(),
                reason: format!("'{}' is not a number", raw),
            })?;
            if !key.accepts(value) {
                return Err(PulseError::ConfigInvalid {
                    section: "defaults".into(),
                    key: key.as_str().into(),
                    reason: "default must be finite and within the metric's range".into(),
                });
            }
            defaults.values.insert(key, value);
        }
        defaults.pi_triggered = config.get_bool("defaults", "pi_triggered", defaults.pi_triggered);
        if let Some(label) = config.get_string("defaults", "fear_greed_label") {
            defaults.fear_greed_label = label;
        }
        Ok(defaults)
    }

    pub fn get(&self, key: MetricKey) -> f64 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    /// Resolve `key` from `raw`, falling back to the default when the reading
    /// is missing or unusable.
    pub fn resolve(&self, raw: &RawMetrics, key: MetricKey) -> Resolved {
        match raw.get(key) {
            Some(v) if key.accepts(v) => Resolved {
                value: v,
                degraded: false,
            },
            Some(v) => {
                tracing::warn!(metric = %key, value = v, "unusable reading, using default");
                Resolved {
                    value: self.get(key),
                    degraded: true,
                }
            }
            None => {
                tracing::warn!(metric = %key, "missing reading, using default");
                Resolved {
                    value: self.get(key),
                    degraded: true,
                }
            }
        }
    }
}
