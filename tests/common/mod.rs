#![allow(dead_code)]

use btcpulse::domain::error::PulseError;
use btcpulse::domain::raw_metrics::{MetricKey, RawMetrics};
use btcpulse::domain::verdict::Tier;
use btcpulse::ports::history_port::{HistoryStore, SignalLog};
use btcpulse::ports::metrics_port::MetricsPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// In-memory history store and signal log.
#[derive(Default)]
pub struct MemoryHistory {
    pub values: RefCell<HashMap<String, String>>,
    pub log: RefCell<BTreeMap<NaiveDate, Tier>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn get_previous(&self, key: &str) -> Result<Option<String>, PulseError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set_current(&self, key: &str, value: &str) -> Result<(), PulseError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl SignalLog for MemoryHistory {
    fn record(&self, date: NaiveDate, tier: Tier) -> Result<bool, PulseError> {
        let mut log = self.log.borrow_mut();
        if log.contains_key(&date) {
            return Ok(false);
        }
        log.insert(date, tier);
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<(NaiveDate, Tier)>, PulseError> {
        Ok(self.log.borrow().iter().map(|(d, t)| (*d, *t)).collect())
    }
}

pub struct MockMetricsPort {
    pub snapshot: RawMetrics,
    pub error: Option<String>,
}

impl MockMetricsPort {
    pub fn new(snapshot: RawMetrics) -> Self {
        Self {
            snapshot,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            snapshot: RawMetrics::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl MetricsPort for MockMetricsPort {
    fn load_snapshot(&self) -> Result<RawMetrics, PulseError> {
        match &self.error {
            Some(reason) => Err(PulseError::MetricsSource {
                reason: reason.clone(),
            }),
            None => Ok(self.snapshot.clone()),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Every indicator in its buy zone.
pub fn bullish_snapshot() -> RawMetrics {
    let mut raw = RawMetrics::new()
        .with(MetricKey::FearGreed, 10.0)
        .with(MetricKey::MvrvZscore, -0.5)
        .with(MetricKey::Nupl, 0.10)
        .with(MetricKey::PuellMultiple, 0.4)
        .with(MetricKey::RhodlRatio, 1000.0)
        .with(MetricKey::ReserveRisk, 0.001)
        .with(MetricKey::MayerMultiple, 0.7)
        .with(MetricKey::Ma200w, 47_400.0)
        .with(MetricKey::PctAbove200w, -5.0)
        .with(MetricKey::Ma2yrRatio, 0.7)
        .with(MetricKey::Ahr999, 0.4)
        .with(MetricKey::Rsi14, 25.0)
        .with(MetricKey::RsiWeekly, 30.0)
        .with(MetricKey::PiRatio, 0.5)
        .with(MetricKey::BtcDominance, 62.0)
        .with(MetricKey::AltcoinSeason, 15.0)
        .with(MetricKey::Cbbi, 20.0)
        .with(MetricKey::GliNow, 100.0)
        .with(MetricKey::GliYoy, 3.0)
        .with(MetricKey::DxyValue, 98.0)
        .with(MetricKey::DxyChange, -1.0)
        .with(MetricKey::Btc90d, -30.0)
        .with(MetricKey::Spx90d, 5.0)
        .with(MetricKey::Chg24h, -2.0);
    raw.pi_triggered = Some(false);
    raw.price = Some(45_000.0);
    raw.fear_greed_label = Some("Extreme Fear".to_string());
    raw
}

/// Every indicator in its sell zone.
pub fn bearish_snapshot() -> RawMetrics {
    let mut raw = RawMetrics::new()
        .with(MetricKey::FearGreed, 90.0)
        .with(MetricKey::MvrvZscore, 7.0)
        .with(MetricKey::Nupl, 80.0)
        .with(MetricKey::PuellMultiple, 3.0)
        .with(MetricKey::RhodlRatio, 60_000.0)
        .with(MetricKey::ReserveRisk, 0.01)
        .with(MetricKey::MayerMultiple, 2.6)
        .with(MetricKey::Ma200w, 48_000.0)
        .with(MetricKey::PctAbove200w, 150.0)
        .with(MetricKey::Ma2yrRatio, 4.0)
        .with(MetricKey::Ahr999, 5.0)
        .with(MetricKey::Rsi14, 80.0)
        .with(MetricKey::RsiWeekly, 85.0)
        .with(MetricKey::PiRatio, 1.05)
        .with(MetricKey::BtcDominance, 40.0)
        .with(MetricKey::AltcoinSeason, 85.0)
        .with(MetricKey::Cbbi, 95.0)
        .with(MetricKey::GliNow, 90.0)
        .with(MetricKey::GliYoy, -8.0)
        .with(MetricKey::DxyValue, 108.0)
        .with(MetricKey::DxyChange, 1.0)
        .with(MetricKey::Btc90d, 40.0)
        .with(MetricKey::Spx90d, 5.0)
        .with(MetricKey::Chg24h, 9.0);
    raw.pi_triggered = Some(true);
    raw.price = Some(120_000.0);
    raw.fear_greed_label = Some("Extreme Greed".to_string());
    raw
}

/// Snapshot CSV text for `raw`, readable by the CSV metrics adapter.
pub fn snapshot_csv(raw: &RawMetrics) -> String {
    let mut out = String::from("key,value\n");
    for key in MetricKey::ALL {
        if let Some(v) = raw.get(key) {
            out.push_str(&format!("{},{}\n", key.as_str(), v));
        }
    }
    if let Some(price) = raw.price {
        out.push_str(&format!("price,{}\n", price));
    }
    if let Some(t) = raw.pi_triggered {
        out.push_str(&format!("pi_triggered,{}\n", t));
    }
    if let Some(label) = &raw.fear_greed_label {
        out.push_str(&format!("fear_greed_label,{}\n", label));
    }
    out
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// `date,close` rows of daily closes starting on `start`.
pub fn daily_csv(start: NaiveDate, closes: &[f64]) -> String {
    let mut out = String::from("date,close\n");
    for (i, close) in closes.iter().enumerate() {
        let day = start + chrono::Duration::days(i as i64);
        out.push_str(&format!("{},{}\n", day.format("%Y-%m-%d"), close));
    }
    out
}
