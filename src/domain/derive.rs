//! Price-derived technical metrics.
//!
//! Computes the technical readings of a [`RawMetrics`] snapshot from close
//! series, oldest first:
//! - RSI: exponential smoothing of gains/losses with alpha = 1/14, seeded
//!   with the first change. 50 with no changes, 100 with no losses.
//! - Moving averages use the last `n` closes, or every close when fewer.
//! - Pi Cycle needs at least 350 daily closes.

use crate::domain::error::PulseError;
use crate::domain::raw_metrics::{MetricKey, RawMetrics};

pub const RSI_PERIOD: usize = 14;
pub const MA_200D: usize = 200;
pub const MA_200W: usize = 200;
pub const MA_2YR_WEEKS: usize = 104;
pub const PI_FAST: usize = 111;
pub const PI_SLOW: usize = 350;

/// Discount applied to the 200-day MA in the Ahr999 approximation.
const AHR999_COST_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiCycle {
    pub ratio: f64,
    pub triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyMetrics {
    pub ma_200w: f64,
    pub rsi_weekly: f64,
    pub ma_2yr: f64,
    pub pct_above_200w: Option<f64>,
    pub ma_2yr_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalMetrics {
    pub price: f64,
    pub rsi_14: f64,
    pub ma_200d: f64,
    pub mayer_multiple: f64,
    pub ahr999: Option<f64>,
    pub pi_cycle: Option<PiCycle>,
    pub weekly: Option<WeeklyMetrics>,
}

/// Mean of the last `n` values, or of all values when fewer than `n`.
pub fn trailing_mean(values: &[f64], n: usize) -> Option<f64> {
    if values.is_empty() || n == 0 {
        return None;
    }
    let window = &values[values.len().saturating_sub(n)..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// RSI of the final close.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 || period == 0 {
        return 50.0;
    }
    let alpha = 1.0 / period as f64;

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for (i, pair) in closes.windows(2).enumerate() {
        let change = pair[1] - pair[0];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = (1.0 - alpha) * avg_gain + alpha * gain;
            avg_loss = (1.0 - alpha) * avg_loss + alpha * loss;
        }
    }

    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// 111-day MA against twice the 350-day MA.
pub fn pi_cycle(daily: &[f64]) -> Option<PiCycle> {
    if daily.len() < PI_SLOW {
        return None;
    }
    let fast = trailing_mean(daily, PI_FAST)?;
    let slow_x2 = trailing_mean(daily, PI_SLOW)? * 2.0;
    let ratio = if slow_x2 > 0.0 { fast / slow_x2 } else { 0.5 };
    Some(PiCycle {
        ratio,
        triggered: fast >= slow_x2,
    })
}

fn ensure_price(price: f64) -> Result<(), PulseError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(PulseError::NonFiniteMetric {
            metric: "price".into(),
            value: price,
        })
    }
}

/// Derive technical metrics from daily and weekly closes at spot `price`.
pub fn derive(daily: &[f64], weekly: &[f64], price: f64) -> Result<TechnicalMetrics, PulseError> {
    ensure_price(price)?;
    let ma_200d = trailing_mean(daily, MA_200D).ok_or_else(|| PulseError::InsufficientData {
        what: "daily closes".into(),
        have: 0,
        need: 1,
    })?;

    let mayer_multiple = if ma_200d > 0.0 { price / ma_200d } else { 1.0 };
    let ahr999 =
        (ma_200d > 0.0).then(|| mayer_multiple * (price / (ma_200d * AHR999_COST_FACTOR)));

    let weekly = match (trailing_mean(weekly, MA_200W), trailing_mean(weekly, MA_2YR_WEEKS)) {
        (Some(ma_200w), Some(ma_2yr)) => Some(WeeklyMetrics {
            ma_200w,
            rsi_weekly: rsi(weekly, RSI_PERIOD),
            ma_2yr,
            pct_above_200w: (ma_200w > 0.0).then(|| (price - ma_200w) / ma_200w * 100.0),
            ma_2yr_ratio: (ma_2yr > 0.0).then(|| price / ma_2yr),
        }),
        _ => None,
    };

    let metrics = TechnicalMetrics {
        price,
        rsi_14: rsi(daily, RSI_PERIOD),
        ma_200d,
        mayer_multiple,
        ahr999,
        pi_cycle: pi_cycle(daily),
        weekly,
    };
    tracing::debug!(?metrics, "derived technical metrics");
    Ok(metrics)
}

impl TechnicalMetrics {
    /// Readings this derivation produced, ready to merge into a snapshot.
    pub fn to_raw_metrics(&self) -> RawMetrics {
        let mut raw = RawMetrics::new()
            .with(MetricKey::Rsi14, self.rsi_14)
            .with(MetricKey::MayerMultiple, self.mayer_multiple);
        raw.price = Some(self.price);

        if let Some(ahr) = self.ahr999 {
            raw.insert(MetricKey::Ahr999, ahr);
        }
        if let Some(pi) = self.pi_cycle {
            raw.insert(MetricKey::PiRatio, pi.ratio);
            raw.pi_triggered = Some(pi.triggered);
        }
        if let Some(w) = self.weekly {
            raw.insert(MetricKey::Ma200w, w.ma_200w);
            raw.insert(MetricKey::RsiWeekly, w.rsi_weekly);
            if let Some(pct) = w.pct_above_200w {
                raw.insert(MetricKey::PctAbove200w, pct);
            }
            if let Some(ratio) = w.ma_2yr_ratio {
                raw.insert(MetricKey::Ma2yrRatio, ratio);
            }
        }
        raw
    }
}
