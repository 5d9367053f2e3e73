//! Signal-adjusted dollar-cost averaging.
//!
//! Replays weekly executions twice: a standard plan investing a fixed
//! amount, and an adjusted plan scaling that amount by the multiplier of the
//! verdict tier logged closest to each execution date.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::domain::error::PulseError;
use crate::domain::price::PricePoint;
use crate::domain::verdict::Tier;
use crate::ports::history_port::SignalLog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlanResult {
    pub btc: f64,
    pub invested: f64,
    pub value: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
}

impl PlanResult {
    fn buy(&mut self, amount: f64, price: f64) {
        self.btc += amount / price;
        self.invested += amount;
    }

    fn mark(&mut self, current_price: f64) {
        self.value = self.btc * current_price;
        self.pnl = self.value - self.invested;
        self.pnl_pct = if self.invested > 0.0 {
            self.pnl / self.invested * 100.0
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub tier: Tier,
    pub multiplier: f64,
    pub standard_value: f64,
    pub adjusted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaReport {
    pub weekly_amount: f64,
    pub current_price: f64,
    pub standard: PlanResult,
    pub adjusted: PlanResult,
    /// Adjusted value minus standard value.
    pub difference: f64,
    pub difference_pct: f64,
    pub executed: usize,
    pub skipped: usize,
    pub curve: Vec<CurvePoint>,
}

/// Record today's tier. Only the first write of a date is kept.
pub fn record_tier(log: &dyn SignalLog, date: NaiveDate, tier: Tier) -> Result<bool, PulseError> {
    let written = log.record(date, tier)?;
    if written {
        tracing::debug!(%date, %tier, "logged verdict tier");
    } else {
        tracing::debug!(%date, "tier already logged for date");
    }
    Ok(written)
}

/// Tier logged closest to `date`; ties go to the earlier log date.
pub fn tier_near(log: &[(NaiveDate, Tier)], date: NaiveDate) -> Option<Tier> {
    log.iter()
        .min_by_key(|(logged, _)| ((*logged - date).num_days().abs(), *logged))
        .map(|(_, tier)| *tier)
}

/// Monday rows of completed weeks, oldest first.
///
/// A Monday whose week has not ended by the latest row in `points` is still
/// in progress and is left out.
pub fn monday_executions(points: &[PricePoint]) -> Vec<PricePoint> {
    let Some(latest) = points.iter().map(|p| p.date).max() else {
        return Vec::new();
    };
    let mut mondays: Vec<PricePoint> = points
        .iter()
        .filter(|p| p.date.weekday() == Weekday::Mon)
        .filter(|p| p.date + Duration::days(7) <= latest)
        .copied()
        .collect();
    mondays.sort_by_key(|p| p.date);
    mondays
}

pub fn simulate(
    log: &[(NaiveDate, Tier)],
    executions: &[PricePoint],
    weekly_amount: f64,
    current_price: f64,
) -> Result<DcaReport, PulseError> {
    if !(weekly_amount.is_finite() && weekly_amount > 0.0) {
        return Err(PulseError::ConfigInvalid {
            section: "dca".into(),
            key: "weekly_amount".into(),
            reason: "weekly amount must be positive".into(),
        });
    }
    if !(current_price.is_finite() && current_price > 0.0) {
        return Err(PulseError::NonFiniteMetric {
            metric: "price".into(),
            value: current_price,
        });
    }
    if log.is_empty() {
        return Err(PulseError::InsufficientData {
            what: "signal log entries".into(),
            have: 0,
            need: 1,
        });
    }

    let mut ordered = executions.to_vec();
    ordered.sort_by_key(|p| p.date);

    let mut standard = PlanResult::default();
    let mut adjusted = PlanResult::default();
    let mut curve = Vec::with_capacity(ordered.len());
    let mut skipped = 0;

    for exec in &ordered {
        if !(exec.close.is_finite() && exec.close > 0.0) {
            tracing::warn!(date = %exec.date, price = exec.close, "skipping execution without a usable price");
            skipped += 1;
            continue;
        }
        let Some(tier) = tier_near(log, exec.date) else {
            continue;
        };
        let multiplier = tier.dca_multiplier();

        standard.buy(weekly_amount, exec.close);
        adjusted.buy(weekly_amount * multiplier, exec.close);
        curve.push(CurvePoint {
            date: exec.date,
            tier,
            multiplier,
            standard_value: standard.btc * current_price,
            adjusted_value: adjusted.btc * current_price,
        });
    }

    standard.mark(current_price);
    adjusted.mark(current_price);

    let difference = adjusted.value - standard.value;
    let difference_pct = if standard.value > 0.0 {
        (adjusted.value / standard.value - 1.0) * 100.0
    } else {
        0.0
    };

    Ok(DcaReport {
        weekly_amount,
        current_price,
        standard,
        adjusted,
        difference,
        difference_pct,
        executed: curve.len(),
        skipped,
        curve,
    })
}
