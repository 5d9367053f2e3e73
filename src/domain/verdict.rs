//! Verdict aggregation.
//!
//! Reduces a signal list to one of five tiers with an ordered decision list
//! (first match wins):
//!
//! 1. buy share >= 60%  -> High Historical Value Zone, score = buy%
//! 2. buy share >= 40%  -> Value Accumulation Zone, score = buy%
//! 3. sell share >= 60% -> High Risk Zone, score = 100 - sell%
//! 4. sell share >= 40% -> Elevated Risk Zone, score = 100 - sell%
//! 5. otherwise         -> Neutral Data Zone, score = 50
//!
//! Share thresholds are compared on integer counts so a share landing exactly
//! on 40% or 60% is never lost to float rounding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::PulseError;
use crate::domain::signal::Signal;
use crate::domain::signal_builder::SignalRecord;

/// Overall verdict tier, most bullish first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    HighHistoricalValue,
    ValueAccumulation,
    Neutral,
    ElevatedRisk,
    HighRisk,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::HighHistoricalValue,
        Tier::ValueAccumulation,
        Tier::Neutral,
        Tier::ElevatedRisk,
        Tier::HighRisk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::HighHistoricalValue => "High Historical Value Zone",
            Tier::ValueAccumulation => "Value Accumulation Zone",
            Tier::Neutral => "Neutral Data Zone",
            Tier::ElevatedRisk => "Elevated Risk Zone",
            Tier::HighRisk => "High Risk Zone",
        }
    }

    /// Label used by the earlier naming scheme.
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Tier::HighHistoricalValue => "STRONG BUY",
            Tier::ValueAccumulation => "ACCUMULATE",
            Tier::Neutral => "NEUTRAL — WATCH",
            Tier::ElevatedRisk => "CAUTION — HOLD",
            Tier::HighRisk => "SELL / REDUCE",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Tier::HighHistoricalValue => "#00C853",
            Tier::ValueAccumulation => "#69F0AE",
            Tier::Neutral => "#FFC107",
            Tier::ElevatedRisk => "#FF6B35",
            Tier::HighRisk => "#FF3D57",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tier::HighHistoricalValue => {
                "The majority of indicators are in historically low-risk territory. Data is consistent with past value accumulation zones."
            }
            Tier::ValueAccumulation => {
                "Most indicators are in value territory. Historical data shows this zone has been associated with accumulation activity."
            }
            Tier::Neutral => {
                "Mixed signals across indicators. The data does not strongly favour either value or risk territory at this time."
            }
            Tier::ElevatedRisk => {
                "Several indicators are in elevated territory. Historical data shows this zone has been associated with reduced allocation periods."
            }
            Tier::HighRisk => {
                "The majority of indicators are in historically high-risk territory. Data is consistent with past cycle peak zones."
            }
        }
    }

    /// Weekly DCA allocation multiplier for signal-adjusted accumulation.
    pub fn dca_multiplier(&self) -> f64 {
        match self {
            Tier::HighHistoricalValue => 1.5,
            Tier::ValueAccumulation => 1.0,
            Tier::Neutral => 0.5,
            Tier::ElevatedRisk => 0.25,
            Tier::HighRisk => 0.0,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tier {
    type Err = String;

    /// Accepts the current label or the legacy one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Tier::ALL
            .iter()
            .copied()
            .find(|t| t.label().eq_ignore_ascii_case(s) || t.legacy_label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tier '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub tier: Tier,
    pub color: &'static str,
    pub score: f64,
    pub buy_count: usize,
    pub caution_count: usize,
    pub sell_count: usize,
    pub total: usize,
}

/// Signal counts `(buy, caution, sell)`.
pub fn count_signals(signals: &[SignalRecord]) -> (usize, usize, usize) {
    signals
        .iter()
        .fold((0, 0, 0), |(buy, caution, sell), record| match record.signal {
            Signal::Buy => (buy + 1, caution, sell),
            Signal::Caution => (buy, caution + 1, sell),
            Signal::Sell => (buy, caution, sell + 1),
        })
}

/// Tier and score for a set of counts.
///
/// A zero `total` means no indicators were evaluated and is an
/// [`PulseError::EmptyCatalog`] error.
pub fn tier_for_counts(buy: usize, sell: usize, total: usize) -> Result<(Tier, f64), PulseError> {
    if total == 0 {
        return Err(PulseError::EmptyCatalog);
    }
    let buy_pct = buy as f64 / total as f64;
    let sell_pct = sell as f64 / total as f64;
    let at_least = |count: usize, fifths: usize| count * 5 >= total * fifths;

    let result = if at_least(buy, 3) {
        (Tier::HighHistoricalValue, buy_pct * 100.0)
    } else if at_least(buy, 2) {
        (Tier::ValueAccumulation, buy_pct * 100.0)
    } else if at_least(sell, 3) {
        (Tier::HighRisk, 100.0 - sell_pct * 100.0)
    } else if at_least(sell, 2) {
        (Tier::ElevatedRisk, 100.0 - sell_pct * 100.0)
    } else {
        (Tier::Neutral, 50.0)
    };
    Ok(result)
}

/// Aggregate a full signal list into a verdict.
///
/// An empty list is a configuration error: the indicator catalog is never
/// empty in a correctly built binary.
pub fn aggregate(signals: &[SignalRecord]) -> Result<Verdict, PulseError> {
    if signals.is_empty() {
        return Err(PulseError::EmptyCatalog);
    }

    let total = signals.len();
    let (buy_count, caution_count, sell_count) = count_signals(signals);
    let (tier, score) = tier_for_counts(buy_count, sell_count, total)?;

    Ok(Verdict {
        tier,
        color: tier.color(),
        score,
        buy_count,
        caution_count,
        sell_count,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::IndicatorId;
    use crate::domain::signal::Category;
    use approx::assert_relative_eq;

    fn record(signal: Signal) -> SignalRecord {
        SignalRecord {
            id: IndicatorId::Cbbi,
            name: "test",
            category: Category::MarketStructure,
            raw_value: 0.0,
            display: String::new(),
            signal,
            zone_description: String::new(),
            buy_zone: "",
            sell_zone: "",
            description: "",
            degraded: false,
        }
    }

    fn signals(buy: usize, caution: usize, sell: usize) -> Vec<SignalRecord> {
        let mut v = Vec::new();
        v.extend((0..buy).map(|_| record(Signal::Buy)));
        v.extend((0..caution).map(|_| record(Signal::Caution)));
        v.extend((0..sell).map(|_| record(Signal::Sell)));
        v
    }

    #[test]
    fn bullish_scenario() {
        let v = aggregate(&signals(12, 5, 2)).unwrap();
        assert_eq!(v.tier, Tier::HighHistoricalValue);
        assert_eq!(v.tier.legacy_label(), "STRONG BUY");
        assert_relative_eq!(v.score, 1200.0 / 19.0, epsilon = 1e-9);
        assert_eq!((v.buy_count, v.caution_count, v.sell_count), (12, 5, 2));
        assert_eq!(v.color, "#00C853");
    }

    #[test]
    fn neutral_scenario() {
        let v = aggregate(&signals(6, 8, 5)).unwrap();
        assert_eq!(v.tier, Tier::Neutral);
        assert_eq!(v.score, 50.0);
    }

    #[test]
    fn bearish_scenario() {
        let v = aggregate(&signals(2, 4, 13)).unwrap();
        assert_eq!(v.tier, Tier::HighRisk);
        assert_eq!(v.tier.legacy_label(), "SELL / REDUCE");
        assert_relative_eq!(v.score, 100.0 - 1300.0 / 19.0, epsilon = 1e-9);
    }

    #[test]
    fn accumulate_band() {
        let v = aggregate(&signals(8, 6, 5)).unwrap();
        assert_eq!(v.tier, Tier::ValueAccumulation);
        assert_relative_eq!(v.score, 800.0 / 19.0, epsilon = 1e-9);
    }

    #[test]
    fn elevated_risk_band() {
        let v = aggregate(&signals(3, 7, 9)).unwrap();
        assert_eq!(v.tier, Tier::ElevatedRisk);
        assert_relative_eq!(v.score, 100.0 - 900.0 / 19.0, epsilon = 1e-9);
    }

    #[test]
    fn extreme_sell_share_is_high_risk_not_elevated() {
        // 12 of 19 sells is over 60%: the stricter threshold must be checked first
        let v = aggregate(&signals(3, 4, 12)).unwrap();
        assert_eq!(v.tier, Tier::HighRisk);
    }

    #[test]
    fn exact_threshold_shares_are_inclusive() {
        assert_eq!(tier_for_counts(3, 0, 5).unwrap().0, Tier::HighHistoricalValue);
        assert_eq!(tier_for_counts(2, 0, 5).unwrap().0, Tier::ValueAccumulation);
        assert_eq!(tier_for_counts(0, 3, 5).unwrap().0, Tier::HighRisk);
        assert_eq!(tier_for_counts(0, 2, 5).unwrap().0, Tier::ElevatedRisk);
        assert_eq!(tier_for_counts(1, 1, 5).unwrap().0, Tier::Neutral);
    }

    #[test]
    fn buy_side_wins_over_sell_side() {
        // 40% buy and 40% sell: buy branch is evaluated first
        assert_eq!(tier_for_counts(2, 2, 5).unwrap().0, Tier::ValueAccumulation);
    }

    #[test]
    fn empty_signal_list_is_error() {
        assert!(matches!(aggregate(&[]), Err(PulseError::EmptyCatalog)));
    }

    #[test]
    fn zero_total_counts_are_rejected() {
        assert!(matches!(tier_for_counts(0, 0, 0), Err(PulseError::EmptyCatalog)));
    }

    #[test]
    fn aggregate_is_idempotent() {
        let s = signals(7, 7, 5);
        assert_eq!(aggregate(&s).unwrap(), aggregate(&s).unwrap());
    }

    #[test]
    fn tier_parses_current_and_legacy_labels() {
        for tier in Tier::ALL {
            assert_eq!(tier.label().parse::<Tier>().unwrap(), tier);
            assert_eq!(tier.legacy_label().parse::<Tier>().unwrap(), tier);
        }
        assert!("MOON".parse::<Tier>().is_err());
    }

    #[test]
    fn dca_multipliers_decrease_with_risk() {
        let m: Vec<f64> = Tier::ALL.iter().map(|t| t.dca_multiplier()).collect();
        assert_eq!(m, vec![1.5, 1.0, 0.5, 0.25, 0.0]);
    }
}
