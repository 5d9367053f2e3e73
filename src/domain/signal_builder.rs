//! Signal catalog builder.
//!
//! Applies each [`IndicatorSpec`] rule to the matching readings in a
//! [`RawMetrics`] snapshot and formats the per-indicator display string and
//! zone description. Exactly one [`SignalRecord`] is produced per catalog entry; a
//! reading that cannot be used is replaced by its default and the record is
//! marked `degraded`.

use serde::Serialize;

use crate::domain::catalog::{IndicatorId, IndicatorSpec};
use crate::domain::classifier::Reading;
use crate::domain::error::PulseError;
use crate::domain::format::{plus_if_non_negative, thousands};
use crate::domain::raw_metrics::{MetricDefaults, MetricKey, RawMetrics, Resolved};
use crate::domain::signal::{Category, Signal};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub id: IndicatorId,
    pub name: &'static str,
    pub category: Category,
    pub raw_value: f64,
    pub display: String,
    pub signal: Signal,
    pub zone_description: String,
    pub buy_zone: &'static str,
    pub sell_zone: &'static str,
    pub description: &'static str,
    pub degraded: bool,
}

struct Outcome {
    raw_value: f64,
    display: String,
    signal: Signal,
    zone: String,
    degraded: bool,
}

/// Build one record per catalog entry, in catalog order.
pub fn build_signals(
    raw: &RawMetrics,
    specs: &[IndicatorSpec],
    defaults: &MetricDefaults,
) -> Result<Vec<SignalRecord>, PulseError> {
    let records = specs
        .iter()
        .map(|spec| build_record(spec, raw, defaults))
        .collect::<Result<Vec<_>, _>>()?;

    let degraded = records.iter().filter(|r| r.degraded).count();
    if degraded > 0 {
        tracing::warn!(degraded, total = records.len(), "signals built from defaults");
    }
    Ok(records)
}

pub fn build_record(
    spec: &IndicatorSpec,
    raw: &RawMetrics,
    defaults: &MetricDefaults,
) -> Result<SignalRecord, PulseError> {
    let metric_name = spec.id.to_string();
    let classify = |reading: Reading| spec.rule.evaluate(&metric_name, reading);
    let metric = |key: MetricKey| defaults.resolve(raw, key);

    let outcome = match spec.id {
        IndicatorId::FearGreed => {
            let fg = metric(MetricKey::FearGreed);
            let label = raw
                .fear_greed_label
                .clone()
                .unwrap_or_else(|| defaults.fear_greed_label.clone());
            scalar(fg, classify(Reading::scalar(fg.value))?, format!("{:.0}", fg.value), label)
        }
        IndicatorId::MvrvZscore => {
            let mvrv = metric(MetricKey::MvrvZscore);
            let v = mvrv.value;
            let zone = if v < 0.0 {
                "Deep value zone"
            } else if v < 2.0 {
                "Fair value"
            } else {
                "Elevated"
            };
            scalar(mvrv, classify(Reading::scalar(v))?, format!("{:.2}", v), zone)
        }
        IndicatorId::Nupl => {
            let mut nupl = metric(MetricKey::Nupl);
            let mut pct = nupl_percent(nupl.value);
            if !MetricKey::Nupl.accepts(pct) {
                tracing::warn!(value = nupl.value, "nupl percent overflowed, using default");
                nupl = Resolved {
                    value: defaults.get(MetricKey::Nupl),
                    degraded: true,
                };
                pct = nupl_percent(nupl.value);
            }
            let zone = if pct < 0.0 {
                "Capitulation"
            } else if pct < 25.0 {
                "Fear"
            } else if pct < 50.0 {
                "Hope"
            } else if pct < 75.0 {
                "Optimism"
            } else {
                "Euphoria"
            };
            Outcome {
                raw_value: pct,
                display: format!("{:.1}%", pct),
                signal: classify(Reading::scalar(pct))?,
                zone: zone.to_string(),
                degraded: nupl.degraded,
            }
        }
        IndicatorId::PuellMultiple => {
            let puell = metric(MetricKey::PuellMultiple);
            let v = puell.value;
            let zone = if v < 0.5 {
                "Miner capitulation zone"
            } else if v < 2.0 {
                "Normal range"
            } else {
                "Elevated miner revenue"
            };
            scalar(puell, classify(Reading::scalar(v))?, format!("{:.2}", v), zone)
        }
        IndicatorId::RhodlRatio => {
            let rhodl = metric(MetricKey::RhodlRatio);
            let v = rhodl.value;
            let zone = if v < 5000.0 {
                "Early cycle / accumulation"
            } else if v < 20_000.0 {
                "Mid cycle"
            } else {
                "Late cycle"
            };
            scalar(rhodl, classify(Reading::scalar(v))?, thousands(v), zone)
        }
        IndicatorId::ReserveRisk => {
            let rr = metric(MetricKey::ReserveRisk);
            let v = rr.value;
            let zone = if v < 0.0012 {
                "Excellent risk/reward"
            } else if v < 0.005 {
                "Moderate"
            } else {
                "Elevated risk"
            };
            scalar(rr, classify(Reading::scalar(v))?, format!("{:.4}", v), zone)
        }
        IndicatorId::MayerMultiple => {
            let mayer = metric(MetricKey::MayerMultiple);
            let v = mayer.value;
            let zone = if v < 0.8 {
                "Extreme discount"
            } else if v < 1.0 {
                "Below average"
            } else if v < 1.5 {
                "Fair"
            } else {
                "Premium"
            };
            scalar(mayer, classify(Reading::scalar(v))?, format!("{:.2}x", v), zone)
        }
        IndicatorId::Ma200wHeatmap => {
            let ma = metric(MetricKey::Ma200w);
            let pct = pct_above_200w(raw, defaults, ma);
            let zone = if pct.value < 0.0 {
                "Below 200W MA, historic buy zone".to_string()
            } else {
                format!("{:.0}% above 200W MA", pct.value)
            };
            Outcome {
                raw_value: pct.value,
                display: format!("{:+.1}% vs ${}", pct.value, thousands(ma.value)),
                signal: classify(Reading::scalar(pct.value))?,
                zone,
                degraded: pct.degraded || ma.degraded,
            }
        }
        IndicatorId::Ma2yrMultiplier => {
            let ratio = metric(MetricKey::Ma2yrRatio);
            let v = ratio.value;
            let zone = if v < 1.0 {
                "Below 2yr MA".to_string()
            } else {
                format!("{:.2}x above 2yr MA", v)
            };
            scalar(ratio, classify(Reading::scalar(v))?, format!("{:.2}x", v), zone)
        }
        IndicatorId::Ahr999 => {
            let ahr = metric(MetricKey::Ahr999);
            let v = ahr.value;
            let zone = if v < 0.45 {
                "DCA zone"
            } else if v < 1.2 {
                "Buy zone"
            } else if v < 4.0 {
                "Hold"
            } else {
                "Sell zone"
            };
            scalar(ahr, classify(Reading::scalar(v))?, format!("{:.2}", v), zone)
        }
        IndicatorId::Rsi14 => {
            let rsi = metric(MetricKey::Rsi14);
            let v = rsi.value;
            let zone = if v < 30.0 {
                "Oversold"
            } else if v < 70.0 {
                "Neutral"
            } else {
                "Overbought"
            };
            scalar(rsi, classify(Reading::scalar(v))?, format!("{:.1}", v), zone)
        }
        IndicatorId::RsiWeekly => {
            let rsi = metric(MetricKey::RsiWeekly);
            let v = rsi.value;
            let zone = if v < 35.0 {
                "Oversold, strong buy signal"
            } else if v < 65.0 {
                "Neutral"
            } else {
                "Overbought"
            };
            scalar(rsi, classify(Reading::scalar(v))?, format!("{:.1}", v), zone)
        }
        IndicatorId::PiCycleTop => {
            let ratio = metric(MetricKey::PiRatio);
            let (triggered, trigger_degraded) = match raw.pi_triggered {
                Some(t) => (t, false),
                None if !ratio.degraded => (ratio.value >= 1.0, false),
                None => (defaults.pi_triggered, true),
            };
            let signal = classify(Reading::pi_cycle(ratio.value, triggered))?;
            let display = if triggered {
                "TRIGGERED".to_string()
            } else {
                format!("{:.2} ratio", ratio.value)
            };
            let zone = match signal {
                Signal::Sell => "CYCLE TOP SIGNAL ACTIVE",
                Signal::Caution => "Approaching trigger",
                Signal::Buy => "Not triggered, safe",
            };
            Outcome {
                raw_value: ratio.value,
                display,
                signal,
                zone: zone.to_string(),
                degraded: ratio.degraded || trigger_degraded,
            }
        }
        IndicatorId::BtcDominance => {
            let dom = metric(MetricKey::BtcDominance);
            let v = dom.value;
            let zone = if v > 60.0 {
                "BTC strongly dominant"
            } else if v > 50.0 {
                "Moderate dominance"
            } else {
                "Low dominance, altcoin season"
            };
            scalar(dom, classify(Reading::scalar(v))?, format!("{:.1}%", v), zone)
        }
        IndicatorId::AltcoinSeason => {
            let alt = metric(MetricKey::AltcoinSeason);
            let v = alt.value;
            let zone = if v < 25.0 {
                "Bitcoin season"
            } else if v < 75.0 {
                "Mixed market"
            } else {
                "Altcoin season"
            };
            scalar(alt, classify(Reading::scalar(v))?, format!("{:.0}/100", v), zone)
        }
        IndicatorId::Cbbi => {
            let cbbi = metric(MetricKey::Cbbi);
            let v = cbbi.value;
            let zone = if v < 30.0 {
                "Early cycle, accumulate"
            } else if v < 65.0 {
                "Mid cycle"
            } else if v < 90.0 {
                "Late cycle, caution"
            } else {
                "Cycle top"
            };
            scalar(cbbi, classify(Reading::scalar(v))?, format!("{:.0}/100", v), zone)
        }
        IndicatorId::GlobalLiquidity => {
            let yoy = metric(MetricKey::GliYoy);
            let now = metric(MetricKey::GliNow);
            let (y, n) = (yoy.value, now.value);
            let zone = if y > 5.0 {
                format!("GLI expanding +{:.1}% YoY (${:.1}T). Central banks are injecting liquidity.", y, n)
            } else if y > 0.0 {
                format!("GLI growing +{:.1}% YoY (${:.1}T). Modest expansion in global liquidity.", y, n)
            } else if y > -5.0 {
                format!("GLI flat/slightly contracting {:.1}% YoY (${:.1}T). Liquidity is tightening.", y, n)
            } else {
                format!("GLI contracting {:.1}% YoY (${:.1}T). Significant liquidity withdrawal.", y, n)
            };
            Outcome {
                raw_value: y,
                display: format!("{:.1}T ({}{:.1}% YoY)", n, plus_if_non_negative(y), y),
                signal: classify(Reading::scalar(y))?,
                zone,
                degraded: yoy.degraded || now.degraded,
            }
        }
        IndicatorId::DollarIndex => {
            let level = metric(MetricKey::DxyValue);
            let change = metric(MetricKey::DxyChange);
            let (l, c) = (level.value, change.value);
            let signal = classify(Reading::dollar(l, c))?;
            let zone = match signal {
                Signal::Buy => format!("DXY at {:.1}. Weak/falling dollar is a tailwind for Bitcoin.", l),
                Signal::Sell => format!("DXY at {:.1}. Strong/rising dollar tightens global liquidity.", l),
                Signal::Caution => format!("DXY at {:.1}. Dollar consolidating.", l),
            };
            Outcome {
                raw_value: l,
                display: format!("{:.2} ({}{:.2}%)", l, plus_if_non_negative(c), c),
                signal,
                zone,
                degraded: level.degraded || change.degraded,
            }
        }
        IndicatorId::BtcVsSpx => {
            let btc = metric(MetricKey::Btc90d);
            let spx = metric(MetricKey::Spx90d);
            let divergence = spx_divergence(raw, defaults, btc, spx);
            let d = divergence.value;
            let signal = classify(Reading::scalar(d))?;
            let returns = format!(
                "BTC {:+.1}% vs S&P 500 {:+.1}% over 90 days.",
                btc.value, spx.value
            );
            let zone = match signal {
                Signal::Buy => format!("{} BTC is underperforming equities by {:.0}%.", returns, d.abs()),
                Signal::Sell => format!("{} BTC is outperforming equities by {:.0}%.", returns, d),
                Signal::Caution => format!("{} No strong divergence signal.", returns),
            };
            Outcome {
                raw_value: d,
                display: format!("BTC {:+.1}% / SPX {:+.1}% (90d)", btc.value, spx.value),
                signal,
                zone,
                degraded: divergence.degraded || btc.degraded || spx.degraded,
            }
        }
    };

    Ok(SignalRecord {
        id: spec.id,
        name: spec.name,
        category: spec.category,
        raw_value: outcome.raw_value,
        display: outcome.display,
        signal: outcome.signal,
        zone_description: outcome.zone,
        buy_zone: spec.buy_zone,
        sell_zone: spec.sell_zone,
        description: spec.description,
        degraded: outcome.degraded,
    })
}

/// Readings below 1 are decimals, larger ones are already percent.
fn nupl_percent(value: f64) -> f64 {
    if value < 1.0 { value * 100.0 } else { value }
}

fn scalar(resolved: Resolved, signal: Signal, display: String, zone: impl Into<String>) -> Outcome {
    Outcome {
        raw_value: resolved.value,
        display,
        signal,
        zone: zone.into(),
        degraded: resolved.degraded,
    }
}

/// Reading if present, else derived from price and the 200-week MA.
fn pct_above_200w(raw: &RawMetrics, defaults: &MetricDefaults, ma: Resolved) -> Resolved {
    if raw.get(MetricKey::PctAbove200w).is_none() {
        if let Some(price) = raw.price {
            let pct = (price - ma.value) / ma.value * 100.0;
            if !ma.degraded && ma.value > 0.0 && MetricKey::PctAbove200w.accepts(pct) {
                return Resolved {
                    value: pct,
                    degraded: false,
                };
            }
        }
    }
    defaults.resolve(raw, MetricKey::PctAbove200w)
}

/// Reading if present, else BTC minus SPX 90-day return.
fn spx_divergence(
    raw: &RawMetrics,
    defaults: &MetricDefaults,
    btc: Resolved,
    spx: Resolved,
) -> Resolved {
    let divergence = btc.value - spx.value;
    if raw.get(MetricKey::SpxDivergence).is_none()
        && !btc.degraded
        && !spx.degraded
        && MetricKey::SpxDivergence.accepts(divergence)
    {
        return Resolved {
            value: divergence,
            degraded: false,
        };
    }
    defaults.resolve(raw, MetricKey::SpxDivergence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{catalog, find};

    fn record(id: IndicatorId, raw: &RawMetrics) -> SignalRecord {
        build_record(find(id).unwrap(), raw, &MetricDefaults::default()).unwrap()
    }

    #[test]
    fn empty_snapshot_still_yields_every_record() {
        let records = build_signals(&RawMetrics::new(), catalog(), &MetricDefaults::default()).unwrap();
        assert_eq!(records.len(), 19);
        assert!(records.iter().all(|r| r.degraded));
    }

    #[test]
    fn records_follow_spec_order() {
        let records = build_signals(&RawMetrics::new(), catalog(), &MetricDefaults::default()).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        let expected: Vec<_> = catalog().iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn mvrv_zero_is_buy() {
        let r = record(IndicatorId::MvrvZscore, &RawMetrics::new().with(MetricKey::MvrvZscore, 0.0));
        assert_eq!(r.signal, Signal::Buy);
        assert_eq!(r.display, "0.00");
        assert_eq!(r.zone_description, "Fair value");
        assert!(!r.degraded);
    }

    #[test]
    fn dominance_sixty_is_buy() {
        let r = record(IndicatorId::BtcDominance, &RawMetrics::new().with(MetricKey::BtcDominance, 60.0));
        assert_eq!(r.signal, Signal::Buy);
        assert_eq!(r.display, "60.0%");
    }

    #[test]
    fn overflowing_derived_values_fall_back_to_defaults() {
        let nupl = record(IndicatorId::Nupl, &RawMetrics::new().with(MetricKey::Nupl, -1e307));
        assert!(nupl.degraded);
        assert_eq!(nupl.display, "19.0%");

        let mut raw = RawMetrics::new().with(MetricKey::Ma200w, 1.0);
        raw.price = Some(1.7e308);
        let heatmap = record(IndicatorId::Ma200wHeatmap, &raw);
        assert!(heatmap.degraded);
        assert_eq!(heatmap.raw_value, 50.0);

        let raw = RawMetrics::new()
            .with(MetricKey::Btc90d, 1e308)
            .with(MetricKey::Spx90d, -1e308);
        let divergence = record(IndicatorId::BtcVsSpx, &raw);
        assert!(divergence.degraded);
        assert_eq!(divergence.raw_value, -33.0);

        let records = build_signals(&raw, catalog(), &MetricDefaults::default()).unwrap();
        assert_eq!(records.len(), 19);
    }

    #[test]
    fn nupl_decimal_is_scaled_to_percent() {
        let r = record(IndicatorId::Nupl, &RawMetrics::new().with(MetricKey::Nupl, 0.19));
        assert_eq!(r.display, "19.0%");
        assert_eq!(r.signal, Signal::Buy);
        assert_eq!(r.zone_description, "Fear");

        let r = record(IndicatorId::Nupl, &RawMetrics::new().with(MetricKey::Nupl, 62.0));
        assert_eq!(r.display, "62.0%");
        assert_eq!(r.signal, Signal::Sell);
    }

    #[test]
    fn ma_200w_display_format() {
        let raw = RawMetrics::new()
            .with(MetricKey::PctAbove200w, 12.34)
            .with(MetricKey::Ma200w, 58_500.0);
        let r = record(IndicatorId::Ma200wHeatmap, &raw);
        assert_eq!(r.display, "+12.3% vs $58,500");
        assert_eq!(r.signal, Signal::Caution);

        let raw = RawMetrics::new()
            .with(MetricKey::PctAbove200w, -4.0)
            .with(MetricKey::Ma200w, 61_234.0);
        let r = record(IndicatorId::Ma200wHeatmap, &raw);
        assert_eq!(r.display, "-4.0% vs $61,234");
        assert_eq!(r.signal, Signal::Buy);
    }

    #[test]
    fn ma_200w_pct_derived_from_price() {
        let mut raw = RawMetrics::new().with(MetricKey::Ma200w, 50_000.0);
        raw.price = Some(75_000.0);
        let r = record(IndicatorId::Ma200wHeatmap, &raw);
        assert_eq!(r.raw_value, 50.0);
        assert!(!r.degraded);
    }

    #[test]
    fn rhodl_uses_thousands_separator() {
        let r = record(IndicatorId::RhodlRatio, &RawMetrics::new().with(MetricKey::RhodlRatio, 12_345.6));
        assert_eq!(r.display, "12,346");
        assert_eq!(r.signal, Signal::Caution);
    }

    #[test]
    fn unit_suffix_formats() {
        let raw = RawMetrics::new()
            .with(MetricKey::MayerMultiple, 0.644)
            .with(MetricKey::ReserveRisk, 0.00131)
            .with(MetricKey::Cbbi, 31.4)
            .with(MetricKey::AltcoinSeason, 43.0);
        assert_eq!(record(IndicatorId::MayerMultiple, &raw).display, "0.64x");
        assert_eq!(record(IndicatorId::ReserveRisk, &raw).display, "0.0013");
        assert_eq!(record(IndicatorId::Cbbi, &raw).display, "31/100");
        assert_eq!(record(IndicatorId::AltcoinSeason, &raw).display, "43/100");
    }

    #[test]
    fn pi_cycle_trigger_and_display() {
        let mut raw = RawMetrics::new().with(MetricKey::PiRatio, 1.01);
        raw.pi_triggered = Some(true);
        let r = record(IndicatorId::PiCycleTop, &raw);
        assert_eq!(r.signal, Signal::Sell);
        assert_eq!(r.display, "TRIGGERED");

        let r = record(IndicatorId::PiCycleTop, &RawMetrics::new().with(MetricKey::PiRatio, 0.9));
        assert_eq!(r.signal, Signal::Caution);
        assert_eq!(r.display, "0.90 ratio");
        assert!(!r.degraded);
    }

    #[test]
    fn pi_cycle_trigger_derived_from_ratio_when_flag_missing() {
        let r = record(IndicatorId::PiCycleTop, &RawMetrics::new().with(MetricKey::PiRatio, 1.0));
        assert_eq!(r.signal, Signal::Sell);
    }

    #[test]
    fn macro_display_formats() {
        let raw = RawMetrics::new()
            .with(MetricKey::GliNow, 19.04)
            .with(MetricKey::GliYoy, 2.26)
            .with(MetricKey::DxyValue, 103.456)
            .with(MetricKey::DxyChange, -0.12);
        let gli = record(IndicatorId::GlobalLiquidity, &raw);
        assert_eq!(gli.display, "19.0T (+2.3% YoY)");
        assert_eq!(gli.signal, Signal::Buy);

        let dxy = record(IndicatorId::DollarIndex, &raw);
        assert_eq!(dxy.display, "103.46 (-0.12%)");
        assert_eq!(dxy.signal, Signal::Caution);
    }

    #[test]
    fn spx_divergence_derived_from_returns() {
        let raw = RawMetrics::new()
            .with(MetricKey::Btc90d, -28.0)
            .with(MetricKey::Spx90d, 5.0);
        let r = record(IndicatorId::BtcVsSpx, &raw);
        assert_eq!(r.raw_value, -33.0);
        assert_eq!(r.signal, Signal::Buy);
        assert_eq!(r.display, "BTC -28.0% / SPX +5.0% (90d)");
        assert!(!r.degraded);
    }

    #[test]
    fn non_finite_reading_degrades_instead_of_failing() {
        let raw = RawMetrics::new().with(MetricKey::Rsi14, f64::NAN);
        let r = record(IndicatorId::Rsi14, &raw);
        assert!(r.degraded);
        assert_eq!(r.raw_value, 35.0);
        assert_eq!(r.signal, Signal::Caution);
    }

    #[test]
    fn fear_greed_zone_uses_label() {
        let mut raw = RawMetrics::new().with(MetricKey::FearGreed, 12.0);
        raw.fear_greed_label = Some("Extreme Fear".into());
        let r = record(IndicatorId::FearGreed, &raw);
        assert_eq!(r.zone_description, "Extreme Fear");
        assert_eq!(r.display, "12");
        assert_eq!(r.signal, Signal::Buy);
    }
}
