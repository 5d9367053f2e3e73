//! End-to-end tests of the evaluation pipeline through the port traits.

mod common;

use approx::assert_relative_eq;
use btcpulse::domain::alerts::{
    detect_anomalies, detect_tier_change, store_current, AnomalyThresholds, Direction,
};
use btcpulse::domain::catalog::{catalog, IndicatorId, INDICATOR_COUNT};
use btcpulse::domain::dca::{record_tier, simulate};
use btcpulse::domain::derive::derive;
use btcpulse::domain::error::PulseError;
use btcpulse::domain::price::PricePoint;
use btcpulse::domain::raw_metrics::{MetricDefaults, MetricKey, RawMetrics};
use btcpulse::domain::signal::Signal;
use btcpulse::domain::signal_builder::build_signals;
use btcpulse::domain::verdict::{aggregate, tier_for_counts, Tier};
use btcpulse::ports::history_port::SignalLog;
use btcpulse::ports::metrics_port::MetricsPort;
use common::*;
use proptest::prelude::*;

fn evaluate(raw: &RawMetrics) -> (Vec<btcpulse::domain::signal_builder::SignalRecord>, btcpulse::domain::verdict::Verdict) {
    let signals = build_signals(raw, catalog(), &MetricDefaults::default()).unwrap();
    let verdict = aggregate(&signals).unwrap();
    (signals, verdict)
}

mod pipeline {
    use super::*;

    #[test]
    fn bullish_snapshot_is_high_historical_value() {
        let port = MockMetricsPort::new(bullish_snapshot());
        let (signals, verdict) = evaluate(&port.load_snapshot().unwrap());

        assert_eq!(signals.len(), INDICATOR_COUNT);
        assert!(signals.iter().all(|s| s.signal == Signal::Buy), "{:#?}", signals);
        assert!(signals.iter().all(|s| !s.degraded));
        assert_eq!(verdict.tier, Tier::HighHistoricalValue);
        assert_relative_eq!(verdict.score, 100.0);
    }

    #[test]
    fn bearish_snapshot_is_high_risk() {
        let (signals, verdict) = evaluate(&bearish_snapshot());
        assert!(signals.iter().all(|s| s.signal == Signal::Sell), "{:#?}", signals);
        assert_eq!(verdict.tier, Tier::HighRisk);
        assert_relative_eq!(verdict.score, 0.0);
        assert_eq!(verdict.color, "#FF3D57");
    }

    #[test]
    fn empty_snapshot_uses_defaults_for_every_record() {
        let (signals, verdict) = evaluate(&RawMetrics::new());
        assert_eq!(signals.len(), INDICATOR_COUNT);
        assert!(signals.iter().all(|s| s.degraded));
        assert_eq!(verdict.total, INDICATOR_COUNT);
    }

    #[test]
    fn records_follow_catalog_order() {
        let (signals, _) = evaluate(&bullish_snapshot());
        let ids: Vec<IndicatorId> = signals.iter().map(|s| s.id).collect();
        let expected: Vec<IndicatorId> = catalog().iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn mvrv_zero_is_buy() {
        let raw = bullish_snapshot().with(MetricKey::MvrvZscore, 0.0);
        let (signals, _) = evaluate(&raw);
        let mvrv = signals.iter().find(|s| s.id == IndicatorId::MvrvZscore).unwrap();
        assert_eq!(mvrv.signal, Signal::Buy);
    }

    #[test]
    fn dominance_sixty_is_buy() {
        let raw = bearish_snapshot().with(MetricKey::BtcDominance, 60.0);
        let (signals, _) = evaluate(&raw);
        let dom = signals.iter().find(|s| s.id == IndicatorId::BtcDominance).unwrap();
        assert_eq!(dom.signal, Signal::Buy);
    }

    #[test]
    fn non_finite_reading_degrades_single_record() {
        let raw = bullish_snapshot().with(MetricKey::Cbbi, f64::NAN);
        let (signals, verdict) = evaluate(&raw);
        let degraded: Vec<IndicatorId> = signals.iter().filter(|s| s.degraded).map(|s| s.id).collect();
        assert_eq!(degraded, vec![IndicatorId::Cbbi]);
        assert_eq!(verdict.total, INDICATOR_COUNT);
    }

    #[test]
    fn metrics_source_failure_propagates() {
        let port = MockMetricsPort::failing("feed offline");
        assert!(matches!(
            port.load_snapshot(),
            Err(PulseError::MetricsSource { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_fatal() {
        let signals = build_signals(&bullish_snapshot(), &[], &MetricDefaults::default()).unwrap();
        assert!(matches!(aggregate(&signals), Err(PulseError::EmptyCatalog)));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let raw = bullish_snapshot().with(MetricKey::FearGreed, 60.0);
        assert_eq!(evaluate(&raw), evaluate(&raw));
    }

    #[test]
    fn derived_metrics_fill_snapshot_gaps() {
        let daily: Vec<f64> = (0..400).map(|i| 30_000.0 + i as f64 * 10.0).collect();
        let weekly: Vec<f64> = (0..120).map(|i| 20_000.0 + i as f64 * 50.0).collect();
        let mut raw = derive(&daily, &weekly, 34_000.0).unwrap().to_raw_metrics();
        raw.merge(
            RawMetrics::new()
                .with(MetricKey::FearGreed, 40.0)
                .with(MetricKey::Rsi14, 50.0),
        );

        assert_eq!(raw.get(MetricKey::Rsi14), Some(50.0));
        assert!(raw.get(MetricKey::MayerMultiple).is_some());
        assert!(raw.get(MetricKey::PiRatio).is_some());

        let (signals, _) = evaluate(&raw);
        let mayer = signals.iter().find(|s| s.id == IndicatorId::MayerMultiple).unwrap();
        assert!(!mayer.degraded);
        let pi = signals.iter().find(|s| s.id == IndicatorId::PiCycleTop).unwrap();
        assert!(!pi.degraded);
    }
}

mod history {
    use super::*;

    #[test]
    fn tier_change_and_anomalies_across_runs() {
        let store = MemoryHistory::new();
        let thresholds = AnomalyThresholds::default();

        let first = bullish_snapshot();
        let (_, v1) = evaluate(&first);
        assert_eq!(detect_tier_change(&store, v1.tier).unwrap(), None);
        assert!(detect_anomalies(&store, &first, &thresholds).unwrap().is_empty());
        store_current(&store, v1.tier, &first).unwrap();

        let second = bearish_snapshot();
        let (_, v2) = evaluate(&second);
        let change = detect_tier_change(&store, v2.tier).unwrap().unwrap();
        assert_eq!(change.previous, Tier::HighHistoricalValue);
        assert_eq!(change.current, Tier::HighRisk);

        let anomalies = detect_anomalies(&store, &second, &thresholds).unwrap();
        let metrics: Vec<MetricKey> = anomalies.iter().map(|a| a.metric).collect();
        assert_eq!(
            metrics,
            vec![MetricKey::FearGreed, MetricKey::Chg24h, MetricKey::MvrvZscore]
        );
        assert!(anomalies.iter().all(|a| a.direction == Direction::Jumped));
    }

    #[test]
    fn signal_log_drives_dca_simulation() {
        let log = MemoryHistory::new();
        assert!(record_tier(&log, date(2025, 2, 24), Tier::HighHistoricalValue).unwrap());
        assert!(!record_tier(&log, date(2025, 2, 24), Tier::HighRisk).unwrap());
        assert!(record_tier(&log, date(2025, 3, 10), Tier::ElevatedRisk).unwrap());

        let executions = vec![
            PricePoint::new(date(2025, 2, 24), 90_000.0),
            PricePoint::new(date(2025, 3, 3), 85_000.0),
            PricePoint::new(date(2025, 3, 10), 80_000.0),
        ];
        let report = simulate(&log.entries().unwrap(), &executions, 100.0, 88_000.0).unwrap();

        // 3 Mar is 7 days from both log dates, so the earlier tier applies
        let multipliers: Vec<f64> = report.curve.iter().map(|p| p.multiplier).collect();
        assert_eq!(multipliers, vec![1.5, 1.5, 0.25]);
        assert_relative_eq!(report.standard.invested, 300.0);
        assert_relative_eq!(report.adjusted.invested, 325.0);
    }
}

mod properties {
    use super::*;

    fn reading() -> impl Strategy<Value = f64> {
        prop_oneof![
            8 => -100.0..200_000.0f64,
            2 => prop::num::f64::NORMAL,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
        ]
    }

    fn price() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            Just(None),
            (1.0..200_000.0f64).prop_map(Some),
            prop::num::f64::POSITIVE.prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn counts_always_sum_to_total(
            values in proptest::collection::vec(reading(), MetricKey::ALL.len()),
            keep in proptest::collection::vec(any::<bool>(), MetricKey::ALL.len()),
            price in price(),
        ) {
            let mut raw = RawMetrics::new();
            for ((key, value), keep) in MetricKey::ALL.iter().zip(values).zip(keep) {
                if keep {
                    raw.insert(*key, value);
                }
            }
            raw.price = price;
            let signals = build_signals(&raw, catalog(), &MetricDefaults::default());
            prop_assert!(signals.is_ok(), "{:?}", signals);
            let signals = signals.unwrap();
            prop_assert_eq!(signals.len(), INDICATOR_COUNT);
            let verdict = aggregate(&signals).unwrap();
            prop_assert_eq!(verdict.buy_count + verdict.caution_count + verdict.sell_count, verdict.total);
            prop_assert_eq!(verdict.total, INDICATOR_COUNT);
            prop_assert!((0.0..=100.0).contains(&verdict.score));
        }

        #[test]
        fn tier_assignment_is_total(total in 1usize..50, buy_frac in 0.0..=1.0f64, sell_frac in 0.0..=1.0f64) {
            let buy = ((total as f64) * buy_frac) as usize;
            let sell = (((total - buy) as f64) * sell_frac) as usize;
            let (tier, score) = tier_for_counts(buy, sell, total).unwrap();
            prop_assert!(Tier::ALL.contains(&tier));
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }
}
