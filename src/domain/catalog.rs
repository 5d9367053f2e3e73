//! The fixed indicator table.
//!
//! Thresholds live here as data so they can be audited and tested apart from
//! the classification logic in [`crate::domain::classifier`].

use serde::Serialize;
use std::fmt;

use crate::domain::classifier::{PI_CYCLE_NEAR_TRIGGER, Rule};
use crate::domain::signal::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorId {
    FearGreed,
    MvrvZscore,
    Nupl,
    PuellMultiple,
    RhodlRatio,
    ReserveRisk,
    MayerMultiple,
    Ma200wHeatmap,
    Ma2yrMultiplier,
    Ahr999,
    Rsi14,
    RsiWeekly,
    PiCycleTop,
    BtcDominance,
    AltcoinSeason,
    Cbbi,
    GlobalLiquidity,
    DollarIndex,
    BtcVsSpx,
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorId::FearGreed => "fear_greed",
            IndicatorId::MvrvZscore => "mvrv_zscore",
            IndicatorId::Nupl => "nupl",
            IndicatorId::PuellMultiple => "puell_multiple",
            IndicatorId::RhodlRatio => "rhodl_ratio",
            IndicatorId::ReserveRisk => "reserve_risk",
            IndicatorId::MayerMultiple => "mayer_multiple",
            IndicatorId::Ma200wHeatmap => "ma_200w_heatmap",
            IndicatorId::Ma2yrMultiplier => "ma_2yr_multiplier",
            IndicatorId::Ahr999 => "ahr999",
            IndicatorId::Rsi14 => "rsi_14",
            IndicatorId::RsiWeekly => "rsi_weekly",
            IndicatorId::PiCycleTop => "pi_cycle_top",
            IndicatorId::BtcDominance => "btc_dominance",
            IndicatorId::AltcoinSeason => "altcoin_season",
            IndicatorId::Cbbi => "cbbi",
            IndicatorId::GlobalLiquidity => "global_liquidity",
            IndicatorId::DollarIndex => "dollar_index",
            IndicatorId::BtcVsSpx => "btc_vs_spx",
        };
        f.write_str(name)
    }
}

/// Static classification record for one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSpec {
    pub id: IndicatorId,
    pub name: &'static str,
    pub category: Category,
    pub rule: Rule,
    pub buy_zone: &'static str,
    pub sell_zone: &'static str,
    pub description: &'static str,
}

const fn lower_is_better(buy: f64, caution: f64, sell_reference: f64) -> Rule {
    Rule::Threshold {
        buy,
        caution,
        sell_reference,
        invert: false,
    }
}

const fn higher_is_better(buy: f64, caution: f64, sell_reference: f64) -> Rule {
    Rule::Threshold {
        buy,
        caution,
        sell_reference,
        invert: true,
    }
}

pub const INDICATOR_COUNT: usize = 19;

pub static CATALOG: [IndicatorSpec; INDICATOR_COUNT] = [
    IndicatorSpec {
        id: IndicatorId::FearGreed,
        name: "Fear & Greed Index",
        category: Category::Sentiment,
        rule: lower_is_better(25.0, 55.0, 75.0),
        buy_zone: "< 25 (Extreme Fear)",
        sell_zone: "> 75 (Extreme Greed)",
        description: "Market sentiment gauge. Extreme Fear = buying opportunity; Extreme Greed = caution.",
    },
    IndicatorSpec {
        id: IndicatorId::MvrvZscore,
        name: "MVRV Z-Score",
        category: Category::OnChain,
        rule: lower_is_better(0.0, 3.0, 5.0),
        buy_zone: "< 0 (Undervalued)",
        sell_zone: "> 5 (Overvalued)",
        description: "Measures if BTC is over/undervalued vs. realized value. Below 0 = historically great buy zone.",
    },
    IndicatorSpec {
        id: IndicatorId::Nupl,
        name: "NUPL (Net Unrealized P&L)",
        category: Category::OnChain,
        rule: lower_is_better(25.0, 50.0, 75.0),
        buy_zone: "< 25% (Fear/Capitulation)",
        sell_zone: "> 75% (Euphoria)",
        description: "Ratio of unrealized profit vs loss. Capitulation zone (<0) = extreme buy; Euphoria (>75%) = sell.",
    },
    IndicatorSpec {
        id: IndicatorId::PuellMultiple,
        name: "Puell Multiple",
        category: Category::OnChain,
        rule: lower_is_better(0.5, 2.2, 2.2),
        buy_zone: "< 0.5 (Miner Capitulation)",
        sell_zone: "> 2.2 (Miner Overprofit)",
        description: "Miner revenue vs 365-day average. Low = miner capitulation = buy signal.",
    },
    IndicatorSpec {
        id: IndicatorId::RhodlRatio,
        name: "RHODL Ratio",
        category: Category::OnChain,
        rule: lower_is_better(5000.0, 50_000.0, 50_000.0),
        buy_zone: "< 5,000 (LTH Dominant)",
        sell_zone: "> 50,000 (STH Dominant, Cycle Top)",
        description: "Ratio of 1-week vs 1-2yr realized HODL bands. Low = LTH dominance = accumulation phase.",
    },
    IndicatorSpec {
        id: IndicatorId::ReserveRisk,
        name: "Reserve Risk",
        category: Category::OnChain,
        rule: lower_is_better(0.0012, 0.005, 0.005),
        buy_zone: "< 0.0012 (Low Risk)",
        sell_zone: "> 0.005 (High Risk)",
        description: "Risk/reward of investing relative to HODLer conviction. Low = high confidence buy.",
    },
    IndicatorSpec {
        id: IndicatorId::MayerMultiple,
        name: "Mayer Multiple",
        category: Category::PriceModel,
        rule: lower_is_better(0.8, 1.5, 2.4),
        buy_zone: "< 0.8 (Deep Discount)",
        sell_zone: "> 2.4 (Overextended)",
        description: "Price divided by 200-day MA. Below 0.8 = historically excellent accumulation zone.",
    },
    IndicatorSpec {
        id: IndicatorId::Ma200wHeatmap,
        name: "200-Week MA Heatmap",
        category: Category::PriceModel,
        rule: lower_is_better(0.0, 100.0, 100.0),
        buy_zone: "Below 200W MA (< 0%)",
        sell_zone: "> 100% above 200W MA",
        description: "Price vs 200-week moving average. Every bear market bottom has touched or gone below this level.",
    },
    IndicatorSpec {
        id: IndicatorId::Ma2yrMultiplier,
        name: "2-Year MA Multiplier",
        category: Category::PriceModel,
        rule: lower_is_better(0.8, 2.0, 3.5),
        buy_zone: "< 1.0x (Below 2YR MA)",
        sell_zone: "> 3.5x (Cycle Top Zone)",
        description: "Price vs 2-year moving average. Below 1x = accumulation; above 5x = cycle top.",
    },
    IndicatorSpec {
        id: IndicatorId::Ahr999,
        name: "Ahr999 Index",
        category: Category::PriceModel,
        rule: lower_is_better(0.45, 1.2, 4.0),
        buy_zone: "< 0.45 (DCA Zone)",
        sell_zone: "> 4.0 (Sell Zone)",
        description: "Combines price growth model with mining cost. Below 0.45 = DCA zone; below 1.2 = buy zone.",
    },
    IndicatorSpec {
        id: IndicatorId::Rsi14,
        name: "RSI (14-Day)",
        category: Category::Technical,
        rule: lower_is_better(30.0, 70.0, 70.0),
        buy_zone: "< 30 (Oversold)",
        sell_zone: "> 70 (Overbought)",
        description: "Relative Strength Index. Below 30 = oversold (buy); above 70 = overbought (caution).",
    },
    IndicatorSpec {
        id: IndicatorId::RsiWeekly,
        name: "RSI Weekly",
        category: Category::Technical,
        rule: lower_is_better(35.0, 65.0, 80.0),
        buy_zone: "< 35 (Oversold Weekly)",
        sell_zone: "> 80 (Overbought Weekly)",
        description: "Weekly RSI gives a longer-term momentum view. Below 35 = major accumulation signal.",
    },
    IndicatorSpec {
        id: IndicatorId::PiCycleTop,
        name: "Pi Cycle Top",
        category: Category::Technical,
        rule: Rule::PiCycle {
            near_trigger: PI_CYCLE_NEAR_TRIGGER,
        },
        buy_zone: "Not triggered (< 0.85)",
        sell_zone: "Triggered (111DMA >= 2x350DMA)",
        description: "111DMA crossing above 2x350DMA signals cycle top within days. Not triggered = safe.",
    },
    IndicatorSpec {
        id: IndicatorId::BtcDominance,
        name: "BTC Dominance",
        category: Category::MarketStructure,
        rule: higher_is_better(60.0, 45.0, 45.0),
        buy_zone: "> 60% (BTC Leading)",
        sell_zone: "< 45% (Altcoin Season, Cycle Top Near)",
        description: "BTC market share. High dominance = BTC leading, altcoin season not started = safer to accumulate BTC.",
    },
    IndicatorSpec {
        id: IndicatorId::AltcoinSeason,
        name: "Altcoin Season Index",
        category: Category::MarketStructure,
        rule: lower_is_better(25.0, 60.0, 75.0),
        buy_zone: "< 25 (Bitcoin Season)",
        sell_zone: "> 75 (Altcoin Season)",
        description: "Measures if altcoins are outperforming BTC. Low = Bitcoin season = good BTC accumulation time.",
    },
    IndicatorSpec {
        id: IndicatorId::Cbbi,
        name: "CBBI (Bull Run Index)",
        category: Category::MarketStructure,
        rule: lower_is_better(30.0, 65.0, 90.0),
        buy_zone: "< 30 (Early Cycle)",
        sell_zone: "> 90 (Cycle Top)",
        description: "9-indicator composite of Bitcoin cycle position. 0 = cycle bottom; 100 = cycle top.",
    },
    IndicatorSpec {
        id: IndicatorId::GlobalLiquidity,
        name: "Global Liquidity Index (GLI)",
        category: Category::Macro,
        rule: Rule::LiquidityTrend {
            buy_above: 0.0,
            caution_above: -5.0,
        },
        buy_zone: "> +5% YoY (Expanding, BTC Tailwind)",
        sell_zone: "< -5% YoY (Contracting, BTC Headwind)",
        description: "Composite of Fed, ECB, and BoJ balance sheets in USD. Expansion has historically been a tailwind for Bitcoin; contraction a headwind.",
    },
    IndicatorSpec {
        id: IndicatorId::DollarIndex,
        name: "US Dollar Index (DXY)",
        category: Category::Macro,
        rule: Rule::DollarStrength {
            weak_below: 100.0,
            strong_above: 106.0,
            trend_band: 0.5,
        },
        buy_zone: "< 100 (Weak Dollar, BTC Tailwind)",
        sell_zone: "> 106 (Strong Dollar, BTC Headwind)",
        description: "USD strength against a basket of currencies. Falling DXY = looser global liquidity = bullish for BTC; rising DXY = bearish.",
    },
    IndicatorSpec {
        id: IndicatorId::BtcVsSpx,
        name: "BTC vs S&P 500",
        category: Category::MarketStructure,
        rule: Rule::Divergence { band: 20.0 },
        buy_zone: "BTC underperforms SPX by > 20% (Oversold vs Equities)",
        sell_zone: "BTC outperforms SPX by > 20% (Late Cycle)",
        description: "Bitcoin's 90-day return against the S&P 500. Sharp underperformance has historically mean-reverted; outperformance by >20% signals late-cycle risk.",
    },
];

/// The full indicator table in display order.
pub fn catalog() -> &'static [IndicatorSpec] {
    &CATALOG
}

pub fn find(id: IndicatorId) -> Option<&'static IndicatorSpec> {
    CATALOG.iter().find(|s| s.id == id)
}
