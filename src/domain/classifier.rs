//! Indicator classification.
//!
//! Every indicator is reduced to one of three [`Signal`] states by a [`Rule`].
//! Plain threshold indicators use [`classify`]; the Pi Cycle trigger and the
//! macro indicators are further `Rule` variants evaluated by the same
//! [`Rule::evaluate`] dispatch.
//!
//! Threshold boundaries are inclusive on the BUY side and exclusive moving
//! toward SELL:
//! - lower is better: `v <= buy` BUY, `v <= caution` CAUTION, else SELL
//! - higher is better: `v >= buy` BUY, `v >= caution` CAUTION, else SELL

use crate::domain::error::PulseError;
use crate::domain::signal::Signal;

/// Near-trigger ratio above which the Pi Cycle indicator reports CAUTION.
pub const PI_CYCLE_NEAR_TRIGGER: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Plain threshold zones. `sell_reference` is the level quoted in the
    /// sell-zone label; it does not take part in classification.
    Threshold {
        buy: f64,
        caution: f64,
        sell_reference: f64,
        invert: bool,
    },
    /// 111DMA vs 2x350DMA. SELL when triggered, CAUTION when the ratio is
    /// strictly above `near_trigger`, else BUY.
    PiCycle { near_trigger: f64 },
    /// Year-over-year growth: `> buy_above` BUY, `> caution_above` CAUTION.
    LiquidityTrend { buy_above: f64, caution_above: f64 },
    /// Dollar index level and daily change. A weak or falling dollar wins
    /// over a strong or rising one.
    DollarStrength {
        weak_below: f64,
        strong_above: f64,
        trend_band: f64,
    },
    /// Relative performance spread: `<= -band` BUY, `>= band` SELL.
    Divergence { band: f64 },
}

/// Input to a [`Rule`]. `value` is always the primary reading; `secondary`
/// and `triggered` are only consulted by the rules that need them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub secondary: f64,
    pub triggered: bool,
}

impl Reading {
    pub fn scalar(value: f64) -> Self {
        Self {
            value,
            secondary: 0.0,
            triggered: false,
        }
    }

    pub fn pi_cycle(ratio: f64, triggered: bool) -> Self {
        Self {
            value: ratio,
            secondary: 0.0,
            triggered,
        }
    }

    pub fn dollar(level: f64, change_pct: f64) -> Self {
        Self {
            value: level,
            secondary: change_pct,
            triggered: false,
        }
    }
}

/// Classify a threshold reading.
///
/// Rejects NaN and infinite input with [`PulseError::NonFiniteMetric`].
pub fn classify(
    value: f64,
    buy_threshold: f64,
    caution_threshold: f64,
    invert: bool,
) -> Result<Signal, PulseError> {
    ensure_finite("value", value)?;
    Ok(threshold_signal(value, buy_threshold, caution_threshold, invert))
}

fn threshold_signal(value: f64, buy: f64, caution: f64, invert: bool) -> Signal {
    if invert {
        if value >= buy {
            Signal::Buy
        } else if value >= caution {
            Signal::Caution
        } else {
            Signal::Sell
        }
    } else if value <= buy {
        Signal::Buy
    } else if value <= caution {
        Signal::Caution
    } else {
        Signal::Sell
    }
}

fn ensure_finite(metric: &str, value: f64) -> Result<(), PulseError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PulseError::NonFiniteMetric {
            metric: metric.to_string(),
            value,
        })
    }
}

impl Rule {
    /// Classify `reading` under this rule. `metric` names the reading in errors.
    pub fn evaluate(&self, metric: &str, reading: Reading) -> Result<Signal, PulseError> {
        ensure_finite(metric, reading.value)?;

        let signal = match *self {
            Rule::Threshold {
                buy,
                caution,
                invert,
                ..
            } => threshold_signal(reading.value, buy, caution, invert),
            Rule::PiCycle { near_trigger } => {
                if reading.triggered {
                    Signal::Sell
                } else if reading.value > near_trigger {
                    Signal::Caution
                } else {
                    Signal::Buy
                }
            }
            Rule::LiquidityTrend {
                buy_above,
                caution_above,
            } => {
                if reading.value > buy_above {
                    Signal::Buy
                } else if reading.value > caution_above {
                    Signal::Caution
                } else {
                    Signal::Sell
                }
            }
            Rule::DollarStrength {
                weak_below,
                strong_above,
                trend_band,
            } => {
                ensure_finite(metric, reading.secondary)?;
                let (level, change) = (reading.value, reading.secondary);
                if level < weak_below || change < -trend_band {
                    Signal::Buy
                } else if level > strong_above || change > trend_band {
                    Signal::Sell
                } else {
                    Signal::Caution
                }
            }
            Rule::Divergence { band } => {
                if reading.value <= -band {
                    Signal::Buy
                } else if reading.value >= band {
                    Signal::Sell
                } else {
                    Signal::Caution
                }
            }
        };

        tracing::debug!(metric, value = reading.value, signal = %signal, "classified");
        Ok(signal)
    }
}
