//! Strategy rule variants and the signal engine that runs one of them.
//!
//! Each variant keeps its thresholds as plain data so it can be tested on its
//! own. The engine is built with exactly one variant and adds the shared
//! guards: the EMA200 warm-up requirement and the ATR stop fallback when a
//! rule proposes a stop on the wrong side of entry or too far from it.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::cross::CrossKind;
use crate::domain::pipeline::{EnrichedBar, SLOW_EMA};
use crate::domain::signal::{Side, Signal};

/// Bars of history required before any rule is evaluated.
pub const MIN_HISTORY: usize = SLOW_EMA;

pub const DEFAULT_RISK_REWARD_RATIO: f64 = 3.0;

/// Parameters the optimizer is allowed to change between recalibrations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub risk_reward_ratio: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            risk_reward_ratio: DEFAULT_RISK_REWARD_RATIO,
        }
    }
}

/// A single entry rule over an enriched window.
pub trait EntryRule {
    fn evaluate(
        &self,
        window: &[EnrichedBar],
        index: usize,
        params: &StrategyParams,
    ) -> Option<Signal>;
}

/// Trend continuation entered when RSI crosses back through 50.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRsiBreakout {
    pub rsi_level: f64,
    pub stop_pct: f64,
    pub target_pct: f64,
    pub strength: u8,
}

impl Default for TrendRsiBreakout {
    fn default() -> Self {
        TrendRsiBreakout {
            rsi_level: 50.0,
            stop_pct: 0.01,
            target_pct: 0.015,
            strength: 7,
        }
    }
}

impl EntryRule for TrendRsiBreakout {
    fn evaluate(&self, window: &[EnrichedBar], index: usize, _: &StrategyParams) -> Option<Signal> {
        if index == 0 {
            return None;
        }
        let curr = &window[index].indicators;
        let prev_rsi = window[index - 1].indicators.rsi?;
        let (ema50, ema200, rsi) = (curr.ema50?, curr.ema200?, curr.rsi?);
        let close = window[index].bar.close;

        let side = if ema50 > ema200 && close > ema50 && prev_rsi < self.rsi_level && rsi >= self.rsi_level {
            Side::Buy
        } else if ema50 < ema200 && close < ema50 && prev_rsi > self.rsi_level && rsi <= self.rsi_level {
            Side::Sell
        } else {
            return None;
        };

        let sign = side.sign();
        Some(Signal {
            side,
            entry_price: close,
            stop_loss: close * (1.0 - sign * self.stop_pct),
            take_profit: close * (1.0 + sign * self.target_pct),
            reason: match side {
                Side::Buy => "Trend Buy + RSI Break 50".into(),
                Side::Sell => "Trend Sell + RSI Break 50".into(),
            },
            strength: self.strength,
        })
    }
}

/// Enter on the bar a golden/death cross happens, with price on the same side
/// of EMA200.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedCross {
    pub swing_lookback: usize,
    pub ema_offset_pct: f64,
    pub target_pct: f64,
}

impl Default for ConfirmedCross {
    fn default() -> Self {
        ConfirmedCross {
            swing_lookback: 10,
            ema_offset_pct: 0.005,
            target_pct: 0.025,
        }
    }
}

impl EntryRule for ConfirmedCross {
    fn evaluate(&self, window: &[EnrichedBar], index: usize, _: &StrategyParams) -> Option<Signal> {
        let curr = &window[index].indicators;
        let ema200 = curr.ema200?;
        let close = window[index].bar.close;
        let cross = curr.cross;
        if !(cross.confirmed && cross.transition) {
            return None;
        }

        let start = index.saturating_sub(self.swing_lookback);
        let recent = &window[start..index];

        let (side, stop_loss) = match cross.kind {
            CrossKind::Golden if close > ema200 => {
                let swing_low = recent.iter().map(|e| e.bar.low).fold(f64::INFINITY, f64::min);
                let stop = if swing_low < close {
                    swing_low
                } else {
                    ema200 * (1.0 - self.ema_offset_pct)
                };
                (Side::Buy, stop)
            }
            CrossKind::Death if close < ema200 => {
                let swing_high = recent.iter().map(|e| e.bar.high).fold(f64::NEG_INFINITY, f64::max);
                let stop = if swing_high > close {
                    swing_high
                } else {
                    ema200 * (1.0 + self.ema_offset_pct)
                };
                (Side::Sell, stop)
            }
            _ => return None,
        };

        Some(Signal {
            side,
            entry_price: close,
            stop_loss,
            take_profit: close * (1.0 + side.sign() * self.target_pct),
            reason: match side {
                Side::Buy => "Confirmed Golden Cross".into(),
                Side::Sell => "Confirmed Death Cross".into(),
            },
            strength: cross.strength,
        })
    }
}

/// Anticipates a cross while the EMAs are within a narrow band of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaProximity {
    pub proximity_pct: f64,
    pub stop_pct: f64,
    pub target_pct: f64,
    pub strength: u8,
}

impl Default for EmaProximity {
    fn default() -> Self {
        EmaProximity {
            proximity_pct: 0.002,
            stop_pct: 0.01,
            target_pct: 0.025,
            strength: 6,
        }
    }
}

impl EntryRule for EmaProximity {
    fn evaluate(&self, window: &[EnrichedBar], index: usize, _: &StrategyParams) -> Option<Signal> {
        let curr = &window[index].indicators;
        let (ema50, ema200) = (curr.ema50?, curr.ema200?);
        if (ema50 - ema200).abs() > self.proximity_pct * ema200 {
            return None;
        }

        let side = if ema50 > ema200 {
            Side::Buy
        } else if ema50 < ema200 {
            Side::Sell
        } else {
            return None;
        };

        let close = window[index].bar.close;
        let sign = side.sign();
        Some(Signal {
            side,
            entry_price: close,
            stop_loss: close * (1.0 - sign * self.stop_pct),
            take_profit: close * (1.0 + sign * self.target_pct),
            reason: match side {
                Side::Buy => "EMA50 holding above EMA200".into(),
                Side::Sell => "EMA50 holding below EMA200".into(),
            },
            strength: self.strength,
        })
    }
}

/// Retest of the active order block in the trend direction, falling back to
/// an RSI pullback entry when no block is in reach.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBlockRetest {
    pub retest_buffer_pct: f64,
    pub stop_pad_pct: f64,
    pub pullback_rsi_long: f64,
    pub pullback_rsi_short: f64,
    pub atr_multiplier: f64,
    pub block_strength: u8,
    pub pullback_strength: u8,
}

impl Default for OrderBlockRetest {
    fn default() -> Self {
        OrderBlockRetest {
            retest_buffer_pct: 0.003,
            stop_pad_pct: 0.003,
            pullback_rsi_long: 45.0,
            pullback_rsi_short: 55.0,
            atr_multiplier: 1.5,
            block_strength: 8,
            pullback_strength: 5,
        }
    }
}

impl OrderBlockRetest {
    fn long(&self, e: &EnrichedBar, rr: f64) -> Option<Signal> {
        let close = e.bar.close;
        let ind = &e.indicators;

        if let Some(block) = ind.active_demand_block {
            if close <= block.top * (1.0 + self.retest_buffer_pct) && close > block.bottom {
                let stop = block.bottom * (1.0 - self.stop_pad_pct);
                return Some(Signal {
                    side: Side::Buy,
                    entry_price: close,
                    stop_loss: stop,
                    take_profit: close + (close - stop) * rr,
                    reason: "Demand Block Retest".into(),
                    strength: self.block_strength,
                });
            }
        }

        if ind.rsi? < self.pullback_rsi_long {
            let distance = ind.atr? * self.atr_multiplier;
            return Some(Signal {
                side: Side::Buy,
                entry_price: close,
                stop_loss: close - distance,
                take_profit: close + distance * rr,
                reason: "Uptrend RSI Pullback".into(),
                strength: self.pullback_strength,
            });
        }
        None
    }

    fn short(&self, e: &EnrichedBar, rr: f64) -> Option<Signal> {
        let close = e.bar.close;
        let ind = &e.indicators;

        if let Some(block) = ind.active_supply_block {
            if close >= block.bottom * (1.0 - self.retest_buffer_pct) && close < block.top {
                let stop = block.top * (1.0 + self.stop_pad_pct);
                return Some(Signal {
                    side: Side::Sell,
                    entry_price: close,
                    stop_loss: stop,
                    take_profit: close - (stop - close) * rr,
                    reason: "Supply Block Retest".into(),
                    strength: self.block_strength,
                });
            }
        }

        if ind.rsi? > self.pullback_rsi_short {
            let distance = ind.atr? * self.atr_multiplier;
            return Some(Signal {
                side: Side::Sell,
                entry_price: close,
                stop_loss: close + distance,
                take_profit: close - distance * rr,
                reason: "Downtrend RSI Pullback".into(),
                strength: self.pullback_strength,
            });
        }
        None
    }
}

impl EntryRule for OrderBlockRetest {
    fn evaluate(&self, window: &[EnrichedBar], index: usize, params: &StrategyParams) -> Option<Signal> {
        let e = &window[index];
        let ema200 = e.indicators.ema200?;
        let rr = params.risk_reward_ratio;

        if e.bar.close > ema200 {
            self.long(e, rr)
        } else if e.bar.close < ema200 {
            self.short(e, rr)
        } else {
            None
        }
    }
}

/// The rule set selected at configuration time.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyVariant {
    TrendRsi(TrendRsiBreakout),
    ConfirmedCross(ConfirmedCross),
    EmaProximity(EmaProximity),
    OrderBlockRetest(OrderBlockRetest),
}

impl StrategyVariant {
    pub const NAMES: [&'static str; 4] = [
        "trend_rsi",
        "confirmed_cross",
        "ema_proximity",
        "order_block_retest",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyVariant::TrendRsi(_) => "trend_rsi",
            StrategyVariant::ConfirmedCross(_) => "confirmed_cross",
            StrategyVariant::EmaProximity(_) => "ema_proximity",
            StrategyVariant::OrderBlockRetest(_) => "order_block_retest",
        }
    }
}

impl Default for StrategyVariant {
    fn default() -> Self {
        StrategyVariant::TrendRsi(TrendRsiBreakout::default())
    }
}

impl EntryRule for StrategyVariant {
    fn evaluate(&self, window: &[EnrichedBar], index: usize, params: &StrategyParams) -> Option<Signal> {
        match self {
            StrategyVariant::TrendRsi(rule) => rule.evaluate(window, index, params),
            StrategyVariant::ConfirmedCross(rule) => rule.evaluate(window, index, params),
            StrategyVariant::EmaProximity(rule) => rule.evaluate(window, index, params),
            StrategyVariant::OrderBlockRetest(rule) => rule.evaluate(window, index, params),
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown strategy variant '{0}'")]
pub struct ParseVariantError(pub String);

impl FromStr for StrategyVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trend_rsi" => Ok(StrategyVariant::TrendRsi(TrendRsiBreakout::default())),
            "confirmed_cross" => Ok(StrategyVariant::ConfirmedCross(ConfirmedCross::default())),
            "ema_proximity" => Ok(StrategyVariant::EmaProximity(EmaProximity::default())),
            "order_block_retest" => Ok(StrategyVariant::OrderBlockRetest(OrderBlockRetest::default())),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

/// Limits on the stop distance a rule may propose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopGuard {
    /// Largest accepted stop distance as a fraction of entry.
    pub max_risk_fraction: f64,
    pub atr_multiplier: f64,
    /// Stop distance as a fraction of entry when ATR is unavailable.
    pub fallback_pct: f64,
}

impl Default for StopGuard {
    fn default() -> Self {
        StopGuard {
            max_risk_fraction: 0.1,
            atr_multiplier: 1.5,
            fallback_pct: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEngine {
    variant: StrategyVariant,
    guard: StopGuard,
}

impl StrategyEngine {
    pub fn new(variant: StrategyVariant, guard: StopGuard) -> Self {
        StrategyEngine { variant, guard }
    }

    pub fn variant(&self) -> &StrategyVariant {
        &self.variant
    }

    /// Signal for `window[index]`, or `None` with too little history or no
    /// setup.
    pub fn evaluate(&self, window: &[EnrichedBar], index: usize, params: &StrategyParams) -> Option<Signal> {
        if index < MIN_HISTORY || index >= window.len() {
            return None;
        }
        let signal = self.variant.evaluate(window, index, params)?;
        Some(self.guard_stop(signal, &window[index], params))
    }

    fn guard_stop(&self, mut signal: Signal, e: &EnrichedBar, params: &StrategyParams) -> Signal {
        let risk = signal.risk();
        if risk > 0.0 && risk <= self.guard.max_risk_fraction * signal.entry_price {
            return signal;
        }

        let distance = match e.indicators.atr {
            Some(atr) if atr > 0.0 => atr * self.guard.atr_multiplier,
            _ => signal.entry_price * self.guard.fallback_pct,
        };
        let sign = signal.side.sign();
        signal.stop_loss = signal.entry_price - sign * distance;
        signal.take_profit = signal.entry_price + sign * distance * params.risk_reward_ratio;
        signal
    }
}
