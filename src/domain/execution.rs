//! Trade lifecycle: exit checks, risk-based sizing and entry.
//!
//! Nothing here mutates account state. `LifecycleManager::step` inspects the
//! newest enriched bar and returns a `TradeIntent`; the replay loop applies it.

use super::pipeline::EnrichedBar;
use super::position::{ExitReason, Position, PositionStatus};
use super::signal::Signal;
use super::strategy::{StopGuard, StrategyEngine, StrategyParams, StrategyVariant};

/// Position sizing and stop limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    /// Fraction of balance put at risk per trade.
    pub risk_per_trade: f64,
    pub min_position: f64,
    /// Largest position as a fraction of balance.
    pub max_position_fraction: f64,
    pub max_risk_fraction: f64,
    pub atr_stop_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            risk_per_trade: 0.015,
            min_position: 10.0,
            max_position_fraction: 0.95,
            max_risk_fraction: 0.1,
            atr_stop_multiplier: 1.5,
        }
    }
}

impl RiskConfig {
    pub fn stop_guard(&self) -> StopGuard {
        StopGuard {
            max_risk_fraction: self.max_risk_fraction,
            atr_multiplier: self.atr_stop_multiplier,
            ..StopGuard::default()
        }
    }
}

/// Notional to commit so that hitting the stop loses `balance * risk_per_trade`,
/// clamped to `[min_position, balance * max_position_fraction]`.
pub fn position_size(balance: f64, entry: f64, stop: f64, risk: &RiskConfig) -> f64 {
    let risk_amount = balance * risk.risk_per_trade;
    let risk_fraction = (entry - stop).abs() / entry;
    let upper = balance * risk.max_position_fraction;

    let size = if risk_fraction > 0.0 && risk_fraction.is_finite() {
        risk_amount / risk_fraction
    } else {
        upper
    };

    size.min(upper).max(risk.min_position)
}

/// What the replay loop should do after this bar.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeIntent {
    Hold,
    Open { position: Position, signal: Signal },
    /// Carries the position already marked closed.
    Close(Position),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleManager {
    engine: StrategyEngine,
    risk: RiskConfig,
}

impl LifecycleManager {
    pub fn new(variant: StrategyVariant, risk: RiskConfig) -> Self {
        LifecycleManager {
            engine: StrategyEngine::new(variant, risk.stop_guard()),
            risk,
        }
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Decide on the newest bar of `window`.
    ///
    /// With an open position only exits are checked, stop-loss before
    /// take-profit. Without one the strategy is consulted for an entry.
    pub fn step(
        &self,
        window: &[EnrichedBar],
        params: &StrategyParams,
        balance: f64,
        active: Option<&Position>,
        next_id: u64,
    ) -> TradeIntent {
        let Some(latest) = window.last() else {
            return TradeIntent::Hold;
        };

        if let Some(position) = active {
            return check_exit(position, latest);
        }

        let Some(signal) = self.engine.evaluate(window, window.len() - 1, params) else {
            return TradeIntent::Hold;
        };

        let amount = position_size(balance, signal.entry_price, signal.stop_loss, &self.risk);
        let position = Position {
            id: next_id,
            side: signal.side,
            entry_price: signal.entry_price,
            entry_time: latest.bar.time,
            stop_loss: signal.stop_loss,
            initial_stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            amount,
            status: PositionStatus::Open,
            exit_price: None,
            exit_time: None,
            pnl: None,
            exit_reason: None,
            label: signal.reason.clone(),
        };

        TradeIntent::Open { position, signal }
    }
}

/// Exit check against the bar's range. Fills at the stop or target level.
pub fn check_exit(position: &Position, latest: &EnrichedBar) -> TradeIntent {
    let bar = &latest.bar;
    if position.should_stop_loss(bar) {
        TradeIntent::Close(position.closed(position.stop_loss, bar.time, ExitReason::StopLoss))
    } else if position.should_take_profit(bar) {
        TradeIntent::Close(position.closed(position.take_profit, bar.time, ExitReason::TakeProfit))
    } else {
        TradeIntent::Hold
    }
}
