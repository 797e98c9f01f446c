//! Tick-driven replay of historical bars.
//!
//! `Replay` is the simulation context: it owns the visible window, the hidden
//! queue of future bars, the account and the active strategy parameters. Each
//! `tick` reveals one bar, re-enriches the window and applies whatever the
//! lifecycle manager decides. Nothing else mutates this state.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info};

use super::error::ReplayError;
use super::execution::{LifecycleManager, TradeIntent};
use super::ohlcv::Bar;
use super::optimizer::Optimizer;
use super::pipeline::{enrich, EnrichedBar};
use super::portfolio::Account;
use super::position::Position;
use super::signal::Signal;
use super::strategy::StrategyParams;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub initial_balance: f64,
    pub window_cap: usize,
    /// Recalibrate after every this many closed trades; 0 disables.
    pub recalibration_interval: usize,
    pub recalibration_lookback: usize,
    pub history_fraction: f64,
    pub max_history: usize,
    /// Opening fee, percent of position amount.
    pub commission_pct: f64,
    pub tick_interval: Duration,
    pub max_ticks: Option<usize>,
    /// Parameters in force before the optimizer's first answer.
    pub initial_params: StrategyParams,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            initial_balance: 10_000.0,
            window_cap: 2000,
            recalibration_interval: 100,
            recalibration_lookback: 500,
            history_fraction: 0.15,
            max_history: 1000,
            commission_pct: 0.0,
            tick_interval: Duration::ZERO,
            max_ticks: None,
            initial_params: StrategyParams::default(),
        }
    }
}

/// Split fetched bars into the initial visible history and the hidden queue:
/// `min(floor(len * fraction), max_history)` bars of history.
pub fn split_history(mut bars: Vec<Bar>, fraction: f64, max_history: usize) -> (Vec<Bar>, Vec<Bar>) {
    let history_len = ((bars.len() as f64 * fraction).floor() as usize)
        .min(max_history)
        .min(bars.len());
    let future = bars.split_off(history_len);
    (bars, future)
}

/// Everything that happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// 1-based tick number.
    pub tick: usize,
    pub bar: EnrichedBar,
    pub signal: Option<Signal>,
    pub opened: Option<Position>,
    pub closed: Option<Position>,
    pub recalibrated: Option<StrategyParams>,
    pub balance: f64,
}

pub struct Replay {
    config: ReplayConfig,
    window: VecDeque<Bar>,
    queue: VecDeque<Bar>,
    account: Account,
    params: StrategyParams,
    lifecycle: LifecycleManager,
    optimizer: Box<dyn Optimizer>,
    ticks: usize,
    total_ticks: usize,
    next_id: u64,
    halted: bool,
}

impl Replay {
    /// Build a replay from pre-split bars and train the optimizer once on the
    /// initial history.
    pub fn new(
        mut config: ReplayConfig,
        history: Vec<Bar>,
        future: Vec<Bar>,
        lifecycle: LifecycleManager,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        // The newest bar must always fit.
        config.window_cap = config.window_cap.max(1);
        let mut queue: VecDeque<Bar> = future.into();
        if let Some(max) = config.max_ticks {
            queue.truncate(max);
        }

        let skip = history.len().saturating_sub(config.window_cap);
        let mut window: VecDeque<Bar> = history.into_iter().skip(skip).collect();

        let params = optimizer.optimize(window.make_contiguous(), &config.initial_params);
        debug!(
            "{} optimizer trained on {} bars: risk/reward {:.2}",
            optimizer.name(),
            window.len(),
            params.risk_reward_ratio
        );

        Replay {
            account: Account::new(config.initial_balance, config.commission_pct),
            total_ticks: queue.len(),
            config,
            window,
            queue,
            params,
            lifecycle,
            optimizer,
            ticks: 0,
            next_id: 1,
            halted: false,
        }
    }

    /// Split `bars` per the config and build the replay. Fails when nothing
    /// would be left to replay.
    pub fn from_bars(
        config: ReplayConfig,
        symbol: &str,
        bars: Vec<Bar>,
        lifecycle: LifecycleManager,
        optimizer: Box<dyn Optimizer>,
    ) -> Result<Self, ReplayError> {
        if bars.is_empty() {
            return Err(ReplayError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let total = bars.len();
        let (history, future) = split_history(bars, config.history_fraction, config.max_history);
        if future.is_empty() {
            return Err(ReplayError::InsufficientData {
                symbol: symbol.to_string(),
                bars: total,
                minimum: history.len() + 1,
            });
        }

        info!(
            "{}: {} bars of history, {} bars to replay",
            symbol,
            history.len(),
            future.len()
        );
        Ok(Replay::new(config, history, future, lifecycle, optimizer))
    }

    /// Advance by one bar. `None` once the queue is exhausted.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let Some(bar) = self.queue.pop_front() else {
            if !self.halted {
                self.halted = true;
                debug!(
                    "replay finished after {} ticks, balance {:.2}",
                    self.ticks, self.account.balance
                );
            }
            return None;
        };

        self.window.push_back(bar);
        while self.window.len() > self.config.window_cap {
            self.window.pop_front();
        }

        let mut enriched = enrich(self.window.make_contiguous());
        let intent = self.lifecycle.step(
            &enriched,
            &self.params,
            self.account.balance,
            self.account.open_position(),
            self.next_id,
        );

        let mut signal = None;
        let mut opened = None;
        let mut closed = None;
        match intent {
            TradeIntent::Hold => {}
            TradeIntent::Open { position, signal: s } => {
                if self.account.open(position.clone()) {
                    self.next_id += 1;
                    debug!(
                        "opened #{} {} at {:.4} (stop {:.4}, target {:.4}, amount {:.2}): {}",
                        position.id,
                        position.side,
                        position.entry_price,
                        position.stop_loss,
                        position.take_profit,
                        position.amount,
                        position.label
                    );
                    opened = Some(position);
                }
                signal = Some(s);
            }
            TradeIntent::Close(position) => {
                if self.account.close(position.clone()) {
                    debug!(
                        "closed #{} at {:.4} by {}: pnl {:.4}, balance {:.2}",
                        position.id,
                        position.exit_price.unwrap_or(position.entry_price),
                        position
                            .exit_reason
                            .map(|r| r.to_string())
                            .unwrap_or_default(),
                        position.pnl.unwrap_or(0.0),
                        self.account.balance
                    );
                    closed = Some(position);
                }
            }
        }

        let latest = enriched.pop()?;
        self.ticks += 1;
        self.account.record_equity(latest.bar.time);

        let recalibrated = match closed {
            Some(_) if self.recalibration_due() => Some(self.recalibrate()),
            _ => None,
        };

        Some(TickOutcome {
            tick: self.ticks,
            bar: latest,
            signal,
            opened,
            closed,
            recalibrated,
            balance: self.account.balance,
        })
    }

    /// Tick until the queue is empty; returns the number of ticks taken.
    pub fn run_to_end(&mut self) -> usize {
        let mut count = 0;
        while self.tick().is_some() {
            count += 1;
        }
        count
    }

    fn recalibration_due(&self) -> bool {
        let interval = self.config.recalibration_interval;
        interval > 0 && self.account.closed_count() % interval == 0
    }

    fn recalibrate(&mut self) -> StrategyParams {
        let lookback = self.config.recalibration_lookback.min(self.window.len());
        let start = self.window.len() - lookback;
        let history = &self.window.make_contiguous()[start..];

        let params = self.optimizer.optimize(history, &self.params);
        info!(
            "recalibrated after {} closed trades on {} bars: risk/reward {:.2} -> {:.2}",
            self.account.closed_count(),
            history.len(),
            self.params.risk_reward_ratio,
            params.risk_reward_ratio
        );
        self.params = params;
        params
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn total_ticks(&self) -> usize {
        self.total_ticks
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::RiskConfig;
    use crate::domain::optimizer::FixedOptimizer;
    use crate::domain::strategy::StrategyVariant;
    use crate::domain::test_support::{bars_from_closes, make_bar};

    fn lifecycle() -> LifecycleManager {
        LifecycleManager::new(StrategyVariant::default(), RiskConfig::default())
    }

    fn replay(config: ReplayConfig, history: Vec<Bar>, future: Vec<Bar>) -> Replay {
        Replay::new(config, history, future, lifecycle(), Box::new(FixedOptimizer::default()))
    }

    #[test]
    fn split_follows_fraction_and_cap() {
        let (history, future) = split_history(bars_from_closes(&[1.0; 100]), 0.15, 1000);
        assert_eq!((history.len(), future.len()), (15, 85));

        let (history, future) = split_history(bars_from_closes(&[1.0; 10_000]), 0.15, 1000);
        assert_eq!((history.len(), future.len()), (1000, 9000));

        let (history, future) = split_history(bars_from_closes(&[1.0; 3]), 0.15, 1000);
        assert_eq!((history.len(), future.len()), (0, 3));
    }

    #[test]
    fn zero_window_cap_still_ticks_every_bar() {
        let config = ReplayConfig {
            window_cap: 0,
            ..ReplayConfig::default()
        };
        let mut r = replay(config, bars_from_closes(&[100.0; 5]), bars_from_closes(&[100.0; 4]));
        assert_eq!(r.config().window_cap, 1);
        assert_eq!(r.window_len(), 1);
        assert_eq!(r.run_to_end(), 4);
        assert_eq!(r.window_len(), 1);
        assert_eq!(r.account().equity_curve.len(), 4);
    }

    #[test]
    fn initial_training_sets_params() {
        let r = replay(ReplayConfig::default(), bars_from_closes(&[100.0; 5]), vec![]);
        assert!((r.params().risk_reward_ratio - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn processes_exactly_queue_length_then_halts() {
        let config = ReplayConfig {
            window_cap: 250,
            ..ReplayConfig::default()
        };
        let closes: Vec<f64> = (0..400).map(|i| 100.0 + (i as f64 / 7.0).sin()).collect();
        let bars = bars_from_closes(&closes);
        let mut r = replay(config, bars[..300].to_vec(), bars[300..].to_vec());

        assert_eq!(r.window_len(), 250, "history trimmed to the cap");
        assert_eq!(r.total_ticks(), 100);
        assert_eq!(r.run_to_end(), 100);
        assert!(r.tick().is_none());
        assert!(r.tick().is_none());
        assert_eq!(r.ticks(), 100);
        assert_eq!(r.window_len(), 250);
        assert_eq!(r.account().equity_curve.len(), 100);
    }

    #[test]
    fn max_ticks_truncates_queue() {
        let config = ReplayConfig {
            max_ticks: Some(4),
            ..ReplayConfig::default()
        };
        let mut r = replay(config, vec![], bars_from_closes(&[100.0; 10]));
        assert_eq!(r.total_ticks(), 4);
        assert_eq!(r.run_to_end(), 4);
    }

    #[test]
    fn tick_reveals_bars_in_order() {
        let future = vec![
            make_bar(10, 100.0, 101.0, 99.0, 100.5),
            make_bar(11, 100.5, 102.0, 100.0, 101.5),
        ];
        let mut r = replay(ReplayConfig::default(), bars_from_closes(&[100.0; 10]), future.clone());

        let first = r.tick().expect("first tick");
        assert_eq!(first.tick, 1);
        assert_eq!(first.bar.bar, future[0]);
        assert!(first.signal.is_none());

        let second = r.tick().expect("second tick");
        assert_eq!(second.tick, 2);
        assert_eq!(second.bar.bar, future[1]);
        assert_eq!(r.window_len(), 12);
    }

    #[test]
    fn from_bars_rejects_empty_and_exhausted_input() {
        let err = Replay::from_bars(
            ReplayConfig::default(),
            "BTCUSDT",
            vec![],
            lifecycle(),
            Box::new(FixedOptimizer::default()),
        )
        .err()
        .expect("no data");
        assert!(matches!(err, ReplayError::NoData { .. }));

        let config = ReplayConfig {
            history_fraction: 1.0,
            ..ReplayConfig::default()
        };
        let err = Replay::from_bars(
            config,
            "BTCUSDT",
            bars_from_closes(&[100.0; 20]),
            lifecycle(),
            Box::new(FixedOptimizer::default()),
        )
        .err()
        .expect("nothing to replay");
        assert!(matches!(
            err,
            ReplayError::InsufficientData {
                bars: 20,
                minimum: 21,
                ..
            }
        ));
    }
}
