//! Strategy parameter selection from a historical window.

use super::backtest::{Replay, ReplayConfig};
use super::execution::LifecycleManager;
use super::ohlcv::Bar;
use super::strategy::{StrategyParams, MIN_HISTORY};

pub const FIXED_RISK_REWARD_RATIO: f64 = 2.5;

pub trait Optimizer {
    fn name(&self) -> &'static str;

    /// New parameters trained on `history`. `current` is what the replay is
    /// using now and is the answer when nothing better can be determined.
    fn optimize(&self, history: &[Bar], current: &StrategyParams) -> StrategyParams;
}

/// Always answers the same risk/reward ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedOptimizer {
    pub risk_reward_ratio: f64,
}

impl FixedOptimizer {
    pub fn new(risk_reward_ratio: f64) -> Self {
        FixedOptimizer { risk_reward_ratio }
    }
}

impl Default for FixedOptimizer {
    fn default() -> Self {
        FixedOptimizer::new(FIXED_RISK_REWARD_RATIO)
    }
}

impl Optimizer for FixedOptimizer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn optimize(&self, _: &[Bar], _: &StrategyParams) -> StrategyParams {
        StrategyParams {
            risk_reward_ratio: self.risk_reward_ratio,
        }
    }
}

/// Replays the history once per candidate ratio and keeps the one that ends
/// with the highest balance. Ties keep the earlier candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOptimizer {
    pub candidates: Vec<f64>,
    lifecycle: LifecycleManager,
    config: ReplayConfig,
}

impl SweepOptimizer {
    pub fn new(candidates: Vec<f64>, lifecycle: LifecycleManager, initial_balance: f64, commission_pct: f64) -> Self {
        SweepOptimizer {
            candidates,
            lifecycle,
            config: ReplayConfig {
                initial_balance,
                commission_pct,
                recalibration_interval: 0,
                ..ReplayConfig::default()
            },
        }
    }

    /// Final balance after replaying `history` with a fixed ratio.
    pub fn score(&self, history: &[Bar], risk_reward_ratio: f64) -> f64 {
        if history.len() <= MIN_HISTORY {
            return self.config.initial_balance;
        }
        let warmup = history[..MIN_HISTORY].to_vec();
        let future = history[MIN_HISTORY..].to_vec();
        let mut replay = Replay::new(
            ReplayConfig {
                window_cap: self.config.window_cap.max(history.len()),
                ..self.config.clone()
            },
            warmup,
            future,
            self.lifecycle.clone(),
            Box::new(FixedOptimizer::new(risk_reward_ratio)),
        );
        replay.run_to_end();
        replay.account().balance
    }
}

impl Optimizer for SweepOptimizer {
    fn name(&self) -> &'static str {
        "sweep"
    }

    fn optimize(&self, history: &[Bar], current: &StrategyParams) -> StrategyParams {
        if history.len() <= MIN_HISTORY {
            return *current;
        }

        let mut best: Option<(f64, f64)> = None;
        for &ratio in &self.candidates {
            let balance = self.score(history, ratio);
            match best {
                Some((_, best_balance)) if balance <= best_balance => {}
                _ => best = Some((ratio, balance)),
            }
        }

        match best {
            Some((risk_reward_ratio, _)) => StrategyParams { risk_reward_ratio },
            None => *current,
        }
    }
}
