//! Fixed-cadence driver around a `Replay`.
//!
//! Ticks run on the caller's thread, one after another, so two ticks of the
//! same replay can never overlap. Pausing keeps the queue and any open
//! position; a later `run` resumes from the same bar.

use std::ops::ControlFlow;
use std::thread;

use log::{debug, info};

use super::backtest::{Replay, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Paused,
    Finished,
}

pub struct ReplayRunner {
    replay: Replay,
    state: RunnerState,
}

impl ReplayRunner {
    pub fn new(replay: Replay) -> Self {
        ReplayRunner {
            replay,
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Move to `Running`. Refused once finished.
    pub fn start(&mut self) -> bool {
        match self.state {
            RunnerState::Finished => false,
            RunnerState::Running => true,
            RunnerState::Idle | RunnerState::Paused => {
                debug!("runner started at tick {}", self.replay.ticks());
                self.state = RunnerState::Running;
                true
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state == RunnerState::Running {
            debug!("runner paused at tick {}", self.replay.ticks());
            self.state = RunnerState::Paused;
        }
    }

    /// End the run early. Idempotent.
    pub fn stop(&mut self) {
        if self.state != RunnerState::Finished {
            info!(
                "runner stopped at tick {} of {}",
                self.replay.ticks(),
                self.replay.total_ticks()
            );
            self.state = RunnerState::Finished;
        }
    }

    /// Tick until the queue runs out or the observer breaks.
    ///
    /// The observer sees every outcome; returning `ControlFlow::Break` pauses
    /// the runner after that tick. Sleeps `tick_interval` between ticks.
    pub fn run<F>(&mut self, mut observer: F) -> RunnerState
    where
        F: FnMut(&TickOutcome) -> ControlFlow<()>,
    {
        if !self.start() {
            return self.state;
        }
        let interval = self.replay.config().tick_interval;

        while self.state == RunnerState::Running {
            let Some(outcome) = self.replay.tick() else {
                self.state = RunnerState::Finished;
                break;
            };

            if observer(&outcome).is_break() {
                self.pause();
                break;
            }

            if !interval.is_zero() && !self.replay.is_exhausted() {
                thread::sleep(interval);
            }
        }

        self.state
    }

    /// Processed ticks over total ticks, 1.0 for an empty replay.
    pub fn progress(&self) -> f64 {
        let total = self.replay.total_ticks();
        if total == 0 {
            return 1.0;
        }
        self.replay.ticks() as f64 / total as f64
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn into_replay(self) -> Replay {
        self.replay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::ReplayConfig;
    use crate::domain::execution::{LifecycleManager, RiskConfig};
    use crate::domain::optimizer::FixedOptimizer;
    use crate::domain::strategy::StrategyVariant;
    use crate::domain::test_support::bars_from_closes;
    use std::time::Duration;

    fn runner(ticks: usize, interval: Duration) -> ReplayRunner {
        let config = ReplayConfig {
            tick_interval: interval,
            ..ReplayConfig::default()
        };
        let bars = bars_from_closes(&vec![100.0; 20 + ticks]);
        let replay = Replay::new(
            config,
            bars[..20].to_vec(),
            bars[20..].to_vec(),
            LifecycleManager::new(StrategyVariant::default(), RiskConfig::default()),
            Box::new(FixedOptimizer::default()),
        );
        ReplayRunner::new(replay)
    }

    #[test]
    fn runs_to_completion() {
        let mut r = runner(30, Duration::ZERO);
        assert_eq!(r.state(), RunnerState::Idle);
        let mut seen = 0;
        let state = r.run(|_| {
            seen += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(state, RunnerState::Finished);
        assert_eq!(seen, 30);
        assert!((r.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn break_pauses_and_resume_continues() {
        let mut r = runner(10, Duration::ZERO);
        let state = r.run(|outcome| {
            if outcome.tick == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(state, RunnerState::Paused);
        assert_eq!(r.replay().ticks(), 4);
        assert!((r.progress() - 0.4).abs() < 1e-12);

        let mut ticks = Vec::new();
        let state = r.run(|outcome| {
            ticks.push(outcome.tick);
            ControlFlow::Continue(())
        });
        assert_eq!(state, RunnerState::Finished);
        assert_eq!(ticks, (5..=10).collect::<Vec<_>>());
    }

    #[test]
    fn finished_runner_refuses_start() {
        let mut r = runner(3, Duration::ZERO);
        r.run(|_| ControlFlow::Continue(()));
        assert!(!r.start());
        assert_eq!(r.run(|_| ControlFlow::Continue(())), RunnerState::Finished);
    }

    #[test]
    fn pause_and_stop_are_idempotent() {
        let mut r = runner(3, Duration::ZERO);
        r.pause();
        assert_eq!(r.state(), RunnerState::Idle);

        r.stop();
        r.stop();
        assert_eq!(r.state(), RunnerState::Finished);
        assert_eq!(r.replay().ticks(), 0);
        assert_eq!(r.replay().remaining(), 3);
    }

    #[test]
    fn cadence_sleeps_between_ticks() {
        let mut r = runner(3, Duration::from_millis(5));
        let start = std::time::Instant::now();
        r.run(|_| ControlFlow::Continue(()));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
