//! Performance summary of a finished or paused replay.

use super::portfolio::{Account, EquityPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_balance: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of ticks spent below a prior balance peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_minutes: f64,
}

impl Metrics {
    /// Statistics over the closed trades and equity curve. An open position
    /// is not counted.
    pub fn compute(account: &Account) -> Self {
        let initial = account.initial_balance;
        let final_balance = account.balance;
        let total_return = if initial > 0.0 {
            (final_balance - initial) / initial
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) =
            compute_drawdown(initial, &account.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_minutes = 0i64;

        for trade in account.closed_trades() {
            let pnl = trade.pnl.unwrap_or(0.0);
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }

            if let Some(exit) = trade.exit_time {
                total_minutes += (exit - trade.entry_time).num_minutes();
            }
        }

        let total_trades = trades_won + trades_lost + trades_breakeven;
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_holding_minutes = if total_trades > 0 {
            total_minutes as f64 / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            final_balance,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_minutes,
        }
    }
}

/// Largest peak-to-trough fall as a fraction of the peak, starting from the
/// initial balance.
fn compute_drawdown(initial: f64, equity_curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = initial;
    let mut max_dd = 0.0_f64;
    let mut current = 0usize;
    let mut longest = 0usize;

    for point in equity_curve {
        if point.balance >= peak {
            peak = point.balance;
            current = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.balance) / peak);
            current += 1;
            longest = longest.max(current);
        }
    }

    (max_dd, longest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Position, PositionStatus};
    use crate::domain::signal::Side;
    use crate::domain::test_support::bar_time;

    fn make_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &balance)| EquityPoint {
                time: bar_time(i),
                balance,
            })
            .collect()
    }

    fn make_trade(id: u64, pnl: f64, hours: usize) -> Position {
        let open = Position {
            id,
            side: Side::Buy,
            entry_price: 100.0,
            entry_time: bar_time(0),
            stop_loss: 90.0,
            initial_stop_loss: 90.0,
            take_profit: 110.0,
            amount: 1_000.0,
            status: PositionStatus::Open,
            exit_price: None,
            exit_time: None,
            pnl: None,
            exit_reason: None,
            label: "test".into(),
        };
        let mut closed = open.closed(100.0 + pnl / 10.0, bar_time(hours), ExitReason::TakeProfit);
        closed.pnl = Some(pnl);
        closed
    }

    fn make_account(final_balance: f64, trades: Vec<Position>) -> Account {
        let mut account = Account::new(10_000.0, 0.0);
        account.trades = trades;
        account.balance = final_balance;
        account
    }

    #[test]
    fn metrics_empty_account() {
        let metrics = Metrics::compute(&Account::new(10_000.0, 0.0));
        assert!((metrics.total_return - 0.0).abs() < f64::EPSILON);
        assert_eq!(metrics.total_trades, 0);
        assert!((metrics.profit_factor - 0.0).abs() < f64::EPSILON);
        assert!((metrics.max_drawdown - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_total_return() {
        let metrics = Metrics::compute(&make_account(11_000.0, vec![]));
        assert!((metrics.total_return - 0.10).abs() < 1e-9);
        let metrics = Metrics::compute(&make_account(9_000.0, vec![]));
        assert!((metrics.total_return + 0.10).abs() < 1e-9);
    }

    #[test]
    fn metrics_trade_stats() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, -50.0, 3),
            make_trade(3, 200.0, 10),
            make_trade(4, 0.0, 2),
        ];
        let metrics = Metrics::compute(&make_account(10_250.0, trades));

        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_eq!(metrics.trades_breakeven, 1);
        assert!((metrics.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((metrics.profit_factor - 6.0).abs() < 1e-9);
        assert!((metrics.avg_win - 150.0).abs() < 1e-9);
        assert!((metrics.avg_loss - 50.0).abs() < 1e-9);
        assert!((metrics.largest_win - 200.0).abs() < 1e-9);
        assert!((metrics.largest_loss - 50.0).abs() < 1e-9);
        assert!((metrics.avg_holding_minutes - 300.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_ignore_open_position() {
        let mut open = make_trade(2, 0.0, 1);
        open.status = PositionStatus::Open;
        let metrics = Metrics::compute(&make_account(10_100.0, vec![make_trade(1, 100.0, 1), open]));
        assert_eq!(metrics.total_trades, 1);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn drawdown_from_peak() {
        let curve = make_curve(&[10_000.0, 11_000.0, 9_000.0, 9_500.0, 8_000.0, 10_000.0]);
        let (dd, duration) = compute_drawdown(10_000.0, &curve);
        assert!((dd - 3_000.0 / 11_000.0).abs() < 1e-9);
        assert_eq!(duration, 4);
    }

    #[test]
    fn drawdown_counts_initial_balance_as_peak() {
        let curve = make_curve(&[9_900.0, 9_800.0]);
        let (dd, duration) = compute_drawdown(10_000.0, &curve);
        assert!((dd - 0.02).abs() < 1e-9);
        assert_eq!(duration, 2);
    }
}
