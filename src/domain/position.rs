//! Simulated position and its open/closed lifecycle.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::ohlcv::Bar;
use super::signal::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: u64,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub stop_loss: f64,
    pub initial_stop_loss: f64,
    pub take_profit: f64,
    /// Notional committed to the trade, in account currency.
    pub amount: f64,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub exit_time: Option<NaiveDateTime>,
    pub pnl: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    /// Strategy reason that opened the trade.
    pub label: String,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Long stops on the bar's low, short on its high.
    pub fn should_stop_loss(&self, bar: &Bar) -> bool {
        match self.side {
            Side::Buy => bar.low <= self.stop_loss,
            Side::Sell => bar.high >= self.stop_loss,
        }
    }

    /// Long targets on the bar's high, short on its low.
    pub fn should_take_profit(&self, bar: &Bar) -> bool {
        match self.side {
            Side::Buy => bar.high >= self.take_profit,
            Side::Sell => bar.low <= self.take_profit,
        }
    }

    /// sign × (exit - entry) / entry × amount
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        self.side.sign() * (exit_price - self.entry_price) / self.entry_price * self.amount
    }

    /// Closed copy of this position filled at `exit_price`.
    pub fn closed(&self, exit_price: f64, exit_time: NaiveDateTime, reason: ExitReason) -> Position {
        Position {
            status: PositionStatus::Closed,
            exit_price: Some(exit_price),
            exit_time: Some(exit_time),
            pnl: Some(self.pnl_at(exit_price)),
            exit_reason: Some(reason),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{bar_time, make_bar};

    fn sample_long_position() -> Position {
        Position {
            id: 1,
            side: Side::Buy,
            entry_price: 110.0,
            entry_time: bar_time(0),
            stop_loss: 100.0,
            initial_stop_loss: 100.0,
            take_profit: 120.0,
            amount: 50.0,
            status: PositionStatus::Open,
            exit_price: None,
            exit_time: None,
            pnl: None,
            exit_reason: None,
            label: "test".into(),
        }
    }

    fn sample_short_position() -> Position {
        Position {
            side: Side::Sell,
            entry_price: 100.0,
            stop_loss: 110.0,
            initial_stop_loss: 110.0,
            take_profit: 80.0,
            amount: 1000.0,
            ..sample_long_position()
        }
    }

    #[test]
    fn stop_loss_long_uses_low() {
        let pos = sample_long_position();
        assert!(pos.should_stop_loss(&make_bar(1, 105.0, 106.0, 100.0, 105.0)));
        assert!(pos.should_stop_loss(&make_bar(1, 105.0, 106.0, 99.0, 105.0)));
        assert!(!pos.should_stop_loss(&make_bar(1, 99.0, 106.0, 100.5, 99.0)));
    }

    #[test]
    fn stop_loss_short_uses_high() {
        let pos = sample_short_position();
        assert!(pos.should_stop_loss(&make_bar(1, 105.0, 110.0, 104.0, 105.0)));
        assert!(!pos.should_stop_loss(&make_bar(1, 105.0, 109.0, 104.0, 106.0)));
    }

    #[test]
    fn take_profit_long_and_short() {
        let long = sample_long_position();
        assert!(long.should_take_profit(&make_bar(1, 115.0, 120.0, 114.0, 115.0)));
        assert!(!long.should_take_profit(&make_bar(1, 115.0, 119.9, 114.0, 115.0)));

        let short = sample_short_position();
        assert!(short.should_take_profit(&make_bar(1, 85.0, 86.0, 80.0, 85.0)));
        assert!(!short.should_take_profit(&make_bar(1, 85.0, 86.0, 80.1, 85.0)));
    }

    #[test]
    fn pnl_long_and_short() {
        let long = sample_long_position();
        assert!((long.pnl_at(100.0) - (-10.0 / 110.0 * 50.0)).abs() < 1e-9);
        assert!((long.pnl_at(120.0) - (10.0 / 110.0 * 50.0)).abs() < 1e-9);

        let short = sample_short_position();
        assert!((short.pnl_at(80.0) - 200.0).abs() < 1e-9);
        assert!((short.pnl_at(110.0) + 100.0).abs() < 1e-9);
    }

    #[test]
    fn closing_fills_exit_fields() {
        let pos = sample_long_position();
        let closed = pos.closed(100.0, bar_time(3), ExitReason::StopLoss);

        assert!(pos.is_open());
        assert!(!closed.is_open());
        assert_eq!(closed.exit_price, Some(100.0));
        assert_eq!(closed.exit_time, Some(bar_time(3)));
        assert_eq!(closed.exit_reason, Some(ExitReason::StopLoss));
        assert!((closed.pnl.unwrap() + 4.545_454_545).abs() < 1e-6);
        assert_eq!(closed.id, pos.id);
    }
}
