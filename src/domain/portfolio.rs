//! Account balance, trade history and equity tracking.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub balance: f64,
}

/// Single-position account.
///
/// Trade history holds every position ever opened; at most one of them is
/// open, and if so it is the last entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub balance: f64,
    pub initial_balance: f64,
    /// Opening fee as a percentage of the position amount.
    pub commission_pct: f64,
    pub trades: Vec<Position>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_balance: f64, commission_pct: f64) -> Self {
        Account {
            balance: initial_balance,
            initial_balance,
            commission_pct,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.trades.last().filter(|p| p.is_open())
    }

    pub fn has_open_position(&self) -> bool {
        self.open_position().is_some()
    }

    /// Record a new open position and charge the opening fee. Refused while
    /// another position is open.
    pub fn open(&mut self, position: Position) -> bool {
        if self.has_open_position() || !position.is_open() {
            return false;
        }
        self.balance -= position.amount * self.commission_pct / 100.0;
        self.trades.push(position);
        true
    }

    /// Replace the open position with its closed form and book the PnL.
    pub fn close(&mut self, closed: Position) -> bool {
        let Some(slot) = self.trades.last_mut() else {
            return false;
        };
        if !slot.is_open() || slot.id != closed.id || closed.is_open() {
            return false;
        }
        self.balance += closed.pnl.unwrap_or(0.0);
        *slot = closed;
        true
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &Position> {
        self.trades.iter().filter(|p| !p.is_open())
    }

    pub fn closed_count(&self) -> usize {
        self.closed_trades().count()
    }

    pub fn record_equity(&mut self, time: NaiveDateTime) {
        self.equity_curve.push(EquityPoint {
            time,
            balance: self.balance,
        });
    }
}
