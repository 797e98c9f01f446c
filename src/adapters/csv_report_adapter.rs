//! CSV trade history report implementing ReportPort.
//!
//! One row per position in opening order. An open position is written with
//! empty exit columns.

use std::fs;

use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;

use crate::domain::error::ReplayError;
use crate::domain::portfolio::Account;
use crate::domain::position::{ExitReason, Position, PositionStatus};
use crate::domain::signal::Side;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    id: u64,
    side: Side,
    status: PositionStatus,
    entry_time: String,
    entry_price: f64,
    initial_stop_loss: f64,
    take_profit: f64,
    amount: f64,
    exit_time: Option<String>,
    exit_price: Option<f64>,
    exit_reason: Option<ExitReason>,
    pnl: Option<f64>,
    label: &'a str,
}

fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

impl<'a> From<&'a Position> for TradeRow<'a> {
    fn from(p: &'a Position) -> Self {
        TradeRow {
            id: p.id,
            side: p.side,
            status: p.status,
            entry_time: format_time(p.entry_time),
            entry_price: p.entry_price,
            initial_stop_loss: p.initial_stop_loss,
            take_profit: p.take_profit,
            amount: p.amount,
            exit_time: p.exit_time.map(format_time),
            exit_price: p.exit_price,
            exit_reason: p.exit_reason,
            pnl: p.pnl,
            label: &p.label,
        }
    }
}

fn report_error(e: impl std::fmt::Display) -> ReplayError {
    ReplayError::Report {
        reason: e.to_string(),
    }
}

/// Trade history rendered as CSV text.
pub fn render_trades(account: &Account) -> Result<String, ReplayError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if account.trades.is_empty() {
        wtr.write_record([
            "id",
            "side",
            "status",
            "entry_time",
            "entry_price",
            "initial_stop_loss",
            "take_profit",
            "amount",
            "exit_time",
            "exit_price",
            "exit_reason",
            "pnl",
            "label",
        ])
        .map_err(report_error)?;
    }
    for position in &account.trades {
        wtr.serialize(TradeRow::from(position)).map_err(report_error)?;
    }
    let data = wtr.into_inner().map_err(report_error)?;
    String::from_utf8(data).map_err(report_error)
}

pub struct CsvTradeReport;

impl ReportPort for CsvTradeReport {
    fn write(&self, account: &Account, output_path: &str) -> Result<(), ReplayError> {
        let content = render_trades(account)?;
        fs::write(output_path, content)?;
        info!("wrote {} trades to {}", account.trades.len(), output_path);
        Ok(())
    }
}
