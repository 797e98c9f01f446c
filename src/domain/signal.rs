//! Trade direction and the transient per-tick entry signal.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Entry proposal produced by a strategy rule. "No signal" is `None` at the
/// call sites rather than a third side.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
    pub strength: u8,
}

impl Signal {
    /// Distance from entry to stop, negative when the stop sits on the
    /// profitable side of entry.
    pub fn risk(&self) -> f64 {
        self.side.sign() * (self.entry_price - self.stop_loss)
    }
}
