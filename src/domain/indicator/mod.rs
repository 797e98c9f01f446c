//! Technical indicator implementations.
//!
//! Every calculator is a pure function over a bar window and returns a series
//! parallel to that window. Positions before an indicator's warm-up hold
//! `None`; from the warm-up index onward every value is a finite number.
//!
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a parallel series of optional values

pub mod atr;
pub mod classify;
pub mod cross;
pub mod ema;
pub mod macd;
pub mod order_block;
pub mod rsi;
pub mod sideways;
pub mod volume;

pub use atr::calculate_atr;
pub use ema::{calculate_ema, ema_values};
pub use macd::{calculate_macd, calculate_macd_default, Macd};
pub use rsi::calculate_rsi;
pub use volume::calculate_average_volume;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    VolumeSma(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    /// Index of the first bar that carries a value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Ema(period)
            | IndicatorType::Atr(period)
            | IndicatorType::VolumeSma(period) => period.saturating_sub(1),
            IndicatorType::Rsi(period) => period,
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_sub(1) + signal.saturating_sub(1)
            }
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries<T = f64> {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<T>>,
}

impl<T: Copy> IndicatorSeries<T> {
    pub fn unavailable(indicator_type: IndicatorType, len: usize) -> Self {
        IndicatorSeries {
            indicator_type,
            values: vec![None; len],
        }
    }

    pub fn value_at(&self, index: usize) -> Option<T> {
        self.values.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
