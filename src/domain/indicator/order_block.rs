//! Order block (demand/supply zone) detection.
//!
//! An impulse bar has a body larger than `IMPULSE_ATR_FACTOR * ATR` and closes
//! beyond the prior bar's extreme: above its high for demand, below its low for
//! supply. The prior bar's [low, high] becomes the block. A block stays valid
//! while later closes remain on its favorable side; once a close trades through
//! it (at or below the bottom for demand, at or above the top for supply) it is
//! mitigated for good.

use chrono::NaiveDateTime;

use crate::domain::ohlcv::Bar;

pub const IMPULSE_ATR_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSide {
    Demand,
    Supply,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBlock {
    pub top: f64,
    pub bottom: f64,
    pub side: BlockSide,
    pub created_at: NaiveDateTime,
    /// Window index of the impulse bar that created the block.
    pub created_index: usize,
}

impl OrderBlock {
    fn invalidated_by(&self, close: f64) -> bool {
        match self.side {
            BlockSide::Demand => close <= self.bottom,
            BlockSide::Supply => close >= self.top,
        }
    }
}

/// The nearest unmitigated block of each side at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActiveBlocks {
    pub demand: Option<OrderBlock>,
    pub supply: Option<OrderBlock>,
}

/// Block created at `index`, if that bar is an impulse bar.
pub fn detect_impulse(bars: &[Bar], atr: &[Option<f64>], index: usize) -> Option<OrderBlock> {
    if index == 0 || index >= bars.len() {
        return None;
    }
    let atr = atr.get(index).copied().flatten()?;
    let bar = &bars[index];
    let prior = &bars[index - 1];

    if bar.body() <= IMPULSE_ATR_FACTOR * atr {
        return None;
    }

    let side = if bar.close > prior.high {
        BlockSide::Demand
    } else if bar.close < prior.low {
        BlockSide::Supply
    } else {
        return None;
    };

    Some(OrderBlock {
        top: prior.high,
        bottom: prior.low,
        side,
        created_at: bar.time,
        created_index: index,
    })
}

/// Active demand/supply block for every bar of the window.
pub fn active_order_blocks(bars: &[Bar], atr: &[Option<f64>]) -> Vec<ActiveBlocks> {
    let mut demand: Vec<OrderBlock> = Vec::new();
    let mut supply: Vec<OrderBlock> = Vec::new();
    let mut active = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        demand.retain(|block| !block.invalidated_by(bar.close));
        supply.retain(|block| !block.invalidated_by(bar.close));

        if let Some(block) = detect_impulse(bars, atr, i) {
            match block.side {
                BlockSide::Demand => demand.push(block),
                BlockSide::Supply => supply.push(block),
            }
        }

        active.push(ActiveBlocks {
            demand: demand.last().copied(),
            supply: supply.last().copied(),
        });
    }

    active
}
