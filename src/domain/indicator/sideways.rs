//! Range-bound market detection.

use crate::domain::ohlcv::Bar;

pub const DEFAULT_LOOKBACK: usize = 20;
const RANGE_THRESHOLD: f64 = 0.03;

/// True when the high/low range of the last `lookback + 1` bars is under 3%
/// of their mean close. Always false before `lookback` bars of history.
pub fn is_sideways(bars: &[Bar], index: usize, lookback: usize) -> bool {
    if index < lookback || index >= bars.len() {
        return false;
    }

    let recent = &bars[index - lookback..=index];
    let max_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let avg_close = recent.iter().map(|b| b.close).sum::<f64>() / recent.len() as f64;

    (max_high - min_low) < avg_close * RANGE_THRESHOLD
}
