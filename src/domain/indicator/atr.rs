//! Average True Range with Wilder smoothing.
//!
//! TR[0] = high - low, TR[i] = true range against the previous close.
//! Seed = mean of the first n true ranges; then ATR = (prev * (n-1) + TR) / n.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < period {
        return IndicatorSeries::unavailable(IndicatorType::Atr(period), bars.len());
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut values = vec![None; period - 1];
    let mut atr = tr_values[..period].iter().sum::<f64>() / period as f64;
    values.push(Some(atr));

    for tr in &tr_values[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        values.push(Some(atr));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
