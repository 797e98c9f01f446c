//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss)). A zero average loss
//! is replaced by `ZERO_LOSS_EPSILON`, so an all-gain window reads just under 100.
//!
//! Warmup: first n bars are unavailable (need n price changes).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 14;
pub const ZERO_LOSS_EPSILON: f64 = 1e-5;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() <= period {
        return IndicatorSeries::unavailable(IndicatorType::Rsi(period), bars.len());
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut values = vec![None; period];

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    values.push(Some(rsi_from_averages(avg_gain, avg_loss)));

    for i in (period + 1)..bars.len() {
        let gain_idx = i - 1;
        avg_gain = (avg_gain * (period - 1) as f64 + gains[gain_idx]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[gain_idx]) / period as f64;
        values.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let denominator = if avg_loss > 0.0 {
        avg_loss
    } else {
        ZERO_LOSS_EPSILON
    };
    let rs = avg_gain / denominator;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::bars_from_closes;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = bars_from_closes(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.len(), 1);
        assert!(series.values[0].is_none());
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        assert_eq!(series.len(), 15);
        for i in 0..14 {
            assert!(series.values[i].is_none(), "Bar {} should be unavailable", i);
        }
        assert!(series.values[14].is_some(), "Bar 14 should be available");
    }

    #[test]
    fn rsi_all_gains_approaches_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        let rsi = series.value_at(14).unwrap();
        assert!(rsi < 100.0);
        assert!(rsi > 99.99, "RSI {} should be near 100 when all gains", rsi);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        let rsi = series.value_at(14).unwrap();
        assert!(rsi.abs() < f64::EPSILON, "RSI should be 0 when all losses");
    }

    #[test]
    fn rsi_flat_prices_is_zero() {
        // No gains and no losses: avg_gain = 0 over an epsilon loss.
        let series = calculate_rsi(&bars_from_closes(&[50.0; 20]), 14);
        assert!(series.value_at(19).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        for rsi in series.values.iter().flatten() {
            assert!((0.0..=100.0).contains(rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // 14 alternating +1/-1 changes, then a +2 change.
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let last = *closes.last().unwrap();
        closes.push(last + 2.0);

        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        let seed_gain = 7.0 / 14.0;
        let seed_loss = 7.0 / 14.0;
        assert!((series.value_at(14).unwrap() - 50.0).abs() < 1e-9);

        let avg_gain = (seed_gain * 13.0 + 2.0) / 14.0;
        let avg_loss = (seed_loss * 13.0) / 14.0;
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        assert!((series.value_at(15).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.len(), 2);
        assert!(series.values.iter().all(Option::is_none));
        assert_eq!(series.indicator_type, IndicatorType::Rsi(0));
    }

    #[test]
    fn rsi_known_calculation() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        let rsi = series.value_at(14).unwrap();
        assert!(rsi > 50.0 && rsi < 100.0, "RSI should be in bullish territory");
    }
}
