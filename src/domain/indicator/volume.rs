//! Volume average and volume trend classification.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 20;
const TREND_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Neutral,
}

/// Simple moving average of volume.
pub fn calculate_average_volume(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < period {
        return IndicatorSeries::unavailable(IndicatorType::VolumeSma(period), bars.len());
    }

    let mut values = vec![None; period - 1];
    let mut sum: f64 = bars[..period].iter().map(|b| b.volume).sum();
    values.push(Some(sum / period as f64));

    for i in period..bars.len() {
        sum += bars[i].volume - bars[i - period].volume;
        values.push(Some(sum / period as f64));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::VolumeSma(period),
        values,
    }
}

/// Classify volume at `index` against its average and the bar five back.
///
/// Returns the trend together with `volume / average`, which is 1.0 when
/// there is not enough history.
pub fn volume_trend(bars: &[Bar], index: usize, average: Option<f64>) -> (VolumeTrend, f64) {
    let average = match average {
        Some(avg) if avg > 0.0 && index >= TREND_LOOKBACK => avg,
        _ => return (VolumeTrend::Neutral, 1.0),
    };

    let current = bars[index].volume;
    let earlier = bars[index - TREND_LOOKBACK].volume;
    let ratio = current / average;

    if current > earlier * 1.1 && ratio > 1.2 {
        (VolumeTrend::Increasing, ratio)
    } else if current < earlier * 0.9 && ratio < 0.8 {
        (VolumeTrend::Decreasing, ratio)
    } else {
        (VolumeTrend::Neutral, ratio)
    }
}
