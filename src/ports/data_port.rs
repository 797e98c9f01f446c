//! Bar acquisition port trait.

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::Bar;

/// Supplies the bars a replay runs over.
///
/// Implementations return bars in ascending time order, at most `limit` of
/// them (the most recent ones), or an explicit error. The replay core does no
/// validation or retrying of its own.
pub trait BarSource {
    fn fetch_bars(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>, ReplayError>;
}
