//! Data access port trait.

use crate::domain::error::TradesimError;
use crate::domain::price_series::{DateRange, PriceSeries};
use crate::domain::trade::TradeExecution;

pub trait DataPort {
    /// Bars and aligned factors for `symbol`, oldest first.
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, TradesimError>;

    /// Like [`DataPort::fetch_series`], restricted to `range` (inclusive).
    fn fetch_series_between(
        &self,
        symbol: &str,
        range: &DateRange,
    ) -> Result<PriceSeries, TradesimError> {
        self.fetch_series(symbol)?.between(range)
    }

    /// Recorded executions for `symbol`, in time order.
    fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeExecution>, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;
}
