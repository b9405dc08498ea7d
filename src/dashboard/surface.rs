use crate::market_data::{Candle, CandleSeries, OrderBook, TickerSnapshot};
use crate::types::{ChartType, Indicator};

/// The view the controller drives: the chart widget plus the ticker and
/// order-book panels. Calls are synchronous and cheap; implementations must
/// not block.
pub trait RenderSurface: Send + Sync {
    /// Replace the whole candle sequence.
    fn replace_candles(&self, series: &CandleSeries);
    /// Merge one streamed candle into the current sequence.
    fn update_candle(&self, candle: &Candle);
    fn set_chart_type(&self, chart_type: ChartType);
    fn add_indicator(&self, indicator: Indicator);
    fn remove_indicator(&self, indicator: Indicator);
    fn show_ticker(&self, symbol: &str, ticker: &TickerSnapshot);
    fn show_order_book(&self, symbol: &str, book: &OrderBook);
    /// The symbol changed: drop the ticker and order book of the previous one.
    fn clear_market_panels(&self);
    /// The session has ended; drop everything held for it.
    fn release(&self);
}
