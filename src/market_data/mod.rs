pub mod candle;
pub mod kline_stream;
pub mod orderbook;
pub mod synthetic;
pub mod ticker;

// Re-export the record types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{Candle, CandleMerge, CandleOrigin, CandleSeries};
pub use kline_stream::{BinanceFeedConnector, CandleSink, FeedConnector, FeedHandle};
pub use orderbook::{OrderBook, OrderBookDisplay};
pub use ticker::{TickerDisplay, TickerSnapshot};
