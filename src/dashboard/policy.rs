// =============================================================================
// Degradation Policy — what the dashboard shows when the exchange fails
// =============================================================================
//
//   candles     failure -> synthetic random walk, tagged `Synthetic`
//   ticker      failure -> None (the panel keeps its previous snapshot)
//   order book  failure -> both sides empty
//   live feed   failure -> None (chart runs on the snapshot only)
//
// Nothing here is surfaced to the user as an error; every failure is logged.
// =============================================================================

use tracing::warn;

use crate::binance::FetchError;
use crate::market_data::{
    synthetic, Candle, CandleOrigin, CandleSeries, FeedHandle, OrderBook, TickerSnapshot,
};
use crate::types::Timeframe;

pub fn candles_or_synthetic(
    result: Result<Vec<Candle>, FetchError>,
    symbol: &str,
    timeframe: Timeframe,
    limit: u32,
) -> CandleSeries {
    match result {
        Ok(candles) => {
            let series =
                CandleSeries::new(symbol, timeframe.interval(), CandleOrigin::Exchange, candles);
            if !series.is_strictly_increasing() {
                warn!(symbol = %symbol, interval = %timeframe, "exchange candles out of order");
            }
            series
        }
        Err(e) => {
            warn!(
                symbol = %symbol,
                interval = %timeframe,
                error = %e,
                "candle snapshot unavailable — substituting synthetic series"
            );
            let candles = synthetic::generate(
                limit as usize,
                timeframe.duration_ms(),
                chrono::Utc::now().timestamp_millis(),
            );
            CandleSeries::new(symbol, timeframe.interval(), CandleOrigin::Synthetic, candles)
        }
    }
}

pub fn ticker_or_none(
    result: Result<TickerSnapshot, FetchError>,
    symbol: &str,
) -> Option<TickerSnapshot> {
    result
        .map_err(|e| warn!(symbol = %symbol, error = %e, "ticker unavailable — keeping previous"))
        .ok()
}

pub fn book_or_empty(result: Result<OrderBook, FetchError>, symbol: &str) -> OrderBook {
    result.unwrap_or_else(|e| {
        warn!(symbol = %symbol, error = %e, "order book unavailable — showing empty book");
        OrderBook::empty()
    })
}

pub fn feed_or_none(result: Result<FeedHandle, FetchError>, symbol: &str) -> Option<FeedHandle> {
    result
        .map_err(|e| warn!(symbol = %symbol, error = %e, "live feed unavailable — snapshot only"))
        .ok()
}
