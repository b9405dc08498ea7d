pub mod client;
pub mod rate_limit;

use async_trait::async_trait;

use crate::market_data::{Candle, OrderBook, TickerSnapshot};

pub use client::BinanceClient;

/// Why a market-data request failed. The client reports failures as-is; the
/// dashboard's degradation policy decides what to show instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {endpoint} response: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("request weight budget exhausted ({used}/{limit} in the current minute)")]
    RateLimited { used: u32, limit: u32 },

    #[error("kline stream connection failed: {0}")]
    Stream(String),
}

/// Public REST market data used by the dashboard.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Historical candles, oldest first.
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError>;

    /// Rolling 24h statistics.
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot, FetchError>;

    /// Depth snapshot with cumulative totals.
    async fn get_order_book(&self, symbol: &str, depth: u32) -> Result<OrderBook, FetchError>;
}
