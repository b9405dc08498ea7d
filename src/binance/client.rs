// =============================================================================
// Binance REST API Client — public market data
// =============================================================================
//
// Only unsigned public endpoints are used: klines, 24h ticker and depth.
// Every call returns `Result<_, FetchError>`; no fallback data is produced
// here. Request weight is tracked from response headers and requests are
// refused locally once the budget for the current minute is spent.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::rate_limit::{
    depth_weight, RateLimitSnapshot, RateLimitTracker, KLINES_WEIGHT, TICKER_WEIGHT,
};
use super::{FetchError, MarketDataSource};
use crate::market_data::orderbook::parse_depth_levels;
use crate::market_data::{Candle, OrderBook, TickerSnapshot};

/// Exchange maximum for `GET /api/v3/klines?limit=`.
pub const MAX_KLINE_LIMIT: u32 = 1000;
/// Default candle count requested for a chart snapshot.
pub const DEFAULT_KLINE_LIMIT: u32 = 500;
/// Depth limits accepted by `GET /api/v3/depth`.
const DEPTH_LIMITS: [u32; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

/// Clamp a requested candle count into `1..=MAX_KLINE_LIMIT`.
pub fn clamp_kline_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_KLINE_LIMIT)
}

/// Round a requested depth up to the nearest limit the exchange accepts.
pub fn clamp_depth(depth: u32) -> u32 {
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|&d| d >= depth)
        .unwrap_or(DEPTH_LIMITS[DEPTH_LIMITS.len() - 1])
}

/// `GET /api/v3/klines` URL with the limit already clamped.
pub(crate) fn klines_url(base_url: &str, symbol: &str, interval: &str, limit: u32) -> String {
    format!(
        "{}/api/v3/klines?symbol={}&interval={}&limit={}",
        base_url,
        symbol,
        interval,
        clamp_kline_limit(limit)
    )
}

/// Binance public REST client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: std::sync::Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` (e.g. `https://api.binance.com`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: std::sync::Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> RateLimitSnapshot {
        self.rate_limit.snapshot()
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `url`, account for its weight and decode the JSON body.
    async fn get_json(
        &self,
        endpoint: &'static str,
        url: &str,
        weight: u32,
    ) -> Result<serde_json::Value, FetchError> {
        self.rate_limit
            .try_acquire(weight)
            .map_err(|used| FetchError::RateLimited {
                used,
                limit: super::rate_limit::WEIGHT_HARD_LIMIT,
            })?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { endpoint, source })?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Decode {
                endpoint,
                reason: e.to_string(),
            })
    }
}

// -----------------------------------------------------------------------------
// Response decoding (kept free of I/O so it can be tested on fixtures)
// -----------------------------------------------------------------------------

/// Decode the klines array-of-arrays body. Short rows are skipped; a row with
/// an unparseable value fails the whole response.
pub(crate) fn decode_klines(body: &serde_json::Value) -> Result<Vec<Candle>, FetchError> {
    const ENDPOINT: &str = "GET /api/v3/klines";
    let decode = |reason: String| FetchError::Decode {
        endpoint: ENDPOINT,
        reason,
    };

    let raw = body
        .as_array()
        .ok_or_else(|| decode("klines response is not an array".into()))?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let row = entry
            .as_array()
            .ok_or_else(|| decode("kline entry is not an array".into()))?;
        if row.len() < 8 {
            warn!("skipping malformed kline entry with {} elements", row.len());
            continue;
        }
        candles.push(Candle::from_kline_row(row).map_err(|e| decode(format!("{e:#}")))?);
    }
    Ok(candles)
}

pub(crate) fn decode_ticker(body: serde_json::Value) -> Result<TickerSnapshot, FetchError> {
    serde_json::from_value(body).map_err(|e| FetchError::Decode {
        endpoint: "GET /api/v3/ticker/24hr",
        reason: e.to_string(),
    })
}

pub(crate) fn decode_depth(body: &serde_json::Value) -> Result<OrderBook, FetchError> {
    let decode = |e: anyhow::Error| FetchError::Decode {
        endpoint: "GET /api/v3/depth",
        reason: format!("{e:#}"),
    };
    let bids = parse_depth_levels(&body["bids"], "bids").map_err(decode)?;
    let asks = parse_depth_levels(&body["asks"], "asks").map_err(decode)?;
    Ok(OrderBook::from_levels(&bids, &asks))
}

// -----------------------------------------------------------------------------
// Public market data
// -----------------------------------------------------------------------------

#[async_trait]
impl MarketDataSource for BinanceClient {
    /// GET /api/v3/klines (public — no signature required).
    #[instrument(skip(self), name = "binance::get_klines")]
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = klines_url(&self.base_url, symbol, interval, limit);

        let body = self
            .get_json("GET /api/v3/klines", &url, KLINES_WEIGHT)
            .await?;
        let candles = decode_klines(&body)?;

        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    /// GET /api/v3/ticker/24hr for a single symbol.
    #[instrument(skip(self), name = "binance::get_ticker")]
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot, FetchError> {
        let url = format!("{}/api/v3/ticker/24hr?symbol={}", self.base_url, symbol);

        let body = self
            .get_json("GET /api/v3/ticker/24hr", &url, TICKER_WEIGHT)
            .await?;
        let ticker = decode_ticker(body)?;

        debug!(symbol, last_price = %ticker.last_price, "ticker fetched");
        Ok(ticker)
    }

    /// GET /api/v3/depth.
    #[instrument(skip(self), name = "binance::get_order_book")]
    async fn get_order_book(&self, symbol: &str, depth: u32) -> Result<OrderBook, FetchError> {
        let depth = clamp_depth(depth);
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.base_url, symbol, depth
        );

        let body = self
            .get_json("GET /api/v3/depth", &url, depth_weight(depth))
            .await?;
        let book = decode_depth(&body)?;

        debug!(
            symbol,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "order book fetched"
        );
        Ok(book)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::{routing::get, Json, Router};
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::types::{Timeframe, SYMBOLS};

    fn kline_row(open_time: i64, close: &str) -> serde_json::Value {
        json!([open_time, "1.0", "2.0", "0.5", close, "10", open_time + 59_999, "15", 3, "1", "1", "0"])
    }

    #[test]
    fn kline_limit_is_bounded() {
        assert_eq!(clamp_kline_limit(0), 1);
        assert_eq!(clamp_kline_limit(DEFAULT_KLINE_LIMIT), 500);
        assert_eq!(clamp_kline_limit(5000), MAX_KLINE_LIMIT);
    }

    #[test]
    fn klines_url_carries_clamped_limit_for_every_pair() {
        for symbol in SYMBOLS {
            for tf in Timeframe::ALL {
                for (requested, sent) in [(0, 1), (500, 500), (5000, 1000)] {
                    let url = klines_url("https://api.binance.com", symbol.code, tf.interval(), requested);
                    assert_eq!(
                        url,
                        format!(
                            "https://api.binance.com/api/v3/klines?symbol={}&interval={}&limit={}",
                            symbol.code,
                            tf.interval(),
                            sent
                        )
                    );
                }
            }
        }
    }

    type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Local stand-in for the klines endpoint: answers with exactly `limit`
    /// rows spaced by the requested interval.
    async fn fixture_klines(
        State(seen): State<SeenQueries>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        let limit: i64 = query
            .get("limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let step = query
            .get("interval")
            .and_then(|i| Timeframe::from_code(i))
            .map_or(60_000, Timeframe::duration_ms);
        seen.lock().push(query);
        let rows: Vec<serde_json::Value> = (0..limit).map(|i| kline_row(i * step, "1.5")).collect();
        Json(json!(rows))
    }

    async fn serve_fixture() -> (String, SeenQueries) {
        let seen: SeenQueries = Arc::default();
        let app = Router::new()
            .route("/api/v3/klines", get(fixture_klines))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn get_klines_returns_requested_length_for_every_pair() {
        let (base, seen) = serve_fixture().await;
        let client = BinanceClient::new(base, Duration::from_secs(5)).unwrap();

        for symbol in SYMBOLS {
            for tf in Timeframe::ALL {
                for requested in [1, 37, 5000] {
                    let candles = client
                        .get_klines(symbol.code, tf.interval(), requested)
                        .await
                        .unwrap();
                    let expected = clamp_kline_limit(requested);
                    assert_eq!(candles.len(), expected as usize, "{} {}", symbol.code, tf);
                    assert!(candles
                        .windows(2)
                        .all(|w| w[1].timestamp - w[0].timestamp == tf.duration_ms()));

                    let query = seen.lock().pop().unwrap();
                    assert_eq!(query["symbol"], symbol.code);
                    assert_eq!(query["interval"], tf.interval());
                    assert_eq!(query["limit"], expected.to_string());
                }
            }
        }
    }

    #[test]
    fn depth_rounds_up_to_accepted_limit() {
        assert_eq!(clamp_depth(1), 5);
        assert_eq!(clamp_depth(20), 20);
        assert_eq!(clamp_depth(21), 50);
        assert_eq!(clamp_depth(9999), 5000);
    }

    #[test]
    fn decode_klines_keeps_order_and_length() {
        let body = json!([
            kline_row(0, "1.5"),
            kline_row(60_000, "1.6"),
            kline_row(120_000, "1.7")
        ]);
        let candles = decode_klines(&body).unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!((candles[2].close - 1.7).abs() < f64::EPSILON);
        assert!((candles[0].turnover - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_klines_skips_short_rows() {
        let body = json!([kline_row(0, "1.5"), [1, "2"]]);
        assert_eq!(decode_klines(&body).unwrap().len(), 1);
    }

    #[test]
    fn decode_klines_rejects_non_array() {
        let body = json!({ "code": -1121, "msg": "Invalid symbol." });
        assert!(matches!(decode_klines(&body), Err(FetchError::Decode { .. })));
    }

    #[test]
    fn decode_ticker_requires_fields() {
        assert!(decode_ticker(json!({ "lastPrice": "1" })).is_err());
        let ok = decode_ticker(json!({
            "lastPrice": "1", "priceChange": "0.1", "priceChangePercent": "10",
            "highPrice": "1.2", "lowPrice": "0.9", "volume": "5", "quoteVolume": "5.5"
        }))
        .unwrap();
        assert_eq!(ok.high_price, "1.2");
    }

    #[test]
    fn decode_depth_builds_cumulative_book() {
        let body = json!({
            "lastUpdateId": 7,
            "bids": [["100", "1"], ["99", "2"], ["98", "3"]],
            "asks": [["101", "1"], ["102", "2"], ["103", "3"]]
        });
        let book = decode_depth(&body).unwrap();
        let bid_totals: Vec<f64> = book.bids.iter().map(|e| e.total).collect();
        assert_eq!(bid_totals, vec![1.0, 3.0, 6.0]);
        assert_eq!(book.asks[0].price, 101.0);
        assert_eq!(book.asks[0].total, 1.0);
    }

    #[test]
    fn client_debug_has_base_url() {
        let c = BinanceClient::new("https://api.binance.com/", Duration::from_secs(1)).unwrap();
        assert!(format!("{c:?}").contains("https://api.binance.com"));
    }
}
