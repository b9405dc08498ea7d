// =============================================================================
// Kline Stream — live candle deltas for one (symbol, interval)
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::candle::{parse_string_f64, Candle};
use crate::binance::FetchError;

/// Callback receiving every parsed candle, synchronously, in arrival order.
pub type CandleSink = Arc<dyn Fn(Candle) + Send + Sync>;

/// Opens candle feeds. The Binance implementation is [`BinanceFeedConnector`].
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn open(
        &self,
        symbol: &str,
        interval: &str,
        on_candle: CandleSink,
    ) -> Result<FeedHandle, FetchError>;
}

// ---------------------------------------------------------------------------
// FeedHandle
// ---------------------------------------------------------------------------

/// Owned handle to a running feed. Closing (or dropping) the handle stops the
/// reader task, which closes the socket.
pub struct FeedHandle {
    symbol: String,
    interval: String,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            task,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn close(self) {
        // Drop does the work.
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(symbol = %self.symbol, interval = %self.interval, "kline feed closed");
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("symbol", &self.symbol)
            .field("interval", &self.interval)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Binance kline WebSocket
// ---------------------------------------------------------------------------

/// `{ws_base}/ws/{symbol-lowercase}@kline_{interval}`
pub fn kline_stream_url(ws_base: &str, symbol: &str, interval: &str) -> String {
    format!(
        "{}/ws/{}@kline_{}",
        ws_base.trim_end_matches('/'),
        symbol.to_lowercase(),
        interval
    )
}

/// Connects to Binance's single-stream kline endpoint.
#[derive(Debug, Clone)]
pub struct BinanceFeedConnector {
    ws_base: String,
}

impl BinanceFeedConnector {
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }
}

#[async_trait]
impl FeedConnector for BinanceFeedConnector {
    async fn open(
        &self,
        symbol: &str,
        interval: &str,
        on_candle: CandleSink,
    ) -> Result<FeedHandle, FetchError> {
        let url = kline_stream_url(&self.ws_base, symbol, interval);
        info!(url = %url, symbol = %symbol, interval = %interval, "connecting to kline WebSocket");

        let (ws_stream, _response) = connect_async(&url)
            .await
            .map_err(|e| FetchError::Stream(e.to_string()))?;

        info!(symbol = %symbol, interval = %interval, "kline WebSocket connected");

        let sym = symbol.to_string();
        let iv = interval.to_string();
        let task = tokio::spawn(async move {
            let (mut write, mut read) = ws_stream.split();
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => match parse_kline_message(&text) {
                        Ok(candle) => on_candle(candle),
                        Err(e) => debug!(error = %e, "dropping non-kline message"),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(e) = write.send(Message::Pong(payload)).await {
                            warn!(symbol = %sym, interval = %iv, error = %e, "failed to answer ping");
                            return;
                        }
                    }
                    // Pong / Binary / Close frames carry no candle.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(symbol = %sym, interval = %iv, error = %e, "kline WebSocket read error");
                        return;
                    }
                    None => {
                        warn!(symbol = %sym, interval = %iv, "kline WebSocket stream ended");
                        return;
                    }
                }
            }
        });

        Ok(FeedHandle::new(symbol, interval, task))
    }
}

/// Parse a kline message into a candle.
///
/// Accepts the single-stream payload
/// ```json
/// { "e": "kline", "s": "BTCUSDT", "k": { "t": 0, "o": "1", ... } }
/// ```
/// and the combined-stream envelope `{ "stream": ..., "data": { ... } }`.
pub fn parse_kline_message(text: &str) -> Result<Candle> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse kline JSON")?;

    let data = if root.get("data").is_some() {
        &root["data"]
    } else {
        &root
    };

    if let Some(event) = data.get("e").and_then(|v| v.as_str()) {
        if event != "kline" {
            anyhow::bail!("unexpected event type {event}");
        }
    }

    let k = data.get("k").context("missing field k")?;

    Ok(Candle {
        timestamp: k["t"].as_i64().context("missing field k.t")?,
        open: parse_string_f64(&k["o"], "k.o")?,
        high: parse_string_f64(&k["h"], "k.h")?,
        low: parse_string_f64(&k["l"], "k.l")?,
        close: parse_string_f64(&k["c"], "k.c")?,
        volume: parse_string_f64(&k["v"], "k.v")?,
        turnover: parse_string_f64(&k["q"], "k.q")?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KLINE: &str = r#"{
        "e": "kline",
        "E": 1700000001000,
        "s": "BTCUSDT",
        "k": {
            "t": 1700000000000,
            "T": 1700000059999,
            "s": "BTCUSDT",
            "i": "1m",
            "o": "37000.00",
            "h": "37050.00",
            "l": "36990.00",
            "c": "37020.00",
            "v": "123.456",
            "n": 1500,
            "x": false,
            "q": "4567890.12"
        }
    }"#;

    #[test]
    fn url_lowercases_symbol() {
        assert_eq!(
            kline_stream_url("wss://stream.binance.com:9443/", "BTCUSDT", "1h"),
            "wss://stream.binance.com:9443/ws/btcusdt@kline_1h"
        );
    }

    #[test]
    fn parses_single_stream_message() {
        let c = parse_kline_message(KLINE).unwrap();
        assert_eq!(c.timestamp, 1_700_000_000_000);
        assert!((c.close - 37020.0).abs() < f64::EPSILON);
        assert!((c.turnover - 4_567_890.12).abs() < 1e-6);
    }

    #[test]
    fn parses_combined_envelope() {
        let wrapped = format!(r#"{{ "stream": "btcusdt@kline_1m", "data": {KLINE} }}"#);
        assert!(parse_kline_message(&wrapped).is_ok());
    }

    #[test]
    fn rejects_other_events_and_garbage() {
        assert!(parse_kline_message(r#"{"e":"aggTrade","p":"1","q":"1"}"#).is_err());
        assert!(parse_kline_message(r#"{"result":null,"id":1}"#).is_err());
        assert!(parse_kline_message("not json").is_err());
        let bad_price = KLINE.replace("\"37020.00\"", "\"abc\"");
        assert!(parse_kline_message(&bad_price).is_err());
    }

    #[tokio::test]
    async fn dropping_handle_aborts_task() {
        let task = tokio::spawn(std::future::pending::<()>());
        let abort = task.abort_handle();
        let handle = FeedHandle::new("BTCUSDT", "1m", task);
        assert_eq!(handle.symbol(), "BTCUSDT");
        handle.close();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
