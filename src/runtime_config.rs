// =============================================================================
// Runtime Configuration — dashboard settings with env overrides
// =============================================================================
//
// Settings come from an optional JSON file; every field carries a serde
// default so a partial (or missing) file still yields a complete config.
// Environment variables (a `.env` file is honoured) override the file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binance::client::{clamp_depth, clamp_kline_limit, DEFAULT_KLINE_LIMIT};
use crate::dashboard::{ControllerSettings, PollSettings, SessionState};
use crate::types::{find_symbol, Timeframe};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_rest_base() -> String {
    "https://api.binance.com".to_string()
}

fn default_ws_base() -> String {
    "wss://stream.binance.com:9443".to_string()
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_candle_limit() -> u32 {
    DEFAULT_KLINE_LIMIT
}

fn default_book_depth() -> u32 {
    20
}

fn default_ticker_poll_ms() -> u64 {
    5_000
}

fn default_book_poll_ms() -> u64 {
    2_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

// =============================================================================
// DashConfig
// =============================================================================

/// Top-level configuration for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    /// Address the browser API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Binance REST base URL.
    #[serde(default = "default_rest_base")]
    pub rest_base: String,

    /// Binance WebSocket base URL.
    #[serde(default = "default_ws_base")]
    pub ws_base: String,

    /// Symbol selected when the dashboard opens.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    /// Timeframe selected when the dashboard opens.
    #[serde(default = "default_timeframe")]
    pub default_timeframe: Timeframe,

    /// Candles requested per snapshot (clamped to the exchange maximum).
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,

    /// Order-book levels per side.
    #[serde(default = "default_book_depth")]
    pub book_depth: u32,

    #[serde(default = "default_ticker_poll_ms")]
    pub ticker_poll_ms: u64,

    /// Order-book refresh; shorter than the ticker period.
    #[serde(default = "default_book_poll_ms")]
    pub book_poll_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rest_base: default_rest_base(),
            ws_base: default_ws_base(),
            default_symbol: default_symbol(),
            default_timeframe: default_timeframe(),
            candle_limit: default_candle_limit(),
            book_depth: default_book_depth(),
            ticker_poll_ms: default_ticker_poll_ms(),
            book_poll_ms: default_book_poll_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl DashConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            default_symbol = %config.default_symbol,
            candle_limit = config.candle_limit,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Apply `AURORA_*` overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(v) = var("AURORA_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = var("AURORA_REST_BASE") {
            self.rest_base = v;
        }
        if let Some(v) = var("AURORA_WS_BASE") {
            self.ws_base = v;
        }
        if let Some(v) = var("AURORA_DEFAULT_SYMBOL") {
            self.default_symbol = v.to_uppercase();
        }
        if let Some(v) = var("AURORA_DEFAULT_TIMEFRAME") {
            match Timeframe::from_code(&v) {
                Some(tf) => self.default_timeframe = tf,
                None => warn!(value = %v, "ignoring unknown AURORA_DEFAULT_TIMEFRAME"),
            }
        }
        if let Some(v) = var("AURORA_CANDLE_LIMIT") {
            match v.parse() {
                Ok(n) => self.candle_limit = n,
                Err(_) => warn!(value = %v, "ignoring non-numeric AURORA_CANDLE_LIMIT"),
            }
        }
    }

    /// Session the dashboard opens with.
    pub fn initial_session(&self) -> SessionState {
        if find_symbol(&self.default_symbol).is_none() {
            warn!(symbol = %self.default_symbol, "unknown default symbol — using BTCUSDT");
        }
        SessionState::initial(&self.default_symbol, self.default_timeframe)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Settings that are accepted but will not behave as intended.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.book_poll_ms >= self.ticker_poll_ms {
            out.push(format!(
                "book_poll_ms ({}) should be shorter than ticker_poll_ms ({})",
                self.book_poll_ms, self.ticker_poll_ms
            ));
        }
        if self.book_depth == 0 {
            out.push(format!("book_depth 0 raised to {}", clamp_depth(0)));
        }
        if self.candle_limit != clamp_kline_limit(self.candle_limit) {
            out.push(format!(
                "candle_limit {} clamped to {}",
                self.candle_limit,
                clamp_kline_limit(self.candle_limit)
            ));
        }
        out
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        for warning in self.warnings() {
            warn!(%warning, "dashboard config adjusted");
        }
        ControllerSettings {
            candle_limit: clamp_kline_limit(self.candle_limit),
            poll: PollSettings {
                ticker_period: Duration::from_millis(self.ticker_poll_ms),
                book_period: Duration::from_millis(self.book_poll_ms),
                book_depth: clamp_depth(self.book_depth),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.default_symbol, "BTCUSDT");
        assert_eq!(cfg.default_timeframe, Timeframe::H1);
        assert_eq!(cfg.candle_limit, 500);
        assert!(cfg.book_poll_ms < cfg.ticker_poll_ms);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: DashConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.rest_base, "https://api.binance.com");
        assert_eq!(cfg.book_depth, 20);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "default_symbol": "ETHUSDT", "default_timeframe": "15m" }"#;
        let cfg: DashConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_symbol, "ETHUSDT");
        assert_eq!(cfg.default_timeframe, Timeframe::M15);
        assert_eq!(cfg.ticker_poll_ms, 5_000);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AURORA_DEFAULT_SYMBOL", "solusdt"),
            ("AURORA_DEFAULT_TIMEFRAME", "4h"),
            ("AURORA_CANDLE_LIMIT", "not-a-number"),
            ("AURORA_BIND_ADDR", "  "),
        ]);
        let mut cfg = DashConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.default_symbol, "SOLUSDT");
        assert_eq!(cfg.default_timeframe, Timeframe::H4);
        assert_eq!(cfg.candle_limit, 500);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn controller_settings_clamp_candle_limit() {
        let cfg = DashConfig {
            candle_limit: 50_000,
            ..DashConfig::default()
        };
        let s = cfg.controller_settings();
        assert_eq!(s.candle_limit, 1000);
        assert_eq!(s.poll.book_period, Duration::from_secs(2));
    }

    #[test]
    fn defaults_produce_no_warnings() {
        assert!(DashConfig::default().warnings().is_empty());
    }

    #[test]
    fn slow_book_poll_and_zero_depth_are_flagged() {
        let cfg = DashConfig {
            book_poll_ms: 5_000,
            ticker_poll_ms: 5_000,
            book_depth: 0,
            ..DashConfig::default()
        };
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("book_poll_ms"));
        assert_eq!(cfg.controller_settings().poll.book_depth, 5);
    }

    #[test]
    fn initial_session_uses_configured_defaults() {
        let cfg = DashConfig {
            default_symbol: "DOGEUSDT".into(),
            default_timeframe: Timeframe::D1,
            ..DashConfig::default()
        };
        let s = cfg.initial_session();
        assert_eq!(s.symbol.code, "DOGEUSDT");
        assert_eq!(s.timeframe, Timeframe::D1);
    }
}
