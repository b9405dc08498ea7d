// =============================================================================
// Shared types used across the Aurora dashboard
// =============================================================================
//
// Fixed enumerations: the tradable symbols, the chart timeframes, chart
// styles and the indicator names understood by the browser chart widget.
// None of these are mutated at runtime.
// =============================================================================

use serde::{Deserialize, Serialize};

// =============================================================================
// Symbols
// =============================================================================

/// One tradable pair: exchange code, display name and display pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub pair: &'static str,
}

/// Every symbol the dashboard offers, in menu order.
pub const SYMBOLS: &[SymbolInfo] = &[
    SymbolInfo { code: "BTCUSDT", name: "Bitcoin", pair: "BTC/USDT" },
    SymbolInfo { code: "ETHUSDT", name: "Ethereum", pair: "ETH/USDT" },
    SymbolInfo { code: "BNBUSDT", name: "BNB", pair: "BNB/USDT" },
    SymbolInfo { code: "SOLUSDT", name: "Solana", pair: "SOL/USDT" },
    SymbolInfo { code: "XRPUSDT", name: "XRP", pair: "XRP/USDT" },
    SymbolInfo { code: "DOGEUSDT", name: "Dogecoin", pair: "DOGE/USDT" },
    SymbolInfo { code: "ADAUSDT", name: "Cardano", pair: "ADA/USDT" },
];

/// Look up a symbol by exchange code (case-insensitive).
pub fn find_symbol(code: &str) -> Option<SymbolInfo> {
    let code = code.trim();
    SYMBOLS
        .iter()
        .find(|s| s.code.eq_ignore_ascii_case(code))
        .copied()
}

// =============================================================================
// Timeframes
// =============================================================================

/// Chart timeframe. Serialises as the exchange interval code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

const MINUTE_MS: i64 = 60_000;

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H4,
        Self::D1,
        Self::W1,
    ];

    /// Label shown on the timeframe buttons.
    pub fn label(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1H",
            Self::H4 => "4H",
            Self::D1 => "1D",
            Self::W1 => "1W",
        }
    }

    /// Internal value handed to the chart widget's period API.
    pub fn value(self) -> &'static str {
        match self {
            Self::M1 => "1min",
            Self::M5 => "5min",
            Self::M15 => "15min",
            Self::M30 => "30min",
            Self::H1 => "60min",
            Self::H4 => "240min",
            Self::D1 => "1day",
            Self::W1 => "1week",
        }
    }

    /// Binance kline interval code.
    pub fn interval(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }

    /// Nominal candle duration in milliseconds.
    pub fn duration_ms(self) -> i64 {
        match self {
            Self::M1 => MINUTE_MS,
            Self::M5 => 5 * MINUTE_MS,
            Self::M15 => 15 * MINUTE_MS,
            Self::M30 => 30 * MINUTE_MS,
            Self::H1 => 60 * MINUTE_MS,
            Self::H4 => 240 * MINUTE_MS,
            Self::D1 => 1_440 * MINUTE_MS,
            Self::W1 => 10_080 * MINUTE_MS,
        }
    }

    /// Parse an interval code, label or internal value. Matching is exact:
    /// `1M` is Binance's monthly interval, not one minute.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|tf| tf.interval() == code || tf.label() == code || tf.value() == code)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.interval())
    }
}

// =============================================================================
// Chart type
// =============================================================================

/// Candle rendering style applied to the chart widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    CandleSolid,
    CandleStroke,
    CandleUpStroke,
    CandleDownStroke,
    Ohlc,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 6] = [
        Self::CandleSolid,
        Self::CandleStroke,
        Self::CandleUpStroke,
        Self::CandleDownStroke,
        Self::Ohlc,
        Self::Area,
    ];
}

impl Default for ChartType {
    fn default() -> Self {
        Self::CandleSolid
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CandleSolid => "candle_solid",
            Self::CandleStroke => "candle_stroke",
            Self::CandleUpStroke => "candle_up_stroke",
            Self::CandleDownStroke => "candle_down_stroke",
            Self::Ohlc => "ohlc",
            Self::Area => "area",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Indicators
// =============================================================================

/// Where an indicator is drawn: over the candles or in its own pane below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Overlay,
    Subchart,
}

/// Indicator names understood by the chart widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Indicator {
    Ma,
    Ema,
    Boll,
    Sar,
    Vol,
    Macd,
    Rsi,
    Kdj,
}

impl Indicator {
    pub const OVERLAYS: [Indicator; 4] = [Self::Ma, Self::Ema, Self::Boll, Self::Sar];
    pub const SUBCHARTS: [Indicator; 4] = [Self::Vol, Self::Macd, Self::Rsi, Self::Kdj];

    pub fn pane(self) -> Pane {
        match self {
            Self::Ma | Self::Ema | Self::Boll | Self::Sar => Pane::Overlay,
            Self::Vol | Self::Macd | Self::Rsi | Self::Kdj => Pane::Subchart,
        }
    }

    /// Name passed to the widget's create/remove indicator calls.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ma => "MA",
            Self::Ema => "EMA",
            Self::Boll => "BOLL",
            Self::Sar => "SAR",
            Self::Vol => "VOL",
            Self::Macd => "MACD",
            Self::Rsi => "RSI",
            Self::Kdj => "KDJ",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_lookup_is_case_insensitive() {
        let eth = find_symbol("ethusdt").unwrap();
        assert_eq!(eth.code, "ETHUSDT");
        assert_eq!(eth.pair, "ETH/USDT");
        assert!(find_symbol("FOOBAR").is_none());
    }

    #[test]
    fn symbol_codes_are_unique() {
        for (i, a) in SYMBOLS.iter().enumerate() {
            for b in &SYMBOLS[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }

    #[test]
    fn timeframe_parses_code_label_and_value() {
        assert_eq!(Timeframe::from_code("1h"), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_code("1H"), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_code("240min"), Some(Timeframe::H4));
        assert_eq!(Timeframe::from_code("3m"), None);
    }

    #[test]
    fn monthly_code_is_not_one_minute() {
        assert_eq!(Timeframe::from_code("1M"), None);
        assert_eq!(Timeframe::from_code("1m"), Some(Timeframe::M1));
        assert_eq!(Timeframe::from_code("1D"), Some(Timeframe::D1));
        assert_eq!(Timeframe::from_code("1w"), Some(Timeframe::W1));
    }

    #[test]
    fn timeframe_durations_increase() {
        for pair in Timeframe::ALL.windows(2) {
            assert!(pair[0].duration_ms() < pair[1].duration_ms());
        }
        assert_eq!(Timeframe::W1.duration_ms(), 7 * 24 * 3_600_000);
    }

    #[test]
    fn timeframe_serialises_as_interval_code() {
        assert_eq!(serde_json::to_string(&Timeframe::M15).unwrap(), "\"15m\"");
        let tf: Timeframe = serde_json::from_str("\"1d\"").unwrap();
        assert_eq!(tf, Timeframe::D1);
    }

    #[test]
    fn indicator_panes_partition_the_set() {
        assert!(Indicator::OVERLAYS.iter().all(|i| i.pane() == Pane::Overlay));
        assert!(Indicator::SUBCHARTS.iter().all(|i| i.pane() == Pane::Subchart));
        let boll: Indicator = serde_json::from_str("\"BOLL\"").unwrap();
        assert_eq!(boll, Indicator::Boll);
    }
}
