// =============================================================================
// 24h Ticker — rolling summary statistics for one pair
// =============================================================================
//
// Values are kept exactly as the exchange sent them (decimal strings) and are
// only parsed when a display model is built.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::format::{format_number, format_percent, format_price};

/// Subset of `GET /api/v3/ticker/24hr` the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSnapshot {
    pub last_price: String,
    pub price_change: String,
    pub price_change_percent: String,
    pub high_price: String,
    pub low_price: String,
    pub volume: String,
    pub quote_volume: String,
}

/// Parsed, formatted ticker ready for the header panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerDisplay {
    pub last_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub is_up: bool,
    pub last_price_text: String,
    pub price_change_text: String,
    pub price_change_percent_text: String,
    pub high_text: String,
    pub low_text: String,
    pub volume_text: String,
    pub quote_volume_text: String,
}

/// Unparseable decimals render as zero rather than poisoning the panel.
fn decimal(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

impl TickerSnapshot {
    pub fn render(&self) -> TickerDisplay {
        let last_price = decimal(&self.last_price);
        let price_change = decimal(&self.price_change);
        let price_change_percent = decimal(&self.price_change_percent);

        TickerDisplay {
            last_price,
            price_change,
            price_change_percent,
            is_up: price_change >= 0.0,
            last_price_text: format_price(last_price),
            price_change_text: format_price(price_change),
            price_change_percent_text: format_percent(price_change_percent),
            high_text: format_price(decimal(&self.high_price)),
            low_text: format_price(decimal(&self.low_price)),
            volume_text: format_number(decimal(&self.volume)),
            quote_volume_text: format_number(decimal(&self.quote_volume)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "symbol": "BTCUSDT",
        "priceChange": "-512.30000000",
        "priceChangePercent": "-1.204",
        "weightedAvgPrice": "42100.1",
        "lastPrice": "42012.55000000",
        "highPrice": "42900.00000000",
        "lowPrice": "41500.00000000",
        "volume": "25431.12000000",
        "quoteVolume": "1070000000.50000000",
        "count": 100
    }"#;

    #[test]
    fn deserialises_binance_payload() {
        let t: TickerSnapshot = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(t.last_price, "42012.55000000");
        assert_eq!(t.price_change_percent, "-1.204");
    }

    #[test]
    fn render_parses_and_formats() {
        let t: TickerSnapshot = serde_json::from_str(SAMPLE).unwrap();
        let d = t.render();
        assert!(!d.is_up);
        assert_eq!(d.last_price_text, "42012.55");
        assert_eq!(d.price_change_percent_text, "-1.20%");
        assert_eq!(d.high_text, "42900.00");
        assert_eq!(d.volume_text, "25.43K");
        assert_eq!(d.quote_volume_text, "1.07B");
    }

    #[test]
    fn garbage_decimal_renders_as_zero() {
        let mut t: TickerSnapshot = serde_json::from_str(SAMPLE).unwrap();
        t.last_price = "n/a".into();
        assert_eq!(t.render().last_price, 0.0);
    }
}
