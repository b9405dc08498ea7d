// =============================================================================
// Order Book — depth snapshot with cumulative totals
// =============================================================================
//
// Both sides are ordered best price first. Cumulative totals are accumulated
// walking from the best price outward, so the best bid and the best ask carry
// the smallest running total and the totals never decrease going down the
// ladder (standard depth-chart convention).
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;

use crate::format::{format_number, format_price};

/// One price level with its running total from the near edge of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookEntry {
    pub price: f64,
    pub quantity: f64,
    pub total: f64,
}

/// Processed depth snapshot. Fully replaced on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBook {
    pub bids: Vec<BookEntry>,
    pub asks: Vec<BookEntry>,
}

impl OrderBook {
    /// Both sides empty; what a failed fetch degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Build from raw `(price, quantity)` levels in any order.
    pub fn from_levels(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        let mut bids = bids.to_vec();
        // Best bid is the highest price.
        bids.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut asks = asks.to_vec();
        // Best ask is the lowest price.
        asks.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self {
            bids: accumulate(&bids),
            asks: accumulate(&asks),
        }
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|e| e.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|e| e.price)
    }

    /// Ask minus bid, when both sides have a level.
    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn render(&self) -> OrderBookDisplay {
        OrderBookDisplay {
            bids: self.bids.iter().map(BookRow::from).collect(),
            asks: self.asks.iter().map(BookRow::from).collect(),
            spread_text: self.spread().map(format_price),
        }
    }
}

/// Running total over levels already ordered best-first.
fn accumulate(levels: &[(f64, f64)]) -> Vec<BookEntry> {
    let mut total = 0.0;
    levels
        .iter()
        .map(|&(price, quantity)| {
            total += quantity;
            BookEntry {
                price,
                quantity,
                total,
            }
        })
        .collect()
}

/// Formatted level for the order-book panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRow {
    pub price: String,
    pub quantity: String,
    pub total: String,
}

impl From<&BookEntry> for BookRow {
    fn from(e: &BookEntry) -> Self {
        Self {
            price: format_price(e.price),
            quantity: format_number(e.quantity),
            total: format_number(e.total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBookDisplay {
    pub bids: Vec<BookRow>,
    pub asks: Vec<BookRow>,
    pub spread_text: Option<String>,
}

/// Parse one side of a `GET /api/v3/depth` response.
///
/// Expected shape: `[["37000.00", "1.5"], ["36999.50", "0.2"], ...]`
pub fn parse_depth_levels(side: &serde_json::Value, name: &str) -> Result<Vec<(f64, f64)>> {
    let levels = side
        .as_array()
        .with_context(|| format!("depth field {name} is not an array"))?;

    levels
        .iter()
        .map(|level| {
            let price: f64 = level
                .get(0)
                .and_then(|v| v.as_str())
                .with_context(|| format!("{name} level missing price"))?
                .parse()
                .with_context(|| format!("{name} price is not a decimal"))?;
            let quantity: f64 = level
                .get(1)
                .and_then(|v| v.as_str())
                .with_context(|| format!("{name} level missing quantity"))?
                .parse()
                .with_context(|| format!("{name} quantity is not a decimal"))?;
            Ok((price, quantity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn totals(side: &[BookEntry]) -> Vec<f64> {
        side.iter().map(|e| e.total).collect()
    }

    #[test]
    fn worked_example_accumulates_from_best_price() {
        let book = OrderBook::from_levels(
            &[(100.0, 1.0), (99.0, 2.0), (98.0, 3.0)],
            &[(101.0, 1.0), (102.0, 2.0), (103.0, 3.0)],
        );
        assert_eq!(totals(&book.bids), vec![1.0, 3.0, 6.0]);
        assert_eq!(totals(&book.asks), vec![1.0, 3.0, 6.0]);
        assert_eq!(book.asks[0].price, 101.0);
        assert_eq!(book.best_ask(), Some(101.0));
        assert_eq!(book.best_bid(), Some(100.0));
    }

    #[test]
    fn feed_order_does_not_change_result() {
        let book = OrderBook::from_levels(
            &[(98.0, 3.0), (100.0, 1.0), (99.0, 2.0)],
            &[(103.0, 3.0), (102.0, 2.0), (101.0, 1.0)],
        );
        assert_eq!(book.bids[0].price, 100.0);
        assert_eq!(book.asks[0].price, 101.0);
        assert_eq!(totals(&book.asks), vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn totals_never_decrease() {
        let book = OrderBook::from_levels(
            &[(10.0, 0.5), (9.5, 0.0), (9.0, 4.0)],
            &[(10.5, 2.0), (11.0, 0.1)],
        );
        for side in [&book.bids, &book.asks] {
            assert!(side.windows(2).all(|w| w[0].total <= w[1].total));
        }
    }

    #[test]
    fn empty_book() {
        let book = OrderBook::empty();
        assert!(book.is_empty());
        assert_eq!(book.spread(), None);
        assert!(book.render().spread_text.is_none());
    }

    #[test]
    fn parse_depth_payload() {
        let root = json!({
            "lastUpdateId": 1,
            "bids": [["100.00", "1.0"], ["99.00", "2.0"]],
            "asks": [["101.00", "1.5"]]
        });
        let bids = parse_depth_levels(&root["bids"], "bids").unwrap();
        let asks = parse_depth_levels(&root["asks"], "asks").unwrap();
        assert_eq!(bids, vec![(100.0, 1.0), (99.0, 2.0)]);
        assert_eq!(asks, vec![(101.0, 1.5)]);
        assert!(parse_depth_levels(&root["missing"], "missing").is_err());
    }

    #[test]
    fn render_formats_rows_and_spread() {
        let book = OrderBook::from_levels(&[(42000.0, 1500.0)], &[(42000.5, 0.25)]);
        let d = book.render();
        assert_eq!(d.bids[0].price, "42000.00");
        assert_eq!(d.bids[0].quantity, "1.50K");
        assert_eq!(d.asks[0].total, "0.25");
        assert_eq!(d.spread_text.as_deref(), Some("0.500000"));
    }
}
