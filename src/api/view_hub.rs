// =============================================================================
// View Hub — the render surface the browser subscribes to
// =============================================================================
//
// Holds the latest view model (candles, chart config, ticker, order book)
// and broadcasts every change as a `ViewEvent`. Mutations publish while the
// write lock is held, and subscribers take their snapshot under the read
// lock, so a new subscriber never misses or double-applies an event.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::dashboard::RenderSurface;
use crate::market_data::{
    Candle, CandleMerge, CandleSeries, OrderBook, OrderBookDisplay, TickerDisplay, TickerSnapshot,
};
use crate::types::{ChartType, Indicator, Pane};

/// Events buffered per subscriber before it is considered lagging.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct SymbolTicker {
    pub symbol: String,
    pub ticker: TickerDisplay,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolBook {
    pub symbol: String,
    pub book: OrderBookDisplay,
}

/// Everything the page needs to draw itself from scratch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub version: u64,
    pub chart_type: Option<ChartType>,
    pub indicators: BTreeSet<Indicator>,
    pub candles: Option<CandleSeries>,
    pub ticker: Option<SymbolTicker>,
    pub order_book: Option<SymbolBook>,
    pub released: bool,
}

/// Incremental change pushed to browser clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    Snapshot { view: DashboardView },
    Candles { series: CandleSeries },
    CandleUpdate { candle: Candle },
    ChartType { chart_type: ChartType },
    IndicatorAdded { indicator: Indicator, pane: Pane },
    IndicatorRemoved { indicator: Indicator, pane: Pane },
    Ticker(SymbolTicker),
    OrderBook(SymbolBook),
    MarketPanelsCleared,
    Released,
}

pub struct ViewHub {
    view: RwLock<DashboardView>,
    version: AtomicU64,
    events: broadcast::Sender<ViewEvent>,
    max_candles: usize,
}

impl ViewHub {
    /// `max_candles` bounds how far streamed appends may grow the series.
    pub fn new(max_candles: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            view: RwLock::new(DashboardView::default()),
            version: AtomicU64::new(0),
            events,
            max_candles,
        }
    }

    /// Current view plus a receiver for every event after it.
    pub fn subscribe(&self) -> (DashboardView, broadcast::Receiver<ViewEvent>) {
        let view = self.view.read();
        (view.clone(), self.events.subscribe())
    }

    pub fn snapshot(&self) -> DashboardView {
        self.view.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Mutate the view and publish `event` atomically with respect to
    /// subscribers.
    fn publish(&self, mutate: impl FnOnce(&mut DashboardView) -> Option<ViewEvent>) {
        let mut view = self.view.write();
        if let Some(event) = mutate(&mut view) {
            view.version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
            // No receivers is fine; the view is still updated.
            let _ = self.events.send(event);
        }
    }
}

impl RenderSurface for ViewHub {
    fn replace_candles(&self, series: &CandleSeries) {
        self.publish(|view| {
            view.candles = Some(series.clone());
            Some(ViewEvent::Candles {
                series: series.clone(),
            })
        });
    }

    fn update_candle(&self, candle: &Candle) {
        let max = self.max_candles;
        self.publish(|view| {
            let series = view.candles.as_mut()?;
            match series.apply_update(*candle, max) {
                CandleMerge::Ignored => {
                    debug!(timestamp = candle.timestamp, "out-of-order candle ignored");
                    None
                }
                CandleMerge::Replaced | CandleMerge::Appended => {
                    Some(ViewEvent::CandleUpdate { candle: *candle })
                }
            }
        });
    }

    fn set_chart_type(&self, chart_type: ChartType) {
        self.publish(|view| {
            view.chart_type = Some(chart_type);
            Some(ViewEvent::ChartType { chart_type })
        });
    }

    fn add_indicator(&self, indicator: Indicator) {
        self.publish(|view| {
            view.indicators.insert(indicator).then(|| ViewEvent::IndicatorAdded {
                indicator,
                pane: indicator.pane(),
            })
        });
    }

    fn remove_indicator(&self, indicator: Indicator) {
        self.publish(|view| {
            view.indicators.remove(&indicator).then(|| ViewEvent::IndicatorRemoved {
                indicator,
                pane: indicator.pane(),
            })
        });
    }

    fn show_ticker(&self, symbol: &str, ticker: &TickerSnapshot) {
        let entry = SymbolTicker {
            symbol: symbol.to_string(),
            ticker: ticker.render(),
        };
        self.publish(|view| {
            view.ticker = Some(entry.clone());
            Some(ViewEvent::Ticker(entry))
        });
    }

    fn show_order_book(&self, symbol: &str, book: &OrderBook) {
        let entry = SymbolBook {
            symbol: symbol.to_string(),
            book: book.render(),
        };
        self.publish(|view| {
            view.order_book = Some(entry.clone());
            Some(ViewEvent::OrderBook(entry))
        });
    }

    fn clear_market_panels(&self) {
        self.publish(|view| {
            view.ticker = None;
            view.order_book = None;
            Some(ViewEvent::MarketPanelsCleared)
        });
    }

    fn release(&self) {
        self.publish(|view| {
            *view = DashboardView {
                released: true,
                ..DashboardView::default()
            };
            Some(ViewEvent::Released)
        });
    }
}
