// =============================================================================
// Polling Scheduler — ticker and order-book refresh timers
// =============================================================================
//
// Two independent fixed-period timers per active symbol. Each tick does one
// fetch-and-replace. A timer awaits its own fetch before taking the next
// tick (missed ticks are skipped), so one timer never has two requests in
// flight. Timers are owned through `TimerHandle`s; dropping a handle aborts
// the task, including any request it is awaiting.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::policy;
use super::session::SessionCell;
use super::surface::RenderSurface;
use crate::binance::MarketDataSource;

/// Shortest period a timer may run at.
const MIN_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Ticker,
    OrderBook,
}

/// Live timer counts, shared by every handle a controller creates.
#[derive(Debug, Default)]
pub struct TimerCounters {
    ticker: AtomicUsize,
    book: AtomicUsize,
}

impl TimerCounters {
    fn slot(&self, kind: TimerKind) -> &AtomicUsize {
        match kind {
            TimerKind::Ticker => &self.ticker,
            TimerKind::OrderBook => &self.book,
        }
    }

    /// `(ticker timers, order-book timers)` currently alive.
    pub fn active(&self) -> (usize, usize) {
        (
            self.ticker.load(Ordering::SeqCst),
            self.book.load(Ordering::SeqCst),
        )
    }
}

/// Owned handle to one running timer task.
pub struct TimerHandle {
    kind: TimerKind,
    task: JoinHandle<()>,
    counters: Arc<TimerCounters>,
}

impl TimerHandle {
    fn new(kind: TimerKind, task: JoinHandle<()>, counters: Arc<TimerCounters>) -> Self {
        counters.slot(kind).fetch_add(1, Ordering::SeqCst);
        Self {
            kind,
            task,
            counters,
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.counters.slot(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub ticker_period: Duration,
    pub book_period: Duration,
    pub book_depth: u32,
}

/// Everything a timer task needs, captured at start.
#[derive(Clone)]
struct PollContext {
    symbol: String,
    poll_epoch: u64,
    source: Arc<dyn MarketDataSource>,
    surface: Arc<dyn RenderSurface>,
    cell: Arc<SessionCell>,
}

/// The pair of timers for one symbol.
pub struct PollingScheduler {
    symbol: String,
    _ticker: TimerHandle,
    _book: TimerHandle,
}

impl PollingScheduler {
    /// Start both timers for `symbol`. Results are applied only while
    /// `poll_epoch` is current.
    pub fn start(
        symbol: &str,
        poll_epoch: u64,
        settings: &PollSettings,
        source: Arc<dyn MarketDataSource>,
        surface: Arc<dyn RenderSurface>,
        cell: Arc<SessionCell>,
        counters: Arc<TimerCounters>,
    ) -> Self {
        let ctx = PollContext {
            symbol: symbol.to_string(),
            poll_epoch,
            source,
            surface,
            cell,
        };

        let ticker_task = tokio::spawn(run_ticker_timer(
            ctx.clone(),
            settings.ticker_period.max(MIN_PERIOD),
        ));
        let book_task = tokio::spawn(run_book_timer(
            ctx,
            settings.book_period.max(MIN_PERIOD),
            settings.book_depth,
        ));

        info!(
            symbol = %symbol,
            ticker_ms = settings.ticker_period.as_millis() as u64,
            book_ms = settings.book_period.as_millis() as u64,
            "polling started"
        );

        Self {
            symbol: symbol.to_string(),
            _ticker: TimerHandle::new(TimerKind::Ticker, ticker_task, counters.clone()),
            _book: TimerHandle::new(TimerKind::OrderBook, book_task, counters),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        debug!(symbol = %self.symbol, "polling stopped");
    }
}

fn timer(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run_ticker_timer(ctx: PollContext, period: Duration) {
    let mut interval = timer(period);
    loop {
        interval.tick().await;
        let result = ctx.source.get_ticker(&ctx.symbol).await;
        let Some(ticker) = policy::ticker_or_none(result, &ctx.symbol) else {
            continue;
        };
        let applied = ctx
            .cell
            .if_polling(ctx.poll_epoch, || ctx.surface.show_ticker(&ctx.symbol, &ticker));
        if applied.is_none() {
            debug!(symbol = %ctx.symbol, "ticker result for inactive symbol discarded");
            return;
        }
    }
}

async fn run_book_timer(ctx: PollContext, period: Duration, depth: u32) {
    let mut interval = timer(period);
    loop {
        interval.tick().await;
        let result = ctx.source.get_order_book(&ctx.symbol, depth).await;
        let book = policy::book_or_empty(result, &ctx.symbol);
        let applied = ctx
            .cell
            .if_polling(ctx.poll_epoch, || ctx.surface.show_order_book(&ctx.symbol, &book));
        if applied.is_none() {
            debug!(symbol = %ctx.symbol, "order book for inactive symbol discarded");
            return;
        }
    }
}
