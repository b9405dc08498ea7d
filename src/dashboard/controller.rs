// =============================================================================
// Dashboard Controller — keeps the view in sync with the selected session
// =============================================================================
//
// Every session change runs, in order:
//   1. close the current kline feed
//   2. fetch a fresh candle snapshot
//   3. apply chart type and indicators to the surface
//   4. open a feed for the new (symbol, timeframe)
// Steps 2-4 run in a spawned load task tagged with the session generation it
// was issued for; each step re-checks that generation before touching the
// surface or the feed slot. Ticker and order-book polling restart only when
// the symbol changes.
// =============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::poller::{PollSettings, PollingScheduler, TimerCounters};
use super::policy;
use super::session::{SessionCell, SessionState, Transition};
use super::surface::RenderSurface;
use crate::binance::MarketDataSource;
use crate::market_data::{CandleSink, FeedConnector, FeedHandle};
use crate::types::{ChartType, Indicator};

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub candle_limit: u32,
    pub poll: PollSettings,
}

/// Chart configuration last pushed to the surface, used to diff indicator
/// changes into add / remove calls.
#[derive(Debug, Default)]
struct AppliedChart {
    chart_type: Option<ChartType>,
    indicators: BTreeSet<Indicator>,
}

/// State shared between the controller and its load tasks.
struct Shared {
    source: Arc<dyn MarketDataSource>,
    connector: Arc<dyn FeedConnector>,
    surface: Arc<dyn RenderSurface>,
    cell: Arc<SessionCell>,
    feed: Mutex<Option<FeedHandle>>,
    applied: Mutex<AppliedChart>,
    candle_limit: u32,
}

impl Shared {
    fn close_feed(&self) {
        if let Some(feed) = self.feed.lock().take() {
            info!(symbol = %feed.symbol(), interval = %feed.interval(), "closing kline feed");
            feed.close();
        }
    }

    fn install_feed(&self, feed: FeedHandle) {
        if let Some(previous) = self.feed.lock().replace(feed) {
            warn!(symbol = %previous.symbol(), "replacing a feed that was still open");
            previous.close();
        }
    }

    fn apply_chart_config(&self, state: &SessionState) {
        let mut applied = self.applied.lock();

        if applied.chart_type != Some(state.chart_type) {
            self.surface.set_chart_type(state.chart_type);
            applied.chart_type = Some(state.chart_type);
        }

        let wanted = state.indicators();
        for &removed in applied.indicators.difference(&wanted) {
            self.surface.remove_indicator(removed);
        }
        for &added in wanted.difference(&applied.indicators) {
            self.surface.add_indicator(added);
        }
        applied.indicators = wanted;
    }

    /// Stream sink that forwards candles only while `generation` is current.
    fn candle_sink(&self, generation: u64) -> CandleSink {
        let cell = self.cell.clone();
        let surface = self.surface.clone();
        Arc::new(move |candle| {
            if cell
                .if_current(generation, || surface.update_candle(&candle))
                .is_none()
            {
                debug!(timestamp = candle.timestamp, "candle from superseded feed dropped");
            }
        })
    }
}

/// Steps 2-4 for one session generation.
async fn load_session(shared: Arc<Shared>, state: SessionState, generation: u64) {
    let symbol = state.symbol.code;
    let timeframe = state.timeframe;

    let result = shared
        .source
        .get_klines(symbol, timeframe.interval(), shared.candle_limit)
        .await;
    let series = policy::candles_or_synthetic(result, symbol, timeframe, shared.candle_limit);

    let shown = shared.cell.if_current(generation, || {
        shared.surface.replace_candles(&series);
        shared.apply_chart_config(&state);
    });
    if shown.is_none() {
        debug!(symbol = %symbol, interval = %timeframe, generation, "stale candle snapshot discarded");
        return;
    }
    info!(
        symbol = %symbol,
        interval = %timeframe,
        candles = series.len(),
        origin = ?series.origin,
        "candle snapshot applied"
    );

    let sink = shared.candle_sink(generation);
    let result = shared.connector.open(symbol, timeframe.interval(), sink).await;
    let Some(feed) = policy::feed_or_none(result, symbol) else {
        return;
    };

    // If the session moved on, the closure is dropped unrun and the feed
    // with it.
    if shared
        .cell
        .if_current(generation, || shared.install_feed(feed))
        .is_none()
    {
        debug!(symbol = %symbol, interval = %timeframe, "feed for superseded session closed");
    }
}

/// Owns one dashboard session: the feed, the pollers and the surface.
pub struct DashboardController {
    shared: Arc<Shared>,
    poll: PollSettings,
    counters: Arc<TimerCounters>,
    poller: Option<PollingScheduler>,
    started: bool,
}

impl DashboardController {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        connector: Arc<dyn FeedConnector>,
        surface: Arc<dyn RenderSurface>,
        initial: SessionState,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                connector,
                surface,
                cell: Arc::new(SessionCell::new(initial)),
                feed: Mutex::new(None),
                applied: Mutex::new(AppliedChart::default()),
                candle_limit: settings.candle_limit,
            }),
            poll: settings.poll,
            counters: Arc::new(TimerCounters::default()),
            poller: None,
            started: false,
        }
    }

    /// Load the initial session and start polling. Must be called from
    /// within a Tokio runtime; calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.started || self.shared.cell.is_disposed() {
            return;
        }
        self.started = true;

        let state = self.shared.cell.state();
        let generation = self.shared.cell.generation();
        let poll_epoch = self.shared.cell.poll_epoch();
        info!(symbol = %state.symbol.code, interval = %state.timeframe, "dashboard session started");

        self.spawn_load(state.clone(), generation);
        self.restart_polling(&state, poll_epoch);
    }

    /// Apply a user transition. Returns the new state, or `None` when nothing
    /// changed, the controller was never started, or it has been disposed.
    pub fn apply(&mut self, transition: Transition) -> Option<SessionState> {
        if !self.started {
            warn!(?transition, "transition before start ignored");
            return None;
        }
        let committed = self.shared.cell.commit(&transition)?;
        info!(
            symbol = %committed.state.symbol.code,
            interval = %committed.state.timeframe,
            chart_type = %committed.state.chart_type,
            generation = committed.generation,
            "session changed"
        );

        self.shared.close_feed();
        self.spawn_load(committed.state.clone(), committed.generation);
        if committed.symbol_changed {
            // The commit already bumped the poll epoch, so no timer of the
            // previous symbol can repopulate the panels after this.
            self.shared.surface.clear_market_panels();
            self.restart_polling(&committed.state, committed.poll_epoch);
        }
        Some(committed.state)
    }

    /// End the session: close the feed, cancel both timers, release the
    /// surface. Later transitions are ignored.
    pub fn dispose(&mut self) {
        if !self.shared.cell.dispose() {
            return;
        }
        self.shared.close_feed();
        self.poller = None;
        self.shared.surface.release();
        info!("dashboard session disposed");
    }

    pub fn session(&self) -> SessionState {
        self.shared.cell.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.cell.is_disposed()
    }

    /// `(ticker timers, order-book timers)` currently alive.
    pub fn active_timers(&self) -> (usize, usize) {
        self.counters.active()
    }

    /// `(symbol, interval)` of the installed feed, if any.
    pub fn feed_target(&self) -> Option<(String, String)> {
        self.shared
            .feed
            .lock()
            .as_ref()
            .map(|f| (f.symbol().to_string(), f.interval().to_string()))
    }

    fn spawn_load(&self, state: SessionState, generation: u64) {
        tokio::spawn(load_session(self.shared.clone(), state, generation));
    }

    fn restart_polling(&mut self, state: &SessionState, poll_epoch: u64) {
        if let Some(previous) = &self.poller {
            debug!(from = %previous.symbol(), to = %state.symbol.code, "restarting polling");
        }
        // Assigning drops the previous scheduler, cancelling its timers.
        self.poller = Some(PollingScheduler::start(
            state.symbol.code,
            poll_epoch,
            &self.poll,
            self.shared.source.clone(),
            self.shared.surface.clone(),
            self.shared.cell.clone(),
            self.counters.clone(),
        ));
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.dispose();
    }
}
