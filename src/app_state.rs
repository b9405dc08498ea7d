// =============================================================================
// Central Application State — Aurora Dashboard
// =============================================================================
//
// Ties the dashboard controller to the browser-facing view hub and exposes
// what the REST and WebSocket handlers need. The controller is behind a
// parking_lot mutex; its methods never block on I/O, so the lock is never
// held across an await.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::api::view_hub::ViewHub;
use crate::binance::rate_limit::RateLimitSnapshot;
use crate::binance::BinanceClient;
use crate::dashboard::{DashboardController, SessionState, Transition};
use crate::market_data::BinanceFeedConnector;
use crate::runtime_config::DashConfig;

/// Central application state shared across handlers via `Arc<AppState>`.
pub struct AppState {
    pub config: DashConfig,
    pub view: Arc<ViewHub>,
    client: Arc<BinanceClient>,
    controller: Mutex<DashboardController>,
    start_time: Instant,
}

/// Result of applying a browser command.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub changed: bool,
    pub session: SessionState,
}

impl AppState {
    /// Wire the exchange client, stream connector and view hub into a new
    /// (not yet started) dashboard controller.
    pub fn new(config: DashConfig) -> anyhow::Result<Self> {
        let client = Arc::new(BinanceClient::new(
            config.rest_base.clone(),
            config.request_timeout(),
        )?);
        let connector = Arc::new(BinanceFeedConnector::new(config.ws_base.clone()));
        let settings = config.controller_settings();
        let view = Arc::new(ViewHub::new(settings.candle_limit as usize));

        let controller = DashboardController::new(
            client.clone(),
            connector,
            view.clone(),
            config.initial_session(),
            settings,
        );

        Ok(Self {
            config,
            view,
            client,
            controller: Mutex::new(controller),
            start_time: Instant::now(),
        })
    }

    /// Load the initial session and start polling.
    pub fn start(&self) {
        self.controller.lock().start();
    }

    pub fn apply(&self, transition: Transition) -> SessionUpdate {
        let mut controller = self.controller.lock();
        match controller.apply(transition) {
            Some(session) => SessionUpdate {
                changed: true,
                session,
            },
            None => SessionUpdate {
                changed: false,
                session: controller.session(),
            },
        }
    }

    pub fn session(&self) -> SessionState {
        self.controller.lock().session()
    }

    pub fn is_disposed(&self) -> bool {
        self.controller.lock().is_disposed()
    }

    pub fn active_timers(&self) -> (usize, usize) {
        self.controller.lock().active_timers()
    }

    pub fn feed_target(&self) -> Option<(String, String)> {
        self.controller.lock().feed_target()
    }

    pub fn rate_limit(&self) -> RateLimitSnapshot {
        self.client.rate_limit()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Tear down the session: feed, timers and view.
    pub fn shutdown(&self) {
        self.controller.lock().dispose();
    }
}
