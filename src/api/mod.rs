// =============================================================================
// Browser API — REST endpoints, WebSocket push and the view hub behind them
// =============================================================================

pub mod command;
pub mod rest;
pub mod view_hub;
pub mod ws;
