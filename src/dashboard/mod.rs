// =============================================================================
// Dashboard — session state, synchronisation and graceful degradation
// =============================================================================

pub mod controller;
pub mod policy;
pub mod poller;
pub mod session;
pub mod surface;

pub use controller::{ControllerSettings, DashboardController};
pub use poller::PollSettings;
pub use session::{SessionState, Transition};
pub use surface::RenderSurface;
