//! BrowserPilot: goal-driven browser task orchestration.
//!
//! Callers submit either a single typed task or a free-text goal; goals are
//! decomposed into an ordered plan and executed against a bounded pool of
//! browser sessions, with outcomes aggregated into a textual summary. The
//! browser engine and the reasoning service stay behind narrow traits.

pub mod config;
pub mod metrics;
pub mod server;

pub use config::AppConfig;
pub use server::{build_router, AppState};
