//! HTTP surface: a thin axum layer over the orchestration core.

mod router;
mod state;

pub use router::build_router;
pub use state::AppState;
