//! Goal decomposition and execution.
//!
//! A free-text goal is analyzed into an intent plus an ordered action plan,
//! the plan is synthesized into typed tasks, and the tasks run strictly
//! sequentially through the orchestrator. Analysis degrades to a safe default
//! rather than failing the pipeline, and the degradation is surfaced.

mod executor;
mod model;
mod translator;

pub use executor::GoalExecutor;
pub use model::{AnalyzeOptions, GoalAnalysis, GoalContext, GoalOptions, GoalOutcome};
pub use translator::GoalTranslator;
