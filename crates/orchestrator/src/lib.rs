//! Task orchestration core.
//!
//! The orchestrator owns the only shared mutable state in the pipeline: the
//! task-id to in-flight-execution map (at-most-one concurrent execution per
//! task id) and the bounded per-user result history. Executors are resolved
//! through a closed dispatch table so every task type is accounted for at
//! compile time.

mod dispatch;
mod executor;
pub mod executors;
mod history;
mod inflight;
pub mod metrics;
mod model;
mod orchestrator;

pub use dispatch::ExecutorSet;
pub use executor::TaskExecutor;
pub use history::HistoryStore;
pub use model::{ExecutionContext, ExecutorConfig};
pub use orchestrator::TaskOrchestrator;
