//! Concrete task executors. Search carries the interesting logic; the rest
//! are thin wrappers over the pool and the extraction/summarization
//! collaborators, plus placeholders for capabilities not yet wired up.

mod extract;
mod navigate;
mod placeholder;
mod search;
mod summarize;

pub use extract::ExtractContentExecutor;
pub use navigate::NavigateExecutor;
pub use placeholder::PlaceholderExecutor;
pub use search::{SearchEngine, SearchExecutor, SearchResult};
pub use summarize::SummarizeExecutor;

use std::sync::Arc;

use browserpilot_core_types::TaskType;
use browserpilot_extract::{ContentExtractor, PageSummarizer};
use browserpilot_session_pool::SessionPool;

use crate::dispatch::ExecutorSet;

/// Wire the full dispatch table: real executors for the implemented
/// capabilities and placeholders for the rest, so every task type resolves.
pub fn standard_executor_set(
    pool: Arc<SessionPool>,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<PageSummarizer>,
) -> ExecutorSet {
    ExecutorSet::new()
        .with(
            TaskType::Navigate,
            Arc::new(NavigateExecutor::new(pool.clone())),
        )
        .with(
            TaskType::Search,
            Arc::new(SearchExecutor::new(pool.clone(), summarizer.clone())),
        )
        .with(
            TaskType::ExtractContent,
            Arc::new(ExtractContentExecutor::new(pool.clone(), extractor.clone())),
        )
        .with(
            TaskType::Summarize,
            Arc::new(SummarizeExecutor::new(pool, extractor, summarizer)),
        )
        .with(
            TaskType::BookHotel,
            Arc::new(PlaceholderExecutor::new(TaskType::BookHotel)),
        )
        .with(
            TaskType::FindProduct,
            Arc::new(PlaceholderExecutor::new(TaskType::FindProduct)),
        )
        .with(
            TaskType::SendEmail,
            Arc::new(PlaceholderExecutor::new(TaskType::SendEmail)),
        )
}
