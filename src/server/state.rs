use std::sync::Arc;
use std::time::Instant;

use browserpilot_extract::{HeuristicExtractor, PageSummarizer, SummarizerConfig};
use browserpilot_goal_engine::{GoalExecutor, GoalTranslator};
use browserpilot_orchestrator::executors::standard_executor_set;
use browserpilot_orchestrator::TaskOrchestrator;
use browserpilot_reasoning::ReasoningClient;
use browserpilot_session_pool::{BrowserEngine, SessionPool};

use crate::config::AppConfig;

/// Shared service graph behind the HTTP surface. All components are
/// constructor-injected; nothing global beyond the metrics registry.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<SessionPool>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub goal_executor: Arc<GoalExecutor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn build(
        config: &AppConfig,
        engine: Arc<dyn BrowserEngine>,
        reasoning: Arc<dyn ReasoningClient>,
    ) -> Self {
        let pool = Arc::new(SessionPool::new(engine, config.pool_config()));
        let extractor = Arc::new(HeuristicExtractor::new());
        let summarizer = Arc::new(PageSummarizer::new(
            reasoning.clone(),
            SummarizerConfig {
                model: config.reasoning.model.clone(),
                ..SummarizerConfig::default()
            },
        ));

        let executors = standard_executor_set(pool.clone(), extractor, summarizer);
        let orchestrator = Arc::new(TaskOrchestrator::new(executors));
        let goal_executor = Arc::new(GoalExecutor::new(
            GoalTranslator::new(reasoning.clone()),
            orchestrator.clone(),
            reasoning,
        ));

        Self {
            pool,
            orchestrator,
            goal_executor,
            started_at: Instant::now(),
        }
    }
}
