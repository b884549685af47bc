use browserpilot_core_types::{
    ActionPlanStep, ExtractedEntity, GoalId, Intent, TaskResult,
};
use serde::Serialize;

/// Contextual snapshot sent alongside the goal text so analysis can ground
/// itself in what the user is currently looking at.
#[derive(Clone, Debug, Default)]
pub struct GoalContext {
    pub current_page_title: Option<String>,
    pub current_page_url: Option<String>,
    pub recent_page_titles: Vec<String>,
    pub history: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AnalyzeOptions {
    /// Override the reasoning model for this analysis.
    pub model: Option<String>,
}

/// Structured result of goal analysis. `degraded` is true when the reasoning
/// reply could not be used and the safe default was substituted.
#[derive(Clone, Debug, Serialize)]
pub struct GoalAnalysis {
    pub intent: Intent,
    pub entities: Vec<ExtractedEntity>,
    pub plan: Vec<ActionPlanStep>,
    pub recommendations: Vec<String>,
    pub degraded: bool,
}

#[derive(Clone, Debug)]
pub struct GoalOptions {
    pub context: Option<GoalContext>,
    /// When false, the deterministic completion summary is used without
    /// calling the reasoning service.
    pub narrate: bool,
    pub analyze: AnalyzeOptions,
}

impl Default for GoalOptions {
    fn default() -> Self {
        Self {
            context: None,
            narrate: true,
            analyze: AnalyzeOptions::default(),
        }
    }
}

/// Final goal outcome surfaced to the caller. Partial success counts as goal
/// success: at least one completed task makes the goal worthwhile.
#[derive(Clone, Debug, Serialize)]
pub struct GoalOutcome {
    pub goal_id: GoalId,
    pub success: bool,
    pub tasks: Vec<TaskResult>,
    pub summary: String,
    pub execution_time_ms: u64,
    pub degraded_analysis: bool,
}
