use std::sync::Arc;
use std::time::Instant;

use browserpilot_core_types::{Goal, GoalStatus, TaskPriority, TaskResult};
use browserpilot_orchestrator::{ExecutionContext, TaskOrchestrator};
use browserpilot_reasoning::{ChatMessage, ChatRequest, ReasoningClient};
use tracing::{info, warn};

use crate::model::{GoalOptions, GoalOutcome};
use crate::translator::GoalTranslator;

const NARRATION_SYSTEM_PROMPT: &str = "You summarize the outcome of automated \
browser tasks for the user who requested them. Write 2-4 plain sentences: \
what was attempted, what succeeded, what failed. No markdown, no preamble.";

/// Drives a goal end to end: analysis, strictly sequential task execution
/// with critical fail-fast, then a narrated summary.
pub struct GoalExecutor {
    translator: GoalTranslator,
    orchestrator: Arc<TaskOrchestrator>,
    reasoning: Arc<dyn ReasoningClient>,
}

impl GoalExecutor {
    pub fn new(
        translator: GoalTranslator,
        orchestrator: Arc<TaskOrchestrator>,
        reasoning: Arc<dyn ReasoningClient>,
    ) -> Self {
        Self {
            translator,
            orchestrator,
            reasoning,
        }
    }

    pub async fn execute(
        &self,
        goal: &mut Goal,
        ctx: &ExecutionContext,
        options: &GoalOptions,
    ) -> GoalOutcome {
        let started = Instant::now();

        goal.set_status(GoalStatus::Analyzing);
        let analysis = self
            .translator
            .analyze(goal, options.context.as_ref(), &options.analyze)
            .await;
        goal.intent = Some(analysis.intent.clone());
        goal.entities = analysis.entities.clone();

        let tasks = self.translator.tasks_from_plan(goal, &analysis.plan);
        if tasks.is_empty() {
            warn!(goal = %goal.id, degraded = analysis.degraded, "analysis produced no tasks");
            goal.set_status(GoalStatus::Failed);
            return GoalOutcome {
                goal_id: goal.id.clone(),
                success: false,
                tasks: Vec::new(),
                summary: Self::fallback_summary(&[]),
                execution_time_ms: started.elapsed().as_millis() as u64,
                degraded_analysis: analysis.degraded,
            };
        }

        goal.set_status(GoalStatus::RunningTasks);
        let mut results: Vec<TaskResult> = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let result = self.orchestrator.execute_task(task, ctx).await;
            let failed = !result.success;
            results.push(result);
            if failed && task.priority == TaskPriority::Critical {
                warn!(goal = %goal.id, task = %task.id, "critical task failed; halting goal");
                break;
            }
        }

        let success = results.iter().any(|r| r.success);

        goal.set_status(GoalStatus::Summarizing);
        let summary = if options.narrate {
            self.narrate(goal, &results, &analysis.recommendations).await
        } else {
            Self::fallback_summary(&results)
        };

        goal.set_status(if success {
            GoalStatus::Done
        } else {
            GoalStatus::Failed
        });
        info!(
            goal = %goal.id,
            success,
            executed = results.len(),
            planned = tasks.len(),
            "goal finished"
        );

        GoalOutcome {
            goal_id: goal.id.clone(),
            success,
            tasks: results,
            summary,
            execution_time_ms: started.elapsed().as_millis() as u64,
            degraded_analysis: analysis.degraded,
        }
    }

    /// Narration never blocks goal completion: any failure substitutes the
    /// deterministic completion summary.
    async fn narrate(
        &self,
        goal: &Goal,
        results: &[TaskResult],
        recommendations: &[String],
    ) -> String {
        let mut report = format!("Goal: {}\n\nTask outcomes:\n", goal.text);
        for result in results {
            report.push_str(&format!(
                "- {} ({}): {}\n",
                result.metadata.executor,
                if result.success { "ok" } else { "failed" },
                result
                    .error
                    .as_deref()
                    .unwrap_or("completed")
            ));
        }
        if !recommendations.is_empty() {
            report.push_str(&format!("\nSuggestions: {}\n", recommendations.join("; ")));
        }

        let request = ChatRequest::new(NARRATION_SYSTEM_PROMPT, vec![ChatMessage::user(report)]);
        match self.reasoning.complete(request).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(goal = %goal.id, "narration failed, using fallback summary: {}", err);
                Self::fallback_summary(results)
            }
        }
    }

    fn fallback_summary(results: &[TaskResult]) -> String {
        let succeeded = results.iter().filter(|r| r.success).count();
        format!(
            "{} out of {} tasks completed successfully",
            succeeded,
            results.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use browserpilot_core_types::{PilotError, Task, TaskType, UserId};
    use browserpilot_orchestrator::{ExecutorSet, TaskExecutor};
    use browserpilot_reasoning::MockReasoningClient;
    use serde_json::{json, Value};

    /// Succeeds for its type unless the step description asks it to fail.
    struct StepExecutor {
        task_type: TaskType,
    }

    #[async_trait]
    impl TaskExecutor for StepExecutor {
        fn name(&self) -> &str {
            self.task_type.as_str()
        }

        fn can_handle(&self, task: &Task) -> bool {
            task.task_type == self.task_type
        }

        async fn perform(
            &self,
            task: &Task,
            _ctx: &ExecutionContext,
        ) -> Result<Value, PilotError> {
            let description = task
                .payload
                .options
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if description.contains("fail") {
                return Err(PilotError::Validation("scripted step failure".into()));
            }
            Ok(json!({"step": task.payload.options.get("step")}))
        }
    }

    fn executor_set() -> ExecutorSet {
        ExecutorSet::new()
            .with(
                TaskType::Navigate,
                Arc::new(StepExecutor {
                    task_type: TaskType::Navigate,
                }),
            )
            .with(
                TaskType::Search,
                Arc::new(StepExecutor {
                    task_type: TaskType::Search,
                }),
            )
            .with(
                TaskType::ExtractContent,
                Arc::new(StepExecutor {
                    task_type: TaskType::ExtractContent,
                }),
            )
    }

    fn plan_reply(second_step: &str) -> String {
        format!(
            r#"{{
  "intent": {{"type": "search", "confidence": 0.9, "parameters": {{}}}},
  "entities": [],
  "actionPlan": [
    {{"step": 1, "action": "navigate", "description": "open the site", "url": "https://travel.test"}},
    {{"step": 2, "action": "search", "description": "{second_step}"}},
    {{"step": 3, "action": "extract", "description": "collect results"}}
  ],
  "recommendations": []
}}"#
        )
    }

    fn engine_with(reply: String) -> GoalExecutor {
        let client = Arc::new(MockReasoningClient::with_reply(reply));
        GoalExecutor::new(
            GoalTranslator::new(client.clone()),
            Arc::new(TaskOrchestrator::new(executor_set())),
            client,
        )
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(UserId::from("u1"), "conv-1")
    }

    fn options_without_narration() -> GoalOptions {
        GoalOptions {
            narrate: false,
            ..GoalOptions::default()
        }
    }

    #[tokio::test]
    async fn critical_failure_halts_remaining_steps() {
        let engine = engine_with(plan_reply("this step must fail"));
        let mut goal = Goal::new(UserId::from("u1"), "find hotels")
            .with_priority(TaskPriority::Critical);

        let outcome = engine
            .execute(&mut goal, &ctx(), &options_without_narration())
            .await;

        // Step 1 succeeds, step 2 fails critically, step 3 never runs.
        assert_eq!(outcome.tasks.len(), 2);
        assert!(outcome.success, "one completed step still counts");
        assert_eq!(goal.status, GoalStatus::Done);
    }

    #[tokio::test]
    async fn first_step_critical_failure_yields_one_result() {
        let reply = plan_reply("x").replace("open the site", "open the site and fail");
        let engine = engine_with(reply);
        let mut goal =
            Goal::new(UserId::from("u1"), "find hotels").with_priority(TaskPriority::Critical);

        let outcome = engine
            .execute(&mut goal, &ctx(), &options_without_narration())
            .await;

        assert_eq!(outcome.tasks.len(), 1);
        assert!(!outcome.success);
        assert_eq!(goal.status, GoalStatus::Failed);
    }

    #[tokio::test]
    async fn non_critical_failures_continue_to_the_end() {
        let engine = engine_with(plan_reply("this step must fail"));
        let mut goal = Goal::new(UserId::from("u1"), "find hotels");

        let outcome = engine
            .execute(&mut goal, &ctx(), &options_without_narration())
            .await;

        assert_eq!(outcome.tasks.len(), 3);
        assert!(outcome.success);
        assert_eq!(outcome.summary, "2 out of 3 tasks completed successfully");
        assert_eq!(goal.status, GoalStatus::Done);
    }

    #[tokio::test]
    async fn degraded_analysis_fails_goal_with_zero_tasks() {
        let client = Arc::new(MockReasoningClient::failing());
        let engine = GoalExecutor::new(
            GoalTranslator::new(client.clone()),
            Arc::new(TaskOrchestrator::new(executor_set())),
            client,
        );
        let mut goal = Goal::new(UserId::from("u1"), "find hotels");

        let outcome = engine
            .execute(&mut goal, &ctx(), &GoalOptions::default())
            .await;

        assert!(!outcome.success);
        assert!(outcome.tasks.is_empty());
        assert!(outcome.degraded_analysis);
        assert_eq!(goal.status, GoalStatus::Failed);
    }

    #[tokio::test]
    async fn narration_failure_falls_back_to_deterministic_summary() {
        let translator_client = Arc::new(MockReasoningClient::with_replies([plan_reply("x")]));
        // Same client: the scripted reply feeds analysis, then the narration
        // call gets the echo default which is still usable text. To force the
        // fallback we use a failing narrator instead.
        let engine = GoalExecutor::new(
            GoalTranslator::new(translator_client),
            Arc::new(TaskOrchestrator::new(executor_set())),
            Arc::new(MockReasoningClient::failing()),
        );
        let mut goal = Goal::new(UserId::from("u1"), "find hotels");

        let outcome = engine.execute(&mut goal, &ctx(), &GoalOptions::default()).await;
        assert_eq!(outcome.summary, "3 out of 3 tasks completed successfully");
        assert!(outcome.success);
    }
}
