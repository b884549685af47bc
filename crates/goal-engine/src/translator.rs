use std::sync::Arc;

use browserpilot_core_types::{
    ActionPlanStep, ExtractedEntity, Goal, Intent, Task, TaskPayload, TaskType,
};
use browserpilot_reasoning::{ChatMessage, ChatRequest, ReasoningClient};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{AnalyzeOptions, GoalAnalysis, GoalContext};

pub const ANALYSIS_PROMPT_VERSION: &str = "v1";

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a browser task planner (prompt v1).
Given a user goal, reply with ONE JSON object and nothing else, shaped as:
{
  "intent": {"type": "<search|navigate|extract|summarize|other>", "confidence": 0.0-1.0, "parameters": {}},
  "entities": [{"type": "<kind>", "value": "<text>", "confidence": 0.0-1.0}],
  "actionPlan": [{"step": 1, "action": "<navigate|search|extract|summarize>", "description": "<what to do>", "url": "<optional>", "selector": "<optional>"}],
  "recommendations": ["<short suggestion>"]
}
Keep the plan short and ordered. Every step must be executable in a browser."#;

/// Default intent when analysis fails or the reply cannot be parsed.
const DEGRADED_INTENT: &str = "search";
const DEGRADED_CONFIDENCE: f64 = 0.5;

/// Turns goal text into an intent, entities, and an ordered action plan via
/// the reasoning collaborator. Never fails: an unusable reply degrades to a
/// low-confidence default with `degraded` set.
pub struct GoalTranslator {
    reasoning: Arc<dyn ReasoningClient>,
}

impl GoalTranslator {
    pub fn new(reasoning: Arc<dyn ReasoningClient>) -> Self {
        Self { reasoning }
    }

    pub async fn analyze(
        &self,
        goal: &Goal,
        context: Option<&GoalContext>,
        options: &AnalyzeOptions,
    ) -> GoalAnalysis {
        let mut request = ChatRequest::new(
            ANALYSIS_SYSTEM_PROMPT,
            vec![ChatMessage::user(Self::render_goal(goal, context))],
        );
        if let Some(model) = &options.model {
            request = request.with_model(model.clone());
        }

        let reply = match self.reasoning.complete(request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(goal = %goal.id, "goal analysis call failed, degrading: {}", err);
                return Self::degraded_analysis();
            }
        };

        match Self::parse_reply(&reply) {
            Some(analysis) => analysis,
            None => {
                warn!(goal = %goal.id, "unparseable analysis reply, degrading");
                Self::degraded_analysis()
            }
        }
    }

    /// Synthesize one task per plan step. The verb lookup is closed; unknown
    /// verbs fall back to navigate. Step ordinal and plan length ride along in
    /// the task options for executor-side context.
    pub fn tasks_from_plan(&self, goal: &Goal, plan: &[ActionPlanStep]) -> Vec<Task> {
        let total = plan.len();
        plan.iter()
            .map(|step| {
                let task_type = match step.action.to_ascii_lowercase().as_str() {
                    "navigate" => TaskType::Navigate,
                    "search" => TaskType::Search,
                    "extract" => TaskType::ExtractContent,
                    "summarize" => TaskType::Summarize,
                    _ => TaskType::Navigate,
                };

                let mut payload = TaskPayload {
                    url: step.url.clone(),
                    ..TaskPayload::default()
                };
                if task_type == TaskType::Search {
                    payload.query = Some(step.description.clone());
                }
                if let Some(selector) = &step.selector {
                    payload
                        .options
                        .insert("selector".into(), Value::String(selector.clone()));
                }
                payload
                    .options
                    .insert("step".into(), Value::from(step.step));
                payload
                    .options
                    .insert("total_steps".into(), Value::from(total as u64));
                payload.options.insert(
                    "description".into(),
                    Value::String(step.description.clone()),
                );

                Task::new(task_type, goal.user_id.clone(), payload)
                    .with_priority(goal.priority)
                    .with_goal(goal.id.clone())
            })
            .collect()
    }

    fn render_goal(goal: &Goal, context: Option<&GoalContext>) -> String {
        let mut text = format!("Goal: {}\nPriority: {:?}", goal.text, goal.priority);
        if let Some(ctx) = context {
            if let Some(title) = &ctx.current_page_title {
                text.push_str(&format!("\nCurrent page title: {title}"));
            }
            if let Some(url) = &ctx.current_page_url {
                text.push_str(&format!("\nCurrent page URL: {url}"));
            }
            if !ctx.recent_page_titles.is_empty() {
                text.push_str(&format!(
                    "\nRecently visited: {}",
                    ctx.recent_page_titles.join("; ")
                ));
            }
            if !ctx.history.is_empty() {
                text.push_str(&format!("\nEarlier activity: {}", ctx.history.join("; ")));
            }
        }
        text
    }

    fn degraded_analysis() -> GoalAnalysis {
        GoalAnalysis {
            intent: Intent::new(DEGRADED_INTENT, DEGRADED_CONFIDENCE),
            entities: Vec::new(),
            plan: Vec::new(),
            recommendations: Vec::new(),
            degraded: true,
        }
    }

    fn parse_reply(reply: &str) -> Option<GoalAnalysis> {
        let block = first_json_block(reply)?;
        let value: Value = serde_json::from_str(block).ok()?;

        let intent_value = value.get("intent")?;
        let intent_kind = intent_value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(DEGRADED_INTENT);
        let confidence = intent_value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(DEGRADED_CONFIDENCE);
        let mut intent = Intent::new(intent_kind, confidence);
        if let Some(params) = intent_value.get("parameters").and_then(Value::as_object) {
            intent.parameters = params.clone().into_iter().collect();
        }

        let entities = value
            .get("entities")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(ExtractedEntity {
                            kind: item.get("type")?.as_str()?.to_string(),
                            value: item.get("value")?.as_str()?.to_string(),
                            confidence: item
                                .get("confidence")
                                .and_then(Value::as_f64)
                                .unwrap_or(0.5),
                            span: None,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let plan: Vec<ActionPlanStep> = value
            .get("actionPlan")
            .and_then(Value::as_array)
            .map(|steps| {
                steps
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, step)| {
                        Some(ActionPlanStep {
                            step: step
                                .get("step")
                                .and_then(Value::as_u64)
                                .unwrap_or(idx as u64 + 1) as u32,
                            action: step.get("action")?.as_str()?.to_string(),
                            description: step
                                .get("description")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            url: step
                                .get("url")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            selector: step
                                .get("selector")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let recommendations = value
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            intent = intent.kind.as_str(),
            steps = plan.len(),
            "analysis reply parsed"
        );
        Some(GoalAnalysis {
            intent,
            entities,
            plan,
            recommendations,
            degraded: false,
        })
    }
}

/// Extract the first balanced `{...}` block, respecting strings and escapes.
/// Reasoning replies routinely wrap JSON in prose or code fences.
fn first_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use browserpilot_core_types::{TaskPriority, UserId};
    use browserpilot_reasoning::MockReasoningClient;

    fn goal() -> Goal {
        Goal::new(UserId::from("u1"), "find hotels in Paris for next weekend")
    }

    const PLAN_REPLY: &str = r#"Here is the plan you asked for:
{
  "intent": {"type": "search", "confidence": 0.9, "parameters": {"topic": "hotels"}},
  "entities": [{"type": "location", "value": "Paris", "confidence": 0.95}],
  "actionPlan": [
    {"step": 1, "action": "navigate", "description": "Open a travel site", "url": "https://travel.test"},
    {"step": 2, "action": "search", "description": "hotels in Paris next weekend"},
    {"step": 3, "action": "extract", "description": "Collect hotel names and prices"}
  ],
  "recommendations": ["Filter by rating"]
}
Let me know if you need anything else."#;

    #[test]
    fn json_block_is_extracted_from_prose() {
        let block = first_json_block("noise {\"a\": {\"b\": \"}\"}} trailing").unwrap();
        assert_eq!(block, "{\"a\": {\"b\": \"}\"}}");
        assert!(first_json_block("no json here").is_none());
        assert!(first_json_block("{unbalanced").is_none());
    }

    #[tokio::test]
    async fn well_formed_reply_parses_fully() {
        let translator =
            GoalTranslator::new(Arc::new(MockReasoningClient::with_reply(PLAN_REPLY)));
        let analysis = translator
            .analyze(&goal(), None, &AnalyzeOptions::default())
            .await;
        assert!(!analysis.degraded);
        assert_eq!(analysis.intent.kind, "search");
        assert_eq!(analysis.entities.len(), 1);
        assert_eq!(analysis.plan.len(), 3);
        assert_eq!(analysis.recommendations, vec!["Filter by rating"]);
    }

    #[tokio::test]
    async fn unparseable_reply_degrades_with_flag() {
        let translator = GoalTranslator::new(Arc::new(MockReasoningClient::with_reply(
            "sorry, I cannot help with that",
        )));
        let analysis = translator
            .analyze(&goal(), None, &AnalyzeOptions::default())
            .await;
        assert!(analysis.degraded);
        assert_eq!(analysis.intent.kind, "search");
        assert_eq!(analysis.intent.confidence, 0.5);
        assert!(analysis.plan.is_empty());
    }

    #[tokio::test]
    async fn reasoning_failure_degrades_with_flag() {
        let translator = GoalTranslator::new(Arc::new(MockReasoningClient::failing()));
        let analysis = translator
            .analyze(&goal(), None, &AnalyzeOptions::default())
            .await;
        assert!(analysis.degraded);
    }

    #[tokio::test]
    async fn plan_steps_map_through_the_closed_verb_lookup() {
        let translator =
            GoalTranslator::new(Arc::new(MockReasoningClient::with_reply(PLAN_REPLY)));
        let goal = goal().with_priority(TaskPriority::High);
        let analysis = translator
            .analyze(&goal, None, &AnalyzeOptions::default())
            .await;
        let tasks = translator.tasks_from_plan(&goal, &analysis.plan);

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].task_type, TaskType::Navigate);
        assert_eq!(tasks[0].payload.url.as_deref(), Some("https://travel.test"));
        assert_eq!(tasks[1].task_type, TaskType::Search);
        assert_eq!(
            tasks[1].payload.query.as_deref(),
            Some("hotels in Paris next weekend")
        );
        assert_eq!(tasks[2].task_type, TaskType::ExtractContent);
        for (idx, task) in tasks.iter().enumerate() {
            assert_eq!(task.priority, TaskPriority::High);
            assert_eq!(task.goal_id.as_ref(), Some(&goal.id));
            assert_eq!(task.payload.options["step"], Value::from(idx as u64 + 1));
            assert_eq!(task.payload.options["total_steps"], Value::from(3u64));
        }
    }

    #[test]
    fn unknown_verbs_default_to_navigate() {
        let translator = GoalTranslator::new(Arc::new(MockReasoningClient::default()));
        let step = ActionPlanStep {
            step: 1,
            action: "teleport".into(),
            description: "do something odd".into(),
            url: None,
            selector: None,
        };
        let tasks = translator.tasks_from_plan(&goal(), &[step]);
        assert_eq!(tasks[0].task_type, TaskType::Navigate);
    }
}
