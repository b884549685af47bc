use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GoalId, TaskPriority, UserId};

/// Classified intent produced by goal analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub kind: String,
    pub confidence: f64,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

impl Intent {
    pub fn new(kind: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind: kind.into(),
            confidence: confidence.clamp(0.0, 1.0),
            parameters: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: String,
    pub value: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    Analyzing,
    RunningTasks,
    Summarizing,
    Done,
    Failed,
}

/// A free-text objective awaiting decomposition into an action plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    pub priority: TaskPriority,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: GoalId::new(),
            user_id,
            text: text.into(),
            intent: None,
            entities: Vec::new(),
            priority: TaskPriority::default(),
            status: GoalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn set_status(&mut self, status: GoalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// One ordered step of a reasoning-service action plan. Consumed exactly once
/// to synthesize a task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionPlanStep {
    pub step: u32,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}
