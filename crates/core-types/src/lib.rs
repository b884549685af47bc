//! Shared primitives for the BrowserPilot orchestration core.

use uuid::Uuid;

mod error;
mod goal;
mod task;

pub use error::{PilotError, PilotResult, ReasoningFailure};
pub use goal::{ActionPlanStep, ExtractedEntity, Goal, GoalStatus, Intent};
pub use task::{
    ResultMetadata, Task, TaskPayload, TaskPriority, TaskResult, TaskStatus, TaskType,
};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(TaskId);
string_id!(GoalId);
string_id!(UserId);
string_id!(SessionId);
string_id!(PageId);
string_id!(ExecutionId);
