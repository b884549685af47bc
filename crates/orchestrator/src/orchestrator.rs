use std::collections::HashMap;
use std::sync::Arc;

use browserpilot_core_types::{
    PilotError, Task, TaskId, TaskResult, TaskStatus, UserId,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::dispatch::ExecutorSet;
use crate::executor::TaskExecutor;
use crate::history::HistoryStore;
use crate::inflight::{Claim, InFlightMap};
use crate::metrics;
use crate::model::ExecutionContext;

/// Owns the in-flight map and the per-user history; every task execution in
/// the system funnels through here.
pub struct TaskOrchestrator {
    executors: ExecutorSet,
    inflight: InFlightMap,
    history: HistoryStore,
}

impl TaskOrchestrator {
    pub fn new(executors: ExecutorSet) -> Self {
        Self {
            executors,
            inflight: InFlightMap::default(),
            history: HistoryStore::default(),
        }
    }

    pub fn with_history(executors: ExecutorSet, history: HistoryStore) -> Self {
        Self {
            executors,
            inflight: InFlightMap::default(),
            history,
        }
    }

    /// Execute one task. Always returns a structured result; errors are
    /// folded into `TaskResult`, never raised.
    pub async fn execute_task(&self, task: &Task, ctx: &ExecutionContext) -> TaskResult {
        if let Err(err) = Self::validate(task) {
            return self.finish_unexecuted(task, err);
        }

        let executor = match self.executors.resolve(task) {
            Ok(executor) => executor,
            Err(err) => return self.finish_unexecuted(task, err),
        };

        match self.inflight.claim(&task.id) {
            Claim::Owner(tx) => {
                metrics::set_inflight(self.inflight.len());
                let result = self.run_owned(&executor, task, ctx).await;
                self.inflight.complete(&task.id, &tx, result.clone());
                metrics::set_inflight(self.inflight.len());
                self.history.record(&task.user_id, result.clone());
                result
            }
            Claim::Joiner(mut rx) => {
                debug!(task = %task.id, "joining in-flight execution");
                metrics::record_deduplicated(executor.name());
                match rx.recv().await {
                    Ok(result) => result,
                    // The owner vanished without publishing; only explicit
                    // cancellation tears the channel down like that.
                    Err(_) => self.finish_unexecuted(
                        task,
                        PilotError::TaskCancelled(task.id.clone()),
                    ),
                }
            }
        }
    }

    async fn run_owned(
        &self,
        executor: &Arc<dyn TaskExecutor>,
        task: &Task,
        ctx: &ExecutionContext,
    ) -> TaskResult {
        let budget = executor.config().timeout;
        match timeout(budget, executor.execute(task, ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    task = %task.id,
                    executor = executor.name(),
                    "execution timed out; abandoning work in flight"
                );
                TaskResult::failure(
                    task.id.clone(),
                    executor.name(),
                    &PilotError::ExecutionTimeout {
                        timeout_ms: budget.as_millis() as u64,
                    },
                )
            }
        }
    }

    /// Batch execution: group by resolved executor, run groups concurrently,
    /// and scatter results back into input order. A group whose executor
    /// returns the wrong shape fails every task in that group rather than
    /// silently dropping any.
    pub async fn execute_batch(&self, tasks: &[Task], ctx: &ExecutionContext) -> Vec<TaskResult> {
        let mut slots: Vec<Option<TaskResult>> = vec![None; tasks.len()];
        let mut groups: HashMap<usize, (Arc<dyn TaskExecutor>, Vec<usize>)> = HashMap::new();

        for (position, task) in tasks.iter().enumerate() {
            if let Err(err) = Self::validate(task) {
                slots[position] = Some(self.finish_unexecuted(task, err));
                continue;
            }
            match self.executors.resolve(task) {
                Ok(executor) => {
                    let key = Arc::as_ptr(&executor) as *const () as usize;
                    groups
                        .entry(key)
                        .or_insert_with(|| (executor, Vec::new()))
                        .1
                        .push(position);
                }
                Err(err) => slots[position] = Some(self.finish_unexecuted(task, err)),
            }
        }

        let group_runs = groups.into_values().map(|(executor, positions)| async move {
            let members: Vec<Task> = positions.iter().map(|&p| tasks[p].clone()).collect();
            let results = executor.execute_batch(&members, ctx).await;
            (executor, positions, results)
        });

        for (executor, positions, results) in futures::future::join_all(group_runs).await {
            if results.len() != positions.len() {
                warn!(
                    executor = executor.name(),
                    expected = positions.len(),
                    got = results.len(),
                    "batch result shape mismatch; failing whole group"
                );
                for &position in &positions {
                    let err = PilotError::Validation(format!(
                        "executor {} returned a malformed batch",
                        executor.name()
                    ));
                    slots[position] = Some(self.finish_unexecuted(&tasks[position], err));
                }
                continue;
            }
            for (&position, result) in positions.iter().zip(results) {
                self.history.record(&tasks[position].user_id, result.clone());
                slots[position] = Some(result);
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.expect("every batch position is settled"))
            .collect()
    }

    /// Best-effort, non-preemptive: removes the tracking entry so the id can
    /// run again, but does not interrupt work already handed to an executor.
    pub fn cancel(&self, id: &TaskId) -> bool {
        let removed = self.inflight.cancel(id);
        if removed {
            info!(task = %id, "task cancelled (tracking entry removed)");
            metrics::set_inflight(self.inflight.len());
        }
        removed
    }

    pub fn running_tasks(&self) -> Vec<TaskId> {
        self.inflight.ids()
    }

    pub fn history(&self, user: &UserId) -> Vec<TaskResult> {
        self.history.for_user(user)
    }

    pub async fn health_check(&self) -> bool {
        for (_, executor) in self.executors.registered() {
            if !executor.health_check().await {
                return false;
            }
        }
        true
    }

    fn validate(task: &Task) -> Result<(), PilotError> {
        if task.id.0.trim().is_empty() {
            return Err(PilotError::Validation("task id must be present".into()));
        }
        if task.user_id.0.trim().is_empty() {
            return Err(PilotError::Validation("task user id must be present".into()));
        }
        if task.status == TaskStatus::Cancelled {
            return Err(PilotError::TaskCancelled(task.id.clone()));
        }
        Ok(())
    }

    /// A failure that never reached an executor still records into history so
    /// the caller can see it later.
    fn finish_unexecuted(&self, task: &Task, err: PilotError) -> TaskResult {
        let result = TaskResult::failure(task.id.clone(), "orchestrator", &err);
        self.history.record(&task.user_id, result.clone());
        result
    }
}
