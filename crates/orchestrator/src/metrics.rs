use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounterVec, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref TASKS_STARTED: IntCounterVec = IntCounterVec::new(
        opts!(
            "pilot_tasks_started_total",
            "Task executions started, by executor"
        ),
        &["executor"]
    )
    .unwrap();
    static ref TASKS_COMPLETED: IntCounterVec = IntCounterVec::new(
        opts!(
            "pilot_tasks_completed_total",
            "Task executions completed successfully, by executor"
        ),
        &["executor"]
    )
    .unwrap();
    static ref TASKS_FAILED: IntCounterVec = IntCounterVec::new(
        opts!(
            "pilot_tasks_failed_total",
            "Task executions that surfaced a failure, by executor"
        ),
        &["executor"]
    )
    .unwrap();
    static ref TASKS_RETRIED: IntCounterVec = IntCounterVec::new(
        opts!(
            "pilot_tasks_retried_total",
            "Transient failures retried with backoff, by executor"
        ),
        &["executor"]
    )
    .unwrap();
    static ref TASKS_DEDUPLICATED: IntCounterVec = IntCounterVec::new(
        opts!(
            "pilot_tasks_deduplicated_total",
            "Calls that joined an already in-flight execution, by executor"
        ),
        &["executor"]
    )
    .unwrap();
    static ref TASKS_INFLIGHT: IntGauge = IntGauge::new(
        "pilot_tasks_inflight",
        "Task executions currently in flight"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register orchestrator metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, TASKS_STARTED.clone());
    register(registry, TASKS_COMPLETED.clone());
    register(registry, TASKS_FAILED.clone());
    register(registry, TASKS_RETRIED.clone());
    register(registry, TASKS_DEDUPLICATED.clone());
    register(registry, TASKS_INFLIGHT.clone());
}

pub fn record_started(executor: &str) {
    TASKS_STARTED.with_label_values(&[executor]).inc();
}

pub fn record_completed(executor: &str) {
    TASKS_COMPLETED.with_label_values(&[executor]).inc();
}

pub fn record_failed(executor: &str) {
    TASKS_FAILED.with_label_values(&[executor]).inc();
}

pub fn record_retried(executor: &str) {
    TASKS_RETRIED.with_label_values(&[executor]).inc();
}

pub fn record_deduplicated(executor: &str) {
    TASKS_DEDUPLICATED.with_label_values(&[executor]).inc();
}

pub fn set_inflight(count: usize) {
    TASKS_INFLIGHT.set(count as i64);
}
