use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use browserpilot_core_types::{
    Goal, Task, TaskPayload, TaskPriority, TaskResult, TaskType, UserId,
};
use browserpilot_goal_engine::{GoalContext, GoalOptions};
use browserpilot_orchestrator::ExecutionContext;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use super::state::AppState;
use crate::metrics;

pub fn build_router(state: AppState) -> Router {
    metrics::register_metrics();
    Router::new()
        .route("/api/summarize", post(summarize_handler))
        .route("/api/execute-goal", post(execute_goal_handler))
        .route("/api/page-info", get(page_info_handler))
        .route("/api/history", get(history_handler))
        .route("/api/running-tasks", get(running_tasks_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Map stable error kinds to HTTP statuses. Error text from the core never
/// contains internal paths or credentials, so it passes through verbatim.
fn status_for(kind: Option<&str>) -> StatusCode {
    match kind {
        Some("VALIDATION_ERROR") => StatusCode::BAD_REQUEST,
        Some("SECURITY_ERROR") => StatusCode::FORBIDDEN,
        Some("NO_EXECUTOR_FOUND") | Some("EXECUTOR_MISMATCH") => StatusCode::UNPROCESSABLE_ENTITY,
        Some("TASK_CANCELLED") => StatusCode::CONFLICT,
        Some("EXECUTION_TIMEOUT") => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn task_response(result: TaskResult) -> Response {
    if result.success {
        Json(json!({
            "success": true,
            "data": result.data,
            "duration_ms": result.duration_ms,
        }))
        .into_response()
    } else {
        let status = status_for(result.error_kind.as_deref());
        (
            status,
            Json(json!({
                "success": false,
                "error": result.error,
                "error_kind": result.error_kind,
            })),
        )
            .into_response()
    }
}

fn user_from(raw: Option<String>) -> UserId {
    raw.filter(|u| !u.trim().is_empty())
        .map(|u| UserId::from(u.as_str()))
        .unwrap_or_else(|| UserId::from("anonymous"))
}

#[derive(Deserialize)]
struct SummarizeRequest {
    url: String,
    user_id: Option<String>,
    #[serde(default)]
    options: HashMap<String, Value>,
}

async fn summarize_handler(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Response {
    let user = user_from(request.user_id);
    let mut payload = TaskPayload::with_url(&request.url);
    payload.options = request.options;
    let task = Task::new(TaskType::Summarize, user.clone(), payload);
    let ctx = ExecutionContext::new(user, "http");
    task_response(state.orchestrator.execute_task(&task, &ctx).await)
}

#[derive(Deserialize)]
struct GoalContextRequest {
    current_page_title: Option<String>,
    current_page_url: Option<String>,
    #[serde(default)]
    recent_page_titles: Vec<String>,
}

#[derive(Deserialize)]
struct GoalRequest {
    goal: String,
    user_id: Option<String>,
    priority: Option<TaskPriority>,
    context: Option<GoalContextRequest>,
}

async fn execute_goal_handler(
    State(state): State<AppState>,
    Json(request): Json<GoalRequest>,
) -> Response {
    let user = user_from(request.user_id);
    let mut goal = Goal::new(user.clone(), request.goal)
        .with_priority(request.priority.unwrap_or_default());
    let ctx = ExecutionContext::new(user, "http");
    let options = GoalOptions {
        context: request.context.map(|c| GoalContext {
            current_page_title: c.current_page_title,
            current_page_url: c.current_page_url,
            recent_page_titles: c.recent_page_titles,
            history: Vec::new(),
        }),
        ..GoalOptions::default()
    };

    // Goal failure is a structured outcome, not an HTTP error.
    let outcome = state.goal_executor.execute(&mut goal, &ctx, &options).await;
    Json(outcome).into_response()
}

#[derive(Deserialize)]
struct PageInfoQuery {
    url: String,
    user_id: Option<String>,
}

async fn page_info_handler(
    State(state): State<AppState>,
    Query(query): Query<PageInfoQuery>,
) -> Response {
    let user = user_from(query.user_id);
    let task = Task::new(
        TaskType::Navigate,
        user.clone(),
        TaskPayload::with_url(&query.url),
    );
    let ctx = ExecutionContext::new(user, "http");
    task_response(state.orchestrator.execute_task(&task, &ctx).await)
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Response {
    let user = user_from(query.user_id);
    let history = state.orchestrator.history(&user);
    Json(json!({
        "user_id": user,
        "count": history.len(),
        "results": history,
    }))
    .into_response()
}

async fn running_tasks_handler(State(state): State<AppState>) -> Response {
    let ids = state.orchestrator.running_tasks();
    Json(json!({ "count": ids.len(), "task_ids": ids })).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let executors_healthy = state.orchestrator.health_check().await;
    let status = if executors_healthy { "ok" } else { "degraded" };
    let code = if executors_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(json!({
            "status": status,
            "live_sessions": state.pool.session_count(),
            "uptime_ms": state.started_at.elapsed().as_millis() as u64,
        })),
    )
        .into_response()
}

async fn metrics_handler() -> Response {
    metrics::render().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::Request;
    use browserpilot_reasoning::MockReasoningClient;
    use browserpilot_session_pool::{PageContent, StubEngine};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn article_engine() -> StubEngine {
        let engine = StubEngine::new();
        let prose = "a readable paragraph about the subject matter ".repeat(10);
        engine.stub_content(
            "https://article.test",
            PageContent {
                url: "https://article.test/a".into(),
                title: "Article".into(),
                html: format!(
                    "<html><head><title>Article</title></head><body><p>{prose}</p></body></html>"
                ),
                text: prose,
            },
        );
        engine
    }

    fn router_with(engine: StubEngine, config: AppConfig) -> Router {
        let state = AppState::build(
            &config,
            Arc::new(engine),
            Arc::new(MockReasoningClient::with_reply("a tidy summary")),
        );
        build_router(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let router = router_with(StubEngine::new(), AppConfig::default());
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["live_sessions"], 0);
    }

    #[tokio::test]
    async fn summarize_returns_summary_and_confidence() {
        let router = router_with(article_engine(), AppConfig::default());
        let request = Request::post("/api/summarize")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"url": "https://article.test/a", "user_id": "u1"}).to_string(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["summary"], "a tidy summary");
        assert!(body["data"]["confidence"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn blocked_domains_surface_as_forbidden() {
        let mut config = AppConfig::default();
        config.pool.blocked_domains = vec!["evil.test".into()];
        let router = router_with(StubEngine::new(), config);
        let request = Request::get("/api/page-info?url=https://evil.test/x&user_id=u1")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error_kind"], "SECURITY_ERROR");
    }

    #[tokio::test]
    async fn history_is_per_user() {
        let router = router_with(article_engine(), AppConfig::default());
        let request = Request::post("/api/summarize")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"url": "https://article.test/a", "user_id": "u1"}).to_string(),
            ))
            .unwrap();
        router.clone().oneshot(request).await.unwrap();

        let own = body_json(
            router
                .clone()
                .oneshot(
                    Request::get("/api/history?user_id=u1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(own["count"], 1);

        let other = body_json(
            router
                .oneshot(
                    Request::get("/api/history?user_id=u2")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(other["count"], 0);
    }

    #[tokio::test]
    async fn running_tasks_starts_empty() {
        let router = router_with(StubEngine::new(), AppConfig::default());
        let response = router
            .oneshot(Request::get("/api/running-tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
    }
}
