use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use browserpilot_cli::{build_router, AppConfig, AppState};
use browserpilot_core_types::{Goal, TaskPriority, UserId};
use browserpilot_goal_engine::GoalOptions;
use browserpilot_orchestrator::ExecutionContext;
use browserpilot_reasoning::{
    MockReasoningClient, OpenAiCompatClient, ReasoningClient, ReasoningConfig,
};
use browserpilot_session_pool::StubEngine;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "browserpilot", version, about = "Goal-driven browser task orchestration")]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Execute one goal from the command line and print the outcome.
    Goal {
        text: String,
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => TaskPriority::Low,
            PriorityArg::Medium => TaskPriority::Medium,
            PriorityArg::High => TaskPriority::High,
            PriorityArg::Critical => TaskPriority::Critical,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn reasoning_client(config: &AppConfig) -> anyhow::Result<Arc<dyn ReasoningClient>> {
    match (&config.reasoning.base_url, &config.reasoning.api_key) {
        (Some(base_url), Some(api_key)) => {
            let client = OpenAiCompatClient::new(ReasoningConfig {
                base_url: base_url.clone(),
                api_key: api_key.clone(),
                ..ReasoningConfig::default()
            })
            .context("configuring reasoning client")?;
            Ok(Arc::new(client))
        }
        _ => {
            warn!("no reasoning endpoint configured; using the offline mock client");
            Ok(Arc::new(MockReasoningClient::default()))
        }
    }
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    // Real CDP wiring is out of scope; the deterministic stub engine serves
    // engine-less bring-up and tests alike.
    let engine = Arc::new(StubEngine::new());
    let reasoning = reasoning_client(config)?;
    Ok(AppState::build(config, engine, reasoning))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    state.pool.spawn_reaper().await;
    let pool = state.pool.clone();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "browserpilot listening");

    let router = build_router(state);
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    pool.shutdown().await;
    Ok(())
}

async fn run_goal(
    config: AppConfig,
    text: String,
    user: String,
    priority: Option<PriorityArg>,
) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let user = UserId::from(user.as_str());
    let mut goal = Goal::new(user.clone(), text);
    if let Some(priority) = priority {
        goal = goal.with_priority(priority.into());
    }

    let ctx = ExecutionContext::new(user, "cli");
    let outcome = state
        .goal_executor
        .execute(&mut goal, &ctx, &GoalOptions::default())
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    state.pool.shutdown().await;
    if outcome.success {
        Ok(())
    } else {
        anyhow::bail!("goal failed: {}", outcome.summary)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Goal {
            text,
            user,
            priority,
        } => run_goal(config, text, user, priority).await,
    }
}
