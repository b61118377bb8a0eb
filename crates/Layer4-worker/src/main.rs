//! DeskPilot Worker - 데몬 진입점
//!
//! 설정을 로드하고 버스에 붙어 instruction/stop RPC 프로시저를 등록한 뒤
//! ctrl-c까지 실행됩니다. 태스크별 실행은 `deskpilot-agent`가 담당합니다.

use chrono::Utc;
use clap::Parser;
use deskpilot_agent::{InstructionHandler, StopHandler, StopRequest, WorkerContext};
use deskpilot_core::bus::{BusTransport, InProcessBus, ProcedureHandler};
use deskpilot_foundation::{JsonStore, WorkerConfig};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 버스 연결 대기 한도
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// DeskPilot worker - drives the computer-use agent loop over the message bus
#[derive(Parser, Debug)]
#[command(name = "deskpilot-worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for persisted session results
    #[arg(long)]
    output_dir: Option<String>,

    /// Screen parser server address (host:port)
    #[arg(long)]
    screen_parser_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // 설정 로드 (없으면 기본 설정 생성)
    let store = match &args.config {
        Some(dir) => JsonStore::new(dir),
        None => JsonStore::global()?,
    };
    let mut config = WorkerConfig::load_or_create(&store)?;
    config.apply_env_overrides();
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(url) = args.screen_parser_url {
        config.screen_parser_url = url;
    }

    if config.api_key.trim().is_empty() {
        warn!("No API key configured - instructions will be rejected until one is set");
    }

    info!(
        model = %config.model,
        realm = %config.realm,
        bus_url = %config.bus_url,
        "Starting DeskPilot worker"
    );

    let transport: Arc<dyn BusTransport> = Arc::new(InProcessBus::new());
    let ctx = Arc::new(WorkerContext::from_config(config, transport)?);

    ctx.conn.wait_until_connected(CONNECT_TIMEOUT).await?;
    register_procedures(&ctx).await?;

    // 준비 완료 알림
    let worker_id = uuid::Uuid::new_v4().to_string();
    ctx.conn
        .publish_logged(
            &ctx.config.topic_base,
            json!({
                "status": "ready",
                "worker_id": worker_id,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
    info!(worker_id = %worker_id, "Worker ready, waiting for instructions");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    // 남은 태스크 정리
    let drained = StopHandler::new(ctx.clone())
        .handle(StopRequest {
            stop_all: true,
            ..Default::default()
        })
        .await;
    if !drained.stopped_tasks.is_empty() {
        info!(stopped = drained.stopped_tasks.len(), "Drained active tasks");
    }
    Ok(())
}

/// run/stop RPC 프로시저 등록
async fn register_procedures(ctx: &Arc<WorkerContext>) -> anyhow::Result<()> {
    let run_handler = InstructionHandler::new(ctx.clone());
    let run: ProcedureHandler = Arc::new(move |payload| {
        let handler = run_handler.clone();
        Box::pin(async move { Ok(handler.handle(payload).await) })
    });
    ctx.conn
        .register_procedure(&ctx.config.run_procedure, run)
        .await?;

    let stop_handler = StopHandler::new(ctx.clone());
    let stop: ProcedureHandler = Arc::new(move |payload| {
        let handler = stop_handler.clone();
        Box::pin(async move {
            let request: StopRequest = serde_json::from_value(payload).unwrap_or_default();
            let response = handler.handle(request).await;
            Ok(serde_json::to_value(response)?)
        })
    });
    ctx.conn
        .register_procedure(&ctx.config.stop_procedure, stop)
        .await?;

    info!(
        run = %ctx.config.run_procedure,
        stop = %ctx.config.stop_procedure,
        "RPC procedures registered"
    );
    Ok(())
}
