//! instruction 수락부터 stop까지의 엔드투엔드 플로우 테스트
//!
//! 인프로세스 버스와 모의 협력자로 전체 워커 경로를 검증합니다.

use async_trait::async_trait;
use deskpilot_agent::{InstructionHandler, StopHandler, StopRequest, WorkerContext};
use deskpilot_core::bus::InProcessBus;
use deskpilot_core::executor::{Action, ActionExecutor, ExecStep, StepStream};
use deskpilot_core::observer::{Observation, ScreenObserver};
use deskpilot_foundation::{Result, WorkerConfig};
use deskpilot_provider::{Decision, DecisionBackend, Message};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// 모의 협력자
// ============================================================================

struct StillScreen;

#[async_trait]
impl ScreenObserver for StillScreen {
    async fn observe(&self) -> Result<Observation> {
        Ok(Observation::default())
    }
    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// N번 액션을 낸 뒤 완료 신호를 보내는 백엔드
struct ScriptedBackend {
    actions: usize,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(actions: usize) -> Self {
        Self {
            actions,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DecisionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }
    async fn decide(
        &self,
        _history: &mut Vec<Message>,
        _observation: &Observation,
    ) -> Result<Decision> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.actions {
            Ok(Decision {
                analysis: Some("Status: SUCCESS progressing".to_string()),
                action: Some(Action::new("shell", json!({"command": "true"}))),
                raw: json!({}),
            })
        } else {
            Ok(Decision::done(json!({})))
        }
    }
}

/// 오래 걸리는 모델 호출을 흉내내는 백엔드. stop 요청이 호출 도중에
/// 도착하고, 루프는 호출이 돌아온 뒤 플래그를 관찰합니다.
struct SlowBackend;

#[async_trait]
impl DecisionBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }
    async fn decide(
        &self,
        _history: &mut Vec<Message>,
        _observation: &Observation,
    ) -> Result<Decision> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok(Decision {
            analysis: None,
            action: Some(Action::new("shell", json!({"command": "true"}))),
            raw: json!({}),
        })
    }
}

struct EchoExecutor;

impl ActionExecutor for EchoExecutor {
    fn execute(&self, action: Action) -> StepStream<'_> {
        futures::stream::iter(vec![
            Ok(ExecStep::rendered(format!("Next action: {}", action.input))),
            Ok(ExecStep::with_result("executed", "ok")),
        ])
        .boxed()
    }
}

// ============================================================================
// 하네스
// ============================================================================

fn context(
    backend: Arc<dyn DecisionBackend>,
    output_dir: &std::path::Path,
) -> (Arc<WorkerContext>, Arc<InProcessBus>) {
    let bus = Arc::new(InProcessBus::new());
    let config = WorkerConfig {
        api_key: "test-key".to_string(),
        output_dir: output_dir.display().to_string(),
        stop_grace_ms: 5,
        ..Default::default()
    };
    let ctx = Arc::new(WorkerContext::with_collaborators(
        config,
        bus.clone(),
        Arc::new(StillScreen),
        backend,
        Arc::new(EchoExecutor),
    ));
    (ctx, bus)
}

fn instruction_payload() -> Value {
    json!({
        "parent_request_id": "req-100",
        "user_id": "42",
        "prompt_id": "7",
        "instruction_to_vlm_agent": "open the settings app",
        "max_ETA_in_seconds": 120
    })
}

fn statuses(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["status"].as_str().unwrap_or("").to_string())
        .collect()
}

// ============================================================================
// 테스트
// ============================================================================

#[tokio::test]
async fn happy_path_publishes_started_progress_completed() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, bus) = context(Arc::new(ScriptedBackend::new(1)), dir.path());

    let response = InstructionHandler::new(ctx.clone())
        .handle(instruction_payload())
        .await;

    assert_eq!(response["status"], "completed");
    assert_eq!(response["user_id"], "42");
    assert_eq!(response["prompt_id"], "7");

    let events = bus.published("com.deskpilot.action.7.42").await;
    let seq = statuses(&events);
    assert_eq!(seq.first().unwrap(), "started");
    assert_eq!(seq.last().unwrap(), "completed");
    assert!(seq[1..seq.len() - 1].iter().all(|s| s == "in_progress"));
    assert!(seq.iter().filter(|s| *s == "completed").count() == 1);
    assert_eq!(events.last().unwrap()["is_final"], true);

    // 요청의 상관관계 핸들이 모든 이벤트에 실림
    assert!(events.iter().all(|e| e["parent_request_id"] == "req-100"));

    // 레지스트리는 비어 있고 결과 파일이 남음
    assert!(ctx.registry.is_empty().await);
    let output_file = response["output_file"].as_str().unwrap();
    assert!(std::path::Path::new(output_file).exists());
    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(output_file).unwrap()).unwrap();
    assert_eq!(saved["session_id"], "42_7");
    assert_eq!(saved["instruction"], "open the settings app");
}

#[tokio::test]
async fn missing_instruction_is_rejected_without_traffic() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, bus) = context(Arc::new(ScriptedBackend::new(0)), dir.path());

    let response = InstructionHandler::new(ctx.clone())
        .handle(json!({"user_id": "42", "prompt_id": "7"}))
        .await;

    assert_eq!(response["status"], "error");
    assert!(ctx.registry.is_empty().await);
    assert!(bus.published("com.deskpilot.action.7.42").await.is_empty());
}

#[tokio::test]
async fn missing_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, bus) = context(Arc::new(ScriptedBackend::new(0)), dir.path());

    let response = InstructionHandler::new(ctx)
        .handle(json!({"instruction_to_vlm_agent": "do something"}))
        .await;

    assert_eq!(response["status"], "error");
    assert!(bus.history().await.is_empty());
}

#[tokio::test]
async fn missing_api_key_is_rejected_without_traffic() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(InProcessBus::new());
    let config = WorkerConfig {
        api_key: String::new(),
        output_dir: dir.path().display().to_string(),
        stop_grace_ms: 5,
        ..Default::default()
    };
    let ctx = Arc::new(WorkerContext::with_collaborators(
        config,
        bus.clone(),
        Arc::new(StillScreen),
        Arc::new(ScriptedBackend::new(0)),
        Arc::new(EchoExecutor),
    ));

    let response = InstructionHandler::new(ctx.clone())
        .handle(instruction_payload())
        .await;

    // 검증 실패는 동기 응답으로만 보고됨 - 등록도 토픽 트래픽도 없음
    assert_eq!(response["status"], "error");
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("API key is not configured"));
    assert!(ctx.registry.is_empty().await);
    assert!(bus.history().await.is_empty());
}

#[tokio::test]
async fn concurrent_stop_cancels_running_loop() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, bus) = context(Arc::new(SlowBackend), dir.path());

    let handler = InstructionHandler::new(ctx.clone());
    let task = tokio::spawn(async move { handler.handle(instruction_payload()).await });

    // started가 발행되고 루프가 모델 호출 안에 있을 때까지 대기
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ctx.registry.lookup_active_prompt("42").await.unwrap(), "7");

    let stop = StopHandler::new(ctx.clone())
        .handle(StopRequest {
            user_id: Some("42".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(stop.status, "success");
    assert_eq!(stop.stopped_tasks.len(), 1);

    let response = task.await.unwrap();
    assert_eq!(response["status"], "stopped");

    // 루프는 터미널 이벤트를 내지 않음 - stopping/stopped는 Stop 핸들러가
    let events = bus.published("com.deskpilot.action.7.42").await;
    let seq = statuses(&events);
    assert_eq!(seq, vec!["started", "stopping", "stopped"]);
    assert!(ctx.registry.is_empty().await);
}

#[tokio::test]
async fn stop_after_completion_is_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _bus) = context(Arc::new(ScriptedBackend::new(0)), dir.path());

    InstructionHandler::new(ctx.clone())
        .handle(instruction_payload())
        .await;

    let stop = StopHandler::new(ctx)
        .handle(StopRequest {
            user_id: Some("42".to_string()),
            prompt_id: Some("7".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(stop.status, "warning");
}

#[tokio::test]
async fn new_task_after_forced_stop_is_not_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, bus) = context(Arc::new(ScriptedBackend::new(1)), dir.path());

    // 강제 stop으로 fallback 플래그를 남김
    ctx.registry.register("1", "1").await;
    StopHandler::new(ctx.clone())
        .handle(StopRequest {
            user_id: Some("1".to_string()),
            force: true,
            ..Default::default()
        })
        .await;
    assert!(ctx.registry.fallback().is_stopped());

    // 이후의 무관한 태스크는 정상 완료되어야 함
    let response = InstructionHandler::new(ctx.clone())
        .handle(instruction_payload())
        .await;
    assert_eq!(response["status"], "completed");

    let events = bus.published("com.deskpilot.action.7.42").await;
    assert_eq!(statuses(&events).last().unwrap(), "completed");
}
