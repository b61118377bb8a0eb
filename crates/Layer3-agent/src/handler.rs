//! Instruction Handler - 인바운드 instruction 처리
//!
//! 검증 → 등록 → `started` 발행 → 루프 실행 → 결과별 마무리 → 등록
//! 해제. 협력자 실패는 루프 경계에서 잡혀 `error` 이벤트 하나로
//! 변환되며, 태스크 실행 컨텍스트 밖으로 전파되지 않습니다.

use crate::agent_loop::{AgentLoop, LoopOutcome};
use crate::context::WorkerContext;
use crate::persist::SessionResultRecord;
use crate::report::ProgressReporter;
use crate::task::InstructionRequest;
use chrono::Utc;
use deskpilot_foundation::CancelContext;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// 인바운드 instruction 핸들러
#[derive(Clone)]
pub struct InstructionHandler {
    ctx: Arc<WorkerContext>,
}

impl InstructionHandler {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }

    /// INIT 검증: 실패를 하나의 메시지로 집계
    async fn validate(&self, instruction: &str) -> Option<String> {
        let mut failures = Vec::new();

        if instruction.trim().is_empty() {
            failures.push("instruction is empty".to_string());
        }
        if self.ctx.config.api_key.trim().is_empty() {
            failures.push("API key is not configured".to_string());
        }
        if let Err(e) = self.ctx.observer.probe().await {
            failures.push(e.to_string());
        }

        if failures.is_empty() {
            None
        } else {
            Some(failures.join("; "))
        }
    }

    /// instruction 페이로드 처리, RPC 응답 반환
    pub async fn handle(&self, payload: Value) -> Value {
        let request: InstructionRequest = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(e) => {
                return json!({
                    "status": "error",
                    "message": format!("Invalid instruction payload: {}", e),
                })
            }
        };

        // user_id/instruction 누락 → 즉시 에러 응답, 태스크 없음, 토픽
        // 트래픽 없음
        let key = match request.task_key() {
            Some(key) => key,
            None => {
                return json!({
                    "status": "error",
                    "message": "Missing user_id in instruction request",
                })
            }
        };
        let instruction = match request.effective_instruction() {
            Some(instruction) => instruction,
            None => {
                return json!({
                    "status": "error",
                    "message": "Missing instruction_to_vlm_agent in instruction request",
                })
            }
        };

        let reporter = ProgressReporter::new(
            self.ctx.conn.clone(),
            &self.ctx.config.topic_base,
            key.clone(),
        )
        .with_parent_request_id(request.parent_request_id.clone());

        // INIT 검증 - 부분 실행 없이 바로 실패. 검증 에러는 동기 응답으로만
        // 보고되며, 토픽 트래픽을 만들지 않습니다.
        if let Some(message) = self.validate(&instruction).await {
            warn!(task = %key, "Instruction validation failed: {}", message);
            return json!({
                "status": "error",
                "user_id": key.user_id,
                "prompt_id": key.prompt_id,
                "message": message,
            });
        }

        info!(
            task = %key,
            parent_request_id = request.parent_request_id.as_deref().unwrap_or(""),
            max_eta_seconds = request.max_eta_seconds.unwrap_or(0),
            "Instruction accepted"
        );

        // 등록 (last-writer-wins) + 토큰 생성
        let registry = &self.ctx.registry;
        registry.register(&key.user_id, &key.prompt_id).await;
        let token = registry.set_token(&key).await;
        let cancel = CancelContext::new(key.clone(), token);

        reporter.started().await;
        let start_time = Utc::now();

        let agent_loop = AgentLoop::new(
            self.ctx.observer.clone(),
            self.ctx.backend.clone(),
            self.ctx.executor.clone(),
            reporter.clone(),
            cancel,
        );
        let run = agent_loop.run(&instruction).await;

        let end_time = Utc::now();
        let execution_time_seconds =
            (end_time - start_time).num_milliseconds() as f64 / 1000.0;

        let record = SessionResultRecord {
            session_id: key.to_string(),
            instruction: instruction.clone(),
            start_time: start_time.to_rfc3339(),
            end_time: end_time.to_rfc3339(),
            execution_time_seconds,
            messages: run.records.clone(),
        };

        let response = match &run.outcome {
            LoopOutcome::Completed => {
                let output_file = self.ctx.results.save_logged(&key, &record);
                reporter.completed(execution_time_seconds).await;
                json!({
                    "status": "completed",
                    "user_id": key.user_id,
                    "prompt_id": key.prompt_id,
                    "message_count": run.records.len(),
                    "execution_time_seconds": execution_time_seconds,
                    "output_file": output_file.map(|p| p.display().to_string()),
                    "messages": run.records,
                })
            }
            // 종료 알림(stopping/stopped)은 Stop 핸들러의 책임
            LoopOutcome::Cancelled => {
                let output_file = self.ctx.results.save_logged(&key, &record);
                json!({
                    "status": "stopped",
                    "user_id": key.user_id,
                    "prompt_id": key.prompt_id,
                    "message_count": run.records.len(),
                    "execution_time_seconds": execution_time_seconds,
                    "output_file": output_file.map(|p| p.display().to_string()),
                })
            }
            LoopOutcome::Failed(message) => {
                reporter.error(message).await;
                json!({
                    "status": "error",
                    "user_id": key.user_id,
                    "prompt_id": key.prompt_id,
                    "message": message,
                })
            }
        };

        // 등록 해제. stop이 이미 제거했으면 no-op이고, 그 사이 같은
        // user로 새 태스크가 등록됐으면 건드리지 않습니다.
        registry.unregister_task(&key).await;
        registry.remove_token(&key).await;

        response
    }
}
