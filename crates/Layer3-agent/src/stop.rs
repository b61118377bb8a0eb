//! Stop Handler - 태스크 중지 요청 처리
//!
//! 해석 우선순위: `stop_all` → 모든 활성 태스크; `user_id` + 해석 가능한
//! prompt(명시 또는 조회) → 그 태스크 하나; `user_id`만 → 그 user의 모든
//! 태스크; 둘 다 없음 → 에러, 부수효과 없음.
//!
//! 매칭이 0건이면 warning입니다 (없는 태스크 중지는 실패가 아님 -
//! 멱등한 stop).

use crate::context::WorkerContext;
use crate::report::ProgressReporter;
use crate::task::{StopRequest, StopResponse, StoppedTask};
use deskpilot_foundation::TaskKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Stop 요청 핸들러
#[derive(Clone)]
pub struct StopHandler {
    ctx: Arc<WorkerContext>,
}

impl StopHandler {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }

    /// 요청을 태스크 목록으로 해석
    async fn resolve(&self, request: &StopRequest) -> Result<Vec<TaskKey>, StopResponse> {
        let registry = &self.ctx.registry;

        if request.stop_all {
            return Ok(registry.active_tasks().await);
        }

        let user_id = match request.user_id.as_deref().filter(|u| !u.is_empty()) {
            Some(user_id) => user_id,
            None => {
                return Err(StopResponse::error(
                    "Stop request requires user_id or stop_all",
                ))
            }
        };

        let prompt_id = match request.prompt_id.clone() {
            Some(prompt_id) => Some(prompt_id),
            None => registry.lookup_active_prompt(user_id).await,
        };

        match prompt_id {
            Some(prompt_id) => {
                let key = TaskKey::new(user_id, prompt_id);
                if registry.is_active(&key).await {
                    Ok(vec![key])
                } else {
                    Ok(Vec::new())
                }
            }
            // prompt를 해석할 수 없으면 그 user의 모든 태스크
            None => Ok(registry.tasks_for_user(user_id).await),
        }
    }

    /// Stop 요청 처리
    pub async fn handle(&self, request: StopRequest) -> StopResponse {
        let resolved = match self.resolve(&request).await {
            Ok(resolved) => resolved,
            Err(response) => return response,
        };

        if resolved.is_empty() {
            warn!("Stop request matched no active task");
            return StopResponse::warning("No matching active task to stop");
        }

        let registry = &self.ctx.registry;
        let grace = Duration::from_millis(self.ctx.config.stop_grace_ms);
        let mut stopped = Vec::with_capacity(resolved.len());

        for key in &resolved {
            info!(task = %key, force = request.force, "Stopping task");

            // 태스크별 토큰이 권위. fallback 플래그는 토큰이 생기기 전에
            // 시작된 태스크를 위한 참고용 안전망입니다.
            let token = registry.set_token(key).await;
            token.trigger();
            registry.fallback().trigger();

            let reporter = ProgressReporter::new(
                self.ctx.conn.clone(),
                &self.ctx.config.topic_base,
                key.clone(),
            );
            reporter.stopping().await;

            // 등록된 prompt가 일치하거나 특정 prompt가 요청되지 않았을
            // 때만 항목 제거
            if request.prompt_id.is_none() || registry.is_active(key).await {
                registry.unregister_task(key).await;
            }

            // 루프가 플래그를 관찰할 유예 시간
            tokio::time::sleep(grace).await;
            reporter.stopped().await;

            stopped.push(StoppedTask::from(key));
        }

        // 비강제 stop이 모든 태스크를 통지했을 때만 fallback 리셋.
        // 강제 stop은 플래그를 남기지만, 이후 태스크는 자기 토큰만
        // 검사하므로 오염되지 않습니다.
        if !request.force {
            registry.fallback().reset();
        }

        StopResponse::success(
            format!("Stopped {} task(s)", stopped.len()),
            stopped,
        )
    }
}

// ============================================================================
// 테스트
// ============================================================================
