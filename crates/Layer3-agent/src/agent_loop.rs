//! Agent Loop - 반복 상태 기계
//!
//! `INIT → OBSERVING → DECIDING → EXECUTING → (반복) | DONE | CANCELLED |
//! FAILED`. 취소는 협조적입니다: 각 단계 경계에서 `CancelContext`를
//! 폴링하며, 진행 중인 외부 호출을 선점하지 않습니다 - 호출이 돌아온 뒤
//! 더 진행하지 않을 뿐입니다.
//!
//! 종료 우선순위: 취소 → 완료 신호 → 협력자 에러.

use crate::extract::{extract_record, ExtractedRecord};
use crate::report::ProgressReporter;
use deskpilot_core::executor::ActionExecutor;
use deskpilot_core::observer::ScreenObserver;
use deskpilot_foundation::CancelContext;
use deskpilot_provider::{DecisionBackend, Message};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// LoopPhase / LoopOutcome
// ============================================================================

/// 루프 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Init,
    Observing,
    Deciding,
    Executing,
    Done,
    Cancelled,
    Failed,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopPhase::Init => "INIT",
            LoopPhase::Observing => "OBSERVING",
            LoopPhase::Deciding => "DECIDING",
            LoopPhase::Executing => "EXECUTING",
            LoopPhase::Done => "DONE",
            LoopPhase::Cancelled => "CANCELLED",
            LoopPhase::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// 루프 종료 결과
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// 결정 백엔드가 완료 신호를 보냄
    Completed,

    /// 취소 플래그를 관찰하고 조기 종료함. 종료 알림은 Stop 핸들러의
    /// 책임이므로 루프는 터미널 이벤트를 내지 않습니다.
    Cancelled,

    /// 협력자 호출 실패. 메시지가 터미널 상태 페이로드가 됩니다.
    Failed(String),
}

/// 루프 실행 결과
#[derive(Debug)]
pub struct LoopRun {
    pub outcome: LoopOutcome,

    /// 실행 중 추출된 레코드 (발생 순서대로)
    pub records: Vec<ExtractedRecord>,
}

// ============================================================================
// AgentLoop
// ============================================================================

/// 한 태스크의 instruction 실행 루프
///
/// 태스크 내에서 엄격히 순차적입니다. 같은 태스크의 두 단계가 동시에
/// 실행되지 않습니다.
pub struct AgentLoop {
    observer: Arc<dyn ScreenObserver>,
    backend: Arc<dyn DecisionBackend>,
    executor: Arc<dyn ActionExecutor>,
    reporter: ProgressReporter,
    cancel: CancelContext,
}

impl AgentLoop {
    pub fn new(
        observer: Arc<dyn ScreenObserver>,
        backend: Arc<dyn DecisionBackend>,
        executor: Arc<dyn ActionExecutor>,
        reporter: ProgressReporter,
        cancel: CancelContext,
    ) -> Self {
        Self {
            observer,
            backend,
            executor,
            reporter,
            cancel,
        }
    }

    /// 취소 관찰 시 Cancelled로 전이
    fn cancelled(&self, phase: LoopPhase) -> bool {
        if self.cancel.is_cancelled() {
            info!(task = %self.cancel.key(), phase = %phase, "Stop flag observed, terminating");
            true
        } else {
            false
        }
    }

    /// 렌더링 메시지 처리: 레코드 추출 + 진행 이벤트 발행
    async fn emit(&self, rendered: &str, records: &mut Vec<ExtractedRecord>) {
        if let Some(record) = extract_record(rendered) {
            self.reporter.in_progress(&record).await;
            records.push(record);
        }
    }

    /// instruction 실행
    pub async fn run(&self, instruction: &str) -> LoopRun {
        let mut history = vec![Message::user(instruction)];
        let mut records = Vec::new();

        debug!(
            task = %self.cancel.key(),
            phase = %LoopPhase::Init,
            backend = self.backend.name(),
            "Agent loop starting"
        );

        let outcome = loop {
            // 반복 선두 검사
            if self.cancelled(LoopPhase::Observing) {
                break LoopOutcome::Cancelled;
            }

            // OBSERVING - 지연이 가장 큰 단계이므로 직전/직후 모두 검사
            let observation = match self.observer.observe().await {
                Ok(observation) => observation,
                Err(e) => break LoopOutcome::Failed(format!("Screen observation failed: {}", e)),
            };
            if self.cancelled(LoopPhase::Deciding) {
                break LoopOutcome::Cancelled;
            }

            // DECIDING
            let decision = match self.backend.decide(&mut history, &observation).await {
                Ok(decision) => decision,
                Err(e) => break LoopOutcome::Failed(format!("Decision backend failed: {}", e)),
            };

            // 취소된 태스크에 대해 액션을 실행해서는 안 됨
            if self.cancelled(LoopPhase::Executing) {
                break LoopOutcome::Cancelled;
            }

            if let Some(analysis) = &decision.analysis {
                self.emit(&format!("Analysis: {}", analysis), &mut records)
                    .await;
            }

            // 완료 신호
            let action = match decision.action {
                Some(action) => action,
                None => break LoopOutcome::Completed,
            };

            // EXECUTING - 하위 단계 사이마다 취소 검사. 렌더링 메시지는
            // 재검사 *전에* 발행되어 부분 실행도 기록이 남습니다.
            let mut steps = self.executor.execute(action);
            let mut empty_result = false;
            let mut failure = None;
            let mut stop_observed = false;
            while let Some(step) = steps.next().await {
                let step = match step {
                    Ok(step) => step,
                    Err(e) => {
                        failure = Some(format!("Action execution failed: {}", e));
                        break;
                    }
                };

                self.emit(&step.rendered, &mut records).await;
                if let Some(result) = step.tool_result {
                    if result.trim().is_empty() {
                        empty_result = true;
                    } else {
                        history.push(Message::tool(result));
                    }
                }

                if self.cancelled(LoopPhase::Executing) {
                    stop_observed = true;
                    break;
                }
            }
            drop(steps);

            if stop_observed {
                break LoopOutcome::Cancelled;
            }
            if let Some(message) = failure {
                break LoopOutcome::Failed(message);
            }
            // 빈 도구 결과는 완료 신호
            if empty_result {
                break LoopOutcome::Completed;
            }
        };

        match &outcome {
            LoopOutcome::Completed => {
                info!(
                    task = %self.cancel.key(),
                    phase = %LoopPhase::Done,
                    records = records.len(),
                    "Agent loop done"
                )
            }
            LoopOutcome::Cancelled => {
                info!(task = %self.cancel.key(), phase = %LoopPhase::Cancelled, "Agent loop cancelled")
            }
            LoopOutcome::Failed(message) => {
                warn!(
                    task = %self.cancel.key(),
                    phase = %LoopPhase::Failed,
                    "Agent loop failed: {}", message
                )
            }
        }

        LoopRun { outcome, records }
    }
}

// ============================================================================
// 테스트
// ============================================================================
