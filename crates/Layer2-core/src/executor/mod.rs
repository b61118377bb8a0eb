//! Action Executor - 액션 실행 협력자
//!
//! 결정 백엔드가 내린 액션을 OS 수준에서 실행합니다. 실행은 짧은
//! 하위 단계(sub-step)의 스트림으로 표현됩니다 - Agent Loop는 각 하위
//! 단계 사이에 취소를 검사하고, 렌더링된 메시지를 취소 재검사 *전에*
//! 진행 이벤트로 내보냅니다 (부분 실행도 기록이 남도록).

mod local;

pub use local::LocalExecutor;

use deskpilot_foundation::Result;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

// ============================================================================
// Action / ExecStep
// ============================================================================

/// 결정 백엔드가 기술한 다음 액션 ("tool use")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// 액션 이름 (예: "shell", "left_click", "type")
    pub name: String,

    /// 액션 입력
    pub input: serde_json::Value,
}

impl Action {
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

/// 실행 하위 단계 결과
#[derive(Debug, Clone)]
pub struct ExecStep {
    /// 진행 이벤트로 렌더링할 메시지
    pub rendered: String,

    /// 도구 실행 결과 내용 (히스토리에 추가됨, 빈 내용은 완료 신호)
    pub tool_result: Option<String>,
}

impl ExecStep {
    /// 렌더링 메시지만 있는 단계
    pub fn rendered(message: impl Into<String>) -> Self {
        Self {
            rendered: message.into(),
            tool_result: None,
        }
    }

    /// 도구 결과가 있는 단계
    pub fn with_result(message: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            rendered: message.into(),
            tool_result: Some(result.into()),
        }
    }
}

/// 실행 단계 스트림
pub type StepStream<'a> = BoxStream<'a, Result<ExecStep>>;

// ============================================================================
// ActionExecutor trait
// ============================================================================

/// 액션 실행 협력자 trait
///
/// 반환 스트림의 각 항목이 suspension point입니다.
pub trait ActionExecutor: Send + Sync {
    /// 액션 실행, 하위 단계 스트림 반환
    fn execute(&self, action: Action) -> StepStream<'_>;
}
