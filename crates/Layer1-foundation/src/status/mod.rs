//! 태스크 상태 및 상태 토픽
//!
//! 태스크 생명주기: `pending → started → in_progress → {completed | error | stopped}`

use serde::{Deserialize, Serialize};
use std::fmt;

/// prompt_id가 없을 때 사용하는 기본값
pub const DEFAULT_PROMPT_ID: &str = "0";

// ============================================================================
// TaskStatus - 태스크 상태
// ============================================================================

/// 태스크 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 수락 대기 중
    Pending,

    /// 검증 통과, 루프 시작됨
    Started,

    /// 진행 중 (추출된 레코드마다 발행)
    InProgress,

    /// 정상 완료
    Completed,

    /// 협력자 실패로 종료
    Error,

    /// Stop 요청 처리 중
    Stopping,

    /// Stop 완료
    Stopped,
}

impl TaskStatus {
    /// 종료 상태 여부
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Stopped
        )
    }

    /// 활성 상태 여부
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Started | TaskStatus::InProgress)
    }

    /// 와이어 표현
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Started => "started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Stopping => "stopping",
            TaskStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// 상태 토픽
// ============================================================================

/// 태스크 전용 상태 토픽: `<base>.<prompt_id>.<user_id>`
pub fn status_topic(base: &str, user_id: &str, prompt_id: &str) -> String {
    format!("{}.{}.{}", base, prompt_id, user_id)
}

// ============================================================================
// 테스트
// ============================================================================
