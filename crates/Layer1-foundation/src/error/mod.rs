//! Error types for DeskPilot
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DeskPilot 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 버스 관련
    // ========================================================================
    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Bus not connected")]
    BusNotConnected,

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    // ========================================================================
    // 협력자(Collaborator) 관련
    // ========================================================================
    #[error("Screen observer error: {0}")]
    Observer(String),

    #[error("Decision backend error: {0}")]
    Decision(String),

    #[error("Backend not supported: {0}")]
    BackendNotSupported(String),

    #[error("Action execution failed: {action} - {message}")]
    ActionExecution { action: String, message: String },

    // ========================================================================
    // 태스크 관련
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Http(_) | Error::BusNotConnected
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::Validation(_)
                | Error::Cancelled
        )
    }

    /// Action 실행 에러 생성 헬퍼
    pub fn action_execution(action: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ActionExecution {
            action: action.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
