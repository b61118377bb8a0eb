//! 태스크 와이어 타입
//!
//! instruction/stop 요청과 stop 응답의 JSON 형태입니다. 와이어 필드명은
//! 기존 컴패니언 앱과의 호환을 위해 그대로 유지합니다
//! (`instruction_to_vlm_agent`, `max_ETA_in_seconds`).

use deskpilot_foundation::{TaskKey, DEFAULT_PROMPT_ID};
use serde::{Deserialize, Serialize};

/// enhanced_instruction 사용 시 붙는 접두사
const REUSE_PREFIX: &str = "[REUSING PREVIOUS SUCCESSFUL EXECUTING]";

// ============================================================================
// InstructionRequest - 인바운드 instruction
// ============================================================================

/// 인바운드 instruction 페이로드
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionRequest {
    /// 상관관계 추적용 불투명 문자열
    pub parent_request_id: Option<String>,

    pub user_id: Option<String>,

    pub prompt_id: Option<String>,

    #[serde(rename = "instruction_to_vlm_agent")]
    pub instruction: Option<String>,

    pub os_to_control: Option<String>,

    pub actions_available_in_os: Vec<serde_json::Value>,

    /// 실행 시간 예산 (초). 참고용 메타데이터이며 데드라인으로
    /// 강제되지 않습니다.
    #[serde(rename = "max_ETA_in_seconds")]
    pub max_eta_seconds: Option<u64>,

    pub langchain_server: Option<bool>,

    /// 이전 성공 실행의 재사용 instruction. 있으면 원본 instruction을
    /// 대체합니다.
    pub enhanced_instruction: Option<String>,
}

impl InstructionRequest {
    /// prompt_id, 없으면 기본값
    pub fn prompt_id_or_default(&self) -> String {
        self.prompt_id
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT_ID.to_string())
    }

    /// 태스크 키 (user_id가 있을 때만)
    pub fn task_key(&self) -> Option<TaskKey> {
        let user_id = self.user_id.as_deref().filter(|u| !u.is_empty())?;
        Some(TaskKey::new(user_id, self.prompt_id_or_default()))
    }

    /// 루프에 전달할 실제 instruction
    ///
    /// enhanced_instruction이 있으면 재사용 접두사를 붙여 원본을
    /// 대체합니다.
    pub fn effective_instruction(&self) -> Option<String> {
        if let Some(enhanced) = self.enhanced_instruction.as_deref() {
            if !enhanced.is_empty() {
                return Some(format!("{}\n{}", REUSE_PREFIX, enhanced));
            }
        }
        self.instruction.clone().filter(|i| !i.is_empty())
    }
}

// ============================================================================
// StopRequest / StopResponse
// ============================================================================

/// Stop 요청 페이로드
///
/// `force`는 생략 시 true입니다 - 강제 stop은 fallback 플래그를 리셋하지
/// 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopRequest {
    pub user_id: Option<String>,
    pub prompt_id: Option<String>,
    pub stop_all: bool,
    pub force: bool,
}

impl Default for StopRequest {
    fn default() -> Self {
        Self {
            user_id: None,
            prompt_id: None,
            stop_all: false,
            force: true,
        }
    }
}

/// 중지된 태스크 식별자
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppedTask {
    pub user_id: String,
    pub prompt_id: String,
}

impl From<&TaskKey> for StoppedTask {
    fn from(key: &TaskKey) -> Self {
        Self {
            user_id: key.user_id.clone(),
            prompt_id: key.prompt_id.clone(),
        }
    }
}

/// Stop 요청 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    /// "success" | "warning" | "error"
    pub status: String,
    pub message: String,
    pub stopped_tasks: Vec<StoppedTask>,
}

impl StopResponse {
    pub fn success(message: impl Into<String>, stopped_tasks: Vec<StoppedTask>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            stopped_tasks,
        }
    }

    /// 매칭되는 활성 태스크가 없음 (에러가 아님 - 멱등한 stop)
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: "warning".to_string(),
            message: message.into(),
            stopped_tasks: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            stopped_tasks: Vec::new(),
        }
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let payload = json!({
            "user_id": "42",
            "prompt_id": "7",
            "instruction_to_vlm_agent": "open the settings app",
            "max_ETA_in_seconds": 120
        });
        let request: InstructionRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(request.instruction.as_deref(), Some("open the settings app"));
        assert_eq!(request.max_eta_seconds, Some(120));
        assert_eq!(request.task_key().unwrap().to_string(), "42_7");
    }

    #[test]
    fn test_prompt_id_defaults() {
        let request: InstructionRequest =
            serde_json::from_value(json!({"user_id": "42"})).unwrap();
        assert_eq!(request.prompt_id_or_default(), "0");
    }

    #[test]
    fn test_enhanced_instruction_replaces_original() {
        let request: InstructionRequest = serde_json::from_value(json!({
            "user_id": "42",
            "instruction_to_vlm_agent": "original",
            "enhanced_instruction": "replay the saved flow"
        }))
        .unwrap();
        let instruction = request.effective_instruction().unwrap();
        assert!(instruction.starts_with("[REUSING PREVIOUS SUCCESSFUL EXECUTING]\n"));
        assert!(instruction.ends_with("replay the saved flow"));
    }

    #[test]
    fn test_missing_user_has_no_key() {
        let request = InstructionRequest::default();
        assert!(request.task_key().is_none());
        assert!(request.effective_instruction().is_none());
    }

    #[test]
    fn test_stop_request_force_defaults_true() {
        let request: StopRequest = serde_json::from_value(json!({"user_id": "42"})).unwrap();
        assert!(!request.stop_all);
        assert!(request.force);

        let request: StopRequest =
            serde_json::from_value(json!({"user_id": "42", "force": false})).unwrap();
        assert!(!request.force);
    }
}
