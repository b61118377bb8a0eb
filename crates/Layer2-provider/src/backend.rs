//! DecisionBackend trait - 결정 함수 경계
//!
//! `(history, observation) -> (Action | Done, raw_model_output)`

use crate::message::Message;
use async_trait::async_trait;
use deskpilot_core::executor::Action;
use deskpilot_core::observer::Observation;
use deskpilot_foundation::{Error, Result};

// ============================================================================
// Decision
// ============================================================================

/// 결정 백엔드 출력
#[derive(Debug, Clone)]
pub struct Decision {
    /// 모델의 상황 분석 텍스트 (진행 이벤트로 추출됨)
    pub analysis: Option<String>,

    /// 다음 액션, `None`이면 태스크 완료 신호
    pub action: Option<Action>,

    /// 원본 모델 출력
    pub raw: serde_json::Value,
}

impl Decision {
    /// 완료 신호
    pub fn done(raw: serde_json::Value) -> Self {
        Self {
            analysis: None,
            action: None,
            raw,
        }
    }

    /// 완료 여부
    pub fn is_done(&self) -> bool {
        self.action.is_none()
    }
}

// ============================================================================
// DecisionBackend trait
// ============================================================================

/// 결정 백엔드 trait
///
/// 호출은 suspend될 수 있습니다. Agent Loop는 이 호출 직후, 어떤 부수효과
/// 있는 액션도 실행되기 전에 취소를 검사합니다.
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    /// 백엔드 이름 (로깅용)
    fn name(&self) -> &str;

    /// 다음 액션 결정
    async fn decide(
        &self,
        history: &mut Vec<Message>,
        observation: &Observation,
    ) -> Result<Decision>;
}

// ============================================================================
// BackendKind - 모델 이름 → 백엔드 variant
// ============================================================================

/// 지원되는 백엔드 variant의 닫힌 집합
///
/// 모델 이름 문자열에 대한 동적 디스패치 대신 태스크 생성 시 한 번
/// 선택되는 태그된 variant를 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// 단발 reasoning 백엔드 (전체 히스토리 + tool-call 의미론)
    Reasoning,

    /// observe+decide vision 백엔드 (파싱된 스크린 상태 직접 수신)
    Vision,
}

/// vision 백엔드를 선택하는 모델 이름
const VISION_MODELS: &[&str] = &[
    "screenparse + gpt-4o",
    "screenparse + o1",
    "screenparse + o3-mini",
    "screenparse + r1",
    "screenparse + qwen2.5vl",
];

/// reasoning 백엔드를 선택하는 모델 이름
const REASONING_MODELS: &[&str] = &["claude-3-5-sonnet-20241022"];

impl BackendKind {
    /// 모델 이름으로 variant 선택
    pub fn from_model(model: &str) -> Result<Self> {
        if REASONING_MODELS.contains(&model) {
            Ok(BackendKind::Reasoning)
        } else if VISION_MODELS.contains(&model) {
            Ok(BackendKind::Vision)
        } else {
            Err(Error::BackendNotSupported(model.to_string()))
        }
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_selection() {
        assert_eq!(
            BackendKind::from_model("claude-3-5-sonnet-20241022").unwrap(),
            BackendKind::Reasoning
        );
        assert_eq!(
            BackendKind::from_model("screenparse + gpt-4o").unwrap(),
            BackendKind::Vision
        );
        assert!(BackendKind::from_model("gpt-2").is_err());
    }

    #[test]
    fn test_decision_done_sentinel() {
        let decision = Decision::done(serde_json::json!({}));
        assert!(decision.is_done());
    }
}
