//! Screen Observer - 스크린 관찰 협력자
//!
//! 현재 UI 상태의 구조화된 기술을 얻습니다. 실제 캡처/파싱은 외부
//! 스크린 파서 서버가 수행하며, 이 모듈은 그 경계(trait + HTTP 클라이언트)
//! 만 규정합니다.

mod client;

pub use client::ScreenParseClient;

use async_trait::async_trait;
use deskpilot_foundation::Result;
use serde::{Deserialize, Serialize};

// ============================================================================
// Observation - 스크린 관찰 결과
// ============================================================================

/// 스크린 관찰 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    /// 라벨링된 스크린샷 (base64 PNG)
    #[serde(default)]
    pub som_image_base64: String,

    /// 파싱된 UI 요소 목록
    #[serde(default)]
    pub parsed_content_list: Vec<serde_json::Value>,

    /// 구조화된 접근성 텍스트 (모델 프롬프트에 삽입)
    #[serde(default)]
    pub screen_info: String,
}

// ============================================================================
// ScreenObserver trait
// ============================================================================

/// 스크린 관찰 협력자 trait
///
/// `observe`는 가장 지연이 큰 suspension point입니다 - Agent Loop는 이
/// 호출 직전/직후에 취소를 검사합니다.
#[async_trait]
pub trait ScreenObserver: Send + Sync {
    /// 현재 스크린 상태 관찰
    async fn observe(&self) -> Result<Observation>;

    /// 관찰 백엔드 도달 가능 여부 (INIT 검증에 사용)
    async fn probe(&self) -> Result<()>;
}
