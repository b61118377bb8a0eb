//! 협조적 취소 (Cooperative Cancellation)
//!
//! 태스크 실행 컨텍스트와 stop 처리 경로가 공유하는 취소 플래그입니다.
//! 취소는 선점(preemptive)이 아니라 협조적입니다 - Agent Loop가 각 단계
//! 경계(phase boundary)에서 플래그를 폴링합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// TaskKey - 태스크 식별자
// ============================================================================

/// 태스크 식별자 `(user_id, prompt_id)`
///
/// 문자열 연결 키(`"{user_id}_{prompt_id}"`) 대신 구조화된 키를 사용합니다.
/// `Display`는 파일명/세션 ID용 합성 형태를 출력합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub user_id: String,
    pub prompt_id: String,
}

impl TaskKey {
    /// 새 키 생성
    pub fn new(user_id: impl Into<String>, prompt_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            prompt_id: prompt_id.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user_id, self.prompt_id)
    }
}

// ============================================================================
// CancellationToken - 취소 토큰
// ============================================================================

/// 취소 토큰
///
/// 한 번 `trigger()`되면 같은 태스크 수명 내에서 다시 false로 돌아가지
/// 않습니다. 토큰은 태스크별로 생성되며 재사용되지 않습니다.
#[derive(Debug, Default)]
pub struct CancellationToken {
    stop: AtomicBool,
}

impl CancellationToken {
    /// 새 토큰 생성 (stop = false)
    pub fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
        }
    }

    /// stop 플래그 설정 (멱등)
    pub fn trigger(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// stop 요청 여부
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// 플래그 리셋
    ///
    /// 태스크별 토큰에는 사용하지 않습니다. 전역 fallback 토큰에 대해서만
    /// Stop Handler가 비강제(non-forced) stop 완료 후 호출합니다.
    pub fn reset(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// CancelContext - 루프에 전달되는 취소 컨텍스트
// ============================================================================

/// Agent Loop에 전달되는 취소 컨텍스트
///
/// 태스크별 토큰이 권위(authoritative)이며, 전역 fallback 토큰은 참고용
/// (advisory)입니다. 모든 태스크는 시작 시 자신의 토큰을 발급받으므로
/// 루프는 태스크별 토큰만 검사합니다 - 강제 stop 이후 남은 fallback
/// 플래그가 이후 무관한 태스크를 취소시키지 않습니다.
#[derive(Debug, Clone)]
pub struct CancelContext {
    key: TaskKey,
    token: Arc<CancellationToken>,
}

impl CancelContext {
    /// 새 컨텍스트 생성
    pub fn new(key: TaskKey, token: Arc<CancellationToken>) -> Self {
        Self { key, token }
    }

    /// 태스크 키
    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    /// 취소 요청 여부 (단계 경계마다 호출)
    pub fn is_cancelled(&self) -> bool {
        self.token.is_stopped()
    }
}

// ============================================================================
// 테스트
// ============================================================================
