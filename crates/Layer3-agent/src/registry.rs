//! Session Registry - 활성 태스크 레지스트리
//!
//! 프로세스 전역 `user_id → prompt_id` 매핑과 태스크별 취소 토큰
//! 매핑입니다. 인바운드 instruction 핸들러와 Stop 핸들러가 동시에
//! 접근하므로 모든 상태는 `tokio::sync::RwLock` 뒤에 있습니다.
//!
//! 인메모리 전용입니다. 현재 실행 중인 태스크만 추적하므로 프로세스
//! 재시작 시 휘발되는 것이 의도된 동작입니다.

use deskpilot_foundation::{CancellationToken, TaskKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 활성 태스크 레지스트리
#[derive(Default)]
pub struct SessionRegistry {
    /// user_id → 활성 prompt_id (user당 하나, last-writer-wins)
    active: RwLock<HashMap<String, String>>,

    /// 태스크별 취소 토큰. 한 번 생성된 토큰의 identity는 안정적입니다 -
    /// 이후의 register가 기존 토큰을 교체하지 않습니다.
    tokens: RwLock<HashMap<TaskKey, Arc<CancellationToken>>>,

    /// 프로세스 전역 fallback 플래그. 참고용(advisory)이며, 루프는
    /// 태스크별 토큰만 권위로 취급합니다.
    fallback: Arc<CancellationToken>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 등록 / 조회
    // ========================================================================

    /// 활성 태스크 등록 (last-writer-wins)
    ///
    /// 같은 user_id의 기존 항목은 덮어씁니다. 에러가 아닙니다 - user당
    /// 단일 비행(single-flight) 보장이 필요하면 호출자가 따로 쌓아야
    /// 합니다.
    pub async fn register(&self, user_id: impl Into<String>, prompt_id: impl Into<String>) {
        let user_id = user_id.into();
        let prompt_id = prompt_id.into();
        debug!(user_id = %user_id, prompt_id = %prompt_id, "Registering active task");
        self.active.write().await.insert(user_id, prompt_id);
    }

    /// user의 현재 활성 prompt_id
    pub async fn lookup_active_prompt(&self, user_id: &str) -> Option<String> {
        self.active.read().await.get(user_id).cloned()
    }

    /// 해당 키가 현재 등록된 활성 태스크인지
    pub async fn is_active(&self, key: &TaskKey) -> bool {
        self.active
            .read()
            .await
            .get(&key.user_id)
            .map(|p| p == &key.prompt_id)
            .unwrap_or(false)
    }

    /// 등록 해제. 이미 없으면 no-op입니다 - 태스크 완료와 동시 stop이
    /// 해제를 경합할 수 있습니다.
    pub async fn unregister(&self, user_id: &str) {
        self.active.write().await.remove(user_id);
    }

    /// 등록된 prompt가 키와 일치할 때만 해제
    ///
    /// 완료된 루프가, 그 사이 같은 user로 새로 등록된(last-writer-wins)
    /// 태스크의 항목을 지우지 않도록 합니다.
    pub async fn unregister_task(&self, key: &TaskKey) {
        let mut active = self.active.write().await;
        if active.get(&key.user_id) == Some(&key.prompt_id) {
            active.remove(&key.user_id);
        }
    }

    // ========================================================================
    // 토큰
    // ========================================================================

    /// 태스크 취소 토큰 조회, 없으면 생성
    ///
    /// 토큰 identity는 생성 후 안정적입니다. 루프와 Stop 핸들러가 같은
    /// 토큰 오브젝트를 공유해야 취소가 전파됩니다.
    pub async fn set_token(&self, key: &TaskKey) -> Arc<CancellationToken> {
        let mut tokens = self.tokens.write().await;
        tokens
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CancellationToken::new()))
            .clone()
    }

    /// 토큰 제거 (태스크 종료 시)
    pub async fn remove_token(&self, key: &TaskKey) {
        self.tokens.write().await.remove(key);
    }

    /// 전역 fallback 토큰
    pub fn fallback(&self) -> Arc<CancellationToken> {
        self.fallback.clone()
    }

    // ========================================================================
    // 열거
    // ========================================================================

    /// 모든 활성 태스크
    pub async fn active_tasks(&self) -> Vec<TaskKey> {
        self.active
            .read()
            .await
            .iter()
            .map(|(user, prompt)| TaskKey::new(user.clone(), prompt.clone()))
            .collect()
    }

    /// 특정 user의 활성 태스크
    pub async fn tasks_for_user(&self, user_id: &str) -> Vec<TaskKey> {
        self.active
            .read()
            .await
            .iter()
            .filter(|(user, _)| user.as_str() == user_id)
            .map(|(user, prompt)| TaskKey::new(user.clone(), prompt.clone()))
            .collect()
    }

    /// 활성 태스크 수
    pub async fn len(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.active.read().await.is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================
