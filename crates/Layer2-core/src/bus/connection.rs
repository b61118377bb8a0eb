//! ConnectionManager - 버스 연결 관리
//!
//! 전송 계층을 감싸 연결 대기/발행 편의를 제공합니다. 발행 실패는 로깅만
//! 하는 best-effort 경로(`publish_logged`)와 에러를 돌려주는 경로를 모두
//! 제공합니다 - 상태 이벤트 발행 실패가 태스크 실행을 중단시키면 안 되기
//! 때문입니다.

use super::transport::{BusTransport, ProcedureHandler, SubscriptionHandler};
use deskpilot_foundation::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 연결 폴링 간격
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 버스 연결 관리자
#[derive(Clone)]
pub struct ConnectionManager {
    transport: Arc<dyn BusTransport>,
}

impl ConnectionManager {
    /// 전송 계층으로 연결 관리자 생성
    pub fn new(transport: Arc<dyn BusTransport>) -> Self {
        Self { transport }
    }

    /// 연결될 때까지 대기
    pub async fn wait_until_connected(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.transport.is_connected() {
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "Bus not connected after {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
        }
        info!("Bus session joined");
        Ok(())
    }

    /// 연결 여부
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// 메시지 발행
    pub async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        self.transport.publish(topic, payload).await
    }

    /// 메시지 발행 (best-effort, 실패는 로깅만)
    pub async fn publish_logged(&self, topic: &str, payload: Value) {
        if let Err(e) = self.transport.publish(topic, payload).await {
            error!(topic = %topic, "Error publishing message: {}", e);
        }
    }

    /// 토픽 구독
    pub async fn subscribe(&self, topic: &str, handler: SubscriptionHandler) -> Result<()> {
        self.transport.subscribe(topic, handler).await
    }

    /// RPC 프로시저 등록
    pub async fn register_procedure(&self, name: &str, handler: ProcedureHandler) -> Result<()> {
        self.transport.register_procedure(name, handler).await
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InProcessBus;
    use serde_json::json;

    #[tokio::test]
    async fn test_wait_until_connected_immediate() {
        let bus = Arc::new(InProcessBus::new());
        let conn = ConnectionManager::new(bus);
        conn.wait_until_connected(Duration::from_millis(200))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_connected_timeout() {
        let bus = Arc::new(InProcessBus::new());
        bus.set_connected(false);
        let conn = ConnectionManager::new(bus);
        let result = conn.wait_until_connected(Duration::from_millis(150)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_publish_logged_swallows_errors() {
        let bus = Arc::new(InProcessBus::new());
        bus.set_connected(false);
        let conn = ConnectionManager::new(bus.clone());

        // 실패해도 패닉/에러 전파 없음
        conn.publish_logged("t", json!({"status": "started"})).await;
        assert!(bus.published("t").await.is_empty());
    }
}
