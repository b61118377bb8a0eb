//! InProcessBus - 프로세스 내 버스 구현
//!
//! 토픽별 핸들러 맵 기반의 기본 전송 계층입니다. 네트워크 전송 계층이
//! 없는 환경(테스트, 단일 프로세스 배포)에서 사용하며, 발행 이력을
//! 보관하여 상태 이벤트 검증에 활용할 수 있습니다.

use super::transport::{BusTransport, ProcedureHandler, SubscriptionHandler};
use async_trait::async_trait;
use deskpilot_foundation::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// 발행 이력 보관 한도
const DEFAULT_HISTORY_SIZE: usize = 1024;

/// 프로세스 내 버스
pub struct InProcessBus {
    /// 토픽별 구독 핸들러
    subscriptions: RwLock<HashMap<String, Vec<SubscriptionHandler>>>,

    /// 등록된 RPC 프로시저
    procedures: RwLock<HashMap<String, ProcedureHandler>>,

    /// 발행 이력 (topic, payload)
    history: RwLock<Vec<(String, Value)>>,

    /// 이력 한도
    history_size: usize,

    /// 연결 상태
    connected: AtomicBool,
}

impl InProcessBus {
    /// 새 버스 생성 (즉시 연결 상태)
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            procedures: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            history_size: DEFAULT_HISTORY_SIZE,
            connected: AtomicBool::new(true),
        }
    }

    /// 연결 상태 변경 (테스트용)
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// 등록된 프로시저 호출
    ///
    /// 원격 호출자 역할을 대신합니다 (전송 계층이 프로세스 내이므로).
    pub async fn call(&self, name: &str, payload: Value) -> Result<Value> {
        let handler = {
            let procedures = self.procedures.read().await;
            procedures
                .get(name)
                .cloned()
                .ok_or_else(|| Error::ProcedureNotFound(name.to_string()))?
        };
        handler(payload).await
    }

    /// 특정 토픽으로 발행된 페이로드 목록
    pub async fn published(&self, topic: &str) -> Vec<Value> {
        let history = self.history.read().await;
        history
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// 전체 발행 이력
    pub async fn history(&self) -> Vec<(String, Value)> {
        self.history.read().await.clone()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusTransport for InProcessBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::BusNotConnected);
        }

        trace!(topic = %topic, "Publishing message");

        // 이력에 추가
        {
            let mut history = self.history.write().await;
            history.push((topic.to_string(), payload.clone()));
            if history.len() > self.history_size {
                history.remove(0);
            }
        }

        // 구독자에게 전달 (토픽별 순서 유지를 위해 순차 await)
        let handlers = {
            let subscriptions = self.subscriptions.read().await;
            subscriptions.get(topic).cloned().unwrap_or_default()
        };
        for handler in handlers {
            handler(payload.clone()).await;
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: SubscriptionHandler) -> Result<()> {
        debug!(topic = %topic, "Registering subscription");
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    async fn register_procedure(&self, name: &str, handler: ProcedureHandler) -> Result<()> {
        debug!(procedure = %name, "Registering RPC procedure");
        let mut procedures = self.procedures.write().await;
        procedures.insert(name.to_string(), handler);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_publish_records_history() {
        let bus = InProcessBus::new();

        bus.publish("a.b.c", json!({"status": "started"}))
            .await
            .unwrap();
        bus.publish("a.b.c", json!({"status": "completed"}))
            .await
            .unwrap();
        bus.publish("x.y.z", json!({"status": "ready"})).await.unwrap();

        let events = bus.published("a.b.c").await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["status"], "started");
        assert_eq!(events[1]["status"], "completed");
    }

    #[tokio::test]
    async fn test_subscribe_delivers_in_order() {
        let bus = InProcessBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        bus.subscribe(
            "topic",
            Arc::new(move |_payload| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        )
        .await
        .unwrap();

        bus.publish("topic", json!({})).await.unwrap();
        bus.publish("topic", json!({})).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_call_registered_procedure() {
        let bus = InProcessBus::new();

        bus.register_procedure(
            "echo",
            Arc::new(|payload| Box::pin(async move { Ok(payload) })),
        )
        .await
        .unwrap();

        let result = bus.call("echo", json!({"k": 1})).await.unwrap();
        assert_eq!(result["k"], 1);

        let missing = bus.call("absent", json!({})).await;
        assert!(matches!(missing, Err(Error::ProcedureNotFound(_))));
    }

    #[tokio::test]
    async fn test_publish_fails_when_disconnected() {
        let bus = InProcessBus::new();
        bus.set_connected(false);
        let result = bus.publish("t", json!({})).await;
        assert!(matches!(result, Err(Error::BusNotConnected)));
    }
}
