//! BusTransport trait - 버스 전송 계층 경계

use async_trait::async_trait;
use deskpilot_foundation::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// 토픽 구독 핸들러
pub type SubscriptionHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// RPC 프로시저 핸들러
///
/// 요청 페이로드를 받아 응답 페이로드를 반환합니다. 핸들러 내부 에러는
/// 에러 상태 응답으로 변환되어야 하며, 전송 계층으로 전파되지 않습니다.
pub type ProcedureHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// 버스 전송 계층 trait
///
/// publish/subscribe/RPC 연산은 여러 동시 컨텍스트에서 호출해도 안전해야
/// 합니다 (Stop Handler와 Agent Loop가 같은 연결을 공유합니다).
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// 토픽에 메시지 발행
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;

    /// 토픽 구독
    async fn subscribe(&self, topic: &str, handler: SubscriptionHandler) -> Result<()>;

    /// RPC 프로시저 등록
    async fn register_procedure(&self, name: &str, handler: ProcedureHandler) -> Result<()>;

    /// 연결 여부
    fn is_connected(&self) -> bool;
}
