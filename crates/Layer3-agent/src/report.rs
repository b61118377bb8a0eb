//! ProgressReporter - 상태 발행
//!
//! 태스크 전용 토픽(`<base>.<prompt_id>.<user_id>`)으로 상태 이벤트를
//! 발행합니다. 모든 메시지는 `user_id`, `prompt_id`, `status`,
//! `timestamp`(RFC 3339)를 포함합니다. 발행은 best-effort입니다 - 발행
//! 실패가 태스크 실행을 중단시키면 안 됩니다.

use crate::extract::ExtractedRecord;
use chrono::Utc;
use deskpilot_core::bus::ConnectionManager;
use deskpilot_foundation::{status_topic, TaskKey, TaskStatus};
use serde_json::{json, Value};

/// 태스크 상태 발행자
#[derive(Clone)]
pub struct ProgressReporter {
    conn: ConnectionManager,
    topic: String,
    key: TaskKey,

    /// 호출자의 상관관계 핸들. 설정되면 모든 이벤트에 실립니다.
    parent_request_id: Option<String>,
}

impl ProgressReporter {
    /// 태스크 키로 발행자 생성
    pub fn new(conn: ConnectionManager, topic_base: &str, key: TaskKey) -> Self {
        let topic = status_topic(topic_base, &key.user_id, &key.prompt_id);
        Self {
            conn,
            topic,
            key,
            parent_request_id: None,
        }
    }

    /// 상관관계 핸들 설정
    pub fn with_parent_request_id(mut self, parent_request_id: Option<String>) -> Self {
        self.parent_request_id = parent_request_id;
        self
    }

    /// 발행 토픽
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 공통 필드가 채워진 페이로드
    fn payload(&self, status: TaskStatus) -> Value {
        let mut payload = json!({
            "user_id": self.key.user_id,
            "prompt_id": self.key.prompt_id,
            "status": status.as_str(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(parent_request_id) = &self.parent_request_id {
            payload["parent_request_id"] = json!(parent_request_id);
        }
        payload
    }

    async fn publish(&self, payload: Value) {
        self.conn.publish_logged(&self.topic, payload).await;
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 검증 통과 직후 한 번
    pub async fn started(&self) {
        self.publish(self.payload(TaskStatus::Started)).await;
    }

    /// 추출된 레코드마다 한 번. 누적 목록이 아니라 새로 추출된 레코드
    /// 하나만 실어 보냅니다.
    pub async fn in_progress(&self, record: &ExtractedRecord) {
        let mut payload = self.payload(TaskStatus::InProgress);
        payload["response"] = serde_json::to_value(record).unwrap_or(Value::Null);
        payload["is_final"] = json!(false);
        self.publish(payload).await;
    }

    /// 정상 완료 시 정확히 한 번
    pub async fn completed(&self, execution_time_seconds: f64) {
        let mut payload = self.payload(TaskStatus::Completed);
        payload["execution_time_seconds"] = json!(execution_time_seconds);
        payload["is_final"] = json!(true);
        self.publish(payload).await;
    }

    /// 루프 실패 시 정확히 한 번
    pub async fn error(&self, message: &str) {
        let mut payload = self.payload(TaskStatus::Error);
        payload["message"] = json!(message);
        payload["is_final"] = json!(true);
        self.publish(payload).await;
    }

    /// Stop 핸들러 전용: stop 처리 시작
    pub async fn stopping(&self) {
        self.publish(self.payload(TaskStatus::Stopping)).await;
    }

    /// Stop 핸들러 전용: stop 완료
    pub async fn stopped(&self) {
        self.publish(self.payload(TaskStatus::Stopped)).await;
    }
}

// ============================================================================
// 테스트
// ============================================================================
