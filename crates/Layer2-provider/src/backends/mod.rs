//! Backend implementations

pub mod reasoning;
pub mod vision;

use crate::backend::{BackendKind, DecisionBackend};
use crate::message::{Message, MessageRole};
use deskpilot_foundation::{Error, Result, WorkerConfig};
use reasoning::ReasoningBackend;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use vision::VisionBackend;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const AZURE_API_VERSION: &str = "2024-08-01-preview";

const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 1000;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// attempt번째(0부터) 재시도 지연: 지수 증가, 상한, 시계 기반 ±20% 지터
fn retry_delay(attempt: u32) -> Duration {
    let base = (INITIAL_RETRY_DELAY_MS << attempt.min(16)).min(MAX_RETRY_DELAY_MS) as f64;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let jitter = 0.8 + ((nanos % 1000) as f64 / 1000.0) * 0.4;
    Duration::from_millis((base * jitter) as u64)
}

/// 설정으로부터 결정 백엔드 구성
///
/// 모델 이름으로 variant를 한 번 선택합니다. vision 모델 이름의
/// `"screenparse + "` 접두사는 와이어 모델 이름에서 제거됩니다.
pub fn build_backend(config: &WorkerConfig) -> Result<Arc<dyn DecisionBackend>> {
    let kind = BackendKind::from_model(&config.model)?;
    let wire_model = wire_model_name(&config.model);

    let client = if config.provider == "azure" {
        if config.azure_resource_name.trim().is_empty() {
            return Err(Error::Config(
                "Azure Resource Name is required when using Azure OpenAI".to_string(),
            ));
        }
        ChatHttpClient::azure(&config.azure_resource_name, &wire_model, &config.api_key)
    } else {
        ChatHttpClient::openai(&config.api_key)
    };

    let backend: Arc<dyn DecisionBackend> = match kind {
        BackendKind::Reasoning => Arc::new(ReasoningBackend::new(
            client,
            wire_model,
            config.max_tokens,
            config.only_n_most_recent_images,
        )),
        BackendKind::Vision => Arc::new(VisionBackend::new(
            client,
            wire_model,
            config.max_tokens,
            config.only_n_most_recent_images,
        )),
    };
    Ok(backend)
}

/// 와이어 모델 이름 (variant 접두사 제거)
pub fn wire_model_name(model: &str) -> String {
    model
        .strip_prefix("screenparse + ")
        .unwrap_or(model)
        .to_string()
}

/// chat completions 엔드포인트 공용 클라이언트
///
/// 두 백엔드 variant가 공유합니다. Azure는 `api-key` 헤더,
/// 그 외에는 `Authorization: Bearer`를 사용합니다.
pub(crate) struct ChatHttpClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    azure: bool,
}

impl ChatHttpClient {
    /// OpenAI 호환 엔드포인트용 클라이언트
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(OPENAI_API_URL, api_key, false)
    }

    /// Azure 엔드포인트용 클라이언트
    pub fn azure(resource_name: &str, deployment: &str, api_key: impl Into<String>) -> Self {
        let endpoint = format!(
            "https://{}.openai.azure.com/openai/deployments/{}/chat/completions?api-version={}",
            resource_name, deployment, AZURE_API_VERSION
        );
        Self::with_endpoint(endpoint, api_key, true)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        azure: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            azure,
        }
    }

    /// chat completions 호출 (지수 백오프 재시도)
    pub async fn chat(&self, body: Value) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.chat_once(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = retry_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        "Model call failed, retrying in {:?}: {}", delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn chat_once(&self, body: &Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "Calling decision model");

        let mut request = self.client.post(&self.endpoint).json(body);
        request = if self.azure {
            request.header("api-key", &self.api_key)
        } else {
            request.bearer_auth(&self.api_key)
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("Model request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(Error::Http(format!("Model returned status {}", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Decision(format!(
                "Model returned status {}: {}",
                status, text
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Decision(format!("Invalid model response: {}", e)))
    }
}

/// 메시지를 chat completions 와이어 형식으로 변환
///
/// Tool 역할은 tool_call_id 없이 보낼 수 없으므로 user 메시지로 내립니다.
pub(crate) fn to_wire(message: &Message) -> Value {
    let role = match message.role {
        MessageRole::User | MessageRole::Tool => "user",
        MessageRole::Assistant => "assistant",
    };

    match &message.image_base64 {
        Some(image) => json!({
            "role": role,
            "content": [
                {"type": "text", "text": message.content},
                {
                    "type": "image_url",
                    "image_url": {"url": format!("data:image/png;base64,{}", image)}
                }
            ]
        }),
        None => json!({"role": role, "content": message.content}),
    }
}

/// 응답에서 첫 번째 choice의 message 추출
pub(crate) fn first_message(response: &Value) -> Result<&Value> {
    response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| Error::Decision("Model response has no choices".to_string()))
}

// ============================================================================
// 테스트
// ============================================================================
