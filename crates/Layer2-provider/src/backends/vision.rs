//! VisionBackend - observe+decide 백엔드
//!
//! 파싱된 스크린 상태를 직접 받아 한 번의 호출로 분석과 다음 액션을
//! JSON으로 돌려받습니다.

use super::{first_message, to_wire, ChatHttpClient};
use crate::backend::{Decision, DecisionBackend};
use crate::message::{prune_images, Message};
use async_trait::async_trait;
use deskpilot_core::executor::Action;
use deskpilot_core::observer::Observation;
use deskpilot_foundation::{Error, Result};
use serde_json::{json, Value};

/// 시스템 프롬프트
const SYSTEM_PROMPT: &str = "You are a computer-use agent controlling a desktop through \
screen observations. Respond with a JSON object: {\"Reasoning\": \"Status: \
SUCCESS|FAILED|FIRST_ACTION <analysis of the current screen>\", \"Next Action\": {\"action\": \
\"<shell|left_click|type|hotkey>\", ...} }. When the instruction is fully accomplished, set \
\"Next Action\" to \"None\".";

/// observe+decide vision 백엔드
pub struct VisionBackend {
    client: ChatHttpClient,
    model: String,
    max_tokens: u32,
    only_n_most_recent_images: usize,
}

impl VisionBackend {
    pub fn new(
        client: ChatHttpClient,
        model: impl Into<String>,
        max_tokens: u32,
        only_n_most_recent_images: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            only_n_most_recent_images,
        }
    }

    /// 모델 출력에서 JSON 오브젝트 파싱 (코드 펜스 허용)
    fn parse_json(content: &str) -> Result<Value> {
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(trimmed)
            .map_err(|e| Error::Decision(format!("Model output is not valid JSON: {}", e)))
    }

    /// "Next Action" 값을 Action으로 변환, 완료 신호면 None
    fn parse_next_action(next_action: Option<&Value>) -> Option<Action> {
        match next_action {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s == "None" || s.is_empty() => None,
            Some(Value::String(s)) => Some(Action::new(s.clone(), json!({}))),
            Some(Value::Object(obj)) => {
                let name = obj
                    .get("action")
                    .and_then(|a| a.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                Some(Action::new(name, Value::Object(obj.clone())))
            }
            Some(other) => Some(Action::new("unknown", other.clone())),
        }
    }
}

#[async_trait]
impl DecisionBackend for VisionBackend {
    fn name(&self) -> &str {
        "vision"
    }

    async fn decide(
        &self,
        history: &mut Vec<Message>,
        observation: &Observation,
    ) -> Result<Decision> {
        prune_images(history, self.only_n_most_recent_images);

        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
        messages.extend(history.iter().map(to_wire));

        // 관찰 결과는 히스토리에 누적하지 않고 현재 호출에만 첨부
        let screen_message = Message::user(format!(
            "Current screen elements:\n{}",
            observation.screen_info
        ));
        let screen_message = if observation.som_image_base64.is_empty() {
            screen_message
        } else {
            screen_message.with_image(&observation.som_image_base64)
        };
        messages.push(to_wire(&screen_message));

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "response_format": {"type": "json_object"},
        });

        let response = self.client.chat(body).await?;
        let message = first_message(&response)?;
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Decision("Model response has no content".to_string()))?;

        let parsed = Self::parse_json(content)?;
        let analysis = parsed
            .get("Reasoning")
            .and_then(|r| r.as_str())
            .map(str::to_string);
        let action = Self::parse_next_action(parsed.get("Next Action"));

        history.push(Message::assistant(content));

        Ok(Decision {
            analysis,
            action,
            raw: parsed,
        })
    }
}

// ============================================================================
// 테스트
// ============================================================================
