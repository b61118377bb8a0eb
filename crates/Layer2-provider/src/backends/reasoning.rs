//! ReasoningBackend - 단발 reasoning 백엔드
//!
//! 전체 메시지 히스토리를 누적하고 일반적인 tool-call 의미론을 기대합니다.
//! 관찰된 스크린 정보는 매 결정마다 user 메시지로 히스토리에 추가됩니다.

use super::{first_message, to_wire, ChatHttpClient};
use crate::backend::{Decision, DecisionBackend};
use crate::message::{prune_images, Message};
use async_trait::async_trait;
use deskpilot_core::executor::Action;
use deskpilot_core::observer::Observation;
use deskpilot_foundation::{Error, Result};
use serde_json::{json, Value};

/// 스크린 정보 프리앰블
const SCREEN_INFO_PREAMBLE: &str = "Below is the structured accessibility information of the \
current UI screen, which includes text and icons you can operate on. Take this information \
into account when predicting the next action:";

/// 시스템 프롬프트
const SYSTEM_PROMPT: &str = "You are a computer-use agent. Decide the next OS-level action to \
accomplish the user's instruction. Call exactly one tool per turn. When the task is complete, \
reply without calling any tool.";

/// 단발 reasoning 백엔드
pub struct ReasoningBackend {
    client: ChatHttpClient,
    model: String,
    max_tokens: u32,
    only_n_most_recent_images: usize,
}

impl ReasoningBackend {
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

    /// 노출하는 도구 정의
    fn tool_definitions() -> Value {
        json!([
            {
                "type": "function",
                "function": {
                    "name": "shell",
                    "description": "Run a shell command on the controlled machine",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "command": {"type": "string"}
                        },
                        "required": ["command"]
                    }
                }
            },
            {
                "type": "function",
                "function": {
                    "name": "computer",
                    "description": "Perform a GUI action (click, type, hotkey, scroll)",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "action": {"type": "string"},
                            "coordinate": {"type": "array", "items": {"type": "integer"}},
                            "text": {"type": "string"}
                        },
                        "required": ["action"]
                    }
                }
            }
        ])
    }
}

#[async_trait]
impl DecisionBackend for ReasoningBackend {
    fn name(&self) -> &str {
        "reasoning"
    }

    async fn decide(
        &self,
        history: &mut Vec<Message>,
        observation: &Observation,
    ) -> Result<Decision> {
        // 스크린 정보를 히스토리에 추가
        let mut screen_message = Message::user(format!(
            "{}\n{}",
            SCREEN_INFO_PREAMBLE, observation.screen_info
        ));
        if !observation.som_image_base64.is_empty() {
            screen_message = screen_message.with_image(&observation.som_image_base64);
        }
        history.push(screen_message);
        prune_images(history, self.only_n_most_recent_images);

        // 와이어 메시지 구성
        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
        messages.extend(history.iter().map(to_wire));

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "tools": Self::tool_definitions(),
        });

        let response = self.client.chat(body).await?;
        let message = first_message(&response)?;

        let analysis = message
            .get("content")
            .and_then(|c| c.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(text) = &analysis {
            history.push(Message::assistant(text.clone()));
        }

        // tool_calls가 없으면 완료 신호
        let tool_call = match message
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .and_then(|t| t.first())
        {
            Some(call) => call,
            None => {
                return Ok(Decision {
                    analysis,
                    action: None,
                    raw: response.clone(),
                })
            }
        };

        let function = tool_call
            .get("function")
            .ok_or_else(|| Error::Decision("Tool call has no function".to_string()))?;
        let name = function
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| Error::Decision("Tool call has no name".to_string()))?;
        let arguments = function
            .get("arguments")
            .and_then(|a| a.as_str())
            .unwrap_or("{}");
        let input: Value = serde_json::from_str(arguments)
            .map_err(|e| Error::Decision(format!("Invalid tool arguments: {}", e)))?;

        Ok(Decision {
            analysis,
            action: Some(Action::new(name, input)),
            raw: response.clone(),
        })
    }
}
