//! 대화 메시지 타입

use serde::{Deserialize, Serialize};

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// 대화 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,

    /// 첨부 스크린샷 (base64 PNG)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image_base64: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            image_base64: None,
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            image_base64: None,
        }
    }

    /// 이미지 첨부
    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.image_base64 = Some(image_base64.into());
        self
    }
}

/// 최근 N개 이미지만 유지 (오래된 이미지는 토큰 절약을 위해 제거)
pub fn prune_images(history: &mut [Message], keep: usize) {
    let image_count = history.iter().filter(|m| m.image_base64.is_some()).count();
    if image_count <= keep {
        return;
    }

    let mut to_remove = image_count - keep;
    for message in history.iter_mut() {
        if to_remove == 0 {
            break;
        }
        if message.image_base64.is_some() {
            message.image_base64 = None;
            to_remove -= 1;
        }
    }
}
