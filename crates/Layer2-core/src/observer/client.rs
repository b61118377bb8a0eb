//! ScreenParseClient - 스크린 파서 HTTP 클라이언트

use super::{Observation, ScreenObserver};
use async_trait::async_trait;
use deskpilot_foundation::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// probe 타임아웃
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// 스크린 파서 서버 클라이언트
///
/// `POST <parse_url>`로 스크린 캡처+파싱을 요청하고,
/// `GET <probe_url>`로 도달 가능 여부를 확인합니다.
pub struct ScreenParseClient {
    client: reqwest::Client,
    parse_url: String,
    probe_url: String,
}

impl ScreenParseClient {
    /// 새 클라이언트 생성
    pub fn new(parse_url: impl Into<String>, probe_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            parse_url: parse_url.into(),
            probe_url: probe_url.into(),
        }
    }
}

#[async_trait]
impl ScreenObserver for ScreenParseClient {
    async fn observe(&self) -> Result<Observation> {
        debug!(url = %self.parse_url, "Requesting screen parse");

        let response = self
            .client
            .post(&self.parse_url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::Observer(format!("Screen parser request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Observer(format!(
                "Screen parser returned status {}",
                response.status()
            )));
        }

        response
            .json::<Observation>()
            .await
            .map_err(|e| Error::Observer(format!("Invalid screen parser response: {}", e)))
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Observer(format!("Screen parser is not responding: {}", e)))?;

        if response.status().as_u16() != 200 {
            return Err(Error::Observer(
                "Screen parser is not responding".to_string(),
            ));
        }
        Ok(())
    }
}
