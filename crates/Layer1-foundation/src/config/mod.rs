//! Worker Config - 워커 설정
//!
//! JSON 설정 파일 + 환경 변수 + CLI 오버라이드로 구성됩니다.
//! 설정 파일이 없으면 기본 설정을 생성합니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};

/// 설정 파일명
pub const WORKER_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Worker Config
// ============================================================================

/// DeskPilot 워커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// 결정 백엔드 모델 이름 (백엔드 variant 선택에 사용)
    pub model: String,

    /// LLM 프로바이더 ("openai" | "azure" | "anthropic")
    pub provider: String,

    /// LLM API 키
    pub api_key: String,

    /// Azure 리소스 이름 (provider = "azure"일 때 필수)
    pub azure_resource_name: String,

    /// 히스토리에 유지할 최근 이미지 수
    pub only_n_most_recent_images: usize,

    /// 스크린 파서 서버 주소 (host:port)
    pub screen_parser_url: String,

    /// 버스 접속 URL
    pub bus_url: String,

    /// 버스 realm
    pub realm: String,

    /// 상태 토픽 베이스
    pub topic_base: String,

    /// instruction RPC 프로시저 이름
    pub run_procedure: String,

    /// stop RPC 프로시저 이름
    pub stop_procedure: String,

    /// 추출된 레코드를 저장할 디렉토리
    pub output_dir: String,

    /// stopping → stopped 사이 유예 시간 (ms)
    pub stop_grace_ms: u64,

    /// 모델 호출 최대 토큰 수
    pub max_tokens: u32,

    /// OS 자동화 헬퍼 커맨드 (shell 이외의 액션 위임, 없으면 미실행)
    pub automation_command: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model: "screenparse + gpt-4o".to_string(),
            provider: "openai".to_string(),
            api_key: String::new(),
            azure_resource_name: String::new(),
            only_n_most_recent_images: 2,
            screen_parser_url: "localhost:8080".to_string(),
            bus_url: "wss://localhost:8445/wss".to_string(),
            realm: "realm1".to_string(),
            topic_base: "com.deskpilot.action".to_string(),
            run_procedure: "com.deskpilot.action.run".to_string(),
            stop_procedure: "com.deskpilot.action.stop".to_string(),
            output_dir: "saved_json".to_string(),
            stop_grace_ms: 500,
            max_tokens: 4096,
            automation_command: None,
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 설정 로드, 없으면 기본 설정 생성 후 저장
    pub fn load_or_create(store: &JsonStore) -> Result<Self> {
        match store.load_optional::<WorkerConfig>(WORKER_CONFIG_FILE)? {
            Some(config) => {
                tracing::info!("Configuration loaded from {}", store.base_dir().display());
                Ok(config)
            }
            None => {
                tracing::warn!(
                    "Configuration file not found at {}. Creating default configuration.",
                    store.base_dir().display()
                );
                let config = Self::default();
                if let Err(e) = store.save(WORKER_CONFIG_FILE, &config) {
                    tracing::error!("Error creating default configuration: {}", e);
                }
                Ok(config)
            }
        }
    }

    /// 환경 변수에서 API 키 오버라이드
    pub fn apply_env_overrides(&mut self) {
        let env_key = match self.provider.as_str() {
            "openai" | "azure" => std::env::var("OPENAI_API_KEY").ok(),
            "anthropic" => std::env::var("ANTHROPIC_API_KEY").ok(),
            _ => None,
        };
        if let Some(key) = env_key {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
    }

    /// 스크린 파서 parse 엔드포인트
    pub fn parse_url(&self) -> String {
        format!("http://{}/parse/", self.screen_parser_url)
    }

    /// 스크린 파서 probe 엔드포인트
    pub fn probe_url(&self) -> String {
        format!("http://{}/probe", self.screen_parser_url)
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.topic_base, "com.deskpilot.action");
        assert_eq!(config.stop_grace_ms, 500);
        assert_eq!(config.probe_url(), "http://localhost:8080/probe");
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let config = WorkerConfig::load_or_create(&store).unwrap();
        assert_eq!(config.output_dir, "saved_json");
        assert!(store.exists(WORKER_CONFIG_FILE));

        // 두 번째 로드는 파일에서
        let again = WorkerConfig::load_or_create(&store).unwrap();
        assert_eq!(again.topic_base, config.topic_base);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            store.file_path(WORKER_CONFIG_FILE),
            r#"{"model": "reasoning-1"}"#,
        )
        .unwrap();

        let config = WorkerConfig::load_or_create(&store).unwrap();
        assert_eq!(config.model, "reasoning-1");
        assert_eq!(config.realm, "realm1");
    }
}
