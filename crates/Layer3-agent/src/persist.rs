//! Result Persistence - 세션 결과 저장
//!
//! 태스크 시도마다 추출된 레코드를 JSON 파일 하나로 남깁니다. 저장은
//! best-effort입니다 - 실패는 로깅만 하고 발행된 상태에는 영향을 주지
//! 않습니다.

use crate::extract::ExtractedRecord;
use deskpilot_foundation::{Result, TaskKey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// SessionResultRecord
// ============================================================================

/// 영속화되는 세션 결과 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResultRecord {
    pub session_id: String,
    pub instruction: String,
    /// RFC 3339
    pub start_time: String,
    /// RFC 3339
    pub end_time: String,
    pub execution_time_seconds: f64,
    pub messages: Vec<ExtractedRecord>,
}

// ============================================================================
// SessionResultStore
// ============================================================================

/// 세션 결과 저장소
///
/// 파일명은 `<user>_<prompt>_<n>.json`이며, `n`은 충돌하지 않는 가장
/// 작은 정수(≥ 0)입니다. 같은 태스크의 재시도가 이전 기록을 덮어쓰지
/// 않습니다.
#[derive(Clone)]
pub struct SessionResultStore {
    output_dir: PathBuf,
}

impl SessionResultStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 충돌하지 않는 저장 경로 결정
    fn next_path(&self, key: &TaskKey) -> PathBuf {
        let mut index = 0u32;
        loop {
            let path = self.output_dir.join(format!("{}_{}.json", key, index));
            if !path.exists() {
                return path;
            }
            index += 1;
        }
    }

    /// 레코드 저장, 저장된 경로 반환
    pub fn save(&self, key: &TaskKey, record: &SessionResultRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.next_path(key);
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "Session result saved");
        Ok(path)
    }

    /// 저장 (best-effort). 실패는 로깅만 합니다.
    pub fn save_logged(&self, key: &TaskKey, record: &SessionResultRecord) -> Option<PathBuf> {
        match self.save(key, record) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(task = %key, "Error saving session result: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionResultRecord {
        SessionResultRecord {
            session_id: "42_7".to_string(),
            instruction: "open the settings app".to_string(),
            start_time: "2025-01-01T00:00:00+00:00".to_string(),
            end_time: "2025-01-01T00:00:03+00:00".to_string(),
            execution_time_seconds: 3.0,
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_save_uses_smallest_free_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionResultStore::new(dir.path());
        let key = TaskKey::new("42", "7");

        let first = store.save(&key, &record()).unwrap();
        let second = store.save(&key, &record()).unwrap();

        assert!(first.ends_with("42_7_0.json"));
        assert!(second.ends_with("42_7_1.json"));

        // 빈 자리가 생기면 재사용
        std::fs::remove_file(&first).unwrap();
        let third = store.save(&key, &record()).unwrap();
        assert!(third.ends_with("42_7_0.json"));
    }

    #[test]
    fn test_saved_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionResultStore::new(dir.path());

        let path = store.save(&TaskKey::new("42", "7"), &record()).unwrap();
        let loaded: SessionResultRecord =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.session_id, "42_7");
        assert_eq!(loaded.execution_time_seconds, 3.0);
    }

    #[test]
    fn test_save_logged_swallows_errors() {
        // 파일을 디렉토리 경로로 써서 실패 유도
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"not a dir").unwrap();

        let store = SessionResultStore::new(&blocked);
        assert!(store
            .save_logged(&TaskKey::new("42", "7"), &record())
            .is_none());
    }
}
