//! JSON 파일 저장소

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// JSON 저장소
///
/// 설정 파일과 태스크 결과 레코드가 공용으로 사용합니다.
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (~/.config/deskpilot/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join("deskpilot");
        Ok(Self::new(dir))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// 디렉토리 보장
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// JSON 로드
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.file_path(filename);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// JSON 로드 (Optional)
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        self.load(filename).map(Some)
    }

    /// JSON 저장
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Storage(format!("Failed to serialize: {}", e)))?;
        std::fs::write(&path, content)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// 파일 존재 여부
    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }
}
