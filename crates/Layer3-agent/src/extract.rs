//! 진행 이벤트 레코드 추출
//!
//! 루프가 내보내는 렌더링 메시지에서 감사(audit) 레코드를 추출합니다.
//! `Analysis:` / `Next action:` 접두사로 시작하는 메시지만 의미가 있고,
//! 나머지(도구 출력 등)는 무시됩니다.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

const ANALYSIS_PREFIX: &str = "Analysis: ";
const NEXT_ACTION_PREFIX: &str = "Next action: ";

/// 분석 텍스트 선두의 상태 마커 (내용은 여러 줄일 수 있음)
fn status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^Status:\s*(\w+)(.*)").unwrap())
}

// ============================================================================
// ExtractedRecord
// ============================================================================

/// 추출된 응답 레코드
///
/// 태스크 지속 시간 동안 순서대로 누적되며, 완료 시 세션 JSON 레코드의
/// `messages` 배열로 저장됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// RFC 3339 타임스탬프
    pub timestamp: String,

    /// "analysis" | "next_action"
    #[serde(rename = "type")]
    pub kind: String,

    /// 레코드 내용. next_action이 JSON 오브젝트로 파싱되면 파싱된
    /// 형태로 저장됩니다.
    pub content: Value,
}

impl ExtractedRecord {
    fn new(kind: &str, content: Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.to_string(),
            content,
        }
    }
}

// ============================================================================
// 추출
// ============================================================================

/// 렌더링 메시지에서 레코드 추출
///
/// - `Analysis: Status: FAILED ...`는 건너뜁니다 (실패한 관찰은 재사용
///   가치가 없음). SUCCESS / FIRST_ACTION / 알 수 없는 상태는 추출하되,
///   `Status: <word>` 마커는 내용에서 제거합니다.
/// - `Next action:` 내용이 JSON 오브젝트로 파싱되면 파싱된 값을
///   저장합니다.
/// - 그 외 메시지는 `None`.
pub fn extract_record(rendered: &str) -> Option<ExtractedRecord> {
    if let Some(analysis) = rendered.strip_prefix(ANALYSIS_PREFIX) {
        let mut content = analysis.to_string();
        if let Some(capture) = status_regex().captures(analysis.trim_start()) {
            if capture[1].to_uppercase() == "FAILED" {
                return None;
            }
            // 상태 마커를 내용에서 제거
            content = capture[2].trim().to_string();
        }
        return Some(ExtractedRecord::new("analysis", Value::String(content)));
    }

    if let Some(next_action) = rendered.strip_prefix(NEXT_ACTION_PREFIX) {
        let content = match serde_json::from_str::<Value>(next_action) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => Value::String(next_action.to_string()),
        };
        return Some(ExtractedRecord::new("next_action", content));
    }

    None
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_status_marker_stripped() {
        let record = extract_record("Analysis: Status: SUCCESS the window is open").unwrap();
        assert_eq!(record.kind, "analysis");
        assert_eq!(record.content, "the window is open");

        let record =
            extract_record("Analysis: Status: FIRST_ACTION launching\nthe settings app").unwrap();
        assert_eq!(record.content, "launching\nthe settings app");
    }

    #[test]
    fn test_failed_analysis_skipped() {
        assert!(extract_record("Analysis: Status: FAILED could not find the button").is_none());
        // 대소문자 무관
        assert!(extract_record("Analysis: Status: failed no match").is_none());
    }

    #[test]
    fn test_unknown_status_extracted() {
        // 알 수 없는 상태 마커는 원본 동작대로 추출 (마커는 제거)
        let record = extract_record("Analysis: Status: RETRYING once more").unwrap();
        assert_eq!(record.content, "once more");

        // 마커가 없으면 내용 전체 유지
        let record = extract_record("Analysis: no status marker at all").unwrap();
        assert_eq!(record.content, "no status marker at all");
    }

    #[test]
    fn test_next_action_json_stored_parsed() {
        let record =
            extract_record(r#"Next action: {"action": "left_click", "coordinate": [1, 2]}"#)
                .unwrap();
        assert_eq!(record.kind, "next_action");
        assert_eq!(record.content["action"], "left_click");
    }

    #[test]
    fn test_next_action_plain_text() {
        let record = extract_record("Next action: scroll down").unwrap();
        assert_eq!(record.content, "scroll down");
    }

    #[test]
    fn test_other_messages_ignored() {
        assert!(extract_record("Tool output: done").is_none());
        assert!(extract_record("").is_none());
    }
}
