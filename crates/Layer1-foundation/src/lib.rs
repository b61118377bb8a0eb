//! # deskpilot-foundation
//!
//! Foundation layer for DeskPilot:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Cancel: 협조적 취소 (`CancellationToken`, `TaskKey`, `CancelContext`)
//! - Status: 태스크 상태 및 상태 토픽 (`TaskStatus`, `status_topic`)
//! - Config: 워커 설정 (`WorkerConfig`)
//! - Storage: JSON 파일 저장소 (`JsonStore`)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Instruction (bus RPC)          Stop Request (RPC)   │
//! │        │                              │              │
//! │        ▼                              ▼              │
//! │  Session Registry  ◄──────────  Stop Handler         │
//! │        │   CancellationToken (shared)                │
//! │        ▼                                             │
//! │  Agent Loop: observe → decide → execute → …          │
//! │        │                                             │
//! │        ▼                                             │
//! │  Status Topic (<base>.<prompt_id>.<user_id>)         │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod status;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Cancel (협조적 취소)
// ============================================================================
pub use cancel::{CancelContext, CancellationToken, TaskKey};

// ============================================================================
// Status (태스크 상태)
// ============================================================================
pub use status::{status_topic, TaskStatus, DEFAULT_PROMPT_ID};

// ============================================================================
// Config
// ============================================================================
pub use config::{WorkerConfig, WORKER_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
