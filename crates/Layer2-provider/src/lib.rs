//! # deskpilot-provider
//!
//! Decision backend abstraction for DeskPilot.
//! 두 모델 계열이 하나의 `DecisionBackend` 인터페이스 뒤에 있습니다:
//!
//! - **Reasoning**: 전체 메시지 히스토리를 누적하고 일반적인 tool-call
//!   의미론을 기대하는 단발(single-shot) 백엔드
//! - **Vision**: 파싱된 스크린 상태를 직접 받는 observe+decide 백엔드
//!
//! 백엔드는 태스크 시작 시 모델 이름 문자열로 한 번 선택되며
//! (`BackendKind`), 한 태스크 안에서 혼용되지 않습니다.

pub mod backend;
pub mod backends;
pub mod message;

pub use backend::{BackendKind, Decision, DecisionBackend};
pub use backends::reasoning::ReasoningBackend;
pub use backends::vision::VisionBackend;
pub use backends::{build_backend, wire_model_name};
pub use message::{prune_images, Message, MessageRole};
