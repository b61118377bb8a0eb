//! # deskpilot-agent
//!
//! DeskPilot의 핵심 오케스트레이션 레이어입니다.
//!
//! - **SessionRegistry**: 활성 태스크 레지스트리 + 태스크별 취소 토큰
//! - **AgentLoop**: observe → decide → execute 반복 상태 기계, 단계
//!   경계마다 협조적 취소 검사
//! - **StopHandler**: (user, prompt) 또는 stop_all 지시로 활성 세션을
//!   찾아 토큰을 세우고 stopping/stopped를 발행
//! - **InstructionHandler**: 인바운드 instruction 수락, 검증, 루프 실행,
//!   결과 마무리
//! - **SessionResultStore**: 태스크 시도별 감사 레코드 JSON 저장
//!
//! 동시성 모델: 한 태스크의 루프는 엄격히 순차적이지만, instruction
//! 수락과 stop 처리는 진행 중인 루프와 동시에 실행됩니다. 레지스트리와
//! 토큰이 유일한 공유 상태입니다.

pub mod agent_loop;
pub mod context;
pub mod extract;
pub mod handler;
pub mod persist;
pub mod registry;
pub mod report;
pub mod stop;
pub mod task;

pub use agent_loop::{AgentLoop, LoopOutcome, LoopPhase, LoopRun};
pub use context::WorkerContext;
pub use extract::{extract_record, ExtractedRecord};
pub use handler::InstructionHandler;
pub use persist::{SessionResultRecord, SessionResultStore};
pub use registry::SessionRegistry;
pub use report::ProgressReporter;
pub use stop::StopHandler;
pub use task::{InstructionRequest, StopRequest, StopResponse, StoppedTask};
