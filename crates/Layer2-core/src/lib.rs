//! # deskpilot-core
//!
//! Core runtime for DeskPilot:
//! - Bus: publish/subscribe/RPC 어댑터 (`BusTransport`, `ConnectionManager`, `InProcessBus`)
//! - Observer: 스크린 관찰 (`ScreenObserver`, `ScreenParseClient`)
//! - Executor: 액션 실행 (`ActionExecutor`, `LocalExecutor`)
//!
//! 외부 협력자(스크린 파서, OS 자동화, 버스 전송 계층)는 trait 경계에서만
//! 규정됩니다.

pub mod bus;
pub mod executor;
pub mod observer;

// Bus
pub use bus::{
    BusTransport, ConnectionManager, InProcessBus, ProcedureHandler, SubscriptionHandler,
};

// Observer
pub use observer::{Observation, ScreenObserver, ScreenParseClient};

// Executor
pub use executor::{Action, ActionExecutor, ExecStep, LocalExecutor, StepStream};
