//! Message Bus Adapter
//!
//! 영속 연결 위의 publish/subscribe/RPC 프리미티브를 감쌉니다.
//! 네트워크 전송 계층 자체는 범위 밖이며 `BusTransport` trait이 경계입니다.

mod connection;
mod local;
mod transport;

pub use connection::ConnectionManager;
pub use local::InProcessBus;
pub use transport::{BusTransport, ProcedureHandler, SubscriptionHandler};
