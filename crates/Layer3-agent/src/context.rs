//! WorkerContext - 명시적 공유 상태
//!
//! 모듈 전역 상태 대신 프로세스 진입점이 소유하고 `Arc`로 전달되는
//! 컨텍스트 오브젝트입니다. 테스트에서 독립 인스턴스를 여러 개 만들 수
//! 있습니다.

use crate::persist::SessionResultStore;
use crate::registry::SessionRegistry;
use deskpilot_core::bus::{BusTransport, ConnectionManager};
use deskpilot_core::executor::{ActionExecutor, LocalExecutor};
use deskpilot_core::observer::{ScreenObserver, ScreenParseClient};
use deskpilot_foundation::{Result, WorkerConfig};
use deskpilot_provider::{build_backend, DecisionBackend};
use std::sync::Arc;

/// 워커 공유 상태
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub registry: Arc<SessionRegistry>,
    pub conn: ConnectionManager,
    pub observer: Arc<dyn ScreenObserver>,
    pub backend: Arc<dyn DecisionBackend>,
    pub executor: Arc<dyn ActionExecutor>,
    pub results: SessionResultStore,
}

impl WorkerContext {
    /// 설정으로부터 프로덕션 협력자를 구성
    pub fn from_config(config: WorkerConfig, transport: Arc<dyn BusTransport>) -> Result<Self> {
        let backend = build_backend(&config)?;
        let observer = Arc::new(ScreenParseClient::new(
            config.parse_url(),
            config.probe_url(),
        ));
        let executor = Arc::new(match &config.automation_command {
            Some(command) => LocalExecutor::new().with_automation_command(command.clone()),
            None => LocalExecutor::new(),
        });
        let results = SessionResultStore::new(&config.output_dir);

        Ok(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            conn: ConnectionManager::new(transport),
            observer,
            backend,
            executor,
            results,
        })
    }

    /// 협력자를 직접 주입해 구성 (테스트용)
    pub fn with_collaborators(
        config: WorkerConfig,
        transport: Arc<dyn BusTransport>,
        observer: Arc<dyn ScreenObserver>,
        backend: Arc<dyn DecisionBackend>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let results = SessionResultStore::new(&config.output_dir);
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            conn: ConnectionManager::new(transport),
            observer,
            backend,
            executor,
            results,
        }
    }
}
