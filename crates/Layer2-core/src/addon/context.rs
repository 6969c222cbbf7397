//! AddonContext - addon이 호스트와 상호작용하는 인터페이스

use crate::host::HostApi;
use pawnctl_foundation::{EventBus, EventCategory, HostEvent, PawnctlConfig};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

// ============================================================================
// AddonContext
// ============================================================================

/// Addon에 전달되는 컨텍스트 (activate 시)
pub struct AddonContext {
    /// 소유 addon 이름
    addon_name: String,

    /// 설정 (읽기 전용)
    config: Arc<PawnctlConfig>,

    /// 이벤트 버스
    event_bus: Arc<EventBus>,

    /// 호스트 API
    host: Arc<dyn HostApi>,

    /// addon 디렉토리
    addon_dir: PathBuf,

    /// addon 상태 저장소 (메모리)
    state: RwLock<HashMap<String, Value>>,
}

impl AddonContext {
    pub fn new(
        addon_name: impl Into<String>,
        config: Arc<PawnctlConfig>,
        event_bus: Arc<EventBus>,
        host: Arc<dyn HostApi>,
        addon_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            addon_name: addon_name.into(),
            config,
            event_bus,
            host,
            addon_dir: addon_dir.into(),
            state: RwLock::new(HashMap::new()),
        }
    }

    pub fn addon_name(&self) -> &str {
        &self.addon_name
    }

    pub fn config(&self) -> &PawnctlConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn host(&self) -> &Arc<dyn HostApi> {
        &self.host
    }

    pub fn addon_dir(&self) -> &Path {
        &self.addon_dir
    }

    pub fn project_dir(&self) -> &Path {
        self.host.project_dir()
    }

    // ========================================================================
    // 로깅 (addon 이름 태그)
    // ========================================================================

    pub fn log_info(&self, message: &str) {
        info!(addon = %self.addon_name, "{}", message);
    }

    pub fn log_warn(&self, message: &str) {
        warn!(addon = %self.addon_name, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(addon = %self.addon_name, "{}", message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!(addon = %self.addon_name, "{}", message);
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 사용자 정의 이벤트 발행
    pub async fn emit(&self, event_type: impl Into<String>, data: Value) {
        let event = HostEvent::new(event_type, EventCategory::Custom)
            .with_source(self.addon_name.clone())
            .with_data(data);
        self.event_bus.publish(event).await;
    }

    // ========================================================================
    // 상태
    // ========================================================================

    pub async fn get_state(&self, key: &str) -> Option<Value> {
        let state = self.state.read().await;
        state.get(key).cloned()
    }

    pub async fn set_state(&self, key: impl Into<String>, value: Value) {
        let mut state = self.state.write().await;
        state.insert(key.into(), value);
    }
}

// ============================================================================
// AddonEnvironment - 컨텍스트 생성에 필요한 공유 자원
// ============================================================================

/// 로더가 addon마다 컨텍스트를 만들 때 사용하는 공유 자원
#[derive(Clone)]
pub struct AddonEnvironment {
    pub config: Arc<PawnctlConfig>,
    pub event_bus: Arc<EventBus>,
    pub host: Arc<dyn HostApi>,
}

impl AddonEnvironment {
    pub fn new(
        config: Arc<PawnctlConfig>,
        event_bus: Arc<EventBus>,
        host: Arc<dyn HostApi>,
    ) -> Self {
        Self {
            config,
            event_bus,
            host,
        }
    }

    pub fn project_dir(&self) -> &Path {
        self.host.project_dir()
    }

    /// addon 전용 컨텍스트 생성
    pub fn context_for(&self, addon_name: &str, addon_dir: &Path) -> Arc<AddonContext> {
        Arc::new(AddonContext::new(
            addon_name,
            self.config.clone(),
            self.event_bus.clone(),
            self.host.clone(),
            addon_dir,
        ))
    }
}
