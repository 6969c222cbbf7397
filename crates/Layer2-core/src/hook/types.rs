//! Hook 타입 정의
//!
//! 라이프사이클 hook 슬롯과 addon이 제공하는 핸들러 구조

use futures::future::BoxFuture;
use pawnctl_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// HookEvent - hook 슬롯
// ============================================================================

/// 고정된 hook 슬롯 목록
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookEvent {
    PreBuild,
    PostBuild,
    PreInstall,
    PostInstall,
    PreUninstall,
    PostUninstall,
    PreStart,
    PostStart,
    PreStop,
    PostStop,
    PreInit,
    PostInit,
    PreManifestSave,
    PostManifestSave,
    /// 이름으로 구분되는 사용자 정의 이벤트
    CustomEvent,
}

impl HookEvent {
    /// 모든 슬롯 (디스패치/등록 순회용)
    pub const ALL: [HookEvent; 15] = [
        HookEvent::PreBuild,
        HookEvent::PostBuild,
        HookEvent::PreInstall,
        HookEvent::PostInstall,
        HookEvent::PreUninstall,
        HookEvent::PostUninstall,
        HookEvent::PreStart,
        HookEvent::PostStart,
        HookEvent::PreStop,
        HookEvent::PostStop,
        HookEvent::PreInit,
        HookEvent::PostInit,
        HookEvent::PreManifestSave,
        HookEvent::PostManifestSave,
        HookEvent::CustomEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreBuild => "preBuild",
            Self::PostBuild => "postBuild",
            Self::PreInstall => "preInstall",
            Self::PostInstall => "postInstall",
            Self::PreUninstall => "preUninstall",
            Self::PostUninstall => "postUninstall",
            Self::PreStart => "preStart",
            Self::PostStart => "postStart",
            Self::PreStop => "preStop",
            Self::PostStop => "postStop",
            Self::PreInit => "preInit",
            Self::PostInit => "postInit",
            Self::PreManifestSave => "preManifestSave",
            Self::PostManifestSave => "postManifestSave",
            Self::CustomEvent => "customEvent",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HookEvent::ALL
            .iter()
            .copied()
            .find(|event| event.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Validation(format!("Unknown hook '{}'", s)))
    }
}

// ============================================================================
// HookContext - 핸들러에 전달되는 데이터
// ============================================================================

/// Hook 실행 컨텍스트
#[derive(Debug, Clone)]
pub struct HookContext {
    /// 디스패치된 슬롯
    pub event: HookEvent,

    /// 프로젝트 루트
    pub project_dir: PathBuf,

    /// 이벤트별 데이터 (빌드 대상, 패키지 이름, manifest 문서 등)
    pub data: Value,

    /// CustomEvent일 때 이벤트 이름
    pub custom_name: Option<String>,
}

impl HookContext {
    pub fn new(event: HookEvent, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            event,
            project_dir: project_dir.into(),
            data: Value::Null,
            custom_name: None,
        }
    }

    /// 사용자 정의 이벤트 컨텍스트
    pub fn custom(name: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            custom_name: Some(name.into()),
            ..Self::new(HookEvent::CustomEvent, project_dir)
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

// ============================================================================
// HookHandler / AddonHooks
// ============================================================================

/// Hook 핸들러 (비동기)
pub type HookHandler = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// 클로저를 HookHandler로 변환
pub fn hook_handler<F, Fut>(f: F) -> HookHandler
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Addon이 제공하는 hook 핸들러 (슬롯별 선택 필드)
#[derive(Clone, Default)]
pub struct AddonHooks {
    pub pre_build: Option<HookHandler>,
    pub post_build: Option<HookHandler>,
    pub pre_install: Option<HookHandler>,
    pub post_install: Option<HookHandler>,
    pub pre_uninstall: Option<HookHandler>,
    pub post_uninstall: Option<HookHandler>,
    pub pre_start: Option<HookHandler>,
    pub post_start: Option<HookHandler>,
    pub pre_stop: Option<HookHandler>,
    pub post_stop: Option<HookHandler>,
    pub pre_init: Option<HookHandler>,
    pub post_init: Option<HookHandler>,
    pub pre_manifest_save: Option<HookHandler>,
    pub post_manifest_save: Option<HookHandler>,
    pub custom_event: Option<HookHandler>,
}

impl AddonHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, event: HookEvent) -> &Option<HookHandler> {
        match event {
            HookEvent::PreBuild => &self.pre_build,
            HookEvent::PostBuild => &self.post_build,
            HookEvent::PreInstall => &self.pre_install,
            HookEvent::PostInstall => &self.post_install,
            HookEvent::PreUninstall => &self.pre_uninstall,
            HookEvent::PostUninstall => &self.post_uninstall,
            HookEvent::PreStart => &self.pre_start,
            HookEvent::PostStart => &self.post_start,
            HookEvent::PreStop => &self.pre_stop,
            HookEvent::PostStop => &self.post_stop,
            HookEvent::PreInit => &self.pre_init,
            HookEvent::PostInit => &self.post_init,
            HookEvent::PreManifestSave => &self.pre_manifest_save,
            HookEvent::PostManifestSave => &self.post_manifest_save,
            HookEvent::CustomEvent => &self.custom_event,
        }
    }

    fn slot_mut(&mut self, event: HookEvent) -> &mut Option<HookHandler> {
        match event {
            HookEvent::PreBuild => &mut self.pre_build,
            HookEvent::PostBuild => &mut self.post_build,
            HookEvent::PreInstall => &mut self.pre_install,
            HookEvent::PostInstall => &mut self.post_install,
            HookEvent::PreUninstall => &mut self.pre_uninstall,
            HookEvent::PostUninstall => &mut self.post_uninstall,
            HookEvent::PreStart => &mut self.pre_start,
            HookEvent::PostStart => &mut self.post_start,
            HookEvent::PreStop => &mut self.pre_stop,
            HookEvent::PostStop => &mut self.post_stop,
            HookEvent::PreInit => &mut self.pre_init,
            HookEvent::PostInit => &mut self.post_init,
            HookEvent::PreManifestSave => &mut self.pre_manifest_save,
            HookEvent::PostManifestSave => &mut self.post_manifest_save,
            HookEvent::CustomEvent => &mut self.custom_event,
        }
    }

    /// 슬롯의 핸들러
    pub fn get(&self, event: HookEvent) -> Option<&HookHandler> {
        self.slot(event).as_ref()
    }

    pub fn set(&mut self, event: HookEvent, handler: HookHandler) {
        *self.slot_mut(event) = Some(handler);
    }

    /// 빌더 형태로 핸들러 지정
    pub fn with(mut self, event: HookEvent, handler: HookHandler) -> Self {
        self.set(event, handler);
        self
    }

    /// 핸들러가 있는 슬롯 목록
    pub fn present(&self) -> Vec<HookEvent> {
        HookEvent::ALL
            .iter()
            .copied()
            .filter(|event| self.slot(*event).is_some())
            .collect()
    }
}

impl std::fmt::Debug for AddonHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonHooks")
            .field("present", &self.present())
            .finish()
    }
}

// ============================================================================
// HookReport - 디스패치 결과
// ============================================================================

/// 실패한 핸들러
#[derive(Debug, Clone)]
pub struct HookFailure {
    pub addon: String,
    pub message: String,
}

/// 한 번의 디스패치 결과 (에러를 다시 던지지 않음)
#[derive(Debug, Clone)]
pub struct HookReport {
    pub event: HookEvent,
    pub executed: usize,
    pub failures: Vec<HookFailure>,
}

impl HookReport {
    pub fn new(event: HookEvent) -> Self {
        Self {
            event,
            executed: 0,
            failures: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.executed - self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_event_names_round_trip() {
        for event in HookEvent::ALL {
            assert_eq!(event.as_str().parse::<HookEvent>().unwrap(), event);
        }
        assert_eq!("PREBUILD".parse::<HookEvent>().unwrap(), HookEvent::PreBuild);
        assert!(matches!(
            "preDeploy".parse::<HookEvent>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_addon_hooks_present() {
        let noop = hook_handler(|_ctx| async { Ok(()) });
        let hooks = AddonHooks::new()
            .with(HookEvent::PostBuild, noop.clone())
            .with(HookEvent::PreBuild, noop);

        assert_eq!(hooks.present(), vec![HookEvent::PreBuild, HookEvent::PostBuild]);
        assert!(hooks.get(HookEvent::PreStart).is_none());
    }
}
