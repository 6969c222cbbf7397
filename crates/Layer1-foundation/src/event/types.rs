//! Event Types - 시스템 전체에서 사용되는 이벤트 타입 정의
//!
//! Addon 런타임과 CLI에서 발생하는 이벤트를 정의합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Event Category
// ============================================================================

/// 이벤트 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// 시스템 이벤트 (초기화, 설정 변경)
    System,
    /// Addon 라이프사이클 (로드, 활성화, 비활성화)
    Addon,
    /// Hook 디스패치
    Hook,
    /// 명령어 등록/실행
    Command,
    /// 의존성 해석
    Dependency,
    /// 설치/업데이트/제거
    Install,
    /// 에러 이벤트
    Error,
    /// Addon이 발행하는 사용자 정의 이벤트
    Custom,
}

impl EventCategory {
    /// 카테고리 문자열 반환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Addon => "addon",
            Self::Hook => "hook",
            Self::Command => "command",
            Self::Dependency => "dependency",
            Self::Install => "install",
            Self::Error => "error",
            Self::Custom => "custom",
        }
    }
}

// ============================================================================
// Event Severity
// ============================================================================

/// 이벤트 심각도
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

// ============================================================================
// HostEvent - 핵심 이벤트 타입
// ============================================================================

/// pawnctl 시스템 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEvent {
    pub id: Uuid,

    /// 이벤트 타입 (예: "addon.loaded", "install.rolled_back")
    pub event_type: String,

    /// 이벤트 카테고리
    pub category: EventCategory,

    /// 심각도
    pub severity: EventSeverity,

    /// 이벤트 발생 시간
    pub timestamp: DateTime<Utc>,

    /// 이벤트 소스 (모듈 또는 addon 이름)
    pub source: String,

    /// 이벤트 데이터
    pub data: Value,
}

impl HostEvent {
    /// 새 이벤트 생성
    pub fn new(event_type: impl Into<String>, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            category,
            severity: EventSeverity::Info,
            timestamp: Utc::now(),
            source: String::new(),
            data: Value::Null,
        }
    }

    /// 심각도 설정
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// 소스 설정
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 데이터 설정
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

// ============================================================================
// 사전 정의된 이벤트 타입들
// ============================================================================

/// 시스템 이벤트
pub mod system {
    use super::*;

    /// 매니저 초기화 완료
    pub fn initialized(loaded: usize, failed: usize, discovered: usize) -> HostEvent {
        HostEvent::new("system.initialized", EventCategory::System)
            .with_source("manager")
            .with_data(serde_json::json!({
                "loaded": loaded,
                "failed": failed,
                "discovered": discovered,
            }))
    }
}

/// Addon 라이프사이클 이벤트
pub mod addon {
    use super::*;

    pub fn loaded(name: &str, version: &str) -> HostEvent {
        HostEvent::new("addon.loaded", EventCategory::Addon)
            .with_source(name)
            .with_data(serde_json::json!({ "name": name, "version": version }))
    }

    pub fn enabled(name: &str) -> HostEvent {
        HostEvent::new("addon.enabled", EventCategory::Addon)
            .with_source(name)
            .with_data(serde_json::json!({ "name": name }))
    }

    pub fn disabled(name: &str, reason: Option<&str>) -> HostEvent {
        HostEvent::new("addon.disabled", EventCategory::Addon)
            .with_source(name)
            .with_data(serde_json::json!({ "name": name, "reason": reason }))
    }

    /// 에러 누적으로 격리됨
    pub fn quarantined(name: &str, error: &str) -> HostEvent {
        HostEvent::new("addon.quarantined", EventCategory::Addon)
            .with_severity(EventSeverity::Warning)
            .with_source(name)
            .with_data(serde_json::json!({ "name": name, "error": error }))
    }
}

/// 설치 이벤트
pub mod install {
    use super::*;

    pub fn installed(name: &str, version: &str, source: &str) -> HostEvent {
        HostEvent::new("install.installed", EventCategory::Install)
            .with_source("installer")
            .with_data(serde_json::json!({
                "name": name,
                "version": version,
                "source": source,
            }))
    }

    pub fn uninstalled(name: &str) -> HostEvent {
        HostEvent::new("install.uninstalled", EventCategory::Install)
            .with_source("installer")
            .with_data(serde_json::json!({ "name": name }))
    }

    pub fn updated(name: &str, from: &str, to: &str) -> HostEvent {
        HostEvent::new("install.updated", EventCategory::Install)
            .with_source("installer")
            .with_data(serde_json::json!({ "name": name, "from": from, "to": to }))
    }

    /// 업데이트 실패 후 백업 복원
    pub fn rolled_back(name: &str, error: &str) -> HostEvent {
        HostEvent::new("install.rolled_back", EventCategory::Install)
            .with_severity(EventSeverity::Warning)
            .with_source("installer")
            .with_data(serde_json::json!({ "name": name, "error": error }))
    }
}

/// Hook 이벤트
pub mod hook {
    use super::*;

    pub fn dispatched(hook: &str, executed: usize, failed: usize) -> HostEvent {
        let severity = if failed > 0 {
            EventSeverity::Warning
        } else {
            EventSeverity::Debug
        };
        HostEvent::new("hook.dispatched", EventCategory::Hook)
            .with_severity(severity)
            .with_source("hooks")
            .with_data(serde_json::json!({
                "hook": hook,
                "executed": executed,
                "failed": failed,
            }))
    }
}

/// 에러 이벤트
pub mod error {
    use super::*;

    /// addon 에러 기록
    pub fn recorded(addon: &str, message: &str, count: usize) -> HostEvent {
        HostEvent::new("error.recorded", EventCategory::Error)
            .with_severity(EventSeverity::Error)
            .with_source(addon)
            .with_data(serde_json::json!({
                "addon": addon,
                "message": message,
                "count": count,
            }))
    }
}

// ============================================================================
// 테스트
// ============================================================================
