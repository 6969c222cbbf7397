//! Pawnctl Config - 통합 설정
//!
//! 글로벌(~/.pawnctl/config.json)과 프로젝트(.pawnctl/config.json) 설정을 병합

use crate::storage::{JsonStore, PAWNCTL_DIR};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 설정 파일명
pub const PAWNCTL_CONFIG_FILE: &str = "config.json";

/// 레지스트리 파일명
pub const REGISTRY_FILE: &str = "registry.json";

// ============================================================================
// PawnctlConfig (통합)
// ============================================================================

/// pawnctl 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PawnctlConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Addon 런타임 설정
    #[serde(default)]
    pub addons: AddonSettings,

    /// 외부 툴체인 명령
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

impl PawnctlConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let project = JsonStore::current_project()?;
        Self::load_with(JsonStore::global().ok(), Some(project))
    }

    /// 주어진 저장소로부터 병합 로드 (project가 우선)
    pub fn load_with(global: Option<JsonStore>, project: Option<JsonStore>) -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Some(global) = global {
            if let Some(global_config) =
                global.load_optional::<PawnctlConfig>(PAWNCTL_CONFIG_FILE)?
            {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Some(project) = project {
            if let Some(project_config) =
                project.load_optional::<PawnctlConfig>(PAWNCTL_CONFIG_FILE)?
            {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(PAWNCTL_CONFIG_FILE, self)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(PAWNCTL_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: PawnctlConfig) {
        self.addons.merge(other.addons);
        self.toolchain.merge(other.toolchain);
    }
}

// ============================================================================
// AddonSettings
// ============================================================================

/// Addon 런타임 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSettings {
    /// GitHub addon 설치 디렉토리 (기본: ~/.pawnctl/addons)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,

    /// 레지스트리 파일 경로 (기본: <installDir>/registry.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_file: Option<PathBuf>,

    /// 추가 탐색 경로
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,

    /// 로드 최대 시도 횟수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_load_attempts: Option<u32>,

    /// 재시도 기본 지연 (ms), 시도 횟수만큼 곱해진다
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,

    /// 스크립트 addon 명령 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_timeout_secs: Option<u64>,

    /// 자동 비활성화 에러 임계값
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_disable_threshold: Option<usize>,

    /// addon별 에러 히스토리 보관 개수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_history_limit: Option<usize>,

    /// GitHub API 주소
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,

    /// 아카이브 다운로드 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_timeout_secs: Option<u64>,
}

impl AddonSettings {
    /// 설치 디렉토리
    pub fn install_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.install_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot find home directory".to_string()))?;
        Ok(home.join(PAWNCTL_DIR).join("addons"))
    }

    /// 레지스트리 파일 경로
    pub fn registry_file(&self) -> Result<PathBuf> {
        match &self.registry_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.install_dir()?.join(REGISTRY_FILE)),
        }
    }

    /// 탐색 경로 (프로젝트 addons 디렉토리 + 설치 디렉토리 + 추가 경로)
    pub fn discovery_paths(&self, project_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = vec![project_dir.join(PAWNCTL_DIR).join("addons")];
        let install_dir = self.install_dir()?;
        if !paths.contains(&install_dir) {
            paths.push(install_dir);
        }
        for path in &self.search_paths {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        Ok(paths)
    }

    pub fn max_load_attempts(&self) -> u32 {
        self.max_load_attempts.unwrap_or(3).max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(1000))
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs.unwrap_or(60))
    }

    pub fn auto_disable_threshold(&self) -> usize {
        self.auto_disable_threshold.unwrap_or(3)
    }

    pub fn error_history_limit(&self) -> usize {
        self.error_history_limit.unwrap_or(20)
    }

    pub fn github_api_url(&self) -> &str {
        self.github_api_url
            .as_deref()
            .unwrap_or("https://api.github.com")
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs.unwrap_or(120))
    }

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: AddonSettings) {
        if other.install_dir.is_some() {
            self.install_dir = other.install_dir;
        }
        if other.registry_file.is_some() {
            self.registry_file = other.registry_file;
        }
        for path in other.search_paths {
            if !self.search_paths.contains(&path) {
                self.search_paths.push(path);
            }
        }
        if other.max_load_attempts.is_some() {
            self.max_load_attempts = other.max_load_attempts;
        }
        if other.retry_delay_ms.is_some() {
            self.retry_delay_ms = other.retry_delay_ms;
        }
        if other.script_timeout_secs.is_some() {
            self.script_timeout_secs = other.script_timeout_secs;
        }
        if other.auto_disable_threshold.is_some() {
            self.auto_disable_threshold = other.auto_disable_threshold;
        }
        if other.error_history_limit.is_some() {
            self.error_history_limit = other.error_history_limit;
        }
        if other.github_api_url.is_some() {
            self.github_api_url = other.github_api_url;
        }
        if other.download_timeout_secs.is_some() {
            self.download_timeout_secs = other.download_timeout_secs;
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    pub fn with_registry_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_file = Some(path.into());
        self
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = Some(delay_ms);
        self
    }
}

// ============================================================================
// ToolchainConfig
// ============================================================================

/// 외부 툴체인 명령 (셸 명령 문자열)
///
/// `installPackage`/`uninstallPackage`의 `{package}`는 패키지 이름으로 치환된다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_package: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstall_package: Option<String>,
}

impl ToolchainConfig {
    pub fn merge(&mut self, other: ToolchainConfig) {
        if other.build.is_some() {
            self.build = other.build;
        }
        if other.start.is_some() {
            self.start = other.start;
        }
        if other.stop.is_some() {
            self.stop = other.stop;
        }
        if other.install_package.is_some() {
            self.install_package = other.install_package;
        }
        if other.uninstall_package.is_some() {
            self.uninstall_package = other.uninstall_package;
        }
    }
}

fn default_version() -> u32 {
    1
}
