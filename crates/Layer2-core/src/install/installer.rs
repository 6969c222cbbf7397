//! AddonInstaller - 설치, 업데이트(백업/롤백), 제거

use super::downloader::ArchiveFetcher;
use super::source::{AddonSource, GitHubRef};
use crate::addon::{Addon, AddonInfo, AddonSourceKind, InfoOverrides};
use crate::hook::HookManager;
use crate::loader::AddonLoader;
use crate::registry::AddonRegistry;
use chrono::Utc;
use pawnctl_foundation::event::install as install_events;
use pawnctl_foundation::{Error, EventBus, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// 업데이트 한 건의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonUpdate {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// `update_all_github_addons` 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSummary {
    pub updated: Vec<AddonUpdate>,
    /// (이름, 에러 메시지)
    pub failed: Vec<(String, String)>,
    /// GitHub 출처가 아니라 건너뛴 addon
    pub skipped: Vec<String>,
}

/// Addon 설치기
pub struct AddonInstaller {
    loader: Arc<AddonLoader>,
    hooks: Arc<HookManager>,
    registry: AddonRegistry,
    fetcher: Arc<dyn ArchiveFetcher>,
    install_dir: PathBuf,
    events: Option<Arc<EventBus>>,
}

impl AddonInstaller {
    pub fn new(
        loader: Arc<AddonLoader>,
        hooks: Arc<HookManager>,
        registry: AddonRegistry,
        fetcher: Arc<dyn ArchiveFetcher>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            loader,
            hooks,
            registry,
            fetcher,
            install_dir: install_dir.into(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    async fn publish(&self, event: pawnctl_foundation::HostEvent) {
        if let Some(events) = &self.events {
            events.publish(event).await;
        }
    }

    // ========================================================================
    // 설치
    // ========================================================================

    /// 소스 문자열에서 설치
    pub async fn install_addon(&self, source: &str) -> Result<AddonInfo> {
        match AddonSource::parse(source)? {
            AddonSource::Local(path) => self.install_local(&path).await,
            AddonSource::GitHub(github) => self.install_github(&github).await,
        }
    }

    /// 로컬 디렉토리를 제자리에서 로드
    pub async fn install_local(&self, path: &Path) -> Result<AddonInfo> {
        if fs::metadata(path).await.is_err() {
            return Err(Error::NotFound(format!(
                "Addon path not found: {}",
                path.display()
            )));
        }
        let path = fs::canonicalize(path).await?;
        info!("Installing addon from {}", path.display());

        let addon = self.loader.load_addon(&path).await?;
        self.activate_installed(
            addon,
            InfoOverrides::installed(AddonSourceKind::Local, &path),
            "local",
        )
        .await
    }

    /// GitHub 아카이브를 설치 디렉토리에 받아 로드
    pub async fn install_github(&self, github: &GitHubRef) -> Result<AddonInfo> {
        let target = self.install_dir.join(&github.repo);
        if fs::metadata(&target).await.is_ok() {
            return Err(Error::AlreadyExists(format!(
                "{} is already installed at {}; use `pawnctl addon update` instead",
                github,
                target.display()
            )));
        }

        info!("Installing addon from github:{}", github);
        let loaded = match self.fetcher.fetch(github, &target).await {
            Ok(()) => self.loader.load_addon(&target).await,
            Err(e) => Err(e),
        };

        let addon = match loaded {
            Ok(addon) => addon,
            Err(e) => {
                remove_dir_quietly(&target).await;
                return Err(e);
            }
        };

        self.activate_installed(
            addon,
            InfoOverrides::installed(AddonSourceKind::Github, &target)
                .with_github_url(github.html_url()),
            "github",
        )
        .await
    }

    /// hook 등록 → 로더 등록 → 레지스트리 저장
    async fn activate_installed(
        &self,
        addon: Arc<dyn Addon>,
        overrides: InfoOverrides,
        source_label: &str,
    ) -> Result<AddonInfo> {
        let name = addon.metadata().name;

        if let Some(previous) = self.loader.get_addon(&name).await {
            debug!("Replacing active instance of '{}'", name);
            if let Err(e) = previous.deactivate().await {
                warn!("Previous instance of '{}' failed to deactivate: {}", name, e);
            }
        }

        self.hooks.remove_addon(&name).await;
        self.hooks.register_addon_hooks(&name, &addon.hooks()).await;

        let info = self.loader.register_addon(addon, overrides).await;
        self.registry.upsert_addon(info.clone()).await?;

        info!("Installed addon '{}' v{} ({})", info.name, info.version, source_label);
        self.publish(install_events::installed(&info.name, &info.version, source_label))
            .await;
        Ok(info)
    }

    // ========================================================================
    // 업데이트
    // ========================================================================

    /// GitHub 출처 addon 업데이트 (실패 시 이전 디렉토리와 상태 복원)
    pub async fn update_github_addon(&self, name: &str) -> Result<AddonUpdate> {
        let info = self.known_info(name).await?;

        let github = match info.github_url.as_deref().map(AddonSource::parse) {
            Some(Ok(AddonSource::GitHub(github))) => github,
            _ => {
                return Err(Error::update(
                    name,
                    "not installed from GitHub; reinstall it from its source instead",
                ))
            }
        };
        let path = info
            .path
            .clone()
            .ok_or_else(|| Error::update(name, "no install path recorded"))?;

        let backup = backup_path(&path);
        fs::rename(&path, &backup)
            .await
            .map_err(|e| Error::update(name, format!("cannot create backup: {}", e)))?;
        debug!("Backed up {} to {}", path.display(), backup.display());

        match self.fetch_and_load(name, &github, &path).await {
            Ok(addon) => {
                let from = info.version.clone();
                let enabled = info.enabled;
                let mut overrides = InfoOverrides::from_info(&info).without_error();
                overrides.path = Some(path.clone());

                if let Some(previous) = self.loader.get_addon(name).await {
                    if let Err(e) = previous.deactivate().await {
                        warn!("Previous version of '{}' failed to deactivate: {}", name, e);
                    }
                }

                self.hooks.remove_addon(name).await;
                if enabled {
                    self.hooks.register_addon_hooks(name, &addon.hooks()).await;
                }
                let mut updated = self.loader.register_addon(addon, overrides).await;
                if !enabled {
                    updated = self.loader.deactivate_addon(name).await?;
                }

                remove_dir_quietly(&backup).await;
                self.registry.upsert_addon(updated.clone()).await?;

                info!("Updated addon '{}' {} -> {}", name, from, updated.version);
                self.publish(install_events::updated(name, &from, &updated.version))
                    .await;
                Ok(AddonUpdate {
                    name: name.to_string(),
                    from,
                    to: updated.version,
                })
            }
            Err(e) => {
                warn!("Update of '{}' failed, restoring previous version: {}", name, e);
                remove_dir_quietly(&path).await;
                fs::rename(&backup, &path).await.map_err(|restore| {
                    Error::update(
                        name,
                        format!(
                            "{}; restoring backup from {} also failed: {}",
                            e,
                            backup.display(),
                            restore
                        ),
                    )
                })?;

                self.publish(install_events::rolled_back(name, &e.to_string()))
                    .await;
                Err(Error::update(
                    name,
                    format!("{}; previous version restored", e),
                ))
            }
        }
    }

    async fn fetch_and_load(
        &self,
        name: &str,
        github: &GitHubRef,
        path: &Path,
    ) -> Result<Arc<dyn Addon>> {
        self.fetcher.fetch(github, path).await?;
        let addon = self.loader.load_addon(path).await?;

        let loaded_name = addon.metadata().name;
        if loaded_name != name {
            if let Err(e) = addon.deactivate().await {
                warn!("Discarded instance of '{}' failed to deactivate: {}", loaded_name, e);
            }
            return Err(Error::Validation(format!(
                "downloaded package is '{}', expected '{}'",
                loaded_name, name
            )));
        }
        Ok(addon)
    }

    /// 모든 GitHub 출처 addon을 개별적으로 업데이트
    pub async fn update_all_github_addons(&self) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        for info in self.known_infos().await {
            if info.github_url.is_none() {
                summary.skipped.push(info.name);
                continue;
            }
            match self.update_github_addon(&info.name).await {
                Ok(update) => summary.updated.push(update),
                Err(e) => summary.failed.push((info.name, e.to_string())),
            }
        }

        info!(
            "Update summary: {} updated, {} failed, {} skipped",
            summary.updated.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        summary
    }

    // ========================================================================
    // 제거
    // ========================================================================

    /// 메모리에서 내림 → 디렉토리 삭제 → 레지스트리 항목 제거
    ///
    /// 로컬 출처 addon의 디렉토리는 설치 디렉토리 밖에 있으면 남겨 둔다.
    pub async fn uninstall_addon(&self, name: &str) -> Result<AddonInfo> {
        let info = self.known_info(name).await?;

        if self.loader.contains(name).await {
            self.loader.unload_addon(name).await?;
        }
        self.hooks.remove_addon(name).await;

        if let Some(path) = &info.path {
            let owned = info.source == AddonSourceKind::Github || path.starts_with(&self.install_dir);
            if owned && fs::metadata(path).await.is_ok() {
                fs::remove_dir_all(path).await?;
                debug!("Removed {}", path.display());
            } else if !owned {
                debug!("Leaving local addon files at {}", path.display());
            }
        }

        self.registry.remove_addon_from_registry(name).await?;

        info!("Uninstalled addon '{}'", name);
        self.publish(install_events::uninstalled(name)).await;
        Ok(info)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    async fn known_info(&self, name: &str) -> Result<AddonInfo> {
        if let Some(info) = self.loader.get_addon_info(name).await {
            return Ok(info);
        }
        self.registry
            .get_entry(name)
            .await
            .ok_or_else(|| Error::NotFound(format!("Addon '{}' is not installed", name)))
    }

    /// 로더 + 레지스트리 (로더 우선, 이름 중복 없음)
    async fn known_infos(&self) -> Vec<AddonInfo> {
        let mut infos = self.loader.get_all_addon_infos().await;
        for entry in self.registry.entries().await {
            if !infos.iter().any(|i| i.name == entry.name) {
                infos.push(entry);
            }
        }
        infos
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "addon".into());
    path.with_file_name(format!("{}.backup-{}", name, stamp))
}

async fn remove_dir_quietly(path: &Path) {
    if fs::metadata(path).await.is_ok() {
        if let Err(e) = fs::remove_dir_all(path).await {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
