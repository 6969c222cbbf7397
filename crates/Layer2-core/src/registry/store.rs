//! AddonRegistry - registry.json 관리

use crate::addon::{AddonInfo, InfoOverrides};
use crate::loader::AddonLoader;
use pawnctl_foundation::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

// ============================================================================
// RegistryFile - registry.json 구조
// ============================================================================

/// registry.json 파일 구조
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub addons: Vec<AddonInfo>,
}

impl RegistryFile {
    pub fn get(&self, name: &str) -> Option<&AddonInfo> {
        self.addons.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AddonInfo> {
        self.addons.iter_mut().find(|a| a.name == name)
    }

    /// 이름 중복 제거 (뒤의 항목이 앞 항목 위치를 덮어씀)
    fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        let mut deduped: Vec<AddonInfo> = Vec::with_capacity(self.addons.len());
        for addon in self.addons.drain(..) {
            if seen.insert(addon.name.clone()) {
                deduped.push(addon);
            } else if let Some(existing) = deduped.iter_mut().find(|a| a.name == addon.name) {
                *existing = addon;
            }
        }
        self.addons = deduped;
    }
}

/// `load_from_registry` 결과
#[derive(Debug, Clone, Default)]
pub struct RegistryLoadResult {
    pub loaded: Vec<String>,
    /// (이름, 에러 메시지)
    pub failed: Vec<(String, String)>,
    /// 비활성화되어 로드하지 않은 항목
    pub skipped: Vec<String>,
}

// ============================================================================
// AddonRegistry
// ============================================================================

/// Addon 레지스트리 (단일 로컬 파일)
#[derive(Debug, Clone)]
pub struct AddonRegistry {
    path: PathBuf,
}

impl AddonRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // 로드 / 저장
    // ========================================================================

    /// 파일 읽기 (없거나 손상되면 빈 목록)
    pub async fn read(&self) -> RegistryFile {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Registry not found at {:?}, using empty", self.path);
                return RegistryFile::default();
            }
            Err(e) => {
                warn!("Cannot read registry {:?}: {}; using empty", self.path, e);
                return RegistryFile::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!("Registry {:?} is corrupt ({}); treating as empty", self.path, e);
                RegistryFile::default()
            }
        }
    }

    /// 파일 전체 교체
    pub async fn write(&self, file: &RegistryFile) -> Result<()> {
        let mut file = file.clone();
        file.dedupe();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, content).await?;

        debug!("Saved registry with {} addon(s)", file.addons.len());
        Ok(())
    }

    pub async fn entries(&self) -> Vec<AddonInfo> {
        self.read().await.addons
    }

    pub async fn get_entry(&self, name: &str) -> Option<AddonInfo> {
        self.read().await.get(name).cloned()
    }

    // ========================================================================
    // 로더 연동
    // ========================================================================

    /// 레지스트리 항목을 로더에 로드
    ///
    /// 비활성화 항목은 정보만 등록하고, 경로가 없거나 로드에 실패한
    /// 항목은 에러를 기록한 정보만 등록한다.
    pub async fn load_from_registry(&self, loader: &AddonLoader) -> RegistryLoadResult {
        let mut result = RegistryLoadResult::default();

        for mut entry in self.entries().await {
            if loader.contains(&entry.name).await {
                continue;
            }

            if !entry.enabled {
                debug!("Addon '{}' is disabled, not loading", entry.name);
                result.skipped.push(entry.name.clone());
                loader.register_info(entry).await;
                continue;
            }

            let Some(path) = entry.path.clone().filter(|p| p.exists()) else {
                let message = format!(
                    "Addon path not found: {}",
                    entry
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<none>".into())
                );
                warn!("Addon '{}': {}", entry.name, message);
                entry.set_error(message.clone());
                result.failed.push((entry.name.clone(), message));
                loader.register_info(entry).await;
                continue;
            };

            match loader.load_addon(&path).await {
                Ok(addon) => {
                    let registered = loader
                        .register_addon(addon, InfoOverrides::from_info(&entry).without_error())
                        .await;
                    result.loaded.push(registered.name);
                }
                Err(e) => {
                    let message = e.to_string();
                    entry.set_error(message.clone());
                    result.failed.push((entry.name.clone(), message));
                    loader.register_info(entry).await;
                }
            }
        }

        info!(
            "Registry load: {} loaded, {} failed, {} disabled",
            result.loaded.len(),
            result.failed.len(),
            result.skipped.len()
        );
        result
    }

    /// 로더의 모든 정보를 저장 (전체 교체)
    pub async fn save_to_registry(&self, loader: &AddonLoader) -> Result<()> {
        let file = RegistryFile {
            addons: loader.get_all_addon_infos().await,
        };
        self.write(&file).await
    }

    // ========================================================================
    // 항목 수정 (read-modify-write)
    // ========================================================================

    /// 항목 수정 (없으면 false)
    pub async fn update_addon_in_registry<F>(&self, name: &str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut AddonInfo),
    {
        let mut file = self.read().await;
        let Some(entry) = file.get_mut(name) else {
            return Ok(false);
        };
        f(entry);
        self.write(&file).await?;
        Ok(true)
    }

    pub async fn disable_addon_in_registry(&self, name: &str, reason: Option<&str>) -> Result<bool> {
        self.update_addon_in_registry(name, |entry| {
            entry.enabled = false;
            if let Some(reason) = reason {
                entry.set_error(reason);
            }
        })
        .await
    }

    pub async fn enable_addon_in_registry(&self, name: &str) -> Result<bool> {
        self.update_addon_in_registry(name, |entry| {
            entry.enabled = true;
            entry.clear_error();
        })
        .await
    }

    /// 항목 추가 또는 교체
    pub async fn upsert_addon(&self, info: AddonInfo) -> Result<()> {
        let mut file = self.read().await;
        match file.get_mut(&info.name) {
            Some(existing) => *existing = info,
            None => file.addons.push(info),
        }
        self.write(&file).await
    }

    pub async fn remove_addon_from_registry(&self, name: &str) -> Result<bool> {
        let mut file = self.read().await;
        let before = file.addons.len();
        file.addons.retain(|a| a.name != name);
        if file.addons.len() == before {
            return Ok(false);
        }
        self.write(&file).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::{AddonFactoryRegistry, AddonMetadata, AddonSourceKind};
    use crate::test_support::{test_environment, write_script_package};
    use std::sync::Arc;

    fn info(name: &str, path: Option<PathBuf>, enabled: bool) -> AddonInfo {
        let mut info = AddonInfo::from_metadata(&AddonMetadata::new(name, "1.0.0"));
        info.installed = true;
        info.enabled = enabled;
        info.path = path;
        info
    }

    #[tokio::test]
    async fn test_corrupt_registry_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{ not json").await.unwrap();

        let registry = AddonRegistry::new(&path);
        assert!(registry.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_write_dedupes_and_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AddonRegistry::new(dir.path().join("nested").join("registry.json"));

        let mut second = info("alpha", None, false);
        second.github_url = Some("https://github.com/o/alpha".into());
        registry
            .write(&RegistryFile {
                addons: vec![info("alpha", None, true), info("beta", None, true), second],
            })
            .await
            .unwrap();

        let entries = registry.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "alpha");
        assert!(!entries[0].enabled);

        let raw = fs::read_to_string(registry.path()).await.unwrap();
        assert!(raw.contains("\"githubUrl\""));
    }

    #[tokio::test]
    async fn test_entry_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AddonRegistry::new(dir.path().join("registry.json"));
        registry.upsert_addon(info("alpha", None, true)).await.unwrap();

        assert!(registry
            .disable_addon_in_registry("alpha", Some("crashed twice"))
            .await
            .unwrap());
        let entry = registry.get_entry("alpha").await.unwrap();
        assert!(!entry.enabled);
        assert_eq!(entry.last_error.as_deref(), Some("crashed twice"));

        assert!(registry.enable_addon_in_registry("alpha").await.unwrap());
        let entry = registry.get_entry("alpha").await.unwrap();
        assert!(entry.enabled);
        assert!(entry.last_error.is_none());

        assert!(!registry.enable_addon_in_registry("ghost").await.unwrap());
        assert!(registry.remove_addon_from_registry("alpha").await.unwrap());
        assert!(!registry.remove_addon_from_registry("alpha").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_from_registry_classifies_entries() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_script_package(dir.path(), "good", "1.0.0", &[]).await;
        let registry = AddonRegistry::new(dir.path().join("registry.json"));
        let mut good_info = info("good", Some(good), true);
        good_info.source = AddonSourceKind::Github;
        good_info.set_error("old failure");

        registry
            .write(&RegistryFile {
                addons: vec![
                    good_info,
                    info("sleeping", Some(dir.path().join("sleeping")), false),
                    info("vanished", Some(dir.path().join("vanished")), true),
                ],
            })
            .await
            .unwrap();

        let loader = AddonLoader::new(
            test_environment(dir.path()),
            Arc::new(AddonFactoryRegistry::new()),
        );
        let result = registry.load_from_registry(&loader).await;

        assert_eq!(result.loaded, vec!["good".to_string()]);
        assert_eq!(result.skipped, vec!["sleeping".to_string()]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, "vanished");

        let good = loader.get_addon_info("good").await.unwrap();
        assert_eq!(good.source, AddonSourceKind::Github);
        assert!(good.last_error.is_none());
        assert!(loader.is_active("good").await);

        let vanished = loader.get_addon_info("vanished").await.unwrap();
        assert!(vanished.last_error.unwrap().contains("not found"));

        registry.save_to_registry(&loader).await.unwrap();
        assert_eq!(registry.entries().await.len(), 3);
    }
}
