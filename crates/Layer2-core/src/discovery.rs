//! AddonDiscovery - 탐색 경로에서 addon 패키지 찾기

use crate::addon::{AddonInfo, AddonManifest, AddonSourceKind, InfoOverrides};
use crate::loader::AddonLoader;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// `discover_and_load` 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    pub loaded: Vec<String>,
    /// 이미 등록된 이름
    pub skipped: Vec<String>,
    /// (경로, 에러 메시지)
    pub failed: Vec<(PathBuf, String)>,
}

/// 발견된 패키지
struct Candidate {
    dir: PathBuf,
    manifest: AddonManifest,
}

/// Addon 탐색기
pub struct AddonDiscovery {
    search_paths: Vec<PathBuf>,
}

impl AddonDiscovery {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// 탐색 경로의 addon을 로드해 등록 (이미 등록된 이름은 건너뜀)
    pub async fn discover_and_load(&self, loader: &AddonLoader) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for candidate in self.candidates().await {
            let name = candidate.manifest.addon_name().to_string();
            if loader.contains(&name).await {
                debug!("Skipping discovered '{}': already registered", name);
                report.skipped.push(name);
                continue;
            }

            match loader.load_addon(&candidate.dir).await {
                Ok(addon) => {
                    let info = loader
                        .register_addon(
                            addon,
                            InfoOverrides::installed(AddonSourceKind::Discovered, &candidate.dir),
                        )
                        .await;
                    report.loaded.push(info.name);
                }
                Err(e) => {
                    warn!("Discovered addon at {:?} failed to load: {}", candidate.dir, e);
                    report.failed.push((candidate.dir, e.to_string()));
                }
            }
        }

        if !report.loaded.is_empty() || !report.failed.is_empty() {
            info!(
                "Discovery: {} loaded, {} skipped, {} failed",
                report.loaded.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
        report
    }

    /// 코드를 로드하지 않고 후보 정보만 반환 (검색어 필터)
    pub async fn scan(&self, query: Option<&str>) -> Vec<AddonInfo> {
        self.candidates()
            .await
            .into_iter()
            .map(|candidate| {
                let mut info = AddonInfo::from_metadata(&candidate.manifest.metadata());
                info.installed = false;
                info.source = AddonSourceKind::Discovered;
                info.path = Some(candidate.dir);
                info
            })
            .filter(|info| query.map_or(true, |q| info.matches_query(q)))
            .collect()
    }

    /// 탐색 경로 직속 하위 디렉토리 중 addon 패키지 (이름 중복은 먼저 찾은 것)
    async fn candidates(&self) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for root in &self.search_paths {
            for dir in child_dirs(root).await {
                let Some(manifest) = AddonManifest::probe(&dir).await else {
                    continue;
                };
                if seen.insert(manifest.addon_name().to_string()) {
                    candidates.push(Candidate { dir, manifest });
                }
            }
        }
        candidates
    }
}

/// 하위 디렉토리 (이름순, 숨김 디렉토리 제외)
async fn child_dirs(root: &Path) -> Vec<PathBuf> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut dirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && !hidden {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::{AddonFactoryRegistry, AddonMetadata};
    use crate::test_support::{test_environment, write_script_package};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_discover_skips_registered_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let search = dir.path().join("addons");
        write_script_package(&search, "greeter", "1.0.0", &[]).await;
        write_script_package(&search, "already", "1.0.0", &[]).await;

        let broken = search.join("broken");
        fs::create_dir_all(&broken).await.unwrap();
        fs::write(
            broken.join("package.json"),
            r#"{"name":"broken","version":"1.0.0","pawnAddon":{"hooks":{"preExplode":"true"}}}"#,
        )
        .await
        .unwrap();

        let not_an_addon = search.join("lib");
        fs::create_dir_all(&not_an_addon).await.unwrap();
        fs::write(not_an_addon.join("package.json"), r#"{"name":"lib"}"#)
            .await
            .unwrap();

        let loader = AddonLoader::new(
            test_environment(dir.path()),
            Arc::new(AddonFactoryRegistry::new()),
        );
        loader
            .register_info(AddonInfo::from_metadata(&AddonMetadata::new("already", "0.9.0")))
            .await;

        let discovery = AddonDiscovery::new(vec![search.clone(), dir.path().join("missing")]);
        let report = discovery.discover_and_load(&loader).await;

        assert_eq!(report.loaded, vec!["greeter".to_string()]);
        assert_eq!(report.skipped, vec!["already".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken);

        let info = loader.get_addon_info("greeter").await.unwrap();
        assert_eq!(info.source, AddonSourceKind::Discovered);
        assert!(info.installed);
    }

    #[tokio::test]
    async fn test_scan_filters_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        write_script_package(dir.path(), "discord-notify", "1.0.0", &[]).await;
        write_script_package(dir.path(), "mysql-backup", "2.0.0", &[]).await;

        let discovery = AddonDiscovery::new(vec![dir.path().to_path_buf()]);

        assert_eq!(discovery.scan(None).await.len(), 2);
        let hits = discovery.scan(Some("discord")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "discord-notify");
        assert!(!hits[0].installed);
    }
}
