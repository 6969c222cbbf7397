//! AddonLoader - addon 로드, 검증, 활성화 및 메모리 테이블

use super::retry::{recovery_hints, with_retry, RetryPolicy};
use crate::addon::{
    Addon, AddonEnvironment, AddonFactoryRegistry, AddonInfo, AddonManifest, InfoOverrides,
    ScriptAddon,
};
use pawnctl_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 테이블 항목: 영속 정보 + 활성 인스턴스
struct LoadedEntry {
    info: AddonInfo,
    instance: Option<Arc<dyn Addon>>,
}

#[derive(Default)]
struct AddonTable {
    entries: HashMap<String, LoadedEntry>,
    /// 등록 순서 (hook 디스패치 순서)
    order: Vec<String>,
}

impl AddonTable {
    fn insert(&mut self, name: String, entry: LoadedEntry) {
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.insert(name, entry);
    }

    fn remove(&mut self, name: &str) -> Option<LoadedEntry> {
        self.order.retain(|n| n != name);
        self.entries.remove(name)
    }

    fn ordered(&self) -> impl Iterator<Item = &LoadedEntry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }
}

/// Addon 로더
pub struct AddonLoader {
    table: RwLock<AddonTable>,
    factories: Arc<AddonFactoryRegistry>,
    environment: AddonEnvironment,
    retry: RetryPolicy,
    script_timeout: Duration,
}

impl AddonLoader {
    pub fn new(environment: AddonEnvironment, factories: Arc<AddonFactoryRegistry>) -> Self {
        let settings = &environment.config.addons;
        let retry = RetryPolicy::from_settings(settings);
        let script_timeout = settings.script_timeout();

        Self {
            table: RwLock::new(AddonTable::default()),
            factories,
            environment,
            retry,
            script_timeout,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn environment(&self) -> &AddonEnvironment {
        &self.environment
    }

    pub fn factories(&self) -> &Arc<AddonFactoryRegistry> {
        &self.factories
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 경로에서 addon 로드 (읽기 → 생성 → 검증 → 활성화)
    ///
    /// 일시적 에러는 재시도한다. 테이블에는 등록하지 않으며
    /// 호출자가 `register_addon` 으로 상태와 함께 등록한다.
    pub async fn load_addon(&self, path: &Path) -> Result<Arc<dyn Addon>> {
        let operation = format!("load addon {}", path.display());
        match with_retry(&self.retry, &operation, || self.try_load(path)).await {
            Ok(addon) => Ok(addon),
            Err(e) => {
                error!("Failed to load addon from {}: {}", path.display(), e);
                for hint in recovery_hints(&e) {
                    info!("  hint: {}", hint);
                }
                Err(e)
            }
        }
    }

    async fn try_load(&self, path: &Path) -> Result<Arc<dyn Addon>> {
        let manifest = AddonManifest::from_dir(path).await?;

        let addon: Arc<dyn Addon> = match manifest.builtin_key() {
            Some(key) => self.factories.resolve(key, &manifest)?,
            None => Arc::new(ScriptAddon::new(
                &manifest,
                path,
                self.environment.project_dir(),
                self.script_timeout,
            )?),
        };

        validate_addon(addon.as_ref(), path)?;

        let metadata = addon.metadata();
        let ctx = self.environment.context_for(&metadata.name, path);
        addon.activate(ctx).await?;

        debug!("Activated addon '{}' v{}", metadata.name, metadata.version);
        Ok(addon)
    }

    // ========================================================================
    // 테이블 관리
    // ========================================================================

    /// 활성 인스턴스 등록 (같은 이름은 교체)
    pub async fn register_addon(&self, addon: Arc<dyn Addon>, overrides: InfoOverrides) -> AddonInfo {
        let mut info = AddonInfo::from_metadata(&addon.metadata());
        overrides.apply(&mut info);

        let mut table = self.table.write().await;
        table.insert(
            info.name.clone(),
            LoadedEntry {
                info: info.clone(),
                instance: Some(addon),
            },
        );
        info
    }

    /// 인스턴스 없이 정보만 등록 (비활성화/로드 실패 항목)
    pub async fn register_info(&self, info: AddonInfo) {
        let mut table = self.table.write().await;
        table.insert(
            info.name.clone(),
            LoadedEntry {
                info,
                instance: None,
            },
        );
    }

    /// 비활성화 후 테이블에서 제거
    pub async fn unload_addon(&self, name: &str) -> Result<AddonInfo> {
        let entry = self
            .table
            .write()
            .await
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("addon '{}'", name)))?;

        if let Some(instance) = entry.instance {
            if let Err(e) = instance.deactivate().await {
                warn!("Addon '{}' failed to deactivate cleanly: {}", name, e);
            }
        }

        info!("Unloaded addon '{}'", name);
        Ok(entry.info)
    }

    /// 인스턴스만 내리고 정보는 유지 (`enabled = false`)
    pub async fn deactivate_addon(&self, name: &str) -> Result<AddonInfo> {
        let (instance, info) = {
            let mut table = self.table.write().await;
            let entry = table
                .entries
                .get_mut(name)
                .ok_or_else(|| Error::NotFound(format!("addon '{}'", name)))?;
            entry.info.enabled = false;
            (entry.instance.take(), entry.info.clone())
        };

        if let Some(instance) = instance {
            if let Err(e) = instance.deactivate().await {
                warn!("Addon '{}' failed to deactivate cleanly: {}", name, e);
            }
        }

        Ok(info)
    }

    /// 정보 수정
    pub async fn update_info<F>(&self, name: &str, f: F) -> Option<AddonInfo>
    where
        F: FnOnce(&mut AddonInfo),
    {
        let mut table = self.table.write().await;
        table.entries.get_mut(name).map(|entry| {
            f(&mut entry.info);
            entry.info.clone()
        })
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub async fn get_addon(&self, name: &str) -> Option<Arc<dyn Addon>> {
        self.table
            .read()
            .await
            .entries
            .get(name)
            .and_then(|entry| entry.instance.clone())
    }

    /// 활성 인스턴스 (등록 순서)
    pub async fn get_all_addons(&self) -> Vec<Arc<dyn Addon>> {
        self.table
            .read()
            .await
            .ordered()
            .filter_map(|entry| entry.instance.clone())
            .collect()
    }

    pub async fn get_addon_info(&self, name: &str) -> Option<AddonInfo> {
        self.table
            .read()
            .await
            .entries
            .get(name)
            .map(|entry| entry.info.clone())
    }

    /// 모든 정보 (등록 순서)
    pub async fn get_all_addon_infos(&self) -> Vec<AddonInfo> {
        self.table
            .read()
            .await
            .ordered()
            .map(|entry| entry.info.clone())
            .collect()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.table.read().await.entries.contains_key(name)
    }

    pub async fn is_active(&self, name: &str) -> bool {
        self.table
            .read()
            .await
            .entries
            .get(name)
            .is_some_and(|entry| entry.instance.is_some())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.entries.is_empty()
    }
}

/// 구조 검증 (필수 메타데이터, 명령어 이름)
fn validate_addon(addon: &dyn Addon, path: &Path) -> Result<()> {
    let metadata = addon.metadata();
    let required = [
        ("name", &metadata.name),
        ("version", &metadata.version),
        ("description", &metadata.description),
        ("author", &metadata.author),
        ("license", &metadata.license),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Addon at {} is missing required field '{}'",
                path.display(),
                field
            )));
        }
    }

    for command in addon.commands() {
        if command.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Addon '{}' declares a command without a name",
                metadata.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::{AddonContext, AddonMetadata, AddonSourceKind};
    use crate::test_support::{test_environment, write_builtin_package, write_script_package};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        metadata: AddonMetadata,
        deactivated: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Addon for Tracked {
        fn metadata(&self) -> AddonMetadata {
            self.metadata.clone()
        }

        async fn deactivate(&self) -> Result<()> {
            self.deactivated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// `activate` 가 매번 같은 에러를 내는 addon
    struct FailingActivate {
        metadata: AddonMetadata,
        activations: Arc<AtomicUsize>,
        error: fn() -> Error,
    }

    #[async_trait]
    impl Addon for FailingActivate {
        fn metadata(&self) -> AddonMetadata {
            self.metadata.clone()
        }

        async fn activate(&self, _ctx: Arc<AddonContext>) -> Result<()> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }

    async fn activations_until_failure(error: fn() -> Error) -> (usize, Error) {
        let dir = tempfile::tempdir().unwrap();
        let addon_dir = write_builtin_package(dir.path(), "irc-bridge", "irc-bridge").await;

        let activations = Arc::new(AtomicUsize::new(0));
        let factories = Arc::new(AddonFactoryRegistry::new());
        factories.register_instance(
            "irc-bridge",
            Arc::new(FailingActivate {
                metadata: complete("irc-bridge"),
                activations: activations.clone(),
                error,
            }),
        );

        let loader = fast_loader(dir.path(), factories);
        let err = loader.load_addon(&addon_dir).await.err().unwrap();
        assert!(!loader.contains("irc-bridge").await);
        (activations.load(Ordering::SeqCst), err)
    }

    fn complete(name: &str) -> AddonMetadata {
        AddonMetadata::new(name, "1.0.0")
            .with_description("test addon")
            .with_author("tester")
            .with_license("MIT")
    }

    fn fast_loader(dir: &Path, factories: Arc<AddonFactoryRegistry>) -> AddonLoader {
        AddonLoader::new(test_environment(dir), factories).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn test_load_script_addon() {
        let dir = tempfile::tempdir().unwrap();
        let addon_dir = write_script_package(dir.path(), "greeter", "1.2.0", &[]).await;

        let loader = fast_loader(dir.path(), Arc::new(AddonFactoryRegistry::new()));
        let addon = loader.load_addon(&addon_dir).await.unwrap();
        assert_eq!(addon.metadata().name, "greeter");
        assert!(!loader.contains("greeter").await);

        let info = loader
            .register_addon(addon, InfoOverrides::installed(AddonSourceKind::Local, &addon_dir))
            .await;
        assert!(info.installed);
        assert!(loader.is_active("greeter").await);
    }

    #[tokio::test]
    async fn test_validation_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let addon_dir = write_builtin_package(dir.path(), "incomplete", "incomplete").await;

        let calls = Arc::new(AtomicUsize::new(0));
        let factories = Arc::new(AddonFactoryRegistry::new());
        let counter = calls.clone();
        factories.register_constructor("incomplete", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Tracked {
                metadata: AddonMetadata::new("incomplete", "1.0.0"),
                deactivated: Arc::new(AtomicUsize::new(0)),
            }) as Arc<dyn Addon>)
        });

        let loader = fast_loader(dir.path(), factories);
        let err = loader.load_addon(&addon_dir).await.err().unwrap();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let addon_dir = write_builtin_package(dir.path(), "flaky", "flaky").await;

        let calls = Arc::new(AtomicUsize::new(0));
        let factories = Arc::new(AddonFactoryRegistry::new());
        let counter = calls.clone();
        factories.register_constructor("flaky", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "ECONNRESET",
            )))
        });

        let loader = fast_loader(dir.path(), factories);
        assert!(loader.load_addon(&addon_dir).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_activate_connection_reset_is_retried() {
        let (activations, err) = activations_until_failure(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "ECONNRESET",
            ))
        })
        .await;
        assert_eq!(activations, 3);
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_activate_syntax_error_is_not_retried() {
        let (activations, err) = activations_until_failure(|| {
            Error::addon("irc-bridge", "SyntaxError: Unexpected token '}'")
        })
        .await;
        assert_eq!(activations, 1);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_info_and_unload_removes() {
        let dir = tempfile::tempdir().unwrap();
        let loader = fast_loader(dir.path(), Arc::new(AddonFactoryRegistry::new()));
        let deactivated = Arc::new(AtomicUsize::new(0));

        loader
            .register_addon(
                Arc::new(Tracked {
                    metadata: complete("alpha"),
                    deactivated: deactivated.clone(),
                }),
                InfoOverrides::new(),
            )
            .await;
        loader
            .register_addon(
                Arc::new(Tracked {
                    metadata: complete("beta"),
                    deactivated: deactivated.clone(),
                }),
                InfoOverrides::new(),
            )
            .await;

        let info = loader.deactivate_addon("alpha").await.unwrap();
        assert!(!info.enabled);
        assert!(loader.contains("alpha").await);
        assert!(!loader.is_active("alpha").await);
        assert_eq!(loader.get_all_addons().await.len(), 1);

        loader.unload_addon("beta").await.unwrap();
        assert!(!loader.contains("beta").await);
        assert_eq!(deactivated.load(Ordering::SeqCst), 2);

        assert!(matches!(
            loader.unload_addon("beta").await,
            Err(Error::NotFound(_))
        ));
    }
}
