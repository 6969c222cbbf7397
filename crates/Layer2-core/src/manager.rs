//! AddonManager - addon 런타임의 진입점
//!
//! 로더, hook, 명령어, 레지스트리, 설치기, 복구를 하나의 컨텍스트로 묶는다.
//! 전역 인스턴스는 없으며 호출자가 만들어 넘겨 쓴다.
//!
//! ```ignore
//! let manager = AddonManager::builder(PawnctlConfig::load()?)
//!     .project_dir(std::env::current_dir()?)
//!     .build()?;
//!
//! manager.initialize().await?;
//! manager.install("pawn-dev/discord-notify@v1.2.0").await?;
//! manager.run_command("build", vec![]).await?;
//! ```

use crate::addon::{AddonFactoryRegistry, AddonInfo, AddonEnvironment, InfoOverrides};
use crate::command::{
    command_handler, CommandConflict, CommandInvocation, CommandProgram, CommandResolver,
    CommandStats, CommandSummary,
};
use crate::dependency::{
    AutoInstallOptions, AutoInstallReport, DependencyInstaller, DependencyResolution,
    DependencyResolver, DependencyValidation,
};
use crate::discovery::{AddonDiscovery, DiscoveryReport};
use crate::hook::{HookContext, HookEvent, HookManager, HookReport};
use crate::host::{HostApi, LocalHost, ShellToolchain, Toolchain};
use crate::install::{AddonInstaller, AddonUpdate, ArchiveFetcher, GitHubDownloader, UpdateSummary};
use crate::loader::AddonLoader;
use crate::recovery::{AddonRecovery, ErrorRecord, ErrorSummary};
use crate::registry::{AddonRegistry, RegistryLoadResult};
use async_trait::async_trait;
use pawnctl_foundation::event::{addon as addon_events, system as system_events};
use pawnctl_foundation::{Error, EventBus, PawnctlConfig, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

// ============================================================================
// 결과 타입
// ============================================================================

/// `initialize` 결과
#[derive(Debug, Clone, Default)]
pub struct InitializationReport {
    pub registry: RegistryLoadResult,
    pub discovery: DiscoveryReport,
}

/// `install` 결과
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub addon: AddonInfo,
    pub resolution: DependencyResolution,
    /// 의존성 문제가 있을 때의 해결책
    pub suggestions: Vec<String>,
}

// ============================================================================
// Builder
// ============================================================================

/// AddonManager 빌더
pub struct AddonManagerBuilder {
    config: PawnctlConfig,
    project_dir: Option<PathBuf>,
    factories: Option<Arc<AddonFactoryRegistry>>,
    fetcher: Option<Arc<dyn ArchiveFetcher>>,
    toolchain: Option<Arc<dyn Toolchain>>,
    event_bus: Option<Arc<EventBus>>,
    discovery: bool,
}

impl AddonManagerBuilder {
    fn new(config: PawnctlConfig) -> Self {
        Self {
            config,
            project_dir: None,
            factories: None,
            fetcher: None,
            toolchain: None,
            event_bus: None,
            discovery: true,
        }
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// 내장 addon factory
    pub fn factories(mut self, factories: Arc<AddonFactoryRegistry>) -> Self {
        self.factories = Some(factories);
        self
    }

    /// 원격 아카이브 fetcher (기본: GitHubDownloader)
    pub fn fetcher(mut self, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// 빌드/서버 도구 (기본: 설정의 shell 명령)
    pub fn toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.event_bus = Some(events);
        self
    }

    /// 초기화 시 탐색 경로 스캔 여부
    pub fn discovery(mut self, enabled: bool) -> Self {
        self.discovery = enabled;
        self
    }

    pub fn build(self) -> Result<AddonManager> {
        let project_dir = match self.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let config = Arc::new(self.config);
        let settings = &config.addons;

        let events = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new()));
        let registry = AddonRegistry::new(settings.registry_file()?);
        let recovery = Arc::new(
            AddonRecovery::new(registry.clone(), settings).with_event_bus(events.clone()),
        );
        let hooks = Arc::new(
            HookManager::new()
                .with_recovery(recovery.clone())
                .with_event_bus(events.clone()),
        );
        let program = Arc::new(CommandProgram::new());
        let commands = Arc::new(RwLock::new(CommandResolver::new()));

        let toolchain = self.toolchain.unwrap_or_else(|| {
            Arc::new(
                ShellToolchain::new(config.toolchain.clone()).with_timeout(settings.script_timeout()),
            )
        });
        let host: Arc<dyn HostApi> = Arc::new(LocalHost::new(
            &project_dir,
            toolchain,
            hooks.clone(),
            program.clone(),
            commands.clone(),
        ));

        let loader = Arc::new(AddonLoader::new(
            AddonEnvironment::new(config.clone(), events.clone(), host.clone()),
            self.factories
                .unwrap_or_else(|| Arc::new(AddonFactoryRegistry::new())),
        ));

        let fetcher: Arc<dyn ArchiveFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(GitHubDownloader::new(settings)?),
        };
        let installer = AddonInstaller::new(
            loader.clone(),
            hooks.clone(),
            registry.clone(),
            fetcher,
            settings.install_dir()?,
        )
        .with_event_bus(events.clone());

        let discovery = AddonDiscovery::new(settings.discovery_paths(&project_dir)?);

        Ok(AddonManager {
            config,
            project_dir,
            events,
            loader,
            hooks,
            program,
            commands,
            registry,
            recovery,
            installer,
            discovery,
            host,
            discover_on_init: self.discovery,
            initialized: OnceCell::new(),
        })
    }
}

// ============================================================================
// AddonManager
// ============================================================================

/// Addon 매니저
pub struct AddonManager {
    config: Arc<PawnctlConfig>,
    project_dir: PathBuf,
    events: Arc<EventBus>,
    loader: Arc<AddonLoader>,
    hooks: Arc<HookManager>,
    program: Arc<CommandProgram>,
    commands: Arc<RwLock<CommandResolver>>,
    registry: AddonRegistry,
    recovery: Arc<AddonRecovery>,
    installer: AddonInstaller,
    discovery: AddonDiscovery,
    host: Arc<dyn HostApi>,
    discover_on_init: bool,
    initialized: OnceCell<InitializationReport>,
}

impl AddonManager {
    pub fn builder(config: PawnctlConfig) -> AddonManagerBuilder {
        AddonManagerBuilder::new(config)
    }

    pub fn config(&self) -> &PawnctlConfig {
        &self.config
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn loader(&self) -> &Arc<AddonLoader> {
        &self.loader
    }

    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    pub fn program(&self) -> &Arc<CommandProgram> {
        &self.program
    }

    pub fn host(&self) -> &Arc<dyn HostApi> {
        &self.host
    }

    // ========================================================================
    // 초기화
    // ========================================================================

    /// 1회 초기화: 호스트 명령어 → 레지스트리 로드 → 탐색 → hook/명령어 연결
    ///
    /// 두 번째 호출부터는 첫 결과를 그대로 돌려준다.
    pub async fn initialize(&self) -> Result<&InitializationReport> {
        self.initialized
            .get_or_try_init(|| self.run_initialization())
            .await
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.initialize().await.map(|_| ())
    }

    async fn run_initialization(&self) -> Result<InitializationReport> {
        self.register_host_commands().await;

        let registry = self.registry.load_from_registry(&self.loader).await;
        let discovery = if self.discover_on_init {
            self.discovery.discover_and_load(&self.loader).await
        } else {
            DiscoveryReport::default()
        };

        self.rewire().await;

        info!(
            "Addon runtime ready: {} from registry, {} discovered, {} failed",
            registry.loaded.len(),
            discovery.loaded.len(),
            registry.failed.len() + discovery.failed.len()
        );
        self.events
            .publish(system_events::initialized(
                registry.loaded.len(),
                registry.failed.len() + discovery.failed.len(),
                discovery.loaded.len(),
            ))
            .await;

        Ok(InitializationReport {
            registry,
            discovery,
        })
    }

    /// addon이 대체할 수 있는 호스트 명령어
    async fn register_host_commands(&self) {
        let host = self.host.clone();
        self.program
            .add_host_command(
                "build",
                "Compile the gamemode",
                command_handler(move |_| {
                    let host = host.clone();
                    async move { host.build().await }
                }),
            )
            .await;

        let host = self.host.clone();
        self.program
            .add_host_command(
                "start",
                "Start the game server",
                command_handler(move |_| {
                    let host = host.clone();
                    async move { host.start_server().await }
                }),
            )
            .await;

        let host = self.host.clone();
        self.program
            .add_host_command(
                "stop",
                "Stop the game server",
                command_handler(move |_| {
                    let host = host.clone();
                    async move { host.stop_server().await }
                }),
            )
            .await;
    }

    /// 활성 addon 기준으로 hook 색인과 명령어 표면을 다시 만든다
    async fn rewire(&self) {
        let addons = self.loader.get_all_addons().await;
        self.hooks.register_addons(&addons).await;

        let mut resolver = self.commands.write().await;
        for info in self.loader.get_all_addon_infos().await {
            if !self.loader.is_active(&info.name).await {
                resolver.unregister_addon(&info.name);
            }
        }
        for addon in &addons {
            let name = addon.metadata().name;
            resolver.register_addon_commands(&name, addon.commands());
        }

        let report = resolver
            .register_addon_commands_with_program(&self.program)
            .await;
        debug!(
            "Wired {} addon(s): {} command(s) overridden, {} added, {} skipped",
            addons.len(),
            report.overridden.len(),
            report.added.len(),
            report.skipped.len()
        );
    }

    /// 자동 격리된 addon을 실제로 내린다
    async fn apply_quarantine(&self) {
        let quarantined = self.recovery.take_quarantined().await;
        if quarantined.is_empty() {
            return;
        }

        for name in &quarantined {
            match self.loader.deactivate_addon(name).await {
                Ok(_) => info!("Addon '{}' deactivated after repeated failures", name),
                Err(e) => debug!("Quarantined addon '{}' was not loaded: {}", name, e),
            }
            self.commands.write().await.unregister_addon(name);
        }
        self.rewire().await;
    }

    // ========================================================================
    // 설치 / 제거 / 업데이트
    // ========================================================================

    /// 소스에서 설치 후 의존성 상태 보고
    pub async fn install(&self, source: &str) -> Result<InstallReport> {
        self.ensure_initialized().await?;

        let addon = self.installer.install_addon(source).await?;
        self.rewire().await;

        let resolver = DependencyResolver::new(&self.known_infos().await);
        let resolution = resolver.resolve_dependencies(&addon.name);
        let suggestions = resolver.suggest_solutions(&resolution);
        if !resolution.is_satisfied() {
            warn!(
                "Addon '{}' installed with unresolved dependencies ({} missing)",
                addon.name,
                resolution.missing.len()
            );
        }

        Ok(InstallReport {
            addon,
            resolution,
            suggestions,
        })
    }

    pub async fn uninstall(&self, name: &str) -> Result<AddonInfo> {
        self.ensure_initialized().await?;

        let dependents: Vec<String> = self
            .uninstallation_order(name)
            .await
            .into_iter()
            .filter(|n| n != name)
            .collect();
        if !dependents.is_empty() {
            warn!(
                "Addon '{}' is required by {}; they may stop working",
                name,
                dependents.join(", ")
            );
        }

        let info = self.installer.uninstall_addon(name).await?;
        self.commands.write().await.unregister_addon(name);
        self.rewire().await;
        self.recovery.clear_errors(name).await?;
        Ok(info)
    }

    pub async fn update(&self, name: &str) -> Result<AddonUpdate> {
        self.ensure_initialized().await?;
        let result = self.installer.update_github_addon(name).await;
        self.rewire().await;
        result
    }

    pub async fn update_all(&self) -> Result<UpdateSummary> {
        self.ensure_initialized().await?;
        let summary = self.installer.update_all_github_addons().await;
        self.rewire().await;
        Ok(summary)
    }

    // ========================================================================
    // 활성화 / 비활성화
    // ========================================================================

    /// 다시 로드해 활성화 (레지스트리에도 반영)
    pub async fn enable(&self, name: &str) -> Result<AddonInfo> {
        self.ensure_initialized().await?;

        let info = self.find_info(name).await?;
        if self.loader.is_active(name).await {
            self.registry.enable_addon_in_registry(name).await?;
            return Ok(info);
        }

        let path = info
            .path
            .clone()
            .ok_or_else(|| Error::addon(name, "no install path recorded; reinstall the addon"))?;

        let addon = match self.loader.load_addon(&path).await {
            Ok(addon) => addon,
            Err(e) => {
                let message = e.to_string();
                self.loader
                    .update_info(name, |info| info.set_error(message.clone()))
                    .await;
                return Err(Error::addon(name, format!("cannot enable: {}", message)));
            }
        };

        let info = self
            .loader
            .register_addon(
                addon,
                InfoOverrides::from_info(&info)
                    .with_enabled(true)
                    .without_error(),
            )
            .await;
        if !self.registry.enable_addon_in_registry(name).await? && info.installed {
            self.registry.upsert_addon(info.clone()).await?;
        }
        self.recovery.clear_errors(name).await?;
        self.rewire().await;

        info!("Enabled addon '{}'", name);
        self.events.publish(addon_events::enabled(name)).await;
        Ok(info)
    }

    /// 인스턴스를 내리고 비활성화 상태로 기록 (설치 상태는 유지)
    pub async fn disable(&self, name: &str) -> Result<AddonInfo> {
        self.ensure_initialized().await?;

        let info = if self.loader.contains(name).await {
            self.loader.deactivate_addon(name).await?
        } else {
            let mut entry = self
                .registry
                .get_entry(name)
                .await
                .ok_or_else(|| Error::NotFound(format!("Addon '{}' is not installed", name)))?;
            entry.enabled = false;
            entry
        };

        if !self.registry.disable_addon_in_registry(name, None).await? {
            self.registry.upsert_addon(info.clone()).await?;
        }
        self.commands.write().await.unregister_addon(name);
        self.rewire().await;

        info!("Disabled addon '{}'", name);
        self.events
            .publish(addon_events::disabled(name, None))
            .await;
        Ok(info)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 알려진 모든 addon (등록 순서)
    pub async fn list(&self) -> Result<Vec<AddonInfo>> {
        self.ensure_initialized().await?;
        Ok(self.known_infos().await)
    }

    /// 설치된 addon과 탐색 경로의 미설치 후보 검색
    pub async fn search(&self, query: &str) -> Result<Vec<AddonInfo>> {
        self.ensure_initialized().await?;

        let mut hits: Vec<AddonInfo> = self
            .known_infos()
            .await
            .into_iter()
            .filter(|info| info.matches_query(query))
            .collect();
        for candidate in self.discovery.scan(Some(query)).await {
            if !hits.iter().any(|hit| hit.name == candidate.name) {
                hits.push(candidate);
            }
        }
        Ok(hits)
    }

    pub async fn info(&self, name: &str) -> Result<AddonInfo> {
        self.ensure_initialized().await?;
        self.find_info(name).await
    }

    /// 현재 명령어 표면
    pub async fn commands(&self) -> Result<Vec<CommandSummary>> {
        self.ensure_initialized().await?;
        Ok(self.program.list().await)
    }

    pub async fn command_conflicts(&self) -> Vec<CommandConflict> {
        self.commands.read().await.get_command_conflicts().to_vec()
    }

    pub async fn command_stats(&self) -> CommandStats {
        self.commands.read().await.get_stats()
    }

    async fn find_info(&self, name: &str) -> Result<AddonInfo> {
        if let Some(info) = self.loader.get_addon_info(name).await {
            return Ok(info);
        }
        self.registry
            .get_entry(name)
            .await
            .ok_or_else(|| Error::NotFound(format!("Addon '{}' is not installed", name)))
    }

    /// 로더 + 레지스트리 (로더 우선)
    async fn known_infos(&self) -> Vec<AddonInfo> {
        let mut infos = self.loader.get_all_addon_infos().await;
        for entry in self.registry.entries().await {
            if !infos.iter().any(|info| info.name == entry.name) {
                infos.push(entry);
            }
        }
        infos
    }

    // ========================================================================
    // 실행
    // ========================================================================

    /// 명령어 실행 (addon 핸들러 실패는 에러 원장에 기록)
    pub async fn run_command(&self, name: &str, args: Vec<String>) -> Result<()> {
        self.ensure_initialized().await?;

        let chain = self
            .program
            .chain(name)
            .await
            .ok_or_else(|| Error::NotFound(format!("Unknown command '{}'", name)))?;
        let invocation = CommandInvocation::new(name, &self.project_dir).parse_args(args);

        let outcome = chain.execute(invocation).await;
        if let (Some(addon), Some(failure)) = (chain.origin.addon(), &outcome.addon_failure) {
            let error = Error::command_failed(name, failure.clone());
            self.recovery.record_error(addon, &error.to_string()).await;
            self.apply_quarantine().await;
        }
        outcome.result
    }

    /// hook 발생
    pub async fn execute_hook(&self, event: HookEvent, data: Value) -> Result<HookReport> {
        self.ensure_initialized().await?;
        let report = self
            .hooks
            .execute_hook(HookContext::new(event, &self.project_dir).with_data(data))
            .await;
        self.apply_quarantine().await;
        Ok(report)
    }

    /// 사용자 정의 이벤트 발생 (`customEvent` 슬롯)
    pub async fn emit_custom(&self, name: &str, data: Value) -> Result<HookReport> {
        self.ensure_initialized().await?;
        let report = self
            .hooks
            .execute_custom(name, &self.project_dir, data)
            .await;
        self.apply_quarantine().await;
        Ok(report)
    }

    // ========================================================================
    // 의존성
    // ========================================================================

    async fn dependency_resolver(&self) -> DependencyResolver {
        DependencyResolver::new(&self.known_infos().await)
    }

    pub async fn resolve_dependencies(&self, name: &str) -> Result<DependencyResolution> {
        self.ensure_initialized().await?;
        Ok(self.dependency_resolver().await.resolve_dependencies(name))
    }

    pub async fn installation_order(&self, name: &str) -> Result<Vec<String>> {
        self.ensure_initialized().await?;
        let resolver = self.dependency_resolver().await;
        let resolution = resolver.resolve_dependencies(name);
        Ok(resolver.get_installation_order(&resolution))
    }

    pub async fn uninstallation_order(&self, name: &str) -> Vec<String> {
        self.dependency_resolver()
            .await
            .get_uninstallation_order(name)
    }

    pub async fn validate_dependencies(&self, name: &str) -> Result<DependencyValidation> {
        self.ensure_initialized().await?;
        Ok(self.dependency_resolver().await.validate_dependencies(name))
    }

    /// 누락 의존성 설치 (부분 성공도 보고)
    pub async fn install_missing_dependencies(
        &self,
        name: &str,
        options: &AutoInstallOptions,
    ) -> Result<AutoInstallReport> {
        self.ensure_initialized().await?;
        let resolver = self.dependency_resolver().await;
        let resolution = resolver.resolve_dependencies(name);
        let report = resolver
            .auto_install_dependencies(&resolution, self, options)
            .await;
        if !report.installed.is_empty() {
            self.rewire().await;
        }
        Ok(report)
    }

    pub async fn suggest_solutions(&self, name: &str) -> Result<Vec<String>> {
        self.ensure_initialized().await?;
        let resolver = self.dependency_resolver().await;
        let resolution = resolver.resolve_dependencies(name);
        Ok(resolver.suggest_solutions(&resolution))
    }

    // ========================================================================
    // 에러 / 복구
    // ========================================================================

    pub async fn errors(&self, name: &str) -> Vec<ErrorRecord> {
        self.recovery.get_errors(name).await
    }

    pub async fn error_summary(&self) -> Vec<ErrorSummary> {
        self.recovery.summary().await
    }

    pub async fn clear_errors(&self, name: &str) -> Result<()> {
        self.recovery.clear_errors(name).await
    }

    /// 수동 격리 (레지스트리 비활성화 + 인스턴스 내림)
    pub async fn quarantine(&self, name: &str, reason: &str) -> Result<()> {
        self.ensure_initialized().await?;
        self.recovery.attempt_addon_recovery(name, reason).await?;
        self.apply_quarantine().await;
        Ok(())
    }

    /// 격리된 addon 복귀: 에러 원장을 비우고 다시 활성화
    pub async fn recover(&self, name: &str) -> Result<AddonInfo> {
        self.ensure_initialized().await?;
        self.recovery.clear_errors(name).await?;
        self.enable(name).await
    }

    /// 현재 메모리 상태를 레지스트리에 저장 (전체 교체)
    pub async fn save(&self) -> Result<()> {
        self.registry.save_to_registry(&self.loader).await
    }
}

#[async_trait]
impl DependencyInstaller for AddonManager {
    async fn install_dependency(&self, source: &str, _options: &AutoInstallOptions) -> Result<AddonInfo> {
        self.installer.install_addon(source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::{Addon, AddonMetadata};
    use crate::command::AddonCommand;
    use crate::hook::{hook_handler, AddonHooks};
    use crate::test_support::{test_config, write_builtin_package, write_script_package};
    use pawnctl_foundation::EventFilter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 명령어와 preBuild hook이 항상 실패하는 내장 addon
    struct FlakyAddon {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Addon for FlakyAddon {
        fn metadata(&self) -> AddonMetadata {
            AddonMetadata::new("flaky", "1.0.0")
                .with_description("Fails on purpose")
                .with_author("tests")
                .with_license("MIT")
        }

        fn hooks(&self) -> AddonHooks {
            AddonHooks::new().with(
                HookEvent::PreBuild,
                hook_handler(|_| async { Err(Error::from("compiler not found")) }),
            )
        }

        fn commands(&self) -> Vec<AddonCommand> {
            let calls = self.calls.clone();
            vec![AddonCommand::new(
                "explode",
                command_handler(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::from("boom")) }
                }),
            )]
        }
    }

    fn manager(root: &Path) -> AddonManager {
        manager_with(root, Arc::new(AddonFactoryRegistry::new()))
    }

    fn manager_with(root: &Path, factories: Arc<AddonFactoryRegistry>) -> AddonManager {
        AddonManager::builder(test_config(root))
            .project_dir(root.join("project"))
            .factories(factories)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_install_list_disable() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script_package(&dir.path().join("src"), "motd", "1.0.0", &[]).await;
        let manager = manager(dir.path());

        let report = manager
            .install(&source.display().to_string())
            .await
            .unwrap();
        assert!(report.resolution.is_satisfied());

        let listed = manager.list().await.unwrap();
        let motd = listed.iter().find(|a| a.name == "motd").unwrap();
        assert!(motd.installed);
        assert!(motd.enabled);

        manager.disable("motd").await.unwrap();
        let listed = manager.list().await.unwrap();
        let motd = listed.iter().find(|a| a.name == "motd").unwrap();
        assert!(motd.installed);
        assert!(!motd.enabled);
        assert!(!manager.loader().is_active("motd").await);

        let enabled = manager.enable("motd").await.unwrap();
        assert!(enabled.enabled);
        assert!(manager.loader().is_active("motd").await);
    }

    #[tokio::test]
    async fn test_registry_round_trip_on_fresh_manager() {
        let dir = tempfile::tempdir().unwrap();
        let first = manager(dir.path());
        for name in ["alpha", "beta"] {
            let source = write_script_package(&dir.path().join("src"), name, "1.0.0", &[]).await;
            first.install(&source.display().to_string()).await.unwrap();
        }
        first.save().await.unwrap();

        let second = manager(dir.path());
        let report = second.initialize().await.unwrap();
        let mut loaded = report.registry.loaded.clone();
        loaded.sort();
        assert_eq!(loaded, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_install_reports_missing_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script_package(
            &dir.path().join("src"),
            "gamemode",
            "1.0.0",
            &[("mysql", "^2.0.0")],
        )
        .await;
        let manager = manager(dir.path());

        let report = manager
            .install(&source.display().to_string())
            .await
            .unwrap();
        assert_eq!(report.resolution.missing, vec!["mysql"]);
        assert!(report.suggestions[0].contains("mysql"));

        let validation = manager.validate_dependencies("gamemode").await.unwrap();
        assert!(!validation.valid);
    }

    #[tokio::test]
    async fn test_install_missing_dependencies_from_local_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let gamemode =
            write_script_package(&src, "gamemode", "1.0.0", &[("mysql", "^2.0.0")]).await;
        let deps = dir.path().join("deps");
        write_script_package(&deps, "mysql", "2.1.0", &[]).await;
        let manager = manager(dir.path());
        manager
            .install(&gamemode.display().to_string())
            .await
            .unwrap();

        let options = AutoInstallOptions {
            source_prefix: Some(format!("{}/", deps.display())),
            ..Default::default()
        };
        let report = manager
            .install_missing_dependencies("gamemode", &options)
            .await
            .unwrap();
        assert_eq!(report.installed, vec!["mysql"]);
        assert!(report.failed.is_empty());

        assert!(manager.validate_dependencies("gamemode").await.unwrap().valid);
        assert_eq!(
            manager.installation_order("gamemode").await.unwrap(),
            vec!["mysql", "gamemode"]
        );
        assert_eq!(
            manager.uninstallation_order("mysql").await,
            vec!["gamemode", "mysql"]
        );
    }

    #[tokio::test]
    async fn test_repeated_failures_quarantine_addon() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let factories = Arc::new(AddonFactoryRegistry::new());
        factories.register_instance(
            "flaky",
            Arc::new(FlakyAddon {
                calls: calls.clone(),
            }),
        );
        let package = write_builtin_package(&dir.path().join("src"), "flaky", "flaky").await;
        let manager = manager_with(dir.path(), factories);
        manager
            .install(&package.display().to_string())
            .await
            .unwrap();

        let report = manager
            .execute_hook(HookEvent::PreBuild, Value::Null)
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(manager.errors("flaky").await.len(), 1);

        for _ in 0..2 {
            let err = manager.run_command("explode", vec![]).await.unwrap_err();
            assert!(matches!(err, Error::CommandFailed { .. }));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // 세 번째 실패에서 격리되어 명령어와 hook이 사라진다
        assert!(!manager.loader().is_active("flaky").await);
        assert!(!manager.program().has_command("explode").await);
        assert_eq!(manager.hooks().handler_count(HookEvent::PreBuild).await, 0);
        assert!(!manager.info("flaky").await.unwrap().enabled);
        assert_eq!(manager.errors("flaky").await.len(), 3);

        let recovered = manager.recover("flaky").await.unwrap();
        assert!(recovered.enabled);
        assert!(manager.errors("flaky").await.is_empty());
        assert!(manager.program().has_command("explode").await);
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_published() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_script_package(&dir.path().join("src"), "motd", "1.0.0", &[]).await;
        let events = Arc::new(EventBus::new());
        let manager = AddonManager::builder(test_config(dir.path()))
            .project_dir(dir.path().join("project"))
            .event_bus(events.clone())
            .build()
            .unwrap();

        manager
            .install(&source.display().to_string())
            .await
            .unwrap();
        manager.disable("motd").await.unwrap();
        manager.uninstall("motd").await.unwrap();

        let types: Vec<String> = events
            .recent_matching(&EventFilter::all())
            .await
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "system.initialized",
                "install.installed",
                "addon.disabled",
                "install.uninstalled"
            ]
        );
        // 로컬 소스는 제거해도 파일이 남는다
        assert!(source.join("package.json").exists());
    }

    #[tokio::test]
    async fn test_host_commands_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.initialize().await.unwrap();

        let names: Vec<String> = manager
            .commands()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["build", "start", "stop"]);
        assert!(manager.run_command("nope", vec![]).await.is_err());
    }
}
