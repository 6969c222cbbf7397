//! LocalHost - 프로젝트 디렉토리 기반 HostApi 구현

use super::manifest::ProjectManifest;
use super::{HostApi, Toolchain};
use crate::command::{AddonCommand, CommandInvocation, CommandProgram, CommandResolver, RegistrationOutcome};
use crate::hook::{HookContext, HookEvent, HookManager};
use async_trait::async_trait;
use pawnctl_foundation::{Error, Result};
use serde_json::{json, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// 로컬 프로젝트 호스트
pub struct LocalHost {
    project_dir: PathBuf,
    toolchain: Arc<dyn Toolchain>,
    hooks: Arc<HookManager>,
    program: Arc<CommandProgram>,
    resolver: Arc<RwLock<CommandResolver>>,
}

impl LocalHost {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        toolchain: Arc<dyn Toolchain>,
        hooks: Arc<HookManager>,
        program: Arc<CommandProgram>,
        resolver: Arc<RwLock<CommandResolver>>,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            toolchain,
            hooks,
            program,
            resolver,
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// pre hook → 작업 → post hook (post는 성공 여부를 데이터로 받음)
    async fn with_hooks<F, Fut>(&self, pre: HookEvent, post: HookEvent, data: Value, action: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.hooks
            .execute_hook(HookContext::new(pre, &self.project_dir).with_data(data.clone()))
            .await;

        let result = action().await;

        let mut post_data = data;
        if let Value::Object(map) = &mut post_data {
            map.insert("success".into(), json!(result.is_ok()));
            if let Err(e) = &result {
                map.insert("error".into(), json!(e.to_string()));
            }
        }
        self.hooks
            .execute_hook(HookContext::new(post, &self.project_dir).with_data(post_data))
            .await;

        result
    }
}

#[async_trait]
impl HostApi for LocalHost {
    fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.resolve_path(path)).await?)
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<()> {
        let path = self.resolve_path(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents).await?;
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> bool {
        fs::metadata(self.resolve_path(path)).await.is_ok()
    }

    async fn install_package(&self, package: &str) -> Result<()> {
        self.with_hooks(
            HookEvent::PreInstall,
            HookEvent::PostInstall,
            json!({ "package": package }),
            || self.toolchain.install_package(&self.project_dir, package),
        )
        .await
    }

    async fn uninstall_package(&self, package: &str) -> Result<()> {
        self.with_hooks(
            HookEvent::PreUninstall,
            HookEvent::PostUninstall,
            json!({ "package": package }),
            || self.toolchain.uninstall_package(&self.project_dir, package),
        )
        .await
    }

    async fn build(&self) -> Result<()> {
        self.with_hooks(
            HookEvent::PreBuild,
            HookEvent::PostBuild,
            json!({ "projectDir": self.project_dir.display().to_string() }),
            || self.toolchain.build(&self.project_dir),
        )
        .await
    }

    async fn start_server(&self) -> Result<()> {
        self.with_hooks(
            HookEvent::PreStart,
            HookEvent::PostStart,
            json!({ "projectDir": self.project_dir.display().to_string() }),
            || self.toolchain.start_server(&self.project_dir),
        )
        .await
    }

    async fn stop_server(&self) -> Result<()> {
        self.with_hooks(
            HookEvent::PreStop,
            HookEvent::PostStop,
            json!({ "projectDir": self.project_dir.display().to_string() }),
            || self.toolchain.stop_server(&self.project_dir),
        )
        .await
    }

    async fn register_command(&self, addon: &str, command: AddonCommand) -> Result<()> {
        if command.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Addon '{}' tried to register a command without a name",
                addon
            )));
        }

        let name = command.name.clone();
        let outcome = self
            .resolver
            .write()
            .await
            .register_command(command.from_addon(addon));
        if let RegistrationOutcome::Rejected { winner } = &outcome {
            warn!(
                "Command '{}' from addon '{}' not activated; '{}' keeps it",
                name, addon, winner
            );
        }

        let resolver = self.resolver.read().await;
        let report = resolver
            .register_addon_commands_with_program(&self.program)
            .await;
        debug!(
            "Command surface refreshed: {} overridden, {} added, {} skipped",
            report.overridden.len(),
            report.added.len(),
            report.skipped.len()
        );
        Ok(())
    }

    async fn call_original_command(&self, name: &str, args: Vec<String>) -> Result<()> {
        let invocation = CommandInvocation::new(name, &self.project_dir).parse_args(args);
        self.program.call_original(name, invocation).await
    }

    async fn manifest(&self) -> Result<ProjectManifest> {
        Ok(ProjectManifest::load(&self.project_dir)
            .await?
            .with_hooks(self.hooks.clone()))
    }
}
