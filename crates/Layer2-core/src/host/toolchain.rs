//! ShellToolchain - 설정의 shell 명령으로 툴체인 실행

use super::Toolchain;
use crate::shell::run_shell;
use async_trait::async_trait;
use pawnctl_foundation::{Error, Result, ToolchainConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// 툴체인 명령 기본 타임아웃
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `toolchain` 설정 섹션 기반 툴체인
#[derive(Debug, Clone)]
pub struct ShellToolchain {
    config: ToolchainConfig,
    timeout: Duration,
}

impl ShellToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self {
            config,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, action: &str, command: Option<&String>, project_dir: &Path) -> Result<()> {
        let command = command.ok_or_else(|| {
            Error::Config(format!(
                "No toolchain command configured for '{}'; set toolchain.{} in .pawnctl/config.json",
                action, action
            ))
        })?;

        info!("Running {}: {}", action, command);
        let output = run_shell(command, project_dir, &HashMap::new(), self.timeout).await?;

        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
        }
        if output.success {
            debug!("{} finished", action);
            Ok(())
        } else {
            Err(Error::command_failed(action, output.failure_message()))
        }
    }
}

fn with_package(template: Option<&String>, package: &str) -> Option<String> {
    template.map(|t| t.replace("{package}", package))
}

#[async_trait]
impl Toolchain for ShellToolchain {
    async fn install_package(&self, project_dir: &Path, package: &str) -> Result<()> {
        let command = with_package(self.config.install_package.as_ref(), package);
        self.run("installPackage", command.as_ref(), project_dir).await
    }

    async fn uninstall_package(&self, project_dir: &Path, package: &str) -> Result<()> {
        let command = with_package(self.config.uninstall_package.as_ref(), package);
        self.run("uninstallPackage", command.as_ref(), project_dir)
            .await
    }

    async fn build(&self, project_dir: &Path) -> Result<()> {
        self.run("build", self.config.build.as_ref(), project_dir).await
    }

    async fn start_server(&self, project_dir: &Path) -> Result<()> {
        self.run("start", self.config.start.as_ref(), project_dir).await
    }

    async fn stop_server(&self, project_dir: &Path) -> Result<()> {
        self.run("stop", self.config.stop.as_ref(), project_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_command_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ShellToolchain::new(ToolchainConfig::default());

        let err = toolchain.build(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = ShellToolchain::new(ToolchainConfig {
            install_package: Some("echo {package} > installed.txt".into()),
            ..Default::default()
        });

        toolchain
            .install_package(dir.path(), "pawn-lang/samp-stdlib")
            .await
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("installed.txt")).unwrap();
        assert_eq!(written.trim(), "pawn-lang/samp-stdlib");
    }
}
