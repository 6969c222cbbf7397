//! 테스트 공용 fixture

use crate::addon::AddonEnvironment;
use crate::command::AddonCommand;
use crate::host::{HostApi, ProjectManifest};
use async_trait::async_trait;
use pawnctl_foundation::{AddonSettings, Error, EventBus, PawnctlConfig, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// 아무 것도 하지 않는 호스트
pub struct NullHost {
    project_dir: PathBuf,
}

impl NullHost {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }
}

#[async_trait]
impl HostApi for NullHost {
    fn project_dir(&self) -> &Path {
        &self.project_dir
    }
    async fn read_file(&self, path: &str) -> Result<String> {
        Err(Error::NotFound(path.to_string()))
    }
    async fn write_file(&self, _path: &str, _contents: &str) -> Result<()> {
        Ok(())
    }
    async fn file_exists(&self, _path: &str) -> bool {
        false
    }
    async fn install_package(&self, _package: &str) -> Result<()> {
        Ok(())
    }
    async fn uninstall_package(&self, _package: &str) -> Result<()> {
        Ok(())
    }
    async fn build(&self) -> Result<()> {
        Ok(())
    }
    async fn start_server(&self) -> Result<()> {
        Ok(())
    }
    async fn stop_server(&self) -> Result<()> {
        Ok(())
    }
    async fn register_command(&self, _addon: &str, _command: AddonCommand) -> Result<()> {
        Ok(())
    }
    async fn call_original_command(&self, _name: &str, _args: Vec<String>) -> Result<()> {
        Ok(())
    }
    async fn manifest(&self) -> Result<ProjectManifest> {
        Ok(ProjectManifest::new(&self.project_dir))
    }
}

/// 임시 디렉토리 기반 설정 (설치/레지스트리 경로 포함)
pub fn test_config(root: &Path) -> PawnctlConfig {
    let mut config = PawnctlConfig::new();
    config.addons = AddonSettings::default()
        .with_install_dir(root.join("installed"))
        .with_registry_file(root.join("installed").join("registry.json"))
        .with_retry_delay_ms(1);
    config
}

pub fn test_environment(root: &Path) -> AddonEnvironment {
    AddonEnvironment::new(
        Arc::new(test_config(root)),
        Arc::new(EventBus::new()),
        Arc::new(NullHost::new(root)),
    )
}

/// `<parent>/<name>/package.json` 스크립트 addon 작성
pub async fn write_script_package(
    parent: &Path,
    name: &str,
    version: &str,
    dependencies: &[(&str, &str)],
) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).await.unwrap();

    let constraints: serde_json::Map<String, serde_json::Value> = dependencies
        .iter()
        .map(|(dep, constraint)| (dep.to_string(), json!(constraint)))
        .collect();
    let package = json!({
        "name": name,
        "version": version,
        "description": format!("{} test addon", name),
        "author": "tester",
        "license": "MIT",
        "pawnAddon": {
            "dependencyConstraints": constraints,
        }
    });

    fs::write(dir.join("package.json"), package.to_string())
        .await
        .unwrap();
    dir
}

/// builtin factory 키를 가리키는 패키지 작성
pub async fn write_builtin_package(parent: &Path, name: &str, key: &str) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).await.unwrap();
    let package = json!({
        "name": name,
        "version": "1.0.0",
        "pawnAddon": { "builtin": key }
    });
    fs::write(dir.join("package.json"), package.to_string())
        .await
        .unwrap();
    dir
}
