//! ScriptAddon - shell 명령으로 선언된 addon
//!
//! `package.json` 의 hook/명령어를 addon 디렉토리에서 subprocess로 실행한다.
//! hook 컨텍스트는 환경 변수로 전달된다.
//!
//! | 변수                   | 값                          |
//! |------------------------|-----------------------------|
//! | `PAWNCTL_HOOK`         | hook 이름 (`preBuild` 등)   |
//! | `PAWNCTL_EVENT`        | customEvent 이름            |
//! | `PAWNCTL_PROJECT_DIR`  | 프로젝트 루트               |
//! | `PAWNCTL_HOOK_DATA`    | hook 데이터 (JSON)          |
//! | `PAWNCTL_ADDON_DIR`    | addon 디렉토리              |

use super::context::AddonContext;
use super::manifest::{AddonManifest, AddonSection};
use super::traits::Addon;
use super::types::AddonMetadata;
use crate::command::{command_handler, AddonCommand, CommandInvocation};
use crate::hook::{hook_handler, AddonHooks, HookContext, HookEvent};
use crate::shell::run_shell;
use async_trait::async_trait;
use pawnctl_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 스크립트 addon
pub struct ScriptAddon {
    metadata: AddonMetadata,
    section: AddonSection,
    hooks: Vec<(HookEvent, String)>,
    dir: PathBuf,
    project_dir: PathBuf,
    timeout: Duration,
}

impl ScriptAddon {
    /// manifest 검증 후 생성
    ///
    /// 알 수 없는 hook 이름, 이름이나 `run`이 빈 명령어는 `Validation`.
    pub fn new(
        manifest: &AddonManifest,
        dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        let section = manifest.section().cloned().unwrap_or_default();
        let metadata = manifest.metadata();

        let mut hooks = Vec::with_capacity(section.hooks.len());
        for (name, command) in &section.hooks {
            let event = HookEvent::from_str(name).map_err(|_| {
                Error::Validation(format!(
                    "Addon '{}' declares unknown hook '{}'",
                    metadata.name, name
                ))
            })?;
            if command.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Addon '{}' hook '{}' has an empty command",
                    metadata.name, name
                )));
            }
            hooks.push((event, command.clone()));
        }

        for spec in &section.commands {
            if spec.name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Addon '{}' declares a command without a name",
                    metadata.name
                )));
            }
            if spec.run.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Addon '{}' command '{}' has no handler",
                    metadata.name, spec.name
                )));
            }
        }

        Ok(Self {
            metadata,
            section,
            hooks,
            dir: dir.into(),
            project_dir: project_dir.into(),
            timeout,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn base_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(
            "PAWNCTL_PROJECT_DIR".to_string(),
            self.project_dir.display().to_string(),
        );
        env.insert(
            "PAWNCTL_ADDON_DIR".to_string(),
            self.dir.display().to_string(),
        );
        env.insert("PAWNCTL_ADDON".to_string(), self.metadata.name.clone());
        env
    }

    /// 라이프사이클 명령 실행 (activate/deactivate)
    async fn run_lifecycle(&self, phase: &str, command: Option<&String>) -> Result<()> {
        let Some(command) = command else {
            return Ok(());
        };

        debug!("Running {} script for addon '{}'", phase, self.metadata.name);
        let output = run_shell(command, &self.dir, &self.base_env(), self.timeout).await?;
        if output.success {
            Ok(())
        } else {
            Err(Error::addon(
                &self.metadata.name,
                format!("{} script failed: {}", phase, output.failure_message()),
            ))
        }
    }
}

#[async_trait]
impl Addon for ScriptAddon {
    fn metadata(&self) -> AddonMetadata {
        self.metadata.clone()
    }

    fn hooks(&self) -> AddonHooks {
        let mut hooks = AddonHooks::new();

        for (event, command) in &self.hooks {
            let command = command.clone();
            let addon = self.metadata.name.clone();
            let dir = self.dir.clone();
            let env = self.base_env();
            let timeout = self.timeout;

            hooks.set(
                *event,
                hook_handler(move |ctx: HookContext| {
                    let command = command.clone();
                    let addon = addon.clone();
                    let dir = dir.clone();
                    let mut env = env.clone();
                    async move {
                        env.insert("PAWNCTL_HOOK".to_string(), ctx.event.as_str().to_string());
                        env.insert(
                            "PAWNCTL_PROJECT_DIR".to_string(),
                            ctx.project_dir.display().to_string(),
                        );
                        env.insert("PAWNCTL_HOOK_DATA".to_string(), ctx.data.to_string());
                        if let Some(name) = &ctx.custom_name {
                            env.insert("PAWNCTL_EVENT".to_string(), name.clone());
                        }

                        let output = run_shell(&command, &dir, &env, timeout).await?;
                        if output.success {
                            Ok(())
                        } else {
                            Err(Error::addon(addon, output.failure_message()))
                        }
                    }
                }),
            );
        }

        hooks
    }

    fn commands(&self) -> Vec<AddonCommand> {
        self.section
            .commands
            .iter()
            .map(|spec| {
                let run = spec.run.clone();
                let addon = self.metadata.name.clone();
                let dir = self.dir.clone();
                let env = self.base_env();
                let timeout = self.timeout;

                let handler = command_handler(move |invocation: CommandInvocation| {
                    let run = run.clone();
                    let addon = addon.clone();
                    let dir = dir.clone();
                    let mut env = env.clone();
                    async move {
                        let command = script_command_line(&run, &invocation)?;
                        env.insert(
                            "PAWNCTL_PROJECT_DIR".to_string(),
                            invocation.project_dir.display().to_string(),
                        );
                        env.insert("PAWNCTL_COMMAND".to_string(), invocation.command.clone());

                        let output = run_shell(&command, &dir, &env, timeout).await?;
                        if !output.stdout.is_empty() {
                            print!("{}", output.stdout);
                        }
                        if output.success {
                            Ok(())
                        } else {
                            Err(Error::addon(addon, output.failure_message()))
                        }
                    }
                });

                let mut command = AddonCommand::new(spec.name.clone(), handler)
                    .with_description(spec.description.clone())
                    .with_priority(spec.priority)
                    .from_addon(self.metadata.name.clone());
                command.options = spec.options.clone();
                if spec.override_existing {
                    command = command.overriding();
                }
                command
            })
            .collect()
    }

    async fn activate(&self, ctx: Arc<AddonContext>) -> Result<()> {
        self.run_lifecycle("activate", self.section.activate.as_ref())
            .await?;
        ctx.log_debug("script addon activated");
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.run_lifecycle("deactivate", self.section.deactivate.as_ref())
            .await
    }
}

/// 호출 인자를 shell 안전하게 붙인 명령 라인
fn script_command_line(run: &str, invocation: &CommandInvocation) -> Result<String> {
    let mut words: Vec<String> = invocation.args.clone();
    let mut options: Vec<_> = invocation.options.iter().collect();
    options.sort();
    for (key, value) in options {
        words.push(format!("--{}", key));
        words.push(value.clone());
    }

    if words.is_empty() {
        return Ok(run.to_string());
    }

    let joined = shlex::try_join(words.iter().map(String::as_str))
        .map_err(|e| Error::InvalidInput(format!("Cannot quote command arguments: {}", e)))?;
    Ok(format!("{} {}", run, joined))
}
