//! CommandProgram - 호스트 명령어 표면
//!
//! 호스트(CLI)가 등록한 원본 명령어와, addon 명령어가 반영된 현재 명령어
//! 테이블을 함께 보관한다. 원본은 override의 fallback과
//! `call_original` 에 사용된다.

use super::chain::{run_guarded, CommandChain, CommandOrigin};
use super::types::{CommandHandler, CommandInvocation};
use pawnctl_foundation::{Error, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 명령어 목록 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    pub name: String,
    pub description: String,
    pub origin: CommandOrigin,
    pub has_fallback: bool,
}

#[derive(Default)]
struct ProgramState {
    /// 호스트 원본
    host: BTreeMap<String, CommandChain>,
    /// 현재 활성 테이블
    active: BTreeMap<String, CommandChain>,
}

/// 호스트 명령어 테이블
#[derive(Default)]
pub struct CommandProgram {
    state: RwLock<ProgramState>,
}

impl CommandProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// 호스트 기본 명령어 등록
    pub async fn add_host_command(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: CommandHandler,
    ) {
        let chain = CommandChain::host(name, description, handler);
        let mut state = self.state.write().await;
        state.host.insert(chain.name.clone(), chain.clone());
        state.active.insert(chain.name.clone(), chain);
    }

    /// addon 명령어 제거 (호스트 원본으로 복원)
    pub async fn reset_addon_commands(&self) {
        let mut state = self.state.write().await;
        state.active = state.host.clone();
    }

    /// 호스트 명령어를 addon 핸들러로 대체 (원본은 fallback)
    pub async fn override_command(
        &self,
        name: &str,
        description: &str,
        addon: &str,
        handler: CommandHandler,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let original = state
            .host
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("host command '{}'", name)))?;

        let chain = CommandChain::overriding(original, description, addon, handler);
        debug!("Command '{}' overridden by addon '{}'", name, addon);
        state.active.insert(name.to_string(), chain);
        Ok(())
    }

    /// 새 명령어 추가
    pub async fn add_command(
        &self,
        name: &str,
        description: &str,
        addon: &str,
        handler: CommandHandler,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.active.contains_key(name) {
            return Err(Error::AlreadyExists(format!("command '{}'", name)));
        }

        debug!("Command '{}' added by addon '{}'", name, addon);
        state.active.insert(
            name.to_string(),
            CommandChain::added(name, description, addon, handler),
        );
        Ok(())
    }

    /// 현재 실행 체인 (호출 없이 조회)
    pub async fn chain(&self, name: &str) -> Option<CommandChain> {
        self.state.read().await.active.get(name).cloned()
    }

    pub async fn has_command(&self, name: &str) -> bool {
        self.state.read().await.active.contains_key(name)
    }

    pub async fn is_host_command(&self, name: &str) -> bool {
        self.state.read().await.host.contains_key(name)
    }

    /// 현재 명령어 목록 (이름순)
    pub async fn list(&self) -> Vec<CommandSummary> {
        self.state
            .read()
            .await
            .active
            .values()
            .map(|chain| CommandSummary {
                name: chain.name.clone(),
                description: chain.description.clone(),
                origin: chain.origin.clone(),
                has_fallback: chain.has_fallback(),
            })
            .collect()
    }

    /// 명령어 실행
    pub async fn run(&self, name: &str, invocation: CommandInvocation) -> Result<()> {
        let chain = self
            .chain(name)
            .await
            .ok_or_else(|| Error::NotFound(format!("command '{}'", name)))?;
        chain.invoke(invocation).await
    }

    /// addon 대체와 무관하게 호스트 원본 실행
    pub async fn call_original(&self, name: &str, invocation: CommandInvocation) -> Result<()> {
        let handler = self
            .state
            .read()
            .await
            .host
            .get(name)
            .map(|chain| chain.primary.clone())
            .ok_or_else(|| Error::NotFound(format!("host command '{}'", name)))?;

        run_guarded(&handler, invocation)
            .await
            .map_err(|e| Error::command_failed(name, e.to_string()))
    }
}
