//! Command 타입 정의

use futures::future::BoxFuture;
use pawnctl_foundation::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// 명령어 핸들러 (비동기)
pub type CommandHandler =
    Arc<dyn Fn(CommandInvocation) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// 클로저를 CommandHandler로 변환
pub fn command_handler<F, Fut>(f: F) -> CommandHandler
where
    F: Fn(CommandInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |invocation| Box::pin(f(invocation)))
}

// ============================================================================
// CommandInvocation
// ============================================================================

/// 명령어 호출 정보
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    /// 호출된 명령어 이름
    pub command: String,

    /// 위치 인자
    pub args: Vec<String>,

    /// `--key value` 옵션
    pub options: HashMap<String, String>,

    /// 프로젝트 루트
    pub project_dir: PathBuf,
}

impl CommandInvocation {
    pub fn new(command: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            project_dir: project_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 원시 인자 목록에서 `--key value`/`--key=value`/`--flag` 를 분리
    pub fn parse_args(mut self, raw: Vec<String>) -> Self {
        let mut iter = raw.into_iter().peekable();
        while let Some(arg) = iter.next() {
            match arg.strip_prefix("--") {
                Some(option) if !option.is_empty() => {
                    if let Some((key, value)) = option.split_once('=') {
                        self.options.insert(key.to_string(), value.to_string());
                    } else if iter.peek().is_some_and(|next| !next.starts_with("--")) {
                        let value = iter.next().unwrap_or_default();
                        self.options.insert(option.to_string(), value);
                    } else {
                        self.options.insert(option.to_string(), "true".to_string());
                    }
                }
                _ => self.args.push(arg),
            }
        }
        self
    }
}

// ============================================================================
// CommandOption
// ============================================================================

/// 명령어 옵션 선언 (도움말/검증용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    /// 예: "-f, --force"
    pub flags: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

// ============================================================================
// AddonCommand
// ============================================================================

/// Addon이 기여하는 명령어
#[derive(Clone)]
pub struct AddonCommand {
    pub name: String,
    pub description: String,
    pub handler: CommandHandler,
    pub options: Vec<CommandOption>,

    /// true면 동일 이름의 호스트 명령어를 대체 (원본은 fallback)
    pub override_existing: bool,

    /// 충돌 시 높은 값이 이김
    pub priority: i32,

    /// 소유 addon 이름
    pub addon: Option<String>,
}

impl AddonCommand {
    pub fn new(name: impl Into<String>, handler: CommandHandler) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            handler,
            options: Vec::new(),
            override_existing: false,
            priority: 0,
            addon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// 호스트 명령어를 대체
    pub fn overriding(mut self) -> Self {
        self.override_existing = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn from_addon(mut self, addon: impl Into<String>) -> Self {
        self.addon = Some(addon.into());
        self
    }

    /// 소유 addon 이름 (없으면 "<unknown>")
    pub fn owner(&self) -> &str {
        self.addon.as_deref().unwrap_or("<unknown>")
    }
}

impl std::fmt::Debug for AddonCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonCommand")
            .field("name", &self.name)
            .field("addon", &self.addon)
            .field("override", &self.override_existing)
            .field("priority", &self.priority)
            .finish()
    }
}
