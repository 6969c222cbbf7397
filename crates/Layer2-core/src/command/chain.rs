//! CommandChain - primary/fallback 체인
//!
//! 호스트 명령어를 대체한 addon 명령어는 원본 핸들러를 fallback으로 가진다.
//! 체인은 값이므로 호출하지 않고도 관계를 확인할 수 있다.

use super::types::{CommandHandler, CommandInvocation};
use futures::FutureExt;
use pawnctl_foundation::{Error, Result};
use std::panic::AssertUnwindSafe;
use tracing::warn;

/// 명령어 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOrigin {
    /// 호스트(CLI) 기본 명령어
    Host,
    /// addon이 새로 추가한 명령어
    Addon { addon: String },
    /// addon이 호스트 명령어를 대체
    Override { addon: String },
}

impl CommandOrigin {
    pub fn addon(&self) -> Option<&str> {
        match self {
            CommandOrigin::Host => None,
            CommandOrigin::Addon { addon } | CommandOrigin::Override { addon } => Some(addon),
        }
    }
}

/// 실행 체인 (primary 실패 시 fallback)
#[derive(Clone)]
pub struct CommandChain {
    pub name: String,
    pub description: String,
    pub primary: CommandHandler,
    pub fallback: Option<CommandHandler>,
    pub origin: CommandOrigin,
}

impl CommandChain {
    /// 호스트 명령어
    pub fn host(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            primary: handler,
            fallback: None,
            origin: CommandOrigin::Host,
        }
    }

    /// addon이 추가한 새 명령어 (fallback 없음)
    pub fn added(
        name: impl Into<String>,
        description: impl Into<String>,
        addon: impl Into<String>,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            primary: handler,
            fallback: None,
            origin: CommandOrigin::Addon {
                addon: addon.into(),
            },
        }
    }

    /// `original`을 대체하는 체인 (original의 primary가 fallback)
    pub fn overriding(
        original: &CommandChain,
        description: impl Into<String>,
        addon: impl Into<String>,
        handler: CommandHandler,
    ) -> Self {
        let description = description.into();
        Self {
            name: original.name.clone(),
            description: if description.is_empty() {
                original.description.clone()
            } else {
                description
            },
            primary: handler,
            fallback: Some(original.primary.clone()),
            origin: CommandOrigin::Override {
                addon: addon.into(),
            },
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn is_override(&self) -> bool {
        matches!(self.origin, CommandOrigin::Override { .. })
    }

    /// 체인 실행
    ///
    /// - fallback 없음: primary 실패가 곧 실패
    /// - fallback 있음: primary 실패 시 fallback 실행, 둘 다 실패해야 실패
    pub async fn invoke(&self, invocation: CommandInvocation) -> Result<()> {
        self.execute(invocation).await.result
    }

    /// `invoke` 와 같지만 addon 핸들러 실패를 따로 돌려준다
    ///
    /// fallback이 성공해도 addon 쪽 실패는 `addon_failure` 에 남는다.
    pub async fn execute(&self, invocation: CommandInvocation) -> ChainOutcome {
        let primary_err = match run_guarded(&self.primary, invocation.clone()).await {
            Ok(()) => {
                return ChainOutcome {
                    result: Ok(()),
                    addon_failure: None,
                }
            }
            Err(e) => e,
        };
        let addon_failure = self.origin.addon().map(|_| primary_err.to_string());

        let Some(fallback) = &self.fallback else {
            return ChainOutcome {
                result: Err(Error::command_failed(&self.name, primary_err.to_string())),
                addon_failure,
            };
        };

        warn!(
            "Command '{}' from addon '{}' failed ({}), falling back to original handler",
            self.name,
            self.origin.addon().unwrap_or("host"),
            primary_err
        );

        let result = run_guarded(fallback, invocation).await.map_err(|fallback_err| {
            Error::command_failed(
                &self.name,
                format!(
                    "addon handler failed: {}; original handler failed: {}",
                    primary_err, fallback_err
                ),
            )
        });
        ChainOutcome {
            result,
            addon_failure,
        }
    }
}

/// `CommandChain::execute` 결과
#[derive(Debug)]
pub struct ChainOutcome {
    pub result: Result<()>,
    /// addon 핸들러가 실패했다면 그 메시지
    pub addon_failure: Option<String>,
}

impl std::fmt::Debug for CommandChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChain")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("has_fallback", &self.has_fallback())
            .finish()
    }
}

/// 핸들러 실행 (panic도 에러로 변환)
pub(crate) async fn run_guarded(
    handler: &CommandHandler,
    invocation: CommandInvocation,
) -> Result<()> {
    match AssertUnwindSafe(handler(invocation)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Internal(format!(
            "handler panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
