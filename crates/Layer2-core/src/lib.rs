//! pawnctl-core: Addon Runtime for pawnctl
//!
//! Layer2 - addon 로드, hook 디스패치, 명령어 대체, 설치/업데이트 레이어
//!
//! # 주요 모듈
//!
//! - `addon`: Addon 트레이트, 메타데이터, `package.json` manifest, 스크립트 addon
//! - `loader`: 로드/검증/활성화와 재시도
//! - `hook`: 라이프사이클 hook 디스패치 (실패 격리)
//! - `command`: 명령어 우선순위 해석과 호스트 명령어 대체 체인
//! - `dependency`: 의존성 그래프, 설치/제거 순서, 버전 충돌
//! - `install`: GitHub/로컬 설치, 백업 후 업데이트와 롤백, 제거
//! - `registry`: `registry.json` 영속화
//! - `recovery`: 에러 원장과 자동 격리
//! - `discovery`: 탐색 경로 스캔
//! - `host`: addon에 노출되는 호스트 API와 툴체인
//! - `manager`: 위 구성 요소를 묶는 `AddonManager`
//!
//! # 사용 예시
//!
//! ```ignore
//! use pawnctl_core::{AddonManager, HookEvent};
//!
//! let manager = AddonManager::builder(PawnctlConfig::load()?)
//!     .project_dir(".")
//!     .build()?;
//! manager.initialize().await?;
//!
//! // addon 설치 (owner/repo[@ref], GitHub URL, 로컬 경로)
//! let report = manager.install("pawn-dev/discord-notify").await?;
//! for hint in &report.suggestions {
//!     println!("{}", hint);
//! }
//!
//! // addon이 대체했을 수 있는 명령어 실행
//! manager.run_command("build", vec![]).await?;
//! ```

// Core modules
pub mod addon;
pub mod command;
pub mod dependency;
pub mod discovery;
pub mod hook;
pub mod host;
pub mod install;
pub mod loader;
pub mod manager;
pub mod recovery;
pub mod registry;
pub mod semver;
pub mod shell;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports: Addon
pub use addon::{
    Addon, AddonContext, AddonEnvironment, AddonFactoryRegistry, AddonInfo, AddonManifest,
    AddonMetadata, AddonSourceKind, InfoOverrides, ScriptAddon,
};

// Re-exports: Hook
pub use hook::{
    hook_handler, AddonHooks, HookContext, HookEvent, HookFailure, HookHandler, HookManager,
    HookReport,
};

// Re-exports: Command
pub use command::{
    command_handler, AddonCommand, CommandChain, CommandConflict, CommandHandler,
    CommandInvocation, CommandOption, CommandOrigin, CommandProgram, CommandResolver,
    CommandStats, CommandSummary, RegistrationOutcome,
};

// Re-exports: Dependency
pub use dependency::{
    AutoInstallOptions, AutoInstallReport, DependencyConflict, DependencyGraph,
    DependencyResolution, DependencyResolver, DependencyValidation, VersionConflict,
};

// Re-exports: Install
pub use install::{
    AddonInstaller, AddonSource, AddonUpdate, ArchiveFetcher, GitHubDownloader, GitHubRef,
    UpdateSummary,
};

// Re-exports: Runtime
pub use discovery::{AddonDiscovery, DiscoveryReport};
pub use host::{HostApi, LocalHost, ProjectManifest, ShellToolchain, Toolchain};
pub use loader::{AddonLoader, RetryPolicy};
pub use manager::{AddonManager, AddonManagerBuilder, InitializationReport, InstallReport};
pub use recovery::{AddonRecovery, ErrorRecord, ErrorSummary};
pub use registry::{AddonRegistry, RegistryLoadResult};

// Layer1 re-exports
pub use pawnctl_foundation::{Error, PawnctlConfig, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
