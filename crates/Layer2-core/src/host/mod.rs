//! Host API - addon이 호스트 CLI에 접근하는 인터페이스
//!
//! 프로젝트 스캐폴딩, 컴파일러, 서버 실행 자체는 이 crate의 범위 밖이며
//! `Toolchain` 트레이트 뒤에 숨겨진다. addon은 `AddonContext::host()` 로
//! `HostApi` 를 받아 파일, 패키지, 빌드, 서버, 명령어, manifest를 다룬다.

mod local;
mod manifest;
mod toolchain;

pub use local::LocalHost;
pub use manifest::{ProjectManifest, PROJECT_MANIFEST_FILE};
pub use toolchain::ShellToolchain;

use crate::command::AddonCommand;
use async_trait::async_trait;
use pawnctl_foundation::Result;
use std::path::Path;

// ============================================================================
// HostApi
// ============================================================================

/// Addon에 노출되는 호스트 기능
#[async_trait]
pub trait HostApi: Send + Sync {
    /// 프로젝트 루트
    fn project_dir(&self) -> &Path;

    /// 프로젝트 기준 상대 경로(또는 절대 경로) 파일 읽기
    async fn read_file(&self, path: &str) -> Result<String>;

    async fn write_file(&self, path: &str, contents: &str) -> Result<()>;

    async fn file_exists(&self, path: &str) -> bool;

    /// 패키지 설치 (preInstall/postInstall hook 발생)
    async fn install_package(&self, package: &str) -> Result<()>;

    /// 패키지 제거 (preUninstall/postUninstall hook 발생)
    async fn uninstall_package(&self, package: &str) -> Result<()>;

    /// 빌드 (preBuild/postBuild hook 발생)
    async fn build(&self) -> Result<()>;

    async fn start_server(&self) -> Result<()>;

    async fn stop_server(&self) -> Result<()>;

    /// 실행 중에 명령어 추가
    async fn register_command(&self, addon: &str, command: AddonCommand) -> Result<()>;

    /// addon 대체와 무관하게 호스트 원본 명령어 실행
    async fn call_original_command(&self, name: &str, args: Vec<String>) -> Result<()>;

    /// 프로젝트 manifest (`pawn.json`)
    async fn manifest(&self) -> Result<ProjectManifest>;
}

// ============================================================================
// Toolchain
// ============================================================================

/// 외부 툴체인 (컴파일러, 패키지 관리자, 서버)
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn install_package(&self, project_dir: &Path, package: &str) -> Result<()>;

    async fn uninstall_package(&self, project_dir: &Path, package: &str) -> Result<()>;

    async fn build(&self, project_dir: &Path) -> Result<()>;

    async fn start_server(&self, project_dir: &Path) -> Result<()>;

    async fn stop_server(&self, project_dir: &Path) -> Result<()>;
}
