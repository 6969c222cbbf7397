//! Addon trait - 모든 addon이 구현하는 인터페이스

use super::context::AddonContext;
use super::types::AddonMetadata;
use crate::command::AddonCommand;
use crate::hook::AddonHooks;
use async_trait::async_trait;
use pawnctl_foundation::Result;
use std::sync::Arc;

// ============================================================================
// Addon Trait
// ============================================================================

/// Addon 트레이트
///
/// 내장(builtin) addon은 직접 구현하고, `package.json`만 있는 addon은
/// `ScriptAddon`이 대신 구현한다.
///
/// ## 라이프사이클
///
/// ```text
///   load → validate → activate(ctx) → [hooks / commands] → deactivate → unload
/// ```
#[async_trait]
pub trait Addon: Send + Sync {
    /// 메타데이터 (이름, 버전, 의존성 등)
    fn metadata(&self) -> AddonMetadata;

    /// 라이프사이클 hook 핸들러
    fn hooks(&self) -> AddonHooks {
        AddonHooks::default()
    }

    /// 기여하는 명령어 목록
    fn commands(&self) -> Vec<AddonCommand> {
        Vec::new()
    }

    /// 로드 직후 호출
    async fn activate(&self, _ctx: Arc<AddonContext>) -> Result<()> {
        Ok(())
    }

    /// 언로드/비활성화 시 호출
    async fn deactivate(&self) -> Result<()> {
        Ok(())
    }
}
