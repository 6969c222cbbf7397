//! Addon Loader - 로드/검증/활성화 상태 머신과 재시도
//!
//! ```text
//!   path ──▶ package.json ──▶ builtin factory | ScriptAddon
//!                                   │
//!                                   ▼
//!                     validate ──▶ activate(ctx) ──▶ register_addon
//!   (일시적 에러: 선형 백오프로 재시도, 검증 실패: 즉시 실패)
//! ```

mod addon_loader;
mod retry;

pub use addon_loader::AddonLoader;
pub use retry::{recovery_hints, with_retry, RetryPolicy};
