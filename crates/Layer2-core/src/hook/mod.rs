//! # Hook System
//!
//! Addon 라이프사이클 hook 디스패치
//!
//! ## 개요
//!
//! Addon은 `AddonHooks` 의 슬롯별 핸들러로 CLI 라이프사이클 지점
//! (build, install, start/stop, init, manifest 저장)에 끼어든다.
//! `HookManager` 는 로드된 addon 순서대로 핸들러를 색인하고 순차 실행한다.
//!
//! ## 실패 격리
//!
//! 핸들러의 `Err` 와 panic은 모두 격리된다. 한 핸들러의 실패가
//! 다른 핸들러나 hook을 발생시킨 작업을 중단시키지 않으며,
//! 결과는 `HookReport` 로 반환된다.
//!
//! ## 예시
//!
//! ```ignore
//! let report = hooks
//!     .execute_hook(HookContext::new(HookEvent::PreBuild, project_dir))
//!     .await;
//! if !report.is_success() {
//!     warn!("{} preBuild handler(s) failed", report.failed());
//! }
//! ```

mod manager;
mod types;

pub use manager::HookManager;
pub use types::{
    hook_handler, AddonHooks, HookContext, HookEvent, HookFailure, HookHandler, HookReport,
};
