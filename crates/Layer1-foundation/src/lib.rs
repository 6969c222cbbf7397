//! # pawnctl-foundation
//!
//! Foundation layer for pawnctl:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Config: 통합 설정 (PawnctlConfig, AddonSettings, ToolchainConfig)
//! - Storage: JsonStore (글로벌 ~/.pawnctl, 프로젝트 .pawnctl)
//! - Event: EventBus, HostEvent
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  pawnctl-cli (clap)                          │
//! │        │                                     │
//! │        ▼                                     │
//! │  pawnctl-core  (AddonManager, Loader, ...)   │
//! │        │                                     │
//! │        ▼                                     │
//! │  pawnctl-foundation (Error, Config, Events)  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    AddonSettings, PawnctlConfig, ToolchainConfig, PAWNCTL_CONFIG_FILE, REGISTRY_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, PAWNCTL_DIR};

// ============================================================================
// Event (이벤트)
// ============================================================================
pub use event::{
    EventBus, EventCategory, EventFilter, EventListener, EventSeverity, HostEvent,
    RECENT_EVENT_LIMIT,
};
