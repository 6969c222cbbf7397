//! Event System - 이벤트 발행/구독 시스템
//!
//! Addon 런타임에서 발생하는 이벤트(로드, 설치, hook 디스패치, 에러)를 관리합니다.
//! `EventBus`는 전역 싱글톤이 아니라 `AddonManager`가 생성해 주입합니다.
//!
//! ```text
//!   AddonManager ──publish──▶ EventBus ──▶ Listener 1..N
//!        │                       ▲
//!        └── AddonContext ───────┘  (addon도 같은 버스로 발행)
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventFilter, EventListener, RECENT_EVENT_LIMIT};

pub use types::{
    // Event constructors
    addon,
    error,
    hook,
    install,
    system,
    // Core types
    EventCategory,
    EventSeverity,
    HostEvent,
};
