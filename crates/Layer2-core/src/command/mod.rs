//! Command - addon 명령어와 호스트 명령어 표면
//!
//! ```text
//!   Addon::commands() ──▶ CommandResolver (우선순위, 충돌 기록)
//!                                │
//!                                ▼
//!                        CommandProgram (호스트 명령어)
//!                          ├── override → CommandChain { primary: addon, fallback: 원본 }
//!                          └── add      → CommandChain { primary: addon, fallback: None }
//! ```

pub mod chain;
pub mod program;
pub mod resolver;
pub mod types;

pub use chain::{ChainOutcome, CommandChain, CommandOrigin};
pub use program::{CommandProgram, CommandSummary};
pub use resolver::{
    CommandConflict, CommandResolver, CommandStats, ConflictReason, ProgramSyncReport,
    RegistrationOutcome,
};
pub use types::{command_handler, AddonCommand, CommandHandler, CommandInvocation, CommandOption};
