//! Configuration module
//!
//! - `pawnctl`: 통합 설정 (PawnctlConfig, AddonSettings, ToolchainConfig)

mod pawnctl;

pub use pawnctl::{
    AddonSettings, PawnctlConfig, ToolchainConfig, PAWNCTL_CONFIG_FILE, REGISTRY_FILE,
};
