//! Storage module for pawnctl
//!
//! - `json`: JSON - 범용 파일 저장/로드 (설정, 프로젝트 데이터)

mod json;

pub use json::{JsonStore, PAWNCTL_DIR};
