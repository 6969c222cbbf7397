//! Addon Registry - 설치된 addon 목록 영속화
//!
//! `registry.json` 에 `{ "addons": [AddonInfo] }` 형태로 메타데이터만 저장한다.
//! 손상된 파일은 경고 후 빈 목록으로 취급하고, 쓰기는 문서 전체를 교체한다.

mod store;

pub use store::{AddonRegistry, RegistryFile, RegistryLoadResult};
