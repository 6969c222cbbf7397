//! Addon - addon 정의, 메타데이터, 패키지 형식
//!
//! - `Addon`: 모든 addon이 구현하는 트레이트
//! - `AddonInfo`: 레지스트리에 저장되는 정보 (코드 없음)
//! - `AddonManifest`: `package.json` 의 `pawnAddon` 섹션
//! - `AddonFactoryRegistry`: 내장 addon 생성자
//! - `ScriptAddon`: shell 명령으로 선언된 addon

pub mod context;
pub mod factory;
pub mod manifest;
pub mod script;
pub mod traits;
pub mod types;

pub use context::{AddonContext, AddonEnvironment};
pub use factory::{AddonConstructor, AddonExport, AddonFactoryRegistry};
pub use manifest::{
    AddonManifest, AddonSection, ManifestAuthor, ScriptCommandSpec, ADDON_KEY, MANIFEST_FILE,
};
pub use script::ScriptAddon;
pub use traits::Addon;
pub use types::{AddonInfo, AddonMetadata, AddonSourceKind, InfoOverrides};
