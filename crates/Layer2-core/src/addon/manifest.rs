//! Addon Manifest - `package.json` 의 `pawnAddon` 섹션
//!
//! ```json
//! {
//!   "name": "discord-notify",
//!   "version": "1.0.0",
//!   "description": "Posts build results to Discord",
//!   "author": "pawn-dev",
//!   "license": "MIT",
//!   "pawnAddon": {
//!     "hooks": { "postBuild": "./notify.sh" },
//!     "commands": [{ "name": "notify", "run": "./notify.sh manual" }],
//!     "dependencyConstraints": { "http-utils": "^2.0.0" }
//!   }
//! }
//! ```

use super::types::AddonMetadata;
use crate::command::CommandOption;
use pawnctl_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Addon 패키지 파일 이름
pub const MANIFEST_FILE: &str = "package.json";

/// addon 데이터가 들어 있는 예약 키
pub const ADDON_KEY: &str = "pawnAddon";

// ============================================================================
// AddonManifest
// ============================================================================

/// `package.json` 문서
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ManifestAuthor>,

    #[serde(default)]
    pub license: String,

    #[serde(rename = "pawnAddon", default, skip_serializing_if = "Option::is_none")]
    pub addon: Option<AddonSection>,
}

/// npm 스타일 author (문자열 또는 객체)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestAuthor {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

impl ManifestAuthor {
    pub fn name(&self) -> &str {
        match self {
            ManifestAuthor::Name(name) => name,
            ManifestAuthor::Detailed { name, .. } => name,
        }
    }
}

/// `pawnAddon` 섹션
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSection {
    /// 패키지 이름과 다른 addon 이름 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 내장 factory 키 (있으면 스크립트 대신 사용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin: Option<String>,

    /// hook 이름 → shell 명령
    #[serde(default)]
    pub hooks: BTreeMap<String, String>,

    #[serde(default)]
    pub commands: Vec<ScriptCommandSpec>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub dependency_constraints: BTreeMap<String, String>,

    /// 활성화 시 실행할 명령
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate: Option<String>,

    /// 비활성화 시 실행할 명령
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivate: Option<String>,
}

/// 스크립트 명령어 선언
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCommandSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// 실행할 shell 명령 (인자는 뒤에 붙는다)
    #[serde(default)]
    pub run: String,

    #[serde(default)]
    pub options: Vec<CommandOption>,

    #[serde(rename = "override", default)]
    pub override_existing: bool,

    #[serde(default)]
    pub priority: i32,
}

impl AddonManifest {
    /// 디렉토리의 `package.json` 로드
    ///
    /// 파일 읽기 실패는 `Io` (재시도 대상), 파싱 실패나 `pawnAddon` 누락은
    /// `Validation` 으로 보고한다.
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).await?;
        let manifest: AddonManifest = serde_json::from_str(&content).map_err(|e| {
            Error::Validation(format!("Invalid {}: {}", path.display(), e))
        })?;

        if manifest.addon.is_none() {
            return Err(Error::Validation(format!(
                "{} has no \"{}\" section",
                path.display(),
                ADDON_KEY
            )));
        }

        Ok(manifest)
    }

    /// addon 패키지인지 빠르게 확인 (파싱 실패는 false)
    pub async fn probe(dir: &Path) -> Option<Self> {
        Self::from_dir(dir).await.ok()
    }

    pub fn is_addon(&self) -> bool {
        self.addon.is_some()
    }

    pub fn section(&self) -> Option<&AddonSection> {
        self.addon.as_ref()
    }

    /// addon 이름 (섹션 이름 우선)
    pub fn addon_name(&self) -> &str {
        self.addon
            .as_ref()
            .and_then(|section| section.name.as_deref())
            .unwrap_or(&self.name)
    }

    pub fn builtin_key(&self) -> Option<&str> {
        self.addon.as_ref().and_then(|section| section.builtin.as_deref())
    }

    /// 메타데이터 추출
    pub fn metadata(&self) -> AddonMetadata {
        let mut metadata = AddonMetadata::new(self.addon_name(), self.version.clone())
            .with_description(self.description.clone())
            .with_author(
                self.author
                    .as_ref()
                    .map(|author| author.name().to_string())
                    .unwrap_or_default(),
            )
            .with_license(self.license.clone());

        if let Some(section) = &self.addon {
            for dependency in &section.dependencies {
                metadata = metadata.with_dependency(dependency.clone());
            }
            for (dependency, constraint) in &section.dependency_constraints {
                metadata = metadata.with_constraint(dependency.clone(), constraint.clone());
            }
        }

        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE: &str = r#"{
        "name": "discord-notify",
        "version": "1.0.0",
        "description": "Posts build results to Discord",
        "author": { "name": "pawn-dev", "email": "dev@example.com" },
        "license": "MIT",
        "pawnAddon": {
            "hooks": { "postBuild": "./notify.sh" },
            "commands": [
                { "name": "build", "run": "make fast", "override": true, "priority": 5 }
            ],
            "dependencies": ["logger"],
            "dependencyConstraints": { "http-utils": "^2.0.0" }
        }
    }"#;

    #[tokio::test]
    async fn test_from_dir_reads_addon_section() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), PACKAGE).await.unwrap();

        let manifest = AddonManifest::from_dir(dir.path()).await.unwrap();
        let section = manifest.section().unwrap();
        assert_eq!(section.hooks.get("postBuild").unwrap(), "./notify.sh");
        assert!(section.commands[0].override_existing);
        assert_eq!(section.commands[0].priority, 5);

        let metadata = manifest.metadata();
        assert_eq!(metadata.author, "pawn-dev");
        assert_eq!(
            metadata.dependencies,
            vec!["logger".to_string(), "http-utils".to_string()]
        );
        assert_eq!(metadata.dependency_constraints["http-utils"], "^2.0.0");
    }

    #[tokio::test]
    async fn test_missing_section_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"name": "left-pad", "version": "1.3.0"}"#,
        )
        .await
        .unwrap();

        let err = AddonManifest::from_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(AddonManifest::probe(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_transient_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = AddonManifest::from_dir(&dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transient());
    }
}
