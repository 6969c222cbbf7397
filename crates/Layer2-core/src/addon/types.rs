//! Addon 메타데이터 및 영속 정보 타입

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// AddonMetadata - addon이 스스로 선언하는 정보
// ============================================================================

/// Addon이 선언하는 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,

    /// 의존하는 addon 이름 목록
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// 의존성별 버전 제약 (이름 → "^1.2.0")
    #[serde(default)]
    pub dependency_constraints: BTreeMap<String, String>,
}

impl AddonMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    /// 의존성 추가 (제약 없음)
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
        self
    }

    /// 버전 제약과 함께 의존성 추가
    pub fn with_constraint(mut self, name: impl Into<String>, constraint: impl Into<String>) -> Self {
        let name = name.into();
        self.dependency_constraints
            .insert(name.clone(), constraint.into());
        self.with_dependency(name)
    }
}

// ============================================================================
// AddonSourceKind
// ============================================================================

/// Addon 설치 출처
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonSourceKind {
    Github,
    #[default]
    Local,
    Discovered,
}

impl std::fmt::Display for AddonSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Github => write!(f, "github"),
            Self::Local => write!(f, "local"),
            Self::Discovered => write!(f, "discovered"),
        }
    }
}

// ============================================================================
// AddonInfo - 레지스트리에 기록되는 정보 (코드 없음)
// ============================================================================

/// Addon 정보 (레지스트리 파일의 한 항목)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonInfo {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub license: String,

    /// 설치 여부
    #[serde(default)]
    pub installed: bool,

    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 설치 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// 출처
    #[serde(default)]
    pub source: AddonSourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependency_constraints: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl AddonInfo {
    /// 메타데이터로부터 기본 정보 생성 (설치 전 상태)
    pub fn from_metadata(metadata: &AddonMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            description: metadata.description.clone(),
            author: metadata.author.clone(),
            license: metadata.license.clone(),
            installed: false,
            enabled: true,
            path: None,
            source: AddonSourceKind::Local,
            github_url: None,
            last_error: None,
            last_error_time: None,
            dependencies: metadata.dependencies.clone(),
            dependency_constraints: metadata.dependency_constraints.clone(),
        }
    }

    /// 기술 정보만 다시 메타데이터로
    pub fn metadata(&self) -> AddonMetadata {
        AddonMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            license: self.license.clone(),
            dependencies: self.dependencies.clone(),
            dependency_constraints: self.dependency_constraints.clone(),
        }
    }

    /// 메타데이터 필드 갱신 (상태 필드는 유지)
    pub fn refresh_metadata(&mut self, metadata: &AddonMetadata) {
        self.name = metadata.name.clone();
        self.version = metadata.version.clone();
        self.description = metadata.description.clone();
        self.author = metadata.author.clone();
        self.license = metadata.license.clone();
        self.dependencies = metadata.dependencies.clone();
        self.dependency_constraints = metadata.dependency_constraints.clone();
    }

    /// 마지막 에러 기록
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.last_error_time = Some(Utc::now());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
        self.last_error_time = None;
    }

    /// 검색어 매칭 (이름, 설명, 작성자; 대소문자 무시)
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.author.to_lowercase().contains(&query)
    }
}

// ============================================================================
// InfoOverrides - 등록 시 호출자가 덮어쓰는 상태
// ============================================================================

/// `AddonLoader::register_addon`에 전달하는 상태 덮어쓰기
#[derive(Debug, Clone, Default)]
pub struct InfoOverrides {
    pub installed: Option<bool>,
    pub enabled: Option<bool>,
    pub path: Option<PathBuf>,
    pub source: Option<AddonSourceKind>,
    pub github_url: Option<String>,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

impl InfoOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 영속 정보의 상태 필드를 그대로 옮긴다
    pub fn from_info(info: &AddonInfo) -> Self {
        Self {
            installed: Some(info.installed),
            enabled: Some(info.enabled),
            path: info.path.clone(),
            source: Some(info.source),
            github_url: info.github_url.clone(),
            last_error: info.last_error.clone(),
            last_error_time: info.last_error_time,
        }
    }

    /// 설치 직후 상태
    pub fn installed(source: AddonSourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            installed: Some(true),
            enabled: Some(true),
            path: Some(path.into()),
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = Some(url.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// 에러 필드 제거 (성공적으로 다시 로드된 경우)
    pub fn without_error(mut self) -> Self {
        self.last_error = None;
        self.last_error_time = None;
        self
    }

    pub fn apply(&self, info: &mut AddonInfo) {
        if let Some(installed) = self.installed {
            info.installed = installed;
        }
        if let Some(enabled) = self.enabled {
            info.enabled = enabled;
        }
        if let Some(path) = &self.path {
            info.path = Some(path.clone());
        }
        if let Some(source) = self.source {
            info.source = source;
        }
        if let Some(url) = &self.github_url {
            info.github_url = Some(url.clone());
        }
        info.last_error = self.last_error.clone();
        info.last_error_time = self.last_error_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_serializes_camel_case() {
        let metadata = AddonMetadata::new("discord-notify", "1.0.0")
            .with_description("Posts build results to Discord")
            .with_author("pawn-dev")
            .with_license("MIT")
            .with_constraint("http-utils", "^2.0.0");

        let mut info = AddonInfo::from_metadata(&metadata);
        InfoOverrides::installed(AddonSourceKind::Github, "/addons/discord-notify")
            .with_github_url("https://github.com/pawn-dev/discord-notify")
            .apply(&mut info);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["source"], "github");
        assert_eq!(json["installed"], true);
        assert_eq!(json["enabled"], true);
        assert_eq!(
            json["githubUrl"],
            "https://github.com/pawn-dev/discord-notify"
        );
        assert_eq!(json["dependencyConstraints"]["http-utils"], "^2.0.0");
        assert!(json.get("lastError").is_none());
    }

    #[test]
    fn test_info_deserializes_with_defaults() {
        let info: AddonInfo = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();
        assert_eq!(info.name, "bare");
        assert!(info.enabled);
        assert!(!info.installed);
        assert_eq!(info.source, AddonSourceKind::Local);
    }

    #[test]
    fn test_matches_query() {
        let info = AddonInfo::from_metadata(
            &AddonMetadata::new("mysql-helper", "0.3.0").with_description("MySQL plugin glue"),
        );
        assert!(info.matches_query("MYSQL"));
        assert!(info.matches_query("glue"));
        assert!(info.matches_query(""));
        assert!(!info.matches_query("redis"));
    }
}
