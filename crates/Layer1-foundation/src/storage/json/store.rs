//! JSON 파일 저장소
//!
//! 설정 파일(`config.json`) 같은 작은 문서를 디렉토리 단위로 다룬다.
//! 쓰기는 임시 파일에 쓴 뒤 rename 하므로 중간 상태의 파일이 남지 않는다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 글로벌/프로젝트 데이터 디렉토리 이름
pub const PAWNCTL_DIR: &str = ".pawnctl";

/// 디렉토리 하나에 묶인 JSON 문서 저장소
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.pawnctl/`
    pub fn global() -> Result<Self> {
        dirs::home_dir()
            .map(|home| Self::new(home.join(PAWNCTL_DIR)))
            .ok_or_else(|| Error::Config("Home directory is not available".into()))
    }

    /// `<project>/.pawnctl/`
    pub fn project(project_dir: &Path) -> Self {
        Self::new(project_dir.join(PAWNCTL_DIR))
    }

    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::project(&cwd))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// 문서 읽기 (없으면 `None`, 손상되면 에러)
    pub fn load_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_of(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!("{}: {}", path.display(), e)));
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Storage(format!("{} is not valid JSON: {}", path.display(), e)))
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.load_optional(name)?.ok_or_else(|| {
            Error::NotFound(format!("{}", self.path_of(name).display()))
        })
    }

    /// 없거나 손상된 문서는 기본값
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.load_optional(name) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                T::default()
            }
        }
    }

    /// 문서 전체 교체
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| Error::Storage(format!("{}: {}", self.root.display(), e)))?;

        let path = self.path_of(name);
        let staging = self.path_of(&format!(".{}.tmp", name));
        let text = serde_json::to_string_pretty(value)?;

        std::fs::write(&staging, text)
            .and_then(|_| std::fs::rename(&staging, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&staging);
                Error::Storage(format!("{}: {}", path.display(), e))
            })
    }
}
