//! ProjectManifest - 프로젝트 `pawn.json` 문서

use crate::hook::{HookContext, HookEvent, HookManager};
use pawnctl_foundation::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// 프로젝트 manifest 파일 이름
pub const PROJECT_MANIFEST_FILE: &str = "pawn.json";

/// `pawn.json` 문서 (점 경로로 접근)
#[derive(Clone)]
pub struct ProjectManifest {
    path: PathBuf,
    document: Value,
    hooks: Option<Arc<HookManager>>,
}

impl ProjectManifest {
    /// 빈 문서
    pub fn new(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(PROJECT_MANIFEST_FILE),
            document: Value::Object(Map::new()),
            hooks: None,
        }
    }

    /// 파일 로드 (없으면 빈 문서)
    pub async fn load(project_dir: &Path) -> Result<Self> {
        let mut manifest = Self::new(project_dir);
        if !manifest.path.exists() {
            debug!("{} not found, starting empty", manifest.path.display());
            return Ok(manifest);
        }

        let content = fs::read_to_string(&manifest.path).await?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            Error::Validation(format!("Invalid {}: {}", manifest.path.display(), e))
        })?;
        if !document.is_object() {
            return Err(Error::Validation(format!(
                "{} must contain a JSON object",
                manifest.path.display()
            )));
        }

        manifest.document = document;
        Ok(manifest)
    }

    /// 저장 시 preManifestSave/postManifestSave 발생
    pub fn with_hooks(mut self, hooks: Arc<HookManager>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// 점 경로 조회 (`"build.args"`)
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.document, |node, key| node.get(key))
    }

    /// 점 경로 설정 (중간 객체 자동 생성)
    pub fn set(&mut self, dotted: &str, value: Value) -> Result<()> {
        let keys: Vec<&str> = dotted.split('.').collect();
        if keys.iter().any(|k| k.is_empty()) {
            return Err(Error::InvalidInput(format!("Invalid manifest path '{}'", dotted)));
        }

        let (last, parents) = keys
            .split_last()
            .ok_or_else(|| Error::InvalidInput("Empty manifest path".into()))?;

        let mut node = &mut self.document;
        for key in parents {
            let object = node.as_object_mut().ok_or_else(|| {
                Error::InvalidInput(format!("'{}' is not an object in {}", key, dotted))
            })?;
            node = object
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        node.as_object_mut()
            .ok_or_else(|| Error::InvalidInput(format!("Parent of '{}' is not an object", last)))?
            .insert(last.to_string(), value);
        Ok(())
    }

    /// 파일 저장
    pub async fn save(&self) -> Result<()> {
        let project_dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if let Some(hooks) = &self.hooks {
            hooks
                .execute_hook(
                    HookContext::new(HookEvent::PreManifestSave, &project_dir)
                        .with_data(self.document.clone()),
                )
                .await;
        }

        let content = serde_json::to_string_pretty(&self.document)?;
        fs::write(&self.path, content).await?;
        debug!("Saved {}", self.path.display());

        if let Some(hooks) = &self.hooks {
            hooks
                .execute_hook(
                    HookContext::new(HookEvent::PostManifestSave, &project_dir)
                        .with_data(self.document.clone()),
                )
                .await;
        }

        Ok(())
    }
}

impl std::fmt::Debug for ProjectManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectManifest")
            .field("path", &self.path)
            .field("document", &self.document)
            .finish()
    }
}
