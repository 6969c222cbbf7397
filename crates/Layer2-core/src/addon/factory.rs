//! AddonFactoryRegistry - 내장 addon 생성자 등록소
//!
//! `"pawnAddon": { "builtin": "<key>" }` 로 선언된 패키지는 여기서 찾는다.
//! 등록 항목은 로드마다 호출되는 생성자이거나 이미 만들어진 인스턴스다.

use super::manifest::AddonManifest;
use super::traits::Addon;
use parking_lot::RwLock;
use pawnctl_foundation::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 생성자 (manifest를 받아 인스턴스 생성)
pub type AddonConstructor =
    Arc<dyn Fn(&AddonManifest) -> Result<Arc<dyn Addon>> + Send + Sync>;

/// 등록 항목
#[derive(Clone)]
pub enum AddonExport {
    /// 로드할 때마다 새 인스턴스
    Constructor(AddonConstructor),
    /// 공유 인스턴스
    Instance(Arc<dyn Addon>),
}

/// 내장 addon 등록소
#[derive(Default)]
pub struct AddonFactoryRegistry {
    exports: RwLock<HashMap<String, AddonExport>>,
}

impl AddonFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_constructor<F>(&self, key: impl Into<String>, constructor: F)
    where
        F: Fn(&AddonManifest) -> Result<Arc<dyn Addon>> + Send + Sync + 'static,
    {
        self.exports
            .write()
            .insert(key.into(), AddonExport::Constructor(Arc::new(constructor)));
    }

    pub fn register_instance(&self, key: impl Into<String>, addon: Arc<dyn Addon>) {
        self.exports
            .write()
            .insert(key.into(), AddonExport::Instance(addon));
    }

    /// 키로 인스턴스 확보
    pub fn resolve(&self, key: &str, manifest: &AddonManifest) -> Result<Arc<dyn Addon>> {
        let export = self
            .exports
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("builtin addon '{}'", key)))?;

        match export {
            AddonExport::Constructor(constructor) => constructor(manifest),
            AddonExport::Instance(addon) => Ok(addon),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exports.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.exports.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
