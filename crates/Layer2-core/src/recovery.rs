//! AddonRecovery - addon별 에러 원장과 자동 격리
//!
//! 에러는 메모리 원장(addon별 최근 N개)에 쌓이고 레지스트리의
//! `lastError`/`lastErrorTime` 에도 반영된다. 임계값에 도달하면
//! 레지스트리에서 비활성화되고 격리 목록에 오른다.

use crate::registry::AddonRegistry;
use chrono::{DateTime, Utc};
use pawnctl_foundation::event::{addon as addon_events, error as error_events};
use pawnctl_foundation::{AddonSettings, EventBus, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// 에러 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub message: String,
    pub time: DateTime<Utc>,
}

/// `record_error` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecordOutcome {
    /// 원장에 남아 있는 에러 수
    pub count: usize,
    /// 이번 기록으로 격리되었는지
    pub quarantined: bool,
}

/// addon별 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub addon: String,
    pub count: usize,
    pub last_error: String,
    pub last_time: DateTime<Utc>,
}

/// 에러 복구 관리자
pub struct AddonRecovery {
    ledger: RwLock<HashMap<String, Vec<ErrorRecord>>>,
    quarantined: RwLock<BTreeSet<String>>,
    registry: AddonRegistry,
    history_limit: usize,
    auto_disable_threshold: usize,
    events: Option<Arc<EventBus>>,
}

impl AddonRecovery {
    pub fn new(registry: AddonRegistry, settings: &AddonSettings) -> Self {
        Self {
            ledger: RwLock::new(HashMap::new()),
            quarantined: RwLock::new(BTreeSet::new()),
            registry,
            history_limit: settings.error_history_limit().max(1),
            auto_disable_threshold: settings.auto_disable_threshold(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// 임계값 변경 (0이면 자동 격리 안 함)
    pub fn with_auto_disable_threshold(mut self, threshold: usize) -> Self {
        self.auto_disable_threshold = threshold;
        self
    }

    // ========================================================================
    // 기록
    // ========================================================================

    /// 에러 기록
    ///
    /// 레지스트리 반영 실패는 경고만 남긴다. 원장은 호출자의 작업
    /// 성공 여부와 무관하게 유지된다.
    pub async fn record_error(&self, addon: &str, message: &str) -> ErrorRecordOutcome {
        let count = {
            let mut ledger = self.ledger.write().await;
            let history = ledger.entry(addon.to_string()).or_default();
            history.push(ErrorRecord {
                message: message.to_string(),
                time: Utc::now(),
            });
            if history.len() > self.history_limit {
                let excess = history.len() - self.history_limit;
                history.drain(..excess);
            }
            history.len()
        };

        debug!(addon = %addon, "Recorded error #{}: {}", count, message);

        if let Err(e) = self
            .registry
            .update_addon_in_registry(addon, |entry| entry.set_error(message))
            .await
        {
            warn!("Could not mirror error for '{}' to registry: {}", addon, e);
        }

        if let Some(events) = &self.events {
            events
                .publish(error_events::recorded(addon, message, count))
                .await;
        }

        let mut quarantined = false;
        if self.auto_disable_threshold > 0 && count >= self.auto_disable_threshold {
            match self.attempt_addon_recovery(addon, message).await {
                Ok(_) => quarantined = true,
                Err(e) => warn!("Failed to quarantine addon '{}': {}", addon, e),
            }
        }

        ErrorRecordOutcome { count, quarantined }
    }

    /// 격리: 레지스트리에서 비활성화
    ///
    /// 원장은 그대로 남는다 (`clear_errors` 또는 enable/recover 성공 시에만 비움).
    /// 레지스트리에 항목이 있었는지 반환한다.
    pub async fn attempt_addon_recovery(&self, addon: &str, error: &str) -> Result<bool> {
        let reason = format!("Auto-disabled after repeated errors: {}", error);
        let existed = self
            .registry
            .disable_addon_in_registry(addon, Some(&reason))
            .await?;

        self.quarantined.write().await.insert(addon.to_string());

        warn!(
            "Addon '{}' disabled after {} errors; re-enable with `pawnctl addon enable {}`",
            addon, self.auto_disable_threshold, addon
        );

        if let Some(events) = &self.events {
            events
                .publish(addon_events::quarantined(addon, error))
                .await;
        }

        Ok(existed)
    }

    /// 격리되었지만 아직 내려지지 않은 addon 목록 (가져가면 비워짐)
    pub async fn take_quarantined(&self) -> Vec<String> {
        let mut quarantined = self.quarantined.write().await;
        std::mem::take(&mut *quarantined).into_iter().collect()
    }

    // ========================================================================
    // 조회 / 정리
    // ========================================================================

    pub async fn get_errors(&self, addon: &str) -> Vec<ErrorRecord> {
        self.ledger
            .read()
            .await
            .get(addon)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn error_count(&self, addon: &str) -> usize {
        self.ledger.read().await.get(addon).map(Vec::len).unwrap_or(0)
    }

    /// 원장과 레지스트리의 마지막 에러 제거
    pub async fn clear_errors(&self, addon: &str) -> Result<()> {
        self.ledger.write().await.remove(addon);
        self.registry
            .update_addon_in_registry(addon, |entry| entry.clear_error())
            .await?;
        Ok(())
    }

    /// 메모리 원장 전체 초기화
    pub async fn clear_all(&self) {
        self.ledger.write().await.clear();
        self.quarantined.write().await.clear();
    }

    /// 에러가 있는 addon 요약 (이름순)
    pub async fn summary(&self) -> Vec<ErrorSummary> {
        let ledger = self.ledger.read().await;
        let mut summary: Vec<ErrorSummary> = ledger
            .iter()
            .filter_map(|(addon, history)| {
                history.last().map(|last| ErrorSummary {
                    addon: addon.clone(),
                    count: history.len(),
                    last_error: last.message.clone(),
                    last_time: last.time,
                })
            })
            .collect();
        summary.sort_by(|a, b| a.addon.cmp(&b.addon));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::{AddonInfo, AddonMetadata};

    async fn recovery_with(dir: &std::path::Path, names: &[&str]) -> AddonRecovery {
        let registry = AddonRegistry::new(dir.join("registry.json"));
        for name in names {
            registry
                .upsert_addon(AddonInfo::from_metadata(&AddonMetadata::new(*name, "1.0.0")))
                .await
                .unwrap();
        }
        AddonRecovery::new(registry, &AddonSettings::default())
    }

    #[tokio::test]
    async fn test_errors_mirror_to_registry() {
        let dir = tempfile::tempdir().unwrap();
        let recovery = recovery_with(dir.path(), &["alpha"]).await;

        let outcome = recovery.record_error("alpha", "ENOENT: config.ini").await;
        assert_eq!(outcome.count, 1);
        assert!(!outcome.quarantined);

        let entry = recovery.registry.get_entry("alpha").await.unwrap();
        assert_eq!(entry.last_error.as_deref(), Some("ENOENT: config.ini"));
        assert!(entry.last_error_time.is_some());

        recovery.clear_errors("alpha").await.unwrap();
        assert!(recovery.get_errors("alpha").await.is_empty());
        let entry = recovery.registry.get_entry("alpha").await.unwrap();
        assert!(entry.last_error.is_none());
    }

    #[tokio::test]
    async fn test_threshold_quarantines_addon() {
        let dir = tempfile::tempdir().unwrap();
        let recovery = recovery_with(dir.path(), &["flaky"]).await;

        for _ in 0..2 {
            assert!(!recovery.record_error("flaky", "boom").await.quarantined);
        }
        let outcome = recovery.record_error("flaky", "boom").await;
        assert!(outcome.quarantined);
        assert_eq!(outcome.count, 3);

        let entry = recovery.registry.get_entry("flaky").await.unwrap();
        assert!(!entry.enabled);
        assert!(entry.last_error.unwrap().contains("Auto-disabled"));
        let history = recovery.get_errors("flaky").await;
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|record| record.message == "boom"));
        assert_eq!(recovery.take_quarantined().await, vec!["flaky".to_string()]);
        assert!(recovery.take_quarantined().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let recovery = recovery_with(dir.path(), &[])
            .await
            .with_auto_disable_threshold(0);

        for i in 0..25 {
            recovery.record_error("noisy", &format!("error {}", i)).await;
        }

        let errors = recovery.get_errors("noisy").await;
        assert_eq!(errors.len(), 20);
        assert_eq!(recovery.error_count("noisy").await, 20);
        assert_eq!(errors[0].message, "error 5");

        let summary = recovery.summary().await;
        assert_eq!(summary[0].count, 20);
        assert_eq!(summary[0].last_error, "error 24");
    }
}
