//! HookManager - hook 색인 및 디스패치

use super::types::{AddonHooks, HookContext, HookEvent, HookFailure, HookHandler, HookReport};
use crate::addon::Addon;
use crate::command::chain::panic_message;
use crate::recovery::AddonRecovery;
use futures::FutureExt;
use pawnctl_foundation::event::hook as hook_events;
use pawnctl_foundation::{Error, EventBus};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 슬롯별 (addon 이름, 핸들러) 목록
type HookTable = HashMap<HookEvent, Vec<(String, HookHandler)>>;

/// Hook 매니저
pub struct HookManager {
    slots: RwLock<HookTable>,
    recovery: Option<Arc<AddonRecovery>>,
    events: Option<Arc<EventBus>>,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            recovery: None,
            events: None,
        }
    }

    /// 핸들러 실패를 에러 원장에 기록
    pub fn with_recovery(mut self, recovery: Arc<AddonRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 전체 재색인 (addon 순서 유지)
    pub async fn register_addons(&self, addons: &[Arc<dyn Addon>]) {
        let mut table = HookTable::new();
        for addon in addons {
            let name = addon.metadata().name;
            index_hooks(&mut table, &name, &addon.hooks());
        }

        let total: usize = table.values().map(Vec::len).sum();
        *self.slots.write().await = table;
        debug!("Indexed {} hook handler(s) from {} addon(s)", total, addons.len());
    }

    /// 한 addon의 hook 추가 (기존 항목 뒤에)
    pub async fn register_addon_hooks(&self, addon: &str, hooks: &AddonHooks) {
        let mut slots = self.slots.write().await;
        index_hooks(&mut slots, addon, hooks);
    }

    /// 한 addon의 hook 제거
    pub async fn remove_addon(&self, addon: &str) {
        let mut slots = self.slots.write().await;
        for handlers in slots.values_mut() {
            handlers.retain(|(name, _)| name != addon);
        }
        slots.retain(|_, handlers| !handlers.is_empty());
    }

    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    // ========================================================================
    // 디스패치
    // ========================================================================

    /// 슬롯의 모든 핸들러를 순차 실행
    ///
    /// 실패(Err/panic)는 격리되어 보고서에 모이고 에러 원장에 기록된다.
    pub async fn execute_hook(&self, ctx: HookContext) -> HookReport {
        let event = ctx.event;
        let handlers: Vec<(String, HookHandler)> = {
            let slots = self.slots.read().await;
            slots.get(&event).cloned().unwrap_or_default()
        };

        let mut report = HookReport::new(event);
        if handlers.is_empty() {
            return report;
        }

        debug!("Dispatching {} to {} handler(s)", event, handlers.len());

        for (addon, handler) in handlers {
            report.executed += 1;

            let result = AssertUnwindSafe(handler(ctx.clone())).catch_unwind().await;
            let message = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };

            warn!(
                addon = %addon,
                "Hook {} failed: {}. {}",
                event,
                message,
                failure_guidance(&message)
            );

            if let Some(recovery) = &self.recovery {
                let hook_error = Error::Hook(format!("{}: {}", event, message));
                recovery.record_error(&addon, &hook_error.to_string()).await;
            }

            report.failures.push(HookFailure { addon, message });
        }

        if report.is_success() {
            debug!("{} completed ({} handler(s))", event, report.executed);
        } else {
            info!(
                "{} completed with {} failure(s) out of {} handler(s)",
                event,
                report.failed(),
                report.executed
            );
        }

        if let Some(events) = &self.events {
            events
                .publish(hook_events::dispatched(
                    event.as_str(),
                    report.executed,
                    report.failed(),
                ))
                .await;
        }

        report
    }

    /// 사용자 정의 이벤트 발생
    pub async fn execute_custom(
        &self,
        name: &str,
        project_dir: impl Into<PathBuf>,
        data: Value,
    ) -> HookReport {
        self.execute_hook(HookContext::custom(name, project_dir).with_data(data))
            .await
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub async fn handler_count(&self, event: HookEvent) -> usize {
        self.slots
            .read()
            .await
            .get(&event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// 슬롯별 등록 addon 이름 (슬롯 순서)
    pub async fn registered_hooks(&self) -> Vec<(HookEvent, Vec<String>)> {
        let slots = self.slots.read().await;
        HookEvent::ALL
            .iter()
            .filter_map(|event| {
                slots.get(event).map(|handlers| {
                    (
                        *event,
                        handlers.iter().map(|(name, _)| name.clone()).collect(),
                    )
                })
            })
            .collect()
    }
}

fn index_hooks(table: &mut HookTable, addon: &str, hooks: &AddonHooks) {
    for event in hooks.present() {
        if let Some(handler) = hooks.get(event) {
            table
                .entry(event)
                .or_default()
                .push((addon.to_string(), handler.clone()));
        }
    }
}

/// 실패 메시지 패턴별 안내
fn failure_guidance(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if ["undefined", "property", "field", "null", "missing key"]
        .iter()
        .any(|p| lower.contains(p))
    {
        "The handler read data that was not present; check which fields this hook provides."
    } else if ["permission", "eacces", "eperm", "denied"]
        .iter()
        .any(|p| lower.contains(p))
    {
        "Check file permissions for the addon and project directories."
    } else if ["not found", "enoent", "no such file"]
        .iter()
        .any(|p| lower.contains(p))
    {
        "A file the handler expects is missing; reinstall the addon or check its paths."
    } else {
        "Check the addon's hook implementation or disable the addon."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::AddonMetadata;
    use crate::hook::hook_handler;
    use pawnctl_foundation::Result;
    use std::sync::Mutex;

    struct HookedAddon {
        name: &'static str,
        hooks: AddonHooks,
    }

    impl Addon for HookedAddon {
        fn metadata(&self) -> AddonMetadata {
            AddonMetadata::new(self.name, "1.0.0")
        }

        fn hooks(&self) -> AddonHooks {
            self.hooks.clone()
        }
    }

    fn recording(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> HookHandler {
        hook_handler(move |_ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(tag);
                Ok(())
            }
        })
    }

    fn failing() -> HookHandler {
        hook_handler(|_ctx| async { Err::<(), _>(pawnctl_foundation::Error::from("boom")) })
    }

    fn panicking() -> HookHandler {
        hook_handler(|_ctx| async {
            if true {
                panic!("addon bug");
            }
            Result::<()>::Ok(())
        })
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_order_kept() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let addons: Vec<Arc<dyn Addon>> = vec![
            Arc::new(HookedAddon {
                name: "first",
                hooks: AddonHooks::new().with(HookEvent::PreBuild, recording("first", log.clone())),
            }),
            Arc::new(HookedAddon {
                name: "broken",
                hooks: AddonHooks::new().with(HookEvent::PreBuild, failing()),
            }),
            Arc::new(HookedAddon {
                name: "panics",
                hooks: AddonHooks::new().with(HookEvent::PreBuild, panicking()),
            }),
            Arc::new(HookedAddon {
                name: "last",
                hooks: AddonHooks::new()
                    .with(HookEvent::PreBuild, recording("last", log.clone()))
                    .with(HookEvent::PostBuild, recording("post", log.clone())),
            }),
        ];

        let manager = HookManager::new();
        manager.register_addons(&addons).await;
        assert_eq!(manager.handler_count(HookEvent::PreBuild).await, 4);

        let report = manager
            .execute_hook(HookContext::new(HookEvent::PreBuild, "."))
            .await;

        assert_eq!(report.executed, 4);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures[0].addon, "broken");
        assert!(report.failures[1].message.contains("addon bug"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_register_addons_replaces_previous_index() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = HookManager::new();
        manager
            .register_addon_hooks(
                "stale",
                &AddonHooks::new().with(HookEvent::PreStart, recording("stale", log.clone())),
            )
            .await;

        manager.register_addons(&[]).await;
        let report = manager
            .execute_hook(HookContext::new(HookEvent::PreStart, "."))
            .await;
        assert_eq!(report.executed, 0);
        assert!(manager.registered_hooks().await.is_empty());
    }

    #[tokio::test]
    async fn test_custom_event_receives_name() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let manager = HookManager::new();
        manager
            .register_addon_hooks(
                "listener",
                &AddonHooks::new().with(
                    HookEvent::CustomEvent,
                    hook_handler(move |ctx: HookContext| {
                        let captured = captured.clone();
                        async move {
                            *captured.lock().unwrap() = ctx.custom_name.clone();
                            Ok(())
                        }
                    }),
                ),
            )
            .await;

        let report = manager
            .execute_custom("deployFinished", ".", serde_json::json!({"env": "prod"}))
            .await;
        assert!(report.is_success());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("deployFinished"));
    }

    #[test]
    fn test_failure_guidance_families() {
        assert!(failure_guidance("Cannot read property 'x' of undefined").contains("data"));
        assert!(failure_guidance("EACCES: permission denied").contains("permissions"));
        assert!(failure_guidance("ENOENT: no such file").contains("missing"));
        assert!(failure_guidance("weird").contains("implementation"));
    }
}
