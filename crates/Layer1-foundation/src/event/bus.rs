//! Event Bus - 런타임 이벤트 전달
//!
//! 발행된 이벤트는 최근 이벤트 버퍼에 남고, 필터가 맞는 리스너에게
//! 등록 순서대로 전달된다.
//! 리스너 호출 중에는 어떤 잠금도 잡고 있지 않는다.

use super::types::{EventCategory, EventSeverity, HostEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

// ============================================================================
// Listener
// ============================================================================

/// 이벤트 수신자
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &HostEvent);
}

/// 동기 클로저 리스너
struct FnListener<F>(F);

#[async_trait]
impl<F> EventListener for FnListener<F>
where
    F: Fn(&HostEvent) + Send + Sync,
{
    async fn on_event(&self, event: &HostEvent) {
        (self.0)(event)
    }
}

// ============================================================================
// EventFilter
// ============================================================================

/// 전달 조건 (비어 있으면 모두 통과)
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    category: Option<EventCategory>,
    min_severity: Option<EventSeverity>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category: EventCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn at_least(mut self, severity: EventSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn matches(&self, event: &HostEvent) -> bool {
        if self.category.is_some_and(|category| category != event.category) {
            return false;
        }
        match self.min_severity {
            Some(min) => event.severity >= min,
            None => true,
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// 최근 이벤트 버퍼 크기
pub const RECENT_EVENT_LIMIT: usize = 100;

struct Subscription {
    filter: EventFilter,
    listener: Arc<dyn EventListener>,
}

/// 이벤트 버스
///
/// `AddonManager` 가 하나 만들어 로더, 설치기, 복구, addon 컨텍스트에 나눠 준다.
///
/// ```ignore
/// let bus = Arc::new(EventBus::new());
/// bus.on(EventFilter::category(EventCategory::Addon), |event| {
///     println!("{} {}", event.event_type, event.source);
/// })
/// .await;
/// ```
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    recent: Mutex<VecDeque<HostEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// 리스너 등록
    pub async fn subscribe(&self, filter: EventFilter, listener: Arc<dyn EventListener>) {
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.push(Subscription { filter, listener });
        debug!("Event listener #{} registered", subscriptions.len());
    }

    /// 클로저 리스너 등록
    pub async fn on<F>(&self, filter: EventFilter, f: F)
    where
        F: Fn(&HostEvent) + Send + Sync + 'static,
    {
        self.subscribe(filter, Arc::new(FnListener(f))).await
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: HostEvent) {
        trace!(
            event_type = %event.event_type,
            source = %event.source,
            "Publishing event"
        );

        {
            let mut recent = self.recent.lock().await;
            recent.push_back(event.clone());
            while recent.len() > RECENT_EVENT_LIMIT {
                recent.pop_front();
            }
        }

        let targets: Vec<Arc<dyn EventListener>> = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.filter.matches(&event))
            .map(|s| s.listener.clone())
            .collect();

        for listener in targets {
            listener.on_event(&event).await;
        }
    }

    /// 필터에 맞는 최근 이벤트 (발행순)
    pub async fn recent_matching(&self, filter: &EventFilter) -> Vec<HostEvent> {
        self.recent
            .lock()
            .await
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::{addon, install};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_filtered_delivery() {
        let bus = EventBus::new();
        let addon_events = Arc::new(AtomicUsize::new(0));
        let warnings = Arc::new(AtomicUsize::new(0));

        let counter = addon_events.clone();
        bus.on(EventFilter::category(EventCategory::Addon), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        let counter = warnings.clone();
        bus.on(EventFilter::all().at_least(EventSeverity::Warning), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        bus.publish(addon::loaded("timer", "1.0.0")).await;
        bus.publish(addon::quarantined("timer", "boom")).await;
        bus.publish(install::rolled_back("timer", "download failed")).await;

        assert_eq!(addon_events.load(Ordering::SeqCst), 2);
        assert_eq!(warnings.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recent_is_bounded() {
        let bus = EventBus::new();
        for i in 0..RECENT_EVENT_LIMIT + 5 {
            bus.publish(addon::enabled(&format!("addon-{}", i))).await;
        }
        bus.publish(install::uninstalled("timer")).await;

        let recent = bus.recent_matching(&EventFilter::all()).await;
        assert_eq!(recent.len(), RECENT_EVENT_LIMIT);
        assert_eq!(recent[0].source, "addon-6");
        assert_eq!(recent.last().unwrap().event_type, "install.uninstalled");

        let installs = bus
            .recent_matching(&EventFilter::category(EventCategory::Install))
            .await;
        assert_eq!(installs.len(), 1);
    }
}
