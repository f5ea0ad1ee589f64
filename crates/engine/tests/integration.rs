//! End-to-end delivery scenarios across every in-process claim strategy.
//!
//! A fake platform plays both the renderer and the live-notification registry,
//! so each scenario runs against `local`, `broadcast` and `registry` hubs.
//! The Redis strategy is covered by the ignored test at the bottom:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p peppermint-engine --test integration -- --ignored --nocapture
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use peppermint_common::config::{CoordinatorStrategy, DeliveryConfig};
use peppermint_common::error::AppError;
use peppermint_common::types::{
    DeliveryOutcome, LiveNotification, PushPayload, ShowNotificationRequest, SurfaceContext,
    SuppressionReason,
};
use peppermint_engine::coordinator::registry::NotificationRegistry;
use peppermint_engine::fingerprint::fingerprint;
use peppermint_engine::hub::SurfaceHub;
use peppermint_engine::surface::NotificationRenderer;

// ============================================================
// Fake platform
// ============================================================

struct FakePlatform {
    clock: Mutex<DateTime<Utc>>,
    shown: Mutex<Vec<(ShowNotificationRequest, DateTime<Utc>)>>,
}

impl FakePlatform {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            clock: Mutex::new(now),
            shown: Mutex::new(Vec::new()),
        }
    }

    fn set_now(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = now;
    }

    fn render_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    fn tags(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.options.tag.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationRenderer for FakePlatform {
    async fn show(&self, request: &ShowNotificationRequest) -> Result<(), AppError> {
        let now = *self.clock.lock().unwrap();
        let mut shown = self.shown.lock().unwrap();
        // Same tag replaces the previous notification
        shown.retain(|(existing, _)| existing.options.tag != request.options.tag);
        shown.push((request.clone(), now));
        Ok(())
    }
}

#[async_trait]
impl NotificationRegistry for FakePlatform {
    async fn live_notifications(&self, tag: &str) -> Result<Vec<LiveNotification>, AppError> {
        Ok(self
            .shown
            .lock()
            .unwrap()
            .iter()
            .filter(|(request, _)| request.options.tag == tag)
            .map(|(request, shown_at)| LiveNotification {
                tag: request.options.tag.clone(),
                shown_at: *shown_at,
            })
            .collect())
    }
}

/// Counts every render call, unlike the platform list which collapses tags.
struct CountingRenderer {
    platform: Arc<FakePlatform>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationRenderer for CountingRenderer {
    async fn show(&self, request: &ShowNotificationRequest) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(request.options.tag.clone());
        self.platform.show(request).await
    }
}

struct Device {
    hub: SurfaceHub,
    platform: Arc<FakePlatform>,
    renderer: Arc<CountingRenderer>,
}

impl Device {
    fn calls(&self) -> Vec<String> {
        self.renderer.calls.lock().unwrap().clone()
    }
}

const STRATEGIES: [CoordinatorStrategy; 3] = [
    CoordinatorStrategy::Local,
    CoordinatorStrategy::Broadcast,
    CoordinatorStrategy::Registry,
];

fn device(strategy: CoordinatorStrategy, now: DateTime<Utc>) -> Device {
    let platform = Arc::new(FakePlatform::new(now));
    let renderer = Arc::new(CountingRenderer {
        platform: platform.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let config = DeliveryConfig {
        strategy,
        ..Default::default()
    };
    let hub = SurfaceHub::new(config, renderer.clone()).with_registry(platform.clone());
    Device {
        hub,
        platform,
        renderer,
    }
}

fn update_payload() -> PushPayload {
    serde_json::from_value(serde_json::json!({
        "data": { "title": "Peppermint Tracker", "body": "New update!" }
    }))
    .unwrap()
}

// ============================================================
// Scenario A: hidden page + worker receive the same push
// ============================================================

#[tokio::test]
async fn test_hidden_page_and_worker_render_once() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();
        let page = device
            .hub
            .page("tab-1", SurfaceContext::hidden_page())
            .unwrap();
        let payload = update_payload();

        let (worker_outcome, page_outcome) =
            tokio::join!(worker.handle(&payload, t), page.handle(&payload, t));

        let expected_tag = format!(
            "peppermint-{}",
            fingerprint("Peppermint TrackerNew update!", "")
        );
        assert_eq!(
            worker_outcome,
            DeliveryOutcome::Rendered {
                tag: expected_tag.clone()
            },
            "strategy {}",
            strategy
        );
        assert_eq!(
            page_outcome,
            DeliveryOutcome::suppressed(SuppressionReason::Deferred)
        );
        assert_eq!(device.calls(), vec![expected_tag], "strategy {}", strategy);
    }
}

// ============================================================
// Scenario B: platform-displayed payload
// ============================================================

#[tokio::test]
async fn test_notification_block_means_no_manual_render() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();
        let page = device
            .hub
            .page("tab-1", SurfaceContext::focused_page())
            .unwrap();
        let payload: PushPayload = serde_json::from_value(serde_json::json!({
            "notification": { "title": "Alice sent a message", "body": "hi" },
            "data": { "link": "/chat" }
        }))
        .unwrap();

        let (a, b) = tokio::join!(worker.handle(&payload, t), page.handle(&payload, t));

        assert_eq!(a, DeliveryOutcome::suppressed(SuppressionReason::PlatformDisplayed));
        assert_eq!(b, DeliveryOutcome::suppressed(SuppressionReason::PlatformDisplayed));
        assert!(device.calls().is_empty(), "strategy {}", strategy);
    }
}

// ============================================================
// Scenario C: identical text two seconds apart
// ============================================================

#[tokio::test]
async fn test_identical_text_after_window_renders_again() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();
        let page = device
            .hub
            .page("tab-1", SurfaceContext::hidden_page())
            .unwrap();
        let payload = update_payload();

        worker.handle(&payload, t).await;
        page.handle(&payload, t).await;

        let later = t + Duration::seconds(2);
        device.platform.set_now(later);
        worker.handle(&payload, later).await;
        page.handle(&payload, later).await;

        assert_eq!(device.calls().len(), 2, "strategy {}", strategy);
        // Both renders share a tag, so the platform keeps one entry
        assert_eq!(device.platform.render_count(), 1);
    }
}

#[tokio::test]
async fn test_identical_text_inside_window_suppressed() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();
        let payload = update_payload();

        assert!(worker.handle(&payload, t).await.is_rendered());
        let outcome = worker
            .handle(&payload, t + Duration::milliseconds(500))
            .await;

        assert_eq!(
            outcome,
            DeliveryOutcome::suppressed(SuppressionReason::AlreadyClaimed),
            "strategy {}",
            strategy
        );
        assert_eq!(device.calls().len(), 1);
    }
}

// ============================================================
// Scenario D: worker only, no page open
// ============================================================

#[tokio::test]
async fn test_worker_alone_renders_once() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();

        let outcome = worker.handle(&update_payload(), t).await;

        assert!(outcome.is_rendered(), "strategy {}", strategy);
        assert_eq!(device.calls().len(), 1);
    }
}

// ============================================================
// Foreground precedence and multi-tab arbitration
// ============================================================

#[tokio::test]
async fn test_focused_page_takes_precedence_over_worker() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device
            .hub
            .surface("sw", SurfaceContext::Worker {
                focused_client: true,
            })
            .unwrap();
        let page = device
            .hub
            .page("tab-1", SurfaceContext::focused_page())
            .unwrap();
        let payload = update_payload();

        let (worker_outcome, page_outcome) =
            tokio::join!(worker.handle(&payload, t), page.handle(&payload, t));

        assert_eq!(
            worker_outcome,
            DeliveryOutcome::suppressed(SuppressionReason::Deferred)
        );
        assert!(page_outcome.is_rendered(), "strategy {}", strategy);
        assert_eq!(device.calls().len(), 1);
    }
}

#[tokio::test]
async fn test_two_focused_tabs_arbitrated_by_claims() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let first = device
            .hub
            .page("tab-1", SurfaceContext::focused_page())
            .unwrap();
        let second = device
            .hub
            .page("tab-2", SurfaceContext::focused_page())
            .unwrap();
        let payload = update_payload();

        let (a, b) = tokio::join!(
            first.handle(&payload, t),
            second.handle(&payload, t + Duration::milliseconds(5))
        );

        let rendered = [&a, &b].iter().filter(|o| o.is_rendered()).count();
        assert_eq!(rendered, 1, "strategy {}", strategy);
        assert_eq!(device.calls().len(), 1);
    }
}

#[tokio::test]
async fn test_distinct_messages_both_render() {
    for strategy in STRATEGIES {
        let t = Utc::now();
        let device = device(strategy, t);
        let worker = device.hub.worker("sw").unwrap();

        worker
            .handle(&PushPayload::data_only("Alice sent a message", "hi"), t)
            .await;
        worker
            .handle(&PushPayload::data_only("Bob sent a message", "hi"), t)
            .await;

        assert_eq!(device.platform.tags().len(), 2, "strategy {}", strategy);
    }
}

// ============================================================
// Redis strategy (requires a running Redis)
// ============================================================

#[tokio::test]
#[ignore]
async fn test_redis_strategy_shared_between_surfaces() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());

    let t = Utc::now();
    let platform = Arc::new(FakePlatform::new(t));
    let config = DeliveryConfig {
        strategy: CoordinatorStrategy::Redis,
        tag_prefix: format!("peppermint-it-{}", t.timestamp_millis()),
        redis_url: Some(url),
        ..Default::default()
    };
    let hub = SurfaceHub::from_config(config, platform.clone())
        .await
        .unwrap();
    let worker = hub.worker("sw").unwrap();
    let page = hub.page("tab-1", SurfaceContext::focused_page()).unwrap();
    let payload = update_payload();

    let (a, b) = tokio::join!(worker.handle(&payload, t), page.handle(&payload, t));

    assert_eq!([&a, &b].iter().filter(|o| o.is_rendered()).count(), 1);
    assert_eq!(platform.render_count(), 1);
}
