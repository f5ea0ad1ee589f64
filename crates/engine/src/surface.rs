//! Delivery surfaces.
//!
//! One `DeliverySurface` per execution context (background worker or open
//! page). Each handles every push it observes independently:
//!
//! 1. payload carries a `notification` block → the platform shows it, skip
//! 2. visibility/focus gate → defer to another surface
//! 3. renderer capability → no-op when unsupported or not permitted
//! 4. fingerprint + tag
//! 5. claim (before render)
//! 6. render, logging failures without retry

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use peppermint_common::config::DeliveryConfig;
use peppermint_common::error::AppError;
use peppermint_common::types::{
    DeliveryOutcome, PushPayload, RenderCapability, ShowNotificationRequest, SurfaceContext,
    SurfaceKind, SuppressionReason,
};

use crate::coordinator::ClaimCoordinator;
use crate::event::NotificationEvent;
use crate::gate;

/// The platform "show notification" call.
#[async_trait]
pub trait NotificationRenderer: Send + Sync {
    /// Whether notifications can be shown from this context right now.
    fn capability(&self) -> RenderCapability {
        RenderCapability::Supported
    }

    /// Fire-and-forget render of a user-visible notification.
    async fn show(&self, request: &ShowNotificationRequest) -> Result<(), AppError>;
}

pub struct DeliverySurface {
    label: String,
    context: RwLock<SurfaceContext>,
    coordinator: Arc<dyn ClaimCoordinator>,
    renderer: Arc<dyn NotificationRenderer>,
    config: Arc<DeliveryConfig>,
}

impl DeliverySurface {
    pub fn new(
        label: impl Into<String>,
        context: SurfaceContext,
        coordinator: Arc<dyn ClaimCoordinator>,
        renderer: Arc<dyn NotificationRenderer>,
        config: Arc<DeliveryConfig>,
    ) -> Self {
        Self {
            label: label.into(),
            context: RwLock::new(context),
            coordinator,
            renderer,
            config,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn context(&self) -> SurfaceContext {
        *self.context.read().await
    }

    pub async fn kind(&self) -> SurfaceKind {
        self.context.read().await.kind()
    }

    /// Update visibility/focus as the host reports changes.
    pub async fn set_context(&self, context: SurfaceContext) {
        *self.context.write().await = context;
    }

    /// Run one received push to a terminal outcome.
    pub async fn handle(&self, payload: &PushPayload, now: DateTime<Utc>) -> DeliveryOutcome {
        let context = self.context().await;
        let kind = context.kind();

        if payload.is_platform_displayed() {
            tracing::debug!(
                surface = %self.label,
                kind = %kind,
                "Payload carries a notification block, platform displays it"
            );
            return DeliveryOutcome::suppressed(SuppressionReason::PlatformDisplayed);
        }

        if !gate::admits(&context) {
            tracing::debug!(
                surface = %self.label,
                kind = %kind,
                "Surface not in the foreground role, deferring"
            );
            return DeliveryOutcome::suppressed(SuppressionReason::Deferred);
        }

        match self.renderer.capability() {
            RenderCapability::Supported => {}
            capability => {
                tracing::info!(
                    surface = %self.label,
                    capability = ?capability,
                    "Notifications unavailable, skipping"
                );
                return DeliveryOutcome::suppressed(SuppressionReason::CapabilityAbsent);
            }
        }

        let event = NotificationEvent::from_payload(payload, now, &self.config);
        let tag = event.tag(&self.config.tag_prefix);

        match self.coordinator.try_claim(&tag, now).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    surface = %self.label,
                    tag = %tag,
                    coordinator = self.coordinator.name(),
                    "Duplicate notification suppressed"
                );
                return DeliveryOutcome::suppressed(SuppressionReason::AlreadyClaimed);
            }
            Err(e) => {
                // Render anyway: the shared tag still lets the platform collapse duplicates
                tracing::warn!(
                    surface = %self.label,
                    tag = %tag,
                    coordinator = self.coordinator.name(),
                    error = %e,
                    "Claim failed, rendering without coordination"
                );
            }
        }

        let request = event.render_request(&tag, payload, &self.config);
        match self.renderer.show(&request).await {
            Ok(()) => {
                tracing::info!(
                    surface = %self.label,
                    kind = %kind,
                    tag = %tag,
                    title = %request.title,
                    "Notification rendered"
                );
                DeliveryOutcome::Rendered {
                    tag: tag.as_str().to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    surface = %self.label,
                    tag = %tag,
                    error = %e,
                    "Render failed, not retrying"
                );
                DeliveryOutcome::suppressed(SuppressionReason::RenderFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::Duration;

    use crate::coordinator::LocalCoordinator;
    use crate::fingerprint::Tag;

    #[derive(Default)]
    struct RecordingRenderer {
        shown: Mutex<Vec<ShowNotificationRequest>>,
        capability: Option<RenderCapability>,
        fail: bool,
    }

    impl RecordingRenderer {
        fn shown(&self) -> Vec<ShowNotificationRequest> {
            self.shown.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationRenderer for RecordingRenderer {
        fn capability(&self) -> RenderCapability {
            self.capability.unwrap_or(RenderCapability::Supported)
        }

        async fn show(&self, request: &ShowNotificationRequest) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Render("showNotification rejected".to_string()));
            }
            self.shown.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct BrokenCoordinator;

    #[async_trait]
    impl ClaimCoordinator for BrokenCoordinator {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn try_claim(&self, _tag: &Tag, _now: DateTime<Utc>) -> Result<bool, AppError> {
            Err(AppError::Internal("store unavailable".to_string()))
        }

        async fn expire(&self, _now: DateTime<Utc>) -> Result<usize, AppError> {
            Ok(0)
        }
    }

    fn surface(
        context: SurfaceContext,
        coordinator: Arc<dyn ClaimCoordinator>,
        renderer: Arc<RecordingRenderer>,
    ) -> DeliverySurface {
        DeliverySurface::new(
            "test",
            context,
            coordinator,
            renderer,
            Arc::new(DeliveryConfig::default()),
        )
    }

    fn local() -> Arc<dyn ClaimCoordinator> {
        Arc::new(LocalCoordinator::new(Duration::milliseconds(1000)))
    }

    #[tokio::test]
    async fn test_worker_renders_data_only_payload() {
        let renderer = Arc::new(RecordingRenderer::default());
        let worker = surface(SurfaceContext::worker(), local(), renderer.clone());

        let outcome = worker
            .handle(&PushPayload::data_only("Peppermint Tracker", "New update!"), Utc::now())
            .await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Rendered {
                tag: "peppermint-djr1ks".to_string()
            }
        );
        let shown = renderer.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].options.tag, "peppermint-djr1ks");
        assert!(!shown[0].options.renotify);
    }

    #[tokio::test]
    async fn test_notification_block_skips_render() {
        let renderer = Arc::new(RecordingRenderer::default());
        let worker = surface(SurfaceContext::worker(), local(), renderer.clone());
        let payload: PushPayload = serde_json::from_value(serde_json::json!({
            "notification": { "title": "Hi", "body": "There" }
        }))
        .unwrap();

        let outcome = worker.handle(&payload, Utc::now()).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::suppressed(SuppressionReason::PlatformDisplayed)
        );
        assert!(renderer.shown().is_empty());
    }

    #[tokio::test]
    async fn test_unfocused_page_never_renders() {
        let renderer = Arc::new(RecordingRenderer::default());
        let coordinator = Arc::new(LocalCoordinator::new(Duration::milliseconds(1000)));
        let contexts = [
            SurfaceContext::hidden_page(),
            SurfaceContext::Page {
                visibility: peppermint_common::types::Visibility::Visible,
                has_focus: false,
            },
        ];

        for context in contexts {
            let page = surface(context, coordinator.clone(), renderer.clone());
            for (title, body) in [("a", "b"), ("Peppermint Tracker", "New update!"), ("", "")] {
                let outcome = page
                    .handle(&PushPayload::data_only(title, body), Utc::now())
                    .await;
                assert_eq!(outcome, DeliveryOutcome::suppressed(SuppressionReason::Deferred));
            }
        }

        assert!(renderer.shown().is_empty());
        // Deferred surfaces never claim
        assert_eq!(coordinator.tracked_count().await, 0);
    }

    #[tokio::test]
    async fn test_set_context_reopens_gate() {
        let renderer = Arc::new(RecordingRenderer::default());
        let page = surface(SurfaceContext::hidden_page(), local(), renderer.clone());
        let payload = PushPayload::data_only("Bob sent a message", "hi");

        assert!(!page.handle(&payload, Utc::now()).await.is_rendered());
        page.set_context(SurfaceContext::focused_page()).await;
        assert!(page.handle(&payload, Utc::now()).await.is_rendered());
        assert_eq!(page.kind().await, SurfaceKind::Page);
    }

    #[tokio::test]
    async fn test_permission_denied_is_noop() {
        let renderer = Arc::new(RecordingRenderer {
            capability: Some(RenderCapability::PermissionDenied),
            ..Default::default()
        });
        let worker = surface(SurfaceContext::worker(), local(), renderer.clone());

        let outcome = worker
            .handle(&PushPayload::data_only("a", "b"), Utc::now())
            .await;
        assert_eq!(
            outcome,
            DeliveryOutcome::suppressed(SuppressionReason::CapabilityAbsent)
        );
    }

    #[tokio::test]
    async fn test_render_failure_keeps_claim() {
        let coordinator = Arc::new(LocalCoordinator::new(Duration::milliseconds(1000)));
        let failing = Arc::new(RecordingRenderer {
            fail: true,
            ..Default::default()
        });
        let worker = surface(SurfaceContext::worker(), coordinator.clone(), failing);
        let t = Utc::now();
        let payload = PushPayload::data_only("a", "b");

        let outcome = worker.handle(&payload, t).await;
        assert_eq!(outcome, DeliveryOutcome::suppressed(SuppressionReason::RenderFailed));

        // Claim-before-render: a second surface stays suppressed in the window
        let renderer = Arc::new(RecordingRenderer::default());
        let page = surface(SurfaceContext::focused_page(), coordinator, renderer.clone());
        let outcome = page.handle(&payload, t + Duration::milliseconds(100)).await;
        assert_eq!(outcome, DeliveryOutcome::suppressed(SuppressionReason::AlreadyClaimed));
        assert!(renderer.shown().is_empty());
    }

    #[tokio::test]
    async fn test_claim_error_fails_open() {
        let renderer = Arc::new(RecordingRenderer::default());
        let worker = surface(
            SurfaceContext::worker(),
            Arc::new(BrokenCoordinator),
            renderer.clone(),
        );

        let outcome = worker
            .handle(&PushPayload::data_only("a", "b"), Utc::now())
            .await;
        assert!(outcome.is_rendered());
        assert_eq!(renderer.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let renderer = Arc::new(RecordingRenderer::default());
        let worker = surface(SurfaceContext::worker(), local(), renderer.clone());

        worker.handle(&PushPayload::default(), Utc::now()).await;

        let shown = renderer.shown();
        assert_eq!(shown[0].title, "Peppermint Tracker");
        assert_eq!(shown[0].options.body, "New update!");
    }
}
