//! Content access service - ties together entitlement evaluation, media
//! signing, and view tracking

use std::sync::Arc;
use std::time::Instant;

use moka::future::Cache;

use fanvault_db::{ContentRepository, SubscriptionRepository};
use fanvault_types::{Content, ContentId, CreatorId, EntitlementDecision, Subscription, UserId};

use crate::{
    config::AccessConfig,
    entitlement::{EntitlementEvaluator, EvaluationScope},
    media::MediaSigner,
    page::Page,
    view::ContentView,
    AccessError,
};

/// Result of recording a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was counted; carries the new total
    Counted(i64),
    /// Same viewer saw the item inside the suppression window
    Suppressed,
}

impl ViewOutcome {
    pub fn counted(&self) -> bool {
        matches!(self, Self::Counted(_))
    }
}

/// Content access service
///
/// Provides the request-facing operations:
/// - Single item and feed listings with per-item entitlement
/// - View counting for granted items
/// - The caller's active subscriptions
pub struct AccessService {
    config: AccessConfig,
    evaluator: EntitlementEvaluator,
    signer: MediaSigner,
    content: Arc<dyn ContentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    /// Recently counted (viewer, content) pairs
    recent_views: Cache<(UserId, ContentId), ()>,
}

impl AccessService {
    /// Create a new access service
    pub fn new(
        config: AccessConfig,
        content: Arc<dyn ContentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Result<Self, AccessError> {
        let signer = MediaSigner::new(
            config.media_base_url.clone(),
            config.media_signing_secret.as_bytes(),
            config.media_url_ttl,
        )?;

        Ok(Self {
            evaluator: EntitlementEvaluator::new(Arc::clone(&subscriptions)),
            signer,
            content,
            subscriptions,
            recent_views: Cache::builder()
                .time_to_live(config.view_dedup_window)
                .max_capacity(config.view_dedup_capacity)
                .build(),
            config,
        })
    }

    /// Entitlement evaluator backing this service
    pub fn evaluator(&self) -> &EntitlementEvaluator {
        &self.evaluator
    }

    /// Media signer backing this service
    pub fn signer(&self) -> &MediaSigner {
        &self.signer
    }

    /// Page request bounded by this service's maximum page size
    pub fn page(&self, number: Option<u32>, size: Option<u32>) -> Page {
        Page::new(number, size, self.config.max_page_size)
    }

    // =========================================================================
    // Feed
    // =========================================================================

    /// Fetch one content item as `user` may see it
    #[tracing::instrument(skip(self))]
    pub async fn get_feed_item(
        &self,
        user: Option<UserId>,
        content_id: ContentId,
    ) -> Result<ContentView, AccessError> {
        let started = Instant::now();

        let content = self.find_content(content_id).await?;
        let mut scope = self.evaluator.scope(user);
        let decision = scope.evaluate(&content).await?;
        let view = self.shape(content, decision, &scope);

        record_duration("get_feed_item", started);
        Ok(view)
    }

    /// Newest content across all creators
    #[tracing::instrument(skip(self))]
    pub async fn list_feed(
        &self,
        user: Option<UserId>,
        page: Page,
    ) -> Result<Vec<ContentView>, AccessError> {
        let started = Instant::now();

        let items = self.content.list_recent(page.offset(), page.limit()).await?;
        let views = self.shape_all(user, items).await?;

        record_duration("list_feed", started);
        Ok(views)
    }

    /// Newest content of one creator
    #[tracing::instrument(skip(self))]
    pub async fn list_creator_feed(
        &self,
        user: Option<UserId>,
        creator_id: CreatorId,
        page: Page,
    ) -> Result<Vec<ContentView>, AccessError> {
        let started = Instant::now();

        let items = self
            .content
            .list_by_creator(creator_id, page.offset(), page.limit())
            .await?;
        let views = self.shape_all(user, items).await?;

        record_duration("list_creator_feed", started);
        Ok(views)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Count a view of `content_id` by `user`.
    ///
    /// Denied viewers get [`AccessError::AccessDenied`] and nothing is
    /// counted. A signed-in viewer's repeat inside the suppression window is
    /// reported as [`ViewOutcome::Suppressed`].
    #[tracing::instrument(skip(self))]
    pub async fn record_view(
        &self,
        user: Option<UserId>,
        content_id: ContentId,
    ) -> Result<ViewOutcome, AccessError> {
        let content = self.find_content(content_id).await?;
        let decision = self.evaluator.can_access(user, &content).await?;

        if !decision.granted {
            return Err(AccessError::AccessDenied {
                reason: decision.reason,
                required_tier: content.required_tier,
            });
        }

        if let Some(user) = user {
            let entry = self
                .recent_views
                .entry((user, content_id))
                .or_insert(())
                .await;
            if !entry.is_fresh() {
                tracing::debug!(%content_id, user_id = %user, "Suppressing repeat view");
                return Ok(ViewOutcome::Suppressed);
            }
        }

        match self.content.increment_view_count(content_id).await {
            Ok(total) => Ok(ViewOutcome::Counted(total)),
            Err(err) => {
                // Let a retry count
                if let Some(user) = user {
                    self.recent_views.invalidate(&(user, content_id)).await;
                }
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Active subscriptions held by `user`
    pub async fn list_subscriptions(&self, user: UserId) -> Result<Vec<Subscription>, AccessError> {
        Ok(self.subscriptions.list_active(user).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn find_content(&self, content_id: ContentId) -> Result<Content, AccessError> {
        self.content
            .find_by_id(content_id)
            .await?
            .ok_or(AccessError::ContentNotFound)
    }

    async fn shape_all(
        &self,
        user: Option<UserId>,
        items: Vec<Content>,
    ) -> Result<Vec<ContentView>, AccessError> {
        let mut scope = self.evaluator.scope(user);
        let mut views = Vec::with_capacity(items.len());
        for content in items {
            let decision = scope.evaluate(&content).await?;
            views.push(self.shape(content, decision, &scope));
        }
        Ok(views)
    }

    fn shape(
        &self,
        content: Content,
        decision: EntitlementDecision,
        scope: &EvaluationScope<'_>,
    ) -> ContentView {
        ContentView::new(content, decision, |media_key| {
            self.signer.sign(media_key, scope.now())
        })
    }
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService")
            .field("media_base_url", &self.config.media_base_url)
            .finish_non_exhaustive()
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    metrics::histogram!("fanvault_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
