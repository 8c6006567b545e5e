//! Billing event processor
//!
//! Applies parsed billing events to the subscription record store. Each
//! event id is applied at most once: a bounded in-process recent set answers
//! fast for redeliveries, and the durable processed-event record catches
//! what the recent set has evicted or never saw (restarts, other replicas).

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use moka::future::Cache;
use tracing::{info, instrument, warn};

use fanvault_db::{
    CreatorRepository, ProcessedEventRepository, Repositories, SubscriptionRepository,
    TierRepository, UpsertSubscription,
};
use fanvault_types::{StatusChange, SubscriptionStatus};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::webhook::{BillingEvent, BillingEventKind, CheckoutCompleted, WebhookHandler};

/// What processing did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Store was updated
    Applied,
    /// Event id was already processed
    Duplicate,
    /// Event needs no change (unhandled type, or no matching row yet)
    Ignored,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
        }
    }
}

/// Billing event processor
pub struct BillingEventProcessor {
    config: BillingConfig,
    webhooks: WebhookHandler,
    subscriptions: Arc<dyn SubscriptionRepository>,
    tiers: Arc<dyn TierRepository>,
    creators: Arc<dyn CreatorRepository>,
    events: Arc<dyn ProcessedEventRepository>,
    /// Recently claimed event ids
    recent: Cache<String, ()>,
}

impl BillingEventProcessor {
    /// Create a new processor over the given repositories
    pub fn new(config: BillingConfig, repos: &Repositories) -> Self {
        Self {
            webhooks: WebhookHandler::new(
                config.stripe_webhook_secret.clone(),
                config.signature_tolerance,
                config.default_period,
            ),
            subscriptions: Arc::clone(&repos.subscriptions),
            tiers: Arc::clone(&repos.tiers),
            creators: Arc::clone(&repos.creators),
            events: Arc::clone(&repos.events),
            recent: Cache::builder()
                .max_capacity(config.dedup_capacity)
                .time_to_live(config.dedup_retention)
                .build(),
            config,
        }
    }

    /// Verify, parse, and apply one webhook delivery
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProcessOutcome, BillingError> {
        let event = match self.webhooks.verify_and_parse(payload, signature) {
            Ok(event) => event,
            Err(err) => {
                record_outcome("unknown", "rejected");
                return Err(err);
            }
        };
        self.process(event).await
    }

    /// Apply one billing event at most once
    #[instrument(skip(self, event), fields(event_id = %event.id, kind = event.kind.name()))]
    pub async fn process(&self, event: BillingEvent) -> Result<ProcessOutcome, BillingError> {
        let started = Instant::now();
        let kind = event.kind.name();

        let result = self.process_once(&event).await;

        match &result {
            Ok(outcome) => record_outcome(kind, outcome.as_str()),
            Err(err) => {
                warn!(error = %err, retriable = err.is_retriable(), "Billing event failed");
                record_outcome(kind, "failed");
            }
        }
        metrics::histogram!("fanvault_operation_duration_seconds", "operation" => "process_billing_event")
            .record(started.elapsed().as_secs_f64());

        result
    }

    /// Drop durable processed-event records older than the retention window
    pub async fn purge_expired(&self) -> Result<u64, BillingError> {
        let retention = chrono::Duration::from_std(self.config.dedup_retention)
            .map_err(|e| BillingError::Internal(e.to_string()))?;
        let purged = self.events.purge_older_than(Utc::now() - retention).await?;
        if purged > 0 {
            info!(purged, "Purged processed billing events");
        }
        Ok(purged)
    }

    async fn process_once(&self, event: &BillingEvent) -> Result<ProcessOutcome, BillingError> {
        if let BillingEventKind::Ignored { event_type } = &event.kind {
            info!(event_type = %event_type, "Acknowledging unhandled billing event");
            return Ok(ProcessOutcome::Ignored);
        }

        // Atomic insert-if-absent; concurrent deliveries of one id get one winner
        let entry = self.recent.entry(event.id.clone()).or_insert(()).await;
        if !entry.is_fresh() {
            info!("Duplicate billing event (recent)");
            return Ok(ProcessOutcome::Duplicate);
        }

        match self.events.claim(&event.id, event.kind.name()).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Duplicate billing event (processed record)");
                return Ok(ProcessOutcome::Duplicate);
            }
            Err(err) => {
                self.recent.invalidate(&event.id).await;
                return Err(err.into());
            }
        }

        match self.apply(event).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // Let the redelivery apply it
                if let Err(release_err) = self.events.release(&event.id).await {
                    warn!(error = %release_err, "Failed to release processed-event claim");
                }
                self.recent.invalidate(&event.id).await;
                Err(err)
            }
        }
    }

    async fn apply(&self, event: &BillingEvent) -> Result<ProcessOutcome, BillingError> {
        match &event.kind {
            BillingEventKind::CheckoutCompleted(checkout) => self.checkout_completed(checkout).await,
            BillingEventKind::SubscriptionUpdated {
                external_subscription_id,
                status,
                period,
            } => {
                let change = self
                    .subscriptions
                    .update_from_billing(external_subscription_id, *status, period.start, period.end)
                    .await?;
                Ok(self.report(external_subscription_id, change))
            }
            BillingEventKind::SubscriptionDeleted {
                external_subscription_id,
            } => {
                let change = self
                    .subscriptions
                    .set_status(external_subscription_id, SubscriptionStatus::Cancelled)
                    .await?;
                Ok(self.report(external_subscription_id, change))
            }
            BillingEventKind::InvoicePaymentFailed {
                external_subscription_id,
            } => {
                let Some(external_subscription_id) = external_subscription_id else {
                    info!("Invoice without subscription reference, ignoring");
                    return Ok(ProcessOutcome::Ignored);
                };
                self.invoice_status(external_subscription_id, SubscriptionStatus::PastDue)
                    .await
            }
            BillingEventKind::InvoicePaymentSucceeded {
                external_subscription_id,
            } => {
                let Some(external_subscription_id) = external_subscription_id else {
                    info!("Invoice without subscription reference, ignoring");
                    return Ok(ProcessOutcome::Ignored);
                };
                self.invoice_status(external_subscription_id, SubscriptionStatus::Active)
                    .await
            }
            BillingEventKind::Ignored { .. } => Ok(ProcessOutcome::Ignored),
        }
    }

    async fn checkout_completed(
        &self,
        checkout: &CheckoutCompleted,
    ) -> Result<ProcessOutcome, BillingError> {
        let tier = self
            .tiers
            .find_by_id(checkout.tier_id)
            .await?
            .ok_or_else(|| {
                BillingError::UnresolvedReference(format!("tier {} not found", checkout.tier_id))
            })?;

        if tier.creator_id != checkout.creator_id {
            return Err(BillingError::UnresolvedReference(format!(
                "tier {} does not belong to creator {}",
                checkout.tier_id, checkout.creator_id
            )));
        }

        if self.creators.find_by_id(checkout.creator_id).await?.is_none() {
            return Err(BillingError::UnresolvedReference(format!(
                "creator {} not found",
                checkout.creator_id
            )));
        }

        let change = self
            .subscriptions
            .upsert(UpsertSubscription {
                subscriber_id: checkout.subscriber_id,
                creator_id: checkout.creator_id,
                tier_id: checkout.tier_id,
                status: SubscriptionStatus::Active,
                current_period_start: checkout.period.start,
                current_period_end: checkout.period.end,
                external_billing_id: checkout.external_subscription_id.clone(),
            })
            .await?;

        info!(
            subscriber_id = %checkout.subscriber_id,
            creator_id = %checkout.creator_id,
            tier = %tier.tier,
            net_new = change.active_delta() > 0,
            "Checkout applied"
        );
        Ok(ProcessOutcome::Applied)
    }

    /// Invoice outcomes move a live subscription between Active and PastDue;
    /// a canceled subscription stays canceled
    async fn invoice_status(
        &self,
        external_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<ProcessOutcome, BillingError> {
        let current = self
            .subscriptions
            .find_by_external_id(external_subscription_id)
            .await?;

        match current.map(|s| s.status) {
            None => Ok(self.report(external_subscription_id, None)),
            Some(SubscriptionStatus::Cancelled) => {
                info!(external_subscription_id, %status, "Invoice for canceled subscription, ignoring");
                Ok(ProcessOutcome::Ignored)
            }
            Some(_) => {
                let change = self
                    .subscriptions
                    .set_status(external_subscription_id, status)
                    .await?;
                Ok(self.report(external_subscription_id, change))
            }
        }
    }

    fn report(&self, external_subscription_id: &str, change: Option<StatusChange>) -> ProcessOutcome {
        match change {
            Some(change) => {
                info!(
                    external_subscription_id,
                    previous = ?change.previous,
                    status = %change.subscription.status,
                    "Subscription status applied"
                );
                ProcessOutcome::Applied
            }
            None => {
                // Delivery can precede the checkout that creates the row
                warn!(external_subscription_id, "No subscription for billing reference yet");
                ProcessOutcome::Ignored
            }
        }
    }
}

impl std::fmt::Debug for BillingEventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingEventProcessor")
            .field("webhooks", &self.webhooks)
            .finish_non_exhaustive()
    }
}

fn record_outcome(kind: &'static str, outcome: &'static str) {
    metrics::counter!(
        "fanvault_webhooks_processed_total",
        "event" => kind,
        "outcome" => outcome
    )
    .increment(1);
}
