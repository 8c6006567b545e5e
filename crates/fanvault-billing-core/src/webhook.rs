//! Stripe webhook verification and parsing
//!
//! Turns a signed Stripe delivery into a provider-neutral [`BillingEvent`].

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};

use fanvault_types::{CreatorId, SubscriptionStatus, TierId, UserId};

use crate::error::BillingError;

/// Stripe event types we act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Checkout session completed
    CheckoutSessionCompleted,
    /// Customer subscription updated
    CustomerSubscriptionUpdated,
    /// Customer subscription deleted
    CustomerSubscriptionDeleted,
    /// Invoice paid
    InvoicePaid,
    /// Invoice payment failed
    InvoicePaymentFailed,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.paid" | "invoice.payment_succeeded" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A billing period window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Checkout completion for a (subscriber, creator, tier)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub subscriber_id: UserId,
    pub creator_id: CreatorId,
    pub tier_id: TierId,
    pub external_subscription_id: String,
    pub period: BillingPeriod,
}

/// Normalized lifecycle change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    /// A checkout created or renewed a subscription
    CheckoutCompleted(CheckoutCompleted),
    /// Provider state of a subscription changed
    SubscriptionUpdated {
        external_subscription_id: String,
        status: SubscriptionStatus,
        period: BillingPeriod,
    },
    /// Subscription ended
    SubscriptionDeleted { external_subscription_id: String },
    /// Renewal payment failed; `None` for invoices outside a subscription
    InvoicePaymentFailed {
        external_subscription_id: Option<String>,
    },
    /// Renewal payment succeeded; `None` for invoices outside a subscription
    InvoicePaymentSucceeded {
        external_subscription_id: Option<String>,
    },
    /// Acknowledged without effect
    Ignored { event_type: String },
}

impl BillingEventKind {
    /// Label used in logs, metrics, and the processed-event record
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted(_) => "checkout-completed",
            Self::SubscriptionUpdated { .. } => "subscription-updated",
            Self::SubscriptionDeleted { .. } => "subscription-deleted",
            Self::InvoicePaymentFailed { .. } => "invoice-payment-failed",
            Self::InvoicePaymentSucceeded { .. } => "invoice-payment-succeeded",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// A verified, parsed billing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    /// Provider event id, unique per event
    pub id: String,
    /// What happened
    pub kind: BillingEventKind,
    /// When the provider created the event
    pub created: DateTime<Utc>,
}

/// Map a Stripe subscription status onto the local lifecycle.
///
/// Anything not clearly paid or clearly over is treated as past due.
pub fn map_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" | "trialing" => SubscriptionStatus::Active,
        "canceled" | "incomplete_expired" => SubscriptionStatus::Cancelled,
        other => {
            if !matches!(other, "past_due" | "unpaid" | "incomplete" | "paused") {
                warn!(status = other, "Unrecognized provider status, treating as past due");
            }
            SubscriptionStatus::PastDue
        }
    }
}

/// Webhook handler for verifying and parsing Stripe deliveries
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
    tolerance: Duration,
    default_period: Duration,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>, tolerance: Duration, default_period: Duration) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            tolerance,
            default_period,
        }
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, BillingError> {
        self.verify_signature(payload, signature, Utc::now())?;
        self.parse(payload)
    }

    /// Verify a `Stripe-Signature` header (`t=…,v1=…[,v1=…]`) at `now`
    pub fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::InvalidSignature("missing timestamp".to_string())
        })?;

        if candidates.is_empty() {
            warn!("Missing v1 signature in webhook signature");
            return Err(BillingError::InvalidSignature("missing signature".to_string()));
        }

        let expected = self.compute_signature(timestamp, payload)?;
        let matched = candidates
            .iter()
            .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));
        if !matched {
            warn!("Webhook signature verification failed");
            return Err(BillingError::InvalidSignature(
                "signature verification failed".to_string(),
            ));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BillingError::InvalidSignature("invalid timestamp format".to_string()))?;
        if now.timestamp().abs_diff(ts) > self.tolerance.as_secs() {
            warn!(timestamp = ts, now = now.timestamp(), "Webhook timestamp outside tolerance");
            return Err(BillingError::InvalidSignature("timestamp outside tolerance".to_string()));
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: &str, payload: &[u8]) -> Result<String, BillingError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Parse an already verified payload
    pub fn parse(&self, payload: &[u8]) -> Result<BillingEvent, BillingError> {
        let raw: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::MalformedEvent(e.to_string()))?;

        debug!(event_id = %raw.id, event_type = %raw.event_type, "Parsed webhook event");

        let created = timestamp(raw.created)?;
        let event_type = WebhookEventType::from(raw.event_type.as_str());
        let kind = self.parse_kind(&event_type, raw.data.object, created)?;

        Ok(BillingEvent {
            id: raw.id,
            kind,
            created,
        })
    }

    fn parse_kind(
        &self,
        event_type: &WebhookEventType,
        object: serde_json::Value,
        created: DateTime<Utc>,
    ) -> Result<BillingEventKind, BillingError> {
        match event_type {
            WebhookEventType::CheckoutSessionCompleted => {
                let session: RawCheckoutSession = from_object(object)?;
                self.checkout_completed(session, created)
            }
            WebhookEventType::CustomerSubscriptionUpdated => {
                let sub: RawSubscription = from_object(object)?;
                let period = sub.period()?;
                Ok(BillingEventKind::SubscriptionUpdated {
                    status: map_provider_status(&sub.status),
                    external_subscription_id: sub.id,
                    period,
                })
            }
            WebhookEventType::CustomerSubscriptionDeleted => {
                let sub: RawSubscription = from_object(object)?;
                Ok(BillingEventKind::SubscriptionDeleted {
                    external_subscription_id: sub.id,
                })
            }
            WebhookEventType::InvoicePaid => {
                let invoice: RawInvoice = from_object(object)?;
                Ok(BillingEventKind::InvoicePaymentSucceeded {
                    external_subscription_id: invoice.subscription_id(),
                })
            }
            WebhookEventType::InvoicePaymentFailed => {
                let invoice: RawInvoice = from_object(object)?;
                Ok(BillingEventKind::InvoicePaymentFailed {
                    external_subscription_id: invoice.subscription_id(),
                })
            }
            WebhookEventType::Unknown(event_type) => {
                info!(event_type = %event_type, "Received unhandled webhook event type");
                Ok(BillingEventKind::Ignored {
                    event_type: event_type.clone(),
                })
            }
        }
    }

    fn checkout_completed(
        &self,
        session: RawCheckoutSession,
        created: DateTime<Utc>,
    ) -> Result<BillingEventKind, BillingError> {
        let Some(subscription) = session.subscription else {
            // One-off payments complete a checkout without a subscription
            info!(session_id = %session.id, "Checkout without subscription, ignoring");
            return Ok(BillingEventKind::Ignored {
                event_type: "checkout.session.completed".to_string(),
            });
        };

        let metadata = session.metadata.unwrap_or_default();
        let subscriber_id = metadata_id(&metadata, "subscriber_id").map(UserId)?;
        let creator_id = metadata_id(&metadata, "creator_id").map(CreatorId)?;
        let tier_id = metadata_id(&metadata, "tier_id").map(TierId)?;

        let (external_subscription_id, period) = match subscription {
            RawSubscriptionRef::Id(id) => (id, None),
            RawSubscriptionRef::Expanded(sub) => {
                let period = sub.period().ok();
                (sub.id, period)
            }
        };

        let period = match period {
            Some(period) => period,
            None => {
                let length = chrono::Duration::from_std(self.default_period)
                    .map_err(|e| BillingError::Internal(e.to_string()))?;
                let end = created.checked_add_signed(length).ok_or_else(|| {
                    BillingError::Internal("default billing period out of range".to_string())
                })?;
                BillingPeriod {
                    start: created,
                    end,
                }
            }
        };

        Ok(BillingEventKind::CheckoutCompleted(CheckoutCompleted {
            subscriber_id,
            creator_id,
            tier_id,
            external_subscription_id,
            period,
        }))
    }
}

impl std::fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookHandler")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used by integration tests and local tooling that replays events.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let handler = WebhookHandler::new(secret, Duration::ZERO, Duration::ZERO);
    let signature = handler
        .compute_signature(&timestamp.to_string(), payload)
        .unwrap_or_default();
    format!("t={timestamp},v1={signature}")
}

fn from_object<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> Result<T, BillingError> {
    serde_json::from_value(object).map_err(|e| BillingError::MalformedEvent(e.to_string()))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, BillingError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| BillingError::MalformedEvent(format!("timestamp out of range: {secs}")))
}

fn metadata_id(
    metadata: &std::collections::HashMap<String, String>,
    key: &str,
) -> Result<uuid::Uuid, BillingError> {
    let value = metadata
        .get(key)
        .ok_or_else(|| BillingError::MalformedEvent(format!("checkout metadata missing {key}")))?;
    uuid::Uuid::parse_str(value.trim())
        .map_err(|_| BillingError::MalformedEvent(format!("checkout metadata {key} is not a UUID")))
}

// Raw Stripe shapes

#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    subscription: Option<RawSubscriptionRef>,
    metadata: Option<std::collections::HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubscriptionRef {
    Id(String),
    Expanded(RawSubscription),
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    status: String,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    #[serde(default)]
    items: Option<RawList<RawSubscriptionItem>>,
}

impl RawSubscription {
    /// Period from the subscription, or from its first item on API
    /// versions that moved the window there
    fn period(&self) -> Result<BillingPeriod, BillingError> {
        let item = self.items.as_ref().and_then(|items| items.data.first());
        let start = self
            .current_period_start
            .or_else(|| item.and_then(|i| i.current_period_start));
        let end = self
            .current_period_end
            .or_else(|| item.and_then(|i| i.current_period_end));

        match (start, end) {
            (Some(start), Some(end)) => Ok(BillingPeriod {
                start: timestamp(start)?,
                end: timestamp(end)?,
            }),
            _ => Err(BillingError::MalformedEvent(format!(
                "subscription {} has no current period",
                self.id
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionItem {
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    subscription: Option<RawSubscriptionRef>,
    parent: Option<RawInvoiceParent>,
}

impl RawInvoice {
    fn subscription_id(self) -> Option<String> {
        match self.subscription {
            Some(RawSubscriptionRef::Id(id)) => Some(id),
            Some(RawSubscriptionRef::Expanded(sub)) => Some(sub.id),
            None => self
                .parent
                .and_then(|p| p.subscription_details)
                .and_then(|d| d.subscription),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInvoiceParent {
    subscription_details: Option<RawSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionDetails {
    subscription: Option<String>,
}
