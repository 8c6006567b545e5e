//! Billing configuration

use std::time::Duration;

/// Billing event processing configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Maximum age of a signed webhook timestamp
    pub signature_tolerance: Duration,
    /// Number of event ids kept in the in-process duplicate filter
    pub dedup_capacity: u64,
    /// How long an event id is remembered as processed
    pub dedup_retention: Duration,
    /// Period length assumed when a checkout carries no period window
    pub default_period: Duration,
}

impl BillingConfig {
    /// Create a new billing config
    pub fn new(stripe_webhook_secret: impl Into<String>) -> Self {
        Self {
            stripe_webhook_secret: stripe_webhook_secret.into(),
            signature_tolerance: Duration::from_secs(300),
            dedup_capacity: 10_000,
            dedup_retention: Duration::from_secs(24 * 60 * 60), // 24 hours
            default_period: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
        }
    }

    /// Set webhook timestamp tolerance
    pub fn with_signature_tolerance(mut self, tolerance: Duration) -> Self {
        self.signature_tolerance = tolerance;
        self
    }

    /// Set duplicate filter bounds
    pub fn with_dedup(mut self, capacity: u64, retention: Duration) -> Self {
        self.dedup_capacity = capacity;
        self.dedup_retention = retention;
        self
    }

    /// Set the fallback period length in days
    pub fn with_default_period_days(mut self, days: u64) -> Self {
        self.default_period = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
        self
    }
}
