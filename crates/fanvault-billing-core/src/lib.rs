//! Fanvault Billing Core - Billing event processing
//!
//! Verifies Stripe webhook deliveries, normalizes them into billing events,
//! and applies those events to the subscription record store exactly once
//! per event id.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanvault_billing_core::{BillingConfig, BillingEventProcessor};
//! use fanvault_db::Repositories;
//!
//! let config = BillingConfig::new("whsec_...").with_default_period_days(30);
//! let processor = BillingEventProcessor::new(config, &repos);
//!
//! // In the webhook route
//! let outcome = processor.handle_webhook(&body, signature_header).await?;
//! ```

pub mod config;
pub mod error;
pub mod processor;
pub mod webhook;

pub use config::BillingConfig;
pub use error::BillingError;
pub use processor::{BillingEventProcessor, ProcessOutcome};
pub use webhook::{
    map_provider_status, signature_header, BillingEvent, BillingEventKind, BillingPeriod,
    CheckoutCompleted, WebhookEventType, WebhookHandler,
};
