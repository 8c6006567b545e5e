//! Fanvault Access Core - Content entitlement business logic
//!
//! Decides, per request, whether a viewer may see a content item, and
//! shapes feed responses accordingly: granted items carry a time-limited
//! signed media reference, denied items carry only the tier to upsell.

pub mod config;
pub mod crypto;
pub mod entitlement;
pub mod error;
pub mod media;
pub mod page;
pub mod service;
pub mod view;

pub use config::AccessConfig;
pub use crypto::{HmacKey, HmacKeyError};
pub use entitlement::{decide, EntitlementEvaluator, EvaluationScope};
pub use error::{AccessError, EvaluationError};
pub use media::MediaSigner;
pub use page::Page;
pub use service::{AccessService, ViewOutcome};
pub use view::ContentView;
