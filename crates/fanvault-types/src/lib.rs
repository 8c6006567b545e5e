//! Fanvault Types - Shared domain types
//!
//! This crate contains domain types used across fanvault crates:
//! - Identifiers for subscribers, creators, tiers and content
//! - Creators and the tier offerings they sell
//! - The tier hierarchy (the single place tier ordering is defined)
//! - Subscription records and their lifecycle status
//! - Content items and entitlement decisions

pub mod content;
pub mod creator;
pub mod entitlement;
pub mod error;
pub mod ids;
pub mod subscription;
pub mod tier;

pub use content::*;
pub use creator::*;
pub use entitlement::*;
pub use error::*;
pub use ids::*;
pub use subscription::*;
pub use tier::*;
