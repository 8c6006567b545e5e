//! REST API handlers

pub mod content;
pub mod feed;
pub mod health;
pub mod shared;
pub mod subscriptions;
pub mod webhook;

pub use content::*;
pub use feed::*;
pub use health::*;
pub use subscriptions::*;
pub use webhook::*;
