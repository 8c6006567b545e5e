//! PostgreSQL repository implementations

mod content;
mod creator;
mod processed_event;
mod subscription;
mod tier;

pub use content::PgContentRepository;
pub use creator::PgCreatorRepository;
pub use processed_event::PgProcessedEventRepository;
pub use subscription::PgSubscriptionRepository;
pub use tier::PgTierRepository;

use std::sync::Arc;

use crate::repo::{
    ContentRepository, CreatorRepository, ProcessedEventRepository, SubscriptionRepository,
    TierRepository,
};
use crate::DbPool;

/// All repositories bundled together behind their traits
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub tiers: Arc<dyn TierRepository>,
    pub creators: Arc<dyn CreatorRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub events: Arc<dyn ProcessedEventRepository>,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: Arc::new(PgSubscriptionRepository::new(pool.clone())),
            tiers: Arc::new(PgTierRepository::new(pool.clone())),
            creators: Arc::new(PgCreatorRepository::new(pool.clone())),
            content: Arc::new(PgContentRepository::new(pool.clone())),
            events: Arc::new(PgProcessedEventRepository::new(pool)),
        }
    }
}
