//! Application state for the platform API service.

use std::sync::Arc;

use fanvault_access_core::{AccessError, AccessService};
use fanvault_billing_core::BillingEventProcessor;
use fanvault_db::{DbPool, Repositories};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Feeds, entitlement, views
    pub access: Arc<AccessService>,
    /// Billing webhooks
    pub billing: Arc<BillingEventProcessor>,
    /// Database pool, absent when running on the in-memory store
    pub pool: Option<DbPool>,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services over one set of repositories
    pub fn new(
        config: Config,
        repos: &Repositories,
        pool: Option<DbPool>,
    ) -> Result<Self, AccessError> {
        let access = AccessService::new(
            config.access.clone(),
            Arc::clone(&repos.content),
            Arc::clone(&repos.subscriptions),
        )?;
        let billing = BillingEventProcessor::new(config.billing.clone(), repos);

        Ok(Self {
            access: Arc::new(access),
            billing: Arc::new(billing),
            pool,
            config: Arc::new(config),
        })
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
