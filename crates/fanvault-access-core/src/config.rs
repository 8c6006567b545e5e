//! Configuration types for content access

use std::time::Duration;

/// Content access configuration
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Base URL media references are signed against (e.g., https://media.example.com)
    pub media_base_url: String,
    /// HMAC secret shared with the media edge, at least 32 bytes
    pub media_signing_secret: String,
    /// Lifetime of a signed media reference
    pub media_url_ttl: Duration,
    /// Window in which repeat views by one user count once
    pub view_dedup_window: Duration,
    /// Upper bound on remembered (user, content) views
    pub view_dedup_capacity: u64,
    /// Largest page a feed request may ask for
    pub max_page_size: u32,
}

impl AccessConfig {
    /// Create a new access config
    pub fn new(media_base_url: impl Into<String>, media_signing_secret: impl Into<String>) -> Self {
        Self {
            media_base_url: media_base_url.into(),
            media_signing_secret: media_signing_secret.into(),
            media_url_ttl: Duration::from_secs(60 * 60),    // 1 hour
            view_dedup_window: Duration::from_secs(5 * 60), // 5 minutes
            view_dedup_capacity: 100_000,
            max_page_size: 100,
        }
    }

    /// Set signed media reference lifetime
    pub fn with_media_url_ttl(mut self, ttl: Duration) -> Self {
        self.media_url_ttl = ttl;
        self
    }

    /// Set duplicate-view suppression window
    pub fn with_view_dedup_window(mut self, window: Duration) -> Self {
        self.view_dedup_window = window;
        self
    }

    /// Set duplicate-view memory bound
    pub fn with_view_dedup_capacity(mut self, capacity: u64) -> Self {
        self.view_dedup_capacity = capacity;
        self
    }

    /// Set maximum page size
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }
}
