//! Cache configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_POST_TTL_SECONDS: u64 = 300;
const DEFAULT_PAGE_TTL_SECONDS: u64 = 60;
const DEFAULT_LIST_TTL_SECONDS: u64 = 120;

/// Time-to-live settings per key shape. A zero TTL stores without expiry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to make every lookup a miss and every population a no-op.
    pub enabled: bool,
    /// Single post entries (`post:{id}`).
    pub post_ttl_seconds: u64,
    /// Paginated listing entries.
    pub page_ttl_seconds: u64,
    /// Full listing entry (`posts:all`).
    pub list_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            post_ttl_seconds: DEFAULT_POST_TTL_SECONDS,
            page_ttl_seconds: DEFAULT_PAGE_TTL_SECONDS,
            list_ttl_seconds: DEFAULT_LIST_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            post_ttl_seconds: settings.post_ttl_seconds,
            page_ttl_seconds: settings.page_ttl_seconds,
            list_ttl_seconds: settings.list_ttl_seconds,
        }
    }
}

impl CacheConfig {
    pub fn post_ttl(&self) -> Option<Duration> {
        ttl(self.post_ttl_seconds)
    }

    pub fn page_ttl(&self) -> Option<Duration> {
        ttl(self.page_ttl_seconds)
    }

    pub fn list_ttl(&self) -> Option<Duration> {
        ttl(self.list_ttl_seconds)
    }
}

fn ttl(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}
