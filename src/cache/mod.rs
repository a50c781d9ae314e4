//! In-process read-through cache.
//!
//! - [`TtlCache`]: string-keyed entries with optional per-entry expiry,
//!   lazy eviction on lookup and generation-checked population.
//! - [`ContentKey`]: the key shapes used for blog content.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! post_ttl_seconds = 300
//! page_ttl_seconds = 60
//! list_ttl_seconds = 120
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{ContentKey, POST_LISTS_PREFIX};
pub use store::TtlCache;
