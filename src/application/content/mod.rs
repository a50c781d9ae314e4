//! Cache-consistent access to blog content.
//!
//! Reads consult the [`TtlCache`](crate::cache::TtlCache) before the
//! repositories; every successful write invalidates the affected keys before
//! returning to its caller.

mod commands;
mod counters;
mod queries;
mod service;
pub mod types;

pub use service::ContentStore;
pub use types::{CachedContent, ContentCache, ContentError};
