use std::sync::Arc;

use tracing::debug;

use crate::application::repos::{CountersRepo, PostsRepo, PostsWriteRepo, TagsRepo};
use crate::cache::{CacheConfig, ContentKey, POST_LISTS_PREFIX};

use super::types::ContentCache;

pub(super) const TARGET: &str = "plume::content";

#[derive(Clone)]
pub struct ContentStore {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) tags: Arc<dyn TagsRepo>,
    pub(crate) counters: Arc<dyn CountersRepo>,
    pub(crate) cache: Arc<ContentCache>,
    pub(crate) config: CacheConfig,
}

impl ContentStore {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        tags: Arc<dyn TagsRepo>,
        counters: Arc<dyn CountersRepo>,
        cache: Arc<ContentCache>,
        config: CacheConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            tags,
            counters,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Drops every cached entry. Returns how many were removed.
    pub fn purge_cache(&self) -> usize {
        let removed = self.cache.clear();
        debug!(target: TARGET, removed, "Purged content cache");
        removed
    }

    /// Invalidates the single-post entry and every collection entry.
    pub(super) fn invalidate_post(&self, id: i64) {
        self.cache.delete(&ContentKey::Post(id).render());
        self.invalidate_lists();
    }

    pub(super) fn invalidate_lists(&self) {
        self.cache.invalidate_prefix(POST_LISTS_PREFIX);
    }
}
