use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join;
use metrics::histogram;
use tracing::debug;

use crate::application::pagination::{Page, PageRequest, PostPage};
use crate::application::repos::PostFilter;
use crate::cache::ContentKey;
use crate::domain::entities::PostRecord;

use super::service::{ContentStore, TARGET};
use super::types::{CachedContent, ContentError};

pub(crate) const METRIC_PAGE_FETCH_MS: &str = "plume_content_page_fetch_ms";

impl ContentStore {
    pub async fn fetch_by_id(&self, id: i64) -> Result<Arc<PostRecord>, ContentError> {
        let key = ContentKey::Post(id).render();
        if let Some(CachedContent::Post(post)) = self.cache.get(&key) {
            return Ok(post);
        }

        let generation = self.cache.generation();
        let post = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ContentError::from_repo("fetch post", "post", err))?
            .ok_or_else(ContentError::post_not_found)?;

        let post = Arc::new(post);
        self.cache.set_if_generation(
            generation,
            key,
            CachedContent::Post(Arc::clone(&post)),
            self.config.post_ttl(),
        );
        Ok(post)
    }

    pub async fn fetch_all(&self) -> Result<Arc<Vec<PostRecord>>, ContentError> {
        let key = ContentKey::All.render();
        if let Some(CachedContent::List(posts)) = self.cache.get(&key) {
            return Ok(posts);
        }

        let generation = self.cache.generation();
        let posts = self
            .reader
            .list_all_posts()
            .await
            .map_err(|err| ContentError::from_repo("list posts", "post", err))?;

        let posts = Arc::new(posts);
        self.cache.set_if_generation(
            generation,
            key,
            CachedContent::List(Arc::clone(&posts)),
            self.config.list_ttl(),
        );
        Ok(posts)
    }

    /// Total count and page slice are read concurrently; dropping the
    /// returned future cancels both.
    pub async fn fetch_page(&self, request: PageRequest) -> Result<Arc<PostPage>, ContentError> {
        let key = ContentKey::Page {
            page: request.page(),
            size: request.size(),
        }
        .render();
        if let Some(CachedContent::Page(page)) = self.cache.get(&key) {
            return Ok(page);
        }

        let generation = self.cache.generation();
        let started_at = Instant::now();
        let (total, items) = try_join(
            self.reader.count_posts(),
            self.reader.list_posts(request.size(), request.offset()),
        )
        .await
        .map_err(|err| ContentError::from_repo("fetch post page", "post", err))?;
        histogram!(METRIC_PAGE_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let page = Arc::new(Page::new(items, total, request));
        self.cache.set_if_generation(
            generation,
            key,
            CachedContent::Page(Arc::clone(&page)),
            self.config.page_ttl(),
        );
        Ok(page)
    }

    /// Never cached. A blank query returns an empty page without touching
    /// the backend; otherwise the match count and slice are read together.
    pub async fn search(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<PostPage, ContentError> {
        let query = query.trim();
        if query.is_empty() {
            debug!(target: TARGET, "Blank search query, skipping backend");
            return Ok(Page::empty(request));
        }

        let (total, items) = try_join(
            self.reader.count_search(query),
            self.reader.search_posts(query, request.size(), request.offset()),
        )
        .await
        .map_err(|err| ContentError::from_repo("search posts", "post", err))?;

        Ok(Page::new(items, total, request))
    }

    pub async fn fetch_by_filter(&self, filter: PostFilter) -> Result<Vec<PostRecord>, ContentError> {
        let filter = filter.normalized();
        self.reader
            .list_filtered(&filter)
            .await
            .map_err(|err| ContentError::from_repo("filter posts", "post", err))
    }

    /// Owner of a post, served from a cached copy when one is live.
    pub async fn find_owner(&self, id: i64) -> Result<Option<i64>, ContentError> {
        if let Some(CachedContent::Post(post)) = self.cache.get(&ContentKey::Post(id).render()) {
            return Ok(Some(post.owner_id));
        }

        self.reader
            .find_owner(id)
            .await
            .map_err(|err| ContentError::from_repo("look up post owner", "post", err))
    }
}
