//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use plume::application::assistant::{AssistantError, AssistantService, TextGenerator};
use plume::application::auth::{AccessGuard, OwnerLookup, TokenIssuer, TokenValidator};
use plume::application::content::{ContentCache, ContentStore};
use plume::application::repos::{
    CountersRepo, LikeDecrement, PostFilter, PostsRepo, PostsWriteRepo, RepoError, TagsRepo,
};
use plume::cache::CacheConfig;
use plume::domain::entities::{Popularity, PostRecord, TagRecord};
use plume::domain::posts::{NewPost, PostPatch};
use plume::domain::types::{Principal, Role};
use plume::infra::http::{ApiState, HealthProbe};

pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

/// Backend call counters, one per read path the cache sits in front of.
#[derive(Default)]
pub struct Calls {
    pub find_by_id: AtomicUsize,
    pub find_owner: AtomicUsize,
    pub count_posts: AtomicUsize,
    pub list_posts: AtomicUsize,
    pub list_all: AtomicUsize,
    pub count_search: AtomicUsize,
    pub search: AtomicUsize,
    pub filter: AtomicUsize,
    pub update: AtomicUsize,
    pub delete: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct State {
    posts: BTreeMap<i64, PostRecord>,
    tags: Vec<TagRecord>,
    links: BTreeSet<(i64, i64)>,
    next_post_id: i64,
    next_tag_id: i64,
}

impl State {
    fn with_tags(&self, post: &PostRecord) -> PostRecord {
        let mut post = post.clone();
        post.tags = self
            .links
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .filter_map(|(_, tag_id)| self.tags.iter().find(|tag| tag.id == *tag_id).cloned())
            .collect();
        post
    }

    fn newest_first(&self) -> Vec<PostRecord> {
        self.posts
            .values()
            .rev()
            .map(|post| self.with_tags(post))
            .collect()
    }

    fn tag_named(&mut self, name: &str) -> TagRecord {
        if let Some(tag) = self.tags.iter().find(|tag| tag.name == name) {
            return tag.clone();
        }
        self.next_tag_id += 1;
        let tag = TagRecord {
            id: self.next_tag_id,
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }
}

/// Which half of a paged read should report a backend timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingRead {
    Count,
    Slice,
}

/// Implements every repository trait over a single mutex-guarded state.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<State>,
    pub calls: Calls,
    read_delay: Option<Duration>,
    failing: Mutex<Option<FailingRead>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every count and slice read sleeps for `delay` on the tokio clock.
    pub fn with_read_delay(delay: Duration) -> Self {
        Self {
            read_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed(&self, title: &str, owner_id: i64) -> i64 {
        let mut state = self.state.lock().expect("state lock");
        state.next_post_id += 1;
        let id = state.next_post_id;
        let now = OffsetDateTime::now_utc();
        state.posts.insert(
            id,
            PostRecord {
                id,
                title: title.to_string(),
                content: format!("{title} body"),
                owner_id,
                view_count: 0,
                like_count: 0,
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn snapshot(&self, id: i64) -> Option<PostRecord> {
        let state = self.state.lock().expect("state lock");
        state.posts.get(&id).map(|post| state.with_tags(post))
    }

    /// Mutates the stored row without going through the store, as another
    /// process writing to the database would.
    pub fn rename_behind_cache(&self, id: i64, title: &str) {
        let mut state = self.state.lock().expect("state lock");
        if let Some(post) = state.posts.get_mut(&id) {
            post.title = title.to_string();
        }
    }

    /// Count or slice reads fail with `RepoError::Timeout` until cleared.
    pub fn fail_reads(&self, read: Option<FailingRead>) {
        *self.failing.lock().expect("failing lock") = read;
    }

    async fn pause(&self) {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, read: FailingRead) -> Result<(), RepoError> {
        if *self.failing.lock().expect("failing lock") == Some(read) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    fn matching(&self, query: &str) -> Vec<PostRecord> {
        let needle = query.to_lowercase();
        self.state
            .lock()
            .expect("state lock")
            .newest_first()
            .into_iter()
            .filter(|post| {
                post.title.to_lowercase().contains(&needle)
                    || post.content.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[async_trait]
impl PostsRepo for MemoryRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        self.calls.find_by_id.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("state lock");
        Ok(state.posts.get(&id).map(|post| state.with_tags(post)))
    }

    async fn find_owner(&self, id: i64) -> Result<Option<i64>, RepoError> {
        self.calls.find_owner.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("state lock");
        Ok(state.posts.get(&id).map(|post| post.owner_id))
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        self.calls.count_posts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check(FailingRead::Count)?;
        let state = self.state.lock().expect("state lock");
        Ok(state.posts.len() as u64)
    }

    async fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError> {
        self.calls.list_posts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check(FailingRead::Slice)?;
        let state = self.state.lock().expect("state lock");
        Ok(state
            .newest_first()
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_all_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.calls.list_all.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().expect("state lock").newest_first())
    }

    async fn count_search(&self, query: &str) -> Result<u64, RepoError> {
        self.calls.count_search.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check(FailingRead::Count)?;
        Ok(self.matching(query).len() as u64)
    }

    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check(FailingRead::Slice)?;
        Ok(self
            .matching(query)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_filtered(&self, filter: &PostFilter) -> Result<Vec<PostRecord>, RepoError> {
        self.calls.filter.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("state lock");
        let title = filter.title_contains.as_ref().map(|t| t.to_lowercase());
        Ok(state
            .newest_first()
            .into_iter()
            .filter(|post| filter.owner_id.is_none_or(|owner| post.owner_id == owner))
            .filter(|post| {
                title
                    .as_ref()
                    .is_none_or(|needle| post.title.to_lowercase().contains(needle))
            })
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepo {
    async fn create_post(&self, post: &NewPost) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        state.next_post_id += 1;
        let id = state.next_post_id;
        let now = OffsetDateTime::now_utc();
        state.posts.insert(
            id,
            PostRecord {
                id,
                title: post.title().to_string(),
                content: post.content().to_string(),
                owner_id: post.owner_id(),
                view_count: 0,
                like_count: 0,
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
        );
        for name in post.tags() {
            let tag = state.tag_named(name);
            state.links.insert((id, tag.id));
        }
        let stored = &state.posts[&id];
        Ok(state.with_tags(stored))
    }

    async fn update_owned(
        &self,
        id: i64,
        owner_id: i64,
        patch: &PostPatch,
    ) -> Result<PostRecord, RepoError> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().expect("state lock");
        let post = state
            .posts
            .get_mut(&id)
            .filter(|post| post.owner_id == owner_id)
            .ok_or(RepoError::NotFound)?;
        if let Some(title) = patch.title() {
            post.title = title.to_string();
        }
        if let Some(content) = patch.content() {
            post.content = content.to_string();
        }
        post.updated_at = OffsetDateTime::now_utc();
        let updated = post.clone();
        Ok(state.with_tags(&updated))
    }

    async fn delete_owned(&self, id: i64, owner_id: i64) -> Result<(), RepoError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().expect("state lock");
        match state.posts.get(&id) {
            Some(post) if post.owner_id == owner_id => {
                state.posts.remove(&id);
                state.links.retain(|(post_id, _)| *post_id != id);
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl TagsRepo for MemoryRepo {
    async fn find_or_create(&self, name: &str) -> Result<TagRecord, RepoError> {
        Ok(self.state.lock().expect("state lock").tag_named(name))
    }

    async fn link(&self, post_id: i64, tag_id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().expect("state lock");
        if !state.posts.contains_key(&post_id) || !state.tags.iter().any(|t| t.id == tag_id) {
            return Err(RepoError::NotFound);
        }
        state.links.insert((post_id, tag_id));
        Ok(())
    }
}

#[async_trait]
impl CountersRepo for MemoryRepo {
    async fn increment_views(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.view_count += 1;
        Ok(())
    }

    async fn increment_likes(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.like_count += 1;
        Ok(())
    }

    async fn decrement_likes(&self, id: i64) -> Result<LikeDecrement, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        if post.like_count == 0 {
            return Ok(LikeDecrement::AlreadyZero);
        }
        post.like_count -= 1;
        Ok(LikeDecrement::Applied)
    }

    async fn popularity(&self, id: i64) -> Result<Option<Popularity>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state.posts.get(&id).map(|post| Popularity {
            view_count: post.view_count,
            like_count: post.like_count,
        }))
    }
}

pub fn content_store(repo: &Arc<MemoryRepo>) -> ContentStore {
    content_store_with(repo, CacheConfig::default())
}

pub fn content_store_with(repo: &Arc<MemoryRepo>, config: CacheConfig) -> ContentStore {
    ContentStore::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        Arc::new(ContentCache::new(config.enabled)),
        config,
    )
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

pub struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AssistantError> {
        Ok(format!("echo: {prompt}"))
    }
}

pub fn api_state(repo: &Arc<MemoryRepo>) -> ApiState {
    let content = Arc::new(content_store(repo));
    let owners: Arc<dyn OwnerLookup> = content.clone();
    ApiState {
        guard: Arc::new(AccessGuard::new(TokenValidator::new(SECRET), owners)),
        content,
        assistant: Arc::new(AssistantService::new(Arc::new(EchoGenerator))),
        health: Arc::new(AlwaysHealthy),
    }
}

pub fn bearer(subject_id: i64, role: Role) -> String {
    let issuer = TokenIssuer::new(SECRET, time::Duration::minutes(15));
    let token = issuer
        .issue(Principal::new(subject_id, role))
        .expect("issue token");
    format!("Bearer {token}")
}

pub fn expired_bearer(subject_id: i64) -> String {
    let issuer = TokenIssuer::new(SECRET, time::Duration::minutes(15));
    let token = issuer
        .issue_with_ttl(Principal::new(subject_id, Role::User), time::Duration::minutes(-5))
        .expect("issue token");
    format!("Bearer {token}")
}
