//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Popularity, PostRecord, TagRecord};
use crate::domain::posts::{NewPost, PostPatch};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub const DEFAULT_FILTER_LIMIT: u32 = 10;
pub const MAX_FILTER_LIMIT: u32 = 100;

/// Ad-hoc listing predicate; results are newest first and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub title_contains: Option<String>,
    pub owner_id: Option<i64>,
    pub limit: u32,
    pub offset: u64,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            title_contains: None,
            owner_id: None,
            limit: DEFAULT_FILTER_LIMIT,
            offset: 0,
        }
    }
}

impl PostFilter {
    /// Blank title fragments are dropped and the limit is clamped to
    /// `1..=MAX_FILTER_LIMIT`.
    pub fn normalized(mut self) -> Self {
        self.title_contains = self
            .title_contains
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty());
        self.limit = match self.limit {
            0 => DEFAULT_FILTER_LIMIT,
            limit => limit.min(MAX_FILTER_LIMIT),
        };
        self
    }
}

/// Outcome of a floor-guarded like decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDecrement {
    Applied,
    AlreadyZero,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    async fn find_owner(&self, id: i64) -> Result<Option<i64>, RepoError>;

    async fn count_posts(&self) -> Result<u64, RepoError>;

    /// Newest first.
    async fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_all_posts(&self) -> Result<Vec<PostRecord>, RepoError>;

    /// Number of posts [`PostsRepo::search_posts`] would match without a window.
    async fn count_search(&self, query: &str) -> Result<u64, RepoError>;

    /// Case-insensitive substring match over title and content, newest first.
    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_filtered(&self, filter: &PostFilter) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Inserts the post, upserts its tags and links them in one transaction.
    async fn create_post(&self, post: &NewPost) -> Result<PostRecord, RepoError>;

    /// Applies to the row matching both `id` and `owner_id`; otherwise
    /// `RepoError::NotFound`.
    async fn update_owned(
        &self,
        id: i64,
        owner_id: i64,
        patch: &PostPatch,
    ) -> Result<PostRecord, RepoError>;

    async fn delete_owned(&self, id: i64, owner_id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Atomic upsert by unique name.
    async fn find_or_create(&self, name: &str) -> Result<TagRecord, RepoError>;

    /// Idempotent; `RepoError::NotFound` if either side does not exist.
    async fn link(&self, post_id: i64, tag_id: i64) -> Result<(), RepoError>;
}

/// Single-statement counter updates. A missing post is `RepoError::NotFound`.
#[async_trait]
pub trait CountersRepo: Send + Sync {
    async fn increment_views(&self, id: i64) -> Result<(), RepoError>;

    async fn increment_likes(&self, id: i64) -> Result<(), RepoError>;

    async fn decrement_likes(&self, id: i64) -> Result<LikeDecrement, RepoError>;

    async fn popularity(&self, id: i64) -> Result<Option<Popularity>, RepoError>;
}
