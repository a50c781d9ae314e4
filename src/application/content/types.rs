use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::PostPage;
use crate::application::repos::RepoError;
use crate::cache::TtlCache;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{operation} failed")]
    Backend {
        operation: &'static str,
        #[source]
        source: RepoError,
    },
}

impl ContentError {
    pub fn post_not_found() -> Self {
        Self::NotFound { entity: "post" }
    }

    /// Maps a repository failure, keeping the operation that triggered it.
    pub(crate) fn from_repo(operation: &'static str, entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound { entity },
            RepoError::Duplicate { constraint } => {
                Self::Conflict(format!("{entity} violates `{constraint}`"))
            }
            RepoError::InvalidInput { message } => Self::Validation(message),
            source => Self::Backend { operation, source },
        }
    }
}

impl From<DomainError> for ContentError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } | DomainError::Invariant { message } => {
                Self::Validation(message)
            }
        }
    }
}

/// Values stored in the content cache, shared without copying on hits.
#[derive(Debug, Clone)]
pub enum CachedContent {
    Post(Arc<PostRecord>),
    Page(Arc<PostPage>),
    List(Arc<Vec<PostRecord>>),
}

pub type ContentCache = TtlCache<CachedContent>;
