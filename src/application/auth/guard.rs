use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use crate::application::content::{ContentError, ContentStore};
use crate::domain::types::{Principal, Role};

use super::token::{TokenError, TokenValidator};

const TARGET: &str = "plume::auth";
pub(crate) const METRIC_AUTH_DENIED: &str = "plume_auth_denied_total";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] TokenError),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("resource not found")]
    NotFound,
    #[error("authorization lookup failed")]
    Backend(#[source] ContentError),
}

/// Resolves the owner of a post for the ownership stage.
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    async fn owner_of(&self, post_id: i64) -> Result<Option<i64>, ContentError>;
}

#[async_trait]
impl OwnerLookup for ContentStore {
    async fn owner_of(&self, post_id: i64) -> Result<Option<i64>, ContentError> {
        self.find_owner(post_id).await
    }
}

/// The authorization stages. Each one either allows the request to continue
/// or halts it with an [`AuthError`]; none depends on another's side effects.
#[derive(Clone)]
pub struct AccessGuard {
    validator: TokenValidator,
    owners: Arc<dyn OwnerLookup>,
}

impl AccessGuard {
    pub fn new(validator: TokenValidator, owners: Arc<dyn OwnerLookup>) -> Self {
        Self { validator, owners }
    }

    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        self.validator.validate_header(header).map_err(|err| {
            deny("authenticate", &err);
            AuthError::Unauthenticated(err)
        })
    }

    pub fn require_role(principal: &Principal, role: Role) -> Result<(), AuthError> {
        if principal.role == role {
            return Ok(());
        }
        let err = AuthError::Forbidden("role not permitted");
        deny("require_role", &err);
        debug!(
            target: TARGET,
            subject_id = principal.subject_id,
            role = %principal.role,
            required = %role,
            "Role check failed"
        );
        Err(err)
    }

    pub async fn require_ownership(
        &self,
        principal: &Principal,
        post_id: i64,
    ) -> Result<(), AuthError> {
        let owner = self
            .owners
            .owner_of(post_id)
            .await
            .map_err(|err| match err {
                ContentError::NotFound { .. } => AuthError::NotFound,
                other => AuthError::Backend(other),
            })?;

        match owner {
            None => {
                deny("require_ownership", &AuthError::NotFound);
                Err(AuthError::NotFound)
            }
            Some(owner_id) if owner_id != principal.subject_id => {
                let err = AuthError::Forbidden("post belongs to another user");
                deny("require_ownership", &err);
                Err(err)
            }
            Some(_) => Ok(()),
        }
    }

    pub fn require_self(principal: &Principal, path_id: i64) -> Result<(), AuthError> {
        if principal.subject_id == path_id {
            return Ok(());
        }
        let err = AuthError::Forbidden("account belongs to another user");
        deny("require_self", &err);
        Err(err)
    }
}

fn deny(stage: &'static str, reason: &dyn std::error::Error) {
    counter!(METRIC_AUTH_DENIED, "stage" => stage).increment(1);
    debug!(target: TARGET, stage, reason = %reason, "Authorization stage denied request");
}
