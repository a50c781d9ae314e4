//! Authorization stages as route layers.
//!
//! Routes compose them outermost first: `authenticate` attaches the
//! [`Principal`]; the later stages read it and never run when it is absent.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::application::auth::AccessGuard;
use crate::domain::types::{Principal, Role};

use super::error::ApiError;
use super::extract::ApiPath;
use super::state::ApiState;

pub async fn authenticate(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let principal = match state.guard.authenticate(header) {
        Ok(principal) => principal,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(principal);
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    let Some(principal) = principal_of(&request) else {
        return missing_principal("require_admin");
    };
    if let Err(err) = AccessGuard::require_role(&principal, Role::Admin) {
        return ApiError::from(err).into_response();
    }
    next.run(request).await
}

pub async fn require_ownership(
    State(state): State<ApiState>,
    ApiPath(post_id): ApiPath<i64>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) = principal_of(&request) else {
        return missing_principal("require_ownership");
    };
    if let Err(err) = state.guard.require_ownership(&principal, post_id).await {
        return ApiError::from(err).into_response();
    }
    next.run(request).await
}

pub async fn require_self(
    ApiPath(user_id): ApiPath<i64>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) = principal_of(&request) else {
        return missing_principal("require_self");
    };
    if let Err(err) = AccessGuard::require_self(&principal, user_id) {
        return ApiError::from(err).into_response();
    }
    next.run(request).await
}

fn principal_of(request: &Request<Body>) -> Option<Principal> {
    request.extensions().get::<Principal>().copied()
}

fn missing_principal(stage: &'static str) -> Response {
    warn!(
        target: "plume::auth",
        stage,
        "Authorization stage ran without an authenticated principal"
    );
    ApiError::unauthenticated(None).into_response()
}
