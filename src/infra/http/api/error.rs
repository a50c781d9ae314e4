use std::error::Error as StdError;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::assistant::AssistantError;
use crate::application::auth::AuthError;
use crate::application::content::ContentError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const BACKEND_UNAVAILABLE: &str = "backend_unavailable";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    /// Keeps the full source chain of `error` for the response logger.
    fn with_source(mut self, source: &'static str, error: &dyn StdError) -> Self {
        self.report = Some(ErrorReport::from_error(source, self.status, error));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn unauthenticated(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHENTICATED,
            "Valid bearer credential required",
            hint,
        )
    }

    pub fn forbidden(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "Operation not permitted",
            hint,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn validation(hint: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION_FAILED,
            "Request validation failed",
            Some(hint.into()),
        )
    }

    pub fn backend_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::BACKEND_UNAVAILABLE,
            "Service temporarily unavailable",
            None,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http::api",
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        const SOURCE: &str = "infra::http::api::content";
        let api = match &err {
            ContentError::NotFound { entity } => {
                let mut api = Self::not_found("Resource not found");
                api.hint = Some(format!("{entity} not found"));
                api
            }
            ContentError::Validation(message) => Self::validation(message.clone()),
            ContentError::Conflict(message) => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Request conflicts with current state",
                Some(message.clone()),
            ),
            ContentError::Backend {
                source: RepoError::Integrity { message },
                ..
            } => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Request conflicts with current state",
                Some(message.clone()),
            ),
            ContentError::Backend { .. } => Self::backend_unavailable(),
        };
        api.with_source(SOURCE, &err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        const SOURCE: &str = "infra::http::api::auth";
        match err {
            AuthError::Unauthenticated(reason) => {
                Self::unauthenticated(Some(reason.to_string())).with_source(SOURCE, &reason)
            }
            AuthError::Forbidden(reason) => Self::forbidden(Some(reason.to_string())),
            AuthError::NotFound => Self::not_found("Resource not found"),
            AuthError::Backend(inner) => Self::from(inner),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        const SOURCE: &str = "infra::http::api::assistant";
        let api = match &err {
            AssistantError::InvalidInput(reason) => Self::validation(*reason),
            AssistantError::NotConfigured => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::BACKEND_UNAVAILABLE,
                "Writing assistant is not configured",
                None,
            ),
            AssistantError::Upstream { .. }
            | AssistantError::EmptyResponse
            | AssistantError::Transport(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM_ERROR,
                "Text generation service failed",
                None,
            ),
        };
        api.with_source(SOURCE, &err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } | DomainError::Invariant { message } => {
                Self::validation(message)
            }
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(format!("invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("invalid query string: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::TokenError;

    #[test]
    fn content_errors_map_to_stable_codes() {
        let cases = [
            (ContentError::post_not_found(), StatusCode::NOT_FOUND, codes::NOT_FOUND),
            (
                ContentError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
                codes::VALIDATION_FAILED,
            ),
            (
                ContentError::Conflict("dup".into()),
                StatusCode::CONFLICT,
                codes::CONFLICT,
            ),
            (
                ContentError::Backend {
                    operation: "fetch post",
                    source: RepoError::Timeout,
                },
                StatusCode::SERVICE_UNAVAILABLE,
                codes::BACKEND_UNAVAILABLE,
            ),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn auth_errors_map_to_401_403_404() {
        assert_eq!(
            ApiError::from(AuthError::Unauthenticated(TokenError::Expired)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Forbidden("nope")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn backend_report_keeps_source_chain() {
        let response = ApiError::from(ContentError::Backend {
            operation: "count posts",
            source: RepoError::Persistence("pool closed".into()),
        })
        .into_response();

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("error report attached");
        assert_eq!(
            report.messages,
            ["count posts failed", "persistence error: pool closed"]
        );
    }
}
