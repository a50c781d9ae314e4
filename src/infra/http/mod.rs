pub mod api;
mod middleware;

pub use api::{ApiState, HealthProbe, build_api_router};
pub use middleware::RequestContext;

use axum::{Router, middleware as axum_middleware};

/// The full application router with request-id and response logging layers.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
