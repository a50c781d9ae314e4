pub mod error;
mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::{ApiState, HealthProbe};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

/// Public reads carry no stages; every other route lists its stages from the
/// outermost (`authenticate`) inwards.
pub fn build_api_router(state: ApiState) -> Router {
    let authenticate =
        || axum_middleware::from_fn_with_state(state.clone(), middleware::authenticate);
    let require_ownership =
        || axum_middleware::from_fn_with_state(state.clone(), middleware::require_ownership);
    let require_admin = || axum_middleware::from_fn(middleware::require_admin);
    let require_self = || axum_middleware::from_fn(middleware::require_self);

    Router::new()
        .route(
            "/api/v1/posts",
            get(handlers::list_posts).merge(post(handlers::create_post).route_layer(authenticate())),
        )
        .route("/api/v1/posts/all", get(handlers::list_all_posts))
        .route("/api/v1/posts/search", get(handlers::search_posts))
        .route(
            "/api/v1/posts/{id}",
            get(handlers::get_post).merge(
                patch(handlers::update_post)
                    .delete(handlers::delete_post)
                    .route_layer(require_ownership())
                    .route_layer(authenticate()),
            ),
        )
        .route("/api/v1/posts/{id}/views", post(handlers::record_view))
        .route("/api/v1/posts/{id}/popularity", get(handlers::get_popularity))
        .route(
            "/api/v1/posts/{id}/tags",
            post(handlers::attach_tag)
                .route_layer(require_ownership())
                .route_layer(authenticate()),
        )
        .route(
            "/api/v1/posts/{id}/likes",
            post(handlers::like_post)
                .delete(handlers::unlike_post)
                .route_layer(authenticate()),
        )
        .route(
            "/api/v1/users/{id}/posts",
            get(handlers::list_user_posts)
                .route_layer(require_self())
                .route_layer(authenticate()),
        )
        .route(
            "/api/v1/admin/posts",
            get(handlers::admin_list_posts)
                .route_layer(require_admin())
                .route_layer(authenticate()),
        )
        .route(
            "/api/v1/admin/cache/purge",
            post(handlers::admin_purge_cache)
                .route_layer(require_admin())
                .route_layer(authenticate()),
        )
        .route(
            "/api/v1/assistant/ideas",
            post(handlers::suggest_ideas).route_layer(authenticate()),
        )
        .route(
            "/api/v1/assistant/improvements",
            post(handlers::suggest_improvements).route_layer(authenticate()),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
}
