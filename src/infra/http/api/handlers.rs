use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::info;

use crate::application::error::ErrorReport;
use crate::application::pagination::PageRequest;
use crate::application::repos::{LikeDecrement, PostFilter};
use crate::domain::posts::{NewPost, PostPatch, validate_tag_name};
use crate::domain::types::Principal;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::models::*;
use super::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub title: Option<String>,
    pub owner_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl FilterQuery {
    fn into_filter(self) -> PostFilter {
        let defaults = PostFilter::default();
        PostFilter {
            title_contains: self.title,
            owner_id: self.owner_id,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        }
    }
}

// ----- public reads -----

pub async fn list_posts(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<PostPageResponse>, ApiError> {
    let request = PageRequest::new(query.page, query.page_size);
    let page = state.content.fetch_page(request).await?;
    Ok(Json(PostPageResponse::from(page.as_ref())))
}

pub async fn list_all_posts(
    State(state): State<ApiState>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.content.fetch_all().await?;
    Ok(Json(post_list(&posts)))
}

pub async fn search_posts(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<PostPageResponse>, ApiError> {
    let request = PageRequest::new(query.page, query.page_size);
    let page = state
        .content
        .search(query.q.as_deref().unwrap_or_default(), request)
        .await?;
    Ok(Json(PostPageResponse::from(&page)))
}

pub async fn get_post(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.content.fetch_by_id(id).await?;
    Ok(Json(PostResponse::from(post.as_ref())))
}

pub async fn record_view(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.content.increment_view(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_popularity(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PopularityResponse>, ApiError> {
    let popularity = state.content.get_popularity(id).await?;
    Ok(Json(PopularityResponse::new(id, popularity)))
}

// ----- authenticated writes -----

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<PostCreateRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let tags = payload.tags.map(TagsInput::into_names).unwrap_or_default();
    let post = NewPost::new(payload.title, payload.content, principal.subject_id, tags)?;

    let created = state.content.create(post).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(created.as_ref()))))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostUpdateRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let patch = PostPatch::new(payload.title, payload.content)?;
    let updated = state
        .content
        .update_fields(id, principal.subject_id, patch)
        .await?;
    Ok(Json(PostResponse::from(updated.as_ref())))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.content.delete_by_id(id, principal.subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_tag(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TagAttachRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let name = validate_tag_name(&payload.name)?;
    let tag = state.content.find_or_create_tag(&name).await?;
    state.content.link_tag(id, tag.id).await?;
    Ok(Json(TagResponse::from(&tag)))
}

pub async fn like_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LikeResponse>, ApiError> {
    state.content.add_like(id, principal.subject_id).await?;
    Ok(Json(LikeResponse {
        post_id: id,
        changed: true,
    }))
}

pub async fn unlike_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LikeResponse>, ApiError> {
    let outcome = state.content.remove_like(id, principal.subject_id).await?;
    Ok(Json(LikeResponse {
        post_id: id,
        changed: outcome == LikeDecrement::Applied,
    }))
}

pub async fn list_user_posts(
    State(state): State<ApiState>,
    ApiPath(user_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<FilterQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let filter = PostFilter {
        owner_id: Some(user_id),
        ..query.into_filter()
    };
    let posts = state.content.fetch_by_filter(filter).await?;
    Ok(Json(post_list(&posts)))
}

// ----- admin -----

pub async fn admin_list_posts(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<FilterQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = state.content.fetch_by_filter(query.into_filter()).await?;
    Ok(Json(post_list(&posts)))
}

pub async fn admin_purge_cache(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Json<CachePurgeResponse> {
    let removed = state.content.purge_cache();
    info!(
        target: "plume::admin",
        subject_id = principal.subject_id,
        removed,
        "Content cache purged"
    );
    Json(CachePurgeResponse { removed })
}

// ----- assistant -----

pub async fn suggest_ideas(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<IdeasRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let text = state.assistant.generate_ideas(&payload.topic).await?;
    Ok(Json(TextResponse { text }))
}

pub async fn suggest_improvements(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<ImprovementsRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let text = state.assistant.suggest_improvements(&payload.content).await?;
    Ok(Json(TextResponse { text }))
}

// ----- health -----

pub async fn health(State(state): State<ApiState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
