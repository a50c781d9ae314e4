use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::pagination::PostPage;
use crate::domain::entities::{Popularity, PostRecord, TagRecord};
use crate::domain::posts::split_tag_list;

/// Tags may be sent as a JSON array or as one comma separated string.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::List(names) => names,
            Self::Csv(raw) => split_tag_list(&raw)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostCreateRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<TagsInput>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagAttachRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IdeasRequest {
    pub topic: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ImprovementsRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<&TagRecord> for TagResponse {
    fn from(tag: &TagRecord) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub owner_id: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub tags: Vec<TagResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&PostRecord> for PostResponse {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            owner_id: post.owner_id,
            view_count: post.view_count,
            like_count: post.like_count,
            tags: post.tags.iter().map(TagResponse::from).collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

pub fn post_list(posts: &[PostRecord]) -> Vec<PostResponse> {
    posts.iter().map(PostResponse::from).collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostPageResponse {
    pub items: Vec<PostResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl From<&PostPage> for PostPageResponse {
    fn from(page: &PostPage) -> Self {
        Self {
            items: post_list(&page.items),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PopularityResponse {
    pub post_id: i64,
    pub view_count: i64,
    pub like_count: i64,
}

impl PopularityResponse {
    pub fn new(post_id: i64, popularity: Popularity) -> Self {
        Self {
            post_id,
            view_count: popularity.view_count,
            like_count: popularity.like_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub post_id: i64,
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CachePurgeResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
}
