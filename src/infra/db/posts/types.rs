use time::OffsetDateTime;

use crate::domain::entities::{PostRecord, TagRecord};

pub(crate) const POST_COLUMNS: &str =
    "id, title, content, owner_id, view_count, like_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub owner_id: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PostRow {
    pub(crate) fn into_record(self, tags: Vec<TagRecord>) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title,
            content: self.content,
            owner_id: self.owner_id,
            view_count: self.view_count,
            like_count: self.like_count,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
