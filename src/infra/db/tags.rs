use async_trait::async_trait;
use sqlx::PgExecutor;

use crate::application::repos::{RepoError, TagsRepo};
use crate::domain::entities::TagRecord;

use super::PostgresRepositories;
use super::util::{map_reference_error, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

impl PostgresRepositories {
    /// Concurrent callers with the same name all receive the same row.
    pub(crate) async fn upsert_tag<'e, E>(executor: E, name: &str) -> Result<TagRecord, RepoError>
    where
        E: PgExecutor<'e>,
    {
        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(executor)
        .await
        .map(TagRecord::from)
        .map_err(map_sqlx_error)
    }

    pub(crate) async fn insert_link<'e, E>(
        executor: E,
        post_id: i64,
        tag_id: i64,
    ) -> Result<(), RepoError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, tag_id) DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(map_reference_error)
    }
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn find_or_create(&self, name: &str) -> Result<TagRecord, RepoError> {
        Self::upsert_tag(self.pool(), name).await
    }

    async fn link(&self, post_id: i64, tag_id: i64) -> Result<(), RepoError> {
        Self::insert_link(self.pool(), post_id, tag_id).await
    }
}
