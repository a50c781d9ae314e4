use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostsWriteRepo, RepoError};
use crate::domain::entities::{PostRecord, TagRecord};
use crate::domain::posts::{NewPost, PostPatch};
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

use super::types::{POST_COLUMNS, PostRow};

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, post: &NewPost) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (title, content, owner_id) VALUES ($1, $2, $3) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.title())
        .bind(post.content())
        .bind(post.owner_id())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut tags: Vec<TagRecord> = Vec::with_capacity(post.tags().len());
        for name in post.tags() {
            let tag = Self::upsert_tag(&mut *tx, name).await?;
            Self::insert_link(&mut *tx, row.id, tag.id).await?;
            tags.push(tag);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(row.into_record(tags))
    }

    async fn update_owned(
        &self,
        id: i64,
        owner_id: i64,
        patch: &PostPatch,
    ) -> Result<PostRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE posts SET updated_at = now()");
        if let Some(title) = patch.title() {
            qb.push(", title = ");
            qb.push_bind(title.to_string());
        }
        if let Some(content) = patch.content() {
            qb.push(", content = ");
            qb.push_bind(content.to_string());
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND owner_id = ");
        qb.push_bind(owner_id);
        qb.push(format!(" RETURNING {POST_COLUMNS}"));

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        self.attach_tags(vec![row])
            .await?
            .pop()
            .ok_or(RepoError::NotFound)
    }

    async fn delete_owned(&self, id: i64, owner_id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
