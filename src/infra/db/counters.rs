use async_trait::async_trait;

use crate::application::repos::{CountersRepo, LikeDecrement, RepoError};
use crate::domain::entities::Popularity;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

// Every counter change is one UPDATE evaluated against the current row
// value, so concurrent increments never overwrite each other.

#[async_trait]
impl CountersRepo for PostgresRepositories {
    async fn increment_views(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn increment_likes(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn decrement_likes(&self, id: i64) -> Result<LikeDecrement, RepoError> {
        let result = sqlx::query(
            "UPDATE posts SET like_count = like_count - 1 WHERE id = $1 AND like_count > 0",
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            return Ok(LikeDecrement::Applied);
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        if exists {
            Ok(LikeDecrement::AlreadyZero)
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn popularity(&self, id: i64) -> Result<Option<Popularity>, RepoError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT view_count, like_count FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(view_count, like_count)| Popularity {
            view_count,
            like_count,
        }))
    }
}
