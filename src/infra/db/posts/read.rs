use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::infra::db::{PostgresRepositories, like_pattern, map_sqlx_error};

use super::types::{POST_COLUMNS, PostRow};

const NEWEST_FIRST: &str = " ORDER BY created_at DESC, id DESC";

impl PostgresRepositories {
    pub(crate) async fn attach_tags(&self, rows: Vec<PostRow>) -> Result<Vec<PostRecord>, RepoError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut tags = Self::tags_for_posts(self.pool(), &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_record(post_tags)
            })
            .collect())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_owner(&self, id: i64) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT owner_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError> {
        let window = PostFilter {
            limit,
            offset,
            ..Default::default()
        };
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        push_window(&mut qb, &window)?;

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_tags(rows).await
    }

    async fn list_all_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts{NEWEST_FIRST}"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.attach_tags(rows).await
    }

    async fn count_search(&self, query: &str) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE ");
        push_search_match(&mut qb, query);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let window = PostFilter {
            limit,
            offset,
            ..Default::default()
        };

        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE "));
        push_search_match(&mut qb, query);
        push_window(&mut qb, &window)?;

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_tags(rows).await
    }

    async fn list_filtered(&self, filter: &PostFilter) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1"));

        if let Some(title) = filter.title_contains.as_deref() {
            qb.push(" AND title ILIKE ");
            qb.push_bind(like_pattern(title));
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND owner_id = ");
            qb.push_bind(owner_id);
        }
        push_window(&mut qb, filter)?;

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_tags(rows).await
    }
}

fn push_window(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    filter: &PostFilter,
) -> Result<(), RepoError> {
    let offset = i64::try_from(filter.offset).map_err(|_| RepoError::InvalidInput {
        message: "offset out of range".to_string(),
    })?;

    qb.push(NEWEST_FIRST);
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(filter.limit));
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    Ok(())
}

fn push_search_match(qb: &mut QueryBuilder<'_, sqlx::Postgres>, query: &str) {
    let pattern = like_pattern(query);
    qb.push("(title ILIKE ");
    qb.push_bind(pattern.clone());
    qb.push(" OR content ILIKE ");
    qb.push_bind(pattern);
    qb.push(")");
}
