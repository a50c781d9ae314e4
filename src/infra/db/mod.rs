//! Postgres-backed repository implementations.

mod counters;
mod posts;
mod tags;
mod util;

pub use util::map_sqlx_error;

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{
    PgExecutor, Postgres, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;
use crate::domain::entities::TagRecord;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    /// Loads the tags of every post in `post_ids`, grouped by post id and
    /// ordered by tag name.
    async fn tags_for_posts<'e, E>(
        executor: E,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TagRecord>>, RepoError>
    where
        E: PgExecutor<'e>,
    {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT pt.post_id, t.id, t.name \
             FROM post_tags pt \
             INNER JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = ANY($1) \
             ORDER BY t.name",
        )
        .bind(post_ids)
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

        let mut grouped: HashMap<i64, Vec<TagRecord>> = HashMap::new();
        for (post_id, id, name) in rows {
            grouped
                .entry(post_id)
                .or_default()
                .push(TagRecord { id, name });
        }
        Ok(grouped)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
