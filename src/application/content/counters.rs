use tracing::debug;

use crate::application::repos::LikeDecrement;
use crate::domain::entities::Popularity;

use super::service::{ContentStore, TARGET};
use super::types::ContentError;

impl ContentStore {
    pub async fn increment_view(&self, id: i64) -> Result<(), ContentError> {
        self.counters
            .increment_views(id)
            .await
            .map_err(|err| ContentError::from_repo("increment views", "post", err))?;
        self.invalidate_post(id);
        Ok(())
    }

    /// Likes are not tracked per user; every call adds one.
    pub async fn add_like(&self, id: i64, user_id: i64) -> Result<(), ContentError> {
        self.counters
            .increment_likes(id)
            .await
            .map_err(|err| ContentError::from_repo("add like", "post", err))?;
        self.invalidate_post(id);

        debug!(target: TARGET, post_id = id, user_id, "Added like");
        Ok(())
    }

    /// Removing a like from a post with zero likes succeeds and changes
    /// nothing.
    pub async fn remove_like(&self, id: i64, user_id: i64) -> Result<LikeDecrement, ContentError> {
        let outcome = self
            .counters
            .decrement_likes(id)
            .await
            .map_err(|err| ContentError::from_repo("remove like", "post", err))?;
        if outcome == LikeDecrement::Applied {
            self.invalidate_post(id);
        }

        debug!(target: TARGET, post_id = id, user_id, ?outcome, "Removed like");
        Ok(outcome)
    }

    pub async fn get_popularity(&self, id: i64) -> Result<Popularity, ContentError> {
        self.counters
            .popularity(id)
            .await
            .map_err(|err| ContentError::from_repo("read popularity", "post", err))?
            .ok_or_else(ContentError::post_not_found)
    }
}
