use std::sync::Arc;

use tracing::info;

use crate::domain::entities::{PostRecord, TagRecord};
use crate::domain::posts::{NewPost, PostPatch};

use super::service::{ContentStore, TARGET};
use super::types::ContentError;

impl ContentStore {
    /// Persists the post with its tags atomically; either every tag link
    /// applies or none does.
    pub async fn create(&self, post: NewPost) -> Result<Arc<PostRecord>, ContentError> {
        let created = self
            .writer
            .create_post(&post)
            .await
            .map_err(|err| ContentError::from_repo("create post", "post", err))?;
        self.invalidate_lists();

        info!(
            target: TARGET,
            post_id = created.id,
            owner_id = created.owner_id,
            tags = created.tags.len(),
            "Created post"
        );
        Ok(Arc::new(created))
    }

    /// Zero matching rows for `(id, owner_id)` is reported as not found.
    pub async fn update_fields(
        &self,
        id: i64,
        owner_id: i64,
        patch: PostPatch,
    ) -> Result<Arc<PostRecord>, ContentError> {
        let updated = self
            .writer
            .update_owned(id, owner_id, &patch)
            .await
            .map_err(|err| ContentError::from_repo("update post", "post", err))?;
        self.invalidate_post(id);

        info!(target: TARGET, post_id = id, owner_id, "Updated post");
        Ok(Arc::new(updated))
    }

    pub async fn delete_by_id(&self, id: i64, owner_id: i64) -> Result<(), ContentError> {
        self.writer
            .delete_owned(id, owner_id)
            .await
            .map_err(|err| ContentError::from_repo("delete post", "post", err))?;
        self.invalidate_post(id);

        info!(target: TARGET, post_id = id, owner_id, "Deleted post");
        Ok(())
    }

    /// `name` is expected to be normalized by the caller.
    pub async fn find_or_create_tag(&self, name: &str) -> Result<TagRecord, ContentError> {
        self.tags
            .find_or_create(name)
            .await
            .map_err(|err| ContentError::from_repo("find or create tag", "tag", err))
    }

    /// Linking an already linked tag succeeds without change.
    pub async fn link_tag(&self, post_id: i64, tag_id: i64) -> Result<(), ContentError> {
        self.tags
            .link(post_id, tag_id)
            .await
            .map_err(|err| ContentError::from_repo("link tag", "post or tag", err))?;
        self.invalidate_post(post_id);

        info!(target: TARGET, post_id, tag_id, "Linked tag to post");
        Ok(())
    }
}
