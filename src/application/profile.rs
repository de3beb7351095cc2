//! Profile aggregation: counts, follow state, and the author's posts.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{
    PostScope, PostsRepo, ProfileSnapshot, ProfilesRepo, RepoError,
};
use crate::domain::entities::PostWithRelations;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile")]
    UnknownProfile,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Everything the profile page renders: the snapshot of aggregates plus the
/// requested page of the author's posts.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub snapshot: ProfileSnapshot,
    pub page: Page<PostWithRelations>,
}

pub struct ProfileService {
    profiles: Arc<dyn ProfilesRepo>,
    posts: Arc<dyn PostsRepo>,
    paginator: Paginator,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfilesRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self {
            profiles,
            posts,
            paginator: Paginator::default(),
        }
    }

    /// Resolve a username to its profile view.
    ///
    /// The four aggregate values (post count, follower count, following
    /// count, viewer-follows) come from one repository statement so they
    /// cannot skew against each other.
    pub async fn view(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        number: PageNumber,
    ) -> Result<ProfileView, ProfileError> {
        let snapshot = self
            .profiles
            .load_profile(username, viewer)
            .await?
            .ok_or(ProfileError::UnknownProfile)?;

        let scope = PostScope::Author(snapshot.user.id);
        let window = self.paginator.resolve(snapshot.post_count, number);
        let items = self
            .posts
            .list_posts(scope, window.limit, window.offset)
            .await?;
        let page = self
            .paginator
            .assemble(items, window, snapshot.post_count);

        Ok(ProfileView { snapshot, page })
    }
}
