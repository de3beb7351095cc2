//! Listing service: paginated, relation-joined post listings.
//!
//! Covers the home feed, a group's posts, and the following feed. Scope
//! filters (group slug) resolve to an entity before any post query runs, so
//! a bad slug is a clean NotFound with no partial result. Counting and
//! slicing happen against the same scope in two statements; the page window
//! is clamped by [`Paginator`] before the slice is fetched.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{GroupsRepo, PostScope, PostsRepo, RepoError};
use crate::domain::entities::{GroupRecord, PostWithRelations};

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown profile")]
    UnknownProfile,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A group's page of posts together with the group header fields.
#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: GroupRecord,
    pub page: Page<PostWithRelations>,
}

pub struct ListingService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    paginator: Paginator,
}

impl ListingService {
    pub fn new(posts: Arc<dyn PostsRepo>, groups: Arc<dyn GroupsRepo>) -> Self {
        Self {
            posts,
            groups,
            paginator: Paginator::default(),
        }
    }

    /// The home feed: every post, newest first.
    pub async fn home_page(
        &self,
        number: PageNumber,
    ) -> Result<Page<PostWithRelations>, ListingError> {
        self.scoped_page(PostScope::All, number).await
    }

    /// A group's posts; the slug must resolve first.
    pub async fn group_page(
        &self,
        slug: &str,
        number: PageNumber,
    ) -> Result<GroupListing, ListingError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(ListingError::UnknownGroup)?;

        let page = self.scoped_page(PostScope::Group(group.id), number).await?;
        Ok(GroupListing { group, page })
    }

    /// Posts authored by anyone the user follows. Following no one is an
    /// empty page, not an error.
    pub async fn following_page(
        &self,
        user_id: Uuid,
        number: PageNumber,
    ) -> Result<Page<PostWithRelations>, ListingError> {
        self.scoped_page(PostScope::FollowedBy(user_id), number)
            .await
    }

    pub(crate) async fn scoped_page(
        &self,
        scope: PostScope,
        number: PageNumber,
    ) -> Result<Page<PostWithRelations>, ListingError> {
        let total = self.posts.count_posts(scope).await?;
        let window = self.paginator.resolve(total, number);
        let items = self
            .posts
            .list_posts(scope, window.limit, window.offset)
            .await?;
        Ok(self.paginator.assemble(items, window, total))
    }
}
