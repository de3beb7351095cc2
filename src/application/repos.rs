//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CommentRecord, CommentWithAuthor, FollowRecord, GroupRecord, PostRecord, PostWithRelations,
    UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which slice of the post collection a listing query covers.
///
/// Scope filters are expressed in ids; resolving a slug or username to an
/// entity happens before the query so a bad filter is a NotFound, never an
/// empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(Uuid),
    Author(Uuid),
    FollowedBy(Uuid),
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostPatch {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

/// Profile aggregates computed from a single consistent snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub user: UserRecord,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub viewer_follows: bool,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    /// Newest-first slice of the scope with author and group joined in.
    async fn list_posts(
        &self,
        scope: PostScope,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostWithRelations>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostWithRelations>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: NewPost) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: PostPatch) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    /// All groups, for the post form's group selector.
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    /// Mirror an externally-asserted identity, creating the row on first
    /// sighting.
    async fn upsert_user(&self, username: &str) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait ProfilesRepo: Send + Sync {
    /// Load a profile's aggregates in one statement so all four values come
    /// from the same snapshot.
    async fn load_profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<ProfileSnapshot>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Newest-first comments for a post with authors joined in.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: NewComment) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait FollowsWriteRepo: Send + Sync {
    async fn create_follow(&self, user_id: Uuid, author_id: Uuid)
    -> Result<FollowRecord, RepoError>;

    /// Delete the edge; returns whether an edge existed.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;
}
