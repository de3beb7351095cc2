//! Follow/unfollow state machine.
//!
//! Each (user, author) pair is either `not-following` or `following`.
//! `follow` requires user ≠ author and no existing edge; a duplicate follow
//! is an idempotent no-op rather than an error. `unfollow` requires an
//! existing edge; a missing edge is a NotFound.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, FollowsWriteRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowServiceError {
    #[error("unknown profile")]
    UnknownProfile,
    #[error("no follow edge exists for this pair")]
    EdgeNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    /// The edge already existed; nothing changed.
    AlreadyFollowing,
    /// Follow target is the actor; nothing changed.
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    /// Unfollow target is the actor; nothing changed.
    SelfUnfollow,
}

pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    follows_write: Arc<dyn FollowsWriteRepo>,
}

impl FollowService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        follows_write: Arc<dyn FollowsWriteRepo>,
    ) -> Self {
        Self {
            users,
            follows,
            follows_write,
        }
    }

    pub async fn follow(
        &self,
        actor: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowServiceError> {
        let author = self.resolve(username).await?;

        if author.id == actor.id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follows.follow_exists(actor.id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        match self.follows_write.create_follow(actor.id, author.id).await {
            Ok(_) => {
                info!(
                    target = "piazza::follows",
                    user = %actor.username,
                    author = %author.username,
                    "follow edge created"
                );
                Ok(FollowOutcome::Followed)
            }
            // Concurrent follow of the same pair loses the unique-constraint
            // race; treat it as the same idempotent no-op.
            Err(RepoError::Duplicate { .. }) => Ok(FollowOutcome::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow(
        &self,
        actor: &UserRecord,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowServiceError> {
        let author = self.resolve(username).await?;

        if author.id == actor.id {
            return Ok(UnfollowOutcome::SelfUnfollow);
        }

        if self.follows_write.delete_follow(actor.id, author.id).await? {
            info!(
                target = "piazza::follows",
                user = %actor.username,
                author = %author.username,
                "follow edge deleted"
            );
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Err(FollowServiceError::EdgeNotFound)
        }
    }

    async fn resolve(&self, username: &str) -> Result<UserRecord, FollowServiceError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowServiceError::UnknownProfile)
    }
}
