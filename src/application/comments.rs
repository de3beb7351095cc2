//! Comment creation and listing for the post detail page.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, NewComment, PostsRepo, RepoError,
};
use crate::domain::entities::{CommentRecord, CommentWithAuthor, UserRecord};
use crate::domain::validation::{CommentInput, FieldError, validate_comment};

#[derive(Debug, Error)]
pub enum CommentServiceError {
    #[error("post not found")]
    PostNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug)]
pub enum CommentOutcome {
    Created(CommentRecord),
    Invalid(Vec<FieldError>),
}

pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    comments_write: Arc<dyn CommentsWriteRepo>,
}

impl CommentService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        comments_write: Arc<dyn CommentsWriteRepo>,
    ) -> Self {
        Self {
            posts,
            comments,
            comments_write,
        }
    }

    pub async fn list_for_post(
        &self,
        post_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self.comments.list_comments(post_id).await?)
    }

    /// Add a comment to an existing post. The target must resolve; an
    /// invalid body performs no mutation.
    pub async fn add(
        &self,
        author: &UserRecord,
        post_id: Uuid,
        input: CommentInput,
    ) -> Result<CommentOutcome, CommentServiceError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(CommentServiceError::PostNotFound);
        }

        let validated = match validate_comment(&input) {
            Ok(validated) => validated,
            Err(errors) => return Ok(CommentOutcome::Invalid(errors)),
        };

        let comment = self
            .comments_write
            .create_comment(NewComment {
                post_id,
                author_id: author.id,
                text: validated.text,
            })
            .await?;

        info!(
            target = "piazza::comments",
            comment_id = %comment.id,
            post_id = %post_id,
            author = %author.username,
            "comment created"
        );

        Ok(CommentOutcome::Created(comment))
    }
}
