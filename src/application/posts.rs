//! Post creation and editing with the authorship guard.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{NewPost, PostPatch, PostsRepo, PostsWriteRepo, RepoError};
use crate::domain::entities::{PostRecord, PostWithRelations, UserRecord};
use crate::domain::validation::{FieldError, PostInput, validate_post};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of a create attempt: either a stored post or the field errors to
/// re-render the form with. No mutation happens on the invalid path.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(PostRecord),
    Invalid(Vec<FieldError>),
}

/// Result of an edit attempt.
///
/// `NotAuthor` carries no error; the handler turns it into a silent redirect
/// to the detail view, leaving the post untouched.
#[derive(Debug)]
pub enum EditOutcome {
    Updated(PostRecord),
    NotAuthor { post: PostWithRelations },
    Invalid {
        post: PostWithRelations,
        errors: Vec<FieldError>,
    },
}

pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostsRepo>, posts_write: Arc<dyn PostsWriteRepo>) -> Self {
        Self { posts, posts_write }
    }

    pub async fn detail(&self, id: Uuid) -> Result<PostWithRelations, PostServiceError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or(PostServiceError::NotFound)
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        input: PostInput,
    ) -> Result<CreateOutcome, RepoError> {
        let validated = match validate_post(&input) {
            Ok(validated) => validated,
            Err(errors) => return Ok(CreateOutcome::Invalid(errors)),
        };

        let post = self
            .posts_write
            .create_post(NewPost {
                author_id: author.id,
                text: validated.text,
                group_id: validated.group_id,
                image_url: validated.image_url,
            })
            .await?;

        info!(
            target = "piazza::posts",
            post_id = %post.id,
            author = %author.username,
            "post created"
        );

        Ok(CreateOutcome::Created(post))
    }

    /// Edit an existing post. Only the author may mutate it; anyone else
    /// gets `NotAuthor` and the stored text stays as it was.
    pub async fn edit(
        &self,
        actor: &UserRecord,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<EditOutcome, PostServiceError> {
        let existing = self.detail(post_id).await?;

        if existing.post.author_id != actor.id {
            return Ok(EditOutcome::NotAuthor { post: existing });
        }

        let validated = match validate_post(&input) {
            Ok(validated) => validated,
            Err(errors) => {
                return Ok(EditOutcome::Invalid {
                    post: existing,
                    errors,
                });
            }
        };

        let updated = self
            .posts_write
            .update_post(PostPatch {
                id: post_id,
                text: validated.text,
                group_id: validated.group_id,
                image_url: validated.image_url,
            })
            .await?;

        info!(
            target = "piazza::posts",
            post_id = %updated.id,
            author = %actor.username,
            "post edited"
        );

        Ok(EditOutcome::Updated(updated))
    }
}
