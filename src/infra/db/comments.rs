use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, NewComment, RepoError,
};
use crate::domain::entities::{CommentRecord, CommentWithAuthor};

use super::PostgresRepositories;
use super::types::{CommentListRow, CommentRow};
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created_at, \
             u.username AS author_username, u.display_name AS author_display_name \
             FROM comments c INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = ",
        );
        qb.push_bind(post_id);
        qb.push(" ORDER BY c.created_at DESC, c.id DESC");

        let rows = qb
            .build_query_as::<CommentListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(&self, params: NewComment) -> Result<CommentRecord, RepoError> {
        let mut qb = QueryBuilder::new(
            "INSERT INTO comments (id, post_id, author_id, text) VALUES (",
        );
        qb.push_bind(Uuid::new_v4());
        qb.push(", ");
        qb.push_bind(params.post_id);
        qb.push(", ");
        qb.push_bind(params.author_id);
        qb.push(", ");
        qb.push_bind(params.text);
        qb.push(") RETURNING id, post_id, author_id, text, created_at");

        let row = qb
            .build_query_as::<CommentRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
