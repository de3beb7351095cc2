use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{
    NewPost, PostPatch, PostScope, PostsRepo, PostsWriteRepo, RepoError,
};
use crate::domain::entities::{PostRecord, PostWithRelations};

use super::PostgresRepositories;
use super::types::{PostListRow, PostRow};
use crate::infra::db::map_sqlx_error;

const POST_LIST_COLUMNS: &str = "p.id, p.text, p.image_url, p.author_id, p.group_id, \
     p.created_at, u.username AS author_username, u.display_name AS author_display_name, \
     g.title AS group_title, g.slug AS group_slug";

const POST_LIST_JOINS: &str =
    " FROM posts p INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id WHERE 1=1 ";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostWithRelations>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_LIST_COLUMNS);
        qb.push(POST_LIST_JOINS);
        Self::apply_scope_conditions(&mut qb, scope);

        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).map_err(|_| {
            RepoError::from_persistence("offset exceeds supported range")
        })?);

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostWithRelations::from).collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostWithRelations>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_LIST_COLUMNS);
        qb.push(POST_LIST_JOINS);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostWithRelations::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: NewPost) -> Result<PostRecord, RepoError> {
        let mut qb = QueryBuilder::new(
            "INSERT INTO posts (id, text, image_url, author_id, group_id) VALUES (",
        );
        qb.push_bind(Uuid::new_v4());
        qb.push(", ");
        qb.push_bind(params.text);
        qb.push(", ");
        qb.push_bind(params.image_url);
        qb.push(", ");
        qb.push_bind(params.author_id);
        qb.push(", ");
        qb.push_bind(params.group_id);
        qb.push(") RETURNING id, text, image_url, author_id, group_id, created_at");

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: PostPatch) -> Result<PostRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE posts SET text = ");
        qb.push_bind(params.text);
        qb.push(", image_url = ");
        qb.push_bind(params.image_url);
        qb.push(", group_id = ");
        qb.push_bind(params.group_id);
        qb.push(" WHERE id = ");
        qb.push_bind(params.id);
        qb.push(" RETURNING id, text, image_url, author_id, group_id, created_at");

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }
}
