use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

use super::PostgresRepositories;
use super::types::UserRow;
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, username, display_name, created_at FROM users WHERE username = ",
        );
        qb.push_bind(username);

        let row = qb
            .build_query_as::<UserRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn upsert_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        // ON CONFLICT DO UPDATE so the row always comes back, even for an
        // existing user.
        let mut qb = QueryBuilder::new("INSERT INTO users (id, username) VALUES (");
        qb.push_bind(Uuid::new_v4());
        qb.push(", ");
        qb.push_bind(username);
        qb.push(
            ") ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username \
             RETURNING id, username, display_name, created_at",
        );

        let row = qb
            .build_query_as::<UserRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }
}
