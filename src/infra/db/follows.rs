use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{
    FollowsRepo, FollowsWriteRepo, ProfileSnapshot, ProfilesRepo, RepoError,
};
use crate::domain::entities::{FollowRecord, UserRecord};

use super::PostgresRepositories;
use super::types::ProfileRow;
use crate::infra::db::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: Uuid,
    user_id: Uuid,
    author_id: Uuid,
    created_at: time::OffsetDateTime,
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND author_id = ");
        qb.push_bind(author_id);
        qb.push(")");

        qb.build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl FollowsWriteRepo for PostgresRepositories {
    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let mut qb = QueryBuilder::new("INSERT INTO follows (id, user_id, author_id) VALUES (");
        qb.push_bind(Uuid::new_v4());
        qb.push(", ");
        qb.push_bind(user_id);
        qb.push(", ");
        qb.push_bind(author_id);
        qb.push(") RETURNING id, user_id, author_id, created_at");

        let row = qb
            .build_query_as::<FollowRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(FollowRecord {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
            created_at: row.created_at,
        })
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut qb = QueryBuilder::new("DELETE FROM follows WHERE user_id = ");
        qb.push_bind(user_id);
        qb.push(" AND author_id = ");
        qb.push_bind(author_id);

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfilesRepo for PostgresRepositories {
    async fn load_profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<ProfileSnapshot>, RepoError> {
        // One statement so post count, follower count, following count, and
        // the viewer's follow state come from the same snapshot.
        let mut qb = QueryBuilder::new(
            "SELECT u.id, u.username, u.display_name, u.created_at, \
             (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS post_count, \
             (SELECT COUNT(*) FROM follows f WHERE f.author_id = u.id) AS follower_count, \
             (SELECT COUNT(*) FROM follows f WHERE f.user_id = u.id) AS following_count, ",
        );
        match viewer {
            Some(viewer_id) => {
                qb.push("EXISTS (SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = ");
                qb.push_bind(viewer_id);
                qb.push(") AS viewer_follows");
            }
            None => {
                qb.push("FALSE AS viewer_follows");
            }
        }
        qb.push(" FROM users u WHERE u.username = ");
        qb.push_bind(username);

        let row = qb
            .build_query_as::<ProfileRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ProfileSnapshot {
            user: UserRecord {
                id: row.id,
                username: row.username,
                display_name: row.display_name,
                created_at: row.created_at,
            },
            post_count: Self::convert_count(row.post_count)?,
            follower_count: Self::convert_count(row.follower_count)?,
            following_count: Self::convert_count(row.following_count)?,
            viewer_follows: row.viewer_follows,
        }))
    }
}
