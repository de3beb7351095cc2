use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    AuthorRef, CommentRecord, CommentWithAuthor, GroupRecord, GroupRef, PostRecord,
    PostWithRelations, UserRecord,
};

/// A post row with author and group columns joined in.
///
/// Group columns are nullable as a unit: either all three are present or the
/// post has no group.
#[derive(sqlx::FromRow)]
pub(crate) struct PostListRow {
    pub(crate) id: Uuid,
    pub(crate) text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) author_id: Uuid,
    pub(crate) group_id: Option<Uuid>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
    pub(crate) author_display_name: Option<String>,
    pub(crate) group_title: Option<String>,
    pub(crate) group_slug: Option<String>,
}

impl From<PostListRow> for PostWithRelations {
    fn from(row: PostListRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
            _ => None,
        };
        Self {
            post: PostRecord {
                id: row.id,
                text: row.text,
                image_url: row.image_url,
                author_id: row.author_id,
                group_id: row.group_id,
                created_at: row.created_at,
            },
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
            },
            group,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) author_id: Uuid,
    pub(crate) group_id: Option<Uuid>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            image_url: row.image_url,
            author_id: row.author_id,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) display_name: Option<String>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct GroupRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentListRow {
    pub(crate) id: Uuid,
    pub(crate) post_id: Uuid,
    pub(crate) author_id: Uuid,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
    pub(crate) author_display_name: Option<String>,
}

impl From<CommentListRow> for CommentWithAuthor {
    fn from(row: CommentListRow) -> Self {
        Self {
            comment: CommentRecord {
                id: row.id,
                post_id: row.post_id,
                author_id: row.author_id,
                text: row.text,
                created_at: row.created_at,
            },
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub(crate) id: Uuid,
    pub(crate) post_id: Uuid,
    pub(crate) author_id: Uuid,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// Profile aggregates read in one statement.
#[derive(sqlx::FromRow)]
pub(crate) struct ProfileRow {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) display_name: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) post_count: i64,
    pub(crate) follower_count: i64,
    pub(crate) following_count: i64,
    pub(crate) viewer_follows: bool,
}
