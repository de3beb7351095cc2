//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Mirror row for an identity asserted by the external identity service.
///
/// Credentials and session state never touch this system; only the username
/// and a display name are kept so posts and comments can be attributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub text: String,
    pub image_url: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Author fields carried alongside a post or comment by the listing joins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

impl AuthorRef {
    /// Display name when present, username otherwise.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// A post with its author and optional group resolved by a single query.
///
/// Listings always carry this shape so rendering never issues per-item
/// lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithRelations {
    pub post: PostRecord,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentWithAuthor {
    pub comment: CommentRecord,
    pub author: AuthorRef,
}
