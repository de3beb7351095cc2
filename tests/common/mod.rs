//! In-memory repository fakes shared by the integration tests.

use std::sync::Mutex;

use async_trait::async_trait;
use piazza::application::repos::{
    CommentsRepo, CommentsWriteRepo, FollowsRepo, FollowsWriteRepo, GroupsRepo, NewComment,
    NewPost, PostPatch, PostScope, PostsRepo, PostsWriteRepo, ProfileSnapshot, ProfilesRepo,
    RepoError, UsersRepo,
};
use piazza::domain::entities::{
    AuthorRef, CommentRecord, CommentWithAuthor, FollowRecord, GroupRecord, GroupRef,
    PostRecord, PostWithRelations, UserRecord,
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    ticks: i64,
}

impl MemoryState {
    // Strictly increasing timestamps keep the newest-first ordering
    // deterministic.
    fn next_moment(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        OffsetDateTime::from_unix_timestamp(1_700_000_000)
            .expect("valid epoch")
            + Duration::seconds(self.ticks)
    }
}

#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        let mut state = self.state.lock().expect("state lock");
        let created_at = state.next_moment();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: None,
            created_at,
        };
        state.users.push(user.clone());
        user
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut state = self.state.lock().expect("state lock");
        let created_at = state.next_moment();
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
            created_at,
        };
        state.groups.push(group.clone());
        group
    }

    pub fn add_post(&self, author: &UserRecord, group: Option<&GroupRecord>, text: &str) -> PostRecord {
        let mut state = self.state.lock().expect("state lock");
        let created_at = state.next_moment();
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            image_url: None,
            author_id: author.id,
            group_id: group.map(|g| g.id),
            created_at,
        };
        state.posts.push(post.clone());
        post
    }

    pub fn post_text(&self, id: Uuid) -> Option<String> {
        let state = self.state.lock().expect("state lock");
        state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }

    fn with_relations(state: &MemoryState, post: &PostRecord) -> PostWithRelations {
        let author = state
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .expect("post author exists");
        let group = post.group_id.and_then(|group_id| {
            state
                .groups
                .iter()
                .find(|group| group.id == group_id)
                .map(|group| GroupRef {
                    id: group.id,
                    title: group.title.clone(),
                    slug: group.slug.clone(),
                })
        });
        PostWithRelations {
            post: post.clone(),
            author: AuthorRef {
                id: author.id,
                username: author.username.clone(),
                display_name: author.display_name.clone(),
            },
            group,
        }
    }

    fn scoped<'a>(state: &'a MemoryState, scope: PostScope) -> Vec<&'a PostRecord> {
        let mut posts: Vec<&PostRecord> = state
            .posts
            .iter()
            .filter(|post| match scope {
                PostScope::All => true,
                PostScope::Group(group_id) => post.group_id == Some(group_id),
                PostScope::Author(author_id) => post.author_id == author_id,
                PostScope::FollowedBy(user_id) => state
                    .follows
                    .iter()
                    .any(|edge| edge.user_id == user_id && edge.author_id == post.author_id),
            })
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts
    }
}

#[async_trait]
impl PostsRepo for MemoryRepo {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(Self::scoped(&state, scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostWithRelations>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(Self::scoped(&state, scope)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| Self::with_relations(&state, post))
            .collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostWithRelations>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| Self::with_relations(&state, post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepo {
    async fn create_post(&self, params: NewPost) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let created_at = state.next_moment();
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            image_url: params.image_url,
            author_id: params.author_id,
            group_id: params.group_id,
            created_at,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: PostPatch) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image_url = params.image_url;
        Ok(post.clone())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepo {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state.groups.clone())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepo {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn upsert_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        if let Some(user) = self.find_user_by_username(username).await? {
            return Ok(user);
        }
        Ok(self.add_user(username))
    }
}

#[async_trait]
impl ProfilesRepo for MemoryRepo {
    async fn load_profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
    ) -> Result<Option<ProfileSnapshot>, RepoError> {
        let state = self.state.lock().expect("state lock");
        let Some(user) = state.users.iter().find(|user| user.username == username) else {
            return Ok(None);
        };

        let post_count = state
            .posts
            .iter()
            .filter(|post| post.author_id == user.id)
            .count() as u64;
        let follower_count = state
            .follows
            .iter()
            .filter(|edge| edge.author_id == user.id)
            .count() as u64;
        let following_count = state
            .follows
            .iter()
            .filter(|edge| edge.user_id == user.id)
            .count() as u64;
        let viewer_follows = viewer.is_some_and(|viewer_id| {
            state
                .follows
                .iter()
                .any(|edge| edge.user_id == viewer_id && edge.author_id == user.id)
        });

        Ok(Some(ProfileSnapshot {
            user: user.clone(),
            post_count,
            follower_count,
            following_count,
            viewer_follows,
        }))
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepo {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let state = self.state.lock().expect("state lock");
        let mut comments: Vec<&CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = state
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .expect("comment author exists");
                CommentWithAuthor {
                    comment: comment.clone(),
                    author: AuthorRef {
                        id: author.id,
                        username: author.username.clone(),
                        display_name: author.display_name.clone(),
                    },
                }
            })
            .collect())
    }
}

#[async_trait]
impl CommentsWriteRepo for MemoryRepo {
    async fn create_comment(&self, params: NewComment) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let created_at = state.next_moment();
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepo {
    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.lock().expect("state lock");
        Ok(state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }
}

#[async_trait]
impl FollowsWriteRepo for MemoryRepo {
    async fn create_follow(
        &self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        if state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id)
        {
            return Err(RepoError::Duplicate {
                constraint: "follows_unique_pair".to_string(),
            });
        }
        let created_at = state.next_moment();
        let edge = FollowRecord {
            id: Uuid::new_v4(),
            user_id,
            author_id,
            created_at,
        };
        state.follows.push(edge.clone());
        Ok(edge)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.lock().expect("state lock");
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok(state.follows.len() < before)
    }
}
