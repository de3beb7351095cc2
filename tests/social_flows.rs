mod common;

use std::sync::Arc;

use common::MemoryRepo;
use piazza::application::comments::{CommentOutcome, CommentService, CommentServiceError};
use piazza::application::follows::{
    FollowOutcome, FollowService, FollowServiceError, UnfollowOutcome,
};
use piazza::application::posts::{CreateOutcome, EditOutcome, PostService};
use piazza::domain::validation::{CommentInput, PostInput};
use uuid::Uuid;

fn follow_service(repo: &Arc<MemoryRepo>) -> FollowService {
    FollowService::new(repo.clone(), repo.clone(), repo.clone())
}

fn post_service(repo: &Arc<MemoryRepo>) -> PostService {
    PostService::new(repo.clone(), repo.clone())
}

fn comment_service(repo: &Arc<MemoryRepo>) -> CommentService {
    CommentService::new(repo.clone(), repo.clone(), repo.clone())
}

#[tokio::test]
async fn follow_unfollow_round_trip() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");
    repo.add_user("author");

    let follows = follow_service(&repo);

    let outcome = follows.follow(&reader, "author").await.expect("follow");
    assert_eq!(outcome, FollowOutcome::Followed);

    let outcome = follows.unfollow(&reader, "author").await.expect("unfollow");
    assert_eq!(outcome, UnfollowOutcome::Unfollowed);

    // The edge is gone, so a second unfollow has nothing to delete.
    let err = follows
        .unfollow(&reader, "author")
        .await
        .expect_err("missing edge");
    assert!(matches!(err, FollowServiceError::EdgeNotFound));
}

#[tokio::test]
async fn duplicate_follow_is_a_no_op() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");
    let author = repo.add_user("author");

    let follows = follow_service(&repo);

    follows.follow(&reader, "author").await.expect("follow");
    let outcome = follows
        .follow(&reader, "author")
        .await
        .expect("duplicate follow");
    assert_eq!(outcome, FollowOutcome::AlreadyFollowing);

    use piazza::application::repos::FollowsRepo;
    assert!(repo.follow_exists(reader.id, author.id).await.expect("edge"));
}

#[tokio::test]
async fn self_follow_changes_nothing() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");

    let follows = follow_service(&repo);

    let outcome = follows.follow(&reader, "reader").await.expect("self follow");
    assert_eq!(outcome, FollowOutcome::SelfFollow);

    use piazza::application::repos::FollowsRepo;
    assert!(!repo.follow_exists(reader.id, reader.id).await.expect("edge"));
}

#[tokio::test]
async fn follow_unknown_username_is_not_found() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");

    let err = follow_service(&repo)
        .follow(&reader, "ghost")
        .await
        .expect_err("unknown author");
    assert!(matches!(err, FollowServiceError::UnknownProfile));
}

#[tokio::test]
async fn comment_is_attributed_and_counted() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");
    let commenter = repo.add_user("commenter");
    let post = repo.add_post(&author, None, "a post");

    let comments = comment_service(&repo);

    let outcome = comments
        .add(
            &commenter,
            post.id,
            CommentInput {
                text: "  nice one  ".to_string(),
            },
        )
        .await
        .expect("add comment");
    let comment = match outcome {
        CommentOutcome::Created(comment) => comment,
        CommentOutcome::Invalid(errors) => panic!("unexpected validation errors: {errors:?}"),
    };
    assert_eq!(comment.author_id, commenter.id);
    assert_eq!(comment.text, "nice one");

    let listed = comments.list_for_post(post.id).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].author.username, "commenter");
}

#[tokio::test]
async fn blank_comment_creates_nothing() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");
    let post = repo.add_post(&author, None, "a post");

    let comments = comment_service(&repo);

    let outcome = comments
        .add(
            &author,
            post.id,
            CommentInput {
                text: "   ".to_string(),
            },
        )
        .await
        .expect("validation outcome");
    assert!(matches!(outcome, CommentOutcome::Invalid(_)));
    assert!(comments.list_for_post(post.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let repo = Arc::new(MemoryRepo::new());
    let commenter = repo.add_user("commenter");

    let err = comment_service(&repo)
        .add(
            &commenter,
            Uuid::new_v4(),
            CommentInput {
                text: "hello".to_string(),
            },
        )
        .await
        .expect_err("missing post");
    assert!(matches!(err, CommentServiceError::PostNotFound));
}

#[tokio::test]
async fn only_the_author_can_edit_a_post() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");
    let intruder = repo.add_user("intruder");
    let post = repo.add_post(&author, None, "original text");

    let posts = post_service(&repo);

    let outcome = posts
        .edit(
            &intruder,
            post.id,
            PostInput {
                text: "hijacked".to_string(),
                group_id: None,
                image_url: None,
            },
        )
        .await
        .expect("edit outcome");
    assert!(matches!(outcome, EditOutcome::NotAuthor { .. }));
    assert_eq!(repo.post_text(post.id).as_deref(), Some("original text"));

    let outcome = posts
        .edit(
            &author,
            post.id,
            PostInput {
                text: "revised text".to_string(),
                group_id: None,
                image_url: None,
            },
        )
        .await
        .expect("edit outcome");
    assert!(matches!(outcome, EditOutcome::Updated(_)));
    assert_eq!(repo.post_text(post.id).as_deref(), Some("revised text"));
}

#[tokio::test]
async fn invalid_edit_leaves_the_post_untouched() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");
    let post = repo.add_post(&author, None, "original text");

    let outcome = post_service(&repo)
        .edit(
            &author,
            post.id,
            PostInput {
                text: "  ".to_string(),
                group_id: None,
                image_url: None,
            },
        )
        .await
        .expect("edit outcome");
    assert!(matches!(outcome, EditOutcome::Invalid { .. }));
    assert_eq!(repo.post_text(post.id).as_deref(), Some("original text"));
}

#[tokio::test]
async fn create_trims_and_stores_the_post() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");

    let outcome = post_service(&repo)
        .create(
            &author,
            PostInput {
                text: "  fresh thoughts  ".to_string(),
                group_id: None,
                image_url: Some("https://example.com/pic.png".to_string()),
            },
        )
        .await
        .expect("create outcome");
    let post = match outcome {
        CreateOutcome::Created(post) => post,
        CreateOutcome::Invalid(errors) => panic!("unexpected validation errors: {errors:?}"),
    };
    assert_eq!(post.text, "fresh thoughts");
    assert_eq!(post.author_id, author.id);
    assert_eq!(
        post.image_url.as_deref(),
        Some("https://example.com/pic.png")
    );
}
