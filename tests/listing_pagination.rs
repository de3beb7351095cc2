mod common;

use std::sync::Arc;

use common::MemoryRepo;
use piazza::application::listing::{ListingError, ListingService};
use piazza::application::pagination::{PAGE_SIZE, PageNumber};
use piazza::application::profile::ProfileService;

fn service(repo: &Arc<MemoryRepo>) -> ListingService {
    ListingService::new(repo.clone(), repo.clone())
}

#[tokio::test]
async fn home_feed_splits_thirteen_posts_over_two_pages() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("leo");
    for n in 0..13 {
        repo.add_post(&author, None, &format!("post {n}"));
    }

    let listing = service(&repo);

    let first = listing
        .home_page(PageNumber::new(1))
        .await
        .expect("first page");
    assert_eq!(first.items.len(), PAGE_SIZE as usize);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.total_items, 13);
    assert!(first.has_next());
    assert!(!first.has_previous());
    // Newest first: the last-written post opens the feed.
    assert_eq!(first.items[0].post.text, "post 12");

    let second = listing
        .home_page(PageNumber::new(2))
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 3);
    assert!(!second.has_next());
    assert!(second.has_previous());
    assert_eq!(second.items[2].post.text, "post 0");
}

#[tokio::test]
async fn out_of_range_page_clamps_to_last() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("leo");
    for n in 0..13 {
        repo.add_post(&author, None, &format!("post {n}"));
    }

    let page = service(&repo)
        .home_page(PageNumber::from_query(Some("99")))
        .await
        .expect("clamped page");
    assert_eq!(page.number, 2);
    assert_eq!(page.items.len(), 3);
}

#[tokio::test]
async fn invalid_page_query_falls_back_to_first() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("leo");
    repo.add_post(&author, None, "only post");

    let page = service(&repo)
        .home_page(PageNumber::from_query(Some("banana")))
        .await
        .expect("first page");
    assert_eq!(page.number, 1);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn empty_feed_yields_one_valid_empty_page() {
    let repo = Arc::new(MemoryRepo::new());

    let page = service(&repo)
        .home_page(PageNumber::new(1))
        .await
        .expect("empty page");
    assert!(page.items.is_empty());
    assert_eq!(page.number, 1);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next());
    assert!(!page.has_previous());
}

#[tokio::test]
async fn group_listing_filters_to_the_group() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("leo");
    let novels = repo.add_group("Novels", "novels");
    let poetry = repo.add_group("Poetry", "poetry");
    repo.add_post(&author, Some(&novels), "a novel");
    repo.add_post(&author, Some(&poetry), "a poem");
    repo.add_post(&author, None, "ungrouped");

    let listing = service(&repo)
        .group_page("novels", PageNumber::new(1))
        .await
        .expect("group page");
    assert_eq!(listing.group.slug, "novels");
    assert_eq!(listing.page.items.len(), 1);
    assert_eq!(listing.page.items[0].post.text, "a novel");
    assert_eq!(
        listing.page.items[0].group.as_ref().map(|g| g.slug.as_str()),
        Some("novels")
    );
}

#[tokio::test]
async fn unknown_group_slug_is_an_error_not_an_empty_page() {
    let repo = Arc::new(MemoryRepo::new());

    let err = service(&repo)
        .group_page("missing", PageNumber::new(1))
        .await
        .expect_err("unknown slug");
    assert!(matches!(err, ListingError::UnknownGroup));
}

#[tokio::test]
async fn following_feed_only_carries_followed_authors() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");
    let followed = repo.add_user("followed");
    let stranger = repo.add_user("stranger");
    repo.add_post(&followed, None, "from followed");
    repo.add_post(&stranger, None, "from stranger");

    use piazza::application::repos::FollowsWriteRepo;
    repo.create_follow(reader.id, followed.id)
        .await
        .expect("create edge");

    let page = service(&repo)
        .following_page(reader.id, PageNumber::new(1))
        .await
        .expect("following feed");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].post.text, "from followed");
}

#[tokio::test]
async fn following_no_one_is_an_empty_page() {
    let repo = Arc::new(MemoryRepo::new());
    let reader = repo.add_user("reader");
    let other = repo.add_user("other");
    repo.add_post(&other, None, "unseen");

    let page = service(&repo)
        .following_page(reader.id, PageNumber::new(1))
        .await
        .expect("empty following feed");
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn profile_view_aggregates_and_paginates() {
    let repo = Arc::new(MemoryRepo::new());
    let author = repo.add_user("author");
    let fan = repo.add_user("fan");
    for n in 0..11 {
        repo.add_post(&author, None, &format!("post {n}"));
    }

    use piazza::application::repos::FollowsWriteRepo;
    repo.create_follow(fan.id, author.id)
        .await
        .expect("create edge");

    let profiles = ProfileService::new(repo.clone(), repo.clone());

    let view = profiles
        .view("author", Some(fan.id), PageNumber::new(2))
        .await
        .expect("profile view");
    assert_eq!(view.snapshot.post_count, 11);
    assert_eq!(view.snapshot.follower_count, 1);
    assert_eq!(view.snapshot.following_count, 0);
    assert!(view.snapshot.viewer_follows);
    assert_eq!(view.page.items.len(), 1);
    assert_eq!(view.page.items[0].post.text, "post 0");

    let anonymous = profiles
        .view("author", None, PageNumber::new(1))
        .await
        .expect("anonymous view");
    assert!(!anonymous.snapshot.viewer_follows);
}
