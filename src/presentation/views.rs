use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::application::repos::ProfileSnapshot;
use crate::domain::entities::{
    CommentWithAuthor, GroupRecord, PostWithRelations, UserRecord,
};
use crate::domain::validation::FieldError;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(layout: LayoutContext) -> Response {
    let mut response = render_template_response(
        ErrorTemplate {
            layout,
            heading: "Page not found".to_string(),
            detail: "The page you were looking for does not exist.".to_string(),
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

const DATE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");

fn format_date(moment: OffsetDateTime) -> String {
    moment
        .format(&DATE_FORMAT)
        .unwrap_or_else(|_| moment.to_string())
}

// ============================================================================
// View models
// ============================================================================

/// Signed-in viewer shown in the page header.
#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub label: String,
}

impl From<&UserRecord> for ViewerView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            label: user
                .display_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext {
    pub title: String,
    pub viewer: Option<ViewerView>,
}

impl LayoutContext {
    pub fn new(title: impl Into<String>, viewer: Option<&UserRecord>) -> Self {
        Self {
            title: title.into(),
            viewer: viewer.map(ViewerView::from),
        }
    }
}

#[derive(Clone)]
pub struct GroupBadge {
    pub title: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub text: String,
    pub image_url: Option<String>,
    pub author_username: String,
    pub author_label: String,
    pub group: Option<GroupBadge>,
    pub created_at: String,
}

impl From<&PostWithRelations> for PostCard {
    fn from(item: &PostWithRelations) -> Self {
        Self {
            id: item.post.id.to_string(),
            text: item.post.text.clone(),
            image_url: item.post.image_url.clone(),
            author_username: item.author.username.clone(),
            author_label: item.author.label().to_string(),
            group: item.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                slug: group.slug.clone(),
            }),
            created_at: format_date(item.post.created_at),
        }
    }
}

/// Page navigation state precomputed for the template.
#[derive(Clone)]
pub struct PaginationView {
    pub current: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u32,
    pub next: u32,
}

impl PaginationView {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            current: page.number,
            total_pages: page.total_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous: page.number.saturating_sub(1).max(1),
            next: (page.number + 1).min(page.total_pages),
        }
    }
}

/// Shared shape of every paginated post listing.
#[derive(Clone)]
pub struct ListingContext {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl ListingContext {
    pub fn from_page(page: &Page<PostWithRelations>) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            pagination: PaginationView::from_page(page),
        }
    }
}

#[derive(Clone)]
pub struct GroupHeaderView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupHeaderView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ProfileHeaderView {
    pub username: String,
    pub label: String,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub viewer_follows: bool,
    /// Whether the viewer may toggle the follow state at all.
    pub can_follow: bool,
}

impl ProfileHeaderView {
    pub fn new(snapshot: &ProfileSnapshot, viewer: Option<&UserRecord>) -> Self {
        let can_follow = viewer.is_some_and(|viewer| viewer.id != snapshot.user.id);
        Self {
            username: snapshot.user.username.clone(),
            label: snapshot
                .user
                .display_name
                .clone()
                .unwrap_or_else(|| snapshot.user.username.clone()),
            post_count: snapshot.post_count,
            follower_count: snapshot.follower_count,
            following_count: snapshot.following_count,
            viewer_follows: snapshot.viewer_follows,
            can_follow,
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_label: String,
    pub text: String,
    pub created_at: String,
}

impl From<&CommentWithAuthor> for CommentView {
    fn from(item: &CommentWithAuthor) -> Self {
        Self {
            author_username: item.author.username.clone(),
            author_label: item.author.label().to_string(),
            text: item.comment.text.clone(),
            created_at: format_date(item.comment.created_at),
        }
    }
}

#[derive(Clone)]
pub struct FieldErrorView {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldErrorView {
    fn from(err: &FieldError) -> Self {
        Self {
            field: err.field.to_string(),
            message: err.message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GroupOptionView {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

/// Post form state: blank for create, prefilled for edit, and re-rendered
/// with errors when validation fails.
#[derive(Clone)]
pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub text: String,
    pub image_url: String,
    pub groups: Vec<GroupOptionView>,
    pub errors: Vec<FieldErrorView>,
}

impl PostFormView {
    pub fn groups_from(
        groups: &[GroupRecord],
        selected: Option<&str>,
    ) -> Vec<GroupOptionView> {
        groups
            .iter()
            .map(|group| GroupOptionView {
                id: group.id.to_string(),
                title: group.title.clone(),
                selected: selected.is_some_and(|value| value == group.id.to_string()),
            })
            .collect()
    }
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub layout: LayoutContext,
    pub listing: ListingContext,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub layout: LayoutContext,
    pub group: GroupHeaderView,
    pub listing: ListingContext,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub layout: LayoutContext,
    pub profile: ProfileHeaderView,
    pub listing: ListingContext,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub layout: LayoutContext,
    pub post: PostCard,
    pub author_post_count: u64,
    pub can_edit: bool,
    pub can_comment: bool,
    pub comments: Vec<CommentView>,
    pub comment_errors: Vec<FieldErrorView>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub layout: LayoutContext,
    pub form: PostFormView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub layout: LayoutContext,
    pub listing: ListingContext,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: LayoutContext,
    pub heading: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::application::pagination::{PAGE_SIZE, PageNumber, Paginator};
    use crate::domain::entities::{AuthorRef, GroupRef, PostRecord};

    fn sample_item(text: &str) -> PostWithRelations {
        let author_id = Uuid::new_v4();
        PostWithRelations {
            post: PostRecord {
                id: Uuid::new_v4(),
                text: text.to_string(),
                image_url: None,
                author_id,
                group_id: None,
                created_at: datetime!(2024-05-01 12:30 UTC),
            },
            author: AuthorRef {
                id: author_id,
                username: "leo".to_string(),
                display_name: Some("Leo T.".to_string()),
            },
            group: Some(GroupRef {
                id: Uuid::new_v4(),
                title: "Novels".to_string(),
                slug: "novels".to_string(),
            }),
        }
    }

    #[test]
    fn post_card_carries_author_label_and_group() {
        let card = PostCard::from(&sample_item("hello"));
        assert_eq!(card.author_label, "Leo T.");
        assert_eq!(card.author_username, "leo");
        assert_eq!(
            card.group.as_ref().map(|g| g.slug.as_str()),
            Some("novels")
        );
        assert_eq!(card.created_at, "01 May 2024 12:30");
    }

    #[test]
    fn pagination_view_clamps_navigation_targets() {
        let paginator = Paginator::default();
        let window = paginator.resolve(PAGE_SIZE as u64 * 2, PageNumber::new(1));
        let items = vec![sample_item("a"); PAGE_SIZE as usize];
        let page = paginator.assemble(items, window, PAGE_SIZE as u64 * 2);

        let view = PaginationView::from_page(&page);
        assert_eq!(view.current, 1);
        assert!(!view.has_previous);
        assert!(view.has_next);
        assert_eq!(view.previous, 1);
        assert_eq!(view.next, 2);
    }

    #[test]
    fn templates_render() {
        let layout = LayoutContext::new("Piazza", None);
        let listing = ListingContext {
            posts: vec![PostCard::from(&sample_item("hello"))],
            pagination: PaginationView {
                current: 1,
                total_pages: 1,
                has_previous: false,
                has_next: false,
                previous: 1,
                next: 1,
            },
        };

        let html = IndexTemplate {
            layout,
            listing,
        }
        .render()
        .expect("index template should render");
        assert!(html.contains("hello"));
        assert!(html.contains("Leo T."));
    }
}
