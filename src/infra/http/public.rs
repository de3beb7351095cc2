use std::sync::Arc;

use axum::{
    Extension, Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        comments::{CommentOutcome, CommentService, CommentServiceError},
        follows::{FollowService, FollowServiceError},
        listing::{ListingError, ListingService},
        pagination::PageNumber,
        posts::{CreateOutcome, EditOutcome, PostService, PostServiceError},
        profile::{ProfileError, ProfileService},
        repos::{GroupsRepo, PostScope, PostsRepo},
    },
    cache::{CacheState, response_cache_layer},
    domain::entities::{PostWithRelations, UserRecord},
    domain::validation::{CommentInput, FieldError, PostInput},
    infra::db::PostgresRepositories,
    presentation::views::{
        CommentView, FieldErrorView, FollowTemplate, GroupHeaderView, GroupTemplate,
        IndexTemplate, LayoutContext, ListingContext, PostCard, PostDetailTemplate,
        PostFormTemplate, PostFormView, ProfileHeaderView, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    IdentityState, RequestIdentity, db_health_response, login_redirect,
    middleware::{log_responses, set_request_context},
    repo_error_to_http, resolve_identity,
};

#[derive(Clone)]
pub struct HttpState {
    pub listing: Arc<ListingService>,
    pub profiles: Arc<ProfileService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub groups: Arc<dyn GroupsRepo>,
    pub posts_repo: Arc<dyn PostsRepo>,
    pub db: Arc<PostgresRepositories>,
    pub login_url: String,
}

pub fn build_router(
    state: HttpState,
    identity: IdentityState,
    cache: Option<CacheState>,
) -> Router {
    // Only the home feed goes through the response cache; every other page
    // is either identity-dependent or cheap to render.
    let cached_routes = Router::new().route("/", get(index));

    let cached_routes = if let Some(cache_state) = cache {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let routes = Router::new()
        .route("/group/{slug}/", get(group_index))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(post_edit_form).post(post_edit))
        .route("/posts/{id}/comment/", post(add_comment))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/follow/", get(follow_index))
        .route("/_health/db", get(public_health))
        .fallback(fallback);

    cached_routes
        .merge(routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(identity, resolve_identity))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> PageNumber {
        PageNumber::from_query(self.page.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    text: String,
    group_id: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    text: String,
}

/// Resolve the signed-in user or produce the login redirect for `next_path`.
fn require_user(
    identity: &RequestIdentity,
    login_url: &str,
    next_path: &str,
) -> Result<UserRecord, Response> {
    match identity.user() {
        Some(user) => Ok(user.clone()),
        None => Err(login_redirect(login_url, next_path)),
    }
}

fn listing_error_response(err: ListingError, layout: LayoutContext) -> Response {
    match err {
        ListingError::UnknownGroup | ListingError::UnknownProfile => {
            render_not_found_response(layout)
        }
        ListingError::Repo(repo) => {
            repo_error_to_http("infra::http::public::listing", repo).into_response()
        }
    }
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    // Served from a shared cache entry, so the page renders without
    // viewer-specific chrome.
    let layout = LayoutContext::new("Piazza", None);

    match state.listing.home_page(query.number()).await {
        Ok(page) => render_template_response(
            IndexTemplate {
                layout,
                listing: ListingContext::from_page(&page),
            },
            StatusCode::OK,
        ),
        Err(err) => listing_error_response(err, layout),
    }
}

async fn group_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    match state.listing.group_page(&slug, query.number()).await {
        Ok(listing) => {
            let layout = LayoutContext::new(listing.group.title.clone(), identity.user());
            render_template_response(
                GroupTemplate {
                    layout,
                    group: GroupHeaderView::from(&listing.group),
                    listing: ListingContext::from_page(&listing.page),
                },
                StatusCode::OK,
            )
        }
        Err(err) => {
            let layout = LayoutContext::new("Piazza", identity.user());
            listing_error_response(err, layout)
        }
    }
}

async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let viewer_id = identity.user().map(|user| user.id);

    match state
        .profiles
        .view(&username, viewer_id, query.number())
        .await
    {
        Ok(view) => {
            let layout = LayoutContext::new(
                view.snapshot.user.username.clone(),
                identity.user(),
            );
            render_template_response(
                ProfileTemplate {
                    layout,
                    profile: ProfileHeaderView::new(&view.snapshot, identity.user()),
                    listing: ListingContext::from_page(&view.page),
                },
                StatusCode::OK,
            )
        }
        Err(ProfileError::UnknownProfile) => {
            render_not_found_response(LayoutContext::new("Piazza", identity.user()))
        }
        Err(ProfileError::Repo(err)) => {
            repo_error_to_http("infra::http::public::profile", err).into_response()
        }
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let layout = LayoutContext::new("Piazza", identity.user());
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(layout);
    };

    match state.posts.detail(post_id).await {
        Ok(item) => render_detail_page(&state, item, &identity, Vec::new()).await,
        Err(PostServiceError::NotFound) => render_not_found_response(layout),
        Err(PostServiceError::Repo(err)) => {
            repo_error_to_http("infra::http::public::post_detail", err).into_response()
        }
    }
}

/// Render the detail page, optionally carrying comment form errors from a
/// failed submission.
async fn render_detail_page(
    state: &HttpState,
    item: PostWithRelations,
    identity: &RequestIdentity,
    comment_errors: Vec<FieldError>,
) -> Response {
    let comments = match state.comments.list_for_post(item.post.id).await {
        Ok(comments) => comments,
        Err(CommentServiceError::Repo(err)) => {
            return repo_error_to_http("infra::http::public::post_detail", err).into_response();
        }
        Err(CommentServiceError::PostNotFound) => {
            return render_not_found_response(LayoutContext::new("Piazza", identity.user()));
        }
    };

    let author_post_count = match state
        .posts_repo
        .count_posts(PostScope::Author(item.post.author_id))
        .await
    {
        Ok(count) => count,
        Err(err) => {
            return repo_error_to_http("infra::http::public::post_detail", err).into_response();
        }
    };

    let can_edit = identity
        .user()
        .is_some_and(|user| user.id == item.post.author_id);

    render_template_response(
        PostDetailTemplate {
            layout: LayoutContext::new("Piazza", identity.user()),
            post: PostCard::from(&item),
            author_post_count,
            can_edit,
            can_comment: identity.user().is_some(),
            comments: comments.iter().map(CommentView::from).collect(),
            comment_errors: comment_errors.iter().map(FieldErrorView::from).collect(),
        },
        StatusCode::OK,
    )
}

async fn group_options(
    state: &HttpState,
    selected: Option<&str>,
) -> Result<Vec<crate::presentation::views::GroupOptionView>, Response> {
    match state.groups.list_groups().await {
        Ok(groups) => Ok(PostFormView::groups_from(&groups, selected)),
        Err(err) => {
            Err(repo_error_to_http("infra::http::public::post_form", err).into_response())
        }
    }
}

fn parse_group_id(raw: Option<&str>) -> Result<Option<Uuid>, FieldError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value).map(Some).map_err(|_| FieldError {
            field: "group_id",
            message: "Select a valid group.".to_string(),
        }),
    }
}

async fn post_create_form(
    State(state): State<HttpState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let user = match require_user(&identity, &state.login_url, "/create/") {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let groups = match group_options(&state, None).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    render_template_response(
        PostFormTemplate {
            layout: LayoutContext::new("New post", Some(&user)),
            form: PostFormView {
                heading: "New post".to_string(),
                action: "/create/".to_string(),
                text: String::new(),
                image_url: String::new(),
                groups,
                errors: Vec::new(),
            },
        },
        StatusCode::OK,
    )
}

async fn post_create(
    State(state): State<HttpState>,
    Extension(identity): Extension<RequestIdentity>,
    Form(form): Form<PostForm>,
) -> Response {
    let user = match require_user(&identity, &state.login_url, "/create/") {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let (group_id, mut errors) = match parse_group_id(form.group_id.as_deref()) {
        Ok(group_id) => (group_id, Vec::new()),
        Err(err) => (None, vec![err]),
    };

    if errors.is_empty() {
        let input = PostInput {
            text: form.text.clone(),
            group_id,
            image_url: form.image_url.clone(),
        };
        match state.posts.create(&user, input).await {
            Ok(CreateOutcome::Created(_)) => {
                return Redirect::to(&format!("/profile/{}/", user.username)).into_response();
            }
            Ok(CreateOutcome::Invalid(validation_errors)) => errors = validation_errors,
            Err(err) => {
                return repo_error_to_http("infra::http::public::post_create", err)
                    .into_response();
            }
        }
    }

    let groups = match group_options(&state, form.group_id.as_deref()).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    render_template_response(
        PostFormTemplate {
            layout: LayoutContext::new("New post", Some(&user)),
            form: PostFormView {
                heading: "New post".to_string(),
                action: "/create/".to_string(),
                text: form.text,
                image_url: form.image_url.unwrap_or_default(),
                groups,
                errors: errors.iter().map(FieldErrorView::from).collect(),
            },
        },
        StatusCode::OK,
    )
}

async fn post_edit_form(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let next_path = format!("/posts/{id}/edit/");
    let user = match require_user(&identity, &state.login_url, &next_path) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let layout = LayoutContext::new("Edit post", Some(&user));
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(layout);
    };

    let item = match state.posts.detail(post_id).await {
        Ok(item) => item,
        Err(PostServiceError::NotFound) => return render_not_found_response(layout),
        Err(PostServiceError::Repo(err)) => {
            return repo_error_to_http("infra::http::public::post_edit", err).into_response();
        }
    };

    // Anyone but the author is silently sent back to the detail page.
    if item.post.author_id != user.id {
        return Redirect::to(&format!("/posts/{post_id}/")).into_response();
    }

    let selected = item.post.group_id.map(|group_id| group_id.to_string());
    let groups = match group_options(&state, selected.as_deref()).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    render_template_response(
        PostFormTemplate {
            layout,
            form: PostFormView {
                heading: "Edit post".to_string(),
                action: format!("/posts/{post_id}/edit/"),
                text: item.post.text,
                image_url: item.post.image_url.unwrap_or_default(),
                groups,
                errors: Vec::new(),
            },
        },
        StatusCode::OK,
    )
}

async fn post_edit(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
    Form(form): Form<PostForm>,
) -> Response {
    let next_path = format!("/posts/{id}/edit/");
    let user = match require_user(&identity, &state.login_url, &next_path) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let layout = LayoutContext::new("Edit post", Some(&user));
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(layout);
    };

    let (group_id, parse_errors) = match parse_group_id(form.group_id.as_deref()) {
        Ok(group_id) => (group_id, Vec::new()),
        Err(err) => (None, vec![err]),
    };

    let errors = if parse_errors.is_empty() {
        let input = PostInput {
            text: form.text.clone(),
            group_id,
            image_url: form.image_url.clone(),
        };
        match state.posts.edit(&user, post_id, input).await {
            Ok(EditOutcome::Updated(_)) | Ok(EditOutcome::NotAuthor { .. }) => {
                return Redirect::to(&format!("/posts/{post_id}/")).into_response();
            }
            Ok(EditOutcome::Invalid { errors, .. }) => errors,
            Err(PostServiceError::NotFound) => return render_not_found_response(layout),
            Err(PostServiceError::Repo(err)) => {
                return repo_error_to_http("infra::http::public::post_edit", err)
                    .into_response();
            }
        }
    } else {
        parse_errors
    };

    let groups = match group_options(&state, form.group_id.as_deref()).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    render_template_response(
        PostFormTemplate {
            layout,
            form: PostFormView {
                heading: "Edit post".to_string(),
                action: format!("/posts/{post_id}/edit/"),
                text: form.text,
                image_url: form.image_url.unwrap_or_default(),
                groups,
                errors: errors.iter().map(FieldErrorView::from).collect(),
            },
        },
        StatusCode::OK,
    )
}

async fn add_comment(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
    Form(form): Form<CommentForm>,
) -> Response {
    let next_path = format!("/posts/{id}/");
    let user = match require_user(&identity, &state.login_url, &next_path) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let layout = LayoutContext::new("Piazza", Some(&user));
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(layout);
    };

    let input = CommentInput { text: form.text };
    match state.comments.add(&user, post_id, input).await {
        Ok(CommentOutcome::Created(_)) => {
            Redirect::to(&format!("/posts/{post_id}/")).into_response()
        }
        Ok(CommentOutcome::Invalid(errors)) => {
            // Re-render the detail page with the form errors inline.
            match state.posts.detail(post_id).await {
                Ok(item) => render_detail_page(&state, item, &identity, errors).await,
                Err(PostServiceError::NotFound) => render_not_found_response(layout),
                Err(PostServiceError::Repo(err)) => {
                    repo_error_to_http("infra::http::public::add_comment", err).into_response()
                }
            }
        }
        Err(CommentServiceError::PostNotFound) => render_not_found_response(layout),
        Err(CommentServiceError::Repo(err)) => {
            repo_error_to_http("infra::http::public::add_comment", err).into_response()
        }
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let user = match require_user(&identity, &state.login_url, "/follow/") {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    match state.listing.following_page(user.id, query.number()).await {
        Ok(page) => render_template_response(
            FollowTemplate {
                layout: LayoutContext::new("My feed", Some(&user)),
                listing: ListingContext::from_page(&page),
            },
            StatusCode::OK,
        ),
        Err(err) => listing_error_response(err, LayoutContext::new("My feed", Some(&user))),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let requested = format!("/profile/{username}/follow/");
    let user = match require_user(&identity, &state.login_url, &requested) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let profile_path = format!("/profile/{username}/");
    match state.follows.follow(&user, &username).await {
        // Self-follow and duplicate follow fall through to the same
        // redirect; neither changed anything.
        Ok(_) => Redirect::to(&profile_path).into_response(),
        Err(FollowServiceError::UnknownProfile | FollowServiceError::EdgeNotFound) => {
            render_not_found_response(LayoutContext::new("Piazza", Some(&user)))
        }
        Err(FollowServiceError::Repo(err)) => {
            repo_error_to_http("infra::http::public::profile_follow", err).into_response()
        }
    }
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let requested = format!("/profile/{username}/unfollow/");
    let user = match require_user(&identity, &state.login_url, &requested) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let profile_path = format!("/profile/{username}/");
    match state.follows.unfollow(&user, &username).await {
        Ok(_) => Redirect::to(&profile_path).into_response(),
        Err(FollowServiceError::UnknownProfile) | Err(FollowServiceError::EdgeNotFound) => {
            render_not_found_response(LayoutContext::new("Piazza", Some(&user)))
        }
        Err(FollowServiceError::Repo(err)) => {
            repo_error_to_http("infra::http::public::profile_unfollow", err).into_response()
        }
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback(Extension(identity): Extension<RequestIdentity>) -> Response {
    render_not_found_response(LayoutContext::new("Piazza", identity.user()))
}
