//! Identity resolution from the external identity service.
//!
//! Authentication itself lives outside this system. A trusted fronting
//! proxy asserts the caller's username in a configured header; this
//! middleware mirrors the identity into a local user row and attaches it to
//! the request. An absent or malformed header is an anonymous request, not
//! an error.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;
use url::Url;

use crate::application::error::ErrorReport;
use crate::application::repos::UsersRepo;
use crate::domain::entities::UserRecord;

/// The resolved identity for the current request.
#[derive(Clone, Default)]
pub struct RequestIdentity {
    pub user: Option<UserRecord>,
}

impl RequestIdentity {
    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }
}

#[derive(Clone)]
pub struct IdentityState {
    pub users: Arc<dyn UsersRepo>,
    pub identity_header: String,
    pub login_url: String,
}

/// Resolve the asserted identity and attach a [`RequestIdentity`] extension.
pub async fn resolve_identity(
    State(state): State<IdentityState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let asserted = request
        .headers()
        .get(state.identity_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && is_valid_username(value))
        .map(str::to_string);

    let identity = match asserted {
        Some(username) => match state.users.upsert_user(&username).await {
            Ok(user) => RequestIdentity { user: Some(user) },
            Err(err) => {
                // A broken identity mirror must not take the public pages
                // down with it; the request proceeds anonymously.
                warn!(
                    target = "piazza::http::auth",
                    username = %username,
                    error = %err,
                    "failed to mirror asserted identity",
                );
                RequestIdentity::default()
            }
        },
        None => RequestIdentity::default(),
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn is_valid_username(value: &str) -> bool {
    value.len() <= 150
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | '+'))
}

/// Redirect an anonymous request to the login page, carrying the original
/// path so the identity service can send the visitor back.
pub fn login_redirect(login_url: &str, next_path: &str) -> Response {
    match Url::parse(login_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("next", next_path);
            Redirect::to(url.as_str()).into_response()
        }
        // Relative login URLs cannot go through `Url`; fall back to manual
        // assembly with the path percent-escaped by the form encoder.
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let encoded: String =
                url::form_urlencoded::byte_serialize(next_path.as_bytes()).collect();
            Redirect::to(&format!("{login_url}?next={encoded}")).into_response()
        }
        Err(err) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(
                "infra::http::login_redirect",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert!(is_valid_username("leo"));
        assert!(is_valid_username("user_1.name-2@host+x"));
    }

    #[test]
    fn rejects_control_and_whitespace() {
        assert!(!is_valid_username("two words"));
        assert!(!is_valid_username("tab\tname"));
        assert!(!is_valid_username(&"x".repeat(151)));
    }

    #[test]
    fn login_redirect_absolute_url_carries_next() {
        let response = login_redirect("https://id.example.com/login", "/create/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert_eq!(location, "https://id.example.com/login?next=%2Fcreate%2F");
    }

    #[test]
    fn login_redirect_relative_url_carries_next() {
        let response = login_redirect("/auth/login/", "/posts/abc/edit/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert_eq!(location, "/auth/login/?next=%2Fposts%2Fabc%2Fedit%2F");
    }
}
