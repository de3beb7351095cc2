//! Request-scoped context and response logging.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics::counter;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::auth::RequestIdentity;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with a fresh id and mirror it onto the response so log
/// lines and upstream traces can be correlated.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

struct FailureDetails {
    source: &'static str,
    detail: String,
    chain: Vec<String>,
}

impl FailureDetails {
    fn from_response(response: &mut Response) -> Self {
        match response.extensions_mut().remove::<ErrorReport>() {
            Some(report) => {
                let detail = report
                    .messages
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "no diagnostic available".to_string());
                Self {
                    source: report.source,
                    detail,
                    chain: report.messages,
                }
            }
            None => Self {
                source: "unknown",
                detail: "no diagnostic available".to_string(),
                chain: Vec::new(),
            },
        }
    }
}

/// Count every response and log failed ones with the diagnostic report the
/// handler attached. Runs after identity resolution so failures carry the
/// acting username.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let username = request
        .extensions()
        .get::<RequestIdentity>()
        .and_then(|identity| identity.user())
        .map(|user| user.username.clone())
        .unwrap_or_default();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    let class = match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    counter!("piazza_http_responses_total", "class" => class).increment(1);

    if status.is_client_error() || status.is_server_error() {
        let details = FailureDetails::from_response(&mut response);
        let elapsed_ms = started.elapsed().as_millis();

        if status.is_server_error() {
            error!(
                target = "piazza::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms,
                source = details.source,
                detail = %details.detail,
                chain = ?details.chain,
                request_id,
                username,
                "request failed",
            );
        } else {
            warn!(
                target = "piazza::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms,
                source = details.source,
                detail = %details.detail,
                chain = ?details.chain,
                request_id,
                username,
                "client request error",
            );
        }
    }

    response
}
