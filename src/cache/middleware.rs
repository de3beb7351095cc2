//! Response cache middleware for the home feed.
//!
//! Serves a cached copy of `GET /` for the TTL window. Identity has no
//! bearing on the listing body, so all visitors share one entry. Requests
//! with a query string (page navigation) bypass the cache.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::{CacheConfig, PageCache, keys::PageKey, store::CachedResponse};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub cache: Arc<PageCache>,
}

fn bypasses_cache(config: &CacheConfig, request: &Request<Body>) -> bool {
    !config.enabled || request.method() != Method::GET || request.uri().query().is_some()
}

/// Serve query-less GET requests from the page cache, storing fresh 200
/// responses on the way out.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Deep pages are rare and cheap to render; only the default page shares
    // an entry.
    if bypasses_cache(&cache.config, &request) {
        return next.run(request).await;
    }

    let key = PageKey::Home;
    if let Some(hit) = cache.cache.get(&key) {
        counter!("piazza_page_cache_hit_total", "page" => key.label()).increment(1);
        debug!(page = key.label(), outcome = "hit", "serving cached page");
        return rebuild(hit);
    }

    counter!("piazza_page_cache_miss_total", "page" => key.label()).increment(1);
    debug!(page = key.label(), outcome = "miss", "rendering page");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    store_and_forward(&cache, key, response).await
}

/// Buffer the rendered body, remember it for the TTL, and hand the bytes
/// back to the client unchanged.
async fn store_and_forward(cache: &CacheState, key: PageKey, response: Response) -> Response {
    let (parts, body) = response.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    cache.cache.set(
        key,
        CachedResponse {
            status: parts.status.as_u16(),
            headers,
            body: bytes.clone(),
        },
        cache.config.home_ttl(),
    );
    debug!(page = key.label(), "cached rendered page");

    Response::from_parts(parts, Body::from(bytes))
}

fn rebuild(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
