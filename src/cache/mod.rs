//! Page cache for rendered listing responses.
//!
//! Stores complete rendered responses for high-traffic listing pages and
//! serves them until a fixed TTL expires. Mutations never invalidate
//! entries; staleness up to the TTL is accepted behavior.

pub mod config;
pub mod keys;
mod lock;
pub mod middleware;
pub mod store;

pub use config::CacheConfig;
pub use keys::PageKey;
pub use middleware::{CacheState, response_cache_layer};
pub use store::{CachedResponse, PageCache};
