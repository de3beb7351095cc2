//! Poison-tolerant lock helpers for the page cache.
//!
//! A panic while holding the cache lock must not wedge every later request;
//! cached pages are disposable, so recovering the guard is always safe.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(
            target = "piazza::cache",
            source,
            op,
            kind = "read",
            "recovered poisoned page cache lock"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(
            target = "piazza::cache",
            source,
            op,
            kind = "write",
            "recovered poisoned page cache lock"
        );
        poisoned.into_inner()
    })
}
