//! Cache key types.

/// Identifies a cached rendered page.
///
/// Only the first page of the home feed is cached; `?page=` requests beyond
/// page one bypass the cache entirely, so one key per page suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    Home,
}

impl PageKey {
    /// Label for log lines and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PageKey::Home => "home",
        }
    }
}
