//! Cache configuration.
//!
//! Controls the page cache via `piazza.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_HOME_TTL_SECONDS: u64 = 20;
const DEFAULT_RESPONSE_LIMIT: usize = 16;

/// Cache configuration from `piazza.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the page cache.
    pub enabled: bool,
    /// How long a cached home page stays valid, in seconds.
    pub home_ttl_seconds: u64,
    /// Maximum cached responses held at once.
    pub response_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            home_ttl_seconds: DEFAULT_HOME_TTL_SECONDS,
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            home_ttl_seconds: settings.home_ttl_seconds,
            response_limit: settings.response_limit,
        }
    }
}

impl CacheConfig {
    pub fn home_ttl(&self) -> Duration {
        Duration::from_secs(self.home_ttl_seconds)
    }

    /// Returns the response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.home_ttl_seconds, 20);
        assert_eq!(config.response_limit, 16);
    }

    #[test]
    fn home_ttl_in_seconds() {
        let config = CacheConfig {
            home_ttl_seconds: 5,
            ..Default::default()
        };
        assert_eq!(config.home_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            response_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.response_limit_non_zero().get(), 1);
    }
}
