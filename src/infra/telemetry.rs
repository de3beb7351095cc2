//! Tracing and metrics bootstrap.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static DESCRIBE_ONCE: Once = Once::new();

/// Install the global subscriber: env-filtered, with span-trace capture for
/// error context, formatted per the logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    register_metric_descriptions();

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let install = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .boxed(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true).boxed())
            .try_init(),
    };

    install.map_err(|err| InfraError::telemetry(format!("subscriber install failed: {err}")))
}

fn register_metric_descriptions() {
    DESCRIBE_ONCE.call_once(|| {
        describe_counter!(
            "piazza_page_cache_hit_total",
            Unit::Count,
            "Home-page responses served from the page cache."
        );
        describe_counter!(
            "piazza_page_cache_miss_total",
            Unit::Count,
            "Home-page requests that fell through to the handler."
        );
        describe_counter!(
            "piazza_http_responses_total",
            Unit::Count,
            "HTTP responses by status class."
        );
    });
}
