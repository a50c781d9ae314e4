use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "plume_cache_hit_total",
            Unit::Count,
            "Total number of content cache hits."
        );
        describe_counter!(
            "plume_cache_miss_total",
            Unit::Count,
            "Total number of content cache misses, expired entries included."
        );
        describe_counter!(
            "plume_cache_expired_total",
            Unit::Count,
            "Total number of entries evicted lazily after their TTL elapsed."
        );
        describe_counter!(
            "plume_cache_invalidate_total",
            Unit::Count,
            "Total number of invalidation calls, labelled by scope."
        );
        describe_counter!(
            "plume_auth_denied_total",
            Unit::Count,
            "Total number of requests rejected by the authorization pipeline, labelled by stage."
        );
        describe_histogram!(
            "plume_content_page_fetch_ms",
            Unit::Milliseconds,
            "Latency of uncached page fetches (count and slice issued concurrently)."
        );
    });
}
