//! Logging Setup
//!
//! tracing-subscriber initialization. An explicit `RUST_LOG` wins; otherwise
//! the configured level becomes the default filter directive.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LoggingSettings;

/// Install the global tracing subscriber. Called once from `main`.
pub fn init(settings: &LoggingSettings) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    if settings.json {
        Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
