// Logging setup (pretty for terminals, JSON for shipping)

use crate::telemetry;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "LIVEQUEUE_LOG_FORMAT";
pub const DEFAULT_FILTER: &str = "livequeue=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber; logs go to stderr so stdout stays a clean table
pub fn init_logging() -> Result<()> {
    let format = LogFormat::parse(&std::env::var(LOG_FORMAT_ENV).unwrap_or_default());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let otel = telemetry::otel_layer().unwrap_or_else(|e| {
        eprintln!("Failed to initialize OpenTelemetry (continuing without it): {e:#}");
        None
    });

    let registry = tracing_subscriber::registry().with(otel).with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}
