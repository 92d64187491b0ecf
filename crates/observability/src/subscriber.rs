//! Subscriber installation.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "PHARMACY_LOG_FORMAT";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event (production).
    #[default]
    Json,
    /// Human-readable multi-line output (local runs).
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(ENV_LOG_FORMAT).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "pretty" || v == "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Install the global subscriber. The filter comes from `RUST_LOG`
/// (default `info`). Only the first call has an effect; it returns whether
/// this call installed the subscriber.
pub fn init(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let installed = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(?format, "tracing subscriber installed");
            true
        }
        Err(_) => {
            tracing::debug!(?format, "tracing subscriber already installed, keeping it");
            false
        }
    }
}
