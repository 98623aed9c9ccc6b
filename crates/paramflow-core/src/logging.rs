//! Tracing subscriber setup for binaries, benches and tests embedding the pipeline.

use tracing_subscriber::EnvFilter;

use crate::config::env_vars;

const DEFAULT_FILTER: &str = "paramflow=info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable compact lines for development
    #[default]
    Compact,
    /// JSON lines for production/container environments
    Json,
}

impl LogFormat {
    /// `Json` when `PARAMFLOW_LOG_JSON` is truthy, otherwise `Compact`.
    pub fn from_env() -> Self {
        let json = std::env::var(env_vars::LOG_JSON)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);
        if json {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_target(true)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .try_init(),
    }
}

/// Subscriber for test runs; output is captured per test and double init is ignored.
pub fn try_init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}
