//! Subscriber setup for binaries and tests that embed the planner.

use crate::errors::DeployflowError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,deployflow=info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs a global subscriber filtered by `RUST_LOG`.
///
/// # Errors
///
/// Returns [`DeployflowError::Config`] if a global subscriber is already set.
pub fn init_logging(format: LogFormat) -> Result<(), DeployflowError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let layer = match format {
        LogFormat::Compact => fmt::layer().with_target(false).compact().boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).pretty().boxed(),
        LogFormat::Json => fmt::layer().with_target(true).json().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| DeployflowError::Config(format!("logging already initialised: {e}")))
}
