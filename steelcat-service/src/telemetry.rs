//! Tracing subscriber initialization.

use std::str::FromStr;

use steelcat_core::{CatalogError, CatalogResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `STEELCAT_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "steelcat_storage=info,steelcat_service=info,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(CatalogError::invalid_value(
                "log_format",
                format!("expected json or pretty, got {:?}", other),
            )),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive string
    pub filter: String,
    pub format: LogFormat,
    /// Service name attached to the startup event
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
            service_name: "steelcat".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Load from `STEELCAT_LOG`, `STEELCAT_LOG_FORMAT` and `STEELCAT_SERVICE_NAME`.
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            filter: std::env::var("STEELCAT_LOG")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.filter),
            format: std::env::var("STEELCAT_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.format),
            service_name: std::env::var("STEELCAT_SERVICE_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.service_name),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails instead of replacing the
/// subscriber already in place.
pub fn init_tracing(config: &TelemetryConfig) -> CatalogResult<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    installed.map_err(|e| {
        CatalogError::invalid_value("tracing", format!("Failed to init subscriber: {}", e))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        format = ?config.format,
        filter = %config.filter,
        "Telemetry initialized"
    );
    Ok(())
}
