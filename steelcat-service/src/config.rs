//! Service configuration.

use steelcat_storage::CacheConfig;

use crate::telemetry::TelemetryConfig;

/// Everything the service reads from its environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// See [`CacheConfig::from_env`] and [`TelemetryConfig::from_env`] for the
    /// variables read.
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}
