//! Cache configuration.

use std::time::Duration;

/// Configuration for the consistency cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Perform a full reload during startup.
    pub warm_on_start: bool,
    /// Period of the background full reload. `None` disables it.
    pub refresh_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            warm_on_start: true,
            refresh_interval: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// - `STEELCAT_CACHE_WARM_ON_START`: `false` skips the startup reload
    /// - `STEELCAT_CACHE_REFRESH_SECS`: periodic reload interval, `0` disables
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let warm_on_start = std::env::var("STEELCAT_CACHE_WARM_ON_START")
            .ok()
            .map(|s| s.trim().to_lowercase() != "false")
            .unwrap_or(true);

        let refresh_interval = std::env::var("STEELCAT_CACHE_REFRESH_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            warm_on_start,
            refresh_interval,
        }
    }

    /// Enable or disable the startup reload.
    pub fn with_warm_on_start(mut self, enabled: bool) -> Self {
        self.warm_on_start = enabled;
        self
    }

    /// Set the periodic reload interval. A zero duration disables it.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval).filter(|d| !d.is_zero());
        self
    }
}
