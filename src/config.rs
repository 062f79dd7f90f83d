//! Configuration for the aggregator and the bundled provider adapters.
//!
//! Configuration is read from TOML. Every field has a default, so an empty file
//! (or no file at all) yields a usable setup. Google Books stays out of queries
//! until an API key is supplied, either in the file or through
//! `BOOKMETA_GOOGLE_BOOKS_API_KEY`.
//!
//! ```toml
//! [aggregator]
//! provider_timeout_ms = 8000
//!
//! [google_books]
//! api_key = "..."
//! priority = 10
//!
//! [open_library]
//! priority = 20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that overrides the Google Books API key.
pub const GOOGLE_BOOKS_API_KEY_ENV: &str = "BOOKMETA_GOOGLE_BOOKS_API_KEY";

/// Base trait for configuration sections.
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Returns the timeout duration, if configured.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Validates the configuration.
    ///
    /// Returns Ok(()) if valid, or an error message describing the issue.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Trait for configurations that support file-based loading.
pub trait FileConfig: Config {
    /// Load configuration from a file path.
    fn from_file(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized;
}

/// Settings for the fan-out engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Deadline for a single provider call. Late results are discarded.
    pub provider_timeout_ms: u64,
    /// Deadline for a single connectivity probe.
    pub probe_timeout_ms: u64,
    /// Maximum candidates requested from each provider on title searches.
    pub search_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 10_000,
            probe_timeout_ms: 5_000,
            search_limit: 10,
        }
    }
}

impl AggregatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Config for AggregatorConfig {
    fn name(&self) -> &str {
        "aggregator"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.provider_timeout())
    }

    fn validate(&self) -> Result<(), String> {
        if self.provider_timeout_ms == 0 {
            return Err("provider_timeout_ms must be greater than 0".to_string());
        }
        if self.probe_timeout_ms == 0 {
            return Err("probe_timeout_ms must be greater than 0".to_string());
        }
        if self.search_limit == 0 {
            return Err("search_limit must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Settings for one bundled provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,
    /// Overrides the adapter's built-in priority.
    pub priority: Option<i32>,
    pub api_key: Option<String>,
    /// Overrides the public endpoint, e.g. for a proxy or a test server.
    pub base_url: Option<String>,
    /// HTTP timeout enforced by the adapter itself.
    pub timeout_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: None,
            api_key: None,
            base_url: None,
            timeout_ms: 10_000,
        }
    }
}

impl ProviderSettings {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Configured priority, or the adapter's own default.
    pub fn priority_or(&self, default: i32) -> i32 {
        self.priority.unwrap_or(default)
    }

    /// API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl Config for ProviderSettings {
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.timeout_ms))
    }

    fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        if let Some(priority) = self.priority.filter(|p| *p < 0) {
            return Err(format!("priority must not be negative, got {priority}"));
        }
        Ok(())
    }
}

/// Complete configuration: engine settings plus one section per bundled adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub aggregator: AggregatorConfig,
    pub google_books: ProviderSettings,
    pub open_library: ProviderSettings,
}

impl MetadataConfig {
    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(GOOGLE_BOOKS_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.google_books.api_key = Some(key);
        }
        self
    }
}

impl Config for MetadataConfig {
    fn name(&self) -> &str {
        "bookmeta"
    }

    fn timeout(&self) -> Option<Duration> {
        self.aggregator.timeout()
    }

    fn validate(&self) -> Result<(), String> {
        self.aggregator
            .validate()
            .map_err(|e| format!("{}: {e}", self.aggregator.name()))?;
        self.google_books
            .validate()
            .map_err(|e| format!("google_books: {e}"))?;
        self.open_library
            .validate()
            .map_err(|e| format!("open_library: {e}"))?;
        Ok(())
    }
}

impl FileConfig for MetadataConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
