//! Error types for bookmeta.

use thiserror::Error;

/// Root error type for bookmeta operations.
#[derive(Error, Debug)]
pub enum BookmetaError {
    /// Provider-related errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Registry-related errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors a provider adapter reports from a data query or connectivity test.
///
/// The aggregator never lets these escape: a failed provider simply contributes
/// nothing to the aggregate result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure talking to the remote catalog
    #[error("Network error: {0}")]
    Network(String),

    /// The remote catalog answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote catalog throttled the request
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// Timeout during provider operation
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Provider configuration error
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// Any other provider failure
    #[error("Provider execution failed: {0}")]
    ExecutionFailed(String),
}

/// A connectivity probe that could not complete normally.
///
/// Rendered into `ProviderStatus::error`, never returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Connection test panicked")]
    Panicked,

    #[error("Connection test timed out after {0}ms")]
    TimedOut(u64),
}

/// Malformed lookup input, handled by short-circuiting to an empty result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("ISBN is blank")]
    BlankIsbn,

    #[error("Title is blank")]
    BlankTitle,

    #[error("Provider identifier is blank")]
    BlankProviderId,
}

/// Errors that can occur in registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Provider already registered with this id
    #[error("Provider already registered: {0}")]
    AlreadyRegistered(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

impl From<String> for ProviderError {
    fn from(msg: String) -> Self {
        ProviderError::ExecutionFailed(msg)
    }
}

impl From<&str> for ProviderError {
    fn from(msg: &str) -> Self {
        ProviderError::ExecutionFailed(msg.to_string())
    }
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for general bookmeta operations.
pub type BookmetaResult<T> = Result<T, BookmetaError>;
