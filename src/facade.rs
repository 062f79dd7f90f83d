//! Factory functions wiring configuration, bundled providers and the aggregator.

use std::sync::Arc;

use tracing::info;

use crate::adapters::{GoogleBooksProvider, OpenLibraryProvider};
use crate::aggregator::MetadataAggregator;
use crate::config::{Config, MetadataConfig};
use crate::error::{BookmetaResult, ConfigError};
use crate::registry::ProviderRegistry;

/// Build a registry holding the bundled Google Books and Open Library providers.
///
/// Both are registered even when disabled, so the connectivity probe can report
/// on them.
pub fn create_default_registry(config: &MetadataConfig) -> BookmetaResult<ProviderRegistry> {
    let limit = config.aggregator.search_limit;
    let registry = ProviderRegistry::new();
    registry.register(GoogleBooksProvider::new(&config.google_books)?.with_search_limit(limit));
    registry.register(OpenLibraryProvider::new(&config.open_library)?.with_search_limit(limit));
    Ok(registry)
}

/// Validate `config` and create an aggregator over the bundled providers.
///
/// # Example
///
/// ```rust,no_run
/// use bookmeta::{create_aggregator, MetadataConfig};
///
/// # async fn example() -> Result<(), bookmeta::BookmetaError> {
/// let aggregator = create_aggregator(&MetadataConfig::default().with_env_overrides())?;
/// let best = aggregator.get_best_metadata_by_isbn("978-0-441-01359-3").await;
/// # Ok(())
/// # }
/// ```
pub fn create_aggregator(config: &MetadataConfig) -> BookmetaResult<MetadataAggregator> {
    config.validate().map_err(ConfigError::Invalid)?;
    let registry = create_default_registry(config)?;
    info!(
        config = config.name(),
        provider_timeout = ?config.timeout(),
        providers = ?registry.provider_ids(),
        enabled = registry.enabled_providers().len(),
        "Metadata aggregator ready"
    );
    Ok(create_aggregator_with_registry(registry, config))
}

/// Create an aggregator over a caller-built registry.
pub fn create_aggregator_with_registry(
    registry: ProviderRegistry,
    config: &MetadataConfig,
) -> MetadataAggregator {
    MetadataAggregator::new(Arc::new(registry), config.aggregator.clone())
}
