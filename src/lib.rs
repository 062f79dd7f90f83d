//! # Bookmeta
//!
//! **Bookmeta** aggregates bibliographic metadata from several independent
//! catalogs, tolerating the failure or slowness of any one of them.
//!
//! ## Overview
//!
//! - **Provider contract**: every catalog implements [`MetadataProvider`]
//! - **Registry**: append-only, concurrently readable [`ProviderRegistry`]
//! - **Aggregator**: concurrent fan-out with per-provider fault isolation and
//!   deterministic, priority-ordered output ([`MetadataAggregator`])
//! - **Merge**: field-level reduction of candidates into one record ([`merge_metadata`])
//! - **Adapters**: bundled Google Books and Open Library providers
//!
//! ## Flow
//!
//! ```text
//! caller -> MetadataAggregator -> ProviderRegistry (enabled, by priority)
//!                              -> one task per provider (deadline-bounded)
//!                              -> slot array -> list | best | merged
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bookmeta::prelude::*;
//!
//! # async fn example() -> BookmetaResult<()> {
//! let config = MetadataConfig::default().with_env_overrides();
//! let aggregator = create_aggregator(&config)?;
//!
//! let candidates = aggregator.find_by_isbn_from_all_providers("978-0-441-01359-3").await;
//! let merged = aggregator.merge_metadata(&candidates);
//!
//! for status in aggregator.test_all_providers().await {
//!     println!("{}: connected={}", status.provider_name, status.connected);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
mod aggregator;
mod config;
mod error;
mod facade;
pub mod isbn;
mod merge;
mod model;
mod provider;
mod registry;

pub mod prelude;

// Re-export core types
pub use adapters::{GoogleBooksProvider, OpenLibraryProvider};
pub use aggregator::{select_best, MetadataAggregator};
pub use config::{
    AggregatorConfig, Config, FileConfig, MetadataConfig, ProviderSettings,
    GOOGLE_BOOKS_API_KEY_ENV,
};
pub use error::{
    BookmetaError, BookmetaResult, ConfigError, InputError, ProbeError, ProviderError,
    ProviderResult, RegistryError, RegistryResult,
};
pub use facade::{create_aggregator, create_aggregator_with_registry, create_default_registry};
pub use merge::merge_metadata;
pub use model::{
    AuthorMetadata, BookMetadata, Classification, CoverImages, ExternalIds, PhysicalAttributes,
    ProviderStatus,
};
pub use provider::{MetadataProvider, ProviderExt};
pub use registry::{ProviderRegistry, RegistryBuilder, SharedProvider};

// Re-export async-trait for convenience
pub use async_trait::async_trait;
