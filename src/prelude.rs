//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! from bookmeta for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use bookmeta::prelude::*;
//! ```

// Configuration
pub use crate::config::{AggregatorConfig, Config, FileConfig, MetadataConfig, ProviderSettings};

// Core traits
pub use crate::provider::{MetadataProvider, ProviderExt};

// Registry and aggregation
pub use crate::aggregator::MetadataAggregator;
pub use crate::facade::{create_aggregator, create_aggregator_with_registry};
pub use crate::merge::merge_metadata;
pub use crate::registry::{ProviderRegistry, RegistryBuilder, SharedProvider};

// Value objects
pub use crate::model::{AuthorMetadata, BookMetadata, ProviderStatus};

// Errors
pub use crate::error::{
    BookmetaError, BookmetaResult, ProviderError, ProviderResult, RegistryError, RegistryResult,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
