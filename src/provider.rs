//! The provider contract every bibliographic source implements.
//!
//! A `MetadataProvider` wraps one external catalog. Providers are registered in a
//! [`ProviderRegistry`](crate::ProviderRegistry) and queried concurrently by the
//! [`MetadataAggregator`](crate::MetadataAggregator).

use std::any::Any;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::model::BookMetadata;

/// Contract for an external bibliographic data source.
///
/// Data-returning methods report "no match" as `Ok(None)` / `Ok(vec![])`. An `Err`
/// is reserved for network, parse, rate-limit or credential failures; the
/// aggregator logs it and treats the provider as having contributed nothing.
///
/// Implementations must bound every call with their own timeout.
///
/// # Example
///
/// ```rust
/// use bookmeta::prelude::*;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct StaticCatalog;
///
/// #[async_trait]
/// impl MetadataProvider for StaticCatalog {
///     fn provider_id(&self) -> &str { "static" }
///     fn provider_name(&self) -> &str { "Static Catalog" }
///     fn priority(&self) -> i32 { 50 }
///
///     async fn find_by_isbn(&self, isbn: &str) -> ProviderResult<Option<BookMetadata>> {
///         Ok((isbn == "9780441013593").then(|| BookMetadata::new().with_title("Dune")))
///     }
///
///     async fn search_by_title(
///         &self,
///         _title: &str,
///         _author: Option<&str>,
///     ) -> ProviderResult<Vec<BookMetadata>> {
///         Ok(vec![])
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync + Debug {
    /// Stable identifier, e.g. `"google-books"`.
    fn provider_id(&self) -> &str;

    /// Human readable name, e.g. `"Google Books"`.
    fn provider_name(&self) -> &str;

    /// Whether the provider takes part in aggregate queries.
    ///
    /// May change at runtime; disabled providers are still probed.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Lower numbers are consulted and preferred first. `0` is the highest priority.
    fn priority(&self) -> i32 {
        0
    }

    /// Look up a single edition by ISBN. The raw value may contain separators.
    async fn find_by_isbn(&self, isbn: &str) -> ProviderResult<Option<BookMetadata>>;

    /// Search by title and optional author, best candidates first.
    async fn search_by_title(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> ProviderResult<Vec<BookMetadata>>;

    /// Direct lookup by the provider's own identifier scheme.
    async fn find_by_provider_id(&self, _id: &str) -> ProviderResult<Option<BookMetadata>> {
        Ok(None)
    }

    /// Lightweight reachability and configuration check.
    ///
    /// Ordinary connectivity failure is `Ok(false)`, not an error.
    async fn test_connection(&self) -> ProviderResult<bool> {
        Ok(true)
    }

    /// Downcast to concrete type for advanced usage.
    fn as_any(&self) -> &dyn Any;
}

/// Extension trait for provider type checking.
pub trait ProviderExt: MetadataProvider {
    /// Check if this provider is of type T.
    fn is<T: MetadataProvider + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to type T.
    fn downcast_ref<T: MetadataProvider + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl<P: MetadataProvider + ?Sized> ProviderExt for P {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestProvider {
        id: String,
    }

    #[async_trait]
    impl MetadataProvider for TestProvider {
        fn provider_id(&self) -> &str {
            &self.id
        }

        fn provider_name(&self) -> &str {
            "Test"
        }

        async fn find_by_isbn(&self, _isbn: &str) -> ProviderResult<Option<BookMetadata>> {
            Ok(None)
        }

        async fn search_by_title(
            &self,
            _title: &str,
            _author: Option<&str>,
        ) -> ProviderResult<Vec<BookMetadata>> {
            Ok(vec![])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_provider_defaults() {
        let provider = TestProvider {
            id: "test".to_string(),
        };
        assert_eq!(provider.provider_id(), "test");
        assert!(provider.is_enabled());
        assert_eq!(provider.priority(), 0);
    }

    #[tokio::test]
    async fn test_default_capabilities() {
        let provider = TestProvider {
            id: "test".to_string(),
        };
        assert_eq!(provider.find_by_provider_id("abc").await, Ok(None));
        assert_eq!(provider.test_connection().await, Ok(true));
    }

    #[test]
    fn test_provider_downcast() {
        let provider: Box<dyn MetadataProvider> = Box::new(TestProvider {
            id: "test".to_string(),
        });
        assert!(provider.is::<TestProvider>());
        assert_eq!(
            provider.downcast_ref::<TestProvider>().map(|p| p.id.as_str()),
            Some("test")
        );
    }
}
