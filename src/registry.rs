//! Registry of metadata providers.
//!
//! The registry is append-only for the lifetime of the process. Registration is
//! rare (usually once at bootstrap) while reads happen on every query, so the
//! provider list is kept as a copy-on-write snapshot: readers clone an `Arc`
//! under a short read lock and never wait on each other.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::provider::MetadataProvider;

/// Shared handle to a registered provider.
pub type SharedProvider = Arc<dyn MetadataProvider>;

/// A concurrently readable, append-only collection of providers.
///
/// # Example
///
/// ```rust
/// use bookmeta::prelude::*;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct Catalog(&'static str, i32);
///
/// #[async_trait]
/// impl MetadataProvider for Catalog {
///     fn provider_id(&self) -> &str { self.0 }
///     fn provider_name(&self) -> &str { self.0 }
///     fn priority(&self) -> i32 { self.1 }
///     async fn find_by_isbn(&self, _: &str) -> ProviderResult<Option<BookMetadata>> { Ok(None) }
///     async fn search_by_title(&self, _: &str, _: Option<&str>) -> ProviderResult<Vec<BookMetadata>> {
///         Ok(vec![])
///     }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let registry = ProviderRegistry::new();
/// registry.register(Catalog("open-library", 20));
/// registry.register(Catalog("google-books", 10));
///
/// let ids: Vec<String> = registry
///     .enabled_providers()
///     .iter()
///     .map(|p| p.provider_id().to_string())
///     .collect();
/// assert_eq!(ids, vec!["google-books", "open-library"]);
/// ```
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<Arc<Vec<SharedProvider>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    ///
    /// No de-duplication is performed: registering the same id twice yields two
    /// entries. Use [`register_unique`](Self::register_unique) to reject duplicates.
    pub fn register<P: MetadataProvider + 'static>(&self, provider: P) {
        self.register_shared(Arc::new(provider));
    }

    /// Register an already shared provider.
    pub fn register_shared(&self, provider: SharedProvider) {
        debug!(
            provider = provider.provider_id(),
            priority = provider.priority(),
            enabled = provider.is_enabled(),
            "Registering metadata provider"
        );
        let mut guard = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        let next = appended(&guard, provider);
        *guard = Arc::new(next);
    }

    /// Register a provider, returning an error if its id is already registered.
    ///
    /// Provider ids are compared against a snapshot outside the lock; the append
    /// only happens if no other registration landed in between.
    pub fn register_unique(&self, provider: SharedProvider) -> RegistryResult<()> {
        let id = provider.provider_id().to_string();
        loop {
            let current = self.snapshot();
            if current.iter().any(|p| p.provider_id() == id) {
                return Err(RegistryError::AlreadyRegistered(id));
            }

            let mut guard = self.providers.write().unwrap_or_else(PoisonError::into_inner);
            if Arc::ptr_eq(&*guard, &current) {
                *guard = Arc::new(appended(&current, provider));
                drop(guard);
                debug!(provider = %id, "Registered metadata provider");
                return Ok(());
            }
        }
    }

    fn snapshot(&self) -> Arc<Vec<SharedProvider>> {
        let guard = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Every registered provider, enabled or not, in registration order.
    pub fn all_providers(&self) -> Vec<SharedProvider> {
        self.snapshot().iter().cloned().collect()
    }

    /// Enabled providers sorted ascending by priority.
    ///
    /// The sort is stable, so equal priorities keep registration order.
    pub fn enabled_providers(&self) -> Vec<SharedProvider> {
        let mut enabled: Vec<SharedProvider> = self
            .snapshot()
            .iter()
            .filter(|p| p.is_enabled())
            .cloned()
            .collect();
        enabled.sort_by_key(|p| p.priority());
        enabled
    }

    /// First provider registered under the given id.
    pub fn get(&self, provider_id: &str) -> Option<SharedProvider> {
        self.snapshot()
            .iter()
            .find(|p| p.provider_id() == provider_id)
            .cloned()
    }

    /// Check if a provider with the given id is registered.
    pub fn contains(&self, provider_id: &str) -> bool {
        self.get(provider_id).is_some()
    }

    /// Get the ids of all registered providers.
    pub fn provider_ids(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|p| p.provider_id().to_string())
            .collect()
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

fn appended(current: &[SharedProvider], provider: SharedProvider) -> Vec<SharedProvider> {
    let mut next = Vec::with_capacity(current.len() + 1);
    next.extend(current.iter().cloned());
    next.push(provider);
    next
}

/// Builder for creating registries with fluent API.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: ProviderRegistry,
}

impl RegistryBuilder {
    /// Create a new registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the registry.
    pub fn with<P: MetadataProvider + 'static>(self, provider: P) -> Self {
        self.registry.register(provider);
        self
    }

    /// Add a provider only when `condition` holds.
    pub fn with_if<P: MetadataProvider + 'static>(self, condition: bool, provider: P) -> Self {
        if condition {
            self.registry.register(provider);
        }
        self
    }

    /// Build the registry.
    pub fn build(self) -> ProviderRegistry {
        self.registry
    }
}
