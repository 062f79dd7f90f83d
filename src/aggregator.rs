//! Concurrent fan-out across registered providers.
//!
//! Every aggregate query spawns one task per enabled provider. The tasks are
//! joined behind a per-call deadline and their outcomes land in a slot array
//! indexed by the provider's position in the priority-ordered snapshot, so the
//! output order never depends on which provider answered first.
//!
//! A provider that fails, panics or misses the deadline contributes nothing;
//! the remaining providers' results are still returned. Calls that miss the
//! deadline keep running in the background and their late results are dropped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::config::AggregatorConfig;
use crate::error::{InputError, ProbeError, ProviderError, ProviderResult};
use crate::merge::merge_metadata;
use crate::model::{BookMetadata, ProviderStatus};
use crate::registry::{ProviderRegistry, SharedProvider};

/// Entry point for metadata lookups across all registered providers.
///
/// # Example
///
/// ```rust,ignore
/// use bookmeta::prelude::*;
/// use std::sync::Arc;
///
/// let aggregator = MetadataAggregator::new(Arc::new(registry), AggregatorConfig::default());
///
/// let candidates = aggregator.find_by_isbn_from_all_providers("978-0-441-01359-3").await;
/// let best = aggregator.get_best_metadata_by_isbn("978-0-441-01359-3").await;
/// let merged = aggregator.merge_metadata(&candidates);
/// ```
#[derive(Debug, Clone)]
pub struct MetadataAggregator {
    registry: Arc<ProviderRegistry>,
    config: AggregatorConfig,
}

/// Terminal state of one provider task.
enum Outcome<T> {
    Completed(T),
    Failed(ProviderError),
    Panicked(String),
    TimedOut(Duration),
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed(_) => write!(f, "completed"),
            Outcome::Failed(e) => write!(f, "{e}"),
            Outcome::Panicked(msg) => write!(f, "task failed: {msg}"),
            Outcome::TimedOut(after) => write!(f, "timed out after {}ms", after.as_millis()),
        }
    }
}

impl<T> Outcome<T> {
    fn into_probe_result(self) -> Result<T, ProbeError> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Failed(e) => Err(ProbeError::Provider(e)),
            Outcome::Panicked(_) => Err(ProbeError::Panicked),
            Outcome::TimedOut(after) => Err(ProbeError::TimedOut(after.as_millis() as u64)),
        }
    }
}

/// Run `call` once per provider, concurrently, and wait for every task to reach
/// a terminal state. Slot `i` of the result belongs to `providers[i]`.
async fn fan_out<T, F, Fut>(providers: &[SharedProvider], deadline: Duration, call: F) -> Vec<Outcome<T>>
where
    T: Send + 'static,
    F: Fn(SharedProvider) -> Fut,
    Fut: Future<Output = ProviderResult<T>> + Send + 'static,
{
    let handles: Vec<_> = providers
        .iter()
        .map(|provider| tokio::spawn(call(Arc::clone(provider))))
        .collect();

    join_all(
        handles
            .into_iter()
            .map(|handle| tokio::time::timeout(deadline, handle)),
    )
    .await
    .into_iter()
    .map(|slot| match slot {
        Ok(Ok(Ok(value))) => Outcome::Completed(value),
        Ok(Ok(Err(e))) => Outcome::Failed(e),
        Ok(Err(join_error)) => Outcome::Panicked(join_error.to_string()),
        Err(_) => Outcome::TimedOut(deadline),
    })
    .collect()
}

/// Keep a successful outcome, logging anything else.
fn settle<T>(provider: &SharedProvider, operation: &'static str, outcome: Outcome<T>) -> Option<T> {
    match outcome {
        Outcome::Completed(value) => Some(value),
        failure => {
            warn!(
                provider = provider.provider_id(),
                operation,
                error = %failure,
                "Provider call failed, continuing without it"
            );
            None
        }
    }
}

/// Ensure engine output carries provenance and a confidence in `[0.0, 1.0]`.
fn stamp(provider: &SharedProvider, mut book: BookMetadata) -> BookMetadata {
    if book.provider_id.is_none() {
        book.provider_id = Some(provider.provider_id().to_string());
        book.provider_name = Some(provider.provider_name().to_string());
    }
    book.confidence = Some(book.confidence_or_zero());
    book
}

/// Pick the highest-confidence candidate.
///
/// Candidates must be in ascending provider-priority order; on equal confidence
/// the earlier (higher priority) candidate wins.
pub fn select_best(candidates: Vec<BookMetadata>) -> Option<BookMetadata> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(best) if best.confidence_or_zero() >= candidate.confidence_or_zero() => Some(best),
        _ => Some(candidate),
    })
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl MetadataAggregator {
    pub fn new(registry: Arc<ProviderRegistry>, config: AggregatorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Add a provider to the underlying registry.
    pub fn register_provider(&self, provider: SharedProvider) {
        self.registry.register_shared(provider);
    }

    /// Query every enabled provider by ISBN.
    ///
    /// Results are ordered by ascending provider priority, independent of
    /// completion order. Blank input returns an empty list without any call.
    #[instrument(skip(self))]
    pub async fn find_by_isbn_from_all_providers(&self, isbn: &str) -> Vec<BookMetadata> {
        let Some(isbn) = non_blank(isbn) else {
            debug!(reason = %InputError::BlankIsbn, "Skipping lookup");
            return Vec::new();
        };

        let providers = self.registry.enabled_providers();
        if providers.is_empty() {
            debug!("No enabled providers");
            return Vec::new();
        }

        let query = Arc::<str>::from(isbn);
        let outcomes = fan_out(&providers, self.config.provider_timeout(), |provider| {
            let query = Arc::clone(&query);
            async move { provider.find_by_isbn(&query).await }
        })
        .await;

        let results: Vec<BookMetadata> = providers
            .iter()
            .zip(outcomes)
            .filter_map(|(provider, outcome)| {
                settle(provider, "find_by_isbn", outcome)
                    .flatten()
                    .map(|book| stamp(provider, book))
            })
            .collect();

        info!(
            providers = providers.len(),
            candidates = results.len(),
            "ISBN lookup complete"
        );
        results
    }

    /// Highest-confidence record across all providers for an ISBN.
    pub async fn get_best_metadata_by_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        select_best(self.find_by_isbn_from_all_providers(isbn).await)
    }

    /// All providers' records for an ISBN, merged field by field.
    ///
    /// Returns `None` when no provider produced a record.
    pub async fn get_merged_metadata_by_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        let candidates = self.find_by_isbn_from_all_providers(isbn).await;
        (!candidates.is_empty()).then(|| merge_metadata(&candidates))
    }

    /// Search every enabled provider by title and optional author.
    ///
    /// Output is grouped by provider in ascending priority order; within a group
    /// the provider's own ranking is kept. Each record keeps its confidence so
    /// callers can re-rank.
    #[instrument(skip(self))]
    pub async fn search_by_title_from_all_providers(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Vec<BookMetadata> {
        let Some(title) = non_blank(title) else {
            debug!(reason = %InputError::BlankTitle, "Skipping search");
            return Vec::new();
        };

        let providers = self.registry.enabled_providers();
        if providers.is_empty() {
            debug!("No enabled providers");
            return Vec::new();
        }

        let title = Arc::<str>::from(title);
        let author: Option<Arc<str>> = author.and_then(non_blank).map(Arc::from);
        let outcomes = fan_out(&providers, self.config.provider_timeout(), |provider| {
            let title = Arc::clone(&title);
            let author = author.clone();
            async move { provider.search_by_title(&title, author.as_deref()).await }
        })
        .await;

        let results: Vec<BookMetadata> = providers
            .iter()
            .zip(outcomes)
            .filter_map(|(provider, outcome)| {
                settle(provider, "search_by_title", outcome).map(|books| (provider, books))
            })
            .flat_map(|(provider, books)| books.into_iter().map(move |b| stamp(provider, b)))
            .collect();

        info!(
            providers = providers.len(),
            candidates = results.len(),
            "Title search complete"
        );
        results
    }

    /// Direct lookup through one provider's own identifier scheme.
    ///
    /// The provider is addressed explicitly, so its enabled flag is not consulted.
    #[instrument(skip(self))]
    pub async fn find_by_provider_id(
        &self,
        provider_id: &str,
        id: &str,
    ) -> Option<BookMetadata> {
        let Some(id) = non_blank(id) else {
            debug!(reason = %InputError::BlankProviderId, "Skipping lookup");
            return None;
        };
        let Some(provider) = self.registry.get(provider_id) else {
            debug!("Unknown provider");
            return None;
        };

        let id = Arc::<str>::from(id);
        let providers = [provider];
        let outcome = fan_out(&providers, self.config.provider_timeout(), |provider| {
            let id = Arc::clone(&id);
            async move { provider.find_by_provider_id(&id).await }
        })
        .await
        .into_iter()
        .next()?;

        settle(&providers[0], "find_by_provider_id", outcome)
            .flatten()
            .map(|book| stamp(&providers[0], book))
    }

    /// Combine candidates into one record. See [`merge_metadata`].
    pub fn merge_metadata(&self, candidates: &[BookMetadata]) -> BookMetadata {
        merge_metadata(candidates)
    }

    /// Probe every registered provider, enabled or not.
    ///
    /// A probe that errors, panics or times out is reported as disconnected with
    /// the failure message. Output follows registration order.
    #[instrument(skip(self))]
    pub async fn test_all_providers(&self) -> Vec<ProviderStatus> {
        let providers = self.registry.all_providers();
        if providers.is_empty() {
            return Vec::new();
        }

        let outcomes = fan_out(&providers, self.config.probe_timeout(), |provider| async move {
            provider.test_connection().await
        })
        .await;

        let statuses: Vec<ProviderStatus> = providers
            .iter()
            .zip(outcomes)
            .map(|(provider, outcome)| {
                let (connected, error) = match outcome.into_probe_result() {
                    Ok(connected) => (connected, None),
                    Err(e) => {
                        warn!(provider = provider.provider_id(), error = %e, "Connection test failed");
                        (false, Some(e.to_string()))
                    }
                };
                ProviderStatus {
                    provider_id: provider.provider_id().to_string(),
                    provider_name: provider.provider_name().to_string(),
                    enabled: provider.is_enabled(),
                    connected,
                    error,
                }
            })
            .collect();

        info!(
            providers = statuses.len(),
            connected = statuses.iter().filter(|s| s.connected).count(),
            "Provider connectivity check complete"
        );
        statuses
    }
}
