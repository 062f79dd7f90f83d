//! Integration tests for bookmeta
//!
//! These tests drive the aggregator through its public API with in-process
//! stub providers standing in for remote catalogs.

use bookmeta::prelude::*;
use bookmeta::{select_best, AggregatorConfig, ProbeError, RegistryError};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Providers
// =============================================================================

/// How a stub provider answers its calls.
#[derive(Debug, Clone)]
enum Behavior {
    /// Return the canned record (or search hits)
    Answer,
    /// Return a provider error
    Fail,
    /// Panic inside the call
    Panic,
    /// Sleep before answering
    Stall(Duration),
}

/// A stub catalog with a fixed answer and configurable failure mode
#[derive(Debug, Clone)]
struct StubProvider {
    id: String,
    priority: i32,
    enabled: bool,
    record: Option<BookMetadata>,
    hits: Vec<BookMetadata>,
    behavior: Behavior,
    reachable: bool,
}

impl StubProvider {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            priority: 0,
            enabled: true,
            record: None,
            hits: Vec::new(),
            behavior: Behavior::Answer,
            reachable: true,
        }
    }

    fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn with_record(mut self, record: BookMetadata) -> Self {
        self.record = Some(record);
        self
    }

    fn with_hits(mut self, hits: Vec<BookMetadata>) -> Self {
        self.hits = hits;
        self
    }

    fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    async fn act(&self) -> ProviderResult<()> {
        match &self.behavior {
            Behavior::Answer => Ok(()),
            Behavior::Fail => Err(ProviderError::Network(format!("{} is down", self.id))),
            Behavior::Panic => panic!("{} exploded", self.id),
            Behavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn provider_name(&self) -> &str {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn find_by_isbn(&self, _isbn: &str) -> ProviderResult<Option<BookMetadata>> {
        self.act().await?;
        Ok(self.record.clone())
    }

    async fn search_by_title(
        &self,
        _title: &str,
        _author: Option<&str>,
    ) -> ProviderResult<Vec<BookMetadata>> {
        self.act().await?;
        Ok(self.hits.clone())
    }

    async fn find_by_provider_id(&self, id: &str) -> ProviderResult<Option<BookMetadata>> {
        self.act().await?;
        Ok(self
            .record
            .clone()
            .filter(|_| id == "known")
            .map(|r| r.with_provider(self.id.clone(), "Stub")))
    }

    async fn test_connection(&self) -> ProviderResult<bool> {
        self.act().await?;
        Ok(self.reachable)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn record(title: &str, confidence: f64) -> BookMetadata {
    BookMetadata::new()
        .with_title(title)
        .with_isbn_13("9780441013593")
        .with_confidence(confidence)
}

fn aggregator(providers: Vec<StubProvider>) -> MetadataAggregator {
    let registry = providers
        .into_iter()
        .fold(RegistryBuilder::new(), |builder, p| builder.with(p))
        .build();
    MetadataAggregator::new(Arc::new(registry), AggregatorConfig::default())
}

fn provider_ids(results: &[BookMetadata]) -> Vec<&str> {
    results
        .iter()
        .filter_map(|r| r.provider_id.as_deref())
        .collect()
}

// =============================================================================
// ISBN Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_lookup_orders_by_priority_and_picks_best() {
    // Registered out of order; p20 is the more confident source
    let aggregator = aggregator(vec![
        StubProvider::new("p20")
            .with_priority(20)
            .with_record(record("Dune (complete)", 0.9)),
        StubProvider::new("p10")
            .with_priority(10)
            .with_record(record("Dune", 0.6)),
    ]);

    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    assert_eq!(provider_ids(&results), vec!["p10", "p20"]);

    let best = aggregator.get_best_metadata_by_isbn("9780441013593").await.unwrap();
    assert_eq!(best.provider_id.as_deref(), Some("p20"));
    assert_eq!(best.confidence, Some(0.9));
}

#[tokio::test]
async fn test_lookup_single_provider() {
    let aggregator = aggregator(vec![StubProvider::new("only").with_record(record("Dune", 0.7))]);

    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title.as_deref(), Some("Dune"));
    assert_eq!(results[0].provider_id.as_deref(), Some("only"));
}

#[tokio::test]
async fn test_lookup_all_providers_empty() {
    let aggregator = aggregator(vec![StubProvider::new("a"), StubProvider::new("b")]);

    assert!(aggregator.find_by_isbn_from_all_providers("9780441013593").await.is_empty());
    assert!(aggregator.get_best_metadata_by_isbn("9780441013593").await.is_none());
    assert!(aggregator.get_merged_metadata_by_isbn("9780441013593").await.is_none());
}

#[tokio::test]
async fn test_lookup_without_enabled_providers() {
    let aggregator = aggregator(vec![StubProvider::new("off")
        .with_record(record("Dune", 1.0))
        .disabled()]);

    assert!(aggregator.find_by_isbn_from_all_providers("9780441013593").await.is_empty());
    assert!(aggregator
        .search_by_title_from_all_providers("Dune", None)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_best_tie_goes_to_higher_priority() {
    let aggregator = aggregator(vec![
        StubProvider::new("late").with_priority(5).with_record(record("B", 0.8)),
        StubProvider::new("early").with_priority(1).with_record(record("A", 0.8)),
    ]);

    let best = aggregator.get_best_metadata_by_isbn("9780441013593").await.unwrap();
    assert_eq!(best.provider_id.as_deref(), Some("early"));
}

#[tokio::test]
async fn test_merged_lookup_combines_sources() {
    let aggregator = aggregator(vec![
        StubProvider::new("first").with_priority(1).with_record(
            BookMetadata::new()
                .with_title("Dune")
                .with_author(AuthorMetadata::new("Frank Herbert"))
                .with_confidence(0.4),
        ),
        StubProvider::new("second").with_priority(2).with_record(
            BookMetadata::new()
                .with_title("Dune: Deluxe Edition")
                .with_publisher("Ace")
                .with_page_count(604)
                .with_author(AuthorMetadata::new("frank herbert"))
                .with_author(AuthorMetadata::new("Brian Herbert").with_role("foreword"))
                .with_confidence(0.7),
        ),
    ]);

    let merged = aggregator.get_merged_metadata_by_isbn("9780441013593").await.unwrap();
    assert_eq!(merged.title.as_deref(), Some("Dune"));
    assert_eq!(merged.publisher.as_deref(), Some("Ace"));
    assert_eq!(merged.page_count, Some(604));
    assert_eq!(merged.provider_id.as_deref(), Some("first"));
    assert_eq!(merged.confidence, Some(0.7));

    let names: Vec<&str> = merged.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Frank Herbert", "Brian Herbert"]);
}

// =============================================================================
// Fault Isolation Tests
// =============================================================================

#[tokio::test]
async fn test_failing_provider_is_isolated() {
    let aggregator = aggregator(vec![
        StubProvider::new("broken")
            .with_priority(1)
            .with_record(record("never", 1.0))
            .with_behavior(Behavior::Fail),
        StubProvider::new("healthy").with_priority(2).with_record(record("Dune", 0.5)),
    ]);

    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    assert_eq!(provider_ids(&results), vec!["healthy"]);
}

#[tokio::test]
async fn test_panicking_provider_is_isolated() {
    let aggregator = aggregator(vec![
        StubProvider::new("healthy").with_priority(1).with_record(record("Dune", 0.5)),
        StubProvider::new("panics")
            .with_priority(2)
            .with_record(record("never", 1.0))
            .with_behavior(Behavior::Panic),
    ]);

    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    assert_eq!(provider_ids(&results), vec!["healthy"]);

    let statuses = aggregator.test_all_providers().await;
    assert!(statuses[0].connected);
    assert!(!statuses[1].connected);
    assert_eq!(statuses[1].error, Some(ProbeError::Panicked.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_is_cut_off_at_deadline() {
    let aggregator = aggregator(vec![
        StubProvider::new("slow")
            .with_priority(1)
            .with_record(record("late", 1.0))
            .with_behavior(Behavior::Stall(Duration::from_secs(3600))),
        StubProvider::new("fast").with_priority(2).with_record(record("Dune", 0.5)),
    ]);

    let started = tokio::time::Instant::now();
    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;

    assert_eq!(provider_ids(&results), vec!["fast"]);
    assert!(started.elapsed() < Duration::from_secs(3600));
}

#[tokio::test(start_paused = true)]
async fn test_provider_calls_run_concurrently() {
    let config = AggregatorConfig::default().with_provider_timeout(Duration::from_secs(5));
    let registry = ["a", "b", "c"]
        .into_iter()
        .enumerate()
        .fold(RegistryBuilder::new(), |builder, (i, id)| {
            builder.with(
                StubProvider::new(id)
                    .with_priority(i as i32)
                    .with_record(record(id, 0.5))
                    .with_behavior(Behavior::Stall(Duration::from_secs(1))),
            )
        })
        .build();
    let aggregator = MetadataAggregator::new(Arc::new(registry), config);

    let started = tokio::time::Instant::now();
    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    let elapsed = started.elapsed();

    assert_eq!(provider_ids(&results), vec!["a", "b", "c"]);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2), "calls were serialized: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_reports_timeout() {
    let config = AggregatorConfig::default().with_probe_timeout(Duration::from_millis(250));
    let registry = RegistryBuilder::new()
        .with(StubProvider::new("slow").with_behavior(Behavior::Stall(Duration::from_secs(60))))
        .build();
    let aggregator = MetadataAggregator::new(Arc::new(registry), config);

    let statuses = aggregator.test_all_providers().await;
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].connected);
    assert_eq!(statuses[0].error, Some(ProbeError::TimedOut(250).to_string()));
}

// =============================================================================
// Title Search Tests
// =============================================================================

#[tokio::test]
async fn test_search_groups_by_provider_priority() {
    let aggregator = aggregator(vec![
        StubProvider::new("b")
            .with_priority(2)
            .with_hits(vec![record("B1", 0.9), record("B2", 0.1)]),
        StubProvider::new("a")
            .with_priority(1)
            .with_hits(vec![record("A1", 0.2)]),
        StubProvider::new("broken")
            .with_priority(0)
            .with_behavior(Behavior::Fail),
    ]);

    let results = aggregator.search_by_title_from_all_providers("Dune", Some("Herbert")).await;
    let titles: Vec<&str> = results.iter().filter_map(|r| r.title.as_deref()).collect();
    assert_eq!(titles, vec!["A1", "B1", "B2"]);
    assert_eq!(provider_ids(&results), vec!["a", "b", "b"]);
    assert!(results.iter().all(|r| r.confidence.is_some()));
}

#[tokio::test]
async fn test_blank_title_returns_nothing() {
    let aggregator = aggregator(vec![StubProvider::new("a").with_hits(vec![record("A", 0.5)])]);
    assert!(aggregator.search_by_title_from_all_providers("   ", None).await.is_empty());
}

// =============================================================================
// Provider Id Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_provider_id_lookup_targets_one_provider() {
    let aggregator = aggregator(vec![
        StubProvider::new("a").with_record(record("From A", 0.5)),
        StubProvider::new("b").with_record(record("From B", 0.5)).disabled(),
    ]);

    let found = aggregator.find_by_provider_id("b", "known").await.unwrap();
    assert_eq!(found.title.as_deref(), Some("From B"));
    assert_eq!(found.provider_id.as_deref(), Some("b"));

    assert!(aggregator.find_by_provider_id("b", "other").await.is_none());
    assert!(aggregator.find_by_provider_id("missing", "known").await.is_none());
}

// =============================================================================
// Connectivity Tests
// =============================================================================

#[tokio::test]
async fn test_probe_covers_disabled_and_failing_providers() {
    let aggregator = aggregator(vec![
        StubProvider::new("up"),
        StubProvider::new("off").disabled(),
        StubProvider::new("down").unreachable(),
        StubProvider::new("error").with_behavior(Behavior::Fail),
    ]);

    let statuses = aggregator.test_all_providers().await;
    let ids: Vec<&str> = statuses.iter().map(|s| s.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["up", "off", "down", "error"]);

    assert!(statuses[0].connected && statuses[0].enabled);
    assert!(statuses[1].connected && !statuses[1].enabled);
    assert!(!statuses[2].connected);
    assert!(statuses[2].error.is_none());
    assert!(!statuses[3].connected);
    assert_eq!(
        statuses[3].error,
        Some(ProviderError::Network("error is down".to_string()).to_string())
    );
}

// =============================================================================
// Registry Tests
// =============================================================================

#[tokio::test]
async fn test_runtime_registration_is_visible_to_next_query() {
    let aggregator = aggregator(vec![]);
    assert!(aggregator.find_by_isbn_from_all_providers("9780441013593").await.is_empty());

    aggregator.register_provider(Arc::new(StubProvider::new("new").with_record(record("Dune", 0.3))));

    let results = aggregator.find_by_isbn_from_all_providers("9780441013593").await;
    assert_eq!(provider_ids(&results), vec!["new"]);
}

#[test]
fn test_unique_registration_rejects_duplicates() {
    let registry = ProviderRegistry::new();
    registry.register(StubProvider::new("dup"));

    let err = registry
        .register_unique(Arc::new(StubProvider::new("dup")))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(ref id) if id == "dup"));
    assert_eq!(registry.len(), 1);

    // Plain registration keeps both
    registry.register(StubProvider::new("dup"));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_downcast_registered_provider() {
    let registry = RegistryBuilder::new()
        .with(StubProvider::new("stub").with_priority(7))
        .build();

    let provider = registry.get("stub").unwrap();
    assert!(provider.is::<StubProvider>());
    assert_eq!(provider.downcast_ref::<StubProvider>().unwrap().priority, 7);
}

// =============================================================================
// Selection and Merge Tests
// =============================================================================

#[test]
fn test_merge_of_nothing_is_empty_record() {
    let merged = merge_metadata(&[]);
    assert!(merged.title.is_none());
    assert!(merged.authors.is_empty());
    assert!(merged.provider_id.is_none());
    assert_eq!(merged.confidence, Some(0.0));
}

#[test]
fn test_select_best_treats_missing_confidence_as_zero() {
    let unscored = BookMetadata::new().with_title("unscored");
    let scored = record("scored", 0.1);

    let best = select_best(vec![unscored, scored]).unwrap();
    assert_eq!(best.title.as_deref(), Some("scored"));
}
