//! Open Library adapter (editions, works and search APIs).

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::http::{base_url, HttpClient};
use super::Score;
use crate::config::ProviderSettings;
use crate::error::ProviderResult;
use crate::isbn;
use crate::model::{
    first_non_blank, non_blank, AuthorMetadata, BookMetadata, Classification, CoverImages,
    ExternalIds, PhysicalAttributes,
};
use crate::provider::MetadataProvider;

pub const PROVIDER_ID: &str = "open-library";
const PROVIDER_NAME: &str = "Open Library";
const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
const COVERS_BASE_URL: &str = "https://covers.openlibrary.org/b/id";
const DEFAULT_PRIORITY: i32 = 20;
/// Edition lookups resolve at most this many author records.
const MAX_AUTHOR_LOOKUPS: usize = 5;

/// Open catalog provider backed by openlibrary.org. No credentials required.
#[derive(Debug)]
pub struct OpenLibraryProvider {
    http: HttpClient,
    base_url: String,
    covers_base_url: String,
    priority: i32,
    enabled: AtomicBool,
    search_limit: usize,
}

impl OpenLibraryProvider {
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
        Ok(Self {
            http: HttpClient::new(PROVIDER_ID, settings)?,
            base_url: base_url(settings.base_url.as_deref(), DEFAULT_BASE_URL),
            covers_base_url: COVERS_BASE_URL.to_string(),
            priority: settings.priority_or(DEFAULT_PRIORITY),
            enabled: AtomicBool::new(settings.enabled),
            search_limit: 10,
        })
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn covers(&self, cover_id: Option<i64>) -> CoverImages {
        match cover_id.filter(|id| *id > 0) {
            Some(id) => CoverImages {
                small: Some(format!("{}/{id}-S.jpg", self.covers_base_url)),
                medium: Some(format!("{}/{id}-M.jpg", self.covers_base_url)),
                large: Some(format!("{}/{id}-L.jpg", self.covers_base_url)),
            },
            None => CoverImages::default(),
        }
    }

    /// Resolve `/authors/OL..A` keys to authors, concurrently and within `budget`.
    ///
    /// Individual failures are skipped. When the budget runs out the record is
    /// kept without authors.
    async fn author_names(&self, refs: &[KeyRef], budget: Duration) -> Vec<AuthorMetadata> {
        let lookups = refs
            .iter()
            .take(MAX_AUTHOR_LOOKUPS)
            .map(|r| self.author(&r.key));

        match tokio::time::timeout(budget, join_all(lookups)).await {
            Ok(authors) => authors.into_iter().flatten().collect(),
            Err(_) => {
                debug!(
                    budget_ms = budget.as_millis() as u64,
                    "Author lookups ran out of time"
                );
                Vec::new()
            }
        }
    }

    async fn author(&self, key: &str) -> Option<AuthorMetadata> {
        let url = format!("{}{}.json", self.base_url, key);
        match self.http.get_json::<AuthorRecord>(&url, &[]).await {
            Ok(Some(record)) => {
                let mut author = AuthorMetadata::new(record.name);
                if let Some(bio) = record.bio {
                    author = author.with_biography(bio.into_text());
                }
                Some(author)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(author = key, error = %e, "Author lookup failed");
                None
            }
        }
    }

    /// Time left of the adapter timeout for a call that began at `started`.
    fn remaining(&self, started: Instant) -> Duration {
        self.http.timeout().saturating_sub(started.elapsed())
    }

    async fn edition(&self, path: &str) -> ProviderResult<Option<BookMetadata>> {
        let started = Instant::now();
        let url = format!("{}{}.json", self.base_url, path);
        let Some(edition) = self.http.get_json::<Edition>(&url, &[]).await? else {
            return Ok(None);
        };
        let authors = self
            .author_names(&edition.authors, self.remaining(started))
            .await;
        Ok(Some(self.edition_to_metadata(edition, authors)))
    }

    fn edition_to_metadata(&self, edition: Edition, authors: Vec<AuthorMetadata>) -> BookMetadata {
        let isbn_13 = edition.isbn_13.iter().find_map(|i| isbn::normalize(i));
        let isbn_10 = edition.isbn_10.iter().find_map(|i| isbn::normalize(i));
        let covers = self.covers(edition.covers.first().copied());
        let title = edition.title.and_then(non_blank);
        let publisher = first_non_blank(edition.publishers);
        let publish_date = edition.publish_date.and_then(non_blank);
        let description = edition.description.and_then(|d| non_blank(d.into_text()));

        let confidence = Score::new()
            .add(title.is_some(), 0.25)
            .add(!authors.is_empty(), 0.15)
            .add(isbn_13.is_some() || isbn_10.is_some(), 0.15)
            .add(publisher.is_some(), 0.1)
            .add(publish_date.is_some(), 0.1)
            .add(description.is_some(), 0.05)
            .add(!covers.is_empty(), 0.1)
            .add(edition.number_of_pages.is_some(), 0.05)
            .add(!edition.subjects.is_empty(), 0.05)
            .finish();

        let mut book = BookMetadata::new()
            .with_title(title.unwrap_or_default())
            .with_subtitle(edition.subtitle.unwrap_or_default())
            .with_publisher(publisher.unwrap_or_default())
            .with_publication_date(publish_date.unwrap_or_default())
            .with_description(description.unwrap_or_default())
            .with_page_count(edition.number_of_pages.unwrap_or_default())
            .with_authors(authors)
            .with_subjects(edition.subjects)
            .with_series_name(first_non_blank(edition.series).unwrap_or_default())
            .with_identifiers(ExternalIds {
                open_library_id: edition.key.and_then(|k| non_blank(strip_key(&k))),
                goodreads_id: first_non_blank(edition.identifiers.goodreads),
                asin: first_non_blank(edition.identifiers.amazon),
                lccn: first_non_blank(edition.lccn),
                oclc: first_non_blank(edition.oclc_numbers),
                ..ExternalIds::default()
            })
            .with_classification(Classification {
                dewey_decimal: first_non_blank(edition.dewey_decimal_class),
                lcc: first_non_blank(edition.lc_classifications),
            })
            .with_physical(PhysicalAttributes {
                format: edition.physical_format.and_then(non_blank),
                dimensions: edition.physical_dimensions.and_then(non_blank),
                weight: edition.weight.and_then(non_blank),
            })
            .with_covers(covers)
            .with_provider(PROVIDER_ID, PROVIDER_NAME)
            .with_confidence(confidence);

        if let Some(language) = edition.languages.first() {
            book = book.with_language(strip_key(&language.key));
        }
        book.isbn_13 = isbn_13;
        book.isbn_10 = isbn_10;
        book
    }

    fn search_doc_to_metadata(&self, doc: SearchDoc) -> BookMetadata {
        let isbn_13 = doc
            .isbn
            .iter()
            .filter_map(|i| isbn::normalize(i))
            .find(|i| i.len() == 13);
        let isbn_10 = doc
            .isbn
            .iter()
            .filter_map(|i| isbn::normalize(i))
            .find(|i| i.len() == 10);
        let covers = self.covers(doc.cover_i);

        let confidence = Score::new()
            .add(doc.title.is_some(), 0.25)
            .add(!doc.author_name.is_empty(), 0.15)
            .add(isbn_13.is_some() || isbn_10.is_some(), 0.15)
            .add(!doc.publisher.is_empty(), 0.1)
            .add(doc.first_publish_year.is_some(), 0.1)
            .add(!covers.is_empty(), 0.1)
            .add(doc.number_of_pages_median.is_some(), 0.05)
            .add(!doc.subject.is_empty(), 0.05)
            .finish();

        let mut book = BookMetadata::new()
            .with_title(doc.title.unwrap_or_default())
            .with_subtitle(doc.subtitle.unwrap_or_default())
            .with_publisher(first_non_blank(doc.publisher).unwrap_or_default())
            .with_page_count(doc.number_of_pages_median.unwrap_or_default())
            .with_authors(doc.author_name.into_iter().map(AuthorMetadata::new))
            .with_subjects(doc.subject.into_iter().take(20))
            .with_language(first_non_blank(doc.language).unwrap_or_default())
            .with_identifiers(ExternalIds {
                open_library_id: first_non_blank(doc.edition_key)
                    .or_else(|| doc.key.and_then(|k| non_blank(strip_key(&k)))),
                goodreads_id: first_non_blank(doc.id_goodreads),
                asin: first_non_blank(doc.id_amazon),
                ..ExternalIds::default()
            })
            .with_covers(covers)
            .with_provider(PROVIDER_ID, PROVIDER_NAME)
            .with_confidence(confidence);

        if let Some(year) = doc.first_publish_year {
            book = book.with_publication_year(year);
        }
        if let (Some(avg), Some(count)) = (doc.ratings_average, doc.ratings_count) {
            book = book.with_rating(avg, count);
        }
        book.isbn_13 = isbn_13;
        book.isbn_10 = isbn_10;
        book
    }

    async fn work(&self, id: &str) -> ProviderResult<Option<BookMetadata>> {
        let started = Instant::now();
        let url = format!("{}/works/{}.json", self.base_url, id);
        let Some(work) = self.http.get_json::<Work>(&url, &[]).await? else {
            return Ok(None);
        };

        let refs: Vec<KeyRef> = work.authors.into_iter().map(|a| a.author).collect();
        let authors = self.author_names(&refs, self.remaining(started)).await;
        let covers = self.covers(work.covers.first().copied());
        let description = work.description.map(Text::into_text);

        let confidence = Score::new()
            .add(work.title.is_some(), 0.25)
            .add(!authors.is_empty(), 0.15)
            .add(description.is_some(), 0.1)
            .add(!covers.is_empty(), 0.1)
            .add(!work.subjects.is_empty(), 0.05)
            .finish();

        Ok(Some(
            BookMetadata::new()
                .with_title(work.title.unwrap_or_default())
                .with_subtitle(work.subtitle.unwrap_or_default())
                .with_description(description.unwrap_or_default())
                .with_publication_date(work.first_publish_date.unwrap_or_default())
                .with_authors(authors)
                .with_subjects(work.subjects)
                .with_identifiers(ExternalIds {
                    open_library_id: Some(id.to_string()),
                    ..ExternalIds::default()
                })
                .with_covers(covers)
                .with_provider(PROVIDER_ID, PROVIDER_NAME)
                .with_confidence(confidence),
        ))
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn find_by_isbn(&self, isbn: &str) -> ProviderResult<Option<BookMetadata>> {
        let Some(isbn) = isbn::normalize(isbn) else {
            debug!("Not an ISBN, skipping lookup");
            return Ok(None);
        };
        self.edition(&format!("/isbn/{isbn}")).await
    }

    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn search_by_title(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> ProviderResult<Vec<BookMetadata>> {
        let url = format!("{}/search.json", self.base_url);
        let mut params = vec![
            ("title", title.trim().to_string()),
            ("limit", self.search_limit.to_string()),
        ];
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            params.push(("author", author.to_string()));
        }

        let response: Option<SearchResponse> = self.http.get_json(&url, &params).await?;
        Ok(response
            .map(|r| r.docs)
            .unwrap_or_default()
            .into_iter()
            .take(self.search_limit)
            .map(|doc| self.search_doc_to_metadata(doc))
            .collect())
    }

    /// Accepts edition ids (`OL7353617M`) and work ids (`OL45804W`).
    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn find_by_provider_id(&self, id: &str) -> ProviderResult<Option<BookMetadata>> {
        let id = id.trim();
        let valid = id
            .strip_prefix("OL")
            .and_then(|rest| rest.strip_suffix(|c: char| c == 'M' || c == 'W'))
            .is_some_and(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()));
        if !valid {
            return Ok(None);
        }

        if id.ends_with('W') {
            self.work(id).await
        } else {
            self.edition(&format!("/books/{id}")).await
        }
    }

    async fn test_connection(&self) -> ProviderResult<bool> {
        let url = format!("{}/search.json", self.base_url);
        Ok(self
            .http
            .ping(&url, &[("q", "test".to_string()), ("limit", "1".to_string())])
            .await)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `/authors/OL1A` -> `OL1A`, `/languages/eng` -> `eng`.
fn strip_key(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Open Library stores long text either as a plain string or as a typed object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    Plain(String),
    Typed { value: String },
}

impl Text {
    fn into_text(self) -> String {
        match self {
            Text::Plain(s) | Text::Typed { value: s } => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditionIdentifiers {
    goodreads: Vec<String>,
    amazon: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Edition {
    key: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    publishers: Vec<String>,
    publish_date: Option<String>,
    number_of_pages: Option<u32>,
    isbn_10: Vec<String>,
    isbn_13: Vec<String>,
    covers: Vec<i64>,
    authors: Vec<KeyRef>,
    subjects: Vec<String>,
    series: Vec<String>,
    languages: Vec<KeyRef>,
    description: Option<Text>,
    lccn: Vec<String>,
    oclc_numbers: Vec<String>,
    dewey_decimal_class: Vec<String>,
    lc_classifications: Vec<String>,
    physical_format: Option<String>,
    physical_dimensions: Option<String>,
    weight: Option<String>,
    identifiers: EditionIdentifiers,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    author: KeyRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    title: Option<String>,
    subtitle: Option<String>,
    description: Option<Text>,
    first_publish_date: Option<String>,
    covers: Vec<i64>,
    subjects: Vec<String>,
    authors: Vec<WorkAuthor>,
}

#[derive(Debug, Deserialize)]
struct AuthorRecord {
    name: String,
    #[serde(default)]
    bio: Option<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchDoc {
    key: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    isbn: Vec<String>,
    publisher: Vec<String>,
    number_of_pages_median: Option<u32>,
    cover_i: Option<i64>,
    subject: Vec<String>,
    language: Vec<String>,
    edition_key: Vec<String>,
    id_goodreads: Vec<String>,
    id_amazon: Vec<String>,
    ratings_average: Option<f64>,
    ratings_count: Option<u32>,
}
