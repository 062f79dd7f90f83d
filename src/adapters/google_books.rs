//! Google Books volumes API adapter.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::http::{base_url, secure_url, HttpClient};
use super::Score;
use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::isbn;
use crate::model::{
    non_blank, AuthorMetadata, BookMetadata, CoverImages, ExternalIds, PhysicalAttributes,
};
use crate::provider::MetadataProvider;

pub const PROVIDER_ID: &str = "google-books";
const PROVIDER_NAME: &str = "Google Books";
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";
const DEFAULT_PRIORITY: i32 = 10;
/// Upper bound enforced by the API for `maxResults`.
const MAX_RESULTS: usize = 40;
/// Well-known volume used as the connection probe.
const PROBE_ISBN: &str = "9780441013593";

/// Commercial catalog provider backed by the Google Books API.
///
/// An API key is required; without one the provider reports itself disabled so
/// that the connectivity probe can explain why.
#[derive(Debug)]
pub struct GoogleBooksProvider {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    priority: i32,
    enabled: AtomicBool,
    search_limit: usize,
}

impl GoogleBooksProvider {
    pub fn new(settings: &ProviderSettings) -> ProviderResult<Self> {
        Ok(Self {
            http: HttpClient::new(PROVIDER_ID, settings)?,
            base_url: base_url(settings.base_url.as_deref(), DEFAULT_BASE_URL),
            api_key: settings.api_key().map(str::to_string),
            priority: settings.priority_or(DEFAULT_PRIORITY),
            enabled: AtomicBool::new(settings.enabled),
            search_limit: 10,
        })
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.clamp(1, MAX_RESULTS);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn query(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    async fn volumes(&self, q: String, max_results: usize) -> ProviderResult<Vec<Volume>> {
        let url = format!("{}/volumes", self.base_url);
        let params = self.query(vec![("q", q), ("maxResults", max_results.to_string())]);
        let list: Option<VolumeList> = self.http.get_json(&url, &params).await?;
        Ok(list.map(|l| l.items).unwrap_or_default())
    }

    fn to_metadata(&self, volume: Volume) -> BookMetadata {
        let info = volume.volume_info;

        let mut isbn_10 = None;
        let mut isbn_13 = None;
        for id in &info.industry_identifiers {
            match id.kind.as_str() {
                "ISBN_10" => isbn_10 = isbn::normalize(&id.identifier),
                "ISBN_13" => isbn_13 = isbn::normalize(&id.identifier),
                _ => {}
            }
        }

        let covers = info
            .image_links
            .map(|links| {
                let pick = |candidates: [Option<String>; 2]| {
                    candidates
                        .into_iter()
                        .find_map(|c| c.and_then(non_blank))
                        .map(|url| secure_url(&url))
                };
                CoverImages {
                    small: pick([links.small_thumbnail, links.thumbnail.clone()]),
                    medium: pick([links.medium.or(links.small), links.thumbnail]),
                    large: pick([links.extra_large, links.large]),
                }
            })
            .unwrap_or_default();

        let genres: Vec<String> = info
            .categories
            .iter()
            .flat_map(|c| c.split(" / "))
            .map(str::trim)
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("general"))
            .map(str::to_string)
            .collect();

        let title = info.title.and_then(non_blank);
        let publisher = info.publisher.and_then(non_blank);
        let published_date = info.published_date.and_then(non_blank);
        let description = info.description.and_then(non_blank);
        let authors: Vec<AuthorMetadata> = info
            .authors
            .into_iter()
            .filter_map(non_blank)
            .map(AuthorMetadata::new)
            .collect();

        let confidence = Score::new()
            .add(title.is_some(), 0.25)
            .add(!authors.is_empty(), 0.15)
            .add(isbn_13.is_some() || isbn_10.is_some(), 0.15)
            .add(publisher.is_some(), 0.1)
            .add(published_date.is_some(), 0.1)
            .add(description.is_some(), 0.1)
            .add(!covers.is_empty(), 0.05)
            .add(info.page_count.is_some(), 0.05)
            .add(!genres.is_empty(), 0.05)
            .finish();

        let mut book = BookMetadata::new()
            .with_title(title.unwrap_or_default())
            .with_subtitle(info.subtitle.unwrap_or_default())
            .with_publisher(publisher.unwrap_or_default())
            .with_publication_date(published_date.unwrap_or_default())
            .with_description(description.unwrap_or_default())
            .with_language(info.language.unwrap_or_default())
            .with_page_count(info.page_count.unwrap_or_default())
            .with_authors(authors)
            .with_genres(genres)
            .with_identifiers(ExternalIds {
                google_books_id: non_blank(volume.id),
                ..ExternalIds::default()
            })
            .with_physical(PhysicalAttributes {
                format: info.print_type.and_then(non_blank).map(|t| t.to_lowercase()),
                ..PhysicalAttributes::default()
            })
            .with_covers(covers)
            .with_provider(PROVIDER_ID, PROVIDER_NAME)
            .with_confidence(confidence);

        book.isbn_10 = isbn_10;
        book.isbn_13 = isbn_13;
        if let (Some(avg), Some(count)) = (info.average_rating, info.ratings_count) {
            book = book.with_rating(avg, count);
        }
        book
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed) && self.api_key.is_some()
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

        let volume = self.volumes(format!("isbn:{isbn}"), 1).await?.into_iter().next();
        Ok(volume.map(|v| self.to_metadata(v)))
    }

    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn search_by_title(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> ProviderResult<Vec<BookMetadata>> {
        let mut q = phrase("intitle", title);
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            q.push(' ');
            q.push_str(&phrase("inauthor", author));
        }

        let volumes = self.volumes(q, self.search_limit).await?;
        Ok(volumes.into_iter().map(|v| self.to_metadata(v)).collect())
    }

    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn find_by_provider_id(&self, id: &str) -> ProviderResult<Option<BookMetadata>> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Ok(None);
        }

        let url = format!("{}/volumes/{}", self.base_url, id);
        let volume: Option<Volume> = self.http.get_json(&url, &self.query(vec![])).await?;
        Ok(volume.map(|v| self.to_metadata(v)))
    }

    async fn test_connection(&self) -> ProviderResult<bool> {
        if self.api_key.is_none() {
            return Err(ProviderError::Configuration(
                "Google Books API key is not configured".to_string(),
            ));
        }

        match self.volumes(format!("isbn:{PROBE_ISBN}"), 1).await {
            Ok(_) => Ok(true),
            Err(e @ ProviderError::Authentication(_)) => Err(e),
            Err(e) => {
                debug!(provider = PROVIDER_ID, error = %e, "Connection test failed");
                Ok(false)
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Quote a multi-word value so the field qualifier applies to every word.
fn phrase(field: &str, value: &str) -> String {
    let value = value.replace('"', " ");
    format!("{field}:\"{}\"", value.trim())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<u32>,
    print_type: Option<String>,
    categories: Vec<String>,
    average_rating: Option<f64>,
    ratings_count: Option<u32>,
    image_links: Option<ImageLinks>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ImageLinks {
    small_thumbnail: Option<String>,
    thumbnail: Option<String>,
    small: Option<String>,
    medium: Option<String>,
    large: Option<String>,
    extra_large: Option<String>,
}
