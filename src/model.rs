//! Metadata value objects shared by providers, the aggregator and the merge reducer.
//!
//! Every optional field uses `None` for "unknown". The `with_*` helpers treat blank
//! strings as unknown so that a record never carries an empty-string placeholder.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Bibliographic record produced by a provider or by the merge reducer.
///
/// Records are built once through the consuming `with_*` methods and then shared
/// read-only. Updating a record means producing a new copy.
///
/// # Example
///
/// ```rust
/// use bookmeta::{AuthorMetadata, BookMetadata};
///
/// let book = BookMetadata::new()
///     .with_title("Dune")
///     .with_isbn_13("9780441013593")
///     .with_author(AuthorMetadata::new("Frank Herbert"))
///     .with_confidence(0.8);
///
/// assert_eq!(book.title.as_deref(), Some("Dune"));
/// assert_eq!(book.authors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub isbn_10: Option<String>,
    pub isbn_13: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub original_title: Option<String>,
    pub sort_title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,

    pub publisher: Option<String>,
    /// Publication date as reported by the source (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
    pub publication_date: Option<String>,
    pub publication_year: Option<i32>,
    pub page_count: Option<u32>,

    pub identifiers: ExternalIds,
    pub authors: Vec<AuthorMetadata>,

    pub subjects: BTreeSet<String>,
    pub genres: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub classification: Classification,

    pub series_name: Option<String>,
    pub series_index: Option<f32>,

    pub physical: PhysicalAttributes,
    pub covers: CoverImages,

    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,

    /// Provider that produced this record.
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    /// Completeness/reliability score in `[0.0, 1.0]`.
    ///
    /// Always `Some` on records returned by the aggregator.
    pub confidence: Option<f64>,
}

/// Catalog-specific identifiers for a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIds {
    pub google_books_id: Option<String>,
    pub open_library_id: Option<String>,
    pub goodreads_id: Option<String>,
    pub asin: Option<String>,
    pub doi: Option<String>,
    pub lccn: Option<String>,
    pub oclc: Option<String>,
}

/// Library classification codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub dewey_decimal: Option<String>,
    pub lcc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalAttributes {
    /// Binding or format, e.g. "Paperback", "Hardcover", "ebook".
    pub format: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
}

/// Cover image URLs at increasing resolutions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImages {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl CoverImages {
    /// Highest resolution URL available.
    pub fn best(&self) -> Option<&str> {
        self.large
            .as_deref()
            .or(self.medium.as_deref())
            .or(self.small.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.small.is_none() && self.medium.is_none() && self.large.is_none()
    }
}

/// A contributor to a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorMetadata {
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Free-text role such as "author", "editor", "translator" or "illustrator".
    pub role: String,
    pub biography: Option<String>,
    pub image_url: Option<String>,
}

impl AuthorMetadata {
    /// Create an author entry with the default "author" role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            first_name: None,
            last_name: None,
            role: "author".to_string(),
            biography: None,
            image_url: None,
        }
    }

    /// Create an author entry from a first/last name pair.
    pub fn from_parts(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let first = first_name.into().trim().to_string();
        let last = last_name.into().trim().to_string();
        let name = format!("{first} {last}").trim().to_string();
        Self {
            first_name: non_blank(first),
            last_name: non_blank(last),
            ..Self::new(name)
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = non_blank(biography.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = non_blank(url.into());
        self
    }

    /// Key used to detect the same person across providers.
    pub(crate) fn match_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Outcome of probing one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider_id: String,
    pub provider_name: String,
    pub enabled: bool,
    pub connected: bool,
    pub error: Option<String>,
}

pub(crate) fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// First value in a source list that is not blank.
pub(crate) fn first_non_blank(values: Vec<String>) -> Option<String> {
    values.into_iter().find_map(non_blank)
}

macro_rules! text_setters {
    ($($method:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $method(mut self, value: impl Into<String>) -> Self {
                self.$field = non_blank(value.into());
                self
            }
        )*
    };
}

impl BookMetadata {
    /// Create an empty record with every field unknown.
    pub fn new() -> Self {
        Self::default()
    }

    text_setters! {
        with_isbn_10 => isbn_10,
        with_isbn_13 => isbn_13,
        with_title => title,
        with_subtitle => subtitle,
        with_original_title => original_title,
        with_sort_title => sort_title,
        with_description => description,
        with_language => language,
        with_publisher => publisher,
        with_series_name => series_name,
    }

    /// Set the publication date and derive the year from its leading digits.
    pub fn with_publication_date(mut self, value: impl Into<String>) -> Self {
        self.publication_date = non_blank(value.into());
        if let Some(year) = self.publication_date.as_deref().and_then(leading_year) {
            self.publication_year = Some(year);
        }
        self
    }

    pub fn with_publication_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }

    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = (pages > 0).then_some(pages);
        self
    }

    pub fn with_identifiers(mut self, identifiers: ExternalIds) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn with_author(mut self, author: AuthorMetadata) -> Self {
        if !author.name.is_empty() {
            self.authors.push(author);
        }
        self
    }

    pub fn with_authors(self, authors: impl IntoIterator<Item = AuthorMetadata>) -> Self {
        authors.into_iter().fold(self, Self::with_author)
    }

    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects.extend(collect_non_blank(subjects));
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres.extend(collect_non_blank(genres));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(collect_non_blank(tags));
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_series_index(mut self, index: f32) -> Self {
        self.series_index = Some(index);
        self
    }

    pub fn with_physical(mut self, physical: PhysicalAttributes) -> Self {
        self.physical = physical;
        self
    }

    pub fn with_covers(mut self, covers: CoverImages) -> Self {
        self.covers = covers;
        self
    }

    pub fn with_rating(mut self, average: f64, count: u32) -> Self {
        self.average_rating = Some(average);
        self.ratings_count = Some(count);
        self
    }

    pub fn with_provider(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.provider_id = non_blank(id.into());
        self.provider_name = non_blank(name.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Confidence used for ranking: absent scores rank as `0.0`.
    pub fn confidence_or_zero(&self) -> f64 {
        match self.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Preferred ISBN for display and lookups: ISBN-13 first.
    pub fn isbn(&self) -> Option<&str> {
        self.isbn_13.as_deref().or(self.isbn_10.as_deref())
    }
}

fn collect_non_blank<I, S>(values: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().filter_map(|v| non_blank(v.into()))
}

fn leading_year(date: &str) -> Option<i32> {
    let digits: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_blank_skips_placeholders() {
        let values = vec!["".to_string(), "  ".to_string(), " 813.54 ".to_string()];
        assert_eq!(first_non_blank(values), Some("813.54".to_string()));
        assert_eq!(first_non_blank(vec![" ".to_string()]), None);
        assert_eq!(first_non_blank(Vec::new()), None);
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let book = BookMetadata::new()
            .with_title("   ")
            .with_subtitle("")
            .with_publisher("  Ace  ");

        assert!(book.title.is_none());
        assert!(book.subtitle.is_none());
        assert_eq!(book.publisher.as_deref(), Some("Ace"));
    }

    #[test]
    fn test_publication_year_derived_from_date() {
        let book = BookMetadata::new().with_publication_date("1965-08-01");
        assert_eq!(book.publication_year, Some(1965));

        let book = BookMetadata::new().with_publication_date("Aug 1965");
        assert_eq!(book.publication_year, None);
        assert_eq!(book.publication_date.as_deref(), Some("Aug 1965"));
    }

    #[test]
    fn test_collections_skip_blank_entries() {
        let book = BookMetadata::new()
            .with_subjects(vec!["Fiction", " ", "Science Fiction"])
            .with_author(AuthorMetadata::new("  "))
            .with_author(AuthorMetadata::new("Frank Herbert"));

        assert_eq!(book.subjects.len(), 2);
        assert_eq!(book.authors.len(), 1);
    }

    #[test]
    fn test_confidence_or_zero() {
        assert_eq!(BookMetadata::new().confidence_or_zero(), 0.0);
        assert_eq!(BookMetadata::new().with_confidence(0.7).confidence_or_zero(), 0.7);
        assert_eq!(BookMetadata::new().with_confidence(1.4).confidence_or_zero(), 1.0);
        assert_eq!(
            BookMetadata::new().with_confidence(f64::NAN).confidence_or_zero(),
            0.0
        );
    }

    #[test]
    fn test_author_from_parts() {
        let author = AuthorMetadata::from_parts("Ursula", "Le Guin").with_role("translator");
        assert_eq!(author.name, "Ursula Le Guin");
        assert_eq!(author.first_name.as_deref(), Some("Ursula"));
        assert_eq!(author.role, "translator");
        assert_eq!(author.match_key(), "ursula le guin");
    }

    #[test]
    fn test_cover_best_prefers_largest() {
        let covers = CoverImages {
            small: Some("s".to_string()),
            medium: Some("m".to_string()),
            large: None,
        };
        assert_eq!(covers.best(), Some("m"));
        assert!(CoverImages::default().is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let book = BookMetadata::new().with_isbn_13("9780441013593");
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["isbn13"], "9780441013593");
        assert!(json["title"].is_null());
    }
}
