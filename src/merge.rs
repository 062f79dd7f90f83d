//! Field-level merge of candidate records.
//!
//! Candidates are expected in ascending provider-priority order, as returned by the
//! aggregator. Scalar fields take the first present value; collection fields are
//! unioned because partial catalogs tend to disagree on completeness rather than
//! on content.

use std::collections::HashSet;

use crate::model::{AuthorMetadata, BookMetadata};

/// Combine candidates into a single record.
///
/// - Scalars: first candidate with the field present wins.
/// - Authors: union, de-duplicated by case-insensitive name, first occurrence kept.
/// - Subjects, genres, tags: exact-match union.
/// - Confidence: maximum over all candidates (absent counts as `0.0`).
/// - Provenance: the provider that contributed the title.
///
/// An empty slice yields an all-absent record with confidence `0.0`.
///
/// # Example
///
/// ```rust
/// use bookmeta::{merge_metadata, BookMetadata};
///
/// let a = BookMetadata::new().with_title("Dune").with_confidence(0.5);
/// let b = BookMetadata::new()
///     .with_title("Dune (Deluxe)")
///     .with_publisher("Ace")
///     .with_confidence(0.9);
///
/// let merged = merge_metadata(&[a, b]);
/// assert_eq!(merged.title.as_deref(), Some("Dune"));
/// assert_eq!(merged.publisher.as_deref(), Some("Ace"));
/// assert_eq!(merged.confidence, Some(0.9));
/// ```
pub fn merge_metadata(candidates: &[BookMetadata]) -> BookMetadata {
    macro_rules! first {
        ($($field:ident).+) => {
            candidates.iter().find_map(|c| c.$($field).+.clone())
        };
    }

    let title_source = candidates.iter().find(|c| c.title.is_some());

    let mut merged = BookMetadata {
        isbn_10: first!(isbn_10),
        isbn_13: first!(isbn_13),
        title: title_source.and_then(|c| c.title.clone()),
        subtitle: first!(subtitle),
        original_title: first!(original_title),
        sort_title: first!(sort_title),
        description: first!(description),
        language: first!(language),
        publisher: first!(publisher),
        publication_date: first!(publication_date),
        publication_year: first!(publication_year),
        page_count: first!(page_count),
        series_name: first!(series_name),
        series_index: first!(series_index),
        average_rating: first!(average_rating),
        ratings_count: first!(ratings_count),
        provider_id: title_source.and_then(|c| c.provider_id.clone()),
        provider_name: title_source.and_then(|c| c.provider_name.clone()),
        confidence: Some(
            candidates
                .iter()
                .map(BookMetadata::confidence_or_zero)
                .fold(0.0, f64::max),
        ),
        ..BookMetadata::default()
    };

    merged.identifiers.google_books_id = first!(identifiers.google_books_id);
    merged.identifiers.open_library_id = first!(identifiers.open_library_id);
    merged.identifiers.goodreads_id = first!(identifiers.goodreads_id);
    merged.identifiers.asin = first!(identifiers.asin);
    merged.identifiers.doi = first!(identifiers.doi);
    merged.identifiers.lccn = first!(identifiers.lccn);
    merged.identifiers.oclc = first!(identifiers.oclc);

    merged.classification.dewey_decimal = first!(classification.dewey_decimal);
    merged.classification.lcc = first!(classification.lcc);

    merged.physical.format = first!(physical.format);
    merged.physical.dimensions = first!(physical.dimensions);
    merged.physical.weight = first!(physical.weight);

    merged.covers.small = first!(covers.small);
    merged.covers.medium = first!(covers.medium);
    merged.covers.large = first!(covers.large);

    merged.authors = union_authors(candidates);
    for candidate in candidates {
        merged.subjects.extend(candidate.subjects.iter().cloned());
        merged.genres.extend(candidate.genres.iter().cloned());
        merged.tags.extend(candidate.tags.iter().cloned());
    }

    merged
}

fn union_authors(candidates: &[BookMetadata]) -> Vec<AuthorMetadata> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .flat_map(|c| c.authors.iter())
        .filter(|author| seen.insert(author.match_key()))
        .cloned()
        .collect()
}
