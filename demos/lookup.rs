//! Example: Looking up a book across every bundled catalog
//!
//! Usage:
//!
//! ```text
//! cargo run --example lookup -- 9780441013593
//! cargo run --example lookup -- 9780441013593 bookmeta.toml
//! RUST_LOG=bookmeta=debug BOOKMETA_GOOGLE_BOOKS_API_KEY=... cargo run --example lookup -- 9780441013593
//! ```

use bookmeta::prelude::*;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bookmeta=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let isbn = args.next().unwrap_or_else(|| "9780441013593".to_string());
    let config = match args.next() {
        Some(path) => MetadataConfig::from_file(Path::new(&path))?,
        None => MetadataConfig::default(),
    }
    .with_env_overrides();

    let aggregator = create_aggregator(&config)?;

    // =========================================================================
    // Connectivity
    // =========================================================================

    println!("Providers:");
    for status in aggregator.test_all_providers().await {
        println!(
            "  {:<14} enabled={:<5} connected={:<5} {}",
            status.provider_id,
            status.enabled,
            status.connected,
            status.error.unwrap_or_default()
        );
    }

    // =========================================================================
    // ISBN lookup
    // =========================================================================

    let candidates = aggregator.find_by_isbn_from_all_providers(&isbn).await;
    println!("\n{} candidate(s) for {}:", candidates.len(), isbn);
    for book in &candidates {
        println!(
            "  [{}] {} (confidence {:.2})",
            book.provider_id.as_deref().unwrap_or("?"),
            book.title.as_deref().unwrap_or("<untitled>"),
            book.confidence_or_zero()
        );
    }

    if candidates.is_empty() {
        return Ok(());
    }

    let merged = aggregator.merge_metadata(&candidates);
    println!("\nMerged record:\n{}", serde_json::to_string_pretty(&merged)?);

    // =========================================================================
    // Title search using the merged record
    // =========================================================================

    if let Some(title) = merged.title.as_deref() {
        let author = merged.authors.first().map(|a| a.name.as_str());
        let hits = aggregator.search_by_title_from_all_providers(title, author).await;
        println!("\n{} search hit(s) for {:?}:", hits.len(), title);
        for hit in hits.iter().take(10) {
            println!(
                "  [{}] {} {}",
                hit.provider_id.as_deref().unwrap_or("?"),
                hit.title.as_deref().unwrap_or("<untitled>"),
                hit.publication_year.map(|y| format!("({y})")).unwrap_or_default()
            );
        }
    }

    Ok(())
}
