//! Bundled provider adapters.
//!
//! Each adapter translates one catalog's wire format into [`BookMetadata`] and
//! scores its own records. The scoring weights are local to each adapter; the
//! aggregator only consumes the resulting confidence.
//!
//! [`BookMetadata`]: crate::BookMetadata

mod google_books;
mod http;
mod open_library;

pub use google_books::GoogleBooksProvider;
pub use open_library::OpenLibraryProvider;

/// Additive completeness score clamped to `[0.0, 1.0]`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Score(f64);

impl Score {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add `weight` when the field is populated.
    pub(crate) fn add(self, present: bool, weight: f64) -> Self {
        if present {
            Self(self.0 + weight)
        } else {
            self
        }
    }

    pub(crate) fn finish(self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}
