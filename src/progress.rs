//! Chapter progression policy: always the earliest unpublished chapter,
//! strictly in outline order. No reordering, no parallel generation, no
//! skip-and-retry; `None` from [`pick_next`] is the "ready to compile"
//! signal.

use std::path::Path;

use crate::formats::BookMetadata;
use crate::store::{MetadataStore, StoreError};

/// Index of the next chapter to produce, or `None` when every chapter
/// has been published.
pub fn pick_next(store: &MetadataStore) -> Result<Option<usize>, StoreError> {
    store.next_pending_chapter_index()
}

/// Fold one produced chapter back into the book document.
pub fn apply_result(
    store: &MetadataStore,
    index: usize,
    content_path: &Path,
    content: &str,
) -> Result<BookMetadata, StoreError> {
    store.record_chapter_completion(index, content_path, content)
}
