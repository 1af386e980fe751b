use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The whole-document metadata record persisted at
/// `books/<slug>/book_metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    pub book_info: BookInfo,
    pub generation_info: GenerationInfo,
    pub chapters: Vec<ChapterRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInfo {
    pub title: String,
    pub description: String,
    pub topic: String,
    pub creation_date: NaiveDate,
    pub last_updated: NaiveDate,
    pub status: BookStatus,
    pub total_chapters: usize,
    pub completed_chapters: usize,
    pub estimated_word_count: usize,
    pub estimated_page_count: f64,
}

/// Derived from `(completed_chapters, total_chapters)`; never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Planning,
    InProgress,
    Complete,
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookStatus::Planning => "planning",
            BookStatus::InProgress => "in_progress",
            BookStatus::Complete => "complete",
        };
        f.write_str(label)
    }
}

/// Artifacts produced by the planning step, kept verbatim for later
/// chapter generation and compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub book_plan: BookPlan,
    pub cover_description: String,
    pub toc: String,
}

/// The outline contract the planner model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPlan {
    pub book_title: String,
    pub book_description: String,
    pub chapters: Vec<ChapterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSpec {
    pub chapter_number: usize,
    pub chapter_title: String,
    pub synopsis: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// 1-based; always matches the chapter's position in `chapters`.
    pub chapter_number: usize,
    pub chapter_title: String,
    pub synopsis: String,
    pub key_points: Vec<String>,
    pub status: ChapterStatus,
    pub creation_date: Option<NaiveDate>,
    pub last_edited: Option<NaiveDate>,
    pub publication_date: Option<NaiveDate>,
    pub word_count: usize,
    pub page_count: f64,
    /// Path of the rendered chapter file; the file bytes belong to the
    /// filesystem, only the reference is tracked here.
    pub filename: Option<String>,
}

/// The pipeline only ever moves a chapter `Planned -> Published`; the
/// intermediate states exist so documents written by other tooling
/// round-trip without loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Planned,
    Writing,
    Written,
    Edited,
    Published,
}

/// Condensed progress view of one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub status: BookStatus,
    /// Formatted `completed/total`.
    pub completed: String,
    pub word_count: usize,
    pub page_count: f64,
}

/// Document shape stored in the remote mirror collection, keyed by slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorDocument {
    pub key: String,
    pub title: String,
    pub slug: String,
    pub metadata: BookMetadata,
    pub synced_at: DateTime<Utc>,
}

/// Projection of a mirror document returned by `list_summaries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSummary {
    pub slug: String,
    pub title: String,
    pub book_info: BookInfo,
    pub synced_at: DateTime<Utc>,
}
