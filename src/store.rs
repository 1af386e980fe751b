use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::formats::{
    BookInfo, BookMetadata, BookPlan, BookStatus, BookSummary, ChapterRecord, ChapterStatus,
    GenerationInfo,
};
use crate::slug;

/// Words per page used for the page-count estimate.
const WORDS_PER_PAGE: f64 = 250.0;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation addressed a book that has no metadata document.
    #[error("book '{0}' has no metadata document")]
    NotFound(String),
    /// The operation addressed a chapter outside the planned range.
    #[error("chapter index {index} out of range ({total} chapters)")]
    ChapterOutOfRange { index: usize, total: usize },
    /// The document could not be read or written.
    #[error("{context}")]
    Persistence {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// The document bytes do not describe a valid metadata record.
    #[error("malformed metadata document: {path}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable whole-document repository for one book.
///
/// Every operation reads or rewrites the entire JSON document at
/// `books/<slug>/book_metadata.json`. Derived fields are recomputed
/// wholesale on each mutation, never patched incrementally, and writes
/// land via temp-file + rename.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    books_dir: PathBuf,
    slug: String,
}

impl MetadataStore {
    /// Address a book by title; the slug (and therefore the on-disk
    /// location) is derived deterministically from it.
    pub fn new(books_dir: impl Into<PathBuf>, title: &str) -> Self {
        Self {
            books_dir: books_dir.into(),
            slug: slug::normalize(title),
        }
    }

    /// Address a book by an already-derived slug (directory name).
    pub fn for_slug(books_dir: impl Into<PathBuf>, slug: impl Into<String>) -> Self {
        Self {
            books_dir: books_dir.into(),
            slug: slug.into(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn book_dir(&self) -> PathBuf {
        self.books_dir.join(&self.slug)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.book_dir().join("book_metadata.json")
    }

    pub fn compiled_book_path(&self) -> PathBuf {
        self.book_dir().join(format!("{}.md", self.slug))
    }

    pub fn export_path(&self) -> PathBuf {
        self.book_dir().join(format!("{}_metadata_export.json", self.slug))
    }

    /// Build and persist the initial document: status `planning`, every
    /// chapter `planned`, all counts zero.
    pub fn create(
        &self,
        plan: &BookPlan,
        cover_description: &str,
        toc: &str,
        topic: &str,
    ) -> Result<BookMetadata, StoreError> {
        let today = Local::now().date_naive();

        let chapters = plan
            .chapters
            .iter()
            .map(|spec| ChapterRecord {
                chapter_number: spec.chapter_number,
                chapter_title: spec.chapter_title.clone(),
                synopsis: spec.synopsis.clone(),
                key_points: spec.key_points.clone(),
                status: ChapterStatus::Planned,
                creation_date: None,
                last_edited: None,
                publication_date: None,
                word_count: 0,
                page_count: 0.0,
                filename: None,
            })
            .collect::<Vec<_>>();

        let metadata = BookMetadata {
            book_info: BookInfo {
                title: plan.book_title.clone(),
                description: plan.book_description.clone(),
                topic: topic.to_owned(),
                creation_date: today,
                last_updated: today,
                status: BookStatus::Planning,
                total_chapters: chapters.len(),
                completed_chapters: 0,
                estimated_word_count: 0,
                estimated_page_count: 0.0,
            },
            generation_info: GenerationInfo {
                book_plan: plan.clone(),
                cover_description: cover_description.to_owned(),
                toc: toc.to_owned(),
            },
            chapters,
        };

        fs::create_dir_all(self.book_dir()).map_err(|err| StoreError::Persistence {
            context: format!("create book dir: {}", self.book_dir().display()),
            source: err,
        })?;
        write_json_atomic(&self.metadata_path(), &metadata)?;

        Ok(metadata)
    }

    /// Read the document; `None` means the book has not been created yet
    /// (the expected signal, not an error).
    pub fn load(&self) -> Result<Option<BookMetadata>, StoreError> {
        read_json(&self.metadata_path())
    }

    /// Mark one chapter published: compute its word/page counts from the
    /// rendered content, stamp dates, record the content file reference,
    /// recompute every book-level derived field, and write the whole
    /// document back.
    pub fn record_chapter_completion(
        &self,
        index: usize,
        content_path: &Path,
        content: &str,
    ) -> Result<BookMetadata, StoreError> {
        let mut metadata = self
            .load()?
            .ok_or_else(|| StoreError::NotFound(self.slug.clone()))?;

        let total = metadata.chapters.len();
        let chapter = metadata
            .chapters
            .get_mut(index)
            .ok_or(StoreError::ChapterOutOfRange { index, total })?;

        let word_count = content.split_whitespace().count();
        let today = Local::now().date_naive();

        chapter.status = ChapterStatus::Published;
        chapter.last_edited = Some(today);
        chapter.publication_date = Some(today);
        chapter.word_count = word_count;
        chapter.page_count = pages_for(word_count);
        chapter.filename = Some(content_path.to_string_lossy().into_owned());

        recompute_book_info(&mut metadata, today);
        write_json_atomic(&self.metadata_path(), &metadata)?;

        Ok(metadata)
    }

    /// Index of the first chapter still `planned`, in stored order;
    /// `None` once every chapter is published (or the book is absent).
    pub fn next_pending_chapter_index(&self) -> Result<Option<usize>, StoreError> {
        Ok(self.load()?.and_then(|metadata| {
            metadata
                .chapters
                .iter()
                .position(|chapter| chapter.status == ChapterStatus::Planned)
        }))
    }

    pub fn summary(&self) -> Result<Option<BookSummary>, StoreError> {
        Ok(self.load()?.map(|metadata| summarize(&metadata.book_info)))
    }
}

/// Page estimate at 250 words per page, one decimal place.
pub fn pages_for(word_count: usize) -> f64 {
    (word_count as f64 / WORDS_PER_PAGE * 10.0).round() / 10.0
}

/// Recompute every derived book-level field from the chapter records.
/// Always wholesale: after every mutation, `completed_chapters` equals
/// the published-chapter count and the word/page totals equal the
/// chapter sums.
pub fn recompute_book_info(metadata: &mut BookMetadata, today: NaiveDate) {
    let completed = metadata
        .chapters
        .iter()
        .filter(|chapter| chapter.status == ChapterStatus::Published)
        .count();
    let total = metadata.chapters.len();
    let word_count: usize = metadata
        .chapters
        .iter()
        .filter(|chapter| chapter.word_count > 0)
        .map(|chapter| chapter.word_count)
        .sum();

    let info = &mut metadata.book_info;
    info.last_updated = today;
    info.total_chapters = total;
    info.completed_chapters = completed;
    info.estimated_word_count = word_count;
    info.estimated_page_count = pages_for(word_count);
    info.status = if total > 0 && completed == total {
        BookStatus::Complete
    } else if completed > 0 {
        BookStatus::InProgress
    } else {
        BookStatus::Planning
    };
}

pub fn summarize(info: &BookInfo) -> BookSummary {
    BookSummary {
        title: info.title.clone(),
        status: info.status,
        completed: format!("{}/{}", info.completed_chapters, info.total_chapters),
        word_count: info.estimated_word_count,
        page_count: info.estimated_page_count,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StoreError::Persistence {
                context: format!("read {}", path.display()),
                source: err,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| StoreError::Malformed {
            path: path.display().to_string(),
            source: err,
        })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Persistence {
        context: format!("path has no parent: {}", path.display()),
        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
    })?;
    fs::create_dir_all(parent).map_err(|err| StoreError::Persistence {
        context: format!("create parent dir: {}", parent.display()),
        source: err,
    })?;

    let data = serde_json::to_vec_pretty(value).map_err(|err| StoreError::Malformed {
        path: path.display().to_string(),
        source: err,
    })?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, &data).map_err(|err| StoreError::Persistence {
        context: format!("write tmp: {}", tmp_path.display()),
        source: err,
    })?;
    fs::rename(&tmp_path, path).map_err(|err| StoreError::Persistence {
        context: format!("rename tmp to final: {}", path.display()),
        source: err,
    })
}
