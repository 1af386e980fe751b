use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::{CompileArgs, PlanArgs, StatusArgs, StoryArgs, WriteArgs};
use crate::formats::{BookSummary, ChapterRecord, ChapterStatus};
use crate::genai::{GeminiModel, TextModel};
use crate::illustrate;
use crate::plan;
use crate::progress;
use crate::remote::{self, HttpRemoteCollection};
use crate::store::{self, MetadataStore, StoreError};
use crate::writer;

/// Plan a new book: outline (with deterministic fallback), cover
/// description, table of contents, and the initial metadata document.
/// Returns the slug every later operation resolves the book by.
pub async fn plan_book(
    model: &dyn TextModel,
    books_dir: &Path,
    topic: &str,
    num_chapters: usize,
) -> anyhow::Result<String> {
    tracing::info!(topic, num_chapters, "plan: generate outline");
    let book_plan = plan::generate_outline(model, topic, num_chapters).await;
    tracing::info!(
        title = %book_plan.book_title,
        chapters = book_plan.chapters.len(),
        "plan: outline ready"
    );

    tracing::info!("plan: generate cover description");
    let cover_description = plan::generate_cover_description(model, &book_plan).await;

    tracing::info!("plan: format table of contents");
    let toc = plan::format_table_of_contents(&book_plan);

    let store = MetadataStore::new(books_dir, &book_plan.book_title);
    store
        .create(&book_plan, &cover_description, &toc, topic)
        .context("create book metadata")?;
    tracing::info!(
        slug = store.slug(),
        "plan: book structure saved; generate chapters one by one"
    );

    Ok(store.slug().to_owned())
}

/// Produce the next pending chapter: draft, edit, best-effort
/// illustration, rendered chapter file, then fold the result back into
/// the metadata document. `Ok(None)` means every chapter is already
/// published and the book is ready to compile.
pub async fn write_next_chapter(
    model: &dyn TextModel,
    books_dir: &Path,
    title: &str,
) -> anyhow::Result<Option<PathBuf>> {
    let store = MetadataStore::new(books_dir, title);
    let metadata = store
        .load()?
        .ok_or_else(|| StoreError::NotFound(store.slug().to_owned()))?;

    let Some(index) = progress::pick_next(&store)? else {
        tracing::info!(
            slug = store.slug(),
            "all chapters are published; ready to compile"
        );
        return Ok(None);
    };

    let book_plan = &metadata.generation_info.book_plan;
    let chapter = &metadata.chapters[index];

    tracing::info!(
        number = chapter.chapter_number,
        title = %chapter.chapter_title,
        "write: draft chapter"
    );
    let raw_chapter = writer::write_chapter(model, book_plan, index)
        .await
        .context("write chapter")?;

    tracing::info!(number = chapter.chapter_number, "write: edit chapter");
    let edited_chapter = writer::edit_chapter(model, &raw_chapter, &chapter.chapter_title)
        .await
        .context("edit chapter")?;

    tracing::info!(number = chapter.chapter_number, "write: generate illustration");
    let illustration_prompt = format!(
        "Based on chapter {number} titled '{title}' from the book '{book_title}', create a \
detailed description for an illustration that captures a key scene or theme.",
        number = chapter.chapter_number,
        title = chapter.chapter_title,
        book_title = book_plan.book_title,
    );
    let illustration_prefix = format!(
        "ch{:02}_{}",
        chapter.chapter_number,
        short_title(&chapter.chapter_title)
    );
    let book_dir = store.book_dir();

    let placeholder = format!(
        "*[Illustration for Chapter {} could not be generated]*",
        chapter.chapter_number
    );
    let illustration_markdown =
        match illustrate::generate_illustration(model, &illustration_prompt, &illustration_prefix, &book_dir)
            .await
        {
            Ok(Some(path)) => {
                let reference = path
                    .strip_prefix(&book_dir)
                    .map(|rel| rel.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| path.to_string_lossy().into_owned());
                format!(
                    "![Chapter {} Illustration: {}]({reference})",
                    chapter.chapter_number, chapter.chapter_title
                )
            }
            Ok(None) => placeholder,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "illustration generation failed; using placeholder"
                );
                placeholder
            }
        };

    let chapter_path = book_dir.join(format!(
        "ch{:02}_{}.md",
        chapter.chapter_number,
        short_title(&chapter.chapter_title)
    ));
    let contents = format!(
        "# Chapter {}: {}\n\n{}\n\n{}",
        chapter.chapter_number, chapter.chapter_title, illustration_markdown, edited_chapter
    );
    std::fs::write(&chapter_path, contents)
        .with_context(|| format!("write chapter file: {}", chapter_path.display()))?;

    let metadata = progress::apply_result(&store, index, &chapter_path, &edited_chapter)?;
    let info = &metadata.book_info;
    tracing::info!(
        slug = store.slug(),
        completed = info.completed_chapters,
        total = info.total_chapters,
        words = info.estimated_word_count,
        "write: chapter recorded"
    );

    Ok(Some(chapter_path))
}

/// Compile the book into one manuscript plus a metadata export.
/// Refuses (returns `Ok(None)`, logged) while chapters are missing unless
/// `force` is set, in which case unpublished chapters become explicit
/// placeholder lines.
pub fn compile_book(books_dir: &Path, title: &str, force: bool) -> anyhow::Result<Option<PathBuf>> {
    let store = MetadataStore::new(books_dir, title);
    let metadata = store
        .load()?
        .ok_or_else(|| StoreError::NotFound(store.slug().to_owned()))?;

    let completed = metadata
        .chapters
        .iter()
        .filter(|chapter| chapter.status == ChapterStatus::Published)
        .count();
    let total = metadata.chapters.len();
    if completed < total && !force {
        tracing::warn!(
            slug = store.slug(),
            completed,
            total,
            "not all chapters are published; refusing to compile (use --force to override)"
        );
        return Ok(None);
    }

    let info = &metadata.book_info;
    let mut book = String::new();
    book.push_str(&format!("# {}\n\n", info.title));
    book.push_str(&format!("*{}*\n\n", info.description));
    book.push_str(&format!("**Topic:** {}\n\n", info.topic));
    book.push_str(&format!("**Created:** {}\n", info.creation_date));
    book.push_str(&format!("**Last Updated:** {}\n", info.last_updated));
    book.push_str(&format!("**Word Count:** {}\n", info.estimated_word_count));
    book.push_str(&format!("**Page Count:** {:.1}\n\n", info.estimated_page_count));
    book.push_str("---\n\n");
    book.push_str(&metadata.generation_info.toc);
    book.push_str("\n\n---\n\n");
    book.push_str("## Cover Design Description\n\n");
    book.push_str(&format!("{}\n\n", metadata.generation_info.cover_description));
    book.push_str("---\n\n");

    for chapter in &metadata.chapters {
        book.push_str(&format!(
            "## Chapter {}: {}\n\n",
            chapter.chapter_number, chapter.chapter_title
        ));
        let body = chapter_body(chapter)?;
        book.push_str(&format!("{body}\n\n"));
        book.push_str("---\n\n");
    }

    let book_path = store.compiled_book_path();
    std::fs::write(&book_path, &book)
        .with_context(|| format!("write compiled book: {}", book_path.display()))?;

    let export_path = store.export_path();
    let export = serde_json::to_vec_pretty(&metadata).context("serialize metadata export")?;
    std::fs::write(&export_path, export)
        .with_context(|| format!("write metadata export: {}", export_path.display()))?;

    tracing::info!(
        book = %book_path.display(),
        export = %export_path.display(),
        "compile: book published"
    );
    Ok(Some(book_path))
}

/// One-shot short-story pipeline: headline, draft, edit, publish to a
/// plain-text file. Independent of the chapter-tracked book flow.
pub async fn story_pipeline(
    model: &dyn TextModel,
    topic: &str,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    tracing::info!(topic, "story: generate headline");
    let title = writer::generate_headline(model, topic)
        .await
        .context("generate headline")?;

    tracing::info!(title = %title, "story: draft");
    let draft = writer::write_story(model, &title).await.context("write story")?;

    tracing::info!("story: edit");
    let story = writer::edit_story(model, &draft).await.context("edit story")?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create story dir: {}", out_dir.display()))?;
    let filename = format!(
        "{}.txt",
        title.replace(' ', "_").replace(':', "").to_lowercase()
    );
    let path = out_dir.join(filename);
    std::fs::write(&path, format!("Title: {title}\n\n{story}"))
        .with_context(|| format!("write story: {}", path.display()))?;

    tracing::info!(path = %path.display(), "story: saved");
    Ok(path)
}

pub fn book_status(books_dir: &Path, title: &str) -> anyhow::Result<Option<BookSummary>> {
    Ok(MetadataStore::new(books_dir, title).summary()?)
}

/// Summaries for every book under the books root, sorted by title.
pub fn list_books(books_dir: &Path) -> anyhow::Result<Vec<BookSummary>> {
    let entries = match std::fs::read_dir(books_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read books dir: {}", books_dir.display()));
        }
    };

    let mut summaries = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_slug) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        match MetadataStore::for_slug(books_dir, dir_slug).load() {
            Ok(Some(metadata)) => summaries.push(store::summarize(&metadata.book_info)),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(slug = dir_slug, error = %format!("{err:#}"), "skipping unreadable book");
            }
        }
    }

    summaries.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(summaries)
}

/// Body of one chapter for compilation: the rendered file with its
/// heading block dropped (the compilation adds its own), or the explicit
/// placeholder for unpublished chapters.
fn chapter_body(chapter: &ChapterRecord) -> anyhow::Result<String> {
    if chapter.status == ChapterStatus::Published
        && let Some(filename) = &chapter.filename
    {
        let contents = std::fs::read_to_string(filename)
            .with_context(|| format!("read chapter file: {filename}"))?;
        let body = match contents.find("\n\n") {
            Some(heading_end) => contents[heading_end + 2..].to_owned(),
            None => contents,
        };
        return Ok(body);
    }

    Ok("*[This chapter is not yet written]*".to_owned())
}

fn short_title(title: &str) -> String {
    title
        .chars()
        .take(20)
        .collect::<String>()
        .replace(' ', "_")
        .to_lowercase()
}

pub async fn run_plan(args: PlanArgs) -> anyhow::Result<()> {
    let model = GeminiModel::from_env(&args.gemini_base_url, &args.model, &args.model)?;
    let slug = plan_book(&model, Path::new(&args.books_dir), &args.topic, args.chapters).await?;
    println!("{slug}");
    Ok(())
}

pub async fn run_write(args: WriteArgs) -> anyhow::Result<()> {
    let model = GeminiModel::from_env(&args.gemini_base_url, &args.model, &args.image_model)?;
    let written = write_next_chapter(&model, Path::new(&args.books_dir), &args.title).await?;

    if let Some(mirror_url) = args.mirror_url.as_deref() {
        let collection = HttpRemoteCollection::new(mirror_url)?;
        let synced = remote::push(&collection, Path::new(&args.books_dir), &args.title).await;
        tracing::info!(synced, "write: metadata mirrored");
    }

    if let Some(path) = written {
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn run_story(args: StoryArgs) -> anyhow::Result<()> {
    let model = GeminiModel::from_env(&args.gemini_base_url, &args.model, &args.model)?;
    let path = story_pipeline(&model, &args.topic, Path::new(&args.out_dir)).await?;
    println!("{}", path.display());
    Ok(())
}

pub fn run_compile(args: CompileArgs) -> anyhow::Result<()> {
    if let Some(path) = compile_book(Path::new(&args.books_dir), &args.title, args.force)? {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn run_status(args: StatusArgs) -> anyhow::Result<()> {
    match &args.title {
        Some(title) => match book_status(Path::new(&args.books_dir), title)? {
            Some(summary) => print_summary(&summary),
            None => anyhow::bail!("book '{title}' not found"),
        },
        None => {
            let summaries = list_books(Path::new(&args.books_dir))?;
            if summaries.is_empty() {
                tracing::info!("no books found yet; create one with `bookwright plan`");
                return Ok(());
            }
            for summary in summaries {
                print_summary(&summary);
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &BookSummary) {
    println!(
        "{}: {} ({} chapters) | {} words (~{:.1} pages)",
        summary.title, summary.status, summary.completed, summary.word_count, summary.page_count
    );
}
