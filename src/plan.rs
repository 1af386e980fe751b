use thiserror::Error;

use crate::formats::{BookPlan, ChapterSpec};
use crate::genai::TextModel;

/// The outline generator returned something that does not parse into a
/// book plan. Always recovered locally with [`fallback_plan`]; never
/// propagated to callers.
#[derive(Debug, Error)]
#[error("malformed outline output: {0}")]
pub struct MalformedOutputError(String);

/// Ask the model for a book outline. A malformed or failed response is
/// replaced by the deterministic fallback plan so planning always
/// succeeds with a usable structure.
pub async fn generate_outline(model: &dyn TextModel, topic: &str, num_chapters: usize) -> BookPlan {
    let prompt = outline_prompt(topic, num_chapters);

    let raw = match model.generate_text(&prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "outline generation failed; using fallback plan");
            return fallback_plan(topic, num_chapters);
        }
    };

    match parse_outline(&raw) {
        Ok(plan) => plan,
        Err(err) => {
            tracing::warn!(error = %err, "outline output unparsable; using fallback plan");
            fallback_plan(topic, num_chapters)
        }
    }
}

/// Ask the model for a cover-design description; degrades to a generic
/// description on failure.
pub async fn generate_cover_description(model: &dyn TextModel, plan: &BookPlan) -> String {
    let prompt = format!(
        "Create a detailed description for a book cover design for the book titled \
\"{title}\".\n\
Book description: {description}\n\
\n\
Include suggestions for:\n\
1. Main imagery or illustration\n\
2. Color scheme\n\
3. Typography style\n\
4. Overall mood/feeling the cover should convey\n\
\n\
The description should provide clear visual direction for a book cover designer.\n",
        title = plan.book_title,
        description = plan.book_description,
    );

    match model.generate_text(&prompt).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "cover description generation failed; using fallback");
            "A generic book cover with elegant typography and appealing imagery.".to_owned()
        }
    }
}

/// Render the table of contents from the plan. Pure formatting, no model
/// round-trip.
pub fn format_table_of_contents(plan: &BookPlan) -> String {
    let mut toc = format!("# {}\n\n", plan.book_title);
    toc.push_str("## Table of Contents\n\n");
    for chapter in &plan.chapters {
        toc.push_str(&format!(
            "{}. {}\n",
            chapter.chapter_number, chapter.chapter_title
        ));
    }
    toc
}

/// Deterministic per-chapter placeholder plan, used whenever the outline
/// generator cannot be trusted.
pub fn fallback_plan(topic: &str, num_chapters: usize) -> BookPlan {
    BookPlan {
        book_title: format!("Book about {topic}"),
        book_description: format!("A collection of stories about {topic}"),
        chapters: (1..=num_chapters)
            .map(|number| ChapterSpec {
                chapter_number: number,
                chapter_title: format!("Chapter {number}"),
                synopsis: format!("A story about {topic}"),
                key_points: vec![format!("Explore {topic}")],
            })
            .collect(),
    }
}

fn outline_prompt(topic: &str, num_chapters: usize) -> String {
    format!(
        "Create a detailed outline for a book about '{topic}' with {num_chapters} chapters.\n\
For each chapter, provide:\n\
1. A compelling chapter title\n\
2. A brief synopsis of what happens in the chapter (100-150 words)\n\
3. Key points or scenes to include\n\
\n\
Also provide an overall book title and a short description of the book.\n\
Output ONLY a single JSON object (no markdown fences, no commentary) with this structure:\n\
{{\"book_title\":\"Title of the Book\",\"book_description\":\"Short description of the book's premise\",\
\"chapters\":[{{\"chapter_number\":1,\"chapter_title\":\"Chapter Title\",\
\"synopsis\":\"Brief description of the chapter\",\"key_points\":[\"point 1\",\"point 2\"]}}]}}\n"
    )
}

/// Parse the raw model reply into a plan, normalizing it at the boundary:
/// chapter numbers are rewritten to match stored order so position and
/// `chapter_number` can never disagree.
fn parse_outline(raw: &str) -> Result<BookPlan, MalformedOutputError> {
    let json = extract_json_object(raw)
        .map_err(|err| MalformedOutputError(format!("{err:#}")))?;
    let mut plan: BookPlan =
        serde_json::from_str(json).map_err(|err| MalformedOutputError(err.to_string()))?;

    if plan.book_title.trim().is_empty() {
        return Err(MalformedOutputError("book_title is empty".to_owned()));
    }
    if plan.chapters.is_empty() {
        return Err(MalformedOutputError("plan has no chapters".to_owned()));
    }

    for (index, chapter) in plan.chapters.iter_mut().enumerate() {
        chapter.chapter_number = index + 1;
    }

    Ok(plan)
}

fn extract_json_object(text: &str) -> anyhow::Result<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("missing `{{`"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| anyhow::anyhow!("missing `}}`"))?;
    if end <= start {
        anyhow::bail!("invalid json object span");
    }
    Ok(&text[start..=end])
}
