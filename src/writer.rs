use crate::formats::BookPlan;
use crate::genai::TextModel;

/// Draft one chapter from the plan. The first and last chapters get
/// extra guidance (introductions and closure) like a human brief would.
pub async fn write_chapter(
    model: &dyn TextModel,
    plan: &BookPlan,
    index: usize,
) -> anyhow::Result<String> {
    let Some(chapter) = plan.chapters.get(index) else {
        anyhow::bail!(
            "chapter index {index} out of range ({} chapters planned)",
            plan.chapters.len()
        );
    };

    let mut prompt = format!(
        "Write Chapter {number}: \"{title}\" for the book \"{book_title}\".\n\
\n\
Use this synopsis as a guide: {synopsis}\n\
\n\
Include these key points/scenes:\n\
{key_points}\n\
\n\
Write a compelling chapter of approximately 1500-2000 words that advances the overall narrative.\n\
Use engaging dialogue, vivid descriptions, and well-developed characters.\n",
        number = chapter.chapter_number,
        title = chapter.chapter_title,
        book_title = plan.book_title,
        synopsis = chapter.synopsis,
        key_points = chapter.key_points.join(", "),
    );
    if index == 0 {
        prompt.push_str("This is the first chapter: introduce the main characters and setting.\n");
    }
    if index + 1 == plan.chapters.len() {
        prompt.push_str(
            "This is the final chapter: provide appropriate closure while leaving room for reader interpretation.\n",
        );
    }

    model.generate_text(&prompt).await
}

/// Come up with a title for a standalone short story.
pub async fn generate_headline(model: &dyn TextModel, topic: &str) -> anyhow::Result<String> {
    let prompt =
        format!("Come up with an engaging and creative title for a story about: {topic}");
    model.generate_text(&prompt).await
}

/// Draft a standalone short story from its title.
pub async fn write_story(model: &dyn TextModel, title: &str) -> anyhow::Result<String> {
    let prompt = format!(
        "Write a fictional short story based on the title: '{title}'. Make it around 700-1000 words."
    );
    model.generate_text(&prompt).await
}

/// Editing pass over a standalone story.
pub async fn edit_story(model: &dyn TextModel, story: &str) -> anyhow::Result<String> {
    let prompt = format!(
        "Please edit the following story for grammar, clarity, and flow. Keep the creative style:\n\n{story}"
    );
    model.generate_text(&prompt).await
}

/// Editing pass over a drafted chapter: grammar, clarity, flow, and
/// narrative coherence, preserving the original voice.
pub async fn edit_chapter(
    model: &dyn TextModel,
    content: &str,
    title: &str,
) -> anyhow::Result<String> {
    let prompt = format!(
        "Please edit the following chapter titled \"{title}\" for grammar, clarity, flow, and \
narrative coherence.\n\
Preserve the creative style and voice while improving the overall quality.\n\
\n\
Chapter content:\n\
{content}\n"
    );

    model.generate_text(&prompt).await
}
