use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Local;

use crate::genai::TextModel;

/// Generate a chapter illustration and save it under
/// `<book_dir>/illustrations/`. `Ok(None)` means the model answered
/// without producing an image; the caller substitutes a textual
/// placeholder. Illustrations are best-effort throughout and never block
/// chapter completion.
pub async fn generate_illustration(
    model: &dyn TextModel,
    description: &str,
    prefix: &str,
    book_dir: &Path,
) -> anyhow::Result<Option<PathBuf>> {
    let illustrations_dir = book_dir.join("illustrations");
    fs::create_dir_all(&illustrations_dir)
        .with_context(|| format!("create illustrations dir: {}", illustrations_dir.display()))?;

    let Some(bytes) = model.generate_image(description).await? else {
        tracing::warn!("no image was generated");
        return Ok(None);
    };

    let safe_prefix = sanitize_prefix(prefix);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = illustrations_dir.join(format!("{safe_prefix}_{timestamp}.png"));
    fs::write(&path, &bytes)
        .with_context(|| format!("write illustration: {}", path.display()))?;

    tracing::info!(path = %path.display(), "illustration saved");
    Ok(Some(path))
}

/// Filename-safe, reasonably short prefix: spaces to underscores, colons
/// dropped, at most 30 characters, lower-case.
fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .filter(|ch| *ch != ':')
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .take(30)
        .collect::<String>()
        .to_lowercase()
}
