/// Maximum length of the slug body, excluding the `book_` prefix. Keeps
/// the full on-disk path comfortably under Windows path limits.
const MAX_BODY_CHARS: usize = 47;

/// Derive a filesystem-safe identifier from a book title.
///
/// The mapping is pure and deterministic: repeated calls with the same
/// title always resolve to the same on-disk location. Lower-cases the
/// title, strips everything that is not alphanumeric, whitespace, or a
/// hyphen, collapses whitespace/hyphen runs into single underscores, and
/// bounds the result to 47 characters (truncating at a word boundary when
/// one fits), then prefixes `book_`.
pub fn normalize(title: &str) -> String {
    let lowered = title.to_lowercase();

    let mut body = String::new();
    let mut in_separator_run = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '-' {
            in_separator_run = true;
            continue;
        }
        if !ch.is_alphanumeric() {
            // Stripped entirely; does not interrupt a separator run.
            continue;
        }
        if in_separator_run {
            body.push('_');
            in_separator_run = false;
        }
        body.push(ch);
    }
    if in_separator_run {
        body.push('_');
    }

    if body.chars().count() > MAX_BODY_CHARS {
        body = truncate_at_word_boundary(&body);
    }

    format!("book_{body}")
}

/// Keep whole underscore-delimited words while they fit within the bound;
/// hard-truncate when not even the first word fits.
fn truncate_at_word_boundary(body: &str) -> String {
    let mut truncated = String::new();
    for word in body.split('_') {
        let candidate_chars = if truncated.is_empty() {
            word.chars().count()
        } else {
            truncated.chars().count() + 1 + word.chars().count()
        };
        if candidate_chars > MAX_BODY_CHARS {
            break;
        }
        if !truncated.is_empty() {
            truncated.push('_');
        }
        truncated.push_str(word);
    }

    if truncated.is_empty() {
        body.chars().take(MAX_BODY_CHARS).collect()
    } else {
        truncated
    }
}
