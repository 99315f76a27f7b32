//! Cleaning of raw model output

use serde::de::DeserializeOwned;

/// Drop Markdown fence lines (```` ``` ```` or ```` ```json ````) and trim
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !is_fence(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_fence(line: &str) -> bool {
    match line.trim().strip_prefix("```") {
        Some(tag) => {
            let tag = tag.trim();
            tag.is_empty() || tag.eq_ignore_ascii_case("json")
        }
        None => false,
    }
}

/// Parse a JSON object out of a model reply.
///
/// Fences are stripped first; if the rest still is not valid JSON the
/// outermost `{...}` span is tried before giving up with the original error.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let cleaned = strip_code_fences(text);

    match serde_json::from_str(&cleaned) {
        Ok(value) => Ok(value),
        Err(e) => match outermost_object(&cleaned) {
            Some(span) if span.len() < cleaned.len() => serde_json::from_str(span),
            _ => Err(e),
        },
    }
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Trim a lemma reply to the bare word.
///
/// Leading and trailing characters other than letters, digits, `_`,
/// whitespace and `-` are removed; inner spaces and hyphens stay.
pub fn clean_lemma(text: &str) -> String {
    let keep = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace();
    text.trim()
        .trim_matches(|c: char| !keep(c))
        .trim()
        .to_string()
}
