//! Extraction of executable payloads from model replies.

use std::sync::OnceLock;

use regex::Regex;

/// Reference completion marker.
pub const DEFAULT_COMPLETION_MARKER: &str = "task complete";

const FENCE: &str = "```";

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:lua|json)[ \t]*\r?\n(.*?)```").expect("static regex is valid")
    })
}

/// Extract the executable payload from a model reply.
///
/// The first fenced block tagged `lua` or `json` wins and everything around
/// it is discarded; later blocks are ignored. Without such a block, stray
/// triple-backtick markers and surrounding whitespace are stripped instead.
pub fn extract(raw: &str) -> String {
    if let Some(payload) = fenced_block().captures(raw).and_then(|c| c.get(1)) {
        return payload.as_str().trim().to_string();
    }
    strip_fences(raw).to_string()
}

fn strip_fences(mut text: &str) -> &str {
    loop {
        let trimmed = text.trim();
        let stripped = trimmed.strip_prefix(FENCE).unwrap_or(trimmed);
        let stripped = stripped.strip_suffix(FENCE).unwrap_or(stripped);
        if stripped.len() == text.len() {
            return stripped;
        }
        text = stripped;
    }
}

/// Case-insensitive substring check for the completion marker.
///
/// Plain substring semantics: "incomplete task" does not match because the
/// words are in the wrong order, not because of any negation handling.
pub fn is_task_complete(text: &str, marker: &str) -> bool {
    text.to_lowercase().contains(&marker.to_lowercase())
}
