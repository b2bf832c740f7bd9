//! Text normalization applied before classification and chunking

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.!?;:])").unwrap());

/// Clean raw fetched text before it enters the pipeline.
///
/// Collapses whitespace runs, replaces typographic characters the upstream
/// extractor leaves behind (non-breaking spaces, curly apostrophes, en/em
/// dashes) and strips the stray space French sources often carry before
/// punctuation.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let replaced = text
        .replace('\u{00a0}', " ")
        .replace('\u{2019}', "'")
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "-");

    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    let normalized = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");

    normalized.trim().to_string()
}
