//! Small text cleanup helpers shared by the loader and the terminal front end.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(
            normalize_whitespace("  Chapter\n\n1\t\tBegins  here "),
            "Chapter 1 Begins here"
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn preview_cuts_on_characters() {
        assert_eq!(preview("héllo world", 5), "héllo…");
        assert_eq!(preview("short", 10), "short");
    }
}
