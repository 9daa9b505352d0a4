//! Pagination utilities.
//!
//! Two strategies live here. PDF input arrives already split by the
//! extractor, so each source page becomes exactly one output page. Plain
//! text is cut into fixed-size character chunks with no regard for word
//! boundaries; a word may straddle two pages. Keeping that rule simple keeps
//! page numbers stable for a given file and page size.

use crate::book::{BLANK_PAGE, Page};

/// Characters per page for plain-text sources.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// Build one page per extracted source page, preserving order.
pub fn paginate_extracted_pages(source_pages: Vec<String>) -> Vec<Page> {
    source_pages
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Page {
            number: idx + 1,
            text: if text.trim().is_empty() {
                BLANK_PAGE.to_string()
            } else {
                text
            },
        })
        .collect()
}

/// Split plain text into pages of `page_size` characters, trimming each.
/// A chunk that is only whitespace becomes [`BLANK_PAGE`], so page text is
/// never empty.
///
/// Empty input produces no pages at all; callers treat a zero-page book as a
/// valid document.
pub fn paginate_plain_text(text: &str, page_size: usize) -> Vec<Page> {
    chunk_plain_text(text, page_size)
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let trimmed = chunk.trim();
            Page {
                number: idx + 1,
                text: if trimmed.is_empty() {
                    BLANK_PAGE.to_string()
                } else {
                    trimmed.to_string()
                },
            }
        })
        .collect()
}

/// Untrimmed chunks of at most `page_size` characters. A size of zero is
/// treated as one.
pub fn chunk_plain_text(text: &str, page_size: usize) -> Vec<&str> {
    let page_size = page_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (offset, _) in text.char_indices() {
        if count == page_size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}
