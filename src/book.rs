//! Book and page records produced by the loader.
//!
//! A `Book` is built once when a file finishes loading and is replaced
//! wholesale afterwards; nothing in the crate edits its pages in place.

use serde::Serialize;

/// Marker text for a page that has no extractable text.
pub const BLANK_PAGE: &str = "[Blank Page]";

/// Author shown when the source carries no usable metadata.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Pdf,
    Text,
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Text => "text",
        };
        write!(f, "{}", label)
    }
}

/// One displayed page. `number` is 1-based and matches the page's position.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

impl Page {
    pub fn is_blank(&self) -> bool {
        self.text == BLANK_PAGE
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub format: BookFormat,
    pages: Vec<Page>,
}

impl Book {
    pub fn new(id: String, title: String, format: BookFormat, pages: Vec<Page>) -> Self {
        Self {
            id,
            title,
            author: UNKNOWN_AUTHOR.to_string(),
            format,
            pages,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_tracks_page_sequence() {
        let pages = vec![
            Page {
                number: 1,
                text: "one".into(),
            },
            Page {
                number: 2,
                text: BLANK_PAGE.into(),
            },
        ];
        let book = Book::new("abc".into(), "Demo".into(), BookFormat::Text, pages);
        assert_eq!(book.total_pages(), 2);
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert!(book.page(1).is_some_and(Page::is_blank));
        assert!(book.page(2).is_none());
    }
}
