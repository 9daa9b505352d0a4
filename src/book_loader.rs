//! Turning files on disk into paginated books.
//!
//! PDFs go through a [`PdfExtractor`] (by default [`UnpdfExtractor`]) and
//! keep their own page breaks. Everything else is treated as plain
//! text and cut into fixed-size pages.

use crate::book::{Book, BookFormat};
use crate::error::LoadError;
use crate::pagination::{paginate_extracted_pages, paginate_plain_text};
use crate::text_utils::normalize_whitespace;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Text of one source page. `index` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub index: usize,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    /// Extract per-page text, in page order.
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<ExtractedPage>, LoadError>;
}

/// Pure-Rust extraction through `unpdf`; needs no external tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpdfExtractor;

impl PdfExtractor for UnpdfExtractor {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<ExtractedPage>, LoadError> {
        debug!(bytes = data.len(), "Parsing PDF");
        let document = unpdf::parse_bytes(data)
            .map_err(|err| LoadError::Extraction(format!("failed to parse PDF: {err}")))?;

        let pages: Vec<ExtractedPage> = document
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| ExtractedPage {
                index,
                text: normalize_whitespace(&page.plain_text()),
            })
            .collect();
        info!(pages = pages.len(), "Extracted PDF text");
        Ok(pages)
    }
}

/// Load `path` into a book with pages of at most `page_size` characters.
pub fn load_book(
    path: &Path,
    page_size: usize,
    extractor: &dyn PdfExtractor,
) -> Result<Book, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (format, pages) = if is_pdf(path) {
        info!(path = %path.display(), "Loading PDF");
        let mut extracted = extractor.extract_pages(&data)?;
        extracted.sort_by_key(|page| page.index);
        let texts = extracted.into_iter().map(|page| page.text).collect();
        (BookFormat::Pdf, paginate_extracted_pages(texts))
    } else {
        info!(path = %path.display(), "Loading plain text");
        let text = String::from_utf8_lossy(&data);
        (BookFormat::Text, paginate_plain_text(&text, page_size))
    };

    if pages.is_empty() {
        warn!(path = %path.display(), "Loaded book has no pages");
    }

    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let book = Book::new(book_id(path), title, format, pages);
    info!(
        id = %book.id,
        title = %book.title,
        format = %book.format,
        pages = book.total_pages(),
        "Finished loading book"
    );
    Ok(book)
}

fn is_pdf(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "pdf"
    )
}

fn book_id(path: &Path) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(path.as_os_str().to_string_lossy().as_bytes());
    hasher.update(nanos.to_le_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..9].to_string()
}
