//! Document sources: where page text comes from during ingestion.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Document, Page};
use crate::error::{RagError, Result};

/// Page separator emitted by `pdftotext` and most text extractors.
pub const PAGE_BREAK: char = '\x0c';

/// Supplies the pages of one raw document.
///
/// Each page is reported separately so one unreadable page does not abort
/// ingestion of the rest.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// The document these pages belong to.
    fn document(&self) -> &Document;

    /// Extract every page, in order.
    async fn pages(&self) -> Vec<Result<Page>>;
}

/// A text file whose pages are separated by form feeds.
///
/// `pdftotext report.pdf report.txt` produces one. Page numbers
/// are 1-based; pages holding only whitespace are reported as unreadable.
#[derive(Debug, Clone)]
pub struct TextDocumentSource {
    document: Document,
    path: PathBuf,
}

impl TextDocumentSource {
    /// Read from `path`, using its file stem as the document ID and its file
    /// name as the display name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self { document: document_for_path(&path), path }
    }

    /// Override the document ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.document.id = id.into();
        self
    }

    /// The file being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentSource for TextDocumentSource {
    fn document(&self) -> &Document {
        &self.document
    }

    async fn pages(&self) -> Vec<Result<Page>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) => {
                return vec![Err(RagError::Document(format!(
                    "cannot read '{}': {e}",
                    self.path.display()
                )))];
            }
        };

        let pages: Vec<Result<Page>> = text
            .split(PAGE_BREAK)
            .zip(1u32..)
            .map(|(page, number)| {
                if page.trim().is_empty() {
                    Err(RagError::Document(format!("page {number} has no extractable text")))
                } else {
                    Ok(Page::numbered(number, page))
                }
            })
            .collect();
        debug!(path = %self.path.display(), page_count = pages.len(), "extracted pages");
        pages
    }
}

/// A document named after its file: the stem is the ID, the file name is
/// shown to users.
pub(crate) fn document_for_path(path: &Path) -> Document {
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    let display_name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| id.clone());
    Document::new(id, display_name)
}

/// Pages already held in memory.
#[derive(Debug, Clone)]
pub struct InlineSource {
    document: Document,
    pages: Vec<Page>,
}

impl InlineSource {
    /// Wrap pre-extracted pages.
    pub fn new(document: Document, pages: Vec<Page>) -> Self {
        Self { document, pages }
    }

    /// A single unnumbered page of text.
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self { document: Document::new(id.clone(), id), pages: vec![Page::unnumbered(text)] }
    }
}

#[async_trait]
impl DocumentSource for InlineSource {
    fn document(&self) -> &Document {
        &self.document
    }

    async fn pages(&self) -> Vec<Result<Page>> {
        self.pages.iter().cloned().map(Ok).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn form_feeds_split_pages_and_blank_pages_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "first page\x0c   \x0cthird page").unwrap();

        let source = TextDocumentSource::new(&path);
        let pages = source.pages().await;

        assert_eq!(source.document().id, "report");
        assert_eq!(source.document().display_name, "report.txt");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].as_ref().unwrap(), &Page::numbered(1, "first page"));
        assert!(matches!(pages[1], Err(RagError::Document(_))));
        assert_eq!(pages[2].as_ref().unwrap().number, Some(3));
    }

    #[tokio::test]
    async fn missing_file_is_a_single_document_error() {
        let source = TextDocumentSource::new("/nonexistent/docqa/missing.txt");
        let pages = source.pages().await;
        assert_eq!(pages.len(), 1);
        assert!(matches!(pages[0], Err(RagError::Document(_))));
    }

    #[tokio::test]
    async fn inline_source_yields_its_pages() {
        let source = InlineSource::from_text("notes", "hello");
        let pages = source.pages().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].as_ref().unwrap().number, None);
    }
}
