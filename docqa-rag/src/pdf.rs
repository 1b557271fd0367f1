//! PDF ingestion: text extracted page by page with `lopdf`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Document, Page};
use crate::error::{RagError, Result};
use crate::source::{DocumentSource, document_for_path};

/// A PDF file read page by page.
///
/// Page numbers follow the PDF page tree and are 1-based. A page whose text
/// cannot be extracted, or that holds no text (a scanned image, say), is
/// reported as unreadable on its own; a file that is not a PDF at all yields
/// a single error.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{DocumentSource, PdfDocumentSource};
///
/// let source = PdfDocumentSource::new("report.pdf");
/// let report = session.load_document(&source).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PdfDocumentSource {
    document: Document,
    path: PathBuf,
}

impl PdfDocumentSource {
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
impl DocumentSource for PdfDocumentSource {
    fn document(&self) -> &Document {
        &self.document
    }

    async fn pages(&self) -> Vec<Result<Page>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return vec![Err(RagError::Document(format!("cannot read '{}': {e}", self.path.display())))];
            }
        };

        // Parsing and content decoding are CPU-bound.
        let pages = match tokio::task::spawn_blocking(move || extract_pages(&bytes)).await {
            Ok(pages) => pages,
            Err(e) => vec![Err(RagError::Document(format!("PDF extraction aborted: {e}")))],
        };
        debug!(path = %self.path.display(), page_count = pages.len(), "extracted PDF pages");
        pages
    }
}

fn extract_pages(bytes: &[u8]) -> Vec<Result<Page>> {
    let pdf = match lopdf::Document::load_mem(bytes) {
        Ok(pdf) => pdf,
        Err(e) => return vec![Err(RagError::Document(format!("not a readable PDF: {e}")))],
    };
    pdf.get_pages()
        .into_keys()
        .map(|number| match pdf.extract_text(&[number]) {
            Ok(text) if !text.trim().is_empty() => Ok(Page::numbered(number, text.trim())),
            Ok(_) => Err(RagError::Document(format!("page {number} has no extractable text"))),
            Err(e) => Err(RagError::Document(format!("page {number}: {e}"))),
        })
        .collect()
}
