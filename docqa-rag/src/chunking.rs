//! Fixed-window document chunking.
//!
//! Windows are measured in characters (Unicode scalar values), never bytes, so
//! multi-byte text can be split anywhere without panicking.

use crate::document::{Document, Page, Segment};
use crate::error::{RagError, Result};

/// A strategy for splitting text into retrievable pieces.
///
/// Implementations must be deterministic: the same input always yields the
/// same sequence.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered chunks. Empty input yields no chunks.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text into fixed-size windows with a configurable overlap.
///
/// Window `i` starts at `i * (chunk_size - chunk_overlap)` characters, so
/// consecutive windows share exactly `chunk_overlap` characters; the last
/// window may be shorter.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(20, 5).unwrap();
/// let chunks = chunker.split("The sky is blue. Grass is green.");
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[0], "The sky is blue. Gra");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] unless `chunk_size > 0` and
    /// `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let len = boundaries.len();
        boundaries.push(text.len());

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::with_capacity(len.div_ceil(step));
        let mut start = 0;

        while start < len {
            let end = (start + self.chunk_size).min(len);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());
            start += step;
        }

        chunks
    }
}

/// Split `text` with a one-off [`FixedSizeChunker`].
///
/// # Errors
///
/// Returns [`RagError::Configuration`] for invalid window parameters.
pub fn split(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    Ok(FixedSizeChunker::new(chunk_size, chunk_overlap)?.split(text))
}

/// Chunk every page of `document` into segments without vectors.
///
/// Segment IDs are `{document_id}_{index}` with the index running across all
/// pages, and each segment inherits its page number.
pub fn segment_pages(chunker: &dyn Chunker, document: &Document, pages: &[Page]) -> Vec<Segment> {
    let mut segments = Vec::new();
    for page in pages {
        for text in chunker.split(&page.text) {
            let index = segments.len();
            segments.push(Segment {
                id: format!("{}_{index}", document.id),
                document_id: document.id.clone(),
                page_number: page.number,
                text,
                vector: Vec::new(),
            });
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_and_grass_make_three_chunks() {
        let chunks = split("The sky is blue. Grass is green.", 20, 5).unwrap();
        assert_eq!(chunks, vec!["The sky is blue. Gra", ". Grass is green.", "n."]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn invalid_windows_are_configuration_errors() {
        assert!(matches!(split("abc", 0, 0), Err(RagError::Configuration(_))));
        assert!(matches!(split("abc", 4, 4), Err(RagError::Configuration(_))));
        assert!(matches!(split("abc", 4, 9), Err(RagError::Configuration(_))));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let chunks = split("héllo wörld ünïcode", 5, 1).unwrap();
        assert_eq!(chunks[0], "héllo");
        assert_eq!(chunks[1], "o wör");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[test]
    fn segments_keep_page_numbers_and_global_indices() {
        let chunker = FixedSizeChunker::new(10, 0).unwrap();
        let document = Document::new("report", "report.pdf");
        let pages = vec![Page::numbered(1, "aaaaaaaaaabbbbb"), Page::numbered(2, "ccccc")];

        let segments = segment_pages(&chunker, &document, &pages);

        let ids: Vec<_> = segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["report_0", "report_1", "report_2"]);
        let pages: Vec<_> = segments.iter().map(|s| s.page_number).collect();
        assert_eq!(pages, vec![Some(1), Some(1), Some(2)]);
        assert!(segments.iter().all(|s| s.vector.is_empty()));
    }
}
