//! PDF text extraction and fixed-size chunking.

use text_splitter::{ChunkConfig, TextSplitter};

use crate::{Error, Result};

/// Tracing target for PDF processing.
const TRACING_TARGET: &str = "codelab_rig::rag::pdf";

/// A fixed-size slice of extracted PDF text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfChunk {
    /// Zero-based position of the chunk.
    pub index: usize,
    /// Byte offset of the chunk start in the extracted text.
    pub start_offset: usize,
    /// Byte offset one past the chunk end.
    pub end_offset: usize,
    /// 1-based page the chunk starts on.
    pub page: usize,
    /// Chunk text.
    pub text: String,
}

/// Extracts the text layer of a PDF document.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| Error::document(format!("Failed to extract text from PDF: {err}")))?;

    tracing::debug!(
        target: TRACING_TARGET,
        bytes = %bytes.len(),
        chars = %text.chars().count(),
        "Extracted PDF text"
    );
    Ok(text)
}

/// Splits text into chunks of at most `size` characters sharing `overlap`
/// characters with their predecessor.
///
/// Page breaks are taken from form feed characters in the extracted text.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<PdfChunk>> {
    let config = ChunkConfig::new(size)
        .with_overlap(overlap)
        .map_err(|err| Error::config(format!("Invalid PDF chunk configuration: {err}")))?;
    let splitter = TextSplitter::new(config);

    let page_breaks: Vec<usize> = text
        .char_indices()
        .filter(|(_, c)| *c == '\x0c')
        .map(|(i, _)| i)
        .collect();

    let chunks = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (start_offset, chunk))| PdfChunk {
            index,
            start_offset,
            end_offset: start_offset + chunk.len(),
            page: page_breaks.iter().take_while(|&&pos| pos < start_offset).count() + 1,
            text: chunk.to_owned(),
        })
        .collect();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_size_and_offsets() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(100);
        let chunks = chunk_text(&text, 200, 50).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 200);
            assert_eq!(&text[chunk.start_offset..chunk.end_offset], chunk.text);
        }
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].page, 1);
    }

    #[test]
    fn page_breaks_advance_page_numbers() {
        let text = format!("{}\x0c{}", "a ".repeat(60), "b ".repeat(60));
        let chunks = chunk_text(&text, 100, 0).unwrap();
        assert_eq!(chunks.first().unwrap().page, 1);
        assert_eq!(chunks.last().unwrap().page, 2);
    }

    #[test]
    fn overlap_larger_than_size_is_rejected() {
        assert!(chunk_text("text", 10, 20).is_err());
    }

    #[test]
    fn invalid_pdf_is_a_document_error() {
        let err = extract_text(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }
}
