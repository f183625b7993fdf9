//! Text segments with provenance metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A piece of document text with string metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Segment text, as embedded.
    pub text: String,
    /// Provenance metadata such as `documentId`, `type` or `startLine`.
    pub metadata: BTreeMap<String, String>,
}

impl TextSegment {
    /// Creates a segment without metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    /// Returns a metadata value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns a metadata value, or `default` when missing.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns a metadata value parsed as a number.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?.parse().ok()
    }

    /// Describes where the segment sits in its document.
    ///
    /// Code segments give their line range, PDF chunks their page and
    /// character offsets. Missing values render as `missing`.
    pub fn location(&self, missing: &str) -> String {
        match self.get("page") {
            Some(page) if self.get("startLine").is_none() => format!(
                "Page {page}, Chars {}-{}",
                self.get_or("startOffset", missing),
                self.get_or("endOffset", missing),
            ),
            _ => format!(
                "Lines {}-{}",
                self.get_or("startLine", missing),
                self.get_or("endLine", missing),
            ),
        }
    }

    /// Renders the segment as `[type] class.name (location)`.
    pub fn reference(&self) -> String {
        format!(
            "[{}] {}.{} ({})",
            self.get_or("type", "unknown"),
            self.get_or("class", "N/A"),
            self.get_or("name", "N/A"),
            self.location("?"),
        )
    }
}

/// A segment returned by a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSegment {
    /// The segment.
    pub segment: TextSegment,
    /// Similarity to the query.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_renders_location() {
        let segment = TextSegment::new("int x;")
            .with("type", "field")
            .with("class", "Point")
            .with("name", "[x]")
            .with("startLine", 3)
            .with("endLine", 3);
        assert_eq!(segment.reference(), "[field] Point.[x] (Lines 3-3)");
        assert_eq!(segment.get_usize("startLine"), Some(3));
    }

    #[test]
    fn pdf_chunk_reference_uses_page_and_offsets() {
        let segment = TextSegment::new("Chapter one")
            .with("type", "chunk")
            .with("class", "guide.pdf")
            .with("name", "chunk3")
            .with("page", 2)
            .with("startOffset", 1800)
            .with("endOffset", 2800);
        assert_eq!(
            segment.reference(),
            "[chunk] guide.pdf.chunk3 (Page 2, Chars 1800-2800)"
        );
    }

    #[test]
    fn missing_metadata_uses_placeholders() {
        assert_eq!(
            TextSegment::new("text").reference(),
            "[unknown] N/A.N/A (Lines ?-?)"
        );
    }
}
