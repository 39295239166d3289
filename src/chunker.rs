//! Text chunking
//!
//! Splits page text into overlapping character chunks for embedding.

use crate::errors::AppError;
use text_splitter::{Characters, ChunkConfig, TextSplitter};
use tracing::debug;

/// A text chunk with its position within the page
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk within its page
    pub index: i32,
}

/// Recursive character splitter with a fixed size and overlap
pub struct Chunker {
    splitter: TextSplitter<Characters>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Build a chunker; fails when the overlap does not fit the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, AppError> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::ChunkingError(e.to_string()))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split text into chunks for embedding
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let chunks: Vec<TextChunk> = self
            .splitter
            .chunks(text)
            .enumerate()
            .map(|(index, content)| TextChunk {
                content: content.to_string(),
                index: index as i32,
            })
            .collect();

        debug!(
            input_len = text.len(),
            chunk_count = chunks.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "Text chunked"
        );

        chunks
    }
}
