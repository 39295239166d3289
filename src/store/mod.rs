//! Vector storage
//!
//! The vector table holds the chunks of the one source document. It is
//! truncated and rebuilt on every question, so the interface is just
//! clear, insert and top-k search.

mod pg;

pub use pg::PgVectorStore;

use crate::errors::AppError;
use async_trait::async_trait;

/// A chunk to be stored with its embedding
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// 1-based page number the chunk came from
    pub page: i32,
    /// Index of the chunk within its page
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub page: i32,
    pub chunk_index: i32,
    pub content: String,
    /// Cosine similarity in [-1, 1], higher is closer
    pub score: f64,
}

/// Trait for the vector table
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Probe the backing store, used by the readiness check
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Remove every stored chunk
    async fn clear(&self) -> Result<(), AppError>;

    /// Insert chunks with their embeddings
    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), AppError>;

    /// Top-k chunks by cosine similarity to the query embedding
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError>;
}
