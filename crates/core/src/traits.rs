use crate::{Chunk, RetrievedChunk, StoreError};
use async_trait::async_trait;

/// Storage and nearest-neighbour search over chunk embeddings. Implementors
/// own the similarity metric, persistence and tie ordering.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn index_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    /// At most `limit` hits, best first.
    async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError>;

    /// Unknown ids are ignored.
    async fn delete_chunks(&self, ids: &[String]) -> Result<(), StoreError>;

    async fn count_chunks(&self) -> Result<usize, StoreError>;

    async fn list_chunks(&self) -> Result<Vec<Chunk>, StoreError>;
}

pub(crate) fn check_lengths(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), StoreError> {
    if chunks.len() != embeddings.len() {
        return Err(StoreError::Request(format!(
            "embedding count {} doesn't match chunk count {}",
            embeddings.len(),
            chunks.len()
        )));
    }
    Ok(())
}
