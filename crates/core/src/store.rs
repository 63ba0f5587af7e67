use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{Chunk, RetrievedChunk, StoreError};
use tracing::{debug, info};

/// Translates between chunks and the vector database: embeds on the way in,
/// embeds the query on the way out. It adds no ranking of its own.
pub struct VectorStore {
    index: Box<dyn VectorIndex>,
    embedder: Box<dyn Embedder>,
}

impl VectorStore {
    pub fn new(index: impl VectorIndex + 'static, embedder: impl Embedder + 'static) -> Self {
        Self::from_parts(Box::new(index), Box::new(embedder))
    }

    /// For backends picked at runtime.
    pub fn from_parts(index: Box<dyn VectorIndex>, embedder: Box<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Every embedding is computed before the index is written, so a failed
    /// embedding call leaves the store untouched. The write itself is a single
    /// batched index call.
    pub async fn add_documents(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        info!(chunks = chunks.len(), "adding chunks to vector store");
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(StoreError::Request(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.index.index_chunks(chunks, &embeddings).await
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut hits = self.index.search_vector(&query_vector, k).await?;

        // stable, so equal scores keep the index's order
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);

        debug!(k, hits = hits.len(), "similarity search");
        Ok(hits)
    }

    pub async fn delete_documents(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        info!(ids = ids.len(), "deleting chunks from vector store");
        self.index.delete_chunks(ids).await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.index.count_chunks().await
    }

    pub async fn all_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        let mut chunks = self.index.list_chunks().await?;
        chunks.sort_by(|left, right| {
            (&left.document_id, left.page, left.chunk_index).cmp(&(
                &right.document_id,
                right.page,
                right.chunk_index,
            ))
        });
        Ok(chunks)
    }
}
