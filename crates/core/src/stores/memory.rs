//! Process-local cosine index for development and tests. Nothing is written
//! to disk; restart the process and the index is empty again.

use crate::traits::{check_lengths, VectorIndex};
use crate::{Chunk, RetrievedChunk, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    points: RwLock<HashMap<String, (Chunk, Vec<f32>)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn index_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        check_lengths(chunks, embeddings)?;

        let mut points = self.points.write().await;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            points.insert(chunk.id.clone(), (chunk.clone(), embedding.clone()));
        }
        Ok(())
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let points = self.points.read().await;
        let mut scored: Vec<RetrievedChunk> = points
            .values()
            .map(|(chunk, embedding)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, query_vector),
            })
            .collect();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut points = self.points.write().await;
        for id in ids {
            points.remove(id);
        }
        Ok(())
    }

    async fn count_chunks(&self) -> Result<usize, StoreError> {
        Ok(self.points.read().await.len())
    }

    async fn list_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        Ok(self
            .points
            .read()
            .await
            .values()
            .map(|(chunk, _)| chunk.clone())
            .collect())
    }
}
