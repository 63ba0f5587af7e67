use crate::traits::{check_lengths, VectorIndex};
use crate::{Chunk, RetrievedChunk, StoreError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const SCROLL_PAGE: usize = 256;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, StoreError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.endpoint, self.collection, suffix)
    }

    /// Creates the collection with cosine distance when it does not exist yet,
    /// otherwise checks that its vector size matches the embedder.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.collection_url("")).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            info!(collection = %self.collection, size = self.vector_size, "creating qdrant collection");
            let response = self
                .client
                .put(self.collection_url(""))
                .json(&json!({
                    "vectors": { "size": self.vector_size, "distance": "Cosine" },
                }))
                .send()
                .await?;
            expect_success(response).await?;
            return Ok(());
        }

        let parsed: Value = expect_success(response).await?.json().await?;
        let existing = parsed
            .pointer("/result/config/params/vectors/size")
            .and_then(Value::as_u64);

        match existing {
            Some(size) if size as usize != self.vector_size => Err(StoreError::Request(format!(
                "collection {} has vector size {} but the embedder produces {}",
                self.collection, size, self.vector_size
            ))),
            _ => Ok(()),
        }
    }
}

async fn expect_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details: format!("{status}: {body}"),
    })
}

fn chunk_from_point(point: &Value) -> Option<Chunk> {
    let id = match point.pointer("/id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let payload = point.pointer("/payload")?;
    // pages are 1-based; a point without one was not written by this store
    let page = payload
        .pointer("/page")
        .and_then(Value::as_u64)
        .filter(|page| *page > 0)
        .and_then(|page| u32::try_from(page).ok())?;

    Some(Chunk {
        id,
        document_id: payload
            .pointer("/document_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        page,
        chunk_index: payload
            .pointer("/chunk_index")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        content: payload
            .pointer("/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn index_chunks(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        check_lengths(chunks, embeddings)?;

        let points = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                if embedding.len() != self.vector_size {
                    return Err(StoreError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": chunk.id,
                    "vector": embedding,
                    "payload": {
                        "document_id": chunk.document_id,
                        "page": chunk.page,
                        "chunk_index": chunk.chunk_index,
                        "content": chunk.content,
                    },
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        expect_success(response).await?;

        debug!(collection = %self.collection, points = chunks.len(), "upserted points");
        Ok(())
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        if query_vector.len() != self.vector_size {
            return Err(StoreError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": query_vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await?;

        let parsed: Value = expect_success(response).await?.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .iter()
            .filter_map(|hit| {
                let score = hit.pointer("/score").and_then(Value::as_f64)? as f32;
                chunk_from_point(hit).map(|chunk| RetrievedChunk { chunk, score })
            })
            .collect())
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<(), StoreError> {
        // Qdrant rejects ids that are not UUIDs; such ids were never stored.
        let ids: Vec<&String> = ids
            .iter()
            .filter(|id| Uuid::parse_str(id).is_ok())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.collection_url("/points/delete?wait=true"))
            .json(&json!({ "points": ids }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn count_chunks(&self) -> Result<usize, StoreError> {
        let response = self
            .client
            .post(self.collection_url("/points/count"))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        let parsed: Value = expect_success(response).await?.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response without result.count".to_string(),
            })
    }

    async fn list_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        let mut chunks = Vec::new();
        let mut offset = Value::Null;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE,
                "with_payload": true,
                "with_vector": false,
            });
            if !offset.is_null() {
                body["offset"] = offset.clone();
            }

            let response = self
                .client
                .post(self.collection_url("/points/scroll"))
                .json(&body)
                .send()
                .await?;
            let parsed: Value = expect_success(response).await?.json().await?;

            if let Some(points) = parsed.pointer("/result/points").and_then(Value::as_array) {
                chunks.extend(points.iter().filter_map(chunk_from_point));
            }

            offset = parsed
                .pointer("/result/next_page_offset")
                .cloned()
                .unwrap_or(Value::Null);
            if offset.is_null() {
                break;
            }
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            QdrantStore::new("not a url", "docs", 4),
            Err(StoreError::Url(_))
        ));
    }

    #[test]
    fn points_convert_back_to_chunks() {
        let point = json!({
            "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
            "score": 0.83,
            "payload": {
                "document_id": "doc-1",
                "page": 3,
                "chunk_index": 7,
                "content": "Gross margin widened",
            },
        });

        let chunk = chunk_from_point(&point).expect("point should parse");

        assert_eq!(chunk.id, "5c56c793-69f3-4fbf-87e6-c4bf54c28c26");
        assert_eq!(chunk.page, 3);
        assert_eq!(chunk.chunk_index, 7);
        assert_eq!(chunk.content, "Gross margin widened");
    }

    #[test]
    fn points_without_a_page_are_skipped() {
        let missing = json!({
            "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
            "payload": { "document_id": "doc-1", "chunk_index": 0, "content": "Cash" },
        });
        let zero = json!({
            "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26",
            "payload": { "document_id": "doc-1", "page": 0, "chunk_index": 0, "content": "Cash" },
        });

        assert!(chunk_from_point(&missing).is_none());
        assert!(chunk_from_point(&zero).is_none());
    }

    #[tokio::test]
    async fn non_uuid_deletes_never_reach_the_server() {
        // nothing listens on this port; a request would fail
        let store = QdrantStore::new("http://127.0.0.1:9", "docs", 4).unwrap();
        store
            .delete_chunks(&["nonexistent-id".to_string()])
            .await
            .expect("unknown ids are a no-op");
    }

    #[tokio::test]
    async fn wrong_query_dimension_is_rejected() {
        let store = QdrantStore::new("http://127.0.0.1:9", "docs", 4).unwrap();
        let result = store.search_vector(&[1.0, 0.0], 5).await;
        assert!(matches!(result, Err(StoreError::Request(_))));
    }
}
