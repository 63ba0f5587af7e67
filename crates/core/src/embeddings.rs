use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Model name that selects the offline [`CharacterNgramEmbedder`].
pub const CHARACTER_NGRAM_MODEL: &str = "char-ngram";

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::embedding("embedder", "no embedding returned"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Known output sizes of the hosted embedding models.
pub fn dimensions_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        CHARACTER_NGRAM_MODEL => Some(DEFAULT_EMBEDDING_DIMENSIONS),
        _ => None,
    }
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: Option<usize>,
    ) -> Result<Self, StoreError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StoreError::embedding("openai", "api key must not be empty"));
        }

        let model = model.into();
        let dimensions = dimensions
            .or_else(|| dimensions_for_model(&model))
            .ok_or_else(|| {
                StoreError::embedding(
                    "openai",
                    format!("unknown dimensions for model {model}; set them explicitly"),
                )
            })?;

        Ok(Self {
            client: Client::new(),
            endpoint: Url::parse(&format!("{}/embeddings", base_url.trim_end_matches('/')))?,
            api_key,
            model,
            dimensions,
            batch_size: 64,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|err| StoreError::embedding("openai", format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "openai", %status, "embedding api error");
            return Err(StoreError::embedding(
                "openai",
                format!("api returned {status}: {body}"),
            ));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|err| {
            StoreError::embedding("openai", format!("failed to parse response: {err}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(StoreError::embedding(
                "openai",
                format!(
                    "asked for {} embeddings, received {}",
                    texts.len(),
                    parsed.data.len()
                ),
            ));
        }

        parsed.data.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(provider = "openai", model = %self.model, batch = batch.len(), "embedding batch");
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }
}
